//! Boot-time sequence helpers.
//!
//! 1. Reprovision check: button held through the hold interval at power-up.
//! 2. Link bring-up with the resulting flag.
//! 3. Initialisation-complete indicator burst once the context exists.

use embassy_time::{Duration, Timer};
use log::info;

use crate::config::NodeConfig;
use crate::error::Result;

use super::context::NodeContext;
use super::ports::{IndicatorPort, MessageBus, ProvisioningPort, SensorPort};

/// `true` if the button is pressed now and still pressed `hold_ms`
/// later.  Acknowledged with a fast flash on the indicator.
pub async fn check_reprovision_request(
    config: &NodeConfig,
    mut is_pressed: impl FnMut() -> bool,
    indicator: &mut impl IndicatorPort,
) -> bool {
    if !is_pressed() {
        return false;
    }

    info!("button pressed at boot; confirming in {} ms", config.hold_ms);
    Timer::after_millis(u64::from(config.hold_ms)).await;
    if !is_pressed() {
        return false;
    }

    for _ in 0..config.reprovision_flash_count {
        indicator.toggle();
        Timer::after_millis(u64::from(config.reprovision_flash_ms)).await;
    }
    info!("Reprovisioning activated!");
    true
}

pub fn bring_up_link(link: &mut impl ProvisioningPort, reprovision: bool) -> Result<()> {
    info!("Initialising WiFi connection ...");
    link.connect(reprovision)?;
    info!("WiFi connection initialised.");
    Ok(())
}

/// Initialisation-complete burst.
pub async fn signal_ready<S, B, I>(ctx: &NodeContext<'_, S, B, I>) -> Result<()>
where
    S: SensorPort,
    B: MessageBus,
    I: IndicatorPort,
{
    let config = ctx.config();
    let period = Duration::from_millis(u64::from(config.blink_period_ms));
    ctx.guard().blink(config.startup_blinks, period).await
}
