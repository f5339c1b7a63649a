//! WiFi station-mode adapter.
//!
//! Implements [`ProvisioningPort`]: network bring-up plus the
//! "forget credentials and start over" path triggered by a button hold
//! or a boot-time hold.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.

use log::{error, info, warn};

use crate::app::ports::ProvisioningPort;
use crate::error::LinkError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), LinkError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(LinkError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), LinkError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(LinkError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi link
// ───────────────────────────────────────────────────────────────

pub struct WifiLink {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: remaining connect attempts that should fail.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
    /// Simulation: stored credentials were wiped this many times.
    #[cfg(not(target_os = "espidf"))]
    sim_wipes: u32,
}

impl WifiLink {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            sim_failures: 0,
            sim_wipes: 0,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), LinkError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|()| LinkError::InvalidSsid)?;
        self.password.clear();
        self.password.push_str(password).map_err(|()| LinkError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), LinkError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| LinkError::InvalidSsid)?,
            password: self.password.as_str().try_into().map_err(|_| LinkError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(|_| LinkError::ConnectionFailed)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|_| LinkError::ConnectionFailed)?;
        }
        self.wifi.connect().map_err(|_| LinkError::ConnectionFailed)?;
        self.wifi.wait_netif_up().map_err(|_| LinkError::ConnectionFailed)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), LinkError> {
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            warn!("WiFi(sim): simulated connection failure");
            return Err(LinkError::ConnectionFailed);
        }
        info!("WiFi(sim): connected to '{}'", self.ssid);
        Ok(())
    }

    /// Drop the association and wipe credentials stored by the driver.
    #[cfg(target_os = "espidf")]
    fn platform_forget(&mut self) {
        let _ = self.wifi.disconnect();
        // SAFETY: esp_wifi_restore only resets driver-owned NVS settings.
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_restore() };
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            warn!("WiFi: esp_wifi_restore failed (rc={})", ret);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_forget(&mut self) {
        self.sim_wipes += 1;
        info!("WiFi(sim): stored credentials wiped");
    }

    /// Make the next `n` connection attempts fail (host only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures = n;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_wipes(&self) -> u32 {
        self.sim_wipes
    }

    fn join(&mut self) -> Result<(), LinkError> {
        if self.ssid.is_empty() {
            return Err(LinkError::NoCredentials);
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        self.state = WifiState::Connecting;

        match self.platform_connect() {
            Ok(()) => {
                self.state = WifiState::Connected;
                info!("WiFi: connected");
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.state = WifiState::Failed;
                Err(e)
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiLink {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// ProvisioningPort
// ───────────────────────────────────────────────────────────────

impl ProvisioningPort for WifiLink {
    fn connect(&mut self, reprovision: bool) -> Result<(), LinkError> {
        if reprovision {
            self.platform_forget();
        }
        if self.state == WifiState::Connected && !reprovision {
            return Ok(());
        }
        self.join()
    }

    fn reprovision(&mut self) -> Result<(), LinkError> {
        info!("WiFi: reprovisioning");
        self.platform_forget();
        self.state = WifiState::Disconnected;
        self.join()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
