//! MQTT message-bus adapter (ESP-IDF only).
//!
//! Implements [`MessageBus`] over `EspMqttClient`.  The client callback
//! runs on the MQTT task and only ever talks to the [`InboundRouter`],
//! which turns connect / disconnect / control messages into queue events
//! without blocking.
//!
//! Every new broker session needs the control topic subscribed again.
//! The callback cannot reach the client, so it raises `resubscribe` and
//! the next call into the bus (publish or reconnect) performs it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
};
use log::{debug, info, warn};

use crate::adapters::time::MonotonicClock;
use crate::app::inbound::InboundRouter;
use crate::app::ports::MessageBus;
use crate::config::{NodeConfig, TopicString};
use crate::error::PublishError;

const CLIENT_ID: &str = "sensornode";
const SESSION_WAIT: Duration = Duration::from_secs(10);

pub type Router = InboundRouter<'static, MonotonicClock>;

pub struct MqttBus {
    client: Option<EspMqttClient<'static>>,
    router: &'static Router,
    connected: Arc<AtomicBool>,
    resubscribe: Arc<AtomicBool>,
    broker_url: TopicString,
    publish_topic: TopicString,
    control_topic: TopicString,
}

impl MqttBus {
    /// Create the client and wait (bounded) for the first session.
    pub fn start(config: &NodeConfig, router: &'static Router) -> Result<Self, PublishError> {
        let mut bus = Self {
            client: None,
            router,
            connected: Arc::new(AtomicBool::new(false)),
            resubscribe: Arc::new(AtomicBool::new(false)),
            broker_url: config.broker_url.clone(),
            publish_topic: config.publish_topic.clone(),
            control_topic: config.control_topic.clone(),
        };
        bus.open()?;
        Ok(bus)
    }

    fn open(&mut self) -> Result<(), PublishError> {
        self.connected.store(false, Ordering::Release);
        let conf = MqttClientConfiguration {
            client_id: Some(CLIENT_ID),
            ..Default::default()
        };

        let router = self.router;
        let connected = Arc::clone(&self.connected);
        let resubscribe = Arc::clone(&self.resubscribe);
        let client = EspMqttClient::new_cb(self.broker_url.as_str(), &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => {
                    connected.store(true, Ordering::Release);
                    resubscribe.store(true, Ordering::Release);
                    router.on_connected();
                }
                EventPayload::Disconnected => {
                    connected.store(false, Ordering::Release);
                    router.on_disconnected();
                }
                EventPayload::Received { data, details: Details::Complete, .. } => {
                    router.on_message(data);
                }
                EventPayload::Received { .. } => debug!("MQTT: chunked message ignored"),
                EventPayload::Error(e) => warn!("MQTT: client error: {:?}", e),
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {e}");
            PublishError::ClientInit
        })?;
        self.client = Some(client);
        info!("MQTT: client started for {}", self.broker_url);

        let deadline = Instant::now() + SESSION_WAIT;
        while !self.connected.load(Ordering::Acquire) {
            if Instant::now() >= deadline {
                warn!("MQTT: no session after {:?}", SESSION_WAIT);
                return Err(PublishError::NotConnected);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        self.subscribe_if_needed();
        Ok(())
    }

    fn subscribe_if_needed(&mut self) {
        if !self.resubscribe.swap(false, Ordering::AcqRel) {
            return;
        }
        let Some(client) = self.client.as_mut() else {
            return;
        };
        match client.subscribe(self.control_topic.as_str(), QoS::AtMostOnce) {
            Ok(_) => info!("MQTT: subscribed to {}", self.control_topic),
            Err(e) => {
                warn!("MQTT: subscribe failed: {e}");
                self.resubscribe.store(true, Ordering::Release);
            }
        }
    }
}

impl MessageBus for MqttBus {
    fn publish(&mut self, payload: &[u8]) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        self.subscribe_if_needed();
        let client = self.client.as_mut().ok_or(PublishError::NotConnected)?;
        client
            .publish(self.publish_topic.as_str(), QoS::AtLeastOnce, true, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: publish failed: {e}");
                PublishError::Rejected
            })
    }

    fn reconnect(&mut self) -> Result<(), PublishError> {
        // Dropping the client stops its task before the new one starts.
        self.client = None;
        self.open()
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::Acquire)
    }
}
