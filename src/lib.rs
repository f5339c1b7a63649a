//! SensorNode firmware library.
//!
//! Exposes the event core (queue, button machine, sample guard,
//! dispatcher) for integration testing on the host.  All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod pins;

pub mod adapters;
pub mod drivers;
pub mod sensors;
