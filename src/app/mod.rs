//! Application core: event coordination, zero direct I/O.
//!
//! Producers push [`Event`](crate::events::Event)s; the [`dispatcher`]
//! drains them and drives the [`guard`]ed sample-and-publish path.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer testable without real peripherals.

pub mod boot;
pub mod context;
pub mod dispatcher;
pub mod events;
pub mod guard;
pub mod inbound;
pub mod ports;
