//! Adapters Layer (Driven Adapters)
//!
//! ## Adapters
//!
//! - `BusTransportAdapter` - Channel transport and resolver over the
//!   in-memory channel bus

pub mod bus_transport;

pub use bus_transport::BusTransportAdapter;
