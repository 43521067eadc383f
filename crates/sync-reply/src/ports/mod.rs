//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - API for callers running exchanges
//! - Driven Ports (outbound) - the channel transport and name resolution

pub mod inbound;
pub mod outbound;

pub use inbound::RequestReplyApi;
pub use outbound::{ChannelTransport, DestinationResolver};
