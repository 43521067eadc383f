//! # Shared Types Crate
//!
//! This crate contains the message model, reply destination types, message
//! selectors and the transport error taxonomy used by every crate in the
//! workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Read-Only Messages**: A received `Message` is never mutated by the
//!   correlation core; new messages are built with the `with_*` constructors.
//! - **Resolve Once**: A `ReplyDestination` is either an inline handle or a
//!   name, and is turned into a `DestinationHandle` exactly once, when the
//!   inbound message is captured.

pub mod errors;
pub mod message;
pub mod selector;

pub use errors::*;
pub use message::{headers, DestinationHandle, DestinationKind, Message, ReplyDestination};
pub use selector::MessageSelector;
