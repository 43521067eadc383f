//! Service Layer
//!
//! Application services that drive the domain through the ports.

pub mod orchestrator;
pub mod receiver;
pub mod replier;

pub use orchestrator::RequestReplyOrchestrator;
pub use receiver::SynchronousReceiver;
pub use replier::SynchronousReplier;
