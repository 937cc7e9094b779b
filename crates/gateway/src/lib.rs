//! The gateway: per-user admission, the response budget, and out-of-band
//! delivery of late replies.
//!
//! The controller sits between a chat frontend and the agent runtime. It
//! guarantees one in-flight run per user, answers within a fixed budget
//! (with an interim notice when the run is slower), and never cancels a run
//! it has admitted — late results go out through the transport's push
//! channel instead.

pub mod controller;
pub mod transport;

pub use controller::{DeliveryController, MessageHandler};
pub use transport::InProcessTransport;
