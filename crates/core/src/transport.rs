//! Chat transport boundary — how replies leave the system.
//!
//! The delivery controller answers the triggering request synchronously (the
//! return value of `handle_message` is the "send now" channel) and pushes
//! late results through `send_later`, the transport's asynchronous/push
//! channel. Both carry an identical payload shape.

use async_trait::async_trait;
use crate::context::AgentReply;
use crate::error::TransportError;

/// Outbound delivery to the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Human-readable transport name (e.g., "cli", "telegram").
    fn name(&self) -> &str;

    /// Deliver a reply as the direct response to a live request.
    async fn send_now(
        &self,
        user_id: &str,
        reply: &AgentReply,
    ) -> std::result::Result<(), TransportError>;

    /// Deliver a reply out-of-band, after the caller has stopped waiting.
    async fn send_later(
        &self,
        user_id: &str,
        reply: &AgentReply,
    ) -> std::result::Result<(), TransportError>;
}
