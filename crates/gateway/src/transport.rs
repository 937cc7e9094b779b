//! In-process transport — records deliveries for tests and local harnesses.

use async_trait::async_trait;
use ledgerbot_core::context::AgentReply;
use ledgerbot_core::error::TransportError;
use ledgerbot_core::transport::ChatTransport;
use tokio::sync::Mutex;
use tracing::debug;

/// A `ChatTransport` that keeps every delivery in memory.
pub struct InProcessTransport {
    name: String,
    now_sends: Mutex<Vec<(String, AgentReply)>>,
    late_sends: Mutex<Vec<(String, AgentReply)>>,
}

impl InProcessTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            now_sends: Mutex::new(Vec::new()),
            late_sends: Mutex::new(Vec::new()),
        }
    }

    /// All direct deliveries so far, in order.
    pub async fn now_sends(&self) -> Vec<(String, AgentReply)> {
        self.now_sends.lock().await.clone()
    }

    /// All out-of-band deliveries so far, in order.
    pub async fn late_sends(&self) -> Vec<(String, AgentReply)> {
        self.late_sends.lock().await.clone()
    }
}

#[async_trait]
impl ChatTransport for InProcessTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_now(
        &self,
        user_id: &str,
        reply: &AgentReply,
    ) -> Result<(), TransportError> {
        debug!(user = %user_id, transport = %self.name, "send_now");
        self.now_sends
            .lock()
            .await
            .push((user_id.to_string(), reply.clone()));
        Ok(())
    }

    async fn send_later(
        &self,
        user_id: &str,
        reply: &AgentReply,
    ) -> Result<(), TransportError> {
        debug!(user = %user_id, transport = %self.name, "send_later");
        self.late_sends
            .lock()
            .await
            .push((user_id.to_string(), reply.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_both_channels_separately() {
        let transport = InProcessTransport::new("test");
        transport
            .send_now("u1", &AgentReply::text("now"))
            .await
            .unwrap();
        transport
            .send_later("u1", &AgentReply::text("later"))
            .await
            .unwrap();

        let now = transport.now_sends().await;
        let late = transport.late_sends().await;
        assert_eq!(now.len(), 1);
        assert_eq!(now[0].1.text, "now");
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].1.text, "later");
    }
}
