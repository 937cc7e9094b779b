//! Per-user concurrency and delivery control.
//!
//! One rule: at most one in-flight run per user. A second message while a
//! run is active is dropped with a busy notice. An admitted run gets a fixed
//! response budget; if it outlives the budget the caller receives an interim
//! notice and the run keeps going — a detached watcher delivers the eventual
//! reply through the transport's push channel. Runs are never cancelled.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ledgerbot_agent::AgentRuntime;
use ledgerbot_config::GatewaySettings;
use ledgerbot_core::context::AgentReply;
use ledgerbot_core::transport::ChatTransport;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Notice for a message dropped because the user's previous run is active.
const BUSY_NOTICE: &str =
    "Your previous message is still being processed, give it a few seconds.";

/// Interim notice when a run outlives the response budget.
const INTERIM_NOTICE: &str = "Still processing; the result will be sent to you automatically.";

/// Notice when a run fails with an error.
const UNAVAILABLE_NOTICE: &str = "Service temporarily unavailable, please try again later.";

/// Notice when a run aborts without producing a result.
const FAILED_NOTICE: &str = "Processing failed, please try again later.";

/// What the controller runs. Implemented by the agent runtime; tests swap in
/// mocks with controlled latency.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(
        &self,
        user_id: &str,
        text: &str,
        locale: Option<&str>,
    ) -> ledgerbot_core::Result<AgentReply>;

    async fn handle_image(
        &self,
        user_id: &str,
        bytes: &[u8],
        mime: &str,
        source_id: &str,
        caption: Option<&str>,
    ) -> ledgerbot_core::Result<AgentReply>;
}

#[async_trait]
impl MessageHandler for AgentRuntime {
    async fn handle_message(
        &self,
        user_id: &str,
        text: &str,
        locale: Option<&str>,
    ) -> ledgerbot_core::Result<AgentReply> {
        AgentRuntime::handle_message(self, user_id, text, locale).await
    }

    async fn handle_image(
        &self,
        user_id: &str,
        bytes: &[u8],
        mime: &str,
        source_id: &str,
        caption: Option<&str>,
    ) -> ledgerbot_core::Result<AgentReply> {
        AgentRuntime::handle_image(self, user_id, bytes, mime, source_id, caption).await
    }
}

/// The per-user admission and delivery controller.
pub struct DeliveryController {
    handler: Arc<dyn MessageHandler>,
    transport: Arc<dyn ChatTransport>,
    budget: Duration,
    active: Arc<Mutex<HashSet<String>>>,
}

impl DeliveryController {
    pub fn new(
        handler: Arc<dyn MessageHandler>,
        transport: Arc<dyn ChatTransport>,
        settings: &GatewaySettings,
    ) -> Self {
        Self {
            handler,
            transport,
            budget: Duration::from_secs(settings.response_budget_secs.max(1)),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Handle one inbound text message. Always resolves to a reply for the
    /// caller to show the user.
    pub async fn handle_message(&self, user_id: &str, text: &str, locale: Option<&str>) -> AgentReply {
        if !self.admit(user_id).await {
            info!(user = %user_id, "dropping message, previous run still active");
            return AgentReply::text(BUSY_NOTICE);
        }

        let handler = Arc::clone(&self.handler);
        let owned_user = user_id.to_string();
        let owned_text = text.to_string();
        let owned_locale = locale.map(str::to_string);
        let mut run = tokio::spawn(async move {
            handler
                .handle_message(&owned_user, &owned_text, owned_locale.as_deref())
                .await
        });

        match tokio::time::timeout(self.budget, &mut run).await {
            Ok(outcome) => {
                self.release(user_id).await;
                self.resolve(user_id, outcome)
            }
            Err(_) => {
                info!(user = %user_id, budget = ?self.budget, "response budget exhausted, delivery goes out-of-band");
                self.watch(user_id.to_string(), run);
                AgentReply::text(INTERIM_NOTICE)
            }
        }
    }

    /// Handle one inbound image message. Image analysis is quick enough to
    /// stay synchronous; only admission applies.
    pub async fn handle_image(
        &self,
        user_id: &str,
        bytes: &[u8],
        mime: &str,
        source_id: &str,
        caption: Option<&str>,
    ) -> AgentReply {
        if !self.admit(user_id).await {
            info!(user = %user_id, "dropping image, previous run still active");
            return AgentReply::text(BUSY_NOTICE);
        }

        let outcome = self
            .handler
            .handle_image(user_id, bytes, mime, source_id, caption)
            .await;
        self.release(user_id).await;
        match outcome {
            Ok(reply) => reply,
            Err(err) => {
                error!(user = %user_id, error = %err, "image run failed");
                AgentReply::text(UNAVAILABLE_NOTICE)
            }
        }
    }

    /// Admit the user if no run of theirs is in flight.
    async fn admit(&self, user_id: &str) -> bool {
        let mut active = self.active.lock().await;
        active.insert(user_id.to_string())
    }

    async fn release(&self, user_id: &str) {
        let mut active = self.active.lock().await;
        active.remove(user_id);
    }

    /// Watch a run past its budget: await it, deliver out-of-band, release.
    fn watch(
        &self,
        user_id: String,
        run: tokio::task::JoinHandle<ledgerbot_core::Result<AgentReply>>,
    ) {
        let transport = Arc::clone(&self.transport);
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            let reply = match run.await {
                Ok(Ok(reply)) => reply,
                Ok(Err(err)) => {
                    error!(user = %user_id, error = %err, "late run failed");
                    AgentReply::text(UNAVAILABLE_NOTICE)
                }
                Err(join_err) => {
                    error!(user = %user_id, error = %join_err, "late run aborted");
                    AgentReply::text(FAILED_NOTICE)
                }
            };
            if let Err(err) = transport.send_later(&user_id, &reply).await {
                warn!(user = %user_id, error = %err, "out-of-band delivery failed");
            }
            let mut active = active.lock().await;
            active.remove(&user_id);
        });
    }

    /// Map a finished run to the caller's reply.
    fn resolve(
        &self,
        user_id: &str,
        outcome: Result<ledgerbot_core::Result<AgentReply>, tokio::task::JoinError>,
    ) -> AgentReply {
        match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                error!(user = %user_id, error = %err, "run failed");
                AgentReply::text(UNAVAILABLE_NOTICE)
            }
            Err(join_err) => {
                error!(user = %user_id, error = %join_err, "run aborted");
                AgentReply::text(FAILED_NOTICE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InProcessTransport;
    use ledgerbot_core::error::Error;

    /// A handler that replies after a fixed delay.
    struct SlowHandler {
        delay: Duration,
        reply_text: String,
    }

    #[async_trait]
    impl MessageHandler for SlowHandler {
        async fn handle_message(
            &self,
            user_id: &str,
            _text: &str,
            _locale: Option<&str>,
        ) -> ledgerbot_core::Result<AgentReply> {
            tokio::time::sleep(self.delay).await;
            Ok(AgentReply::text(format!("{} for {user_id}", self.reply_text)))
        }

        async fn handle_image(
            &self,
            _user_id: &str,
            _bytes: &[u8],
            _mime: &str,
            _source_id: &str,
            _caption: Option<&str>,
        ) -> ledgerbot_core::Result<AgentReply> {
            tokio::time::sleep(self.delay).await;
            Ok(AgentReply::text("image done"))
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl MessageHandler for FailingHandler {
        async fn handle_message(
            &self,
            _user_id: &str,
            _text: &str,
            _locale: Option<&str>,
        ) -> ledgerbot_core::Result<AgentReply> {
            Err(Error::Internal("store unreachable".into()))
        }

        async fn handle_image(
            &self,
            _user_id: &str,
            _bytes: &[u8],
            _mime: &str,
            _source_id: &str,
            _caption: Option<&str>,
        ) -> ledgerbot_core::Result<AgentReply> {
            Err(Error::Internal("store unreachable".into()))
        }
    }

    fn controller_with(
        handler: Arc<dyn MessageHandler>,
        budget_secs: u64,
    ) -> (DeliveryController, Arc<InProcessTransport>) {
        let transport = Arc::new(InProcessTransport::new("test"));
        let settings = GatewaySettings {
            response_budget_secs: budget_secs,
        };
        let controller = DeliveryController::new(
            handler,
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            &settings,
        );
        (controller, transport)
    }

    async fn wait_for_late_send(transport: &InProcessTransport) -> (String, AgentReply) {
        for _ in 0..100 {
            if let Some(send) = transport.late_sends().await.into_iter().next() {
                return send;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no out-of-band delivery arrived");
    }

    #[tokio::test]
    async fn fast_run_returns_its_reply() {
        let handler = Arc::new(SlowHandler {
            delay: Duration::from_millis(1),
            reply_text: "done".into(),
        });
        let (controller, transport) = controller_with(handler, 5);

        let reply = controller.handle_message("u1", "hello", None).await;
        assert_eq!(reply.text, "done for u1");
        assert!(transport.late_sends().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_message_for_same_user_is_dropped() {
        let handler = Arc::new(SlowHandler {
            delay: Duration::from_millis(300),
            reply_text: "done".into(),
        });
        let (controller, _) = controller_with(handler, 5);
        let controller = Arc::new(controller);

        let first = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.handle_message("u1", "first", None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = controller.handle_message("u1", "second", None).await;
        assert_eq!(second.text, BUSY_NOTICE);

        let first = first.await.unwrap();
        assert_eq!(first.text, "done for u1");
    }

    #[tokio::test]
    async fn different_users_run_concurrently() {
        let handler = Arc::new(SlowHandler {
            delay: Duration::from_millis(200),
            reply_text: "done".into(),
        });
        let (controller, _) = controller_with(handler, 5);
        let controller = Arc::new(controller);

        let a = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.handle_message("u1", "hi", None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let b = controller.handle_message("u2", "hi", None).await;
        assert_eq!(b.text, "done for u2");
        assert_eq!(a.await.unwrap().text, "done for u1");
    }

    #[tokio::test]
    async fn budget_expiry_returns_interim_and_delivers_late() {
        let handler = Arc::new(SlowHandler {
            delay: Duration::from_millis(1500),
            reply_text: "slow answer".into(),
        });
        let (controller, transport) = controller_with(handler, 1);

        let reply = controller.handle_message("u1", "think hard", None).await;
        assert_eq!(reply.text, INTERIM_NOTICE);

        let (user, late) = wait_for_late_send(&transport).await;
        assert_eq!(user, "u1");
        assert_eq!(late.text, "slow answer for u1");
    }

    #[tokio::test]
    async fn user_is_released_after_late_delivery() {
        let handler = Arc::new(SlowHandler {
            delay: Duration::from_millis(1200),
            reply_text: "slow answer".into(),
        });
        let (controller, transport) = controller_with(handler, 1);

        let reply = controller.handle_message("u1", "first", None).await;
        assert_eq!(reply.text, INTERIM_NOTICE);
        wait_for_late_send(&transport).await;

        // Admission is open again once the watcher has delivered.
        let handler_done: bool = {
            let active = controller.active.lock().await;
            !active.contains("u1")
        };
        assert!(handler_done);
    }

    #[tokio::test]
    async fn failing_run_maps_to_unavailable_notice() {
        let (controller, _) = controller_with(Arc::new(FailingHandler), 5);
        let reply = controller.handle_message("u1", "hello", None).await;
        assert_eq!(reply.text, UNAVAILABLE_NOTICE);

        // The failure releases the user.
        let again = controller.handle_message("u1", "hello", None).await;
        assert_eq!(again.text, UNAVAILABLE_NOTICE);
    }

    #[tokio::test]
    async fn image_runs_synchronously_under_admission() {
        let handler = Arc::new(SlowHandler {
            delay: Duration::from_millis(1),
            reply_text: "done".into(),
        });
        let (controller, _) = controller_with(handler, 5);

        let reply = controller
            .handle_image("u1", &[0xFF], "image/jpeg", "photo_1", None)
            .await;
        assert_eq!(reply.text, "image done");

        // Released afterwards.
        let reply = controller
            .handle_image("u1", &[0xFF], "image/jpeg", "photo_1", None)
            .await;
        assert_eq!(reply.text, "image done");
    }
}
