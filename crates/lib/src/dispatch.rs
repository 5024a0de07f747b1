//! Message dispatch: one inbound message in, exactly one outbound reply out.
//!
//! Commands bypass the NLU pipeline; empty text short-circuits before the
//! provider; everything else flows session key -> NLU call -> reply resolution.
//! The outermost boundary converts any failure into the generic-error copy, so
//! no failure kind escapes a dispatch cycle.

use crate::channels::InboundMessage;
use crate::nlu::IntentResolver;
use crate::reply::{self, CLARIFICATION_REPLY};
use crate::session;
use std::sync::Arc;

/// Sent for /start.
pub const GREETING_REPLY: &str =
    "Hi! I'm an AI-powered bot. Ask me anything and I'll do my best to help!";

/// Sent for /help.
pub const HELP_REPLY: &str = "\u{1F916} AI Bot Help:\n\n\
Just send me a message and I'll try to understand and respond!\n\n\
Commands:\n\
/start - Start interacting with the bot\n\
/help - Show this help message";

/// Sent when the pipeline fails in an unclassified way; details go to the log.
pub const GENERIC_ERROR_REPLY: &str =
    "An error occurred while processing your request. The developers have been notified.";

/// Reply addressed to the user whose message started the cycle. The transport
/// layer delivers it to the conversation the inbound message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEvent {
    pub user_id: String,
    pub text: String,
}

/// Stateless per-message orchestrator. Holds only the injected NLU adapter;
/// each call is an independent transaction, so concurrent cycles need no locking.
pub struct Dispatcher {
    nlu: Arc<dyn IntentResolver>,
}

impl Dispatcher {
    pub fn new(nlu: Arc<dyn IntentResolver>) -> Self {
        Self { nlu }
    }

    /// Handle one inbound message. Always produces exactly one reply: any
    /// failure surfacing from the pipeline is logged with its context and
    /// mapped to the generic-error copy here, never propagated.
    pub async fn on_message(&self, msg: &InboundMessage) -> OutboundEvent {
        let text = match self.handle(msg).await {
            Ok(text) => text,
            Err(e) => {
                log::error!(
                    "dispatch failed (channel {}, user {}): {:#}",
                    msg.channel_id,
                    msg.user_id,
                    e
                );
                GENERIC_ERROR_REPLY.to_string()
            }
        };
        OutboundEvent {
            user_id: msg.user_id.clone(),
            text,
        }
    }

    async fn handle(&self, msg: &InboundMessage) -> anyhow::Result<String> {
        if let Some(ref command) = msg.command {
            return Ok(command_reply(command).to_string());
        }
        if msg.text.trim().is_empty() {
            return Ok(CLARIFICATION_REPLY.to_string());
        }
        let session_key = session::derive_session_key(&msg.user_id);
        let result = self.nlu.resolve_intent(&msg.text, &session_key).await?;
        Ok(reply::resolve_reply(&result))
    }
}

/// Static command table. Unknown commands get the clarification copy: they are
/// not natural language and never reach the provider.
fn command_reply(command: &str) -> &'static str {
    match command {
        "start" => GREETING_REPLY,
        "help" => HELP_REPLY,
        _ => CLARIFICATION_REPLY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlu::NluResult;
    use crate::reply::UNAVAILABLE_REPLY;
    use crate::session::SessionKey;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum MockBehavior {
        Matched(&'static str),
        Fallback,
        Unavailable,
        Fail,
    }

    /// Counting stand-in for the NLU adapter: records every invocation and the
    /// session keys it was called with.
    struct MockResolver {
        behavior: MockBehavior,
        calls: AtomicUsize,
        seen_keys: Mutex<Vec<SessionKey>>,
    }

    impl MockResolver {
        fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                calls: AtomicUsize::new(0),
                seen_keys: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IntentResolver for MockResolver {
        async fn resolve_intent(
            &self,
            _text: &str,
            session_key: &SessionKey,
        ) -> anyhow::Result<NluResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_keys
                .lock()
                .expect("seen_keys lock")
                .push(session_key.clone());
            match self.behavior {
                MockBehavior::Matched(text) => Ok(NluResult::Matched {
                    reply_text: text.to_string(),
                }),
                MockBehavior::Fallback => Ok(NluResult::Fallback),
                MockBehavior::Unavailable => Ok(NluResult::Unavailable {
                    reason: "network".to_string(),
                }),
                MockBehavior::Fail => Err(anyhow::anyhow!("injected pipeline failure")),
            }
        }
    }

    fn inbound(user_id: &str, text: &str, command: Option<&str>) -> InboundMessage {
        InboundMessage {
            channel_id: "telegram".to_string(),
            conversation_id: user_id.to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            command: command.map(|c| c.to_string()),
        }
    }

    fn dispatcher(behavior: MockBehavior) -> (Dispatcher, Arc<MockResolver>) {
        let mock = Arc::new(MockResolver::new(behavior));
        (Dispatcher::new(mock.clone()), mock)
    }

    #[tokio::test]
    async fn matched_intent_replies_with_fulfillment_text() {
        let (dispatcher, mock) = dispatcher(MockBehavior::Matched("Hi there!"));
        let out = dispatcher.on_message(&inbound("42", "hello", None)).await;
        assert_eq!(
            out,
            OutboundEvent {
                user_id: "42".to_string(),
                text: "Hi there!".to_string()
            }
        );
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn fallback_intent_replies_with_clarification_copy() {
        let (dispatcher, _mock) = dispatcher(MockBehavior::Fallback);
        let out = dispatcher.on_message(&inbound("42", "asdkjasd", None)).await;
        assert_eq!(out.text, CLARIFICATION_REPLY);
    }

    #[tokio::test]
    async fn unavailable_provider_replies_with_transient_failure_copy() {
        let (dispatcher, _mock) = dispatcher(MockBehavior::Unavailable);
        let out = dispatcher.on_message(&inbound("42", "hello", None)).await;
        assert_eq!(out.text, UNAVAILABLE_REPLY);
    }

    #[tokio::test]
    async fn empty_and_whitespace_text_never_reach_the_adapter() {
        let (dispatcher, mock) = dispatcher(MockBehavior::Matched("unused"));
        let out = dispatcher.on_message(&inbound("42", "", None)).await;
        assert_eq!(out.text, CLARIFICATION_REPLY);
        let out = dispatcher.on_message(&inbound("42", "   ", None)).await;
        assert_eq!(out.text, CLARIFICATION_REPLY);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn start_command_bypasses_the_adapter() {
        let (dispatcher, mock) = dispatcher(MockBehavior::Matched("unused"));
        let out = dispatcher
            .on_message(&inbound("7", "/start", Some("start")))
            .await;
        assert_eq!(out.user_id, "7");
        assert_eq!(out.text, GREETING_REPLY);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn help_command_replies_with_help_text() {
        let (dispatcher, mock) = dispatcher(MockBehavior::Matched("unused"));
        let out = dispatcher
            .on_message(&inbound("7", "/help", Some("help")))
            .await;
        assert_eq!(out.text, HELP_REPLY);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_command_gets_clarification_without_adapter_call() {
        let (dispatcher, mock) = dispatcher(MockBehavior::Matched("unused"));
        let out = dispatcher
            .on_message(&inbound("7", "/frobnicate", Some("frobnicate")))
            .await;
        assert_eq!(out.text, CLARIFICATION_REPLY);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn injected_failure_maps_to_generic_error_and_dispatcher_stays_usable() {
        let (dispatcher, mock) = dispatcher(MockBehavior::Fail);
        let out = dispatcher.on_message(&inbound("42", "hello", None)).await;
        assert_eq!(out.text, GENERIC_ERROR_REPLY);
        assert_eq!(out.user_id, "42");

        // The next cycle is an independent transaction.
        let out = dispatcher.on_message(&inbound("43", "/start", Some("start"))).await;
        assert_eq!(out.text, GREETING_REPLY);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn every_inbound_message_produces_exactly_one_reply_for_its_user() {
        let (dispatcher, _mock) = dispatcher(MockBehavior::Fallback);
        for user in ["1", "2", "42"] {
            let out = dispatcher.on_message(&inbound(user, "anything", None)).await;
            assert_eq!(out.user_id, user);
            assert!(!out.text.is_empty());
        }
    }

    #[tokio::test]
    async fn adapter_is_called_with_the_derived_session_key() {
        let (dispatcher, mock) = dispatcher(MockBehavior::Fallback);
        dispatcher.on_message(&inbound("42", "hello", None)).await;
        dispatcher.on_message(&inbound("42", "again", None)).await;
        dispatcher.on_message(&inbound("43", "hello", None)).await;
        let keys = mock.seen_keys.lock().expect("seen_keys lock").clone();
        assert_eq!(keys, vec!["42".to_string(), "42".to_string(), "43".to_string()]);
    }
}
