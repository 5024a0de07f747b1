//! Inbound message from a channel: delivered to the dispatcher for one relay cycle.

/// One user message from a channel. Immutable, scoped to a single dispatch
/// cycle; nothing derived from it outlives the cycle.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel_id: String,
    /// Where the reply goes (e.g. Telegram chat_id).
    pub conversation_id: String,
    /// Stable identity of the sender (e.g. Telegram user id); scopes the NLU session.
    pub user_id: String,
    pub text: String,
    /// Leading bot command ("start", "help"), if the message carried one.
    pub command: Option<String>,
}
