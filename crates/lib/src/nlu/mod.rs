//! NLU abstraction and Dialogflow client.
//!
//! The `IntentResolver` seam normalizes the provider's response and failure
//! surface into [`NluResult`] so the rest of the pipeline never sees raw
//! provider errors.

mod dialogflow;

pub use dialogflow::{DialogflowClient, DialogflowError};

use crate::session::SessionKey;
use async_trait::async_trait;

/// One NLU request: constructed fresh per inbound message, never reused.
#[derive(Debug, Clone)]
pub struct NluQuery {
    pub session_key: SessionKey,
    pub text: String,
    pub language_tag: String,
}

/// Normalized outcome of one NLU call. The adapter collapses the provider's
/// raw response/error surface into exactly these three variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NluResult {
    /// The provider recognized an intent; `reply_text` is its fulfillment text
    /// (may be empty, that is the provider's responsibility).
    Matched { reply_text: String },
    /// The provider classified the text as its fallback/unrecognized intent.
    Fallback,
    /// The provider call failed (network, quota, timeout). The reason is for
    /// logging only and is never shown to the user.
    Unavailable { reason: String },
}

/// Resolves the intent of one user message against the NLU provider.
///
/// Production implementations are expected to always return `Ok`: provider
/// failures are classified as [`NluResult::Unavailable`] at this boundary.
/// The `Result` exists so an implementation that does fail surfaces at the
/// dispatcher's defensive boundary instead of tearing down the cycle.
#[async_trait]
pub trait IntentResolver: Send + Sync {
    async fn resolve_intent(&self, text: &str, session_key: &SessionKey)
        -> anyhow::Result<NluResult>;
}
