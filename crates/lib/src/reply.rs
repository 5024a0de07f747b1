//! Reply resolution: map a normalized NLU result to the text sent back to the user.

use crate::nlu::NluResult;

/// Sent when the provider classifies the text as its fallback intent (and for
/// empty input, which never reaches the provider).
pub const CLARIFICATION_REPLY: &str = "I'm not sure I understand. Can you rephrase that?";

/// Sent when the provider call failed; the captured reason is logged, never shown.
pub const UNAVAILABLE_REPLY: &str = "I'm having trouble understanding. Please try again later.";

/// Resolve the user-facing reply for an NLU result. Total over the three
/// variants; a matched result's fulfillment text passes through verbatim,
/// even when empty.
pub fn resolve_reply(result: &NluResult) -> String {
    match result {
        NluResult::Matched { reply_text } => reply_text.clone(),
        NluResult::Fallback => CLARIFICATION_REPLY.to_string(),
        NluResult::Unavailable { .. } => UNAVAILABLE_REPLY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matched_text_passes_through_verbatim() {
        let result = NluResult::Matched {
            reply_text: "Hi there!".to_string(),
        };
        assert_eq!(resolve_reply(&result), "Hi there!");
    }

    #[test]
    fn matched_empty_text_is_not_rewritten() {
        let result = NluResult::Matched {
            reply_text: String::new(),
        };
        assert_eq!(resolve_reply(&result), "");
    }

    #[test]
    fn fallback_and_unavailable_resolve_to_fixed_non_empty_copy() {
        assert_eq!(resolve_reply(&NluResult::Fallback), CLARIFICATION_REPLY);
        let unavailable = NluResult::Unavailable {
            reason: "quota exceeded".to_string(),
        };
        assert_eq!(resolve_reply(&unavailable), UNAVAILABLE_REPLY);
        assert!(!CLARIFICATION_REPLY.is_empty());
        assert!(!UNAVAILABLE_REPLY.is_empty());
    }

    #[test]
    fn unavailable_reply_is_independent_of_the_reason() {
        let a = NluResult::Unavailable {
            reason: "network".to_string(),
        };
        let b = NluResult::Unavailable {
            reason: "quota".to_string(),
        };
        assert_eq!(resolve_reply(&a), resolve_reply(&b));
    }
}
