//! NLU session key derivation.
//!
//! The NLU provider scopes whatever conversational context it keeps by session
//! key, so each user must map to exactly one stable key: collisions would leak
//! one user's context into another's.

/// Session key scoping NLU calls for one user (opaque string).
pub type SessionKey = String;

/// Derive the NLU session key for a user. Pure and infallible: the key is the
/// string form of the user's stable platform identifier, so the same user
/// always yields the same key and distinct users never collide.
pub fn derive_session_key(user_id: &str) -> SessionKey {
    user_id.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_user_same_key() {
        assert_eq!(derive_session_key("42"), derive_session_key("42"));
    }

    #[test]
    fn distinct_users_distinct_keys() {
        assert_ne!(derive_session_key("42"), derive_session_key("43"));
    }

    #[test]
    fn key_is_string_form_of_user_id() {
        assert_eq!(derive_session_key("123456789"), "123456789");
    }

    #[test]
    fn surrounding_whitespace_does_not_change_the_key() {
        assert_eq!(derive_session_key(" 42 "), "42");
    }
}
