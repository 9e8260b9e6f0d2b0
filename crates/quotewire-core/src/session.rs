//! Session identity derivation.
//!
//! A session id is a human-traceable string: fixed prefix, a
//! normalized fragment of the user's handle plus their stable id when
//! one is known, and the creation instant in millis. The embedded
//! handle lets the client detect a user switch without an explicit
//! reset: if the active user's normalized handle no longer appears in
//! the held id, the id is stale and must be regenerated.

use chrono::Utc;
use quotewire_types::session::UserContext;

/// Fixed prefix for every session id.
pub const SESSION_PREFIX: &str = "quote_session";

/// Minimum plausible session id length. Shorter values are path
/// construction bugs upstream, not real sessions.
pub const MIN_SESSION_ID_LEN: usize = 10;

/// Lowercase a handle and strip everything outside `[a-z0-9]`.
pub fn normalize_handle(handle: &str) -> String {
    handle
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Derive a fresh session id.
///
/// Without user context the id is `quote_session_<millis>` -- a coarse
/// pre-authentication fallback with no collision guarantee. With user
/// context it is `quote_session_<handle>_<stableId>_<millis>`.
pub fn new_session_id(user: Option<&UserContext>) -> String {
    let millis = Utc::now().timestamp_millis();
    match user {
        None => format!("{SESSION_PREFIX}_{millis}"),
        Some(user) => {
            let handle = normalize_handle(&user.handle);
            format!("{SESSION_PREFIX}_{handle}_{}_{millis}", user.stable_id)
        }
    }
}

/// Whether a held session id still belongs to the given user.
///
/// Returns `false` when the id does not embed the user's normalized
/// handle, signalling that a new session must be started.
pub fn session_matches_user(session_id: &str, user: &UserContext) -> bool {
    let handle = normalize_handle(&user.handle);
    if handle.is_empty() {
        return true;
    }
    session_id.contains(&handle)
}

/// Sanity check on an incoming session id path segment.
pub fn is_plausible_session_id(session_id: &str) -> bool {
    session_id.len() >= MIN_SESSION_ID_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_non_alphanumerics() {
        assert_eq!(normalize_handle("Mike O'Brien"), "mikeobrien");
        assert_eq!(normalize_handle("jo-anne_42"), "joanne42");
        assert_eq!(normalize_handle("!!!"), "");
    }

    #[test]
    fn anonymous_session_id_has_prefix_and_millis() {
        let id = new_session_id(None);
        assert!(id.starts_with("quote_session_"));
        let suffix = id.strip_prefix("quote_session_").unwrap();
        assert!(suffix.parse::<i64>().is_ok());
    }

    #[test]
    fn user_session_id_embeds_handle_and_stable_id() {
        let user = UserContext::new("Mike O'Brien", "beta-17");
        let id = new_session_id(Some(&user));
        assert!(id.starts_with("quote_session_mikeobrien_beta-17_"));
    }

    #[test]
    fn user_switch_is_detected() {
        let mike = UserContext::new("Mike", "1");
        let dana = UserContext::new("Dana", "2");
        let id = new_session_id(Some(&mike));
        assert!(session_matches_user(&id, &mike));
        assert!(!session_matches_user(&id, &dana));
    }

    #[test]
    fn empty_normalized_handle_never_forces_reset() {
        let user = UserContext::new("!!!", "3");
        let id = new_session_id(None);
        assert!(session_matches_user(&id, &user));
    }

    #[test]
    fn plausibility_floor() {
        assert!(!is_plausible_session_id("abc"));
        assert!(is_plausible_session_id("quote_session_123"));
    }
}
