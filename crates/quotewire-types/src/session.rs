//! User context carried into session identity and outbound events.

use serde::{Deserialize, Serialize};

/// The user-identity fields the relay knows about.
///
/// `handle` is the user-facing name (embedded, normalized, into the
/// session id); `stable_id` is an opaque identifier that survives
/// handle changes; `role` is forwarded to the automation workflow for
/// personalization and never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub handle: String,
    pub stable_id: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl UserContext {
    pub fn new(handle: impl Into<String>, stable_id: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            stable_id: stable_id.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}
