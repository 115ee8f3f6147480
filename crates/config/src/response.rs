use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Response {
    /// Value of the `Server` header in the 403 sent to rejected peers.
    pub server: String,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            server: "CEFSecureHook".to_string(),
        }
    }
}
