use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Logging {
    /// Default filter directive, e.g. `warn` or `guard=debug`. The
    /// `PRAESIDIUM_LOG` environment variable adds directives on top.
    pub level: String,

    /// Append log lines to this file. Logs go to stderr when unset, which is
    /// usually discarded inside a helper process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}
