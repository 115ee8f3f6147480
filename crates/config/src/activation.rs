use serde::{Deserialize, Serialize};

/// Which host process gets the receive hook.
///
/// The client spawns several helper processes but only the one whose parent
/// is the client itself serves the debugging endpoint, so both names are
/// checked. Comparison is case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Activation {
    /// Executable name of the helper process this module guards.
    pub helper_executable: String,

    /// Executable name the helper's parent process must have.
    pub parent_executable: String,

    /// Launch argument that turns the guard off entirely. Must match one
    /// argument exactly.
    pub developer_flag: String,
}

impl Default for Activation {
    fn default() -> Self {
        Self {
            helper_executable: "steamwebhelper.exe".to_string(),
            parent_executable: "steam.exe".to_string(),
            developer_flag: "-dev".to_string(),
        }
    }
}
