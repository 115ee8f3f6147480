use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Trust {
    /// File name the resolved peer path must contain, on top of matching the
    /// expected path exactly.
    ///
    /// # Note
    ///
    /// This second check is what still holds if the launch arguments carrying
    /// the expected path were tampered with.
    pub peer_executable: String,

    /// Launch flag that carries the expected absolute path of the trusted
    /// peer, e.g. `-steampath="C:\Program Files\Steam\steam.exe"`. The value
    /// may be quoted; an unquoted value ends after `.exe`, before ` -`, or at
    /// the end of the command line.
    pub peer_path_flag: String,
}

impl Default for Trust {
    fn default() -> Self {
        Self {
            peer_executable: "steam.exe".to_string(),
            peer_path_flag: "-steampath=".to_string(),
        }
    }
}
