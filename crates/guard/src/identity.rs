#![forbid(unsafe_code)]

use std::fmt;

/// Pids the OS reserves for the idle and kernel pseudo-processes. They own
/// connections but have no image to query.
pub const SYSTEM_PIDS: [u32; 2] = [0, 4];

/// Who owns the remote end of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerProcess {
    /// A reserved OS pseudo-process.
    System,
    /// A regular process and its absolute image path, in drive-letter form
    /// whenever a drive maps its device.
    Image(String),
    /// Ownership could not be established.
    Unknown,
}

impl PeerProcess {
    pub const SYSTEM: &'static str = "System";
    pub const UNKNOWN: &'static str = "Unknown";

    /// The path string handed to the trust policy.
    pub fn as_str(&self) -> &str {
        match self {
            PeerProcess::System => Self::SYSTEM,
            PeerProcess::Image(path) => path,
            PeerProcess::Unknown => Self::UNKNOWN,
        }
    }
}

impl fmt::Display for PeerProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
