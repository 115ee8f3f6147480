#![forbid(unsafe_code)]

use crate::resolver::PeerResolver;
use crate::response::forbidden_response;
use crate::socket::{SocketHandle, SocketOps, WSAECONNABORTED};
use std::sync::Arc;
use tracing::{debug, warn};

/// Decision point consulted by the receive shim.
pub trait Gate: Send + Sync {
    fn is_trusted(&self, socket: SocketHandle) -> bool;

    /// Reject the connection and leave the thread's socket error set so the
    /// caller sees an abort.
    fn deny(&self, socket: SocketHandle);
}

/// Which peer path is trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    expected_path: Option<String>,
    executable: String,
}

impl TrustPolicy {
    /// `expected_path` is read once from the launch arguments; `None` trusts
    /// nobody. `executable` must appear in the resolved path as well; an
    /// empty `executable` also trusts nobody.
    pub fn new(expected_path: Option<String>, executable: impl Into<String>) -> Self {
        Self {
            expected_path,
            executable: executable.into(),
        }
    }

    pub fn expected_path(&self) -> Option<&str> {
        self.expected_path.as_deref()
    }

    pub fn permits(&self, resolved: &str) -> bool {
        !self.executable.is_empty()
            && self.expected_path.as_deref() == Some(resolved)
            && resolved.contains(&self.executable)
    }
}

/// Resolves the peer of each socket and enforces the [`TrustPolicy`].
pub struct PolicyGate {
    resolver: PeerResolver,
    policy: TrustPolicy,
    sockets: Arc<dyn SocketOps>,
    rejection: Vec<u8>,
}

impl PolicyGate {
    pub fn new(
        resolver: PeerResolver,
        policy: TrustPolicy,
        sockets: Arc<dyn SocketOps>,
        server: &str,
    ) -> Self {
        Self {
            resolver,
            policy,
            sockets,
            rejection: forbidden_response(server).into_bytes(),
        }
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    fn send_rejection(&self, socket: SocketHandle) {
        let mut sent = 0;
        while sent < self.rejection.len() {
            match self.sockets.send(socket, &self.rejection[sent..]) {
                Ok(0) => break,
                Ok(n) => sent += n,
                Err(err) => {
                    debug!(?socket, %err, "failed to send rejection");
                    break;
                }
            }
        }
        if sent < self.rejection.len() {
            debug!(?socket, sent, total = self.rejection.len(), "rejection truncated");
        }
    }
}

impl Gate for PolicyGate {
    fn is_trusted(&self, socket: SocketHandle) -> bool {
        let peer = self.resolver.resolve(socket);
        let trusted = self.policy.permits(peer.as_str());
        if !trusted {
            warn!(?socket, %peer, expected = ?self.policy.expected_path(), "untrusted peer");
        }
        trusted
    }

    fn deny(&self, socket: SocketHandle) {
        self.send_rejection(socket);
        if let Err(err) = self.sockets.close(socket) {
            debug!(?socket, %err, "failed to close rejected socket");
        }
        self.sockets.set_last_error(WSAECONNABORTED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEAM: &str = "C:\\Program Files\\Steam\\steam.exe";

    #[test]
    fn exact_path_with_executable_is_trusted() {
        let policy = TrustPolicy::new(Some(STEAM.to_string()), "steam.exe");
        assert!(policy.permits(STEAM));
    }

    #[test]
    fn each_condition_alone_is_not_enough() {
        // path matches, executable name missing from it
        let renamed = "C:\\Program Files\\Steam\\client.exe";
        let policy = TrustPolicy::new(Some(renamed.to_string()), "steam.exe");
        assert!(!policy.permits(renamed));

        // executable name present, path differs
        let policy = TrustPolicy::new(Some(STEAM.to_string()), "steam.exe");
        assert!(!policy.permits("D:\\Other\\steam.exe"));
    }

    #[test]
    fn comparison_is_exact() {
        let policy = TrustPolicy::new(Some(STEAM.to_string()), "steam.exe");
        assert!(!policy.permits(&STEAM.to_lowercase()));
        assert!(!policy.permits(&format!("{STEAM} ")));
    }

    #[test]
    fn sentinels_are_never_trusted() {
        let policy = TrustPolicy::new(Some(STEAM.to_string()), "steam.exe");
        assert!(!policy.permits("Unknown"));
        assert!(!policy.permits("System"));
    }

    #[test]
    fn empty_executable_trusts_nobody() {
        let evil = "C:\\Malware\\evil.exe";
        let policy = TrustPolicy::new(Some(evil.to_string()), "");
        assert!(!policy.permits(evil));
    }

    #[test]
    fn missing_expected_path_trusts_nobody() {
        let policy = TrustPolicy::new(None, "steam.exe");
        assert!(!policy.permits(STEAM));
        assert!(!policy.permits(""));
    }
}
