#![forbid(unsafe_code)]

use crate::policy::Gate;
use crate::socket::{SOCKET_ERROR, SocketHandle};
use tracing::debug;

/// Arguments of an intercepted `recv`, passed through untouched.
///
/// The buffer stays a raw pointer: the shim never reads or writes it, it
/// only hands it back to the original primitive.
#[derive(Debug, Clone, Copy)]
pub struct RecvArgs {
    pub socket: SocketHandle,
    pub buf: *mut u8,
    pub len: i32,
    pub flags: i32,
}

/// The receive primitive as it was before interception.
pub trait Receive: Send + Sync {
    fn recv(&self, args: RecvArgs) -> i32;
}

/// Stand-in for `recv`: receives first, then lets the gate decide whether
/// the caller gets the result.
pub struct RecvShim<R, G> {
    original: R,
    gate: G,
}

impl<R: Receive, G: Gate> RecvShim<R, G> {
    /// `original` is captured once here and used for every call.
    pub fn new(original: R, gate: G) -> Self {
        Self { original, gate }
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn call(&self, args: RecvArgs) -> i32 {
        let received = self.original.recv(args);
        if received <= 0 {
            return received;
        }
        if self.gate.is_trusted(args.socket) {
            return received;
        }

        debug!(socket = ?args.socket, received, "denying connection");
        // Bytes already copied into the caller's buffer are left there; the
        // return code tells the caller to discard them.
        self.gate.deny(args.socket);
        SOCKET_ERROR
    }
}
