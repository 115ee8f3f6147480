#![forbid(unsafe_code)]

use std::fmt;
use std::io;
use std::net::SocketAddrV4;

/// Return value of a failed Winsock call.
pub const SOCKET_ERROR: i32 = -1;

/// `WSAECONNABORTED`: software caused connection abort.
pub const WSAECONNABORTED: i32 = 10053;

/// Raw OS socket handle as seen by the intercepted primitive.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketHandle(pub usize);

impl fmt::Debug for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SocketHandle({:#x})", self.0)
    }
}

/// The socket calls the resolver and the gate need.
///
/// Addresses are IPv4 endpoints in host order. Calls are made on the thread
/// that is inside the intercepted receive, so implementations must not
/// route back through that receive.
pub trait SocketOps: Send + Sync {
    /// Address of the remote end of a connected socket.
    fn peer_addr(&self, socket: SocketHandle) -> io::Result<SocketAddrV4>;

    /// Address the socket is bound to locally.
    fn local_addr(&self, socket: SocketHandle) -> io::Result<SocketAddrV4>;

    /// Write bytes synchronously; returns how many were accepted.
    fn send(&self, socket: SocketHandle, bytes: &[u8]) -> io::Result<usize>;

    fn close(&self, socket: SocketHandle) -> io::Result<()>;

    /// Set the calling thread's last socket error.
    fn set_last_error(&self, code: i32);
}
