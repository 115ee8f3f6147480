#![deny(unsafe_code)]

//! Peer verification for loopback debugging endpoints.
//!
//! A connected socket is mapped to the process on its other end through the
//! system TCP table, and that process' image path is checked against the one
//! trusted path. Everything here works through the port traits
//! ([`SocketOps`], [`ConnectionTable`], [`ProcessQuery`], [`DosDevices`]) so
//! the decision logic runs without the OS; the Win32 backends live in
//! [`os`].

pub mod cmdline;
pub mod connection;
mod error;
pub mod identity;
pub mod policy;
pub mod resolver;
pub mod response;
pub mod shim;
pub mod socket;

#[cfg(windows)]
pub mod os;

pub use cmdline::{flag_value, has_argument};
pub use connection::{Connection, ConnectionTable, TableSnapshot, TcpRow};
pub use error::Error;
pub use identity::PeerProcess;
pub use policy::{Gate, PolicyGate, TrustPolicy};
pub use resolver::{DosDevices, PeerResolver, ProcessHandle, ProcessQuery, ResolverServices};
pub use response::forbidden_response;
pub use shim::{Receive, RecvArgs, RecvShim};
pub use socket::{SOCKET_ERROR, SocketHandle, SocketOps, WSAECONNABORTED};
