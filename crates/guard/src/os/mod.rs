#![allow(unsafe_code)]

//! Win32 implementations of the resolver ports.

mod devices;
mod process;
mod socket;
mod table;

pub use devices::Win32DosDevices;
pub use process::Win32Processes;
pub use socket::WinSock;
pub use table::IpHelperTable;

use crate::resolver::ResolverServices;
use crate::socket::SocketOps;
use std::sync::Arc;

/// Resolver services backed by the live system.
pub fn system_services(sockets: Arc<dyn SocketOps>) -> ResolverServices {
    ResolverServices {
        sockets,
        table: Box::new(IpHelperTable),
        processes: Box::new(Win32Processes),
        devices: Box::new(Win32DosDevices),
    }
}

/// Decode a UTF-16 buffer up to the first NUL.
fn from_wide(buffer: &[u16]) -> String {
    let end = buffer.iter().position(|&unit| unit == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..end])
}
