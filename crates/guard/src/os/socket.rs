use crate::socket::{SocketHandle, SocketOps};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use windows::Win32::Networking::WinSock::{
    AF_INET, SEND_RECV_FLAGS, SOCKADDR, SOCKADDR_IN, SOCKADDR_STORAGE, SOCKET, SOCKET_ERROR,
    WSAGetLastError, WSASetLastError, closesocket, getpeername, getsockname, send,
};

/// Winsock calls on the raw handles seen by the intercepted receive.
#[derive(Debug, Default, Clone, Copy)]
pub struct WinSock;

type NameQuery = unsafe fn(SOCKET, *mut SOCKADDR, *mut i32) -> i32;

fn last_error() -> io::Error {
    // SAFETY: reads thread-local state only.
    io::Error::from_raw_os_error(unsafe { WSAGetLastError() }.0)
}

fn socket_name(socket: SocketHandle, query: NameQuery) -> io::Result<SocketAddrV4> {
    let mut storage = SOCKADDR_STORAGE::default();
    let mut len = size_of::<SOCKADDR_STORAGE>() as i32;
    // SAFETY: `storage` is large enough for any family and `len` says so.
    let status = unsafe {
        query(
            SOCKET(socket.0),
            (&raw mut storage).cast::<SOCKADDR>(),
            &mut len,
        )
    };
    if status == SOCKET_ERROR {
        return Err(last_error());
    }
    if storage.ss_family != AF_INET {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("address family {} is not IPv4", storage.ss_family.0),
        ));
    }

    // SAFETY: the family says the storage holds a SOCKADDR_IN, and
    // SOCKADDR_STORAGE is aligned for every socket address type.
    let addr = unsafe { &*(&raw const storage).cast::<SOCKADDR_IN>() };
    // SAFETY: every variant of the address union is a plain 4-byte integer view.
    let ip = unsafe { addr.sin_addr.S_un.S_addr };
    Ok(SocketAddrV4::new(
        Ipv4Addr::from(u32::from_be(ip)),
        u16::from_be(addr.sin_port),
    ))
}

impl SocketOps for WinSock {
    fn peer_addr(&self, socket: SocketHandle) -> io::Result<SocketAddrV4> {
        socket_name(socket, getpeername)
    }

    fn local_addr(&self, socket: SocketHandle) -> io::Result<SocketAddrV4> {
        socket_name(socket, getsockname)
    }

    fn send(&self, socket: SocketHandle, bytes: &[u8]) -> io::Result<usize> {
        // SAFETY: `bytes` outlives the synchronous call.
        let sent = unsafe { send(SOCKET(socket.0), bytes, SEND_RECV_FLAGS(0)) };
        if sent == SOCKET_ERROR {
            return Err(last_error());
        }
        Ok(sent as usize)
    }

    fn close(&self, socket: SocketHandle) -> io::Result<()> {
        // SAFETY: the handle came from the caller of the intercepted receive.
        if unsafe { closesocket(SOCKET(socket.0)) } == SOCKET_ERROR {
            return Err(last_error());
        }
        Ok(())
    }

    fn set_last_error(&self, code: i32) {
        // SAFETY: writes thread-local state only.
        unsafe { WSASetLastError(code) };
    }
}
