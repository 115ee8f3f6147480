#![forbid(unsafe_code)]

mod device_path;
mod process;

pub use device_path::{DEVICE_PREFIX, DosDevices, is_device_path, parse_multi_sz, to_dos_path};
pub use process::{
    ACCESS_ORDER, AccessLevel, PATH_ORDER, PathQuery, ProcessHandle, ProcessQuery, image_path,
    open_for_query,
};

use crate::connection::{Connection, ConnectionTable};
use crate::error::Error;
use crate::identity::{PeerProcess, SYSTEM_PIDS};
use crate::socket::{SocketHandle, SocketOps};
use std::sync::Arc;
use tracing::debug;

/// OS access the resolver needs.
pub struct ResolverServices {
    pub sockets: Arc<dyn SocketOps>,
    pub table: Box<dyn ConnectionTable>,
    pub processes: Box<dyn ProcessQuery>,
    pub devices: Box<dyn DosDevices>,
}

/// Finds the process on the other end of a connected socket.
///
/// Nothing is cached: the table is snapshotted and the owner queried on
/// every call, since ports get recycled between connections.
pub struct PeerResolver {
    services: ResolverServices,
}

impl PeerResolver {
    pub fn new(services: ResolverServices) -> Self {
        Self { services }
    }

    /// Resolve the owner of the remote end of `socket`. Every failure is
    /// folded into [`PeerProcess::Unknown`].
    pub fn resolve(&self, socket: SocketHandle) -> PeerProcess {
        match self.try_resolve(socket) {
            Ok(peer) => {
                debug!(?socket, %peer, "peer resolved");
                peer
            }
            Err(err) => {
                debug!(?socket, %err, "peer resolution failed");
                PeerProcess::Unknown
            }
        }
    }

    /// [`PeerResolver::resolve`] as a path string: the image path, `System`
    /// or `Unknown`.
    pub fn resolve_path(&self, socket: SocketHandle) -> String {
        self.resolve(socket).to_string()
    }

    fn try_resolve(&self, socket: SocketHandle) -> Result<PeerProcess, Error> {
        let sockets = &self.services.sockets;
        let peer = sockets.peer_addr(socket).map_err(Error::PeerAddress)?;
        let snapshot = self.services.table.snapshot()?;
        let local = sockets.local_addr(socket).map_err(Error::LocalAddress)?;

        let connection = Connection { local, peer };
        let row = snapshot
            .find_counterpart(&connection)
            .ok_or(Error::NoMatchingConnection { local, peer })?;
        self.identify(row.owning_pid)
    }

    fn identify(&self, pid: u32) -> Result<PeerProcess, Error> {
        if SYSTEM_PIDS.contains(&pid) {
            return Ok(PeerProcess::System);
        }
        let handle = open_for_query(self.services.processes.as_ref(), pid)?;
        let path = image_path(handle.as_ref(), pid)?;
        drop(handle);
        Ok(PeerProcess::Image(to_dos_path(
            path,
            self.services.devices.as_ref(),
        )))
    }
}
