use std::io;
use std::net::SocketAddrV4;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to query peer address: {0}")]
    PeerAddress(#[source] io::Error),

    #[error("Failed to query local address: {0}")]
    LocalAddress(#[source] io::Error),

    #[error("Connection table sizing call returned {0} instead of a required size")]
    TableSizing(u32),

    #[error("Failed to allocate {0} bytes for the connection table")]
    TableAllocation(usize),

    #[error("Failed to read the connection table: status {0}")]
    TableRead(u32),

    #[error("Connection table buffer holds {actual} bytes, rows need {required}")]
    TableTruncated { required: usize, actual: usize },

    #[error("No connection table row pairs with {local} <- {peer}")]
    NoMatchingConnection {
        local: SocketAddrV4,
        peer: SocketAddrV4,
    },

    #[error("Failed to open process {pid}: {source}")]
    OpenProcess {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("Failed to query image path of process {pid}: {source}")]
    ImagePath {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("Process {0} reported an empty image path")]
    EmptyImagePath(u32),

    #[error("Failed to enumerate logical drives: {0}")]
    LogicalDrives(#[source] io::Error),

    #[error("Failed to query device target of drive {drive}: {source}")]
    DeviceTarget {
        drive: char,
        #[source]
        source: io::Error,
    },
}
