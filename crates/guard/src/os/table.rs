use crate::connection::{ConnectionTable, TableSnapshot};
use crate::error::Error;
use tracing::trace;
use windows::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, FALSE, NO_ERROR};
use windows::Win32::NetworkManagement::IpHelper::{GetExtendedTcpTable, TCP_TABLE_OWNER_PID_ALL};
use windows::Win32::Networking::WinSock::AF_INET;

/// Rows may be added between the sizing call and the read; retry that many
/// times before giving up.
const READ_ATTEMPTS: usize = 3;

/// IPv4 TCP table with owning pids, via `GetExtendedTcpTable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IpHelperTable;

fn query(buffer: Option<&mut Vec<u8>>, size: &mut u32) -> u32 {
    let table = buffer.map(|buffer| buffer.as_mut_ptr().cast());
    // SAFETY: a present buffer holds at least `size` bytes.
    unsafe {
        GetExtendedTcpTable(
            table,
            size,
            FALSE,
            AF_INET.0 as u32,
            TCP_TABLE_OWNER_PID_ALL,
            0,
        )
    }
}

impl ConnectionTable for IpHelperTable {
    fn snapshot(&self) -> Result<TableSnapshot, Error> {
        let mut size = 0u32;
        let status = query(None, &mut size);
        if status != ERROR_INSUFFICIENT_BUFFER.0 {
            return Err(Error::TableSizing(status));
        }

        let mut buffer = Vec::new();
        for _ in 0..READ_ATTEMPTS {
            let len = size as usize;
            buffer.clear();
            buffer
                .try_reserve_exact(len)
                .map_err(|_| Error::TableAllocation(len))?;
            buffer.resize(len, 0);

            let status = query(Some(&mut buffer), &mut size);
            if status == NO_ERROR.0 {
                return TableSnapshot::parse(&buffer);
            }
            if status != ERROR_INSUFFICIENT_BUFFER.0 {
                return Err(Error::TableRead(status));
            }
            trace!(size, "connection table grew, retrying");
        }
        Err(Error::TableRead(ERROR_INSUFFICIENT_BUFFER.0))
    }
}
