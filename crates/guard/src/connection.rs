#![forbid(unsafe_code)]

use crate::error::Error;
use std::net::{Ipv4Addr, SocketAddrV4};
use tracing::trace;

/// Size of one `MIB_TCPROW_OWNER_PID`: six `u32` fields.
pub const ROW_SIZE: usize = 6 * size_of::<u32>();

const HEADER_SIZE: usize = size_of::<u32>();

/// One TCP association seen from our side, in host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub local: SocketAddrV4,
    pub peer: SocketAddrV4,
}

/// A row of the OS connection table, seen from the owning process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpRow {
    pub state: u32,
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
    pub owning_pid: u32,
}

impl TcpRow {
    /// Build a row from the raw table fields. Addresses and ports are stored
    /// in network order; ports occupy the low 16 bits of their field.
    pub fn from_network_order(
        state: u32,
        local_addr: u32,
        local_port: u32,
        remote_addr: u32,
        remote_port: u32,
        owning_pid: u32,
    ) -> Self {
        Self {
            state,
            local: endpoint(local_addr, local_port),
            remote: endpoint(remote_addr, remote_port),
            owning_pid,
        }
    }

    /// Whether this row is the other side of `connection`: the owner's local
    /// end is our peer and its remote end is us.
    pub fn is_counterpart_of(&self, connection: &Connection) -> bool {
        self.remote == connection.local && self.local == connection.peer
    }
}

fn endpoint(addr: u32, port: u32) -> SocketAddrV4 {
    SocketAddrV4::new(
        Ipv4Addr::from(u32::from_be(addr)),
        u16::from_be(port as u16),
    )
}

/// Point-in-time copy of the IPv4 connection table with owning pids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSnapshot {
    rows: Vec<TcpRow>,
}

impl TableSnapshot {
    pub fn new(rows: Vec<TcpRow>) -> Self {
        Self { rows }
    }

    /// Decode a `MIB_TCPTABLE_OWNER_PID` buffer: a `u32` row count followed
    /// by that many rows, in native byte order.
    pub fn parse(buffer: &[u8]) -> Result<Self, Error> {
        let Some(header) = buffer.get(..HEADER_SIZE) else {
            return Err(Error::TableTruncated {
                required: HEADER_SIZE,
                actual: buffer.len(),
            });
        };
        let count = read_u32(header) as usize;
        let required = count
            .checked_mul(ROW_SIZE)
            .and_then(|rows| rows.checked_add(HEADER_SIZE))
            .unwrap_or(usize::MAX);
        if buffer.len() < required {
            return Err(Error::TableTruncated {
                required,
                actual: buffer.len(),
            });
        }

        let rows = buffer[HEADER_SIZE..required]
            .chunks_exact(ROW_SIZE)
            .map(|raw| {
                let field = |i: usize| read_u32(&raw[i * 4..i * 4 + 4]);
                TcpRow::from_network_order(
                    field(0),
                    field(1),
                    field(2),
                    field(3),
                    field(4),
                    field(5),
                )
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[TcpRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row, in table order, that is the other side of `connection`.
    pub fn find_counterpart(&self, connection: &Connection) -> Option<&TcpRow> {
        let found = self
            .rows
            .iter()
            .find(|row| row.is_counterpart_of(connection));
        trace!(rows = self.rows.len(), ?connection, ?found, "connection table scanned");
        found
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    u32::from_ne_bytes(raw)
}

pub trait ConnectionTable: Send + Sync {
    /// Take a fresh snapshot of every IPv4 TCP connection with its owner.
    fn snapshot(&self) -> Result<TableSnapshot, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw_addr(ip: Ipv4Addr) -> u32 {
        u32::from_ne_bytes(ip.octets())
    }

    fn raw_port(port: u16) -> u32 {
        u32::from(port.to_be())
    }

    fn encode(rows: &[(u32, Ipv4Addr, u16, Ipv4Addr, u16, u32)], declared: u32) -> Vec<u8> {
        let mut buffer = declared.to_ne_bytes().to_vec();
        for &(state, la, lp, ra, rp, pid) in rows {
            for field in [state, raw_addr(la), raw_port(lp), raw_addr(ra), raw_port(rp), pid] {
                buffer.extend_from_slice(&field.to_ne_bytes());
            }
        }
        buffer
    }

    fn addr(port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)
    }

    #[test]
    fn row_fields_are_converted_to_host_order() {
        let row = TcpRow::from_network_order(
            5,
            raw_addr(Ipv4Addr::new(10, 1, 2, 3)),
            raw_port(8080),
            raw_addr(Ipv4Addr::LOCALHOST),
            raw_port(51234),
            42,
        );
        assert_eq!(row.local, SocketAddrV4::new(Ipv4Addr::new(10, 1, 2, 3), 8080));
        assert_eq!(row.remote, addr(51234));
        assert_eq!(row.owning_pid, 42);
    }

    #[test]
    fn parse_reads_declared_rows() {
        let buffer = encode(
            &[
                (5, Ipv4Addr::LOCALHOST, 8080, Ipv4Addr::LOCALHOST, 50000, 10),
                (5, Ipv4Addr::LOCALHOST, 50000, Ipv4Addr::LOCALHOST, 8080, 20),
            ],
            2,
        );
        let snapshot = TableSnapshot::parse(&buffer).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.rows()[1].local, addr(50000));
        assert_eq!(snapshot.rows()[1].owning_pid, 20);
    }

    #[test]
    fn parse_ignores_trailing_slack() {
        let mut buffer = encode(
            &[(5, Ipv4Addr::LOCALHOST, 8080, Ipv4Addr::LOCALHOST, 50000, 10)],
            1,
        );
        buffer.extend_from_slice(&[0u8; 7]);
        assert_eq!(TableSnapshot::parse(&buffer).unwrap().len(), 1);
    }

    #[test]
    fn parse_rejects_truncated_buffers() {
        assert!(matches!(
            TableSnapshot::parse(&[1, 0]),
            Err(Error::TableTruncated { required: 4, actual: 2 })
        ));

        let buffer = encode(
            &[(5, Ipv4Addr::LOCALHOST, 8080, Ipv4Addr::LOCALHOST, 50000, 10)],
            3,
        );
        assert!(matches!(
            TableSnapshot::parse(&buffer),
            Err(Error::TableTruncated { .. })
        ));
    }

    #[test]
    fn empty_table_parses() {
        let snapshot = TableSnapshot::parse(&0u32.to_ne_bytes()).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn counterpart_is_the_mirrored_row() {
        // We serve on 8080; the peer connected from 50000.
        let ours = Connection {
            local: addr(8080),
            peer: addr(50000),
        };
        let snapshot = TableSnapshot::new(vec![
            // our own row, same orientation as `ours`
            TcpRow {
                state: 5,
                local: addr(8080),
                remote: addr(50000),
                owning_pid: 1,
            },
            // the listener
            TcpRow {
                state: 2,
                local: addr(8080),
                remote: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
                owning_pid: 1,
            },
            // the peer's row
            TcpRow {
                state: 5,
                local: addr(50000),
                remote: addr(8080),
                owning_pid: 77,
            },
        ]);

        let row = snapshot.find_counterpart(&ours).unwrap();
        assert_eq!(row.owning_pid, 77);
    }

    #[test]
    fn first_counterpart_wins() {
        let ours = Connection {
            local: addr(8080),
            peer: addr(50000),
        };
        let mirrored = |pid| TcpRow {
            state: 5,
            local: addr(50000),
            remote: addr(8080),
            owning_pid: pid,
        };
        let snapshot = TableSnapshot::new(vec![mirrored(3), mirrored(4)]);
        assert_eq!(snapshot.find_counterpart(&ours).unwrap().owning_pid, 3);
    }

    #[test]
    fn no_counterpart_when_ports_differ() {
        let ours = Connection {
            local: addr(8080),
            peer: addr(50000),
        };
        let snapshot = TableSnapshot::new(vec![TcpRow {
            state: 5,
            local: addr(50001),
            remote: addr(8080),
            owning_pid: 9,
        }]);
        assert!(snapshot.find_counterpart(&ours).is_none());
    }
}
