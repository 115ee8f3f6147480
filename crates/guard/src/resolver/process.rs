#![forbid(unsafe_code)]

use crate::error::Error;
use std::io;
use tracing::trace;

/// Rights requested when opening a process for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// `PROCESS_QUERY_LIMITED_INFORMATION`, granted even for most elevated
    /// processes.
    Limited,
    /// `PROCESS_QUERY_INFORMATION`.
    Full,
}

/// API used to read a process image path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathQuery {
    /// `QueryFullProcessImageNameW`, returns a drive-letter path.
    FullImageName,
    /// `GetProcessImageFileNameW`, returns a device-namespace path.
    ImageFileName,
}

/// Tried in order; the first handle that opens wins.
pub const ACCESS_ORDER: [AccessLevel; 2] = [AccessLevel::Limited, AccessLevel::Full];

/// Tried in order; the first non-empty path wins.
pub const PATH_ORDER: [PathQuery; 2] = [PathQuery::FullImageName, PathQuery::ImageFileName];

/// An open process. Dropping it releases the OS handle.
pub trait ProcessHandle {
    fn image_path(&self, query: PathQuery) -> io::Result<String>;
}

pub trait ProcessQuery: Send + Sync {
    fn open(&self, pid: u32, access: AccessLevel) -> io::Result<Box<dyn ProcessHandle>>;
}

/// Open `pid` with the least privilege that works.
pub fn open_for_query(query: &dyn ProcessQuery, pid: u32) -> Result<Box<dyn ProcessHandle>, Error> {
    let mut last_err = None;
    for access in ACCESS_ORDER {
        match query.open(pid, access) {
            Ok(handle) => return Ok(handle),
            Err(err) => {
                trace!(pid, ?access, %err, "open process failed");
                last_err = Some(err);
            }
        }
    }
    Err(Error::OpenProcess {
        pid,
        source: last_err.unwrap_or_else(|| io::Error::other("no access level attempted")),
    })
}

/// Read the image path of an opened process, modern API first.
pub fn image_path(handle: &dyn ProcessHandle, pid: u32) -> Result<String, Error> {
    let mut last_err = None;
    for query in PATH_ORDER {
        match handle.image_path(query) {
            Ok(path) if !path.is_empty() => return Ok(path),
            Ok(_) => {
                trace!(pid, ?query, "image path query returned nothing");
            }
            Err(err) => {
                trace!(pid, ?query, %err, "image path query failed");
                last_err = Some(err);
            }
        }
    }
    match last_err {
        Some(source) => Err(Error::ImagePath { pid, source }),
        None => Err(Error::EmptyImagePath(pid)),
    }
}
