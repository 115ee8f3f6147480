use super::from_wide;
use crate::resolver::{AccessLevel, PathQuery, ProcessHandle, ProcessQuery};
use std::io;
use tracing::trace;
use windows::Win32::Foundation::{CloseHandle, FALSE, HANDLE, MAX_PATH};
use windows::Win32::System::ProcessStatus::GetProcessImageFileNameW;
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_INFORMATION, PROCESS_QUERY_LIMITED_INFORMATION,
    QueryFullProcessImageNameW,
};
use windows::core::PWSTR;

/// Extended-length paths can exceed `MAX_PATH`.
const PATH_CAPACITY: usize = 32 * 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Processes;

impl ProcessQuery for Win32Processes {
    fn open(&self, pid: u32, access: AccessLevel) -> io::Result<Box<dyn ProcessHandle>> {
        let rights = match access {
            AccessLevel::Limited => PROCESS_QUERY_LIMITED_INFORMATION,
            AccessLevel::Full => PROCESS_QUERY_INFORMATION,
        };
        // SAFETY: the returned handle is owned by `OwnedProcess` and closed once.
        let handle = unsafe { OpenProcess(rights, FALSE, pid) }.map_err(io::Error::from)?;
        Ok(Box::new(OwnedProcess(handle)))
    }
}

/// Process handle closed on drop.
struct OwnedProcess(HANDLE);

impl OwnedProcess {
    fn full_image_name(&self) -> io::Result<String> {
        let mut buffer = vec![0u16; PATH_CAPACITY];
        let mut len = buffer.len() as u32;
        // SAFETY: `len` is the capacity of `buffer` in UTF-16 units.
        unsafe {
            QueryFullProcessImageNameW(
                self.0,
                PROCESS_NAME_WIN32,
                PWSTR(buffer.as_mut_ptr()),
                &mut len,
            )
        }
        .map_err(io::Error::from)?;
        Ok(from_wide(&buffer[..len as usize]))
    }

    fn image_file_name(&self) -> io::Result<String> {
        let mut buffer = vec![0u16; MAX_PATH as usize];
        // SAFETY: the slice carries its own length.
        let len = unsafe { GetProcessImageFileNameW(self.0, &mut buffer) };
        if len == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(from_wide(&buffer[..len as usize]))
    }
}

impl ProcessHandle for OwnedProcess {
    fn image_path(&self, query: PathQuery) -> io::Result<String> {
        match query {
            PathQuery::FullImageName => self.full_image_name(),
            PathQuery::ImageFileName => self.image_file_name(),
        }
    }
}

impl Drop for OwnedProcess {
    fn drop(&mut self) {
        // SAFETY: the handle is open and owned by `self`.
        if let Err(err) = unsafe { CloseHandle(self.0) } {
            trace!(%err, "failed to close process handle");
        }
    }
}
