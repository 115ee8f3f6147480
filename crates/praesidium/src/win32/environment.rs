use crate::activation::ProcessEnvironment;
use std::io;
use tracing::trace;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Environment::GetCommandLineW;
use windows::Win32::System::Threading::GetCurrentProcessId;

/// The host process, as seen through Win32.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Environment;

struct ProcessEntry {
    pid: u32,
    parent_pid: u32,
    executable: String,
}

/// Process snapshot handle closed on drop.
struct Snapshot(HANDLE);

impl Snapshot {
    fn processes() -> io::Result<Self> {
        // SAFETY: the handle is owned by the returned value.
        let handle =
            unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }.map_err(io::Error::from)?;
        Ok(Self(handle))
    }

    fn entries(&self) -> io::Result<Vec<ProcessEntry>> {
        let mut entry = PROCESSENTRY32W {
            dwSize: size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };
        let mut entries = Vec::new();
        // SAFETY: `entry.dwSize` is set and the snapshot is open.
        unsafe { Process32FirstW(self.0, &mut entry) }.map_err(io::Error::from)?;
        loop {
            let name = &entry.szExeFile;
            let end = name.iter().position(|&unit| unit == 0).unwrap_or(name.len());
            entries.push(ProcessEntry {
                pid: entry.th32ProcessID,
                parent_pid: entry.th32ParentProcessID,
                executable: String::from_utf16_lossy(&name[..end]),
            });
            // SAFETY: as above.
            if unsafe { Process32NextW(self.0, &mut entry) }.is_err() {
                break;
            }
        }
        Ok(entries)
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        // SAFETY: the handle is open and owned by `self`.
        if let Err(err) = unsafe { CloseHandle(self.0) } {
            trace!(%err, "failed to close process snapshot");
        }
    }
}

fn not_found(what: String) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, what)
}

impl ProcessEnvironment for Win32Environment {
    fn current_executable(&self) -> io::Result<String> {
        let exe = std::env::current_exe()?;
        exe.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| not_found(format!("{} has no file name", exe.display())))
    }

    fn parent_executable(&self) -> io::Result<String> {
        let entries = Snapshot::processes()?.entries()?;
        // SAFETY: no preconditions.
        let pid = unsafe { GetCurrentProcessId() };
        let parent_pid = entries
            .iter()
            .find(|entry| entry.pid == pid)
            .map(|entry| entry.parent_pid)
            .ok_or_else(|| not_found(format!("process {pid} missing from snapshot")))?;
        // The parent may have exited and its pid been reused; the name is
        // whatever owns the pid now.
        entries
            .into_iter()
            .find(|entry| entry.pid == parent_pid)
            .map(|entry| entry.executable)
            .ok_or_else(|| not_found(format!("parent process {parent_pid} not running")))
    }

    fn command_line(&self) -> String {
        // SAFETY: the returned buffer lives as long as the process.
        unsafe {
            let line = GetCommandLineW();
            String::from_utf16_lossy(line.as_wide())
        }
    }

    fn arguments(&self) -> Vec<String> {
        std::env::args_os()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_lists_this_process() {
        // SAFETY: no preconditions.
        let pid = unsafe { GetCurrentProcessId() };
        let snapshot = Snapshot::processes().unwrap();
        let entries = snapshot.entries().unwrap();
        drop(snapshot);
        assert!(entries.iter().any(|entry| entry.pid == pid));
    }

    #[test]
    fn parent_is_resolved() {
        let parent = Win32Environment.parent_executable().unwrap();
        assert!(!parent.is_empty());
    }
}
