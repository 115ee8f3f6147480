use super::from_wide;
use crate::resolver::{DosDevices, parse_multi_sz};
use std::io;
use windows::Win32::Storage::FileSystem::{GetLogicalDriveStringsW, QueryDosDeviceW};
use windows::core::PCWSTR;

/// Room for every drive root (`X:\` plus NUL) and the final NUL.
const DRIVE_LIST_CAPACITY: usize = 26 * 4 + 1;

const TARGET_CAPACITY: usize = 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32DosDevices;

impl DosDevices for Win32DosDevices {
    fn logical_drives(&self) -> io::Result<Vec<char>> {
        let mut buffer = vec![0u16; DRIVE_LIST_CAPACITY];
        // SAFETY: the slice carries its own length.
        let len = unsafe { GetLogicalDriveStringsW(Some(&mut buffer)) } as usize;
        if len == 0 {
            return Err(io::Error::last_os_error());
        }
        if len > buffer.len() {
            return Err(io::Error::other(format!(
                "drive list needs {len} units, have {}",
                buffer.len()
            )));
        }
        Ok(parse_multi_sz(&buffer[..len])
            .iter()
            .filter_map(|root| root.chars().next())
            .collect())
    }

    fn device_target(&self, drive: char) -> io::Result<String> {
        let name: Vec<u16> = format!("{drive}:").encode_utf16().chain([0]).collect();
        let mut buffer = vec![0u16; TARGET_CAPACITY];
        // SAFETY: `name` is NUL-terminated and outlives the call.
        let len = unsafe { QueryDosDeviceW(PCWSTR(name.as_ptr()), Some(&mut buffer)) } as usize;
        if len == 0 {
            return Err(io::Error::last_os_error());
        }
        // The first string of the list is the active mapping.
        Ok(from_wide(&buffer[..len]))
    }
}
