#![forbid(unsafe_code)]

//! Translation of NT device-namespace paths (`\Device\HarddiskVolume3\...`)
//! into drive-letter paths (`C:\...`).

use crate::error::Error;
use std::io;
use tracing::{debug, trace};

pub const DEVICE_PREFIX: &str = "\\Device\\";

pub trait DosDevices: Send + Sync {
    /// Letters of every logical drive currently mounted.
    fn logical_drives(&self) -> io::Result<Vec<char>>;

    /// Device target of `drive`, e.g. `\Device\HarddiskVolume3` for `C`.
    fn device_target(&self, drive: char) -> io::Result<String>;
}

pub fn is_device_path(path: &str) -> bool {
    path.starts_with(DEVICE_PREFIX)
}

/// Rewrite a device-namespace path with the first drive whose device target
/// prefixes it. Paths not in the device namespace, and paths no drive maps,
/// come back unchanged.
pub fn to_dos_path(path: String, devices: &dyn DosDevices) -> String {
    if !is_device_path(&path) {
        return path;
    }
    match try_convert(&path, devices) {
        Ok(Some(converted)) => converted,
        Ok(None) => {
            debug!(%path, "no drive maps device path");
            path
        }
        Err(err) => {
            debug!(%path, %err, "device path conversion failed");
            path
        }
    }
}

fn try_convert(path: &str, devices: &dyn DosDevices) -> Result<Option<String>, Error> {
    let drives = devices.logical_drives().map_err(Error::LogicalDrives)?;
    for drive in drives {
        let target = match devices.device_target(drive) {
            Ok(target) => target,
            Err(source) => {
                trace!(%drive, %source, "skipping drive");
                continue;
            }
        };
        if let Some(rest) = strip_device(path, &target) {
            return Ok(Some(format!("{drive}:{rest}")));
        }
    }
    Ok(None)
}

/// Strip `target` from the front of `path` only at a component boundary, so
/// `\Device\HarddiskVolume1` never claims `\Device\HarddiskVolume10\x`.
fn strip_device<'a>(path: &'a str, target: &str) -> Option<&'a str> {
    if target.is_empty() {
        return None;
    }
    let rest = path.strip_prefix(target)?;
    (rest.is_empty() || rest.starts_with('\\')).then_some(rest)
}

/// Split a double-NUL terminated list of UTF-16 strings (`REG_MULTI_SZ`
/// layout). Stops at the first empty string.
pub fn parse_multi_sz(buffer: &[u16]) -> Vec<String> {
    buffer
        .split(|&unit| unit == 0)
        .take_while(|item| !item.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    struct Drives(Vec<(char, Option<&'static str>)>);

    impl DosDevices for Drives {
        fn logical_drives(&self) -> io::Result<Vec<char>> {
            Ok(self.0.iter().map(|(letter, _)| *letter).collect())
        }

        fn device_target(&self, drive: char) -> io::Result<String> {
            self.0
                .iter()
                .find(|(letter, _)| *letter == drive)
                .and_then(|(_, target)| target.map(str::to_owned))
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    struct NoDrives;

    impl DosDevices for NoDrives {
        fn logical_drives(&self) -> io::Result<Vec<char>> {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }

        fn device_target(&self, _drive: char) -> io::Result<String> {
            unreachable!("drives are never enumerated")
        }
    }

    fn standard() -> Drives {
        Drives(vec![
            ('A', None),
            ('C', Some("\\Device\\HarddiskVolume3")),
            ('D', Some("\\Device\\HarddiskVolume30")),
        ])
    }

    #[test]
    fn converts_device_paths() {
        let path = "\\Device\\HarddiskVolume3\\Program Files\\Steam\\steam.exe".to_string();
        assert_eq!(
            to_dos_path(path, &standard()),
            "C:\\Program Files\\Steam\\steam.exe"
        );
    }

    #[test]
    fn volume_prefix_must_end_at_a_component() {
        let path = "\\Device\\HarddiskVolume30\\Games\\app.exe".to_string();
        assert_eq!(to_dos_path(path, &standard()), "D:\\Games\\app.exe");
    }

    #[test]
    fn unmapped_device_paths_are_kept() {
        let path = "\\Device\\Mup\\server\\share\\app.exe".to_string();
        assert_eq!(to_dos_path(path.clone(), &standard()), path);
    }

    #[test]
    fn enumeration_failure_keeps_the_path() {
        let path = "\\Device\\HarddiskVolume3\\app.exe".to_string();
        assert_eq!(to_dos_path(path.clone(), &NoDrives), path);
    }

    #[test]
    fn drive_letter_paths_are_untouched() {
        let path = "C:\\Windows\\explorer.exe".to_string();
        assert_eq!(to_dos_path(path.clone(), &NoDrives), path);
    }

    #[test]
    fn multi_sz_is_split_on_nul() {
        let raw: Vec<u16> = "C:\\\0D:\\\0\0garbage".encode_utf16().collect();
        assert_eq!(parse_multi_sz(&raw), vec!["C:\\", "D:\\"]);
        assert!(parse_multi_sz(&[0, 0]).is_empty());
        assert!(parse_multi_sz(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn conversion_is_idempotent(
            volume in 1u8..40,
            segments in prop::collection::vec("[A-Za-z0-9 ._-]{1,12}", 0..5),
        ) {
            let tail: String = segments.iter().map(|s| format!("\\{s}")).collect();
            let path = format!("\\Device\\HarddiskVolume{volume}{tail}");
            let once = to_dos_path(path.clone(), &standard());
            let twice = to_dos_path(once.clone(), &standard());
            prop_assert_eq!(&once, &twice);

            match volume {
                3 => prop_assert_eq!(once, format!("C:{tail}")),
                30 => prop_assert_eq!(once, format!("D:{tail}")),
                _ => prop_assert_eq!(once, path),
            }
        }
    }
}
