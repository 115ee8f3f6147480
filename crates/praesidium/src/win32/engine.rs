use crate::hook::{Address, HookEngine, HookError, contained};
use minhook::MinHook;
use std::ffi::c_void;
use std::io;
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows::core::{PCSTR, PCWSTR};

/// MinHook, initialized lazily by the crate on first use.
///
/// The crate panics when `MH_Initialize` or `MH_Uninitialize` fail, so every
/// call goes through [`contained`] and comes back as a [`HookError`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MinHookEngine;

fn status(status: impl std::fmt::Debug) -> String {
    format!("{status:?}")
}

impl HookEngine for MinHookEngine {
    fn create(&self, target: Address, detour: Address) -> Result<Address, HookError> {
        contained(|| {
            // SAFETY: `target` is an exported function and `detour` has the
            // same signature and calling convention.
            unsafe { MinHook::create_hook(target as *mut c_void, detour as *mut c_void) }
                .map(|original| original as Address)
                .map_err(status)
        })
        .map_err(|status| HookError::Create { target, status })
    }

    fn enable(&self, target: Address) -> Result<(), HookError> {
        // SAFETY: the hook at `target` was created by `create`.
        contained(|| unsafe { MinHook::enable_hook(target as *mut c_void) }.map_err(status))
            .map_err(|status| HookError::Enable { target, status })
    }

    fn disable(&self, target: Address) -> Result<(), HookError> {
        // SAFETY: as above.
        contained(|| unsafe { MinHook::disable_hook(target as *mut c_void) }.map_err(status))
            .map_err(|status| HookError::Disable { target, status })
    }

    fn remove(&self, target: Address) -> Result<(), HookError> {
        // SAFETY: as above.
        contained(|| unsafe { MinHook::remove_hook(target as *mut c_void) }.map_err(status))
            .map_err(|status| HookError::Remove { target, status })
    }

    fn shutdown(&self) -> Result<(), HookError> {
        contained(|| {
            MinHook::uninitialize();
            Ok(())
        })
        .map_err(HookError::Shutdown)
    }
}

/// Address of `symbol` exported by `module`.
///
/// The module must already be loaded by the host; it is never loaded from
/// here, as this runs under the loader lock. A host without it gets no
/// interception.
pub fn export_address(module: &'static str, symbol: &'static str) -> Result<Address, HookError> {
    let wide: Vec<u16> = module.encode_utf16().chain([0]).collect();
    // SAFETY: `wide` is NUL-terminated and outlives the call.
    let library = unsafe { GetModuleHandleW(PCWSTR(wide.as_ptr())) }.map_err(|err| {
        HookError::ModuleNotLoaded {
            module,
            source: io::Error::from(err),
        }
    })?;

    let name: Vec<u8> = symbol.bytes().chain([0]).collect();
    // SAFETY: `name` is NUL-terminated and outlives the call.
    let address = unsafe { GetProcAddress(library, PCSTR(name.as_ptr())) }.ok_or_else(|| {
        HookError::Symbol {
            module,
            symbol,
            source: io::Error::last_os_error(),
        }
    })?;
    Ok(address as Address)
}
