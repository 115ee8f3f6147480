#![allow(unsafe_code)]

//! Module entry point and receive interception for Windows hosts.

mod engine;
mod environment;

pub use engine::{MinHookEngine, export_address};
pub use environment::Win32Environment;

use crate::activation::{self, ActivationDecision};
use crate::hook::{Address, HookError, HookSlot};
use crate::logging;
use anyhow::Context;
use config::Config;
use guard::os::{WinSock, system_services};
use guard::{
    PeerResolver, PolicyGate, Receive, RecvArgs, RecvShim, SOCKET_ERROR, SocketHandle, TrustPolicy,
};
use parking_lot::Mutex;
use std::ffi::c_void;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};
use windows::Win32::Foundation::{BOOL, HMODULE, TRUE};
use windows::Win32::System::LibraryLoader::DisableThreadLibraryCalls;
use windows::Win32::System::SystemServices::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH};

const SOCKETS_MODULE: &str = "ws2_32.dll";
const RECV_SYMBOL: &str = "recv";

type RecvFn = unsafe extern "system" fn(usize, *mut u8, i32, i32) -> i32;

/// The receive primitive as it was before the detour, reached through the
/// engine's trampoline.
struct OriginalRecv(RecvFn);

impl OriginalRecv {
    /// # Safety
    ///
    /// `address` must be the non-null trampoline the hook engine created for
    /// `recv`.
    unsafe fn from_address(address: Address) -> Self {
        // SAFETY: guaranteed by the caller.
        Self(unsafe { std::mem::transmute::<Address, RecvFn>(address) })
    }
}

impl Receive for OriginalRecv {
    fn recv(&self, args: RecvArgs) -> i32 {
        // SAFETY: the arguments are the caller's own, passed through as is.
        unsafe { (self.0)(args.socket.0, args.buf, args.len, args.flags) }
    }
}

static SHIM: OnceLock<RecvShim<OriginalRecv, PolicyGate>> = OnceLock::new();

static HOOKS: Mutex<HookSlot> = Mutex::new(HookSlot::new());

unsafe extern "system" fn hooked_recv(socket: usize, buf: *mut u8, len: i32, flags: i32) -> i32 {
    let args = RecvArgs {
        socket: SocketHandle(socket),
        buf,
        len,
        flags,
    };
    match SHIM.get() {
        Some(shim) => shim.call(args),
        // The shim is bound before the detour is enabled.
        None => SOCKET_ERROR,
    }
}

fn load_config() -> anyhow::Result<Config> {
    let exe = std::env::current_exe().context("failed to locate host executable")?;
    let path = exe
        .parent()
        .map(|dir| dir.join(config::FILE_NAME))
        .context("host executable has no parent directory")?;
    Config::load_or_default(&path).with_context(|| format!("failed to load {}", path.display()))
}

fn install(config: &Config, env: &Win32Environment) -> anyhow::Result<()> {
    let expected = activation::expected_peer_path(env, &config.trust);
    let policy = TrustPolicy::new(expected, config.trust.peer_executable.as_str());

    let sockets = Arc::new(WinSock);
    let resolver = PeerResolver::new(system_services(sockets.clone()));
    let gate = PolicyGate::new(resolver, policy, sockets, &config.response.server);

    let target = export_address(SOCKETS_MODULE, RECV_SYMBOL)?;
    let detour = hooked_recv as RecvFn as Address;
    let hook = HOOKS.lock().install(&MinHookEngine, target, detour, |original| {
        // SAFETY: `original` is the non-null trampoline for `recv`.
        let original = unsafe { OriginalRecv::from_address(original) };
        SHIM.set(RecvShim::new(original, gate))
            .map_err(|_| HookError::Bind("receive shim already bound".to_string()))
    })?;
    debug!(?hook, "receive interception live");
    Ok(())
}

fn attach() {
    let loaded = load_config();
    let config = loaded.as_ref().cloned().unwrap_or_default();
    // Nowhere to report a failure before a subscriber exists.
    let _ = logging::init(&config.logging);
    if let Err(err) = &loaded {
        warn!("{err:#}, using defaults");
    }

    let env = Win32Environment;
    match activation::decide(&env, &config.activation) {
        ActivationDecision::Install => {}
        decision => {
            info!(?decision, "receive interception not installed");
            return;
        }
    }
    if let Err(err) = install(&config, &env) {
        warn!("receive interception not installed, peers are not verified: {err:#}");
    }
}

/// On process exit only the hook is removed; an unload also shuts the engine
/// down so nothing of it outlives the module.
fn detach(unloading: bool) {
    let mut hooks = HOOKS.lock();
    let removed = if unloading {
        hooks.release(&MinHookEngine)
    } else {
        hooks.uninstall(&MinHookEngine)
    };
    if let Err(err) = removed {
        warn!(%err, "failed to remove receive interception");
    }
}

#[unsafe(no_mangle)]
#[allow(non_snake_case)]
extern "system" fn DllMain(module: HMODULE, reason: u32, reserved: *mut c_void) -> BOOL {
    match reason {
        DLL_PROCESS_ATTACH => {
            // SAFETY: `module` is this module's own handle.
            let _ = unsafe { DisableThreadLibraryCalls(module) };
            attach();
        }
        // A null `reserved` means FreeLibrary rather than process exit.
        DLL_PROCESS_DETACH => detach(reserved.is_null()),
        _ => {}
    }
    TRUE
}
