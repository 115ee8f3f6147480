#![forbid(unsafe_code)]

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info};

/// A code address. Kept as an integer so slots can live in statics.
pub type Address = usize;

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("{module} is not loaded in this process: {source}")]
    ModuleNotLoaded {
        module: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resolve {symbol} in {module}: {source}")]
    Symbol {
        module: &'static str,
        symbol: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create hook at {target:#x}: {status}")]
    Create { target: Address, status: String },

    #[error("Failed to enable hook at {target:#x}: {status}")]
    Enable { target: Address, status: String },

    #[error("Failed to disable hook at {target:#x}: {status}")]
    Disable { target: Address, status: String },

    #[error("Failed to remove hook at {target:#x}: {status}")]
    Remove { target: Address, status: String },

    #[error("Failed to shut down the hook engine: {0}")]
    Shutdown(String),

    #[error("Hook engine returned a null trampoline for {0:#x}")]
    NullOriginal(Address),

    #[error("Receive interception is already installed")]
    AlreadyInstalled,

    #[error("Failed to bind the original function: {0}")]
    Bind(String),
}

/// Inline function hooking.
pub trait HookEngine {
    /// Prepare a detour of `target` to `detour` without activating it.
    /// Returns the address to call to reach the original code.
    fn create(&self, target: Address, detour: Address) -> Result<Address, HookError>;

    fn enable(&self, target: Address) -> Result<(), HookError>;

    fn disable(&self, target: Address) -> Result<(), HookError>;

    fn remove(&self, target: Address) -> Result<(), HookError>;

    /// Release whatever the engine holds beyond individual hooks.
    fn shutdown(&self) -> Result<(), HookError>;
}

/// Run an engine call, reporting a panic inside it as a failure status.
pub fn contained<T>(call: impl FnOnce() -> Result<T, String>) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(panic_status(&*payload)))
}

fn panic_status(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

/// A hook that is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstalledHook {
    pub target: Address,
    pub original: Address,
}

/// Holds at most one installed hook.
#[derive(Debug, Default)]
pub struct HookSlot {
    installed: Option<InstalledHook>,
}

impl HookSlot {
    pub const fn new() -> Self {
        Self { installed: None }
    }

    pub fn installed(&self) -> Option<InstalledHook> {
        self.installed
    }

    /// Detour `target` to `detour`.
    ///
    /// `bind` receives the original address before the detour goes live, so
    /// the detour can always reach it. If binding or enabling fails the hook
    /// is removed again and the slot stays empty.
    pub fn install<E, F>(
        &mut self,
        engine: &E,
        target: Address,
        detour: Address,
        bind: F,
    ) -> Result<InstalledHook, HookError>
    where
        E: HookEngine + ?Sized,
        F: FnOnce(Address) -> Result<(), HookError>,
    {
        if self.installed.is_some() {
            return Err(HookError::AlreadyInstalled);
        }

        let original = engine.create(target, detour)?;
        let activated = if original == 0 {
            Err(HookError::NullOriginal(target))
        } else {
            bind(original).and_then(|()| engine.enable(target))
        };
        if let Err(err) = activated {
            if let Err(cleanup) = engine.remove(target) {
                debug!(%cleanup, "failed to roll back hook");
            }
            return Err(err);
        }

        let hook = InstalledHook { target, original };
        info!(address = format_args!("{target:#x}"), "hook installed");
        self.installed = Some(hook);
        Ok(hook)
    }

    /// Disable and remove the installed hook, if any. Returns whether there
    /// was one. The slot is emptied even when the engine reports errors.
    pub fn uninstall<E>(&mut self, engine: &E) -> Result<bool, HookError>
    where
        E: HookEngine + ?Sized,
    {
        let Some(hook) = self.installed.take() else {
            return Ok(false);
        };
        let disabled = engine.disable(hook.target);
        let removed = engine.remove(hook.target);
        disabled.and(removed)?;
        info!(address = format_args!("{:#x}", hook.target), "hook removed");
        Ok(true)
    }

    /// [`uninstall`](Self::uninstall), then shut the engine down. The engine
    /// is shut down even when uninstalling fails, and that failure wins.
    pub fn release<E>(&mut self, engine: &E) -> Result<bool, HookError>
    where
        E: HookEngine + ?Sized,
    {
        let uninstalled = self.uninstall(engine);
        let shutdown = engine.shutdown();
        match (uninstalled, shutdown) {
            (Err(err), Err(shutdown)) => {
                debug!(%shutdown, "hook engine shutdown also failed");
                Err(err)
            }
            (uninstalled, shutdown) => {
                let had_hook = uninstalled?;
                shutdown?;
                Ok(had_hook)
            }
        }
    }
}
