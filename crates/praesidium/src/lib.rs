#![deny(unsafe_code)]

//! Loadable module that restricts who may talk to the helper's debugging
//! endpoint.
//!
//! Loaded into the helper process, it decides from the process identity and
//! launch arguments whether to intercept `recv`, then routes every received
//! chunk through [`guard`]'s peer verification.

pub mod activation;
pub mod hook;
pub mod logging;

#[cfg(windows)]
pub mod win32;

pub use activation::{ActivationDecision, ProcessEnvironment};
pub use hook::{HookEngine, HookError, HookSlot, InstalledHook};
