#![forbid(unsafe_code)]

use config::{Activation, Trust};
use guard::{flag_value, has_argument};
use std::io;
use tracing::{debug, info};

/// What the module can learn about the process it was loaded into.
pub trait ProcessEnvironment {
    /// File name of the current executable.
    fn current_executable(&self) -> io::Result<String>;

    /// File name of the parent process' executable.
    fn parent_executable(&self) -> io::Result<String>;

    /// The command line exactly as the process received it.
    fn command_line(&self) -> String;

    /// The command line split into arguments, program name first.
    fn arguments(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationDecision {
    Install,
    /// Loaded into some other process.
    SkipNotHelper,
    /// The user asked for developer tools.
    SkipDeveloperMode,
}

/// Whether the host is the helper process spawned directly by the client.
/// Lookup failures count as "no".
pub fn is_target_helper(env: &dyn ProcessEnvironment, activation: &Activation) -> bool {
    let current = match env.current_executable() {
        Ok(name) => name,
        Err(err) => {
            debug!(%err, "failed to name current executable");
            return false;
        }
    };
    if !current.eq_ignore_ascii_case(&activation.helper_executable) {
        return false;
    }
    match env.parent_executable() {
        Ok(parent) => parent.eq_ignore_ascii_case(&activation.parent_executable),
        Err(err) => {
            debug!(%err, "failed to name parent executable");
            false
        }
    }
}

pub fn is_developer_mode(env: &dyn ProcessEnvironment, activation: &Activation) -> bool {
    has_argument(env.arguments(), &activation.developer_flag)
}

pub fn decide(env: &dyn ProcessEnvironment, activation: &Activation) -> ActivationDecision {
    let decision = if !is_target_helper(env, activation) {
        ActivationDecision::SkipNotHelper
    } else if is_developer_mode(env, activation) {
        ActivationDecision::SkipDeveloperMode
    } else {
        ActivationDecision::Install
    };
    info!(?decision, "activation decided");
    decision
}

/// Path of the only process allowed to talk to the endpoint, taken from the
/// launch arguments.
pub fn expected_peer_path(env: &dyn ProcessEnvironment, trust: &Trust) -> Option<String> {
    let path = flag_value(&env.command_line(), &trust.peer_path_flag);
    if path.is_none() {
        info!(flag = %trust.peer_path_flag, "no trusted peer path given, every peer will be denied");
    }
    path
}
