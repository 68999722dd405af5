//! Run configuration for the VM, built from CLI flags and the environment.
//!
//! There is no persisted configuration file: the VM's only tunables are the
//! debugger toggle and the log verbosity, both supplied at invocation, in
//! keeping with the single-shot, non-daemon nature of running a Sym script.

/// The subset of the CLI's flags the VM itself needs to see.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// When set, the VM peeks every instruction before executing it and
    /// invokes the registered [`crate::vm::DebugHook`] on `DBG`.
    pub debug: bool,
    /// Default `tracing_subscriber::EnvFilter` directive used when
    /// `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            debug: false,
            log_filter: "warn".to_string(),
        }
    }
}

impl RunConfig {
    pub fn new(debug: bool, log_filter: impl Into<String>) -> Self {
        RunConfig {
            debug,
            log_filter: log_filter.into(),
        }
    }
}
