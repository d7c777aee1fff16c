use crate::command::ExitCode;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable state of one shell session.
///
/// The session contains:
/// - `vars`: the environment variables captured at startup; `PATH` and `HOME` are
///   read from here and the whole map is handed to external commands.
/// - `current_dir`: the tracked working directory. Only `cd` changes it, and the
///   process working directory itself is never touched.
/// - `pending_exit`: set by `exit`; the read-eval loop stops with this code.
#[derive(Debug, Clone)]
pub struct Session {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution. Always absolute.
    pub current_dir: PathBuf,
    /// Exit code requested by the `exit` builtin, if any.
    pub pending_exit: Option<ExitCode>,
    /// Names in the interpreter's builtin table, fixed when the interpreter is built.
    pub(crate) builtins: Vec<&'static str>,
}

impl Session {
    /// Capture the current process state into a new `Session`.
    ///
    /// Fails only if the OS cannot report the current directory (e.g. it was removed).
    pub fn new() -> std::io::Result<Self> {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir()?;
        Ok(Self::with_vars(vars, current_dir))
    }

    /// Build a session from an explicit environment and working directory.
    pub fn with_vars(vars: HashMap<String, String>, current_dir: PathBuf) -> Self {
        Self {
            vars,
            current_dir,
            pending_exit: None,
            builtins: Vec::new(),
        }
    }

    /// Get the value of an environment variable from the captured snapshot.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Whether `name` is one of the interpreter's builtins.
    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.iter().any(|builtin| *builtin == name)
    }

    #[cfg(test)]
    pub(crate) fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}
