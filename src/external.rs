use crate::command::{CommandFactory, ExecutableCommand, ExitCode, NOT_FOUND_STATUS};
use crate::interpreter::Factory;
use crate::session::Session;
use anyhow::Result;
use log::{debug, warn};
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

/// Command that is not a builtin, resolved to an executable file.
pub struct ExternalCommand {
    /// The name as typed, used in messages. The child's `argv[0]` is `path`.
    name: OsString,
    path: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(name: OsString, path: PathBuf, args: Vec<OsString>) -> Self {
        Self { name, path, args }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = session.get_var("PATH").unwrap_or_default();
        let executable =
            find_command_path(OsStr::new(search_paths), &session.current_dir, Path::new(name))?;
        debug!("resolved {} to {}", name, executable.display());
        Some(Box::new(ExternalCommand::new(
            name.into(),
            executable,
            args.iter().map(|x| x.into()).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        // Anything the shell printed must reach the terminal before the child writes.
        stdout.flush()?;

        let mut cmd = std::process::Command::new(&self.path);
        cmd.args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .env_clear()
            .envs(session.vars.iter())
            .current_dir(&session.current_dir);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("failed to spawn {}: {}", self.path.display(), e);
                writeln!(stdout, "{}: command not found", self.name.to_string_lossy())?;
                return Ok(NOT_FOUND_STATUS);
            }
        };
        let exit_status = child.wait()?;
        debug!("{} exited with {}", self.path.display(), exit_status);
        match exit_status.code() {
            Some(x) => Ok(x),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command name the way a typical shell would.
///
/// Behavior:
/// - Single path component (no separators): search each directory in `search_paths`
///   (PATH) and return the first executable match.
/// - Absolute path: returns it if it is an executable file.
/// - Relative path with separators (e.g., `./foo`, `bin/sh`): resolved against `cwd`,
///   the session's working directory, and returned if it is an executable file.
/// - Empty name: returns `None`.
pub fn find_command_path(search_paths: &OsStr, cwd: &Path, name: &Path) -> Option<PathBuf> {
    let mut components = name.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(std::path::Component::Normal(x)), None) => find_in_path(search_paths, x),
        _ => {
            let path = cwd.join(name);
            is_executable(&path).then_some(path)
        }
    }
}

/// Search the directories of `search_paths` in order for an executable named `cmd`.
///
/// Earlier directories shadow later ones. Empty entries are skipped.
pub fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(cmd))
        .find(|path| is_executable(path))
}

/// An existing non-directory with at least one execute permission bit set.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => !meta.is_dir() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
