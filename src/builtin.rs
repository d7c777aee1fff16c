use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::external::find_command_path;
use crate::interpreter::Factory;
use crate::session::Session;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use log::debug;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Usage and runtime failures of builtins. The message is printed verbatim.
#[derive(Debug, thiserror::Error)]
pub enum BuiltinError {
    #[error("{0}: missing argument")]
    MissingArgument(&'static str),
    #[error("exit: {0}: numeric argument required")]
    NotANumber(String),
    #[error("cd: HOME not set")]
    HomeNotSet,
    #[error("cd: {0}: No such file or directory")]
    NoSuchDirectory(String),
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command against the session, writing results to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        match <T as BuiltinCommand>::execute(*self, stdout, session) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{}", e)?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<ExitCode> {
        stdout.write_all(self.output.as_bytes())?;
        if !self.output.ends_with('\n') {
            writeln!(stdout)?;
        }
        Ok(if self.is_error { 2 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn builtin_name(&self) -> Option<&'static str> {
        Some(T::name())
    }

    fn try_create(
        &self,
        _session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            // User words are always operands, never argh flags or `help`.
            let operands: Vec<&str> = std::iter::once("--").chain(args.iter().copied()).collect();
            Some(match T::from_args(&[name], &operands) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

/// The fixed builtin table, in lookup order.
pub(crate) fn builtin_factories() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Echo>::default()),
        Box::new(Factory::<Pwd>::default()),
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Type>::default()),
    ]
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        writeln!(stdout, "{}", session.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute, relative to the current directory, or starting with ~.
    pub target: Option<String>,
}

impl Cd {
    /// Expand a leading `~` to the value of HOME.
    fn expand_home(target: &str, session: &Session) -> Result<PathBuf, BuiltinError> {
        let rest = match target.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
            _ => return Ok(PathBuf::from(target)),
        };
        let home = session
            .get_var("HOME")
            .filter(|home| !home.is_empty())
            .ok_or(BuiltinError::HomeNotSet)?;
        let mut path = PathBuf::from(home);
        if !rest.is_empty() {
            path.push(rest);
        }
        Ok(path)
    }
}

/// Resolve `target` against `base` lexically.
///
/// `.` is dropped, `..` pops one component and an absolute `target` discards `base`.
/// Returns `None` when `..` would climb above the root.
pub(crate) fn resolve_lexically(base: &Path, target: &Path) -> Option<PathBuf> {
    let mut resolved = if target.is_absolute() {
        PathBuf::new()
    } else {
        base.to_path_buf()
    };
    for component in target.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if resolved.parent().is_none() || !resolved.pop() {
                    return None;
                }
            }
            Component::Normal(part) => resolved.push(part),
        }
    }
    Some(resolved)
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let target = self
            .target
            .ok_or(BuiltinError::MissingArgument(Self::name()))?;
        let expanded = Self::expand_home(&target, session)?;

        let candidate = resolve_lexically(&session.current_dir, &expanded)
            .filter(|path| path.is_dir())
            .ok_or_else(|| BuiltinError::NoSuchDirectory(target.clone()))?;

        debug!("cd: {} -> {}", target, candidate.display());
        session.current_dir = candidate;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional)]
    /// exit status of the shell; defaults to 0.
    pub code: Option<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let code = match self.code {
            Some(code) => code
                .parse::<ExitCode>()
                .map_err(|_| BuiltinError::NotANumber(code.clone()))?,
            None => 0,
        };
        session.pending_exit = Some(code);
        Ok(code)
    }
}

/// Write the arguments to standard output, separated by single spaces.
///
/// Every argument is printed as-is, so option-like words such as `-n` or `--help`
/// are echoed rather than interpreted. The factory's leading `--` is dropped.
pub struct Echo {
    pub args: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        let args = args.strip_prefix(&["--"]).unwrap_or(args);
        Ok(Echo {
            args: args.iter().map(|arg| arg.to_string()).collect(),
        })
    }
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.args.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Describe how each name would be interpreted as a command.
pub struct Type {
    #[argh(positional, greedy)]
    /// command names to look up.
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        if self.names.is_empty() {
            return Err(BuiltinError::MissingArgument(Self::name()).into());
        }
        let search_paths = session.get_var("PATH").unwrap_or_default();
        let mut status = 0;
        for name in &self.names {
            if session.is_builtin(name) {
                writeln!(stdout, "{} is a shell builtin", name)?;
            } else if let Some(path) =
                find_command_path(OsStr::new(search_paths), &session.current_dir, Path::new(name))
            {
                writeln!(stdout, "{} is {}", name, path.display())?;
            } else {
                writeln!(stdout, "{}: not found", name)?;
                status = 1;
            }
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::fs;

    fn session_in(dir: &Path) -> Session {
        let mut session = Session::with_vars(HashMap::new(), dir.to_path_buf());
        session.builtins = builtin_factories()
            .iter()
            .filter_map(|factory| factory.builtin_name())
            .collect();
        session
    }

    /// Run a builtin through its factory, the way the interpreter does.
    fn run(session: &mut Session, name: &str, args: &[&str]) -> (ExitCode, String) {
        let cmd = builtin_factories()
            .iter()
            .find_map(|factory| factory.try_create(session, name, args))
            .expect("builtin should exist");
        let mut out = Vec::new();
        let code = cmd.execute(&mut out, session).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let temp = tempfile::tempdir().unwrap();
        let mut session = session_in(temp.path());

        let mut out = Vec::new();
        let res = Pwd {}.execute(&mut out, &mut session);

        assert!(res.is_ok());
        let expected = format!("{}\n", temp.path().to_string_lossy());
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_echo_joins_with_single_spaces() {
        let mut session = session_in(Path::new("/"));
        assert_eq!(run(&mut session, "echo", &["hello", "world"]), (0, "hello world\n".into()));
        assert_eq!(run(&mut session, "echo", &[]), (0, "\n".into()));
        assert_eq!(run(&mut session, "echo", &["a  b"]), (0, "a  b\n".into()));
    }

    #[test]
    fn test_echo_does_not_parse_options() {
        let mut session = session_in(Path::new("/"));
        assert_eq!(
            run(&mut session, "echo", &["-n", "--help", "x"]),
            (0, "-n --help x\n".into())
        );
    }

    #[test]
    fn test_exit_sets_pending_exit() {
        let mut session = session_in(Path::new("/"));
        assert_eq!(run(&mut session, "exit", &["7"]).0, 7);
        assert_eq!(session.pending_exit, Some(7));

        let mut session = session_in(Path::new("/"));
        assert_eq!(run(&mut session, "exit", &[]).0, 0);
        assert_eq!(session.pending_exit, Some(0));
    }

    #[test]
    fn test_exit_rejects_non_numeric_code() {
        let mut session = session_in(Path::new("/"));
        let (code, out) = run(&mut session, "exit", &["abc"]);
        assert_eq!(code, 1);
        assert_eq!(out, "exit: abc: numeric argument required\n");
        assert_eq!(session.pending_exit, None);
    }

    #[test]
    fn test_exit_rejects_extra_arguments() {
        let mut session = session_in(Path::new("/"));
        let (code, out) = run(&mut session, "exit", &["1", "2"]);
        assert_eq!(code, 2);
        assert!(!out.is_empty());
        assert_eq!(session.pending_exit, None);
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let temp = tempfile::tempdir().unwrap();
        let sub = temp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let mut session = session_in(Path::new("/"));

        let target = sub.to_string_lossy().to_string();
        let (code, out) = run(&mut session, "cd", &[&target]);

        assert_eq!((code, out.as_str()), (0, ""));
        assert_eq!(session.current_dir, sub);
    }

    #[test]
    fn test_cd_relative_with_dots() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("a/b")).unwrap();
        fs::create_dir(temp.path().join("c")).unwrap();
        let mut session = session_in(temp.path());

        assert_eq!(run(&mut session, "cd", &["./a/./b"]).0, 0);
        assert_eq!(session.current_dir, temp.path().join("a/b"));

        assert_eq!(run(&mut session, "cd", &["../../c"]).0, 0);
        assert_eq!(session.current_dir, temp.path().join("c"));
    }

    #[test]
    fn test_cd_to_home() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("docs")).unwrap();
        let mut session = session_in(Path::new("/"));
        session.set_var("HOME", temp.path().to_string_lossy());

        assert_eq!(run(&mut session, "cd", &["~"]).0, 0);
        assert_eq!(session.current_dir, temp.path());

        session.current_dir = PathBuf::from("/");
        assert_eq!(run(&mut session, "cd", &["~/docs"]).0, 0);
        assert_eq!(session.current_dir, temp.path().join("docs"));
    }

    #[test]
    fn test_cd_home_not_set() {
        let mut session = session_in(Path::new("/"));
        assert_eq!(run(&mut session, "cd", &["~"]), (1, "cd: HOME not set\n".into()));
        session.set_var("HOME", "");
        assert_eq!(run(&mut session, "cd", &["~"]), (1, "cd: HOME not set\n".into()));
        assert_eq!(session.current_dir, Path::new("/"));
    }

    #[test]
    fn test_cd_nonexistent_path_keeps_state() {
        let temp = tempfile::tempdir().unwrap();
        let mut session = session_in(temp.path());

        let (code, out) = run(&mut session, "cd", &["does_not_exist"]);

        assert_eq!(code, 1);
        assert_eq!(out, "cd: does_not_exist: No such file or directory\n");
        assert_eq!(session.current_dir, temp.path());
    }

    #[test]
    fn test_cd_to_file_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("file"), "x").unwrap();
        let mut session = session_in(temp.path());

        let (code, out) = run(&mut session, "cd", &["file"]);

        assert_eq!(code, 1);
        assert_eq!(out, "cd: file: No such file or directory\n");
        assert_eq!(session.current_dir, temp.path());
    }

    #[test]
    #[cfg(unix)]
    fn test_cd_above_root_is_an_error() {
        let mut session = session_in(Path::new("/"));

        let (code, out) = run(&mut session, "cd", &[".."]);

        assert_eq!(code, 1);
        assert_eq!(out, "cd: ..: No such file or directory\n");
        assert_eq!(session.current_dir, Path::new("/"));
    }

    #[test]
    fn test_cd_missing_argument() {
        let mut session = session_in(Path::new("/"));
        assert_eq!(run(&mut session, "cd", &[]), (1, "cd: missing argument\n".into()));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_lexically() {
        let base = Path::new("/usr/local");
        assert_eq!(resolve_lexically(base, Path::new("bin")), Some("/usr/local/bin".into()));
        assert_eq!(resolve_lexically(base, Path::new("..")), Some("/usr".into()));
        assert_eq!(resolve_lexically(base, Path::new("../..")), Some("/".into()));
        assert_eq!(resolve_lexically(base, Path::new("../../..")), None);
        assert_eq!(resolve_lexically(base, Path::new("/tmp/./x/..")), Some("/tmp".into()));
        assert_eq!(resolve_lexically(base, Path::new(".")), Some("/usr/local".into()));
    }

    #[test]
    fn test_type_reports_builtins() {
        let mut session = session_in(Path::new("/"));
        for name in ["cd", "echo", "exit", "pwd", "type"] {
            let (code, out) = run(&mut session, "type", &[name]);
            assert_eq!(code, 0);
            assert_eq!(out, format!("{} is a shell builtin\n", name));
        }
    }

    #[test]
    fn test_type_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let mut session = session_in(temp.path());
        session.set_var("PATH", temp.path().to_string_lossy());

        assert_eq!(
            run(&mut session, "type", &["nonexistent_xyz"]),
            (1, "nonexistent_xyz: not found\n".into())
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_type_finds_executable_in_path() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let tool = temp.path().join("mytool");
        fs::write(&tool, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        let mut session = session_in(Path::new("/"));
        session.set_var("PATH", temp.path().to_string_lossy());

        let (code, out) = run(&mut session, "type", &["mytool", "echo", "missing"]);

        assert_eq!(code, 1);
        assert_eq!(
            out,
            format!(
                "mytool is {}\necho is a shell builtin\nmissing: not found\n",
                tool.display()
            )
        );
    }

    #[test]
    fn test_type_missing_argument() {
        let mut session = session_in(Path::new("/"));
        assert_eq!(run(&mut session, "type", &[]), (1, "type: missing argument\n".into()));
    }

    #[test]
    fn test_help_words_are_plain_operands() {
        let mut session = session_in(Path::new("/"));
        assert_eq!(
            run(&mut session, "exit", &["--help"]),
            (1, "exit: --help: numeric argument required\n".into())
        );
        assert_eq!(session.pending_exit, None);

        assert_eq!(run(&mut session, "type", &["help"]), (1, "help: not found\n".into()));
        assert_eq!(run(&mut session, "type", &["-foo"]), (1, "-foo: not found\n".into()));
    }

    #[test]
    fn test_cd_into_option_like_directories() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("help")).unwrap();
        fs::create_dir(temp.path().join("-x")).unwrap();
        let mut session = session_in(temp.path());

        assert_eq!(run(&mut session, "cd", &["help"]), (0, String::new()));
        assert_eq!(session.current_dir, temp.path().join("help"));

        session.current_dir = temp.path().to_path_buf();
        assert_eq!(run(&mut session, "cd", &["-x"]), (0, String::new()));
        assert_eq!(session.current_dir, temp.path().join("-x"));

        assert_eq!(
            run(&mut session, "cd", &["-nope"]),
            (1, "cd: -nope: No such file or directory\n".into())
        );
        assert_eq!(session.current_dir, temp.path().join("-x"));
    }

    #[test]
    fn test_exit_accepts_negative_code() {
        let mut session = session_in(Path::new("/"));
        assert_eq!(run(&mut session, "exit", &["-1"]).0, -1);
        assert_eq!(session.pending_exit, Some(-1));
    }

    #[test]
    fn test_echo_keeps_double_dash() {
        let mut session = session_in(Path::new("/"));
        assert_eq!(run(&mut session, "echo", &["--", "x"]), (0, "-- x\n".into()));
    }
}
