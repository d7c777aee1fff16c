use crate::builtin::builtin_factories;
use crate::command::{CommandFactory, ExitCode, NOT_FOUND_STATUS};
use crate::external::ExternalCommand;
use crate::lexer;
use crate::line::LineSource;
use crate::session::Session;
use anyhow::Result;
use log::{debug, info};
use std::io::Write;

/// Status of a turn whose line could not be tokenized.
const SYNTAX_ERROR_STATUS: ExitCode = 2;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: builtins and `ExternalCommand`.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// The interpreter owns the [`Session`] and a list of [`CommandFactory`] objects
/// that are queried in order to create commands by name. [`Interpreter::new`]
/// registers the builtins (`exit`, `echo`, `pwd`, `cd`, `type`) followed by the
/// external command launcher.
///
/// Example
/// ```
/// use myshell::{Interpreter, Session};
/// let session = Session::with_vars(Default::default(), std::env::temp_dir());
/// let mut sh = Interpreter::new(session);
/// let mut out = Vec::new();
/// let code = sh.execute_line("echo 'hello   world'", &mut out).unwrap();
/// assert_eq!(code, 0);
/// assert_eq!(out, b"hello   world\n");
/// ```
pub struct Interpreter {
    session: Session,
    commands: Vec<Box<dyn CommandFactory>>,
    last_status: ExitCode,
}

impl Interpreter {
    /// Create an interpreter with the builtins and the external command launcher.
    pub fn new(session: Session) -> Self {
        let mut commands = builtin_factories();
        commands.push(Box::new(Factory::<ExternalCommand>::default()));
        Self::with_commands(session, commands)
    }

    /// Create a new interpreter with a custom set of command factories.
    ///
    /// The builtin names of `commands` become the table `type` consults.
    pub fn with_commands(mut session: Session, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        session.builtins = commands
            .iter()
            .filter_map(|factory| factory.builtin_name())
            .collect();
        Self {
            session,
            commands,
            last_status: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Exit status of the most recent turn.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// Unknown commands are reported on `stdout` as `<name>: not found`. Errors are
    /// returned only when writing to `stdout` or waiting for a child fails.
    pub fn run(&mut self, name: &str, args: &[&str], stdout: &mut dyn Write) -> Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.session, name, args) {
                debug!("dispatching {:?} with {:?}", name, args);
                return cmd.execute(stdout, &mut self.session);
            }
        }
        writeln!(stdout, "{}: not found", name)?;
        Ok(NOT_FOUND_STATUS)
    }

    /// Execute one line: tokenize it, then run the resulting command, if any.
    pub fn execute_line(&mut self, line: &str, stdout: &mut dyn Write) -> Result<ExitCode> {
        let status = match lexer::split_into_tokens(line) {
            Err(e) => {
                writeln!(stdout, "{}", e)?;
                SYNTAX_ERROR_STATUS
            }
            Ok(tokens) => match tokens.split_first() {
                None => self.last_status,
                Some((name, rest)) => {
                    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
                    self.run(name, &args, stdout)?
                }
            },
        };
        stdout.flush()?;
        self.last_status = status;
        Ok(status)
    }

    /// The read-eval-print loop.
    ///
    /// Returns the code passed to `exit`, or 0 when the input ends. A failure to read
    /// input is the only error that ends the loop early.
    pub fn repl(
        &mut self,
        source: &mut dyn LineSource,
        prompt: &str,
        stdout: &mut dyn Write,
    ) -> Result<ExitCode> {
        info!("shell started in {}", self.session.current_dir.display());
        loop {
            let Some(line) = source.read_line(prompt)? else {
                info!("end of input");
                return Ok(0);
            };
            self.execute_line(&line, stdout)?;
            if let Some(code) = self.session.pending_exit {
                info!("exit requested with status {}", code);
                return Ok(code);
            }
        }
    }
}
