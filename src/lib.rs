//! A small interactive command interpreter.
//!
//! This crate provides the building blocks of a line-oriented shell: a quoting-aware
//! tokenizer, a fixed table of built-in commands implemented in Rust, and a launcher
//! that finds external programs through `PATH` and runs them with the shell's own
//! standard streams.
//!
//! The main entry point is [`Interpreter`], which executes one line at a time against
//! a [`Session`] and drives the read-eval-print loop from any [`LineSource`].

mod builtin;
pub mod command;
mod external;
mod interpreter;
pub mod lexer;
pub mod line;
pub mod session;

pub use builtin::BuiltinError;
pub use command::ExitCode;
pub use external::{find_command_path, find_in_path};
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use line::{LineSource, ScriptSource};
pub use session::Session;
