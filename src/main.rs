use anyhow::{Context, Result};
use argh::FromArgs;
use log::error;
use myshell::{ExitCode, Interpreter, LineSource, ScriptSource, Session};
use rustyline::DefaultEditor;
use std::io::{self, IsTerminal};

#[derive(FromArgs)]
/// A small interactive shell.
struct ShellArgs {
    #[argh(option, default = "String::from(\"$ \")")]
    /// text shown before every input line.
    prompt: String,

    #[argh(switch)]
    /// read plain lines even when standard input is a terminal.
    no_editor: bool,
}

fn run(args: &ShellArgs) -> Result<ExitCode> {
    let session = Session::new().context("cannot determine the current directory")?;
    let mut shell = Interpreter::new(session);
    let mut stdout = io::stdout();

    let mut source: Box<dyn LineSource> = if io::stdin().is_terminal() && !args.no_editor {
        Box::new(DefaultEditor::new().context("cannot initialize the line editor")?)
    } else {
        Box::new(ScriptSource::new(io::stdin().lock(), io::stdout()))
    };

    shell.repl(source.as_mut(), &args.prompt, &mut stdout)
}

fn main() {
    env_logger::init();
    let args: ShellArgs = argh::from_env();

    let code = match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("myshell: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}
