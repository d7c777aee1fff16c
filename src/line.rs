//! Line sources feeding the read-eval loop.

use anyhow::{Context, Result};
use log::warn;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, Write};

/// Something that can show a prompt and hand back one line of input.
pub trait LineSource {
    /// Read one line without its trailing newline. `Ok(None)` means end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive terminal input through `rustyline`. Lines are not added to history.
impl LineSource for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C drops the current line, the shell keeps running.
                warn!("line interrupted");
                Ok(Some(String::new()))
            }
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err).context("failed to read from terminal"),
        }
    }
}

/// Plain buffered input, used for pipes, scripts and tests.
///
/// The prompt is written to `prompt_out` before every read.
pub struct ScriptSource<R, W> {
    input: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> ScriptSource<R, W> {
    pub fn new(input: R, prompt_out: W) -> Self {
        Self { input, prompt_out }
    }
}

impl<R: BufRead, W: Write> LineSource for ScriptSource<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompt_out.write_all(prompt.as_bytes())?;
        self.prompt_out.flush()?;

        let mut buf = Vec::new();
        let read = self
            .input
            .read_until(b'\n', &mut buf)
            .context("failed to read input line")?;
        if read == 0 {
            return Ok(None);
        }
        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }
        // Undecodable bytes become U+FFFD; the line still runs.
        let line = String::from_utf8_lossy(&buf).into_owned();
        Ok(Some(line))
    }
}
