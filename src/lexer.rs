//! A module implementing lexical analysis (tokenization) of a single command line.
//!
//! The lexer is a small finite state machine over the quoting states of a
//! POSIX-like shell. It produces fully unescaped words: quotes and escaping
//! backslashes never survive into the output.

use log::debug;

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unterminated quote")]
    UnfinishedQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    /// Between words, skipping separators.
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    /// Set after a backslash outside single quotes; the next character is literal.
    escaped: bool,
    /// True once the current word has started, even if it is still empty (`''`).
    in_word: bool,
    buffer: String,
}

impl LexingFSM {
    /// Creates a new instance of the lexical analysis Finite State Machine.
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            escaped: false,
            in_word: false,
            buffer: String::new(),
        }
    }

    /// Performs lexical analysis on the input and returns the words in order.
    ///
    /// # Returns
    /// The unescaped words on success, or a `LexingError` if a quote is still
    /// open when the input ends.
    fn make_tokens(&mut self) -> Result<Vec<String>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            if self.escaped {
                self.handle_escaped(ch);
                continue;
            }
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote | LexingState::ReadingDoubleQuote => {
                return Err(LexingError::UnfinishedQuote);
            }
            _ => {}
        }

        // A trailing backslash has nothing to escape and is simply dropped.
        self.escaped = false;
        self.finish_word(&mut out);

        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn start_word(&mut self) {
        self.in_word = true;
        self.state = LexingState::ReadingWord;
    }

    fn finish_word(&mut self, out: &mut Vec<String>) {
        if self.in_word {
            out.push(std::mem::take(&mut self.buffer));
            self.in_word = false;
        }
    }

    fn handle_escaped(&mut self, ch: char) {
        self.escaped = false;
        match self.state {
            LexingState::ReadingDoubleQuote => {
                if ch != '\\' && ch != '"' {
                    self.buffer.push('\\');
                }
                self.buffer.push(ch);
            }
            _ => {
                if self.state == LexingState::Start {
                    self.start_word();
                }
                self.buffer.push(ch);
            }
        }
    }

    fn handle_start(&mut self, ch: char) {
        if ch.is_whitespace() {
            return;
        }
        // The word starts with the escaped character, not the backslash.
        if ch == '\\' {
            self.escaped = true;
            return;
        }
        self.start_word();
        self.handle_bare(ch);
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        if ch.is_whitespace() {
            self.finish_word(out);
            self.state = LexingState::Start;
        } else {
            self.handle_bare(ch);
        }
    }

    fn handle_bare(&mut self, ch: char) {
        match ch {
            '\\' => self.escaped = true,
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => self.escaped = true,
            c => self.buffer.push(c),
        }
    }
}

/// The main entry point function to perform lexical analysis.
///
/// The first returned word is the command name, the rest are its arguments.
/// An empty or blank line yields an empty vector.
pub fn split_into_tokens(line: &str) -> Result<Vec<String>, LexingError> {
    let mut lexer = LexingFSM::new(line);
    let tokens = lexer.make_tokens()?;
    debug!("tokenized {:?} into {:?}", line, tokens);
    Ok(tokens)
}
