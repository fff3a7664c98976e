//! Command lines produced by capability builders.
//!
//! Builders return a program plus an argument vector rather than a shell
//! string. The `Display` form is the quoted command line shown on the status
//! stream.

use std::fmt;
use std::path::{Path, PathBuf};

/// A program invocation: executable path and ordered arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a single argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append free-form user text (options / arguments attributes), split
    /// with quote awareness. Empty text appends nothing.
    pub fn raw_args(self, text: &str) -> Self {
        let parts = split_args(text);
        self.args(parts)
    }

    /// Append a path argument
    pub fn path_arg<P: AsRef<Path>>(self, path: P) -> Self {
        let text = path.as_ref().to_string_lossy().into_owned();
        self.arg(text)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// File name of the program, used for kill-by-name fallbacks
    pub fn executable_name(&self) -> Option<String> {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.program.display())?;
        for arg in &self.args {
            if needs_quoting(arg) {
                write!(f, " \"{}\"", arg.replace('"', "\\\""))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"')
}

/// Split a free-form argument string into words.
///
/// Whitespace separates words; single and double quotes group. Inside double
/// quotes `\"` yields a literal quote. Backslashes are otherwise literal so
/// Windows paths survive unchanged. An unterminated quote runs to the end.
pub fn split_args(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else if q == '"' && c == '\\' && matches!(chars.peek(), Some('"')) {
                    current.push('"');
                    chars.next();
                } else {
                    current.push(c);
                }
            }
            None => {
                if c.is_whitespace() {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                } else if c == '"' || c == '\'' {
                    quote = Some(c);
                    in_word = true;
                } else {
                    current.push(c);
                    in_word = true;
                }
            }
        }
    }

    if in_word {
        words.push(current);
    }

    words
}
