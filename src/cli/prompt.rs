//! Terminal implementation of the matcher's interactive collaborator.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::core::errors::{RelinkError, Result};
use crate::matcher::resolve::Prompter;
use crate::torrent::manifest::DeclaredFile;

/// Line-oriented prompter. Re-asks until the answer is one of the offered
/// options; end of input is an error rather than an implicit choice.
pub struct TerminalPrompter<R, W> {
    reader: R,
    writer: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stderr> {
    /// Prompter reading stdin and writing to stderr, so stdout stays clean
    /// for `--json`.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.writer, "{prompt}").map_err(stdio_error)?;
        self.writer.flush().map_err(stdio_error)?;
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).map_err(stdio_error)?;
        if read == 0 {
            return Err(stdio_error(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            )));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn choose_index(&mut self, declared: &DeclaredFile) -> Result<usize> {
        let count = declared.candidates.len();
        let last = count.saturating_sub(1);
        writeln!(
            self.writer,
            "Multiple matches for \"{}\" ({} bytes):",
            declared.relative_path, declared.declared_size
        )
        .map_err(stdio_error)?;
        for (idx, candidate) in declared.candidates.iter().enumerate() {
            writeln!(self.writer, "  [{idx}] {}", candidate.absolute_path.display())
                .map_err(stdio_error)?;
        }
        let prompt = format!("Select file index [0-{last}]: ");
        loop {
            let answer = self.ask(&prompt)?;
            match answer.parse::<usize>() {
                Ok(idx) if idx < count => return Ok(idx),
                _ => {
                    writeln!(self.writer, "  Enter a number between 0 and {last}.")
                        .map_err(stdio_error)?;
                }
            }
        }
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        let prompt = format!("{question} [y/n]: ");
        loop {
            let answer = self.ask(&prompt)?;
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => {
                    writeln!(self.writer, "  Please answer y or n.").map_err(stdio_error)?;
                }
            }
        }
    }
}

fn stdio_error(source: io::Error) -> RelinkError {
    RelinkError::io(Path::new("<terminal>"), source)
}
