//! Buffered result printer shared by every command.
//!
//! Handlers never write to stdout directly. Results are pushed as a rendered
//! text line plus the JSON value of the entity, per-item failures go to a
//! separate error list, and both are drained once by [`Printer::flush`] when
//! the command finishes.

use std::io::{self, Write};

use anyhow::anyhow;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::{CliError, CliResult};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PrintedLine {
    pub(crate) text: String,
    pub(crate) value: Value,
}

#[derive(Debug, Default)]
pub(crate) struct Printer {
    format: OutputFormat,
    single: bool,
    lines: Vec<PrintedLine>,
    errors: Vec<String>,
}

impl Printer {
    pub(crate) fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Render a lone JSON object instead of an array for single-entity commands.
    pub(crate) const fn set_single(&mut self) {
        self.single = true;
    }

    pub(crate) fn print<T: Serialize + ?Sized>(
        &mut self,
        text: impl Into<String>,
        item: &T,
    ) -> CliResult<()> {
        let value = serde_json::to_value(item)
            .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
        self.lines.push(PrintedLine {
            text: text.into(),
            value,
        });
        Ok(())
    }

    pub(crate) fn print_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "item failed");
        self.errors.push(message);
    }

    #[cfg(test)]
    pub(crate) fn lines(&self) -> &[PrintedLine] {
        &self.lines
    }

    #[cfg(test)]
    pub(crate) fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[cfg(test)]
    pub(crate) fn error_lines(&self) -> &[String] {
        &self.errors
    }

    pub(crate) fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub(crate) fn flush(&self, out: &mut dyn Write, err: &mut dyn Write) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                for line in &self.lines {
                    writeln!(out, "{}", line.text)?;
                }
            }
            OutputFormat::Json => {
                let text = match (self.single, self.lines.as_slice()) {
                    (true, [line]) => serde_json::to_string_pretty(&line.value),
                    (_, lines) => serde_json::to_string_pretty(
                        &lines.iter().map(|line| &line.value).collect::<Vec<_>>(),
                    ),
                }
                .map_err(io::Error::other)?;
                if !self.lines.is_empty() || !self.single {
                    writeln!(out, "{text}")?;
                }
            }
        }
        for message in &self.errors {
            writeln!(err, "{message}")?;
        }
        out.flush()?;
        err.flush()
    }
}
