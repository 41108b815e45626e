//! Interactive double confirmation for destructive team operations.

use std::io::{BufRead, Write};

use anyhow::anyhow;

use crate::client::{CliError, CliResult};

const AFFIRMATIVE: &str = "YES";
pub(crate) const ABORTED: &str = "ABORTED: You did not answer YES exactly, in all capitals.";

/// Reads answers from one stream and writes prompts to another.
pub(crate) struct Prompter<'a> {
    input: &'a mut dyn BufRead,
    output: &'a mut dyn Write,
}

impl<'a> Prompter<'a> {
    pub(crate) fn new(input: &'a mut dyn BufRead, output: &'a mut dyn Write) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> CliResult<bool> {
        write!(self.output, "{question} (YES/NO): ")
            .and_then(|()| self.output.flush())
            .map_err(|err| CliError::failure(anyhow!("failed to write prompt: {err}")))?;

        let mut answer = String::new();
        self.input
            .read_line(&mut answer)
            .map_err(|err| CliError::failure(anyhow!("failed to read answer: {err}")))?;
        let answer = answer
            .strip_suffix('\n')
            .map_or(answer.as_str(), |line| line.strip_suffix('\r').unwrap_or(line));
        Ok(answer == AFFIRMATIVE)
    }

    /// Ask for a backup confirmation and then for the action itself.
    ///
    /// `verb` names the action in the second prompt, e.g. `delete`.
    pub(crate) fn confirm_twice(&mut self, verb: &str) -> CliResult<()> {
        if !self.ask("Have you performed a database backup?")? {
            return Err(CliError::validation(ABORTED));
        }
        let question = format!(
            "Are you sure you want to {verb} the teams specified? All data will be permanently deleted?"
        );
        if !self.ask(&question)? {
            return Err(CliError::validation(ABORTED));
        }
        Ok(())
    }
}
