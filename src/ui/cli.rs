use dialoguer::theme::ColorfulTheme;
use dialoguer::{BasicHistory, Input};
use tracing::error;

use super::{parse_command, ScriptUI, Status};
use crate::errors::Result;
use crate::feedback::Feedback;

const PROMPT: &str = "resym";

/// Interactive console with line history
pub struct CliUi {
    history: BasicHistory,
    theme: ColorfulTheme,
}

impl CliUi {
    pub fn build() -> Result<Self> {
        Ok(CliUi {
            history: BasicHistory::new().max_entries(50).no_duplicates(true),
            theme: ColorfulTheme::default(),
        })
    }

    pub fn get_line(&mut self) -> Result<String> {
        let line = Input::<String>::with_theme(&self.theme)
            .with_prompt(PROMPT)
            .history_with(&mut self.history)
            .allow_empty(true)
            .interact_text()?;

        Ok(line)
    }
}

impl ScriptUI for CliUi {
    fn process(&mut self, feedback: Feedback) -> Result<Status> {
        self.notify(feedback)?;

        loop {
            let line = self.get_line()?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(status) => return Ok(status),
                Err(e) => eprintln!("{e}"),
            }
        }
    }

    fn notify(&mut self, feedback: Feedback) -> Result<()> {
        match feedback {
            Feedback::Ok => (),
            Feedback::Error(e) => error!("{e}"),
            other => print!("{}", with_trailing_newline(other.to_string())),
        }
        Ok(())
    }
}

fn with_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
