//! # Session Module
//!
//! Ties a [`Host`] and a [`ScriptUI`] together: the UI produces [`Status`] values, the session
//! runs them against the host and hands the resulting [`Feedback`] back.

use tracing::{debug, error, warn};

use crate::breakafter::{break_after, on_breakpoint_hit};
use crate::errors::{Result, ScriptError};
use crate::feedback::Feedback;
use crate::host::Host;
use crate::lookup::lookup;
use crate::stacklog::{enable_logging, stack_log};
use crate::symbolicate::symbolicate_selected_thread;
use crate::ui::{ScriptUI, Status};

pub struct Session<H: Host, UI: ScriptUI> {
    host: H,
    ui: UI,
}

impl<H: Host, UI: ScriptUI> Session<H, UI> {
    pub fn build(host: H, ui: UI) -> Self {
        Session { host, ui }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Ask the UI for commands and run them until it says [`Status::Quit`]
    ///
    /// Failing commands are reported to the UI and do not end the loop. Only errors of the UI
    /// itself do.
    pub fn run(&mut self) -> Result<()> {
        let mut feedback = Feedback::Ok;
        loop {
            let status = match self.ui.process(feedback) {
                Err(e) => {
                    error!("{e}");
                    return Err(e);
                }
                Ok(Status::Quit) => break,
                Ok(s) => s,
            };
            feedback = self.execute(status).into();
        }

        Ok(())
    }

    pub fn execute(&mut self, status: Status) -> Result<Feedback> {
        debug!("executing {status:?}");
        match status {
            Status::Symbolicate => Ok(Feedback::Text(symbolicate_selected_thread(&self.host)?)),
            Status::StackLog {
                address,
                resymbolicate,
            } => Ok(Feedback::Text(stack_log(&self.host, address, resymbolicate)?)),
            Status::Lookup { query, options } => {
                Ok(Feedback::Text(lookup(&self.host, &query, &options)?))
            }
            Status::BreakAfter { query, options } => break_after(&mut self.host, &query, &options),
            Status::EnableLogging => {
                enable_logging(&mut self.host)?;
                Ok(Feedback::Ok)
            }
            Status::Help(text) => Ok(Feedback::Text(text)),
            Status::Quit => Ok(Feedback::Ok),
        }
    }

    /// Called by the host when a break-after breakpoint was hit on the selected thread
    ///
    /// Returns whether the debuggee should stay stopped, which is never the case: the report
    /// goes to the UI and execution goes on.
    pub fn breakpoint_hit(&mut self) -> Result<bool> {
        let triple = self.host.triple().to_string();
        let thread = self.host.selected_thread_mut().ok_or_else(|| {
            ScriptError::InvalidState("breakpoint hit without a selected thread".to_string())
        })?;

        match on_breakpoint_hit(thread, &triple)? {
            Some(report) => self.ui.notify(Feedback::Report(report))?,
            None => warn!("the return register could not be evaluated"),
        }

        Ok(false)
    }
}
