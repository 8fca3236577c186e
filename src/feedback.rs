use std::fmt::Display;

use crate::breakafter::BreakAfterReport;
use crate::errors::ScriptError;

/// The result of a command, handed back to the [`ScriptUI`](crate::ui::ScriptUI)
#[derive(Debug)]
pub enum Feedback {
    Ok,
    Text(String),
    Warning(String),
    Report(BreakAfterReport),
    Error(ScriptError),
}

impl Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feedback::Ok => write!(f, "Ok")?,
            Feedback::Text(t) => write!(f, "{t}")?,
            Feedback::Warning(w) => write!(f, "warning: {w}")?,
            Feedback::Report(r) => write!(f, "{r}")?,
            Feedback::Error(e) => write!(f, "error: {e}")?,
        }

        Ok(())
    }
}

impl From<Result<Feedback, ScriptError>> for Feedback {
    fn from(value: Result<Feedback, ScriptError>) -> Self {
        match value {
            Ok(f) => f,
            Err(e) => Feedback::Error(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_feedback_from_result() {
        let fb: Feedback = Err(ScriptError::InvalidState("the process is running".into())).into();
        assert_eq!(
            fb.to_string(),
            "error: Debuggee must be stopped to execute this command: the process is running"
        );
        let fb: Feedback = Ok(Feedback::Warning("no hits".into())).into();
        assert_eq!(fb.to_string(), "warning: no hits");
    }
}
