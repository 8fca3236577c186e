//! # Break After Module
//!
//! Breakpoints that, when hit, step out of the function and print the object it returned.

use std::fmt::Display;

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::feedback::Feedback;
use crate::host::{BreakpointRequest, BreakpointService, ThreadControl};
use crate::register::return_register;

const REPORT_RULE_WIDTH: usize = 80;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakAfterOptions {
    /// Match the query as exact function name instead of as regular expression
    pub non_regex: bool,
    /// Only set locations in the module with this base name
    pub module: Option<String>,
}

/// What a break-after breakpoint prints after stepping out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakAfterReport {
    /// The function the breakpoint was hit in
    pub function: String,
    /// Description of the returned object, without line breaks
    pub object: String,
    /// The function execution returned to
    pub parent: String,
}

impl Display for BreakAfterReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", "*".repeat(REPORT_RULE_WIDTH))?;
        writeln!(f, "breakpoint: ")?;
        writeln!(f, "object: {}", self.function)?;
        writeln!(f, "stopped: {}", self.object)?;
        writeln!(f, "{}", self.parent)
    }
}

pub fn break_after<S: BreakpointService + ?Sized>(
    host: &mut S,
    query: &str,
    options: &BreakAfterOptions,
) -> Result<Feedback> {
    let request = BreakpointRequest {
        pattern: query.to_string(),
        regex: !options.non_regex,
        module: options.module.clone(),
    };
    let bp = host.create_breakpoint(&request)?;
    debug!("created {bp:?}");

    if !bp.valid || bp.locations == 0 {
        warn!("breakpoint for {query:?} has no locations");
        Ok(Feedback::Warning(
            "Breakpoint isn't valid or hasn't found any hits.".to_string(),
        ))
    } else {
        Ok(Feedback::Warning(bp.to_string()))
    }
}

/// Handle a hit of a break-after breakpoint on `thread`
///
/// Steps out of the current function and evaluates the return register of the `triple`'s
/// architecture. Returns [`None`] if the evaluation produced nothing. The debuggee should be
/// resumed afterwards in any case.
///
/// # Errors
///
/// Fails if the architecture is unknown or stepping out fails.
pub fn on_breakpoint_hit<T: ThreadControl + ?Sized>(
    thread: &mut T,
    triple: &str,
) -> Result<Option<BreakAfterReport>> {
    let register = return_register(triple)?;
    let function = thread.function_name().unwrap_or_default();

    thread.step_out()?;

    let parent = thread.function_name().unwrap_or_default();
    let Some(object) = thread.evaluate_object(register)? else {
        debug!("{register} produced no result after stepping out of {function}");
        return Ok(None);
    };

    let report = BreakAfterReport {
        function,
        object: object.replace('\n', ""),
        parent,
    };
    info!("{} returned {}", report.function, report.object);
    Ok(Some(report))
}
