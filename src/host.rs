//! # Host Module
//!
//! The interfaces through which the commands talk to the native debugger they are loaded into.
//!
//! None of the commands in this crate read debuggee memory, evaluate expressions or walk frames
//! on their own. Everything of that sort is asked of the host through the narrow service traits
//! defined here:
//!
//! - [`AddressResolutionService`]: maps a load address to its containing symbol and module
//! - [`RuntimeIntrospectionService`]: lists every Objective-C method implementation loaded
//! - [`SymbolSearchService`]: finds global functions by regular expression
//! - [`StackLoggingService`]: reads the allocator's recorded backtraces
//! - [`BreakpointService`]: creates breakpoints
//! - [`ThreadControl`]: inspects and steps a single thread
//!
//! [`Host`] bundles them, which is what a [`Session`](crate::session::Session) needs.
//! [`Snapshot`](crate::snapshot::Snapshot) implements all of them from a recorded debuggee state.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::addr::Addr;
use crate::errors::Result;

/// A symbol as the host knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    /// Load address of the first instruction of the symbol
    pub start: Addr,
    pub name: String,
    /// The host made this symbol up because the binary has no name for the code (stripped)
    #[serde(default)]
    pub synthetic: bool,
}

/// The answer of [`AddressResolutionService::resolve_address`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub address: Addr,
    pub symbol: SymbolEntry,
    /// File base name of the module defining the symbol
    pub module_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Instance,
    Class,
}

/// One Objective-C method implementation found in a loaded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodImpl {
    /// Entry point of the implementation (the `IMP`)
    pub address: Addr,
    pub class_name: String,
    pub selector: String,
    pub kind: MethodKind,
}

impl MethodImpl {
    /// `-[Class selector]` for instance methods, `+[Class selector]` for class methods
    pub fn qualified_name(&self) -> String {
        let sigil = match self.kind {
            MethodKind::Instance => '-',
            MethodKind::Class => '+',
        };
        format!("{sigil}[{} {}]", self.class_name, self.selector)
    }
}

/// A global function matched by [`SymbolSearchService::find_functions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionMatch {
    /// Full path of the defining module, used to group matches
    pub module_path: String,
    /// File base name of the defining module
    pub module_name: String,
    pub name: String,
    pub start: Addr,
    /// End of the symbol (exclusive)
    pub end: Addr,
}

/// What to set a breakpoint on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointRequest {
    pub pattern: String,
    /// Treat `pattern` as a regular expression instead of an exact function name
    pub regex: bool,
    /// Only search in the module with this base name
    pub module: Option<String>,
}

/// A breakpoint as created by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointInfo {
    pub id: u32,
    pub pattern: String,
    pub locations: usize,
    pub valid: bool,
}

impl Display for BreakpointInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Breakpoint {}: {}, locations = {}",
            self.id, self.pattern, self.locations
        )
    }
}

pub trait AddressResolutionService {
    /// Whether the debuggee is halted, which every other query here requires
    fn is_stopped(&self) -> bool;

    /// Resolve a load address to the symbol containing it
    ///
    /// # Errors
    ///
    /// Fails with [`UnknownAddress`](crate::errors::ScriptError::UnknownAddress) if no module
    /// maps the address.
    fn resolve_address(&self, addr: Addr) -> Result<ResolvedAddress>;
}

pub trait RuntimeIntrospectionService {
    /// List every method implementation of every class in every loaded image
    ///
    /// This is a single, potentially slow call. An empty list is a valid answer.
    ///
    /// # Errors
    ///
    /// Fails with [`ResolutionFailure`](crate::errors::ScriptError::ResolutionFailure) if the
    /// introspection could not be executed at all.
    fn list_methods(&self) -> Result<Vec<MethodImpl>>;
}

pub trait SymbolSearchService {
    /// # Errors
    ///
    /// Fails if `pattern` is not a valid regular expression.
    fn find_functions(&self, pattern: &str) -> Result<Vec<FunctionMatch>>;
}

pub trait StackLoggingService {
    /// Turn on malloc stack logging in the debuggee
    fn enable_stack_logging(&mut self) -> Result<()>;

    /// Backtrace recorded for the most recent allocation or deallocation at `addr`,
    /// innermost frame first, at most `max_frames` long
    fn stack_log_frames(&self, addr: Addr, max_frames: usize) -> Result<Vec<Addr>>;
}

pub trait BreakpointService {
    fn create_breakpoint(&mut self, request: &BreakpointRequest) -> Result<BreakpointInfo>;
}

pub trait ThreadControl {
    /// Name of the function of the selected frame
    fn function_name(&self) -> Option<String>;

    /// Return addresses of all frames, innermost first
    fn frame_addresses(&self) -> Vec<Addr>;

    /// Run until the current function returned, synchronously
    fn step_out(&mut self) -> Result<()>;

    /// Evaluate `expression` as an Objective-C object and return its description
    ///
    /// [`None`] means the expression produced no result.
    fn evaluate_object(&self, expression: &str) -> Result<Option<String>>;
}

/// Everything a [`Session`](crate::session::Session) needs from the debugger
pub trait Host:
    AddressResolutionService
    + RuntimeIntrospectionService
    + SymbolSearchService
    + StackLoggingService
    + BreakpointService
{
    type Thread: ThreadControl;

    /// Target triple, like `arm64-apple-ios` or `x86_64-apple-macosx`
    fn triple(&self) -> &str;

    fn selected_thread(&self) -> Option<&Self::Thread>;

    fn selected_thread_mut(&mut self) -> Option<&mut Self::Thread>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_qualified_names() {
        let mut m = MethodImpl {
            address: Addr::from(0x4000u64),
            class_name: "ViewController".to_string(),
            selector: "viewDidLoad".to_string(),
            kind: MethodKind::Instance,
        };
        assert_eq!(m.qualified_name(), "-[ViewController viewDidLoad]");
        m.kind = MethodKind::Class;
        m.selector = "sharedInstance".to_string();
        assert_eq!(m.qualified_name(), "+[ViewController sharedInstance]");
    }

    #[test]
    fn test_breakpoint_display() {
        let bp = BreakpointInfo {
            id: 3,
            pattern: "viewDid.*".to_string(),
            locations: 2,
            valid: true,
        };
        assert_eq!(bp.to_string(), "Breakpoint 3: viewDid.*, locations = 2");
    }
}
