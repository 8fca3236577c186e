//! # resym
//!
//! Debugger extension commands for working with stripped Objective-C binaries.
//!
//! The centerpiece is [`symbolicate`], which rebuilds readable backtraces when the static
//! symbol table is gone by matching return addresses against the method implementations the
//! Objective-C runtime still knows about. Around it sit a few more commands a debugger console
//! can offer:
//!
//! - `sbt`: symbolicate the backtrace of the selected thread
//! - `msl`: show the recorded allocation backtrace of a heap address ([`stacklog`])
//! - `lookup`: find functions by regular expression ([`lookup`])
//! - `bar`: break on functions and print what they return ([`breakafter`])
//!
//! The debugger itself is abstracted by the traits in [`host`]. [`snapshot::Snapshot`]
//! implements them from a JSON description of a stopped debuggee.

pub mod addr;
pub mod breakafter;
pub mod errors;
pub mod feedback;
pub mod host;
pub mod lookup;
pub mod register;
pub mod session;
pub mod snapshot;
pub mod stacklog;
pub mod symbolicate;
pub mod ui;

#[cfg(test)]
mod mock;

pub use addr::Addr;
pub use errors::{Result, ScriptError};
