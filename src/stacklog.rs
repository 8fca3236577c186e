//! # Stack Logging Module
//!
//! Reads the backtrace the allocator recorded for the most recent allocation or deallocation
//! of a heap address. Recording has to be switched on first, either with
//! [`enable_logging`] or with the `MallocStackLogging` environment variable of the debuggee.

use tracing::{debug, info};

use crate::addr::Addr;
use crate::errors::Result;
use crate::host::{AddressResolutionService, RuntimeIntrospectionService, StackLoggingService};
use crate::symbolicate::{plain_backtrace, resolve_backtrace};

/// The allocator is never asked for more frames than this
pub const MAX_STACK_FRAMES: usize = 100;

pub fn stack_log<S>(host: &S, addr: Addr, resymbolicate: bool) -> Result<String>
where
    S: AddressResolutionService + RuntimeIntrospectionService + StackLoggingService + ?Sized,
{
    let frames = host.stack_log_frames(addr, MAX_STACK_FRAMES)?;
    debug!("stack log for {addr} has {} frames", frames.len());

    if resymbolicate {
        resolve_backtrace(host, &frames)
    } else {
        Ok(plain_backtrace(host, &frames)?.to_string())
    }
}

pub fn enable_logging<S: StackLoggingService + ?Sized>(host: &mut S) -> Result<()> {
    host.enable_stack_logging()?;
    info!("malloc stack logging is enabled");
    Ok(())
}
