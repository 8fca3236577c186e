//! # Symbolicate Module
//!
//! Turns raw return addresses into a readable backtrace, recovering the names of stripped
//! Objective-C methods.
//!
//! When a binary is stripped, the host can only hand out synthetic placeholder symbols for the
//! code in it. The Objective-C runtime still knows every method implementation though, so for
//! such frames the entry points of all methods are asked for once and matched against the
//! start addresses of the placeholder symbols.
//!
//! Output is one line per frame:
//!
//! ```text
//! frame #0 : 0x0000000100003f20 Example`-[ViewController viewDidLoad] + 32
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use tracing::{debug, trace, warn};

use crate::addr::Addr;
use crate::errors::{Result, ScriptError};
use crate::host::{
    AddressResolutionService, Host, MethodImpl, RuntimeIntrospectionService, ThreadControl,
};

/// Appended to placeholder names that could not be matched against the runtime
pub const UNRESOLVED_MARKER: &str = " ... unresolved";

/// Module and symbol name used for addresses the host could not map at all
pub const UNKNOWN_NAME: &str = "???";

/// Method entry point to qualified method name, built for a single resolution
pub type MethodTable = HashMap<Addr, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position in the backtrace, 0 is the innermost frame
    pub index: usize,
    pub address: Addr,
    pub module_name: String,
    pub symbol_name: String,
    /// Bytes past the start of the symbol
    pub offset: u64,
}

impl Frame {
    pub fn offset_suffix(&self) -> String {
        if self.offset > 0 {
            format!("+ {}", self.offset)
        } else {
            String::new()
        }
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "frame #{:<2}: {} {}`{} {}",
            self.index,
            self.address,
            self.module_name,
            self.symbol_name,
            self.offset_suffix()
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backtrace {
    pub frames: Vec<Frame>,
}

impl Display for Backtrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for frame in &self.frames {
            writeln!(f, "{frame}")?;
        }
        Ok(())
    }
}

/// A frame whose address was resolved, but whose final name is not decided yet
#[derive(Debug)]
struct PendingFrame {
    index: usize,
    address: Addr,
    module_name: String,
    start: Addr,
    name: String,
    synthetic: bool,
}

impl PendingFrame {
    fn finish(self, symbol_name: String) -> Frame {
        Frame {
            index: self.index,
            offset: self.address.offset_from(self.start).unwrap_or(0),
            address: self.address,
            module_name: self.module_name,
            symbol_name,
        }
    }
}

fn ensure_stopped<S: AddressResolutionService + ?Sized>(host: &S) -> Result<()> {
    if host.is_stopped() {
        Ok(())
    } else {
        Err(ScriptError::InvalidState("the process is running".to_string()))
    }
}

fn resolve_frames<S: AddressResolutionService + ?Sized>(
    host: &S,
    addresses: &[Addr],
) -> Result<Vec<PendingFrame>> {
    let mut frames = Vec::with_capacity(addresses.len());
    for (index, &address) in addresses.iter().enumerate() {
        let frame = match host.resolve_address(address) {
            Ok(resolved) => PendingFrame {
                index,
                address,
                module_name: resolved.module_name,
                start: resolved.symbol.start,
                name: resolved.symbol.name,
                synthetic: resolved.symbol.synthetic,
            },
            Err(err @ ScriptError::InvalidState(_)) => return Err(err),
            Err(err) => {
                warn!("frame #{index} at {address}: {err}");
                PendingFrame {
                    index,
                    address,
                    module_name: UNKNOWN_NAME.to_string(),
                    start: address,
                    name: UNKNOWN_NAME.to_string(),
                    synthetic: true,
                }
            }
        };
        trace!(
            "frame #{index}: {address} in {} starts at {} ({}synthetic)",
            frame.name,
            frame.start,
            if frame.synthetic { "" } else { "not " }
        );
        frames.push(frame);
    }
    Ok(frames)
}

/// Keep only the methods whose entry point is one of `wanted`
pub fn build_method_table(methods: &[MethodImpl], wanted: &HashSet<Addr>) -> MethodTable {
    methods
        .iter()
        .filter(|m| wanted.contains(&m.address))
        .map(|m| (m.address, m.qualified_name()))
        .collect()
}

/// Resolve `addresses` (innermost first) into a [`Backtrace`]
///
/// Frames with a real symbol are taken as the host resolved them. If any frame only has a
/// synthetic symbol, the runtime is asked for its method implementations exactly once and
/// the placeholder names are replaced where an implementation starts at the symbol's start.
/// Placeholders without a match get [`UNRESOLVED_MARKER`] appended.
///
/// # Errors
///
/// Fails with [`InvalidState`](ScriptError::InvalidState) if the debuggee is not stopped.
/// A failing introspection query does not fail the call; the synthetic frames then simply
/// stay unresolved.
pub fn symbolicate<S>(host: &S, addresses: &[Addr]) -> Result<Backtrace>
where
    S: AddressResolutionService + RuntimeIntrospectionService + ?Sized,
{
    ensure_stopped(host)?;
    let pending = resolve_frames(host, addresses)?;

    let unresolved: HashSet<Addr> = pending
        .iter()
        .filter(|f| f.synthetic)
        .map(|f| f.start)
        .collect();

    let table = if unresolved.is_empty() {
        MethodTable::new()
    } else {
        match host.list_methods() {
            Ok(methods) => {
                let table = build_method_table(&methods, &unresolved);
                debug!(
                    "matched {} of {} unresolved symbols against {} runtime methods",
                    table.len(),
                    unresolved.len(),
                    methods.len()
                );
                table
            }
            Err(err) => {
                warn!("could not list the runtime methods, frames stay unresolved: {err}");
                MethodTable::new()
            }
        }
    };

    let frames = pending
        .into_iter()
        .map(|f| {
            let name = if !f.synthetic {
                f.name.clone()
            } else if let Some(method) = table.get(&f.start) {
                method.clone()
            } else {
                format!("{}{UNRESOLVED_MARKER}", f.name)
            };
            f.finish(name)
        })
        .collect();

    Ok(Backtrace { frames })
}

/// [`symbolicate`], rendered to the trace string
pub fn resolve_backtrace<S>(host: &S, addresses: &[Addr]) -> Result<String>
where
    S: AddressResolutionService + RuntimeIntrospectionService + ?Sized,
{
    Ok(symbolicate(host, addresses)?.to_string())
}

/// Format `addresses` with the names the host has, without asking the runtime for anything
pub fn plain_backtrace<S>(host: &S, addresses: &[Addr]) -> Result<Backtrace>
where
    S: AddressResolutionService + ?Sized,
{
    ensure_stopped(host)?;
    let frames = resolve_frames(host, addresses)?
        .into_iter()
        .map(|f| {
            let name = f.name.clone();
            f.finish(name)
        })
        .collect();
    Ok(Backtrace { frames })
}

/// Symbolicate the backtrace of the selected thread
///
/// # Errors
///
/// Fails with [`InvalidState`](ScriptError::InvalidState) if there is no selected thread or the
/// debuggee is running.
pub fn symbolicate_selected_thread<H: Host + ?Sized>(host: &H) -> Result<String> {
    let addresses = host
        .selected_thread()
        .ok_or_else(|| ScriptError::InvalidState("no thread is selected".to_string()))?
        .frame_addresses();
    resolve_backtrace(host, &addresses)
}
