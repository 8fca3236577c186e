//! # Snapshot Module
//!
//! A [`Host`] backed by a recorded, stopped debuggee, loaded from JSON.
//!
//! Snapshots make it possible to run the commands of this crate outside of a live debugger,
//! for example on a state exported from a crash or for testing.
//!
//! ```
//! use resym::snapshot::Snapshot;
//! use resym::symbolicate::resolve_backtrace;
//! use resym::addr::Addr;
//!
//! let snapshot = Snapshot::from_json(r#"{
//!     "triple": "arm64-apple-ios",
//!     "modules": [{
//!         "path": "/private/var/containers/Bundle/Application/Example.app/Example",
//!         "symbols": [
//!             { "name": "main", "start": 4096, "size": 64 },
//!             { "name": "___lldb_unnamed_symbol1", "start": 8192, "size": 256, "synthetic": true }
//!         ]
//!     }],
//!     "methods": [
//!         { "address": 8192, "class_name": "ViewController", "selector": "viewDidLoad", "kind": "instance" }
//!     ]
//! }"#).unwrap();
//!
//! let trace = resolve_backtrace(&snapshot, &[Addr::from(8200u64), Addr::from(4096u64)]).unwrap();
//! assert!(trace.contains("Example`-[ViewController viewDidLoad] + 8"));
//! assert!(trace.contains("Example`main "));
//! ```

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::addr::Addr;
use crate::errors::{Result, ScriptError};
use crate::host::{
    AddressResolutionService, BreakpointInfo, BreakpointRequest, BreakpointService,
    FunctionMatch, Host, MethodImpl, ResolvedAddress, RuntimeIntrospectionService,
    StackLoggingService, SymbolEntry, SymbolSearchService, ThreadControl,
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub triple: String,
    #[serde(default = "default_true")]
    pub stopped: bool,
    #[serde(default)]
    pub modules: Vec<Module>,
    /// Method implementations known to the Objective-C runtime
    ///
    /// [`None`] if the runtime could not be queried, which is different from a runtime without
    /// any methods.
    #[serde(default)]
    pub methods: Option<Vec<MethodImpl>>,
    #[serde(default)]
    pub threads: Vec<ThreadState>,
    /// Index into `threads`
    #[serde(default)]
    pub selected_thread: Option<usize>,
    /// Whether malloc stack logging records allocations, either switched on with
    /// `enable_logging` or because the debuggee was launched with `MallocStackLogging` set
    #[serde(default)]
    pub stack_logging: bool,
    #[serde(default)]
    pub stack_logs: Vec<StackLogRecord>,
    #[serde(default)]
    pub breakpoints: Vec<BreakpointRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub path: String,
    #[serde(default)]
    pub symbols: Vec<SymbolRecord>,
}

impl Module {
    /// File name of the module, the full path if it has none
    pub fn basename(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    pub start: Addr,
    pub size: u64,
    #[serde(default)]
    pub synthetic: bool,
}

impl SymbolRecord {
    /// First address behind the symbol, clamped to the end of the address space
    pub fn end(&self) -> Addr {
        self.start.saturating_add(self.size)
    }

    pub fn contains(&self, addr: Addr) -> bool {
        self.start <= addr && addr < self.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadState {
    /// Innermost first
    pub frames: Vec<ThreadFrame>,
    /// What evaluating an expression (usually a register) yields after stepping out
    #[serde(default)]
    pub values: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadFrame {
    pub address: Addr,
    #[serde(default)]
    pub function: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackLogRecord {
    /// The heap address the log belongs to
    pub address: Addr,
    /// Innermost first
    pub frames: Vec<Addr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointRecord {
    pub id: u32,
    pub pattern: String,
    pub regex: bool,
    pub module: Option<String>,
    pub locations: Vec<Addr>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        for module in &snapshot.modules {
            if let Some(sym) = module
                .symbols
                .iter()
                .find(|s| s.start.checked_add(s.size).is_none())
            {
                return Err(ScriptError::InvalidArgument(format!(
                    "symbol {} in {} at {} with size {:#x} runs past the end of the address space",
                    sym.name, module.path, sym.start, sym.size
                )));
            }
        }
        debug!(
            "loaded snapshot for {} with {} modules",
            snapshot.triple,
            snapshot.modules.len()
        );
        Ok(snapshot)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Named symbols with the base name of their module
    fn named_symbols(&self) -> impl Iterator<Item = (&Module, String, &SymbolRecord)> + '_ {
        self.modules.iter().flat_map(|module| {
            let basename = module.basename();
            module
                .symbols
                .iter()
                .filter(|s| !s.synthetic)
                .map(move |s| (module, basename.clone(), s))
        })
    }
}

impl AddressResolutionService for Snapshot {
    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn resolve_address(&self, addr: Addr) -> Result<ResolvedAddress> {
        for module in &self.modules {
            if let Some(sym) = module.symbols.iter().find(|s| s.contains(addr)) {
                trace!("{addr} is in {} of {}", sym.name, module.path);
                return Ok(ResolvedAddress {
                    address: addr,
                    symbol: SymbolEntry {
                        start: sym.start,
                        name: sym.name.clone(),
                        synthetic: sym.synthetic,
                    },
                    module_name: module.basename(),
                });
            }
        }
        Err(ScriptError::UnknownAddress(addr))
    }
}

impl RuntimeIntrospectionService for Snapshot {
    fn list_methods(&self) -> Result<Vec<MethodImpl>> {
        self.methods.clone().ok_or_else(|| {
            ScriptError::ResolutionFailure(
                "the Objective-C runtime is not available in the debuggee".to_string(),
            )
        })
    }
}

impl SymbolSearchService for Snapshot {
    fn find_functions(&self, pattern: &str) -> Result<Vec<FunctionMatch>> {
        let re = Regex::new(pattern)?;
        Ok(self
            .named_symbols()
            .filter(|(_, _, s)| re.is_match(&s.name))
            .map(|(module, basename, s)| FunctionMatch {
                module_path: module.path.clone(),
                module_name: basename,
                name: s.name.clone(),
                start: s.start,
                end: s.end(),
            })
            .collect())
    }
}

impl StackLoggingService for Snapshot {
    fn enable_stack_logging(&mut self) -> Result<()> {
        self.stack_logging = true;
        Ok(())
    }

    fn stack_log_frames(&self, addr: Addr, max_frames: usize) -> Result<Vec<Addr>> {
        if !self.stack_logging {
            return Err(ScriptError::ResolutionFailure(
                "malloc stack logging is not enabled, run enable_logging or launch with MallocStackLogging set"
                    .to_string(),
            ));
        }
        let record = self
            .stack_logs
            .iter()
            .find(|r| r.address == addr)
            .ok_or_else(|| {
                ScriptError::ResolutionFailure(format!(
                    "no stack log recorded for {addr}"
                ))
            })?;
        Ok(record.frames.iter().take(max_frames).copied().collect())
    }
}

impl BreakpointService for Snapshot {
    fn create_breakpoint(&mut self, request: &BreakpointRequest) -> Result<BreakpointInfo> {
        let matcher: Option<Regex> = if request.regex {
            match Regex::new(&request.pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    debug!("invalid breakpoint regex {:?}: {e}", request.pattern);
                    return Ok(BreakpointInfo {
                        id: 0,
                        pattern: request.pattern.clone(),
                        locations: 0,
                        valid: false,
                    });
                }
            }
        } else {
            None
        };

        let locations: Vec<Addr> = self
            .named_symbols()
            .filter(|(_, basename, _)| request.module.as_ref().map_or(true, |m| m == basename))
            .filter(|(_, _, s)| match &matcher {
                Some(re) => re.is_match(&s.name),
                None => s.name == request.pattern,
            })
            .map(|(_, _, s)| s.start)
            .collect();

        let id = self.breakpoints.last().map_or(1, |bp| bp.id + 1);
        let info = BreakpointInfo {
            id,
            pattern: request.pattern.clone(),
            locations: locations.len(),
            valid: true,
        };
        self.breakpoints.push(BreakpointRecord {
            id,
            pattern: request.pattern.clone(),
            regex: request.regex,
            module: request.module.clone(),
            locations,
        });
        Ok(info)
    }
}

impl ThreadControl for ThreadState {
    fn function_name(&self) -> Option<String> {
        self.frames.first().and_then(|f| f.function.clone())
    }

    fn frame_addresses(&self) -> Vec<Addr> {
        self.frames.iter().map(|f| f.address).collect()
    }

    fn step_out(&mut self) -> Result<()> {
        if self.frames.len() < 2 {
            return Err(ScriptError::InvalidState(
                "there is no frame to step out to".to_string(),
            ));
        }
        self.frames.remove(0);
        Ok(())
    }

    fn evaluate_object(&self, expression: &str) -> Result<Option<String>> {
        Ok(self.values.get(expression).cloned())
    }
}

impl Host for Snapshot {
    type Thread = ThreadState;

    fn triple(&self) -> &str {
        &self.triple
    }

    fn selected_thread(&self) -> Option<&Self::Thread> {
        self.selected_thread.and_then(|idx| self.threads.get(idx))
    }

    fn selected_thread_mut(&mut self) -> Option<&mut Self::Thread> {
        self.selected_thread.and_then(|idx| self.threads.get_mut(idx))
    }
}
