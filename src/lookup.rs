//! # Lookup Module
//!
//! Finds global functions by regular expression and reports them grouped by the module that
//! defines them.

use std::collections::HashMap;

use tracing::debug;

use crate::errors::Result;
use crate::host::{FunctionMatch, SymbolSearchService};

const SEPARATOR_WIDTH: usize = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupOptions {
    /// Print the address range of every hit
    pub load_address: bool,
    /// Only print how many hits each module has
    pub module_summary: bool,
    /// Only report hits defined in the module with this base name
    pub module: Option<String>,
}

/// Matches grouped by module path, in the order the modules were first seen
fn group_by_module(matches: Vec<FunctionMatch>) -> Vec<(String, Vec<FunctionMatch>)> {
    let mut groups: Vec<(String, Vec<FunctionMatch>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for m in matches {
        match positions.get(&m.module_path) {
            Some(&idx) => groups[idx].1.push(m),
            None => {
                positions.insert(m.module_path.clone(), groups.len());
                groups.push((m.module_path.clone(), vec![m]));
            }
        }
    }
    groups
}

pub fn lookup<S: SymbolSearchService + ?Sized>(
    host: &S,
    query: &str,
    options: &LookupOptions,
) -> Result<String> {
    let mut matches = host.find_functions(query)?;
    if let Some(module) = &options.module {
        matches.retain(|m| &m.module_name == module);
    }
    debug!("{} functions match {query:?}", matches.len());

    let separator = format!("{}\n", "*".repeat(SEPARATOR_WIDTH));
    let mut output = String::new();

    for (_path, functions) in group_by_module(matches) {
        let module_name = &functions[0].module_name;
        let count = functions.len();

        if options.module_summary {
            output += &format!("{count} hits in {module_name}\n");
            continue;
        }

        output += &format!("{separator}{count} hits in {module_name}\n{separator}");
        for function in &functions {
            if options.load_address {
                output += &format!("[0x{:012x}-0x{:012x}]\n", function.start, function.end);
            }
            output += &function.name;
            output += "\n\n";
        }
    }

    Ok(output)
}
