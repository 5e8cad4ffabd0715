use std::fmt;

use tracing::{debug, warn};

use crate::errors::{CompileError, CompileResult};
use crate::semantics::ir::ENTRY_POINT;
use crate::semantics::symtab::{FunctionFlags, SymbolClass, SymbolIdx, SymbolTable};

#[cfg(test)]
mod codegen_tests;

const CANVAS: &str = ".INIT 200 200 400 400";

/// A finished instruction listing, one entry per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    lines: Vec<String>,
}

impl Listing {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

// directives, labels and definition headers are flush left
fn indentation(line: &str) -> &'static str {
    if line.is_empty() || line.starts_with('.') || line.starts_with(':') || line.starts_with("DEF") {
        ""
    } else {
        "  "
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines.iter() {
            writeln!(f, "{}{}", indentation(line), line)?;
        }
        Ok(())
    }
}

/// Assembles the final listing from a completed symbol table.
///
/// Only functions and variables with a non-zero usage count are emitted, so
/// anything never referenced from the entry point is dropped. The only
/// mutation is flagging functions as generated once their body is written.
pub fn link(symtab: &mut SymbolTable) -> CompileResult<Listing> {
    let functions: Vec<SymbolIdx> = symtab
        .symbols_by_class(SymbolClass::Function)
        .filter(|idx| symtab.get(*idx).usage() > 0)
        .collect();
    debug!("Selected functions: {}", functions.len());

    let mut lines = vec![format!(".START {}", ENTRY_POINT)];

    if functions
        .iter()
        .any(|idx| symtab.get(*idx).flags().contains(FunctionFlags::GRAPHICS))
    {
        lines.push(String::new());
        lines.push(CANVAS.to_string());
    }

    let variables: Vec<SymbolIdx> = symtab
        .symbols_by_class(SymbolClass::Variable)
        .filter(|idx| symtab.get(*idx).usage() > 0)
        .collect();
    if !variables.is_empty() {
        debug!("DATA section.");
        lines.push(String::new());
        lines.push(".DATA".to_string());
        for idx in variables {
            let symbol = symtab.get(idx);
            let value = symbol.as_variable().and_then(|v| {
                v.value.clone().or_else(|| v.datatype.map(|t| t.zero()))
            });
            let value = value.map_or_else(|| "0".to_string(), |v| v.to_string());
            lines.push(format!("{:<8} {}", symbol.fqsn(), value));
        }
    }

    debug!("CODE section.");
    lines.push(String::new());
    lines.push(".CODE".to_string());
    for idx in functions {
        let name = symtab.get(idx).name().to_string();
        let undefined = || CompileError::Link(format!("Undefined function: '{}'.", name));

        let alias = symtab.get(idx).as_function().and_then(|f| f.alias.clone());
        let target = match &alias {
            Some(_) => symtab.resolve_alias(idx).ok_or_else(undefined)?,
            None => idx,
        };
        let symbol = symtab.get(target);
        let function = symbol.as_function().ok_or_else(undefined)?;
        if !function.flags.contains(FunctionFlags::LIBRARY) && function.code.is_none() {
            return Err(undefined());
        }

        let flags = function.flags;
        if !flags.contains(FunctionFlags::GENERATED) && !flags.contains(FunctionFlags::INTERNAL) {
            debug!("Function: {}", name);
            if let Some(code) = &function.code {
                lines.extend(code.gen_code(symtab));
            }
            symtab.mark_generated(target);
            if alias.is_some() {
                symtab.mark_generated(idx);
            }
        } else if !flags.contains(FunctionFlags::LIBRARY) {
            warn!(
                "Function {} defined but not used:{}",
                name,
                symbol.line().unwrap_or(0)
            );
        }
    }

    Ok(Listing { lines })
}
