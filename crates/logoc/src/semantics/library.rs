// built-in primitives, installed into the global frame before any source is translated

use crate::errors::{CompileError, CompileResult};

use super::ir::{BodyEntry, FunctionDefinition};
use super::symtab::{CallHooks, FunctionFlags, SymbolClass, SymbolFields, SymbolTable};
use super::template::Template;
use super::types::DataType;

/// Turtle heading, shared by every primitive that moves or turns.
pub const HEADING_VAR: &str = "_@ang";

struct LibraryEntry {
    name: &'static str,
    flags: FunctionFlags,
    params: &'static [&'static str],
    uses: &'static [&'static str],
    alias: Option<&'static str>,
    target: Option<&'static str>,
    precode: &'static [&'static str],
    postcode: &'static [&'static str],
    code: &'static [&'static str],
    datatype: Option<DataType>,
}

const BASE: LibraryEntry = LibraryEntry {
    name: "",
    flags: FunctionFlags::LIBRARY,
    params: &[],
    uses: &[],
    alias: None,
    target: None,
    precode: &[],
    postcode: &[],
    code: &[],
    datatype: None,
};

const GRAPHICS: FunctionFlags = FunctionFlags::LIBRARY.union(FunctionFlags::GRAPHICS);

const STANDARD_LIBRARY: &[LibraryEntry] = &[
    LibraryEntry {
        name: "PRINT",
        flags: FunctionFlags::LIBRARY
            .union(FunctionFlags::INTERNAL)
            .union(FunctionFlags::REVERSE_ARGS),
        target: Some("WRITE"),
        ..BASE
    },
    LibraryEntry {
        name: "TYPEIN",
        flags: FunctionFlags::LIBRARY.union(FunctionFlags::INTERNAL),
        target: Some("READ"),
        postcode: &["STOR {params[0].name}"],
        ..BASE
    },
    LibraryEntry {
        name: "RANDOM",
        datatype: Some(DataType::Int),
        code: &["RAND", "PUSH 10", "MUL", "TRUNC"],
        ..BASE
    },
    LibraryEntry {
        name: "FORWARD",
        flags: GRAPHICS,
        params: &["length"],
        uses: &[HEADING_VAR],
        code: &["LOAD _@ang", "LOAD {argv[0]}", "CALL MOVE"],
        ..BASE
    },
    LibraryEntry {
        name: "BACKWARD",
        flags: GRAPHICS,
        params: &["length"],
        uses: &[HEADING_VAR],
        code: &["LOAD _@ang", "PUSH 180", "ADD", "LOAD {argv[0]}", "CALL MOVE"],
        ..BASE
    },
    LibraryEntry {
        name: "RIGHT",
        flags: GRAPHICS,
        params: &["angle"],
        uses: &[HEADING_VAR],
        code: &["LOAD _@ang", "LOAD {argv[0]}", "SUB", "STOR _@ang"],
        ..BASE
    },
    LibraryEntry {
        name: "LEFT",
        flags: GRAPHICS,
        params: &["angle"],
        uses: &[HEADING_VAR],
        code: &["LOAD _@ang", "LOAD {argv[0]}", "ADD", "STOR _@ang"],
        ..BASE
    },
    LibraryEntry {
        name: "PENUP",
        flags: GRAPHICS,
        code: &["UNSET 0"],
        ..BASE
    },
    LibraryEntry {
        name: "PENDOWN",
        flags: GRAPHICS,
        code: &["SET 0"],
        ..BASE
    },
    LibraryEntry {
        name: "HEADING",
        flags: GRAPHICS,
        uses: &[HEADING_VAR],
        code: &["LOAD _@ang"],
        ..BASE
    },
    LibraryEntry {
        name: "SETXY",
        flags: GRAPHICS,
        params: &["x", "y"],
        code: &["LOAD {argv[0]}", "LOAD {argv[1]}", "MVTO"],
        ..BASE
    },
    LibraryEntry {
        name: "WIPECLEAN",
        flags: GRAPHICS,
        target: Some("CLRSCR"),
        ..BASE
    },
    LibraryEntry {
        name: "FO",
        flags: GRAPHICS,
        alias: Some("FORWARD"),
        ..BASE
    },
    LibraryEntry {
        name: "BW",
        flags: GRAPHICS,
        alias: Some("BACKWARD"),
        ..BASE
    },
    LibraryEntry {
        name: "RT",
        flags: GRAPHICS,
        alias: Some("RIGHT"),
        ..BASE
    },
    LibraryEntry {
        name: "LT",
        flags: GRAPHICS,
        alias: Some("LEFT"),
        ..BASE
    },
    LibraryEntry {
        name: "PU",
        flags: GRAPHICS,
        alias: Some("PENUP"),
        ..BASE
    },
    LibraryEntry {
        name: "PD",
        flags: GRAPHICS,
        alias: Some("PENDOWN"),
        ..BASE
    },
    LibraryEntry {
        name: "WC",
        flags: GRAPHICS,
        alias: Some("WIPECLEAN"),
        ..BASE
    },
];

fn parse_templates(sources: &[&str]) -> CompileResult<Vec<Template>> {
    sources.iter().map(|source| Template::parse(source)).collect()
}

/// Declares the heading variable and every primitive in the current (global) frame.
pub fn install(symtab: &mut SymbolTable) -> CompileResult<()> {
    symtab.declare(HEADING_VAR, SymbolClass::Variable, None, SymbolFields::default())?;

    for entry in STANDARD_LIBRARY {
        let hooks = CallHooks {
            target: entry.target.map(str::to_string),
            precode: parse_templates(entry.precode)?,
            postcode: parse_templates(entry.postcode)?,
        };
        let symbol = symtab.declare(
            entry.name,
            SymbolClass::Function,
            None,
            SymbolFields {
                datatype: entry.datatype,
                alias: entry.alias.map(str::to_string),
                flags: entry.flags,
                hooks: Some(hooks),
                ..Default::default()
            },
        )?;

        symtab.push_scope(entry.name);
        let params = entry
            .params
            .iter()
            .map(|param| {
                symtab.declare_local(param, SymbolClass::Variable, None, SymbolFields::default())
            })
            .collect::<CompileResult<Vec<_>>>()?;
        symtab.pop_scope()?;

        let uses = entry
            .uses
            .iter()
            .map(|name| {
                symtab
                    .resolve(name, None, Some(SymbolClass::Variable))
                    .ok_or_else(|| {
                        CompileError::Internal(format!(
                            "Library function '{}' uses unknown symbol '{}'.",
                            entry.name, name
                        ))
                    })
            })
            .collect::<CompileResult<Vec<_>>>()?;

        symtab.declare(
            entry.name,
            SymbolClass::Function,
            None,
            SymbolFields {
                params: Some(params),
                uses: Some(uses),
                ..Default::default()
            },
        )?;

        let body = parse_templates(entry.code)?
            .into_iter()
            .map(BodyEntry::Template)
            .collect();
        symtab.set_code(symbol, FunctionDefinition::new(symbol, body))?;
    }

    Ok(())
}
