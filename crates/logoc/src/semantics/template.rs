// instruction templates carried by standard library entries, e.g. "LOAD {argv[0]}"

use crate::errors::{CompileError, CompileResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Placeholder {
    // fully qualified name of the function symbol's n-th declared parameter
    Argv(usize),
    // name of the function symbol
    Name,
    // fully qualified name of the n-th parameter at a call site
    CallParam(usize),
    // number of parameters at a call site
    CallParamCount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Hole(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
}

/// Supplies values for template placeholders; `None` leaves the placeholder verbatim.
pub trait TemplateContext {
    fn name(&self) -> Option<String> {
        None
    }

    fn argv(&self, _n: usize) -> Option<String> {
        None
    }

    fn call_param_name(&self, _n: usize) -> Option<String> {
        None
    }

    fn call_param_count(&self) -> Option<usize> {
        None
    }
}

fn parse_index(text: &str, prefix: &str, suffix: &str) -> Option<usize> {
    text.strip_prefix(prefix)?
        .strip_suffix(suffix)?
        .parse::<usize>()
        .ok()
}

fn parse_placeholder(text: &str) -> Option<Placeholder> {
    match text {
        "name" => Some(Placeholder::Name),
        "params_len" => Some(Placeholder::CallParamCount),
        _ => parse_index(text, "argv[", "]")
            .map(Placeholder::Argv)
            .or_else(|| parse_index(text, "params[", "].name").map(Placeholder::CallParam)),
    }
}

impl Template {
    pub fn parse(source: &str) -> CompileResult<Template> {
        let malformed = || CompileError::Internal(format!("Malformed template: '{}'", source));

        let mut parts = Vec::new();
        let mut rest = source;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                parts.push(Part::Text(rest[..open].to_string()));
            }
            let close = rest[open..].find('}').ok_or_else(malformed)? + open;
            let placeholder = parse_placeholder(&rest[open + 1..close]).ok_or_else(malformed)?;
            parts.push(Part::Hole(placeholder));
            rest = &rest[close + 1..];
        }
        if rest.contains('}') {
            return Err(malformed());
        }
        if !rest.is_empty() {
            parts.push(Part::Text(rest.to_string()));
        }

        Ok(Template {
            parts,
        })
    }

    pub fn render(&self, ctx: &impl TemplateContext) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Hole(placeholder) => {
                    let value = match placeholder {
                        Placeholder::Argv(n) => ctx.argv(*n),
                        Placeholder::Name => ctx.name(),
                        Placeholder::CallParam(n) => ctx.call_param_name(*n),
                        Placeholder::CallParamCount => ctx.call_param_count().map(|n| n.to_string()),
                    };
                    match value {
                        Some(value) => out.push_str(&value),
                        None => {
                            out.push('{');
                            out.push_str(&placeholder_source(placeholder));
                            out.push('}');
                        }
                    }
                }
            }
        }
        out
    }
}

fn placeholder_source(placeholder: &Placeholder) -> String {
    match placeholder {
        Placeholder::Argv(n) => format!("argv[{}]", n),
        Placeholder::Name => "name".to_string(),
        Placeholder::CallParam(n) => format!("params[{}].name", n),
        Placeholder::CallParamCount => "params_len".to_string(),
    }
}
