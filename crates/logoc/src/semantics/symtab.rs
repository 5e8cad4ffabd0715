use std::collections::HashMap;

use bitflags::bitflags;
use logoc_util::make_idx;
use tracing::{debug, trace};

use crate::errors::{CompileError, CompileResult};

use super::ir::FunctionDefinition;
use super::template::Template;
use super::types::{DataType, Value};

make_idx!(pub SymbolIdx, Symbol);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolClass {
    Variable,
    Function,
}

impl std::fmt::Display for SymbolClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolClass::Variable => f.write_str("VARIABLE"),
            SymbolClass::Function => f.write_str("FUNCTION"),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FunctionFlags: u8 {
        // comes from the standard library catalogue
        const LIBRARY = 1 << 0;
        // maps straight to a VM operation, no body is ever emitted
        const INTERNAL = 1 << 1;
        // body already written to the listing
        const GENERATED = 1 << 2;
        // needs the .INIT canvas directive
        const GRAPHICS = 1 << 3;
        // call parameters are evaluated in reverse of their stored order
        const REVERSE_ARGS = 1 << 4;
    }
}

// library-only call decorations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallHooks {
    pub target: Option<String>,
    pub precode: Vec<Template>,
    pub postcode: Vec<Template>,
}

#[derive(Debug, Clone, Default)]
pub struct Variable {
    pub value: Option<Value>,
    pub datatype: Option<DataType>,
}

#[derive(Debug, Clone, Default)]
pub struct Function {
    pub params: Vec<SymbolIdx>,
    pub alias: Option<String>,
    pub uses: Vec<SymbolIdx>,
    pub flags: FunctionFlags,
    pub datatype: Option<DataType>,
    pub hooks: CallHooks,
    pub code: Option<FunctionDefinition>,
}

#[derive(Debug, Clone)]
pub enum SymbolKind {
    Variable(Variable),
    Function(Function),
}

#[derive(Debug, Clone)]
pub struct Symbol {
    name: String,
    // None for library / compiler synthesized symbols
    line: Option<u32>,
    usage: u32,
    scope: String,
    fqsn: String,
    kind: SymbolKind,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn usage(&self) -> u32 {
        self.usage
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn fqsn(&self) -> &str {
        &self.fqsn
    }

    pub fn class(&self) -> SymbolClass {
        match self.kind {
            SymbolKind::Variable(_) => SymbolClass::Variable,
            SymbolKind::Function(_) => SymbolClass::Function,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.kind {
            SymbolKind::Variable(v) => Some(v),
            SymbolKind::Function(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.kind {
            SymbolKind::Function(f) => Some(f),
            SymbolKind::Variable(_) => None,
        }
    }

    pub(crate) fn as_variable_mut(&mut self) -> Option<&mut Variable> {
        match &mut self.kind {
            SymbolKind::Variable(v) => Some(v),
            SymbolKind::Function(_) => None,
        }
    }

    pub(crate) fn as_function_mut(&mut self) -> Option<&mut Function> {
        match &mut self.kind {
            SymbolKind::Function(f) => Some(f),
            SymbolKind::Variable(_) => None,
        }
    }

    pub fn flags(&self) -> FunctionFlags {
        self.as_function()
            .map(|f| f.flags)
            .unwrap_or_else(FunctionFlags::empty)
    }

    pub fn datatype(&self) -> Option<DataType> {
        match &self.kind {
            SymbolKind::Variable(v) => v.datatype,
            SymbolKind::Function(f) => f.datatype,
        }
    }
}

/// Optional fields merged into a symbol by [`SymbolTable::declare`].
#[derive(Debug, Clone, Default)]
pub struct SymbolFields {
    pub usage: Option<u32>,
    pub datatype: Option<DataType>,

    // variables only
    pub value: Option<Value>,

    // functions only
    pub params: Option<Vec<SymbolIdx>>,
    pub alias: Option<String>,
    pub uses: Option<Vec<SymbolIdx>>,
    pub flags: FunctionFlags,
    pub hooks: Option<CallHooks>,
}

impl SymbolFields {
    fn has_function_fields(&self) -> bool {
        self.params.is_some()
            || self.alias.is_some()
            || self.uses.is_some()
            || !self.flags.is_empty()
            || self.hooks.is_some()
    }
}

// insertion ordered, case-insensitive map from key to symbol
#[derive(Debug, Clone, Default)]
struct OrderedTable {
    order: Vec<SymbolIdx>,
    by_key: HashMap<String, usize>,
}

impl OrderedTable {
    fn get(&self, key: &str) -> Option<SymbolIdx> {
        self.by_key
            .get(&key.to_ascii_uppercase())
            .map(|&position| self.order[position])
    }

    // an existing key keeps its position but points at the new symbol
    fn insert(&mut self, key: &str, idx: SymbolIdx) {
        let key = key.to_ascii_uppercase();
        match self.by_key.get(&key) {
            Some(&position) => self.order[position] = idx,
            None => {
                self.by_key.insert(key, self.order.len());
                self.order.push(idx);
            }
        }
    }

    fn iter(&self) -> impl Iterator<Item = SymbolIdx> + '_ {
        self.order.iter().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    name: String,
    symbols: OrderedTable,
}

impl Scope {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> impl Iterator<Item = SymbolIdx> + '_ {
        self.symbols.iter()
    }
}

// scope stack used during translation, plus the permanent per-class tables
// every closed scope is folded into (keyed by fully qualified name)
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    scopes: Vec<Scope>,

    variables: OrderedTable,
    functions: OrderedTable,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, idx: SymbolIdx) -> &Symbol {
        &self.symbols[idx]
    }

    pub(crate) fn get_mut(&mut self, idx: SymbolIdx) -> &mut Symbol {
        &mut self.symbols[idx]
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self, name: &str) {
        debug!("push scope '{}'", name);
        self.scopes.push(Scope {
            name: name.to_string(),
            symbols: OrderedTable::default(),
        });
    }

    pub fn pop_scope(&mut self) -> CompileResult<Scope> {
        let scope = self
            .scopes
            .pop()
            .ok_or_else(|| CompileError::Internal("Popping scope from empty stack.".to_string()))?;
        debug!("pop scope '{}'", scope.name);

        for idx in scope.symbols.iter() {
            let symbol = &self.symbols[idx];
            match symbol.class() {
                SymbolClass::Variable => self.variables.insert(&symbol.fqsn, idx),
                SymbolClass::Function => self.functions.insert(&symbol.fqsn, idx),
            }
        }

        Ok(scope)
    }

    /// Dotted prefix built from every active named scope, e.g. `@SQUARE`.
    pub fn current_scope(&self) -> String {
        Self::scope_path(&self.scopes)
    }

    fn scope_path(scopes: &[Scope]) -> String {
        scopes
            .iter()
            .filter(|scope| !scope.name.is_empty())
            .map(|scope| format!("@{}", scope.name))
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn resolve(
        &self,
        name: &str,
        scope_filter: Option<&str>,
        class_filter: Option<SymbolClass>,
    ) -> Option<SymbolIdx> {
        for scope in self.scopes.iter().rev() {
            if scope_filter.is_some_and(|filter| filter != scope.name) {
                continue;
            }
            if let Some(idx) = scope.symbols.get(name) {
                if class_filter.map_or(true, |class| class == self.symbols[idx].class()) {
                    return Some(idx);
                }
            }
        }

        match (scope_filter, class_filter) {
            (None, Some(class)) => self.lookup_by_fqsn(class, name),
            _ => None,
        }
    }

    // only looks at closed scopes
    pub fn lookup_by_fqsn(&self, class: SymbolClass, fqsn: &str) -> Option<SymbolIdx> {
        match class {
            SymbolClass::Variable => self.variables.get(fqsn),
            SymbolClass::Function => self.functions.get(fqsn),
        }
    }

    /// Symbols of one class from closed scopes, in the order they were folded in.
    pub fn symbols_by_class(&self, class: SymbolClass) -> impl Iterator<Item = SymbolIdx> + '_ {
        match class {
            SymbolClass::Variable => self.variables.iter(),
            SymbolClass::Function => self.functions.iter(),
        }
    }

    pub fn declare(
        &mut self,
        name: &str,
        class: SymbolClass,
        line: Option<u32>,
        fields: SymbolFields,
    ) -> CompileResult<SymbolIdx> {
        let frame = self
            .scopes
            .len()
            .checked_sub(1)
            .ok_or_else(|| CompileError::Internal(format!("No scope to declare '{}'.", name)))?;
        self.declare_in_frame(frame, name, class, line, fields)
    }

    // declares in the innermost frame, shadowing any outer symbol of the same name
    pub fn declare_local(
        &mut self,
        name: &str,
        class: SymbolClass,
        line: Option<u32>,
        fields: SymbolFields,
    ) -> CompileResult<SymbolIdx> {
        let frame = self
            .scopes
            .len()
            .checked_sub(1)
            .ok_or_else(|| CompileError::Internal(format!("No scope to declare '{}'.", name)))?;
        match self.scopes[frame].symbols.get(name) {
            Some(idx) => self.update_existing(idx, name, class, line, fields),
            None => self.insert_new(frame, name, class, line, fields),
        }
    }

    // like declare, but new symbols land in the outermost frame
    pub fn declare_global(
        &mut self,
        name: &str,
        class: SymbolClass,
        line: Option<u32>,
        fields: SymbolFields,
    ) -> CompileResult<SymbolIdx> {
        if self.scopes.is_empty() {
            return Err(CompileError::Internal(format!(
                "No scope to declare '{}'.",
                name
            )));
        }
        self.declare_in_frame(0, name, class, line, fields)
    }

    fn declare_in_frame(
        &mut self,
        frame: usize,
        name: &str,
        class: SymbolClass,
        line: Option<u32>,
        fields: SymbolFields,
    ) -> CompileResult<SymbolIdx> {
        match self.resolve(name, None, None) {
            Some(idx) => self.update_existing(idx, name, class, line, fields),
            None => self.insert_new(frame, name, class, line, fields),
        }
    }

    fn update_existing(
        &mut self,
        idx: SymbolIdx,
        name: &str,
        class: SymbolClass,
        line: Option<u32>,
        fields: SymbolFields,
    ) -> CompileResult<SymbolIdx> {
        let existing = &self.symbols[idx];
        if existing.class() != class {
            return Err(CompileError::SymbolRedeclaration {
                line: line.unwrap_or(0),
                symbol: name.to_string(),
                original: existing.line,
            });
        }
        self.merge(idx, line, fields)?;
        Ok(idx)
    }

    fn insert_new(
        &mut self,
        frame: usize,
        name: &str,
        class: SymbolClass,
        line: Option<u32>,
        fields: SymbolFields,
    ) -> CompileResult<SymbolIdx> {
        let scope = Self::scope_path(&self.scopes[..=frame]);
        let fqsn = if scope.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", scope, name)
        };

        let kind = match class {
            SymbolClass::Variable => {
                if fields.has_function_fields() {
                    return Err(CompileError::Internal(format!(
                        "Function fields given for variable '{}'.",
                        name
                    )));
                }
                SymbolKind::Variable(Variable {
                    value: fields.value.clone(),
                    datatype: fields.datatype,
                })
            }
            SymbolClass::Function => {
                if fields.value.is_some() {
                    return Err(CompileError::Internal(format!(
                        "Value given for function '{}'.",
                        name
                    )));
                }
                SymbolKind::Function(Function::default())
            }
        };

        trace!("Adding symbol:{}:{}:{:?}:{:?}", name, class, line, fields);
        let symbol = Symbol {
            name: name.to_string(),
            line,
            usage: fields.usage.unwrap_or(0),
            scope,
            fqsn,
            kind,
        };
        let idx = SymbolIdx::from_push(&mut self.symbols, symbol);
        if let SymbolClass::Function = class {
            self.apply_function_fields(idx, fields);
        }
        self.scopes[frame].symbols.insert(name, idx);
        Ok(idx)
    }

    fn merge(
        &mut self,
        idx: SymbolIdx,
        line: Option<u32>,
        mut fields: SymbolFields,
    ) -> CompileResult<()> {
        trace!("Updating symbol:{}:{:?}", self.symbols[idx].name, fields);
        let symbol = self.get_mut(idx);

        // a real declaration line is final, and so is a value recorded with it
        let mut line = line;
        if symbol.line.is_some() {
            line = None;
            if symbol.as_variable().is_some_and(|v| v.value.is_some()) {
                fields.value = None;
            }
        }
        if line.is_some() {
            symbol.line = line;
        }
        if let Some(usage) = fields.usage {
            symbol.usage = usage;
        }

        match &mut symbol.kind {
            SymbolKind::Variable(variable) => {
                if fields.has_function_fields() {
                    return Err(CompileError::Internal(format!(
                        "Function fields given for variable '{}'.",
                        symbol.name
                    )));
                }
                if fields.value.is_some() {
                    variable.value = fields.value;
                }
                if fields.datatype.is_some() {
                    variable.datatype = fields.datatype;
                }
                Ok(())
            }
            SymbolKind::Function(_) => {
                if fields.value.is_some() {
                    return Err(CompileError::Internal(format!(
                        "Value given for function '{}'.",
                        symbol.name
                    )));
                }
                self.apply_function_fields(idx, fields);
                Ok(())
            }
        }
    }

    fn apply_function_fields(&mut self, idx: SymbolIdx, fields: SymbolFields) {
        let Some(function) = self.symbols[idx].as_function_mut() else {
            return;
        };
        if let Some(params) = fields.params {
            function.params = params;
        }
        if let Some(alias) = fields.alias {
            function.alias = Some(alias);
        }
        if let Some(uses) = fields.uses {
            function.uses = uses;
        }
        if let Some(hooks) = fields.hooks {
            function.hooks = hooks;
        }
        if fields.datatype.is_some() {
            function.datatype = fields.datatype;
        }
        function.flags |= fields.flags;
    }

    pub(crate) fn set_value(&mut self, idx: SymbolIdx, value: Value) -> CompileResult<()> {
        let symbol = self.get_mut(idx);
        let name = symbol.name.clone();
        let variable = symbol
            .as_variable_mut()
            .ok_or_else(|| CompileError::Internal(format!("'{}' is not a variable.", name)))?;
        variable.value = Some(value);
        Ok(())
    }

    pub(crate) fn set_code(&mut self, idx: SymbolIdx, code: FunctionDefinition) -> CompileResult<()> {
        let symbol = self.get_mut(idx);
        let name = symbol.name.clone();
        let function = symbol
            .as_function_mut()
            .ok_or_else(|| CompileError::Internal(format!("'{}' is not a function.", name)))?;
        function.code = Some(code);
        Ok(())
    }

    pub(crate) fn mark_generated(&mut self, idx: SymbolIdx) {
        if let Some(function) = self.symbols[idx].as_function_mut() {
            function.flags |= FunctionFlags::GENERATED;
        }
    }

    // follows alias links until a function without alias is found
    pub fn resolve_alias(&self, idx: SymbolIdx) -> Option<SymbolIdx> {
        let mut current = idx;
        // alias chains can not be longer than the number of symbols
        for _ in 0..=self.symbols.len() {
            match self.symbols[current].as_function()?.alias.as_deref() {
                Some(alias) => current = self.resolve(alias, None, Some(SymbolClass::Function))?,
                None => return Some(current),
            }
        }
        None
    }

    pub fn count_usage(
        &mut self,
        name: &str,
        class_filter: Option<SymbolClass>,
    ) -> CompileResult<SymbolIdx> {
        let idx = self
            .resolve(name, None, class_filter)
            .ok_or_else(|| CompileError::Internal(format!("Increasing unknown symbol usage: {}", name)))?;
        self.count_usage_of(idx)?;
        Ok(idx)
    }

    pub(crate) fn count_usage_of(&mut self, idx: SymbolIdx) -> CompileResult<()> {
        self.symbols[idx].usage += 1;

        let mut dependent = idx;
        let alias = self.symbols[idx]
            .as_function()
            .and_then(|f| f.alias.clone());
        if let Some(alias) = alias {
            let aliased = self
                .resolve(&alias, None, Some(SymbolClass::Function))
                .ok_or_else(|| CompileError::Internal(format!("Increasing unknown symbol usage: {}", alias)))?;
            self.symbols[aliased].usage += 1;
            dependent = aliased;
        }

        let dependencies: Vec<SymbolIdx> = match self.symbols[dependent].as_function() {
            Some(function) => function
                .params
                .iter()
                .chain(function.uses.iter())
                .copied()
                .collect(),
            None => Vec::new(),
        };
        for dependency in dependencies {
            self.count_usage_of(dependency)?;
        }

        Ok(())
    }
}
