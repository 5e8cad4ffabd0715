use std::cmp::Ordering;
use std::fmt;

use tracing::info;

use crate::errors::{CompileError, CompileResult};

use super::symtab::{FunctionFlags, Symbol, SymbolClass, SymbolIdx, SymbolTable};
use super::template::{Template, TemplateContext};
use super::types::{DataType, Value};

pub const ENTRY_POINT: &str = "__main__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl ArithOp {
    pub fn from_text(text: &str) -> Option<ArithOp> {
        match text {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            "/" => Some(ArithOp::Div),
            "%" => Some(ArithOp::Mod),
            "^" => Some(ArithOp::Pow),
            _ => None,
        }
    }

    fn mnemonics(self) -> &'static [&'static str] {
        match self {
            ArithOp::Add => &["ADD"],
            ArithOp::Sub => &["SUB"],
            ArithOp::Mul => &["MUL"],
            ArithOp::Div => &["DIV"],
            ArithOp::Mod => &["IDIV", "POP"],
            ArithOp::Pow => &["POW"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Equal,
    NotEqual,
}

impl RelOp {
    pub fn from_text(text: &str) -> Option<RelOp> {
        match text {
            "<" => Some(RelOp::Less),
            "<=" => Some(RelOp::LessEq),
            ">" => Some(RelOp::Greater),
            ">=" => Some(RelOp::GreaterEq),
            "==" => Some(RelOp::Equal),
            "<>" => Some(RelOp::NotEqual),
            _ => None,
        }
    }

    fn is_equality(self) -> bool {
        matches!(self, RelOp::Equal | RelOp::NotEqual)
    }

    // branches taken when the comparison holds
    fn if_true(self) -> &'static [&'static str] {
        match self {
            RelOp::Less => &["JLESS"],
            RelOp::LessEq => &["JLESS", "JZ"],
            RelOp::Greater => &["JMORE"],
            RelOp::GreaterEq => &["JMORE", "JZ"],
            RelOp::Equal => &["JZ"],
            RelOp::NotEqual => &["JNZ"],
        }
    }

    // branches taken when the comparison fails
    fn if_false(self) -> &'static [&'static str] {
        match self {
            RelOp::Less => &["JMORE", "JZ"],
            RelOp::LessEq => &["JMORE"],
            RelOp::Greater => &["JLESS", "JZ"],
            RelOp::GreaterEq => &["JLESS"],
            RelOp::Equal => &["JNZ"],
            RelOp::NotEqual => &["JZ"],
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            RelOp::Less => ordering.is_lt(),
            RelOp::LessEq => ordering.is_le(),
            RelOp::Greater => ordering.is_gt(),
            RelOp::GreaterEq => ordering.is_ge(),
            RelOp::Equal => ordering.is_eq(),
            RelOp::NotEqual => ordering.is_ne(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    pub fn from_text(text: &str) -> Option<LogicOp> {
        match text.to_ascii_uppercase().as_str() {
            "AND" => Some(LogicOp::And),
            "OR" => Some(LogicOp::Or),
            _ => None,
        }
    }
}

/// A jump target, rendered as `:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Label(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn gen_code(&self) -> Vec<String> {
        vec![format!(":{}", self.0)]
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

/// Where a boolean node sends control; `None` falls through to the next instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets {
    pub on_true: Option<Label>,
    pub on_false: Option<Label>,
}

impl Targets {
    pub fn new(on_true: Option<Label>, on_false: Option<Label>) -> Self {
        Targets { on_true, on_false }
    }

    fn swapped(&self) -> Targets {
        Targets {
            on_true: self.on_false.clone(),
            on_false: self.on_true.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Const(Value),
    Variable { symbol: SymbolIdx, datatype: DataType },
    Binary(Box<BinaryExpr>),
    Call(CallProcedure),
    Bool(Box<BoolExpr>),
}

impl Expr {
    pub fn variable(symtab: &SymbolTable, symbol: SymbolIdx) -> Expr {
        Expr::Variable {
            symbol,
            // untyped references (parameters, TYPEIN targets) behave as floats
            datatype: symtab.get(symbol).datatype().unwrap_or(DataType::Float),
        }
    }

    pub fn datatype(&self) -> DataType {
        match self {
            Expr::Const(value) => value.datatype(),
            Expr::Variable { datatype, .. } => *datatype,
            Expr::Binary(binary) => binary.datatype,
            Expr::Call(call) => call.datatype.unwrap_or(DataType::Float),
            Expr::Bool(_) => DataType::Bool,
        }
    }

    /// The statically known value, if every leaf is a literal.
    pub fn value(&self) -> Option<Value> {
        match self {
            Expr::Const(value) => Some(value.clone()),
            Expr::Binary(binary) => binary.value.clone(),
            Expr::Bool(boolean) => boolean.value().map(Value::Bool),
            Expr::Variable { .. } | Expr::Call(_) => None,
        }
    }

    pub fn is_const(&self) -> bool {
        self.value().is_some()
    }

    pub fn gen_code(&self, symtab: &SymbolTable) -> Vec<String> {
        match self {
            Expr::Const(value) => vec![format!("PUSH {}", value)],
            Expr::Variable { symbol, .. } => {
                vec![format!("LOAD {}", symtab.get(*symbol).fqsn())]
            }
            Expr::Binary(binary) => binary.gen_code(symtab),
            Expr::Call(call) => call.gen_code(symtab),
            Expr::Bool(boolean) => boolean.gen_code(symtab, &Targets::default()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    op: ArithOp,
    lhs: Expr,
    rhs: Expr,
    datatype: DataType,
    value: Option<Value>,
}

impl BinaryExpr {
    /// The folded value's type can differ from `datatype`: `/` always folds to
    /// a float, and so does `^` with a negative exponent, even on int operands.
    pub fn new(op: ArithOp, lhs: Expr, rhs: Expr, line: u32) -> CompileResult<Expr> {
        for operand in [&lhs, &rhs] {
            if !operand.datatype().is_numeric() {
                return Err(CompileError::invalid_type(
                    line,
                    format!("Invalid data type:'{}'", operand.datatype()),
                ));
            }
        }

        let datatype = DataType::unify_numeric(lhs.datatype(), rhs.datatype());
        let value = match (lhs.value(), rhs.value()) {
            (Some(l), Some(r)) => Some(fold(op, &l, &r, line)?),
            _ => None,
        };

        Ok(Expr::Binary(Box::new(BinaryExpr {
            op,
            lhs,
            rhs,
            datatype,
            value,
        })))
    }

    fn gen_code(&self, symtab: &SymbolTable) -> Vec<String> {
        let mut code = self.lhs.gen_code(symtab);
        code.extend(self.rhs.gen_code(symtab));
        code.extend(self.op.mnemonics().iter().map(|m| m.to_string()));
        code
    }
}

fn overflow(line: u32) -> CompileError {
    CompileError::invalid_type(line, "Integer overflow in constant expression")
}

fn division_by_zero(line: u32) -> CompileError {
    CompileError::invalid_type(line, "Division by zero in constant expression")
}

// evaluates a constant operation; `/` is always true division, `%` takes the
// sign of the divisor
fn fold(op: ArithOp, lhs: &Value, rhs: &Value, line: u32) -> CompileResult<Value> {
    if let (Value::Int(l), Value::Int(r)) = (lhs, rhs) {
        let (l, r) = (*l, *r);
        let result = match op {
            ArithOp::Add => l.checked_add(r).ok_or_else(|| overflow(line))?,
            ArithOp::Sub => l.checked_sub(r).ok_or_else(|| overflow(line))?,
            ArithOp::Mul => l.checked_mul(r).ok_or_else(|| overflow(line))?,
            ArithOp::Div => {
                if r == 0 {
                    return Err(division_by_zero(line));
                }
                return Ok(Value::Float(l as f64 / r as f64));
            }
            ArithOp::Mod => {
                if r == 0 {
                    return Err(division_by_zero(line));
                }
                let m = l.checked_rem(r).ok_or_else(|| overflow(line))?;
                if m != 0 && (m < 0) != (r < 0) {
                    m + r
                } else {
                    m
                }
            }
            ArithOp::Pow => match u32::try_from(r) {
                Ok(exp) => l.checked_pow(exp).ok_or_else(|| overflow(line))?,
                Err(_) if r < 0 => return Ok(Value::Float((l as f64).powf(r as f64))),
                Err(_) => return Err(overflow(line)),
            },
        };
        return Ok(Value::Int(result));
    }

    let (Some(l), Some(r)) = (lhs.as_f64(), rhs.as_f64()) else {
        return Err(CompileError::Internal(format!(
            "Cannot fold '{}' and '{}'.",
            lhs.datatype(),
            rhs.datatype()
        )));
    };
    let result = match op {
        ArithOp::Add => l + r,
        ArithOp::Sub => l - r,
        ArithOp::Mul => l * r,
        ArithOp::Div => {
            if r == 0.0 {
                return Err(division_by_zero(line));
            }
            l / r
        }
        ArithOp::Mod => {
            if r == 0.0 {
                return Err(division_by_zero(line));
            }
            let m = l % r;
            if m != 0.0 && (m < 0.0) != (r < 0.0) {
                m + r
            } else {
                m
            }
        }
        ArithOp::Pow => l.powf(r),
    };
    if !result.is_finite() {
        return Err(CompileError::invalid_type(
            line,
            "Constant expression has no finite value",
        ));
    }
    Ok(Value::Float(result))
}

#[derive(Debug, Clone)]
pub struct RelationalExpr {
    op: RelOp,
    lhs: Expr,
    rhs: Expr,
}

impl RelationalExpr {
    pub fn new(op: RelOp, lhs: Expr, rhs: Expr, line: u32) -> CompileResult<BoolExpr> {
        for operand in [&lhs, &rhs] {
            if operand.datatype() == DataType::Bool {
                return Err(CompileError::invalid_type(
                    line,
                    format!("Invalid data type:'{}'", DataType::Bool),
                ));
            }
        }
        let has_str = lhs.datatype() == DataType::Str || rhs.datatype() == DataType::Str;
        if has_str {
            if lhs.datatype() != rhs.datatype() {
                return Err(CompileError::invalid_type(
                    line,
                    "Cannot compare STRING to other data type",
                ));
            }
            if !op.is_equality() {
                return Err(CompileError::invalid_type(
                    line,
                    "Can only compare STRING equality",
                ));
            }
        }
        Ok(BoolExpr::Relational(RelationalExpr { op, lhs, rhs }))
    }

    fn value(&self) -> Option<bool> {
        let (lhs, rhs) = (self.lhs.value()?, self.rhs.value()?);
        let ordering = match (lhs.str_contents(), rhs.str_contents()) {
            (Some(l), Some(r)) => l.cmp(r),
            _ => lhs.as_f64()?.partial_cmp(&rhs.as_f64()?)?,
        };
        Some(self.op.holds(ordering))
    }

    fn gen_code(&self, symtab: &SymbolTable, targets: &Targets) -> Vec<String> {
        let mut code = self.lhs.gen_code(symtab);
        code.extend(self.rhs.gen_code(symtab));
        code.push("SUB".to_string());
        code.push("POP".to_string());

        let jumps = |mnemonics: &[&str], label: &Label| {
            mnemonics
                .iter()
                .map(|m| format!("{} {}", m, label))
                .collect::<Vec<_>>()
        };
        match (&targets.on_true, &targets.on_false) {
            (Some(on_true), Some(on_false)) => {
                code.extend(jumps(self.op.if_true(), on_true));
                code.push(format!("JP {}", on_false));
            }
            (Some(on_true), None) => code.extend(jumps(self.op.if_true(), on_true)),
            (None, Some(on_false)) => code.extend(jumps(self.op.if_false(), on_false)),
            (None, None) => {}
        }
        code
    }
}

#[derive(Debug, Clone)]
pub struct LogicExpr {
    op: LogicOp,
    lhs: BoolExpr,
    rhs: BoolExpr,
    // placed after the right operand when the left one needs somewhere to
    // short-circuit to and the combinator's own target falls through
    skip: Label,
}

#[derive(Debug, Clone)]
pub enum BoolExpr {
    Literal(bool),
    Relational(RelationalExpr),
    Not(Box<BoolExpr>),
    Logic(Box<LogicExpr>),
}

impl BoolExpr {
    pub fn not(operand: Expr, line: u32) -> CompileResult<BoolExpr> {
        Ok(BoolExpr::Not(Box::new(Self::require_bool(operand, line)?)))
    }

    pub fn logic(op: LogicOp, lhs: Expr, rhs: Expr, skip: Label, line: u32) -> CompileResult<BoolExpr> {
        let lhs = Self::require_bool(lhs, line)?;
        let rhs = Self::require_bool(rhs, line)?;
        Ok(BoolExpr::Logic(Box::new(LogicExpr { op, lhs, rhs, skip })))
    }

    // only nodes that can branch are accepted as boolean operands
    pub fn require_bool(expr: Expr, line: u32) -> CompileResult<BoolExpr> {
        match expr {
            Expr::Bool(boolean) => Ok(*boolean),
            other => Err(CompileError::invalid_type(
                line,
                format!("Invalid data type:'{}'", other.datatype()),
            )),
        }
    }

    pub fn value(&self) -> Option<bool> {
        match self {
            BoolExpr::Literal(value) => Some(*value),
            BoolExpr::Relational(relational) => relational.value(),
            BoolExpr::Not(operand) => operand.value().map(|v| !v),
            BoolExpr::Logic(logic) => {
                let (l, r) = (logic.lhs.value()?, logic.rhs.value()?);
                Some(match logic.op {
                    LogicOp::And => l && r,
                    LogicOp::Or => l || r,
                })
            }
        }
    }

    pub fn gen_code(&self, symtab: &SymbolTable, targets: &Targets) -> Vec<String> {
        match self {
            BoolExpr::Literal(value) => {
                if targets.on_true.is_none() && targets.on_false.is_none() {
                    return vec![
                        format!("PUSH {}", Value::Bool(*value)),
                        "CMP 0".to_string(),
                    ];
                }
                let target = if *value {
                    &targets.on_true
                } else {
                    &targets.on_false
                };
                match target {
                    Some(label) => vec![format!("JP {}", label)],
                    None => Vec::new(),
                }
            }
            BoolExpr::Relational(relational) => relational.gen_code(symtab, targets),
            BoolExpr::Not(operand) => operand.gen_code(symtab, &targets.swapped()),
            BoolExpr::Logic(logic) => logic.gen_code(symtab, targets),
        }
    }
}

impl LogicExpr {
    fn gen_code(&self, symtab: &SymbolTable, targets: &Targets) -> Vec<String> {
        let mut skip_used = false;
        let mut short_circuit = |target: &Option<Label>| match target {
            Some(label) => label.clone(),
            None => {
                skip_used = true;
                self.skip.clone()
            }
        };

        let lhs_targets = match self.op {
            // a false left side decides the result
            LogicOp::And => Targets::new(None, Some(short_circuit(&targets.on_false))),
            // a true left side decides the result
            LogicOp::Or => Targets::new(Some(short_circuit(&targets.on_true)), None),
        };

        let mut code = self.lhs.gen_code(symtab, &lhs_targets);
        code.extend(self.rhs.gen_code(symtab, targets));
        if skip_used {
            code.extend(self.skip.gen_code());
        }
        code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    In,
    // the callee stores into the argument itself, nothing is pushed
    Out,
}

#[derive(Debug, Clone)]
pub struct CallParam {
    pub expr: Expr,
    pub direction: ParamDirection,
}

impl CallParam {
    pub fn input(expr: Expr) -> Self {
        CallParam {
            expr,
            direction: ParamDirection::In,
        }
    }

    pub fn output(expr: Expr) -> Self {
        CallParam {
            expr,
            direction: ParamDirection::Out,
        }
    }

    fn gen_code(&self, symtab: &SymbolTable) -> Vec<String> {
        match self.direction {
            ParamDirection::In => self.expr.gen_code(symtab),
            ParamDirection::Out => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallProcedure {
    // alias chain already followed
    symbol: SymbolIdx,
    // in push order, the last source argument first
    params: Vec<CallParam>,
    datatype: Option<DataType>,
}

impl CallProcedure {
    pub fn new(
        symtab: &SymbolTable,
        name: &str,
        params: Vec<CallParam>,
    ) -> CompileResult<Self> {
        let unresolved = || CompileError::Link(format!("Cannot resolve function '{}'.", name));
        let named = symtab
            .resolve(name, None, Some(SymbolClass::Function))
            .ok_or_else(unresolved)?;
        let symbol = symtab.resolve_alias(named).ok_or_else(unresolved)?;

        Ok(CallProcedure {
            symbol,
            params,
            datatype: symtab.get(symbol).datatype(),
        })
    }

    fn gen_code(&self, symtab: &SymbolTable) -> Vec<String> {
        let symbol = symtab.get(self.symbol);
        let Some(function) = symbol.as_function() else {
            return Vec::new();
        };
        let ctx = CallContext { symtab, call: self };

        let mut code = Vec::new();
        if function.flags.contains(FunctionFlags::REVERSE_ARGS) {
            for param in self.params.iter().rev() {
                code.extend(param.gen_code(symtab));
            }
        } else {
            for param in self.params.iter() {
                code.extend(param.gen_code(symtab));
            }
        }
        code.extend(function.hooks.precode.iter().map(|t| t.render(&ctx)));
        let called = function.hooks.target.as_deref().unwrap_or(symbol.name());
        code.push(format!("CALL {}", called));
        code.extend(function.hooks.postcode.iter().map(|t| t.render(&ctx)));
        code
    }
}

struct CallContext<'a> {
    symtab: &'a SymbolTable,
    call: &'a CallProcedure,
}

impl TemplateContext for CallContext<'_> {
    fn name(&self) -> Option<String> {
        Some(self.symtab.get(self.call.symbol).name().to_string())
    }

    fn call_param_name(&self, n: usize) -> Option<String> {
        match &self.call.params.get(n)?.expr {
            Expr::Variable { symbol, .. } => Some(self.symtab.get(*symbol).fqsn().to_string()),
            _ => None,
        }
    }

    fn call_param_count(&self) -> Option<usize> {
        Some(self.call.params.len())
    }
}

#[derive(Debug, Clone)]
pub struct AssignNode {
    // compound assignments carry their operator
    op: Option<ArithOp>,
    target: SymbolIdx,
    rhs: Expr,
}

impl AssignNode {
    pub fn new(op: Option<ArithOp>, target: SymbolIdx, rhs: Expr) -> Self {
        AssignNode { op, target, rhs }
    }

    pub fn datatype(&self) -> DataType {
        self.rhs.datatype()
    }

    fn gen_code(&self, symtab: &SymbolTable) -> Vec<String> {
        let fqsn = symtab.get(self.target).fqsn();
        let mut code = Vec::new();
        if self.op.is_some() {
            code.push(format!("LOAD {}", fqsn));
        }
        code.extend(self.rhs.gen_code(symtab));
        if let Some(op) = self.op {
            code.extend(op.mnemonics().iter().map(|m| m.to_string()));
        }
        code.push(format!("STOR {}", fqsn));
        code
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Expr(Expr),
    Assign(AssignNode),
    // a boolean expression wired to explicit jump targets
    Condition { cond: BoolExpr, targets: Targets },
    Label(Label),
    Block(Vec<Node>),
    NoOp,
}

impl Node {
    // unconditional jump
    pub fn jump(label: Label) -> Node {
        Node::Condition {
            cond: BoolExpr::Literal(true),
            targets: Targets::new(Some(label), None),
        }
    }

    pub fn gen_code(&self, symtab: &SymbolTable) -> Vec<String> {
        match self {
            Node::Expr(expr) => expr.gen_code(symtab),
            Node::Assign(assign) => assign.gen_code(symtab),
            Node::Condition { cond, targets } => cond.gen_code(symtab, targets),
            Node::Label(label) => label.gen_code(),
            Node::Block(nodes) => nodes.iter().flat_map(|n| n.gen_code(symtab)).collect(),
            Node::NoOp => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BodyEntry {
    Node(Node),
    // library bodies, rendered against the function's own symbol
    Template(Template),
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    symbol: SymbolIdx,
    body: Vec<BodyEntry>,
}

impl FunctionDefinition {
    pub fn new(symbol: SymbolIdx, body: Vec<BodyEntry>) -> Self {
        FunctionDefinition { symbol, body }
    }

    pub fn from_nodes(symbol: SymbolIdx, nodes: Vec<Node>) -> Self {
        Self::new(symbol, nodes.into_iter().map(BodyEntry::Node).collect())
    }

    pub fn gen_code(&self, symtab: &SymbolTable) -> Vec<String> {
        let symbol = symtab.get(self.symbol);
        let Some(function) = symbol.as_function() else {
            return Vec::new();
        };
        if function.flags.contains(FunctionFlags::INTERNAL) {
            return Vec::new();
        }
        if symbol.usage() == 0 {
            if !function.flags.contains(FunctionFlags::LIBRARY) {
                info!(
                    "Skipping unused symbol:'{}':{}",
                    symbol.name(),
                    symbol.line().unwrap_or(0)
                );
            }
            return Vec::new();
        }

        let ctx = DefinitionContext { symtab, symbol };
        let mut code = vec![String::new(), format!("DEF {}:", symbol.name())];
        for param in function.params.iter() {
            code.push(format!("STOR {}", symtab.get(*param).fqsn()));
        }
        for entry in self.body.iter() {
            match entry {
                BodyEntry::Node(node) => code.extend(node.gen_code(symtab)),
                BodyEntry::Template(template) => code.push(template.render(&ctx)),
            }
        }
        if symbol.name() == ENTRY_POINT {
            code.push("HALT".to_string());
        } else {
            code.push("RET".to_string());
        }
        code
    }
}

struct DefinitionContext<'a> {
    symtab: &'a SymbolTable,
    symbol: &'a Symbol,
}

impl TemplateContext for DefinitionContext<'_> {
    fn name(&self) -> Option<String> {
        Some(self.symbol.name().to_string())
    }

    fn argv(&self, n: usize) -> Option<String> {
        let param = self.symbol.as_function()?.params.get(n)?;
        Some(self.symtab.get(*param).fqsn().to_string())
    }
}
