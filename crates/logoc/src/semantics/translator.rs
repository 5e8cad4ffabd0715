use tracing::debug;

use crate::errors::{CompileError, CompileResult};

use super::ir::{
    ArithOp, AssignNode, BinaryExpr, BoolExpr, CallParam, CallProcedure, Expr, FunctionDefinition,
    Label, LogicOp, Node, RelOp, RelationalExpr, Targets, ENTRY_POINT,
};
use super::library;
use super::symtab::{FunctionFlags, SymbolClass, SymbolFields, SymbolIdx, SymbolTable};
use super::types::{DataType, Value};

const LABEL_PREFIX: &str = "_@trgt_";

/// Semantic actions for each grammar production.
///
/// The parser calls these bottom-up: every operand is translated before the
/// production consuming it, and a function's signature before its body.
pub struct Translator {
    symtab: SymbolTable,
    labels: u32,
    entry: SymbolIdx,
    // statements collected for the entry function
    main_body: Vec<Node>,
    // the TO ... END currently being translated
    open_function: Option<SymbolIdx>,
}

impl Translator {
    pub fn new() -> CompileResult<Self> {
        let mut symtab = SymbolTable::new();
        symtab.push_scope("");
        let entry = symtab.declare(
            ENTRY_POINT,
            SymbolClass::Function,
            Some(0),
            SymbolFields {
                usage: Some(1),
                ..Default::default()
            },
        )?;
        library::install(&mut symtab)?;

        Ok(Translator {
            symtab,
            labels: 0,
            entry,
            main_body: Vec::new(),
            open_function: None,
        })
    }

    pub fn symtab(&self) -> &SymbolTable {
        &self.symtab
    }

    pub fn new_label(&mut self) -> Label {
        self.labels += 1;
        debug!("New label: {}", self.labels);
        Label::new(format!("{}{}", LABEL_PREFIX, self.labels))
    }

    pub fn top_level_statement(&mut self, node: Node) {
        self.main_body.push(node);
    }

    /// Closes the global frame and hands back the finished table.
    pub fn finish(mut self) -> CompileResult<SymbolTable> {
        if self.symtab.depth() != 1 {
            return Err(CompileError::Internal(format!(
                "Unbalanced scopes at end of input: {}",
                self.symtab.depth()
            )));
        }
        let body = std::mem::take(&mut self.main_body);
        self.symtab
            .set_code(self.entry, FunctionDefinition::from_nodes(self.entry, body))?;
        self.symtab.pop_scope()?;
        Ok(self.symtab)
    }

    pub fn begin_function(&mut self, name: &str, line: u32, params: &[&str]) -> CompileResult<SymbolIdx> {
        if let Some(existing) = self.symtab.resolve(name, None, None) {
            let existing = self.symtab.get(existing);
            // a placeholder left by an earlier call is completed, anything else is a clash
            if existing.line().is_some() || existing.flags().contains(FunctionFlags::LIBRARY) {
                return Err(CompileError::SymbolRedeclaration {
                    line,
                    symbol: name.to_string(),
                    original: existing.line(),
                });
            }
        }

        let symbol = self.symtab.declare(
            name,
            SymbolClass::Function,
            Some(line),
            SymbolFields::default(),
        )?;
        self.symtab.push_scope(name);
        let params = params
            .iter()
            .map(|param| {
                self.symtab
                    .declare_local(param, SymbolClass::Variable, Some(line), SymbolFields::default())
            })
            .collect::<CompileResult<Vec<_>>>()?;
        // calls seen before this definition counted a function without parameters
        if self.symtab.get(symbol).usage() > 0 {
            for param in params.iter() {
                self.symtab.count_usage_of(*param)?;
            }
        }
        self.symtab.declare(
            name,
            SymbolClass::Function,
            None,
            SymbolFields {
                params: Some(params),
                ..Default::default()
            },
        )?;
        self.open_function = Some(symbol);
        Ok(symbol)
    }

    pub fn end_function(&mut self, symbol: SymbolIdx, body: Vec<Node>) -> CompileResult<()> {
        self.symtab
            .set_code(symbol, FunctionDefinition::from_nodes(symbol, body))?;
        self.symtab.pop_scope()?;
        self.open_function = None;
        Ok(())
    }

    pub fn assignment(&mut self, name: &str, op: &str, rhs: Expr, line: u32) -> CompileResult<Node> {
        let compound = match op {
            "=" => None,
            _ => Some(
                op.strip_suffix('=')
                    .and_then(ArithOp::from_text)
                    .ok_or_else(|| CompileError::Internal(format!("Unknown assignment '{}'.", op)))?,
            ),
        };

        let mut datatype = rhs.datatype();
        if compound.is_some() {
            let current = self
                .symtab
                .resolve(name, None, Some(SymbolClass::Variable))
                .and_then(|idx| self.symtab.get(idx).datatype())
                .unwrap_or(DataType::Float);
            for operand in [current, datatype] {
                if !operand.is_numeric() {
                    return Err(CompileError::invalid_type(
                        line,
                        format!("Invalid data type:'{}'", operand),
                    ));
                }
            }
            datatype = DataType::unify_numeric(current, datatype);
        }

        let symbol = self.symtab.declare(
            name,
            SymbolClass::Variable,
            Some(line),
            SymbolFields {
                datatype: Some(datatype),
                ..Default::default()
            },
        )?;

        let has_value = self
            .symtab
            .get(symbol)
            .as_variable()
            .is_some_and(|v| v.value.is_some());
        if !has_value {
            match rhs.value() {
                // known at declaration, becomes the initial value in .DATA
                Some(value) if !self.is_parameter(symbol) => {
                    self.symtab.set_value(symbol, value.widen_to(datatype))?;
                    return Ok(Node::NoOp);
                }
                _ => self.symtab.set_value(symbol, datatype.zero())?,
            }
        }

        Ok(Node::Assign(AssignNode::new(compound, symbol, rhs)))
    }

    // parameters get their value from the caller, never from .DATA
    fn is_parameter(&self, symbol: SymbolIdx) -> bool {
        self.open_function
            .and_then(|function| self.symtab.get(function).as_function())
            .is_some_and(|function| function.params.contains(&symbol))
    }

    pub fn call(&mut self, name: &str, args: Vec<Expr>, line: u32) -> CompileResult<Node> {
        // unknown procedures are declared globally so a later TO can complete them
        self.symtab
            .declare_global(name, SymbolClass::Function, None, SymbolFields::default())
            .map_err(|err| with_line(err, line))?;
        self.symtab.count_usage(name, Some(SymbolClass::Function))?;

        let params = args.into_iter().rev().map(CallParam::input).collect();
        let call = CallProcedure::new(&self.symtab, name, params)?;
        Ok(Node::Expr(Expr::Call(call)))
    }

    pub fn print(&mut self, args: Vec<Expr>) -> CompileResult<Node> {
        self.symtab.count_usage("PRINT", Some(SymbolClass::Function))?;

        let count = Expr::Const(Value::Int(args.len() as i64));
        let params = std::iter::once(count)
            .chain(args.into_iter().rev())
            .map(CallParam::input)
            .collect();
        let call = CallProcedure::new(&self.symtab, "PRINT", params)?;
        Ok(Node::Expr(Expr::Call(call)))
    }

    pub fn typein(&mut self, name: &str, line: u32) -> CompileResult<Node> {
        self.symtab.count_usage("TYPEIN", Some(SymbolClass::Function))?;

        let target = self.symtab.declare(
            name,
            SymbolClass::Variable,
            Some(line),
            SymbolFields::default(),
        )?;
        self.symtab.count_usage(name, Some(SymbolClass::Variable))?;

        let params = vec![CallParam::output(Expr::variable(&self.symtab, target))];
        let call = CallProcedure::new(&self.symtab, "TYPEIN", params)?;
        Ok(Node::Expr(Expr::Call(call)))
    }

    pub fn random(&mut self) -> CompileResult<Expr> {
        self.symtab.count_usage("RANDOM", Some(SymbolClass::Function))?;
        let call = CallProcedure::new(&self.symtab, "RANDOM", Vec::new())?;
        Ok(Expr::Call(call))
    }

    pub fn variable_ref(&mut self, name: &str, line: u32) -> CompileResult<Expr> {
        let symbol = self
            .symtab
            .declare(name, SymbolClass::Variable, None, SymbolFields::default())
            .map_err(|err| with_line(err, line))?;
        self.symtab.count_usage(name, Some(SymbolClass::Variable))?;
        Ok(Expr::variable(&self.symtab, symbol))
    }

    pub fn number(&self, text: &str, line: u32) -> CompileResult<Expr> {
        let invalid = || CompileError::InvalidNumber {
            line,
            text: text.to_string(),
        };
        let value = if text.contains('.') {
            Value::Float(text.parse::<f64>().map_err(|_| invalid())?)
        } else {
            Value::Int(text.parse::<i64>().map_err(|_| invalid())?)
        };
        Ok(Expr::Const(value))
    }

    pub fn string(&self, text: &str) -> Expr {
        Expr::Const(Value::Str(text.to_string()))
    }

    pub fn boolean(&self, text: &str) -> Expr {
        let value = matches!(text.to_ascii_uppercase().as_str(), "TRUE" | "YES");
        Expr::Bool(Box::new(BoolExpr::Literal(value)))
    }

    pub fn binary(&mut self, op: &str, lhs: Expr, rhs: Expr, line: u32) -> CompileResult<Expr> {
        let op = ArithOp::from_text(op)
            .ok_or_else(|| CompileError::Internal(format!("Unknown operator '{}'.", op)))?;
        BinaryExpr::new(op, lhs, rhs, line)
    }

    // -e is translated as (-1) * e
    pub fn negate(&mut self, operand: Expr, line: u32) -> CompileResult<Expr> {
        BinaryExpr::new(ArithOp::Mul, Expr::Const(Value::Int(-1)), operand, line)
    }

    pub fn relational(&mut self, op: &str, lhs: Expr, rhs: Expr, line: u32) -> CompileResult<Expr> {
        let op = RelOp::from_text(op)
            .ok_or_else(|| CompileError::Internal(format!("Unknown operator '{}'.", op)))?;
        Ok(Expr::Bool(Box::new(RelationalExpr::new(op, lhs, rhs, line)?)))
    }

    pub fn logic(&mut self, op: &str, lhs: Expr, rhs: Expr, line: u32) -> CompileResult<Expr> {
        let op = LogicOp::from_text(op)
            .ok_or_else(|| CompileError::Internal(format!("Unknown operator '{}'.", op)))?;
        let skip = self.new_label();
        Ok(Expr::Bool(Box::new(BoolExpr::logic(op, lhs, rhs, skip, line)?)))
    }

    pub fn not(&mut self, operand: Expr, line: u32) -> CompileResult<Expr> {
        Ok(Expr::Bool(Box::new(BoolExpr::not(operand, line)?)))
    }

    pub fn if_statement(
        &mut self,
        cond: Expr,
        then_body: Vec<Node>,
        else_body: Option<Vec<Node>>,
        line: u32,
    ) -> CompileResult<Node> {
        let cond = BoolExpr::require_bool(cond, line)?;
        let on_false = self.new_label();

        let mut block = vec![Node::Condition {
            cond,
            targets: Targets::new(None, Some(on_false.clone())),
        }];
        block.extend(then_body);
        match else_body {
            Some(else_body) => {
                let join = self.new_label();
                block.push(Node::jump(join.clone()));
                block.push(Node::Label(on_false));
                block.extend(else_body);
                block.push(Node::Label(join));
            }
            None => block.push(Node::Label(on_false)),
        }
        Ok(Node::Block(block))
    }

    pub fn while_statement(&mut self, cond: Expr, body: Vec<Node>, line: u32) -> CompileResult<Node> {
        let cond = BoolExpr::require_bool(cond, line)?;
        let start = self.new_label();
        let next = self.new_label();

        let mut block = vec![
            Node::Label(start.clone()),
            Node::Condition {
                cond,
                targets: Targets::new(None, Some(next.clone())),
            },
        ];
        block.extend(body);
        block.push(Node::jump(start));
        block.push(Node::Label(next));
        Ok(Node::Block(block))
    }
}

// the table reports clashes without knowing the reference site
fn with_line(err: CompileError, line: u32) -> CompileError {
    match err {
        CompileError::SymbolRedeclaration {
            symbol, original, ..
        } => CompileError::SymbolRedeclaration {
            line,
            symbol,
            original,
        },
        other => other,
    }
}
