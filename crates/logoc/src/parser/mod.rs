use thiserror::Error;
use tracing::error;

use crate::errors::{CompileError, CompileResult};
use crate::scanner::{LogoLexemes, TokenStream};
use crate::semantics::ir::{Expr, Node};
use crate::semantics::translator::Translator;

#[cfg(test)]
mod parser_tests;

#[derive(Error, Debug, PartialEq)]
pub(crate) enum ParseError {
    #[error("Unexpected end of file while parsing")]
    UnexpectedEOF { line: u32 },
    #[error("Invalid Token: {text} ({lexeme})")]
    UnexpectedToken {
        line: u32,
        lexeme: LogoLexemes,
        text: String,
    },
    #[error("procedures can only be defined at top level")]
    NestedDefinition { line: u32 },
    #[error("Syntax error at EOF.")]
    EmptyProgram { line: u32 },
    // lexical and semantic failures, never recovered from
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        let line = match &err {
            ParseError::UnexpectedEOF { line }
            | ParseError::UnexpectedToken { line, .. }
            | ParseError::NestedDefinition { line }
            | ParseError::EmptyProgram { line } => *line,
            ParseError::Compile(_) => 0,
        };
        match err {
            ParseError::Compile(inner) => inner,
            other => CompileError::Syntax {
                line,
                message: other.to_string(),
            },
        }
    }
}

type Peeked<'a> = (LogoLexemes, &'a str, u32);

// copies the next token out so the stream is not kept borrowed
fn peek_token<'a>(toks: &mut impl TokenStream<'a>) -> Result<Option<Peeked<'a>>, ParseError> {
    Ok(toks.peek()?.map(|tok| (tok.lexeme, tok.text, tok.line)))
}

fn unexpected<'a>(toks: &mut impl TokenStream<'a>, peeked: Option<Peeked<'a>>) -> ParseError {
    match peeked {
        Some((lexeme, text, line)) => ParseError::UnexpectedToken {
            line,
            lexeme,
            text: text.to_string(),
        },
        None => ParseError::UnexpectedEOF { line: toks.line() },
    }
}

macro_rules! eat_or_error {
    ($toks:expr, $lexeme:path) => {
        match peek_token($toks)? {
            Some(($lexeme, text, line)) => {
                $toks.advance()?;
                Ok((text, line))
            }
            other => Err(unexpected($toks, other)),
        }
    };
}

// tokens that can begin an expression, so argument lists know when to stop
fn starts_expr(lexeme: LogoLexemes) -> bool {
    matches!(
        lexeme,
        LogoLexemes::Number
            | LogoLexemes::StringConst
            | LogoLexemes::ColonIdentifier
            | LogoLexemes::Boolean
            | LogoLexemes::Random
            | LogoLexemes::LParen
            | LogoLexemes::AddOp
            | LogoLexemes::Not
    )
}

fn prefix_binding_power(lexeme: LogoLexemes) -> Option<u32> {
    match lexeme {
        LogoLexemes::Not => Some(3),
        // unary plus / minus
        LogoLexemes::AddOp => Some(13),
        _ => None,
    }
}

fn infix_binding_power(lexeme: LogoLexemes) -> Option<(u32, u32)> {
    match lexeme {
        // AND / OR, loosest
        LogoLexemes::LogicOp => Some((1, 2)),
        LogoLexemes::RelOp => Some((5, 6)),
        LogoLexemes::AddOp => Some((7, 8)),
        LogoLexemes::MulOp => Some((9, 10)),
        // exponentiation is right-associative
        LogoLexemes::PwrOp => Some((12, 11)),
        _ => None,
    }
}

/// Parses a whole program, driving the translator's semantic actions.
///
/// Syntax errors are logged and recovered from by discarding one token; the
/// first one is returned once the input is exhausted. Lexical and semantic
/// errors abort immediately.
pub fn parse_program<'a>(toks: &mut impl TokenStream<'a>, tr: &mut Translator) -> CompileResult<()> {
    let mut first_error: Option<CompileError> = None;
    let mut parsed_any = false;

    while toks.peek()?.is_some() {
        match parse_statement_or_definition(toks, tr) {
            Ok(()) => parsed_any = true,
            Err(ParseError::Compile(err)) => return Err(err),
            Err(err) => {
                error!("{}", err);
                if first_error.is_none() {
                    first_error = Some(err.into());
                }
                toks.advance()?;
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }
    if !parsed_any {
        let err = ParseError::EmptyProgram { line: toks.line() };
        error!("{}", err);
        return Err(err.into());
    }
    Ok(())
}

fn parse_statement_or_definition<'a>(
    toks: &mut impl TokenStream<'a>,
    tr: &mut Translator,
) -> Result<(), ParseError> {
    match peek_token(toks)? {
        Some((LogoLexemes::To, _, _)) => parse_definition(toks, tr),
        _ => {
            let statement = parse_statement(toks, tr)?;
            tr.top_level_statement(statement);
            Ok(())
        }
    }
}

fn parse_definition<'a>(toks: &mut impl TokenStream<'a>, tr: &mut Translator) -> Result<(), ParseError> {
    eat_or_error!(toks, LogoLexemes::To)?;
    let (name, line) = eat_or_error!(toks, LogoLexemes::Identifier)?;

    let mut params = Vec::new();
    while let Some((LogoLexemes::ColonIdentifier, text, _)) = peek_token(toks)? {
        toks.advance()?;
        params.push(&text[1..]);
    }

    let symbol = tr.begin_function(name, line, &params)?;
    let body = parse_body(toks, tr)?;
    eat_or_error!(toks, LogoLexemes::End)?;
    tr.end_function(symbol, body)?;
    Ok(())
}

// statements up to (not including) END, ELSE or end of input
fn parse_body<'a>(toks: &mut impl TokenStream<'a>, tr: &mut Translator) -> Result<Vec<Node>, ParseError> {
    let mut body = Vec::new();
    loop {
        match peek_token(toks)? {
            None | Some((LogoLexemes::End | LogoLexemes::Else, _, _)) => return Ok(body),
            Some(_) => body.push(parse_statement(toks, tr)?),
        }
    }
}

fn parse_statement<'a>(toks: &mut impl TokenStream<'a>, tr: &mut Translator) -> Result<Node, ParseError> {
    match peek_token(toks)? {
        Some((LogoLexemes::If, _, _)) => parse_if_statement(toks, tr),
        Some((LogoLexemes::While, _, _)) => parse_while_statement(toks, tr),
        Some((LogoLexemes::Print, _, _)) => {
            toks.advance()?;
            // at least one argument
            let mut args = vec![parse_expr(toks, tr)?];
            args.extend(parse_arguments(toks, tr)?);
            Ok(tr.print(args)?)
        }
        Some((LogoLexemes::Typein, _, _)) => {
            toks.advance()?;
            let (name, line) = eat_or_error!(toks, LogoLexemes::Identifier)?;
            Ok(tr.typein(name, line)?)
        }
        Some((LogoLexemes::Identifier, name, line)) => {
            toks.advance()?;
            match peek_token(toks)? {
                Some((LogoLexemes::AssignOp, op, _)) => {
                    toks.advance()?;
                    let rhs = parse_expr(toks, tr)?;
                    Ok(tr.assignment(name, op, rhs, line)?)
                }
                _ => {
                    let args = parse_arguments(toks, tr)?;
                    Ok(tr.call(name, args, line)?)
                }
            }
        }
        Some((LogoLexemes::To, _, line)) => Err(ParseError::NestedDefinition { line }),
        Some((lexeme, _, _)) if starts_expr(lexeme) => Ok(Node::Expr(parse_expr(toks, tr)?)),
        other => Err(unexpected(toks, other)),
    }
}

// greedy: takes expressions while the next token can start one
fn parse_arguments<'a>(toks: &mut impl TokenStream<'a>, tr: &mut Translator) -> Result<Vec<Expr>, ParseError> {
    let mut args = Vec::new();
    while let Some((lexeme, _, _)) = peek_token(toks)? {
        if !starts_expr(lexeme) {
            break;
        }
        args.push(parse_expr(toks, tr)?);
    }
    Ok(args)
}

fn parse_if_statement<'a>(toks: &mut impl TokenStream<'a>, tr: &mut Translator) -> Result<Node, ParseError> {
    let (_, line) = eat_or_error!(toks, LogoLexemes::If)?;
    let cond = parse_expr(toks, tr)?;
    eat_or_error!(toks, LogoLexemes::Then)?;
    let then_body = parse_body(toks, tr)?;

    let else_body = match peek_token(toks)? {
        Some((LogoLexemes::Else, _, _)) => {
            toks.advance()?;
            Some(parse_body(toks, tr)?)
        }
        _ => None,
    };
    eat_or_error!(toks, LogoLexemes::End)?;

    Ok(tr.if_statement(cond, then_body, else_body, line)?)
}

fn parse_while_statement<'a>(toks: &mut impl TokenStream<'a>, tr: &mut Translator) -> Result<Node, ParseError> {
    let (_, line) = eat_or_error!(toks, LogoLexemes::While)?;
    let cond = parse_expr(toks, tr)?;
    let body = parse_body(toks, tr)?;
    eat_or_error!(toks, LogoLexemes::End)?;

    Ok(tr.while_statement(cond, body, line)?)
}

pub(crate) fn parse_expr<'a>(toks: &mut impl TokenStream<'a>, tr: &mut Translator) -> Result<Expr, ParseError> {
    parse_expr_rec(toks, tr, 0)
}

// precedence climbing ("Pratt parsing"); operands are translated before the
// operator that consumes them
fn parse_expr_rec<'a>(
    toks: &mut impl TokenStream<'a>,
    tr: &mut Translator,
    min_bp: u32,
) -> Result<Expr, ParseError> {
    let Some((lexeme, text, line)) = peek_token(toks)? else {
        return Err(ParseError::UnexpectedEOF { line: toks.line() });
    };

    let mut lhs = match lexeme {
        LogoLexemes::Number => {
            toks.advance()?;
            tr.number(text, line)?
        }
        LogoLexemes::StringConst => {
            toks.advance()?;
            tr.string(text)
        }
        LogoLexemes::Boolean => {
            toks.advance()?;
            tr.boolean(text)
        }
        LogoLexemes::ColonIdentifier => {
            toks.advance()?;
            tr.variable_ref(&text[1..], line)?
        }
        LogoLexemes::Random => {
            toks.advance()?;
            tr.random()?
        }
        LogoLexemes::LParen => {
            toks.advance()?;
            let inner = parse_expr_rec(toks, tr, 0)?;
            eat_or_error!(toks, LogoLexemes::RParen)?;
            inner
        }
        _ => match prefix_binding_power(lexeme) {
            Some(power) => {
                toks.advance()?;
                let operand = parse_expr_rec(toks, tr, power)?;
                match (lexeme, text) {
                    (LogoLexemes::Not, _) => tr.not(operand, line)?,
                    (_, "-") => tr.negate(operand, line)?,
                    _ => {
                        if !operand.datatype().is_numeric() {
                            return Err(CompileError::invalid_type(
                                line,
                                format!("Invalid data type:'{}'", operand.datatype()),
                            )
                            .into());
                        }
                        operand
                    }
                }
            }
            None => return Err(unexpected(toks, Some((lexeme, text, line)))),
        },
    };

    loop {
        let Some((lexeme, op, line)) = peek_token(toks)? else {
            break;
        };
        let Some((left_bp, right_bp)) = infix_binding_power(lexeme) else {
            break;
        };
        if left_bp < min_bp {
            // some higher precedence operator binds to lhs before op does
            break;
        }
        toks.advance()?;

        let rhs = parse_expr_rec(toks, tr, right_bp)?;
        lhs = match lexeme {
            LogoLexemes::LogicOp => tr.logic(op, lhs, rhs, line)?,
            LogoLexemes::RelOp => tr.relational(op, lhs, rhs, line)?,
            _ => tr.binary(op, lhs, rhs, line)?,
        };
    }

    Ok(lhs)
}
