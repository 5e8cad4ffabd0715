use super::*;
use crate::scanner::Scanner;
use crate::semantics::types::Value;

fn expr(src: &str) -> Result<Expr, ParseError> {
    let mut tr = Translator::new().unwrap();
    let mut toks = Scanner::new(src);
    parse_expr(&mut toks, &mut tr)
}

fn value(src: &str) -> Value {
    expr(src).unwrap().value().unwrap()
}

// instructions of the entry function, between its header and HALT
fn main_body(src: &str) -> Vec<String> {
    let listing = crate::compile(src).unwrap();
    listing
        .lines()
        .iter()
        .skip_while(|l| *l != "DEF __main__:")
        .skip(1)
        .take_while(|l| *l != "HALT")
        .cloned()
        .collect()
}

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(value("2 + 3 * 4"), Value::Int(14));
    assert_eq!(value("(2 + 3) * 4"), Value::Int(20));
    assert_eq!(value("10 - 4 - 3"), Value::Int(3));
    assert_eq!(value("2 * 3 ^ 2"), Value::Int(18));
    // exponentiation groups to the right
    assert_eq!(value("2 ^ 3 ^ 2"), Value::Int(512));
    assert_eq!(value("7 % 3 + 1"), Value::Int(2));
    assert_eq!(value("1 / 2"), Value::Float(0.5));
}

#[test]
fn test_unary_operators() {
    assert_eq!(value("-3 + 5"), Value::Int(2));
    assert_eq!(value("2 * -3"), Value::Int(-6));
    assert_eq!(value("+4"), Value::Int(4));
    assert!(matches!(
        expr("+ 'a'"),
        Err(ParseError::Compile(CompileError::InvalidExpressionType {
            line: 1,
            ..
        }))
    ));
}

#[test]
fn test_boolean_precedence() {
    assert_eq!(value("1 < 2 AND 3 > 4"), Value::Bool(false));
    assert_eq!(value("1 < 2 or 3 > 4"), Value::Bool(true));
    assert_eq!(value("NOT TRUE OR TRUE"), Value::Bool(true));
    assert_eq!(value("NOT 1 < 2"), Value::Bool(false));
    assert_eq!(value("1 + 1 == 2"), Value::Bool(true));
}

#[test]
fn test_expression_errors() {
    assert_eq!(
        expr("(1 + 2").unwrap_err(),
        ParseError::UnexpectedEOF { line: 1 }
    );
    assert_eq!(
        expr("* 2").unwrap_err(),
        ParseError::UnexpectedToken {
            line: 1,
            lexeme: LogoLexemes::MulOp,
            text: "*".to_string(),
        }
    );
}

#[test]
fn test_greedy_arguments() {
    assert_eq!(
        main_body("SETXY 10 20 PENUP"),
        vec!["PUSH 20", "PUSH 10", "CALL SETXY", "CALL PENUP"]
    );
    assert_eq!(
        main_body("FORWARD 10 + 5"),
        vec!["PUSH 10", "PUSH 5", "ADD", "CALL FORWARD"]
    );
}

#[test]
fn test_assignment_statement() {
    let listing = crate::compile("X = 5\nX += 1\nPRINT :X").unwrap();
    assert!(listing.lines().contains(&"X        5".to_string()));
    assert_eq!(
        main_body("X = 5\nX += 1\nPRINT :X"),
        vec![
            "LOAD X",
            "PUSH 1",
            "ADD",
            "STOR X",
            "LOAD X",
            "PUSH 1",
            "CALL WRITE",
        ]
    );
}

#[test]
fn test_typein_statement() {
    assert_eq!(
        main_body("TYPEIN answer"),
        vec!["CALL READ", "STOR answer"]
    );
    assert_eq!(
        crate::compile("TYPEIN 5").unwrap_err(),
        CompileError::Syntax {
            line: 1,
            message: "Invalid Token: 5 (NUMBER)".to_string(),
        }
    );
}

#[test]
fn test_definition_with_parameters() {
    let listing = crate::compile("TO TWICE :N\nPRINT :N * 2\nEND\nTWICE 4").unwrap();
    let lines = listing.lines();
    let def = lines.iter().position(|l| l == "DEF TWICE:").unwrap();
    assert_eq!(
        lines[def..def + 7].to_vec(),
        vec![
            "DEF TWICE:",
            "STOR @TWICE.N",
            "LOAD @TWICE.N",
            "PUSH 2",
            "MUL",
            "PUSH 1",
            "CALL WRITE",
        ]
    );
    assert_eq!(lines[def + 7], "RET");
}

#[test]
fn test_recovery_reports_first_error() {
    assert_eq!(
        crate::compile("PRINT 1\n)\nTHEN\nPRINT 2").unwrap_err(),
        CompileError::Syntax {
            line: 2,
            message: "Invalid Token: ) (CLOSE_PAR)".to_string(),
        }
    );
}

#[test]
fn test_empty_program() {
    assert_eq!(
        crate::compile("").unwrap_err(),
        CompileError::Syntax {
            line: 1,
            message: "Syntax error at EOF.".to_string(),
        }
    );
    assert_eq!(
        crate::compile("# only a comment\n").unwrap_err(),
        CompileError::Syntax {
            line: 2,
            message: "Syntax error at EOF.".to_string(),
        }
    );
}

#[test]
fn test_nested_definition() {
    assert_eq!(
        crate::compile("TO A\nTO B\nEND\nEND").unwrap_err(),
        CompileError::Syntax {
            line: 2,
            message: "procedures can only be defined at top level".to_string(),
        }
    );
}

#[test]
fn test_missing_end() {
    assert_eq!(
        crate::compile("TO F\nPENUP").unwrap_err(),
        CompileError::Syntax {
            line: 2,
            message: "Unexpected end of file while parsing".to_string(),
        }
    );
}

#[test]
fn test_semantic_errors_abort() {
    assert!(matches!(
        crate::compile("PRINT 'a' + 1\n)"),
        Err(CompileError::InvalidExpressionType { line: 1, .. })
    ));
    assert_eq!(
        crate::compile("PRINT 1 $").unwrap_err(),
        CompileError::InvalidCharacter { line: 1, ch: '$' }
    );
}
