use super::*;

fn lexemes(text: &str) -> Vec<LogoLexemes> {
    Scanner::new(text)
        .tokenize()
        .expect("failed to tokenize")
        .into_iter()
        .map(|tok| tok.lexeme)
        .collect()
}

#[test]
fn test_basic() {
    let tokens = Scanner::new("TO square :size forward :SIZE END")
        .tokenize()
        .expect("failed to tokenize");
    let expected = vec![
        (LogoLexemes::To, "TO"),
        (LogoLexemes::Identifier, "square"),
        (LogoLexemes::ColonIdentifier, ":size"),
        (LogoLexemes::Identifier, "forward"),
        (LogoLexemes::ColonIdentifier, ":SIZE"),
        (LogoLexemes::End, "END"),
    ];
    let actual: Vec<_> = tokens.iter().map(|t| (t.lexeme, t.text)).collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_operators_maximal_munch() {
    assert_eq!(
        lexemes("x += 1 == 2 <> 3 <= 4 >= 5 < 6 > 7 = 8"),
        vec![
            LogoLexemes::Identifier,
            LogoLexemes::AssignOp,
            LogoLexemes::Number,
            LogoLexemes::RelOp,
            LogoLexemes::Number,
            LogoLexemes::RelOp,
            LogoLexemes::Number,
            LogoLexemes::RelOp,
            LogoLexemes::Number,
            LogoLexemes::RelOp,
            LogoLexemes::Number,
            LogoLexemes::RelOp,
            LogoLexemes::Number,
            LogoLexemes::RelOp,
            LogoLexemes::Number,
            LogoLexemes::AssignOp,
            LogoLexemes::Number,
        ]
    );
    assert_eq!(
        lexemes("1-2*3/4%5^6"),
        vec![
            LogoLexemes::Number,
            LogoLexemes::AddOp,
            LogoLexemes::Number,
            LogoLexemes::MulOp,
            LogoLexemes::Number,
            LogoLexemes::MulOp,
            LogoLexemes::Number,
            LogoLexemes::MulOp,
            LogoLexemes::Number,
            LogoLexemes::PwrOp,
            LogoLexemes::Number,
        ]
    );
}

#[test]
fn test_keywords_are_case_insensitive() {
    assert_eq!(
        lexemes("if Then else WHILE yes No and OR not print typein random"),
        vec![
            LogoLexemes::If,
            LogoLexemes::Then,
            LogoLexemes::Else,
            LogoLexemes::While,
            LogoLexemes::Boolean,
            LogoLexemes::Boolean,
            LogoLexemes::LogicOp,
            LogoLexemes::LogicOp,
            LogoLexemes::Not,
            LogoLexemes::Print,
            LogoLexemes::Typein,
            LogoLexemes::Random,
        ]
    );
}

#[test]
fn test_comments_and_lines() {
    let tokens = Scanner::new("# header\nx = 'a b'\n\n  PRINT \"c\" # trailing\n")
        .tokenize()
        .expect("failed to tokenize");
    let lines: Vec<_> = tokens.iter().map(|t| (t.text, t.line)).collect();
    assert_eq!(
        lines,
        vec![("x", 2), ("=", 2), ("'a b'", 2), ("PRINT", 4), ("\"c\"", 4)]
    );
}

#[test]
fn test_numbers() {
    let tokens = Scanner::new("12 3.25 7.").tokenize().expect("failed to tokenize");
    let texts: Vec<_> = tokens.iter().map(|t| t.text).collect();
    assert_eq!(texts, vec!["12", "3.25", "7."]);
    assert!(tokens.iter().all(|t| t.lexeme == LogoLexemes::Number));
}

#[test]
fn test_invalid_character() {
    let result = Scanner::new("x = 1\ny = $").tokenize();
    assert_eq!(
        result,
        Err(CompileError::InvalidCharacter { line: 2, ch: '$' })
    );
}

#[test]
fn test_reserved_colon_identifier() {
    let result = Scanner::new(":while").tokenize();
    assert_eq!(
        result,
        Err(CompileError::InvalidIdentifier {
            line: 1,
            identifier: "while".to_string()
        })
    );
}

#[test]
fn test_unterminated_string() {
    let result = Scanner::new("PRINT 'oops").tokenize();
    assert_eq!(
        result,
        Err(CompileError::InvalidCharacter { line: 1, ch: '\'' })
    );
}

#[test]
fn test_peek_does_not_consume() {
    let mut scanner = Scanner::new("a = 1");
    assert_eq!(
        scanner.peek_nth(1).unwrap().map(|t| t.lexeme),
        Some(LogoLexemes::AssignOp)
    );
    assert_eq!(scanner.advance().unwrap().map(|t| t.text), Some("a"));
    assert_eq!(scanner.advance().unwrap().map(|t| t.text), Some("="));
    assert_eq!(scanner.advance().unwrap().map(|t| t.text), Some("1"));
    assert_eq!(scanner.advance().unwrap(), None);
}
