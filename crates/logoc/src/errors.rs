use thiserror::Error;

/// The four diagnostic families every [`CompileError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    Link,
    Internal,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("Illegal character:{line}:{ch}")]
    InvalidCharacter { line: u32, ch: char },
    #[error("Invalid identifier:{line}:{identifier}")]
    InvalidIdentifier { line: u32, identifier: String },
    #[error("Invalid number:{line}:{text}")]
    InvalidNumber { line: u32, text: String },

    #[error("SyntaxError:{line}:{message}")]
    Syntax { line: u32, message: String },
    #[error("SymbolRedeclaration:{line}:Redefining symbol {symbol} defined at {}", display_line(.original))]
    SymbolRedeclaration {
        line: u32,
        symbol: String,
        original: Option<u32>,
    },

    #[error("Linker Error: {0}")]
    Link(String),

    #[error("InvalidExpressionType:{line}:{message}")]
    InvalidExpressionType { line: u32, message: String },
    #[error("InternalError:{0}")]
    Internal(String),
}

fn display_line(line: &Option<u32>) -> String {
    match line {
        Some(line) => line.to_string(),
        None => "-1".to_string(),
    }
}

impl CompileError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            CompileError::InvalidCharacter { .. }
            | CompileError::InvalidIdentifier { .. }
            | CompileError::InvalidNumber { .. } => DiagnosticKind::Lexical,
            CompileError::Syntax { .. } | CompileError::SymbolRedeclaration { .. } => {
                DiagnosticKind::Syntax
            }
            CompileError::Link(_) => DiagnosticKind::Link,
            CompileError::InvalidExpressionType { .. } | CompileError::Internal(_) => {
                DiagnosticKind::Internal
            }
        }
    }

    pub(crate) fn invalid_type(line: u32, message: impl Into<String>) -> Self {
        CompileError::InvalidExpressionType {
            line,
            message: message.into(),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
