// every token class the LogoASM microsyntax can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogoLexemes {
    Identifier,
    ColonIdentifier,
    Number,
    StringConst,
    Boolean,

    If,
    Then,
    Else,
    While,
    To,
    End,
    Not,
    Print,
    Typein,
    Random,

    AssignOp,
    RelOp,
    LogicOp,
    AddOp,
    MulOp,
    PwrOp,
    LParen,
    RParen,
}

impl LogoLexemes {
    pub fn to_name(self) -> &'static str {
        match self {
            LogoLexemes::Identifier => "ID",
            LogoLexemes::ColonIdentifier => "COLON_ID",
            LogoLexemes::Number => "NUMBER",
            LogoLexemes::StringConst => "STRING",
            LogoLexemes::Boolean => "BOOLEAN",
            LogoLexemes::If => "IF",
            LogoLexemes::Then => "THEN",
            LogoLexemes::Else => "ELSE",
            LogoLexemes::While => "WHILE",
            LogoLexemes::To => "TO",
            LogoLexemes::End => "END",
            LogoLexemes::Not => "NOT",
            LogoLexemes::Print => "PRINT",
            LogoLexemes::Typein => "TYPEIN",
            LogoLexemes::Random => "RANDOM",
            LogoLexemes::AssignOp => "ASSIGN_OP",
            LogoLexemes::RelOp => "REL_OP",
            LogoLexemes::LogicOp => "LOGIC_OP",
            LogoLexemes::AddOp => "ADD_OP",
            LogoLexemes::MulOp => "MUL_OP",
            LogoLexemes::PwrOp => "PWR_OP",
            LogoLexemes::LParen => "OPEN_PAR",
            LogoLexemes::RParen => "CLOSE_PAR",
        }
    }

    // case-insensitive classification of a bare word
    pub fn classify_word(word: &str) -> LogoLexemes {
        match word.to_ascii_uppercase().as_str() {
            "IF" => LogoLexemes::If,
            "THEN" => LogoLexemes::Then,
            "ELSE" => LogoLexemes::Else,
            "WHILE" => LogoLexemes::While,
            "TO" => LogoLexemes::To,
            "END" => LogoLexemes::End,
            "NOT" => LogoLexemes::Not,
            "PRINT" => LogoLexemes::Print,
            "TYPEIN" => LogoLexemes::Typein,
            "RANDOM" => LogoLexemes::Random,
            "TRUE" | "FALSE" | "YES" | "NO" => LogoLexemes::Boolean,
            "AND" | "OR" => LogoLexemes::LogicOp,
            _ => LogoLexemes::Identifier,
        }
    }

    pub fn is_reserved(self) -> bool {
        !matches!(self, LogoLexemes::Identifier)
    }
}

impl std::fmt::Display for LogoLexemes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_name())
    }
}
