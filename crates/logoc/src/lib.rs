pub mod codegen;
pub mod errors;
pub mod parser;
pub mod scanner;
pub mod semantics;

pub use codegen::Listing;
pub use errors::{CompileError, CompileResult, DiagnosticKind};

use scanner::Scanner;
use semantics::translator::Translator;

/// Compiles LogoASM source text into a LogoVM instruction listing.
pub fn compile(source: &str) -> CompileResult<Listing> {
    let mut toks = Scanner::new(source);
    let mut translator = Translator::new()?;
    parser::parse_program(&mut toks, &mut translator)?;

    let mut symtab = translator.finish()?;
    codegen::link(&mut symtab)
}
