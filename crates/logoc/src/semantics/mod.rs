pub mod ir;
pub mod library;
pub mod symtab;
pub mod template;
pub mod translator;
pub mod types;

#[cfg(test)]
mod symtab_tests;
