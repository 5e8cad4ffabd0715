use super::symtab::*;
use super::types::{DataType, Value};
use crate::errors::CompileError;

fn global_table() -> SymbolTable {
    let mut symtab = SymbolTable::new();
    symtab.push_scope("");
    symtab
}

fn var(symtab: &mut SymbolTable, name: &str, line: Option<u32>) -> SymbolIdx {
    symtab
        .declare(name, SymbolClass::Variable, line, SymbolFields::default())
        .expect("declare failed")
}

#[test]
fn test_fqsn() {
    let mut symtab = global_table();
    let x = var(&mut symtab, "X", Some(1));
    symtab.push_scope("SQUARE");
    let size = var(&mut symtab, "SIZE", Some(2));

    assert_eq!(symtab.current_scope(), "@SQUARE");
    assert_eq!(symtab.get(x).fqsn(), "X");
    assert_eq!(symtab.get(x).scope(), "");
    assert_eq!(symtab.get(size).fqsn(), "@SQUARE.SIZE");
    assert_eq!(symtab.get(size).scope(), "@SQUARE");
}

#[test]
fn test_case_insensitive_lookup() {
    let mut symtab = global_table();
    let x = var(&mut symtab, "Counter", Some(1));

    assert_eq!(symtab.resolve("COUNTER", None, None), Some(x));
    assert_eq!(symtab.resolve("counter", None, None), Some(x));
    // the first spelling is kept for display
    assert_eq!(symtab.get(x).name(), "Counter");
}

#[test]
fn test_inner_scope_sees_outer() {
    let mut symtab = global_table();
    let x = var(&mut symtab, "X", Some(1));
    symtab.push_scope("F");

    assert_eq!(symtab.resolve("X", None, None), Some(x));
    assert_eq!(symtab.resolve("X", Some("F"), None), None);
    assert_eq!(symtab.resolve("X", Some(""), None), Some(x));

    // declaring through the chain merges into the global
    assert_eq!(var(&mut symtab, "X", Some(3)), x);
}

#[test]
fn test_declare_local_shadows() {
    let mut symtab = global_table();
    let outer = var(&mut symtab, "N", Some(1));
    symtab.push_scope("F");
    let inner = symtab
        .declare_local("N", SymbolClass::Variable, Some(2), SymbolFields::default())
        .unwrap();

    assert_ne!(outer, inner);
    assert_eq!(symtab.resolve("N", None, None), Some(inner));
    assert_eq!(symtab.get(inner).fqsn(), "@F.N");
}

#[test]
fn test_pop_scope_folds_into_class_tables() {
    let mut symtab = global_table();
    symtab.push_scope("F");
    let n = var(&mut symtab, "N", Some(2));
    let scope = symtab.pop_scope().unwrap();

    assert_eq!(scope.name(), "F");
    assert_eq!(scope.symbols().collect::<Vec<_>>(), vec![n]);
    // no longer on the chain, but reachable by class
    assert_eq!(symtab.resolve("@F.N", None, None), None);
    assert_eq!(symtab.resolve("@F.N", None, Some(SymbolClass::Variable)), Some(n));
    assert_eq!(symtab.resolve("@f.n", None, Some(SymbolClass::Variable)), Some(n));
    assert_eq!(symtab.resolve("@F.N", None, Some(SymbolClass::Function)), None);
    assert_eq!(
        symtab.symbols_by_class(SymbolClass::Variable).collect::<Vec<_>>(),
        vec![n]
    );
}

#[test]
fn test_pop_empty_stack() {
    let mut symtab = SymbolTable::new();
    assert!(matches!(symtab.pop_scope(), Err(CompileError::Internal(_))));
}

#[test]
fn test_redeclaration_with_other_class() {
    let mut symtab = global_table();
    var(&mut symtab, "SQUARE", Some(4));
    let err = symtab
        .declare("square", SymbolClass::Function, Some(9), SymbolFields::default())
        .unwrap_err();

    assert_eq!(
        err,
        CompileError::SymbolRedeclaration {
            line: 9,
            symbol: "square".to_string(),
            original: Some(4),
        }
    );
    assert_eq!(
        err.to_string(),
        "SymbolRedeclaration:9:Redefining symbol square defined at 4"
    );
}

#[test]
fn test_first_line_and_value_are_final() {
    let mut symtab = global_table();
    let x = symtab
        .declare(
            "X",
            SymbolClass::Variable,
            Some(1),
            SymbolFields {
                value: Some(Value::Int(5)),
                datatype: Some(DataType::Int),
                ..Default::default()
            },
        )
        .unwrap();
    symtab
        .declare(
            "X",
            SymbolClass::Variable,
            Some(7),
            SymbolFields {
                value: Some(Value::Float(2.5)),
                datatype: Some(DataType::Float),
                ..Default::default()
            },
        )
        .unwrap();

    let symbol = symtab.get(x);
    assert_eq!(symbol.line(), Some(1));
    assert_eq!(symbol.as_variable().unwrap().value, Some(Value::Int(5)));
    // the type still follows the latest declaration
    assert_eq!(symbol.datatype(), Some(DataType::Float));
}

#[test]
fn test_sentinel_line_is_completed() {
    let mut symtab = global_table();
    let f = symtab
        .declare("F", SymbolClass::Function, None, SymbolFields::default())
        .unwrap();
    assert_eq!(symtab.get(f).line(), None);

    symtab
        .declare("F", SymbolClass::Function, Some(3), SymbolFields::default())
        .unwrap();
    assert_eq!(symtab.get(f).line(), Some(3));
}

#[test]
fn test_function_fields_rejected_on_variable() {
    let mut symtab = global_table();
    let err = symtab
        .declare(
            "X",
            SymbolClass::Variable,
            None,
            SymbolFields {
                alias: Some("Y".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CompileError::Internal(_)));
}

#[test]
fn test_declare_global_from_inner_scope() {
    let mut symtab = global_table();
    symtab.push_scope("F");
    let g = symtab
        .declare_global("G", SymbolClass::Function, None, SymbolFields::default())
        .unwrap();

    assert_eq!(symtab.get(g).fqsn(), "G");
    symtab.pop_scope().unwrap();
    assert_eq!(symtab.resolve("G", Some(""), None), Some(g));
}

#[test]
fn test_count_usage_propagates() {
    let mut symtab = global_table();
    let heading = var(&mut symtab, "_@ang", None);
    let forward = symtab
        .declare(
            "FORWARD",
            SymbolClass::Function,
            None,
            SymbolFields {
                flags: FunctionFlags::LIBRARY,
                ..Default::default()
            },
        )
        .unwrap();
    symtab.push_scope("FORWARD");
    let length = var(&mut symtab, "length", None);
    symtab.pop_scope().unwrap();
    symtab
        .declare(
            "FORWARD",
            SymbolClass::Function,
            None,
            SymbolFields {
                params: Some(vec![length]),
                uses: Some(vec![heading]),
                ..Default::default()
            },
        )
        .unwrap();
    let fo = symtab
        .declare(
            "FO",
            SymbolClass::Function,
            None,
            SymbolFields {
                alias: Some("FORWARD".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    symtab.count_usage("fo", Some(SymbolClass::Function)).unwrap();
    assert_eq!(symtab.get(fo).usage(), 1);
    assert_eq!(symtab.get(forward).usage(), 1);
    assert_eq!(symtab.get(length).usage(), 1);
    assert_eq!(symtab.get(heading).usage(), 1);

    symtab.count_usage("FORWARD", Some(SymbolClass::Function)).unwrap();
    assert_eq!(symtab.get(forward).usage(), 2);
    assert_eq!(symtab.get(fo).usage(), 1);
    assert_eq!(symtab.get(heading).usage(), 2);

    assert_eq!(symtab.resolve_alias(fo), Some(forward));
}

#[test]
fn test_count_usage_unknown() {
    let mut symtab = global_table();
    let err = symtab.count_usage("NOPE", None).unwrap_err();
    assert_eq!(
        err,
        CompileError::Internal("Increasing unknown symbol usage: NOPE".to_string())
    );
}

#[test]
fn test_mark_generated() {
    let mut symtab = global_table();
    let f = symtab
        .declare("F", SymbolClass::Function, Some(1), SymbolFields::default())
        .unwrap();
    assert!(!symtab.get(f).flags().contains(FunctionFlags::GENERATED));
    symtab.mark_generated(f);
    assert!(symtab.get(f).flags().contains(FunctionFlags::GENERATED));
}
