use super::*;
use crate::semantics::ir::Node;
use crate::semantics::translator::Translator;

fn link_program(build: impl FnOnce(&mut Translator)) -> (CompileResult<Listing>, SymbolTable) {
    let mut tr = Translator::new().unwrap();
    build(&mut tr);
    let mut symtab = tr.finish().unwrap();
    (link(&mut symtab), symtab)
}

fn lines(listing: &Listing) -> Vec<&str> {
    listing.lines().iter().map(|l| l.as_str()).collect()
}

#[test]
fn test_empty_entry_point() {
    let (listing, _) = link_program(|_| {});
    assert_eq!(
        lines(&listing.unwrap()),
        vec![".START __main__", "", ".CODE", "", "DEF __main__:", "HALT"]
    );
}

#[test]
fn test_undefined_function() {
    let (listing, symtab) = link_program(|tr| {
        let node = tr.call("FOOBAR", Vec::new(), 1).unwrap();
        tr.top_level_statement(node);
    });
    // the call left a placeholder that no TO ever completed
    assert_eq!(
        listing.unwrap_err(),
        CompileError::Link("Undefined function: 'FOOBAR'.".to_string())
    );
    let foobar = symtab.lookup_by_fqsn(SymbolClass::Function, "FOOBAR").unwrap();
    assert_eq!(symtab.get(foobar).line(), None);
}

#[test]
fn test_library_function_body() {
    let (listing, _) = link_program(|tr| {
        let ten = tr.number("10", 1).unwrap();
        let node = tr.call("FORWARD", vec![ten], 1).unwrap();
        tr.top_level_statement(node);
    });
    assert_eq!(
        lines(&listing.unwrap()),
        vec![
            ".START __main__",
            "",
            ".INIT 200 200 400 400",
            "",
            ".DATA",
            "@FORWARD.length 0",
            "_@ang    0",
            "",
            ".CODE",
            "",
            "DEF __main__:",
            "PUSH 10",
            "CALL FORWARD",
            "HALT",
            "",
            "DEF FORWARD:",
            "STOR @FORWARD.length",
            "LOAD _@ang",
            "LOAD @FORWARD.length",
            "CALL MOVE",
            "RET",
        ]
    );
}

#[test]
fn test_alias_emits_target_once() {
    let (listing, symtab) = link_program(|tr| {
        for name in ["PU", "PENUP", "pu"] {
            let node = tr.call(name, Vec::new(), 1).unwrap();
            tr.top_level_statement(node);
        }
    });
    let listing = listing.unwrap();
    let defs: Vec<&str> = lines(&listing)
        .into_iter()
        .filter(|l| l.starts_with("DEF"))
        .collect();
    assert_eq!(defs, vec!["DEF __main__:", "DEF PENUP:"]);

    let pu = symtab.lookup_by_fqsn(SymbolClass::Function, "PU").unwrap();
    let penup = symtab.lookup_by_fqsn(SymbolClass::Function, "PENUP").unwrap();
    assert_eq!(symtab.resolve_alias(pu), Some(penup));
    assert!(symtab.get(penup).flags().contains(FunctionFlags::GENERATED));
}

#[test]
fn test_internal_functions_have_no_body() {
    let (listing, _) = link_program(|tr| {
        let text = tr.string("'hi'");
        let node = tr.print(vec![text]).unwrap();
        tr.top_level_statement(node);
    });
    let listing = listing.unwrap();
    assert!(!lines(&listing).contains(&"DEF PRINT:"));
    assert!(!lines(&listing).contains(&".INIT 200 200 400 400"));
}

#[test]
fn test_unused_user_function_dropped() {
    let (listing, _) = link_program(|tr| {
        let f = tr.begin_function("UNUSED", 1, &["A"]).unwrap();
        let node = tr.call("PENUP", Vec::new(), 2).unwrap();
        tr.end_function(f, vec![node]).unwrap();
    });
    let listing = listing.unwrap();
    assert!(!lines(&listing).iter().any(|l| l.contains("UNUSED")));
    // only referenced from the dropped body, yet still counted
    assert!(lines(&listing).contains(&"DEF PENUP:"));
}

#[test]
fn test_data_values() {
    let (listing, _) = link_program(|tr| {
        let values = [
            ("I", tr.number("3", 1).unwrap()),
            ("F", tr.number("2.0", 1).unwrap()),
            ("S", tr.string("\"x\"")),
            ("B", tr.boolean("FALSE")),
        ];
        for (name, value) in values {
            tr.assignment(name, "=", value, 1).unwrap();
            let reference = tr.variable_ref(name, 2).unwrap();
            let node = tr.print(vec![reference]).unwrap();
            tr.top_level_statement(node);
        }
        let random = tr.random().unwrap();
        let node = tr.assignment("R", "=", random, 3).unwrap();
        tr.top_level_statement(node);
        let reference = tr.variable_ref("R", 4).unwrap();
        tr.top_level_statement(Node::Expr(reference));
    });
    let listing = listing.unwrap();
    let data: Vec<&str> = lines(&listing)
        .into_iter()
        .skip_while(|l| *l != ".DATA")
        .skip(1)
        .take_while(|l| !l.is_empty())
        .collect();
    assert_eq!(
        data,
        vec!["I        3", "F        2.0", "S        \"x\"", "B        1", "R        0"]
    );
}

#[test]
fn test_listing_indentation() {
    let listing = Listing {
        lines: vec![
            ".START __main__".to_string(),
            String::new(),
            "DEF __main__:".to_string(),
            ":_@trgt_1".to_string(),
            "PUSH 1".to_string(),
        ],
    };
    assert_eq!(
        listing.to_string(),
        ".START __main__\n\nDEF __main__:\n:_@trgt_1\n  PUSH 1\n"
    );
}
