//! End-to-end tests: compile BFM source, execute the generated Brainfuck
//! on the reference interpreter, and assert on program output (or on the
//! diagnostics when compilation should fail).

use bfm::compile_source;
use bfm_runtime::Machine;

fn compile(source: &str) -> String {
    let result = compile_source(source);
    if result.diagnostics.has_errors() {
        panic!(
            "unexpected errors:\n{}",
            result.diagnostics.render("test.bfm", source, true)
        );
    }
    result.code.expect("compilation produced no code")
}

fn run(source: &str, input: &[u8]) -> Vec<u8> {
    let code = compile(source);
    Machine::new()
        .run(&code, input)
        .expect("generated program failed to run")
}

fn error_messages(source: &str) -> Vec<String> {
    let result = compile_source(source);
    assert!(result.code.is_none(), "expected compilation to fail");
    result
        .diagnostics
        .reports()
        .iter()
        .map(|d| d.message.clone())
        .collect()
}

// ----- printing -----

#[test]
fn test_print_string() {
    assert_eq!(run("print \"Hi\";", b""), b"Hi");
}

#[test]
fn test_print_string_with_escapes() {
    assert_eq!(run(r#"print "a\tb\n";"#, b""), b"a\tb\n");
}

#[test]
fn test_print_number_emits_raw_byte() {
    assert_eq!(run("print 72;", b""), b"H");
}

#[test]
fn test_print_char_literal() {
    assert_eq!(run("print 'A';", b""), b"A");
}

#[test]
fn test_print_expression() {
    assert_eq!(run("print (2 + 3) * 10;", b""), b"2"); // byte 50
}

#[test]
fn test_print_variable_is_decimal() {
    assert_eq!(run("var x; x = 65; print x;", b""), b"65");
    assert_eq!(run("var x; x = 0; print x;", b""), b"0");
    assert_eq!(run("var x; x = 255; print x;", b""), b"255");
}

#[test]
fn test_write_lays_out_cells() {
    // `write` produces no output itself; the raw escape hatch reads the
    // cells it laid out.
    assert_eq!(run("write \"Hi\"; fuck \".>.<\";", b""), b"Hi");
}

// ----- assignment and arithmetic -----

#[test]
fn test_assignment_wraps_mod_256() {
    assert_eq!(run("var x; x = 300; print x;", b""), b"44");
}

#[test]
fn test_addition() {
    let source = "var a; var b; a = 3; b = 5; a + b; print a;";
    assert_eq!(run(source, b""), b"8");
}

#[test]
fn test_addition_preserves_rhs() {
    let source = "var a; var b; a = 3; b = 5; a + b; print b;";
    assert_eq!(run(source, b""), b"5");
}

#[test]
fn test_subtraction_wraps() {
    assert_eq!(run("var a; a = 3; a - 5; print a;", b""), b"254");
}

#[test]
fn test_multiplication() {
    let source = "var a; var b; a = 17; b = 5; a * b; print a;";
    assert_eq!(run(source, b""), b"85");
}

#[test]
fn test_division_truncates() {
    let source = "var a; var b; a = 17; b = 5; a / b; print a;";
    assert_eq!(run(source, b""), b"3");
}

#[test]
fn test_modulus() {
    let source = "var a; var b; a = 17; b = 5; a % b; print a;";
    assert_eq!(run(source, b""), b"2");
}

#[test]
fn test_literal_add_and_subtract_fold() {
    assert_eq!(run("var x; x = 10; x + 100; print x;", b""), b"110");
    assert_eq!(run("var x; x = 10; x - 100; print x;", b""), b"166");
}

#[test]
fn test_self_addition_doubles() {
    // lhs and rhs are the same cell; the compiler must copy first.
    assert_eq!(run("var x; x = 7; x + x; print x;", b""), b"14");
}

#[test]
fn test_large_constants_roundtrip() {
    for value in [16u16, 65, 100, 128, 200, 241, 242, 254] {
        let source = format!("var x; x = {}; print x;", value);
        assert_eq!(run(&source, b""), value.to_string().as_bytes());
    }
}

// ----- comparisons and logic -----

#[test]
fn test_greater_than() {
    assert_eq!(run("var a; var b; a = 9; b = 7; a > b; print a;", b""), b"2");
    assert_eq!(run("var a; var b; a = 7; b = 9; a > b; print a;", b""), b"0");
    // The historical template broke at 255; this one must not.
    assert_eq!(
        run("var a; var b; a = 255; b = 0; a > b; print a;", b""),
        b"255"
    );
}

#[test]
fn test_less_than() {
    assert_eq!(run("var a; var b; a = 7; b = 9; a < b; print a;", b""), b"2");
    assert_eq!(run("var a; var b; a = 9; b = 7; a < b; print a;", b""), b"0");
}

#[test]
fn test_equality() {
    assert_eq!(run("var a; var b; a = 5; b = 5; a == b; print a;", b""), b"1");
    assert_eq!(run("var a; var b; a = 5; b = 6; a == b; print a;", b""), b"0");
}

#[test]
fn test_logical_and() {
    assert_eq!(run("var a; var b; a = 3; b = 4; a && b; print a;", b""), b"1");
    assert_eq!(run("var a; var b; a = 0; b = 4; a && b; print a;", b""), b"0");
    assert_eq!(run("var a; var b; a = 3; b = 0; a && b; print a;", b""), b"0");
}

#[test]
fn test_logical_or_zero_case() {
    assert_eq!(run("var a; var b; a = 0; b = 0; a || b; print a;", b""), b"0");
}

#[test]
fn test_logical_or_truthy_via_if() {
    let source = "
        var a; var b;
        a = 0; b = 9;
        a || b;
        if a print \"y\"; end
    ";
    assert_eq!(run(source, b""), b"y");
}

#[test]
fn test_not() {
    assert_eq!(run("var x; x = 5; not x; print x;", b""), b"0");
    assert_eq!(run("var x; x = 0; not x; print x;", b""), b"1");
}

// ----- control flow -----

#[test]
fn test_while_counts_down() {
    let source = "var x; x = 5; while x print \".\"; x - 1; end";
    assert_eq!(run(source, b""), b".....");
}

#[test]
fn test_while_zero_guard_never_runs() {
    let source = "var x; x = 0; while x print \"*\"; x - 1; end";
    assert_eq!(run(source, b""), b"");
}

#[test]
fn test_while_wraps_through_255() {
    // Decrementing 0 wraps to 255, so the loop runs 255 times.
    let source = "var x; x - 1; while x print \"*\"; x - 1; end";
    assert_eq!(run(source, b""), "*".repeat(255).as_bytes());
}

#[test]
fn test_if_zero_skips_body() {
    let source = "var x; x = 0; if x print \"X\"; end print \"-\";";
    assert_eq!(run(source, b""), b"-");
}

#[test]
fn test_if_nonzero_runs_body_once() {
    let source = "var x; x = 7; if x print \"X\"; end print \"-\";";
    assert_eq!(run(source, b""), b"X-");
}

#[test]
fn test_if_preserves_guard_variable() {
    let source = "var x; x = 7; if x x + 1; end print x;";
    assert_eq!(run(source, b""), b"8");
}

#[test]
fn test_nested_while_accumulates() {
    let source = "
        var i; var j; var acc;
        i = 3;
        while i
            j = 4;
            while j acc + 1; j - 1; end
            i - 1;
        end
        print acc;
    ";
    assert_eq!(run(source, b""), b"12");
}

#[test]
fn test_scoped_variable_cells_are_reused() {
    // Two sequential loop bodies declare locals; the second must not
    // inherit garbage from the first loop's dead cells.
    let source = "
        var go;
        go = 1;
        while go
            var t; t = 9;
            go - 1;
        end
        go = 1;
        while go
            var u;
            u + 1;
            print u;
            go - 1;
        end
    ";
    // `u` reuses `t`'s cell. Cells are not cleared on allocation, so the
    // fresh variable starts at the dead value 9 and prints 10.
    assert_eq!(run(source, b""), b"10");
}

// ----- arrays -----

#[test]
fn test_array_round_trip() {
    let source = "array a 10; a[3] = 42; var v; v = a[3]; print v;";
    assert_eq!(run(source, b""), b"42");
}

#[test]
fn test_array_slots_are_independent() {
    let source = "
        array a 4;
        a[0] = 1; a[1] = 2; a[2] = 3; a[3] = 4;
        var v;
        v = a[0]; print v;
        v = a[2]; print v;
        v = a[3]; print v;
        v = a[1]; print v;
    ";
    assert_eq!(run(source, b""), b"1342");
}

#[test]
fn test_array_variable_index() {
    let source = "
        array a 5;
        var i;
        i = 2;
        a[i] = 9;
        var v;
        v = a[2];
        print v;
    ";
    assert_eq!(run(source, b""), b"9");
}

#[test]
fn test_array_walk_prints_each_slot() {
    let source = "
        array arr 3;
        arr[0] = 65; arr[1] = 66; arr[2] = 67;
        var i; var t;
        i = 0; t = 3;
        while t
            print arr[i];
            i + 1;
            t - 1;
        end
    ";
    assert_eq!(run(source, b""), b"656667");
}

#[test]
fn test_array_slot_arithmetic_ferries_back() {
    let source = "array a 3; a[1] = 10; a[1] + 5; var v; v = a[1]; print v;";
    assert_eq!(run(source, b""), b"15");
}

#[test]
fn test_array_index_expression() {
    let source = "array a 5; a[2 + 1] = 33; var v; v = a[3]; print v;";
    assert_eq!(run(source, b""), b"33");
}

#[test]
fn test_two_arrays_do_not_collide() {
    let source = "
        array a 3; array b 3;
        a[1] = 7; b[1] = 8;
        var v;
        v = a[1]; print v;
        v = b[1]; print v;
    ";
    assert_eq!(run(source, b""), b"78");
}

// ----- constants and expressions -----

#[test]
fn test_define_constant() {
    assert_eq!(run("define N 7; var x; x = N; print x;", b""), b"7");
}

#[test]
fn test_define_expression_folds() {
    let source = "define N 3 * 4 + 1; var x; x = N; print x;";
    assert_eq!(run(source, b""), b"13");
}

#[test]
fn test_constant_in_array_length_and_index() {
    let source = "define LEN 4; array a LEN; a[LEN - 1] = 2; var v; v = a[3]; print v;";
    assert_eq!(run(source, b""), b"2");
}

// ----- macros -----

#[test]
fn test_macro_increments_caller_cell() {
    let source = "macro inc(v) v + 1; end var a; a = 10; inc(a); print a;";
    assert_eq!(run(source, b""), b"11");
}

#[test]
fn test_macro_two_params() {
    let source = "
        macro addto(dst, src) dst + src; end
        var a; var b;
        a = 30; b = 12;
        addto(a, b);
        print a;
    ";
    assert_eq!(run(source, b""), b"42");
}

#[test]
fn test_macro_called_twice() {
    let source = "macro inc(v) v + 1; end var a; inc(a); inc(a); print a;";
    assert_eq!(run(source, b""), b"2");
}

#[test]
fn test_macro_parameter_name_free_after_end() {
    let source = "
        macro bump(p) p + 2; end
        var a;
        a = 1;
        bump(a);
        var p;
        p = 100;
        print a; print p;
    ";
    assert_eq!(run(source, b""), b"3100");
}

#[test]
fn test_macro_local_variable() {
    let source = "
        macro copy_double(dst, src)
            var t;
            t = 0;
            t + src;
            t + src;
            dst = t;
        end
        var a; var b;
        b = 21;
        copy_double(a, b);
        print a;
    ";
    assert_eq!(run(source, b""), b"42");
}

#[test]
fn test_macro_recursion_is_rejected() {
    let messages = error_messages("macro r(v) r(v); end var a; r(a);");
    assert!(
        messages.iter().any(|m| m == "recursive macro definition."),
        "got {:?}",
        messages
    );
}

#[test]
fn test_macro_wrong_arity() {
    let messages = error_messages("macro m(a, b) a + b; end var x; m(x);");
    assert!(
        messages
            .iter()
            .any(|m| m == "incorrect number of arguments to macro."),
        "got {:?}",
        messages
    );
}

#[test]
fn test_macro_argument_must_exist() {
    let messages = error_messages("macro inc(v) v + 1; end inc(ghost);");
    assert!(
        messages.iter().any(|m| m == "unrecognized variable."),
        "got {:?}",
        messages
    );
}

// ----- input -----

#[test]
fn test_input_reads_byte() {
    assert_eq!(run("var c; input c; print c;", b"A"), b"65");
}

#[test]
fn test_decimal_reads_number() {
    assert_eq!(run("var d; decimal d; print d;", b"42\n"), b"42");
    assert_eq!(run("var d; decimal d; print d;", b"199\n"), b"199");
}

#[test]
fn test_fuck_is_verbatim() {
    assert_eq!(run("fuck \"+++.\";", b""), vec![3]);
}

#[test]
fn test_point_positions_head() {
    let source = "var x; var y; x = 1; y = 1; point y; fuck \"+++.\";";
    let out = run(source, b"");
    assert_eq!(out, vec![4]);
}

// ----- diagnostics -----

#[test]
fn test_invalid_statement() {
    let messages = error_messages("mystery;");
    assert!(messages.iter().any(|m| m == "invalid statement."));
}

#[test]
fn test_unmatched_end() {
    let messages = error_messages("end");
    assert!(messages.iter().any(|m| m == "unmatched end statement."));
}

#[test]
fn test_keyword_as_variable_name() {
    let messages = error_messages("var while;");
    assert!(
        messages
            .iter()
            .any(|m| m == "variable names must not be keywords.")
    );
}

#[test]
fn test_variable_redefined() {
    let messages = error_messages("var x; var x;");
    assert!(messages.iter().any(|m| m == "variable already defined."));
}

#[test]
fn test_variable_conflicts_with_constant() {
    let messages = error_messages("define x 3; var x;");
    assert!(
        messages
            .iter()
            .any(|m| m == "variable name conflicts with a constant definition.")
    );
}

#[test]
fn test_while_argument_must_be_cell() {
    let messages = error_messages("array a 3; while a end");
    assert!(
        messages
            .iter()
            .any(|m| m == "arguments for while statements must not be arrays.")
    );
}

#[test]
fn test_unterminated_while() {
    let messages = error_messages("var x; while x");
    assert!(messages.iter().any(|m| m == "unterminated while statement."));
}

#[test]
fn test_unknown_rhs_identifier() {
    let messages = error_messages("var x; x = ghost;");
    assert!(
        messages
            .iter()
            .any(|m| m == "unexpected token, expected a number or operator.")
    );
}

#[test]
fn test_unused_variable_warns_but_compiles() {
    let result = compile_source("var lonely; var busy; busy = 1; print busy;");
    assert!(result.code.is_some());
    let warnings: Vec<_> = result
        .diagnostics
        .reports()
        .iter()
        .filter(|d| d.severity == bfm::Severity::Warning)
        .map(|d| d.message.clone())
        .collect();
    assert!(warnings.contains(&"unused variable \"lonely\".".to_string()));
    assert!(!warnings.contains(&"unused variable \"busy\".".to_string()));
}

#[test]
fn test_multiple_errors_reported_in_one_run() {
    let source = "var x; var x;\nvar y; var y;";
    let messages = error_messages(source);
    assert_eq!(
        messages
            .iter()
            .filter(|m| *m == "variable already defined.")
            .count(),
        2
    );
}

#[test]
fn test_comments_are_skipped() {
    let source = "
        // line comment
        var x; /* block /* nested */ comment */ x = 7;
        print x;
    ";
    assert_eq!(run(source, b""), b"7");
}

// ----- output format and file API -----

#[test]
fn test_output_contains_only_bf_commands() {
    let code = compile("var a; var b; a = 200; b = 9; a % b; print a; print \"!\";");
    assert!(
        code.chars()
            .all(|c| matches!(c, '<' | '>' | '+' | '-' | '[' | ']' | ',' | '.'))
    );
}

#[test]
fn test_compile_file_wraps_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("hello.bfm");
    let output = dir.path().join("hello.bf");
    std::fs::write(&input, "var x; x = 200; print x; print \"hello\";").expect("write input");

    bfm::compile_file(&input, &output, false).expect("compiles");

    let written = std::fs::read_to_string(&output).expect("read output");
    assert!(written.lines().all(|line| line.len() <= 80));

    // The wrapped program still runs: line breaks are not commands.
    let out = Machine::new().run(&written, b"").expect("runs");
    assert_eq!(out, b"200hello");
}

#[test]
fn test_compile_file_error_exit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("bad.bfm");
    let output = dir.path().join("bad.bf");
    std::fs::write(&input, "gibberish;").expect("write input");

    assert!(bfm::compile_file(&input, &output, false).is_err());
    assert!(!output.exists());
}
