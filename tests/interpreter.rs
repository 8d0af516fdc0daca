use treelox::ast::Stmt;
use treelox::error::LoxError;
use treelox::interpreter::Interpreter;
use treelox::parser::Parser;
use treelox::resolver::Resolver;
use treelox::scanner::Scanner;
use treelox::token::Token;
use treelox::value::Value;

fn parse(source: &str) -> Vec<Stmt> {
    let tokens: Vec<Token> = Scanner::new(source)
        .collect::<Result<Vec<Token>, LoxError>>()
        .expect("source should scan");

    Parser::new(tokens).parse().expect("program should parse")
}

/// Evaluate a single expression statement without resolution; only globals
/// and literals may appear.
fn eval(source: &str) -> Value {
    let statements: Vec<Stmt> = parse(source);

    match &statements[0] {
        Stmt::Expression(expr) => {
            let mut interpreter: Interpreter = Interpreter::new();

            interpreter.evaluate(expr).expect("expression evaluates")
        }

        other => panic!("expected an expression statement, got {:?}", other),
    }
}

/// Run a whole program and hand back the interpreter for globals inspection.
fn run(source: &str) -> Interpreter {
    let statements: Vec<Stmt> = parse(source);

    let mut interpreter: Interpreter = Interpreter::new();

    Resolver::new(&mut interpreter)
        .resolve(&statements)
        .expect("program resolves");

    interpreter
        .interpret(&statements)
        .expect("program runs without a runtime error");

    interpreter
}

fn run_err(source: &str) -> String {
    let statements: Vec<Stmt> = parse(source);

    let mut interpreter: Interpreter = Interpreter::new();

    Resolver::new(&mut interpreter)
        .resolve(&statements)
        .expect("program resolves");

    interpreter
        .interpret(&statements)
        .expect_err("expected a runtime error")
        .to_string()
}

fn global(interpreter: &Interpreter, name: &str) -> Value {
    interpreter
        .globals
        .borrow()
        .get(name, 0)
        .expect("global should be defined")
}

// ─────────────────────────────────────────────────────────────────────────
// Expression evaluation
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn test_interpreter_arithmetic() {
    assert_eq!(eval("1 + 2;"), Value::Number(3.0));
    assert_eq!(eval("2 * 3 + 4;"), Value::Number(10.0));
    assert_eq!(eval("7 % 3;"), Value::Number(1.0));
    assert_eq!(eval("-(1 + 2);"), Value::Number(-3.0));
}

#[test]
fn test_interpreter_division_follows_ieee754() {
    assert_eq!(eval("1 / 0;"), Value::Number(f64::INFINITY));

    match eval("0 / 0;") {
        Value::Number(n) => assert!(n.is_nan()),
        other => panic!("expected a number, got {:?}", other),
    }
}

#[test]
fn test_interpreter_string_concatenation() {
    assert_eq!(eval("\"hi\" + \"!\";"), Value::String("hi!".to_string()));

    // Either operand a string concatenates the display of both.
    assert_eq!(eval("\"n=\" + 4;"), Value::String("n=4".to_string()));
    assert_eq!(eval("4 + \"!\";"), Value::String("4!".to_string()));
    assert_eq!(eval("\"x: \" + nil;"), Value::String("x: nil".to_string()));
}

#[test]
fn test_interpreter_comparisons() {
    assert_eq!(eval("1 < 2;"), Value::Bool(true));
    assert_eq!(eval("2 <= 2;"), Value::Bool(true));
    assert_eq!(eval("1 > 2;"), Value::Bool(false));
    assert_eq!(eval("3 >= 4;"), Value::Bool(false));
}

#[test]
fn test_interpreter_equality() {
    assert_eq!(eval("1 == 1;"), Value::Bool(true));
    assert_eq!(eval("1 != 2;"), Value::Bool(true));
    assert_eq!(eval("\"a\" == \"a\";"), Value::Bool(true));
    assert_eq!(eval("nil == nil;"), Value::Bool(true));

    // Different kinds never compare equal.
    assert_eq!(eval("1 == \"1\";"), Value::Bool(false));
    assert_eq!(eval("nil == false;"), Value::Bool(false));
    assert_eq!(eval("0 == false;"), Value::Bool(false));
}

#[test]
fn test_interpreter_truthiness() {
    // Only nil and false are false; 0, "" and NaN are true.
    assert_eq!(eval("!nil;"), Value::Bool(true));
    assert_eq!(eval("!false;"), Value::Bool(true));
    assert_eq!(eval("!0;"), Value::Bool(false));
    assert_eq!(eval("!\"\";"), Value::Bool(false));
    assert_eq!(eval("!(0 / 0);"), Value::Bool(false));
}

#[test]
fn test_interpreter_logical_operators_return_operands() {
    assert_eq!(eval("nil or \"yes\";"), Value::String("yes".to_string()));
    assert_eq!(eval("1 or 2;"), Value::Number(1.0));
    assert_eq!(eval("nil and 1;"), Value::Nil);
    assert_eq!(eval("1 and 2;"), Value::Number(2.0));
}

#[test]
fn test_interpreter_short_circuit_skips_right_operand() {
    // The right operand would be a runtime error if evaluated.
    assert_eq!(eval("false and missing;"), Value::Bool(false));
    assert_eq!(eval("true or missing;"), Value::Bool(true));
}

// ─────────────────────────────────────────────────────────────────────────
// Statements, scoping, functions
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn test_interpreter_block_scoping_and_shadowing() {
    let interpreter = run(
        "var first; var second; \
         { var a = 1; { var a = 2; second = a; } first = a; }",
    );

    assert_eq!(global(&interpreter, "first"), Value::Number(1.0));
    assert_eq!(global(&interpreter, "second"), Value::Number(2.0));
}

#[test]
fn test_interpreter_uninitialized_var_is_nil() {
    let interpreter = run("var a;");

    assert_eq!(global(&interpreter, "a"), Value::Nil);
}

#[test]
fn test_interpreter_global_redefinition_reads_prior_binding() {
    let interpreter = run("var a = \"hi\"; var a = a + \"!\";");

    assert_eq!(global(&interpreter, "a"), Value::String("hi!".to_string()));
}

#[test]
fn test_interpreter_if_uses_truthiness() {
    // 0 is truthy.
    let interpreter = run("var r; if (0) r = \"t\"; else r = \"f\";");

    assert_eq!(global(&interpreter, "r"), Value::String("t".to_string()));
}

#[test]
fn test_interpreter_for_loop() {
    let interpreter =
        run("var total = 0; for (var i = 1; i <= 4; i = i + 1) total = total + i;");

    assert_eq!(global(&interpreter, "total"), Value::Number(10.0));
}

#[test]
fn test_interpreter_while_loop() {
    let interpreter = run("var n = 1; while (n < 100) n = n * 2;");

    assert_eq!(global(&interpreter, "n"), Value::Number(128.0));
}

#[test]
fn test_interpreter_closure_counter() {
    let interpreter = run(
        "function makeCounter() { \
           var n = 0; \
           function count() { n = n + 1; return n; } \
           return count; \
         } \
         var c = makeCounter(); \
         var a = c(); \
         var b = c();",
    );

    assert_eq!(global(&interpreter, "a"), Value::Number(1.0));
    assert_eq!(global(&interpreter, "b"), Value::Number(2.0));
}

#[test]
fn test_interpreter_closures_are_independent() {
    let interpreter = run(
        "function makeCounter() { \
           var n = 0; \
           function count() { n = n + 1; return n; } \
           return count; \
         } \
         var c1 = makeCounter(); \
         var c2 = makeCounter(); \
         c1(); \
         var a = c1(); \
         var b = c2();",
    );

    assert_eq!(global(&interpreter, "a"), Value::Number(2.0));
    assert_eq!(global(&interpreter, "b"), Value::Number(1.0));
}

#[test]
fn test_interpreter_return_unwinds_nested_blocks() {
    let interpreter = run(
        "function f() { { { return 1; } } } \
         var x = f(); \
         var y = 2;",
    );

    // Execution continues normally after the unwound call.
    assert_eq!(global(&interpreter, "x"), Value::Number(1.0));
    assert_eq!(global(&interpreter, "y"), Value::Number(2.0));
}

#[test]
fn test_interpreter_function_without_return_yields_nil() {
    let interpreter = run("function f() {} var x = f();");

    assert_eq!(global(&interpreter, "x"), Value::Nil);
}

#[test]
fn test_interpreter_recursion() {
    let interpreter = run(
        "function fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } \
         var x = fib(10);",
    );

    assert_eq!(global(&interpreter, "x"), Value::Number(55.0));
}

#[test]
fn test_interpreter_clock_native() {
    let interpreter = run("var t = clock();");

    match global(&interpreter, "t") {
        Value::Number(ms) => assert!(ms > 0.0),
        other => panic!("expected a number, got {:?}", other),
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Classes
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn test_interpreter_initializer_binds_fields() {
    let interpreter = run(
        "class P { init(x) { this.x = x; } } \
         var p = P(7); \
         var v = p.x;",
    );

    assert_eq!(global(&interpreter, "v"), Value::Number(7.0));

    assert_eq!(
        format!("{}", global(&interpreter, "p")),
        "P instance".to_string()
    );
}

#[test]
fn test_interpreter_initializer_call_returns_this() {
    let interpreter = run("class P { init() {} } var p = P(); var q = p.init();");

    // Instance equality is identity: init handed back the same object.
    assert_eq!(global(&interpreter, "p"), global(&interpreter, "q"));
}

#[test]
fn test_interpreter_bound_method_remembers_instance() {
    let interpreter = run(
        "class C { init() { this.v = 10; } get() { return this.v; } } \
         var c = C(); \
         var m = c.get; \
         var r = m();",
    );

    assert_eq!(global(&interpreter, "r"), Value::Number(10.0));
}

#[test]
fn test_interpreter_fields_shadow_methods() {
    let interpreter = run(
        "class C { m() { return \"method\"; } } \
         var c = C(); \
         c.m = \"field\"; \
         var r = c.m;",
    );

    assert_eq!(global(&interpreter, "r"), Value::String("field".to_string()));
}

#[test]
fn test_interpreter_inheritance_and_super() {
    let interpreter = run(
        "class A { greet() { return \"A\"; } } \
         class B < A { greet() { return super.greet() + \"B\"; } } \
         var g = B().greet();",
    );

    assert_eq!(global(&interpreter, "g"), Value::String("AB".to_string()));
}

#[test]
fn test_interpreter_methods_are_inherited() {
    let interpreter = run(
        "class A { m() { return 42; } } \
         class B < A {} \
         var r = B().m();",
    );

    assert_eq!(global(&interpreter, "r"), Value::Number(42.0));
}

// ─────────────────────────────────────────────────────────────────────────
// Runtime errors
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn test_interpreter_unary_minus_requires_number() {
    assert!(run_err("-\"a\";").contains("Operand must be a number."));
}

#[test]
fn test_interpreter_plus_rejects_mixed_non_string_operands() {
    assert!(run_err("1 + nil;").contains("Operands must be two numbers or two strings."));
}

#[test]
fn test_interpreter_comparison_requires_numbers() {
    assert!(run_err("1 < \"2\";").contains("Operands must be numbers."));
}

#[test]
fn test_interpreter_undefined_variable() {
    assert!(run_err("var x = missing;").contains("Undefined variable 'missing'."));
}

#[test]
fn test_interpreter_undefined_assignment_target() {
    assert!(run_err("missing = 1;").contains("Undefined variable 'missing'."));
}

#[test]
fn test_interpreter_calling_a_non_callable() {
    assert!(run_err("\"s\"();").contains("Can only call functions and classes."));
}

#[test]
fn test_interpreter_call_arity_mismatch() {
    assert!(run_err("function f(a) {} f();").contains("Expected 1 arguments but got 0."));
    assert!(run_err("clock(1);").contains("Expected 0 arguments but got 1."));
}

#[test]
fn test_interpreter_property_access_on_non_instance() {
    assert!(run_err("var x = 1; x.field;").contains("Only instances have properties."));
    assert!(run_err("var x = 1; x.field = 2;").contains("Only instances have fields."));
}

#[test]
fn test_interpreter_missing_property() {
    assert!(run_err("class C {} C().missing;").contains("Undefined property 'missing'."));
}

#[test]
fn test_interpreter_missing_super_method() {
    assert!(run_err(
        "class A {} class B < A { m() { return super.missing(); } } B().m();"
    )
    .contains("Undefined property 'missing'."));
}

#[test]
fn test_interpreter_superclass_must_be_a_class() {
    assert!(run_err("var NotAClass = 1; class B < NotAClass {}")
        .contains("Superclass must be a class."));
}

#[test]
fn test_interpreter_empty_program_succeeds() {
    run("");
}
