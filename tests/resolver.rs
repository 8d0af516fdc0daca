use treelox::error::LoxError;
use treelox::interpreter::Interpreter;
use treelox::parser::Parser;
use treelox::resolver::Resolver;
use treelox::scanner::Scanner;
use treelox::token::Token;

fn resolve_source(source: &str) -> Result<(), LoxError> {
    let tokens: Vec<Token> = Scanner::new(source)
        .collect::<Result<Vec<Token>, LoxError>>()
        .expect("source should scan");

    let statements = Parser::new(tokens)
        .parse()
        .expect("program should parse");

    let mut interpreter: Interpreter = Interpreter::new();

    Resolver::new(&mut interpreter).resolve(&statements)
}

fn resolve_err(source: &str) -> String {
    resolve_source(source)
        .expect_err("expected a resolve error")
        .to_string()
}

#[test]
fn test_resolver_rejects_reading_local_in_its_own_initializer() {
    let msg = resolve_err("{ var a = a; }");

    assert!(msg.contains("its own initializer"), "got: {}", msg);
}

#[test]
fn test_resolver_global_initializer_may_read_prior_binding() {
    // In globals the second `a` is a redefinition reading the first.
    assert!(resolve_source("var a = \"hi\"; var a = a + \"!\";").is_ok());
}

#[test]
fn test_resolver_rejects_duplicate_local_declaration() {
    let msg = resolve_err("{ var a = 1; var a = 2; }");

    assert!(
        msg.contains("Already a variable with this name"),
        "got: {}",
        msg
    );
}

#[test]
fn test_resolver_allows_global_redeclaration() {
    assert!(resolve_source("var a = 1; var a = 2;").is_ok());
}

#[test]
fn test_resolver_allows_shadowing_in_nested_scope() {
    assert!(resolve_source("{ var a = 1; { var a = 2; } }").is_ok());
}

#[test]
fn test_resolver_rejects_duplicate_parameters() {
    let msg = resolve_err("function f(a, a) {}");

    assert!(
        msg.contains("Already a variable with this name"),
        "got: {}",
        msg
    );
}

#[test]
fn test_resolver_rejects_top_level_return() {
    let msg = resolve_err("return 1;");

    assert!(msg.contains("Can't return from top-level code."), "got: {}", msg);
}

#[test]
fn test_resolver_allows_return_inside_function() {
    assert!(resolve_source("function f() { return 1; }").is_ok());
}

#[test]
fn test_resolver_rejects_value_return_from_initializer() {
    let msg = resolve_err("class A { init() { return 1; } }");

    assert!(
        msg.contains("Can't return a value from an initializer."),
        "got: {}",
        msg
    );
}

#[test]
fn test_resolver_allows_bare_return_in_initializer() {
    assert!(resolve_source("class A { init() { return; } }").is_ok());
}

#[test]
fn test_resolver_rejects_this_outside_class() {
    let msg = resolve_err("print this;");

    assert!(
        msg.contains("Can't use 'this' outside of a class."),
        "got: {}",
        msg
    );

    let msg = resolve_err("function f() { return this; }");

    assert!(
        msg.contains("Can't use 'this' outside of a class."),
        "got: {}",
        msg
    );
}

#[test]
fn test_resolver_rejects_super_outside_class() {
    let msg = resolve_err("print super.m;");

    assert!(
        msg.contains("Can't use 'super' outside of a class."),
        "got: {}",
        msg
    );
}

#[test]
fn test_resolver_rejects_super_without_superclass() {
    let msg = resolve_err("class A { m() { return super.m; } }");

    assert!(
        msg.contains("Can't use 'super' in a class with no superclass."),
        "got: {}",
        msg
    );
}

#[test]
fn test_resolver_allows_super_in_subclass() {
    assert!(resolve_source(
        "class A { m() {} } class B < A { m() { return super.m; } }"
    )
    .is_ok());
}

#[test]
fn test_resolver_rejects_self_inheritance() {
    let msg = resolve_err("class A < A {}");

    assert!(msg.contains("A class can't inherit from itself."), "got: {}", msg);
}

#[test]
fn test_resolver_is_idempotent() {
    // Re-resolving the same tree only rewrites identical side-table entries.
    let tokens: Vec<Token> = Scanner::new("{ var a = 1; { print a; } }")
        .collect::<Result<Vec<Token>, LoxError>>()
        .expect("source should scan");

    let statements = Parser::new(tokens).parse().expect("program should parse");

    let mut interpreter: Interpreter = Interpreter::new();

    Resolver::new(&mut interpreter)
        .resolve(&statements)
        .expect("first pass");
    Resolver::new(&mut interpreter)
        .resolve(&statements)
        .expect("second pass");
}
