//! End-to-end tests driving the compiled binary against the fixture
//! programs under `tests/programs/`.

use assert_cmd::assert::Assert;
use assert_cmd::Command;

fn treelox(subcommand: &str, program: &str) -> Assert {
    Command::cargo_bin("treelox")
        .expect("binary should build")
        .arg(subcommand)
        .arg(format!("tests/programs/{}", program))
        .assert()
}

#[test]
fn test_cli_run_arithmetic() {
    treelox("run", "arithmetic.lox")
        .success()
        .stdout("3\n")
        .stderr("");
}

#[test]
fn test_cli_run_global_redeclare() {
    treelox("run", "global_redeclare.lox")
        .success()
        .stdout("hi!\n");
}

#[test]
fn test_cli_run_block_scoping() {
    treelox("run", "block_scoping.lox")
        .success()
        .stdout("2\n1\n");
}

#[test]
fn test_cli_run_closure_counter() {
    treelox("run", "closure_counter.lox")
        .success()
        .stdout("1\n2\n");
}

#[test]
fn test_cli_run_inheritance() {
    treelox("run", "inheritance.lox")
        .success()
        .stdout("A\nB\n");
}

#[test]
fn test_cli_run_initializer() {
    treelox("run", "initializer.lox").success().stdout("7\n");
}

#[test]
fn test_cli_run_fibonacci() {
    treelox("run", "fibonacci.lox")
        .success()
        .stdout("0\n1\n1\n2\n3\n5\n8\n13\n");
}

#[test]
fn test_cli_run_empty_program() {
    treelox("run", "empty.lox").success().stdout("").stderr("");
}

#[test]
fn test_cli_runtime_error_exits_70() {
    treelox("run", "runtime_error.lox")
        .code(70)
        .stdout("")
        .stderr("Operands must be two numbers or two strings.\n[line 1]\n");
}

#[test]
fn test_cli_syntax_error_exits_65() {
    treelox("run", "syntax_error.lox")
        .code(65)
        .stdout("")
        .stderr("[line 1] Error: Expect ')' after expression. Found ';'.\n");
}

#[test]
fn test_cli_lex_error_exits_65() {
    treelox("run", "lex_error.lox")
        .code(65)
        .stdout("")
        .stderr("[line 1] Error: Unexpected character: @\n");
}

#[test]
fn test_cli_tokenize() {
    treelox("tokenize", "arithmetic.lox").success().stdout(
        "PRINT print null\n\
         NUMBER 1 1.0\n\
         PLUS + null\n\
         NUMBER 2 2.0\n\
         SEMICOLON ; null\n\
         EOF  null\n",
    );
}

#[test]
fn test_cli_tokenize_keeps_scanning_past_errors() {
    treelox("tokenize", "lex_error.lox")
        .code(65)
        .stderr("[line 1] Error: Unexpected character: @\n")
        .stdout(
            "VAR var null\n\
             EQUAL = null\n\
             NUMBER 1 1.0\n\
             SEMICOLON ; null\n\
             EOF  null\n",
        );
}

#[test]
fn test_cli_parse() {
    treelox("parse", "arithmetic.lox")
        .success()
        .stdout("(print (+ 1.0 2.0))\n");
}

#[test]
fn test_cli_missing_file_fails() {
    treelox("run", "no_such_file.lox").failure();
}
