//! End-to-end tests driving the `clockwork` binary against the concrete
//! scenarios `spec.md` §8 lists, plus the exit-code contract from §6.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn script(source: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".cw").tempfile().unwrap();
    file.write_all(source.as_bytes()).unwrap();
    file
}

#[test]
fn arithmetic_precedence_prints_seven() {
    let file = script("print 1 + 2 * 3;");
    Command::cargo_bin("clockwork")
        .unwrap()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("7\n"));
}

#[test]
fn string_concatenation_prints_foobar() {
    let file = script("var a = \"foo\"; var b = \"bar\"; print a + b;");
    Command::cargo_bin("clockwork")
        .unwrap()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("foobar\n"));
}

#[test]
fn while_loop_prints_each_iteration() {
    let file = script("var i = 0; while (i < 3) { print i; i = i + 1; }");
    Command::cargo_bin("clockwork")
        .unwrap()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("0\n1\n2\n"));
}

#[test]
fn function_call_and_return_prints_five() {
    let file = script("fun add(a, b) { return a + b; } print add(2, 3);");
    Command::cargo_bin("clockwork")
        .unwrap()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("5\n"));
}

#[test]
fn undefined_variable_is_runtime_error_with_trace() {
    let file = script("print x;");
    Command::cargo_bin("clockwork")
        .unwrap()
        .arg(file.path())
        .assert()
        .code(70)
        .stderr(
            predicate::str::contains("Undefined variable 'x'.")
                .and(predicate::str::contains("[line 1] in script")),
        );
}

#[test]
fn unterminated_string_is_compile_error() {
    let file = script("\"unterminated");
    Command::cargo_bin("clockwork")
        .unwrap()
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Unterminated string."));
}

#[test]
fn missing_script_file_is_io_error() {
    Command::cargo_bin("clockwork")
        .unwrap()
        .arg("/no/such/file.cw")
        .assert()
        .code(74);
}

#[test]
fn version_flag_prints_crate_version() {
    Command::cargo_bin("clockwork")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
