use std::io::Write;
use assert_cmd::Command;
use tempfile::NamedTempFile;
use predicates::prelude::*;


fn config(contents: &str) -> NamedTempFile {
    let mut config_file = NamedTempFile::new().unwrap();
    write!(config_file, "{}", contents).unwrap();
    config_file
}

#[test]
fn missing_source() {
    let mut cmd = Command::cargo_bin("pascal").unwrap();
    cmd.arg("./NONEXISTENT")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read source file"));
}

#[test]
fn missing_config() {
    let mut cmd = Command::cargo_bin("pascal").unwrap();
    cmd.arg("-c")
        .arg("NONEXISTENT")
        .arg("programs/arith.pas")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read config file"));
}

#[test]
fn bad_config() {
    let config_file = config("bad config\n");

    let mut cmd = Command::cargo_bin("pascal").unwrap();
    cmd.arg("-c")
        .arg(config_file.path())
        .arg("programs/arith.pas")
        .assert()
        .failure()
        .stderr(predicate::str::contains("incorrect configuration"));
}

#[test]
fn unknown_config_key() {
    let config_file = config("[runtime]\nmax_depth = 3\n");

    let mut cmd = Command::cargo_bin("pascal").unwrap();
    cmd.arg("-c")
        .arg(config_file.path())
        .arg("programs/arith.pas")
        .assert()
        .failure()
        .stderr(predicate::str::contains("incorrect configuration"));
}

#[test]
fn call_depth_from_config() {
    let config_file = config("[runtime]\nmax_call_depth = 3\n");

    let mut cmd = Command::cargo_bin("pascal").unwrap();
    cmd.arg("-c")
        .arg(config_file.path())
        .arg("programs/fact.pas")
        .assert()
        .failure()
        .stderr(predicate::str::contains("maximum call depth of 3 exceeded"));
}

#[test]
fn prompt_from_config() {
    let config_file = config("[repl]\nprompt = \"calc> \"\n");

    let mut cmd = Command::cargo_bin("pascal").unwrap();
    cmd.arg("-c")
        .arg(config_file.path())
        .write_stdin("6 * 7\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("calc> 42\n"));
}

#[test]
fn verbose_from_config() {
    let config_file = config("[output]\nverbose = true\n");

    let mut cmd = Command::cargo_bin("pascal").unwrap();
    cmd.arg("-c")
        .arg(config_file.path())
        .arg("programs/arith.pas")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tokens: "));
}

#[test]
fn call_depth_out_of_range() {
    for depth in &["10000000", "0"] {
        let config_file = config(&format!("[runtime]\nmax_call_depth = {}\n", depth));

        let mut cmd = Command::cargo_bin("pascal").unwrap();
        cmd.arg("-c")
            .arg(config_file.path())
            .arg("programs/arith.pas")
            .assert()
            .failure()
            .stderr(predicate::str::contains("incorrect configuration"))
            .stderr(predicate::str::contains("max_call_depth must be between 1 and 4096"));
    }
}

#[test]
fn deepest_call_depth_fails_cleanly() {
    let config_file = config("[runtime]\nmax_call_depth = 4096\n");
    let mut source = NamedTempFile::new().unwrap();
    write!(source, "PROGRAM Deep; PROCEDURE Loop; BEGIN Loop() END; BEGIN Loop() END.").unwrap();

    let mut cmd = Command::cargo_bin("pascal").unwrap();
    cmd.arg("-c")
        .arg(config_file.path())
        .arg(source.path())
        .arg("programs/arith.pas")
        .assert()
        .failure()
        .stdout(predicate::str::contains("PROGRAM Arith"))
        .stderr(predicate::str::contains("maximum call depth of 4096 exceeded"));
}
