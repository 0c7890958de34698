use assert_cmd::Command;
use rstest::rstest;
use std::path::Path;

fn disview(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("disview").unwrap();
    cmd.env("DISVIEW_CONFIG_DIR", config_dir);
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().code(0).get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn test_ast_from_stdin() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = tempfile::tempdir()?;

    let assert = disview(config_dir.path())
        .arg("ast")
        .write_stdin("pass")
        .assert();
    assert
        .success()
        .code(0)
        .stdout("Module\n  body\n    Pass\n");

    Ok(())
}

#[test]
fn test_ast_nested_function() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = tempfile::tempdir()?;

    let stdout = stdout_of(
        disview(config_dir.path())
            .arg("ast")
            .arg("-")
            .write_stdin("def f(a):\n  return a"),
    );

    assert!(stdout.starts_with("Module\n  body\n    FunctionDef f\n"));
    assert!(stdout.contains("      args\n        arguments\n"));
    assert!(stdout.contains("        Return\n"));

    Ok(())
}

#[test]
fn test_dis_file() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = tempfile::tempdir()?;
    let source = config_dir.path().join("snippet.py");
    std::fs::write(&source, "x = 1\ndef f():\n  return x\n")?;

    let stdout = stdout_of(disview(config_dir.path()).arg("dis").arg(&source));
    let lines = stdout.lines().collect::<Vec<_>>();

    assert!(lines[0].contains("RESUME"));
    assert!(lines.iter().any(|line| line.contains("STORE_NAME") && line.ends_with(" x")));
    assert!(lines.iter().any(|line| line.starts_with("@f ")));
    assert!(lines.iter().any(|line| line.contains("LOAD_GLOBAL")));

    Ok(())
}

#[rstest]
#[case::flag(&["dis", "--opcodes"], "")]
#[case::config(&["dis"], "show_opcodes = true\n")]
fn test_dis_with_opcodes(#[case] args: &[&str], #[case] config: &str) {
    let config_dir = tempfile::tempdir().unwrap();
    std::fs::write(config_dir.path().join("config.toml"), config).unwrap();

    let stdout = stdout_of(disview(config_dir.path()).args(args).write_stdin("x = 1"));

    assert!(
        stdout
            .lines()
            .any(|line| line.contains("STORE_NAME") && line.ends_with(" (90) x"))
    );
}

#[test]
fn test_dis_adaptive() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = tempfile::tempdir()?;

    let stdout = stdout_of(
        disview(config_dir.path())
            .arg("dis")
            .arg("--adaptive")
            .write_stdin("x = 1 + 2"),
    );

    assert!(stdout.contains("BINARY_OP_ADD_INT"));

    Ok(())
}

#[test]
fn test_counts() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = tempfile::tempdir()?;

    let stdout = stdout_of(
        disview(config_dir.path())
            .arg("counts")
            .write_stdin("x = 1\ny = 2\ndef f():\n  return x"),
    );
    let lines = stdout.lines().collect::<Vec<_>>();

    assert!(lines[0].starts_with("LOAD_CONST") && lines[0].ends_with(" 3"));
    assert!(lines[1].starts_with("STORE_NAME") && lines[1].ends_with(" 3"));
    assert!(lines[2].starts_with("RESUME") && lines[2].ends_with(" 2"));

    Ok(())
}

#[rstest]
#[case::dis("dis")]
#[case::ast("ast")]
#[case::counts("counts")]
fn test_syntax_error_fails(#[case] command: &str) {
    let config_dir = tempfile::tempdir().unwrap();

    disview(config_dir.path())
        .arg(command)
        .write_stdin("x = (1 +")
        .assert()
        .failure();
}

#[test]
fn test_missing_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = tempfile::tempdir()?;

    disview(config_dir.path())
        .arg("dis")
        .arg(config_dir.path().join("missing.py"))
        .assert()
        .failure();

    Ok(())
}

#[test]
fn test_malformed_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = tempfile::tempdir()?;
    std::fs::write(config_dir.path().join("config.toml"), "layout = 3\n")?;

    disview(config_dir.path())
        .arg("ast")
        .write_stdin("pass")
        .assert()
        .failure();

    Ok(())
}

#[test]
fn test_log_file() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = tempfile::tempdir()?;
    let log_file = config_dir.path().join("disview.log");

    disview(config_dir.path())
        .arg("-vvvv")
        .arg("--log-file")
        .arg(&log_file)
        .arg("ast")
        .write_stdin("pass")
        .assert()
        .success()
        .stderr("");

    assert!(std::fs::read_to_string(&log_file)?.contains("cli:"));

    Ok(())
}
