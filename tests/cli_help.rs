use std::process::Command;

#[test]
fn test_help_lists_backends_and_operations() {
    let bin = env!("CARGO_BIN_EXE_spinx");

    let output = Command::new(bin).arg("--help").output().unwrap();

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for expected in [
        "aws-fargate",
        "gcp-cloudrun",
        "azure-container-apps",
        "setup",
        "deploy",
        "destroy",
        "logs",
    ] {
        assert!(
            stdout.contains(expected),
            "help output should mention '{}'; got:\n{}",
            expected,
            stdout
        );
    }
    assert!(
        stdout.contains("130 interrupted"),
        "help output should document exit codes; got:\n{}",
        stdout
    );
}

#[test]
fn test_version_flag() {
    let bin = env!("CARGO_BIN_EXE_spinx");

    let output = Command::new(bin).arg("--version").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("spinx "), "got: {}", stdout);
}
