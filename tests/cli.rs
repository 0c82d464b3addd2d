use std::process::Command;

#[test]
fn test_ping_without_server_exits_with_failure() {
    let port = portpicker::pick_unused_port().expect("No free ports");
    let output = Command::new(env!("CARGO_BIN_EXE_gmsec"))
        .args(["ping", "--url", &format!("ws://127.0.0.1:{port}")])
        .output()
        .expect("Failed to run gmsec");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Ping failed"));
}

#[test]
fn test_ping_rejects_non_websocket_url() {
    let output = Command::new(env!("CARGO_BIN_EXE_gmsec"))
        .args(["ping", "--url", "http://127.0.0.1:1"])
        .output()
        .expect("Failed to run gmsec");

    assert_eq!(output.status.code(), Some(1));
}
