//! Configuration specs
//!
//! `--print-config` shows the effective configuration without starting.

use crate::prelude::*;

#[test]
fn print_config_shows_defaults() {
    siftd()
        .args(&["--print-config"])
        .passes()
        .stdout_has(r#"listen = "127.0.0.1:8000""#)
        .stdout_has(r#"topic = "stdin""#)
        .stdout_has("session_limit = 1000")
        .stdout_has("[bus]")
        .stdout_has("max_replay = 100")
        .stdout_has(r#"consumer_timeout = "20s""#)
        .stdout_has(r#"workers_timeout = "10s""#)
        .stdout_has("ring_capacity = 100");
}

#[test]
fn flags_override_config_file() {
    let (_dir, path) = config_file(
        r#"
topic = "from-file"
session_limit = 3

[bus]
max_replay = 7
"#,
    );

    siftd()
        .args(&[
            "--config",
            path.to_str().unwrap(),
            "--topic",
            "tweets",
            "--workers-timeout",
            "250ms",
        ])
        .args(&["--print-config"])
        .passes()
        .stdout_has(r#"topic = "tweets""#)
        .stdout_has("session_limit = 3")
        .stdout_has("max_replay = 7")
        .stdout_has(r#"workers_timeout = "250ms""#);
}

#[test]
fn printed_config_loads_back_unchanged() {
    let first = siftd()
        .args(&["--print-config", "--listen", "127.0.0.1:9123", "--workers", "4"])
        .passes()
        .stdout();

    let (_dir, path) = config_file(&first);
    let second = siftd()
        .args(&["--print-config", "--config", path.to_str().unwrap()])
        .passes()
        .stdout();

    similar_asserts::assert_eq!(first, second);
}

#[test]
fn missing_config_file_fails() {
    siftd()
        .args(&["--config", "/nonexistent/siftd.toml", "--print-config"])
        .fails()
        .stderr_has("siftd: cannot read config");
}

#[test]
fn malformed_config_file_fails() {
    let (_dir, path) = config_file("session_limit = \"lots\"\n");
    siftd()
        .args(&["--config", path.to_str().unwrap(), "--print-config"])
        .fails()
        .stderr_has("siftd: invalid config");
}

#[test]
fn bad_duration_flag_fails() {
    siftd()
        .args(&["--consumer-timeout", "soon", "--print-config"])
        .fails()
        .stderr_has("invalid value");
}
