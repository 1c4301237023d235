//! Help and version specs

use crate::prelude::*;

#[test]
fn help_lists_every_flag() {
    let run = siftd().args(&["--help"]).passes();
    for flag in [
        "--config",
        "--listen",
        "--topic",
        "--session-limit",
        "--max-replay",
        "--workers",
        "--ring-capacity",
        "--consumer-timeout",
        "--workers-timeout",
        "--log-file",
        "--no-stdin",
        "--print-config",
    ] {
        assert!(run.stdout().contains(flag), "help is missing {}", flag);
    }
}

#[test]
fn version_prints_package_version() {
    siftd()
        .args(&["--version"])
        .passes()
        .stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn unknown_flag_fails() {
    siftd()
        .args(&["--frobnicate"])
        .fails()
        .stderr_has("--frobnicate");
}
