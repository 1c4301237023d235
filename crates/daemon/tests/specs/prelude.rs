//! Shared helpers for spec tests

use std::path::PathBuf;
use std::process::{Child, Command as StdCommand, Output, Stdio};

pub use tempfile::TempDir;

const SIFTD: &str = env!("CARGO_BIN_EXE_siftd");

/// Start building a siftd invocation
pub fn siftd() -> Siftd {
    Siftd { args: Vec::new() }
}

pub struct Siftd {
    args: Vec<String>,
}

impl Siftd {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Run to completion and expect success
    pub fn passes(self) -> Run {
        let run = self.run();
        assert!(
            run.output.status.success(),
            "expected success, got {:?}\nstderr: {}",
            run.output.status,
            run.stderr()
        );
        run
    }

    /// Run to completion and expect failure
    pub fn fails(self) -> Run {
        let run = self.run();
        assert!(
            !run.output.status.success(),
            "expected failure\nstdout: {}",
            run.stdout()
        );
        run
    }

    /// Spawn in the background with piped stdout
    pub fn spawn(self) -> Child {
        StdCommand::new(SIFTD)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn siftd")
    }

    fn run(self) -> Run {
        let output = assert_cmd::Command::new(SIFTD)
            .args(&self.args)
            .write_stdin("")
            .output()
            .expect("run siftd");
        Run { output }
    }
}

pub struct Run {
    output: Output,
}

impl Run {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout missing {:?}:\n{}",
            expected,
            stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr missing {:?}:\n{}",
            expected,
            stderr
        );
        self
    }
}

/// Write a config file into a fresh temp dir
pub fn config_file(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("siftd.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}
