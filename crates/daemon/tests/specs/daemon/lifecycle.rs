//! Daemon lifecycle specs
//!
//! Verify startup readiness and signal-driven shutdown.

use std::io::{BufRead, BufReader};
use std::process::Child;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::prelude::*;

const WAIT: Duration = Duration::from_secs(10);

fn start() -> (Child, String) {
    let mut child = siftd()
        .args(&["--no-stdin", "--listen", "127.0.0.1:0"])
        .spawn();
    let stdout = child.stdout.take().unwrap();
    let mut line = String::new();
    BufReader::new(stdout).read_line(&mut line).unwrap();
    let addr = line
        .trim()
        .strip_prefix("READY ")
        .unwrap_or_else(|| panic!("unexpected first line {:?}", line))
        .to_string();
    (child, addr)
}

fn stop(child: &mut Child, signal: Signal) -> std::process::ExitStatus {
    kill(Pid::from_raw(child.id() as i32), signal).unwrap();
    let deadline = Instant::now() + WAIT;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("siftd did not exit after {:?}", signal);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn daemon_reports_bound_address_when_ready() {
    let (mut child, addr) = start();
    assert!(addr.starts_with("127.0.0.1:"), "{}", addr);
    assert_ne!(addr, "127.0.0.1:0");
    stop(&mut child, Signal::SIGTERM);
}

#[test]
fn daemon_exits_cleanly_on_sigterm() {
    let (mut child, _addr) = start();
    assert!(stop(&mut child, Signal::SIGTERM).success());
}

#[test]
fn daemon_exits_cleanly_on_sigint() {
    let (mut child, _addr) = start();
    assert!(stop(&mut child, Signal::SIGINT).success());
}

#[test]
fn daemon_fails_when_address_is_taken() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap().to_string();
    siftd()
        .args(&["--no-stdin", "--listen", &addr])
        .fails()
        .stderr_has("siftd: failed to bind");
}
