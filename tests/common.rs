#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use chrono::{DateTime, TimeZone, Utc};
use shoplog::core::clock::ManualClock;
use shoplog::core::ledger::Ledger;
use shoplog::core::registry::RegistryLogic;
use shoplog::models::worker::Worker;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// The binary, isolated from any real configuration file.
pub fn shoplog() -> Command {
    let mut cmd = cargo_bin_cmd!("shoplog");
    cmd.env("HOME", env::temp_dir().join("shoplog_test_home"));
    cmd.env("APPDATA", env::temp_dir().join("shoplog_test_home"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_shoplog.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    for suffix in ["", "-wal", "-shm"] {
        fs::remove_file(format!("{db_path}{suffix}")).ok();
    }
    db_path
}

/// 2025-03-10 09:00:00 UTC
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, m, s).unwrap()
}

/// In-memory ledger driven by a manual clock starting at `t0()`.
pub fn manual_ledger() -> (Ledger, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let ledger = Ledger::in_memory(clock.clone()).expect("in-memory ledger");
    (ledger, clock)
}

/// Workers E1, E2; work order WO1 in workshop "main";
/// T1, T2 assigned to E1 and T3 assigned to E2.
pub fn seed(ledger: &Ledger) {
    let conn = ledger.conn();
    RegistryLogic::add_worker(conn, &Worker::new("E1", "Anna"), t0()).expect("worker E1");
    RegistryLogic::add_worker(conn, &Worker::new("E2", "Marco").with_role("mechanic"), t0())
        .expect("worker E2");
    RegistryLogic::add_work_order(conn, "WO1", "main", "brake service", t0()).expect("WO1");
    RegistryLogic::add_task(conn, "T1", "WO1", Some("E1"), "brakes", 1.0, t0()).expect("T1");
    RegistryLogic::add_task(conn, "T2", "WO1", Some("E1"), "inspection", 0.5, t0()).expect("T2");
    RegistryLogic::add_task(conn, "T3", "WO1", Some("E2"), "tyres", 0.75, t0()).expect("T3");
}

/// Initialize a DB file through the CLI and register a small workshop.
pub fn init_db_with_data(db_path: &str) {
    shoplog()
        .args(["--db", db_path, "--test", "init"])
        .assert()
        .success();

    for args in [
        vec!["worker", "add", "E1", "--name", "Anna"],
        vec!["worker", "add", "E2", "--name", "Marco", "--role", "mechanic"],
        vec!["order", "add", "WO1", "--description", "brake service"],
        vec!["task", "add", "T1", "--order", "WO1", "--worker", "E1", "--type", "brakes", "--hours", "1"],
        vec!["task", "add", "T2", "--order", "WO1", "--worker", "E1", "--type", "inspection"],
        vec!["task", "add", "T3", "--order", "WO1", "--worker", "E2", "--type", "tyres"],
    ] {
        shoplog()
            .args(["--db", db_path])
            .args(&args)
            .assert()
            .success();
    }
}
