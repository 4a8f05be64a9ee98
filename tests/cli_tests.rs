use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

mod common;
use common::{init_db_with_data, setup_test_db, shoplog};

/// Id of the active log reported by `active --json`.
fn active_log_id(db_path: &str, worker: &str) -> i64 {
    let out = shoplog()
        .args(["--db", db_path, "active", "--worker", worker, "--json"])
        .output()
        .expect("run active");
    assert!(out.status.success());
    let view: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json view");
    view["active"]["log"]["id"].as_i64().expect("active log id")
}

#[test]
fn test_init_creates_schema() {
    let db_path = setup_test_db("cli_init");

    shoplog()
        .args(["--db", &db_path, "--test", "init"])
        .assert()
        .success()
        .stdout(contains("Database initialized"));

    shoplog()
        .args(["--db", &db_path, "log", "--print"])
        .assert()
        .success()
        .stdout(contains("migration_applied").and(contains("init")));
}

#[test]
fn test_registry_listing() {
    let db_path = setup_test_db("cli_registry");
    init_db_with_data(&db_path);

    shoplog()
        .args(["--db", &db_path, "worker", "list"])
        .assert()
        .success()
        .stdout(contains("Anna").and(contains("mechanic")));

    shoplog()
        .args(["--db", &db_path, "task", "list", "--order", "WO1"])
        .assert()
        .success()
        .stdout(contains("T1").and(contains("T3")).and(contains("pending")));

    shoplog()
        .args(["--db", &db_path, "task", "add", "T9", "--order", "WO404"])
        .assert()
        .failure()
        .stderr(contains("work order WO404"));
}

#[test]
fn test_start_pause_resume_finish_flow() {
    let db_path = setup_test_db("cli_flow");
    init_db_with_data(&db_path);

    shoplog()
        .args(["--db", &db_path, "start", "T1", "--worker", "E1"])
        .assert()
        .success()
        .stdout(contains("Started task T1").and(contains("in_progress")));

    let log_id = active_log_id(&db_path, "E1");

    shoplog()
        .args(["--db", &db_path, "pause", &log_id.to_string(), "--worker", "E1"])
        .assert()
        .success()
        .stdout(contains("Paused log").and(contains("paused")));

    shoplog()
        .args(["--db", &db_path, "resume", "T1", "--worker", "E1"])
        .assert()
        .success()
        .stdout(contains("Resumed task T1"));

    shoplog()
        .args([
            "--db",
            &db_path,
            "finish",
            &log_id.to_string(),
            "--task",
            "T1",
            "--worker",
            "E1",
        ])
        .assert()
        .success()
        .stdout(contains("Finished log").and(contains("Active: none")));

    shoplog()
        .args(["--db", &db_path, "task", "list"])
        .assert()
        .success()
        .stdout(contains("finished"));
}

#[test]
fn test_second_start_is_blocked() {
    let db_path = setup_test_db("cli_conflict");
    init_db_with_data(&db_path);

    shoplog()
        .args(["--db", &db_path, "start", "T1", "--worker", "E1"])
        .assert()
        .success();

    shoplog()
        .args(["--db", &db_path, "start", "T2", "--worker", "E1"])
        .assert()
        .failure()
        .stderr(contains("already has an open log"))
        // The refreshed view still shows the running task.
        .stdout(contains("on T1"));
}

#[test]
fn test_pending_excludes_active_task() {
    let db_path = setup_test_db("cli_pending");
    init_db_with_data(&db_path);

    shoplog()
        .args(["--db", &db_path, "start", "T1", "--worker", "E1"])
        .assert()
        .success();

    let out = shoplog()
        .args(["--db", &db_path, "pending", "--worker", "E1", "--json"])
        .output()
        .expect("run pending");
    assert!(out.status.success());
    let pending: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let ids: Vec<&str> = pending
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["T2"]);
}

#[test]
fn test_board_shows_who_is_working() {
    let db_path = setup_test_db("cli_board");
    init_db_with_data(&db_path);

    shoplog()
        .args(["--db", &db_path, "board"])
        .assert()
        .success()
        .stdout(contains("Nobody is working"));

    shoplog()
        .args(["--db", &db_path, "start", "T3", "--worker", "E2"])
        .assert()
        .success();

    shoplog()
        .args(["--db", &db_path, "board"])
        .assert()
        .success()
        .stdout(contains("Marco").and(contains("T3")));
}

#[test]
fn test_cost_with_rate_and_fallback() {
    let db_path = setup_test_db("cli_cost");
    init_db_with_data(&db_path);

    shoplog()
        .args(["--db", &db_path, "cost", "WO1"])
        .assert()
        .success()
        .stdout(
            contains("No time logged")
                .and(contains("Labor: 0.00"))
                .and(contains("-0.00").not()),
        );

    shoplog()
        .args(["--db", &db_path, "start", "T1", "--worker", "E1"])
        .assert()
        .success();

    // No calculation recorded for this month: default rate, flagged.
    shoplog()
        .args(["--db", &db_path, "cost", "WO1"])
        .assert()
        .success()
        .stdout(contains("default hourly rate used"));

    shoplog()
        .args(["--db", &db_path, "cost", "WO1", "--income", "100", "--parts", "10", "--json"])
        .assert()
        .success()
        .stdout(contains("\"profitability\"").and(contains("\"margin\"")));

    shoplog()
        .args(["--db", &db_path, "cost", "WO1", "--income", "-5"])
        .assert()
        .failure();
}

#[test]
fn test_rate_set_validates_period() {
    let db_path = setup_test_db("cli_rate");
    init_db_with_data(&db_path);

    shoplog()
        .args(["--db", &db_path, "rate", "set", "2025-03", "20"])
        .assert()
        .success();

    shoplog()
        .args(["--db", &db_path, "rate", "set", "March", "20"])
        .assert()
        .failure()
        .stderr(contains("Invalid period"));

    shoplog()
        .args(["--db", &db_path, "rate", "list"])
        .assert()
        .success()
        .stdout(contains("2025-03").and(contains("20.00")));
}

#[test]
fn test_unknown_worker_is_reported() {
    let db_path = setup_test_db("cli_unknown");
    init_db_with_data(&db_path);

    shoplog()
        .args(["--db", &db_path, "active", "--worker", "NOBODY"])
        .assert()
        .failure()
        .stderr(contains("worker NOBODY"));

    shoplog()
        .args(["--db", &db_path, "pending", "--worker", "NOBODY"])
        .assert()
        .failure()
        .stderr(contains("worker NOBODY"));
}
