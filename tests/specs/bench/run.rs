//! `tw bench` specs

use crate::prelude::*;

#[test]
fn small_bench_reports_text_summary() {
    cli()
        .args(&["bench", "-n", "20", "--max-delay-ms", "30"])
        .passes()
        .stdout_has("executed")
        .stdout_has("latency p99")
        .stdout_has("pending");
}

#[test]
fn bench_json_counts_every_run() {
    let json = cli()
        .args(&[
            "bench",
            "-n",
            "10",
            "--max-delay-ms",
            "20",
            "--repeat",
            "2",
            "-o",
            "json",
        ])
        .passes()
        .stdout_json();

    assert_eq!(json["tasks"], 10);
    assert_eq!(json["executed"], 20);
    assert_eq!(json["pending"], 0);
}

#[test]
fn bench_cancels_everything_with_full_ratio() {
    let json = cli()
        .args(&[
            "bench",
            "-n",
            "10",
            "--max-delay-ms",
            "2000",
            "--tick-ms",
            "50",
            "--cancel-ratio",
            "1",
            "--slack-ms",
            "0",
            "-o",
            "json",
        ])
        .passes()
        .stdout_json();

    assert_eq!(json["cancelled"], 10);
    assert_eq!(json["executed"], 0);
}

#[test]
fn bench_runs_on_the_monotonic_clock() {
    let json = cli()
        .args(&[
            "bench",
            "-n",
            "10",
            "--max-delay-ms",
            "20",
            "--clock",
            "monotonic",
            "-o",
            "json",
        ])
        .passes()
        .stdout_json();

    assert_eq!(json["clock"], "monotonic");
    assert_eq!(json["executed"], 10);
}

#[test]
fn bench_clock_comes_from_the_environment() {
    let json = cli()
        .args(&["bench", "-n", "5", "--max-delay-ms", "10", "-o", "json"])
        .env("TW_CLOCK", "monotonic")
        .passes()
        .stdout_json();

    assert_eq!(json["clock"], "monotonic");
}

#[test]
fn small_worker_queue_still_runs_every_timer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tw.toml");
    std::fs::write(&path, "worker_queue_size = 16\n").unwrap();

    let json = cli()
        .args(&[
            "bench",
            "-n",
            "200",
            "--max-delay-ms",
            "5",
            "--workers",
            "1",
            "--slack-ms",
            "5000",
            "--config",
            &path.to_string_lossy(),
            "-o",
            "json",
        ])
        .passes()
        .stdout_json();

    assert_eq!(json["executed"], 200);
    assert_eq!(json["rejected"], 0);
}

#[test]
fn log_file_receives_timer_logs() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("logs/tw.log");

    cli()
        .args(&[
            "bench",
            "-n",
            "5",
            "--max-delay-ms",
            "10",
            "--log-file",
            &log.to_string_lossy(),
        ])
        .env("RUST_LOG", "info")
        .passes();

    let content = std::fs::read_to_string(&log).unwrap();
    assert!(content.contains("timer started"), "log: {}", content);
}
