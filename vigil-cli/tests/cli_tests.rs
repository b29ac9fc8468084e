use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use vigil_cli::{Cli, Command};
use vigil_types::Caller;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("vigil").chain(args.iter().copied())).unwrap()
}

fn write_file(dir: &Path, name: &str, value: &serde_json::Value) -> String {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
    path.to_string_lossy().into_owned()
}

// ── Argument parsing ──

#[test]
fn put_defaults_leave_tokens_unassigned() {
    let cli = parse(&["put-destination", "--file", "d.json"]);
    match cli.command {
        Command::PutDestination(args) => {
            assert_eq!(args.id, None);
            assert_eq!(args.if_seq_no, -2);
            assert_eq!(args.if_primary_term, 0);
            assert_eq!(args.refresh, "true");
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn global_identity_flags() {
    let cli = parse(&[
        "--user",
        "alice",
        "--backend-role",
        "ops",
        "--backend-role",
        "dev",
        "--role",
        "reader",
        "get-monitor",
        "--id",
        "m-1",
    ]);
    match cli.caller() {
        Caller::Authenticated(user) => {
            assert_eq!(user.name, "alice");
            assert_eq!(user.backend_roles, vec!["ops".to_string(), "dev".to_string()]);
            assert_eq!(user.roles, vec!["reader".to_string()]);
        }
        Caller::SecurityDisabled => panic!("expected an authenticated caller"),
    }
}

#[test]
fn security_disabled_overrides_user() {
    let cli = parse(&["--user", "alice", "--security-disabled", "get-monitor", "--id", "m"]);
    assert!(matches!(cli.caller(), Caller::SecurityDisabled));
    assert!(matches!(parse(&["get-monitor", "--id", "m"]).caller(), Caller::SecurityDisabled));
}

#[test]
fn get_monitor_flags() {
    let cli = parse(&["get-monitor", "--id", "m-1", "--head", "--version", "3"]);
    match cli.command {
        Command::GetMonitor { id, head, version } => {
            assert_eq!(id, "m-1");
            assert!(head);
            assert_eq!(version, Some(3));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn missing_file_is_a_usage_error() {
    assert!(Cli::try_parse_from(["vigil", "put-monitor"]).is_err());
}

// ── End to end ──

#[tokio::test]
async fn create_update_and_read_monitor() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("vigil.duckdb");
    let db = db.to_string_lossy().into_owned();
    let monitor = json!({
        "name": "cpu",
        "monitor_type": "query_level_monitor",
        "enabled": true,
        "schedule": { "period": { "interval": 1, "unit": "MINUTES" } },
        "inputs": [],
        "triggers": []
    });
    let file = write_file(dir.path(), "monitor.json", &monitor);

    let created = vigil_cli::run(&parse(&["--db", &db, "put-monitor", "--file", &file]))
        .await
        .unwrap();
    assert_eq!(created["status"], json!("CREATED"));
    let id = created["id"].as_str().unwrap().to_string();
    let seq_no = created["seq_no"].as_i64().unwrap().to_string();
    let term = created["primary_term"].as_i64().unwrap().to_string();

    let updated = vigil_cli::run(&parse(&[
        "--db",
        &db,
        "put-monitor",
        "--file",
        &file,
        "--id",
        &id,
        "--if-seq-no",
        &seq_no,
        "--if-primary-term",
        &term,
    ]))
    .await
    .unwrap();
    assert_eq!(updated["status"], json!("OK"));

    // the first token is stale now
    let stale = vigil_cli::run(&parse(&[
        "--db",
        &db,
        "put-monitor",
        "--file",
        &file,
        "--id",
        &id,
        "--if-seq-no",
        &seq_no,
        "--if-primary-term",
        &term,
    ]))
    .await;
    assert!(stale.is_err());

    let read = vigil_cli::run(&parse(&["--db", &db, "get-monitor", "--id", &id]))
        .await
        .unwrap();
    assert_eq!(read["monitor"]["name"], json!("cpu"));

    let head = vigil_cli::run(&parse(&["--db", &db, "get-monitor", "--id", &id, "--head"]))
        .await
        .unwrap();
    assert_eq!(head["monitor"], serde_json::Value::Null);
}

#[tokio::test]
async fn allow_list_from_settings_file() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("vigil.duckdb");
    let db = db.to_string_lossy().into_owned();
    let settings = dir.path().join("settings.toml");
    std::fs::write(
        &settings,
        "[plugins.alerting.destination]\nallow_list = [\"slack\"]\n",
    )
    .unwrap();
    let settings = settings.to_string_lossy().into_owned();
    let file = write_file(
        dir.path(),
        "destination.json",
        &json!({ "name": "hook", "type": "chime", "chime": { "url": "https://chime.example" } }),
    );

    let err = vigil_cli::run(&parse(&[
        "--db",
        &db,
        "--settings",
        &settings,
        "put-destination",
        "--file",
        &file,
    ]))
    .await
    .unwrap_err();
    assert!(err.to_string().contains("not allowed"));
}
