use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;
use vigil_alerting::settings::parse_time_value;
use vigil_alerting::{AlertingSettings, BackoffPolicy, ClusterSettings, SettingsError};

// ── Defaults ────────────────────────────────────────────────────

#[test]
fn defaults() {
    let s = AlertingSettings::default();
    assert_eq!(s.index_timeout, Duration::from_secs(60));
    assert_eq!(s.request_timeout, Duration::from_secs(10));
    assert!(!s.filter_by_backend_roles);
    assert_eq!(s.alert_backoff, BackoffPolicy::new(Duration::from_millis(50), 2));
    assert_eq!(
        s.move_alerts_backoff,
        BackoffPolicy::new(Duration::from_millis(250), 3)
    );
    assert!(s.destination_allow_list.contains(&"slack".to_string()));
    assert!(s.destination_allow_list.contains(&"test_action".to_string()));
    assert_eq!(s.monitor_allow_list.len(), 2);
}

#[test]
fn backoff_doubles() {
    let delays: Vec<_> = BackoffPolicy::new(Duration::from_millis(250), 3).delays().collect();
    assert_eq!(
        delays,
        vec![
            Duration::from_millis(250),
            Duration::from_millis(500),
            Duration::from_millis(1000)
        ]
    );
    assert_eq!(BackoffPolicy::new(Duration::from_secs(1), 0).delays().count(), 0);
}

// ── Parsing ─────────────────────────────────────────────────────

#[test]
fn time_values() {
    assert_eq!(parse_time_value("500ms").unwrap(), Duration::from_millis(500));
    assert_eq!(parse_time_value("10s").unwrap(), Duration::from_secs(10));
    assert_eq!(parse_time_value("5m").unwrap(), Duration::from_secs(300));
    assert_eq!(parse_time_value("2h").unwrap(), Duration::from_secs(7200));
    assert_eq!(parse_time_value("1d").unwrap(), Duration::from_secs(86_400));
    assert!(parse_time_value("10").is_err());
    assert!(parse_time_value("ten s").is_err());
    assert!(parse_time_value("3w").is_err());
}

#[test]
fn flat_keys() {
    let s = AlertingSettings::from_toml_str(
        r#"
        "plugins.alerting.index_timeout" = "30s"
        "plugins.alerting.filter_by_backend_roles" = true
        "plugins.alerting.destination.allow_list" = ["slack", "chime"]
        "#,
    )
    .unwrap();
    assert_eq!(s.index_timeout, Duration::from_secs(30));
    assert!(s.filter_by_backend_roles);
    assert_eq!(s.destination_allow_list, vec!["slack", "chime"]);
    assert_eq!(s.request_timeout, Duration::from_secs(10));
}

#[test]
fn nested_tables() {
    let s = AlertingSettings::from_toml_str(
        r#"
        [plugins.alerting]
        request_timeout = "2s"
        alert_backoff_millis = 100
        alert_backoff_count = 4

        [plugins.alerting.monitor]
        allow_list = ["query_level_monitor"]
        "#,
    )
    .unwrap();
    assert_eq!(s.request_timeout, Duration::from_secs(2));
    assert_eq!(s.alert_backoff, BackoffPolicy::new(Duration::from_millis(100), 4));
    assert_eq!(s.monitor_allow_list, vec!["query_level_monitor"]);
}

#[test]
fn legacy_keys_fall_back() {
    let s = AlertingSettings::from_toml_str(
        r#"
        [opendistro.alerting]
        index_timeout = "15s"
        filter_by_backend_roles = true
        move_alerts_backoff_count = 5
        "#,
    )
    .unwrap();
    assert_eq!(s.index_timeout, Duration::from_secs(15));
    assert!(s.filter_by_backend_roles);
    assert_eq!(s.move_alerts_backoff.count, 5);
}

#[test]
fn new_key_wins_over_legacy() {
    let s = AlertingSettings::from_toml_str(
        r#"
        "opendistro.alerting.index_timeout" = "15s"
        "plugins.alerting.index_timeout" = "45s"
        "#,
    )
    .unwrap();
    assert_eq!(s.index_timeout, Duration::from_secs(45));
}

#[test]
fn invalid_values() {
    let err = AlertingSettings::from_toml_str(r#""plugins.alerting.index_timeout" = "0s""#)
        .unwrap_err();
    assert!(matches!(err, SettingsError::InvalidValue { ref key, .. } if key == "plugins.alerting.index_timeout"));

    let err = AlertingSettings::from_toml_str(r#""plugins.alerting.filter_by_backend_roles" = "yes""#)
        .unwrap_err();
    assert!(matches!(err, SettingsError::InvalidValue { .. }));

    let err = AlertingSettings::from_toml_str("not = [valid").unwrap_err();
    assert!(matches!(err, SettingsError::Toml(_)));
}

// ── Files ───────────────────────────────────────────────────────

#[test]
fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let s = AlertingSettings::load_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(s, AlertingSettings::default());
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "\"plugins.alerting.request_timeout\" = \"3s\"").unwrap();
    let s = AlertingSettings::load_from(file.path()).unwrap();
    assert_eq!(s.request_timeout, Duration::from_secs(3));
}

// ── Hot reload ──────────────────────────────────────────────────

#[tokio::test]
async fn subscribers_see_updates() {
    let cluster = ClusterSettings::default();
    let mut rx = cluster.subscribe();

    cluster.update(|s| s.filter_by_backend_roles = true);
    rx.changed().await.unwrap();
    assert!(rx.borrow().filter_by_backend_roles);

    cluster
        .reload_from_toml(r#""plugins.alerting.index_timeout" = "5s""#)
        .unwrap();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().index_timeout, Duration::from_secs(5));
}

#[test]
fn reload_keeps_keys_it_does_not_name() {
    let cluster = ClusterSettings::default();
    cluster.update(|s| {
        s.filter_by_backend_roles = true;
        s.request_timeout = Duration::from_secs(9);
    });

    cluster
        .reload_from_toml(r#""plugins.alerting.index_timeout" = "5s""#)
        .unwrap();
    let current = cluster.current();
    assert_eq!(current.index_timeout, Duration::from_secs(5));
    assert_eq!(current.request_timeout, Duration::from_secs(9));
    assert!(current.filter_by_backend_roles);
}

#[test]
fn failed_reload_keeps_current() {
    let cluster = ClusterSettings::default();
    cluster.update(|s| s.index_timeout = Duration::from_secs(7));
    assert!(cluster.reload_from_toml(r#""plugins.alerting.index_timeout" = -1"#).is_err());
    assert_eq!(cluster.current().index_timeout, Duration::from_secs(7));
}
