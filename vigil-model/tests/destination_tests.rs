use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use vigil_model::{
    Chime, CustomWebhook, Destination, DestinationConfig, DestinationType, Email, ModelError,
    Slack, Sns,
};
use vigil_types::{Readable, User, Writeable};

fn slack(name: &str) -> Destination {
    Destination::new(
        name,
        DestinationConfig::Slack(Slack {
            url: "https://hooks.slack.com/services/x".into(),
        }),
    )
}

// ── Type ──

#[test]
fn destination_type_strings() {
    assert_eq!(DestinationType::CustomWebhook.as_str(), "custom_webhook");
    assert_eq!("sns".parse::<DestinationType>().unwrap(), DestinationType::Sns);
    assert!("pager".parse::<DestinationType>().is_err());
    for t in DestinationType::ALL {
        assert_eq!(t.to_string().parse::<DestinationType>().unwrap(), t);
    }
}

#[test]
fn type_follows_config() {
    assert_eq!(slack("s").destination_type(), DestinationType::Slack);
    let d = Destination::new("t", DestinationConfig::TestAction);
    assert_eq!(d.destination_type(), DestinationType::TestAction);
}

// ── JSON ──

#[test]
fn serializes_with_type_and_config_key() {
    let value = serde_json::to_value(slack("ops")).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "slack",
            "name": "ops",
            "schema_version": 0,
            "slack": { "url": "https://hooks.slack.com/services/x" }
        })
    );
}

#[test]
fn parses_old_document_without_version_or_user() {
    let value = json!({
        "type": "chime",
        "name": "legacy",
        "chime": { "url": "https://chime.example/hook" },
        "some_future_field": true
    });
    let dest: Destination = serde_json::from_value(value).unwrap();
    assert_eq!(dest.schema_version, 0);
    assert!(dest.user.is_none());
    assert_eq!(
        dest.config,
        DestinationConfig::Chime(Chime {
            url: "https://chime.example/hook".into()
        })
    );
}

#[test]
fn missing_config_object_is_rejected() {
    let value = json!({ "type": "slack", "name": "broken" });
    assert!(serde_json::from_value::<Destination>(value).is_err());
}

#[test]
fn webhook_defaults() {
    let value = json!({
        "type": "custom_webhook",
        "name": "hook",
        "custom_webhook": { "host": "example.com" }
    });
    let dest: Destination = serde_json::from_value(value).unwrap();
    match dest.config {
        DestinationConfig::CustomWebhook(w) => {
            assert_eq!(w.port, -1);
            assert!(w.url.is_none());
            assert!(w.query_params.is_empty());
        }
        other => panic!("unexpected config {other:?}"),
    }
}

// ── Validation ──

#[test]
fn blank_name_fails_validation() {
    let err = slack("  ").validate().unwrap_err();
    assert!(matches!(err, ModelError::Validation(_)));
}

#[test]
fn per_type_required_fields() {
    let empty_url = Destination::new("c", DestinationConfig::Chime(Chime { url: String::new() }));
    assert!(empty_url.validate().is_err());

    let hookless = Destination::new(
        "w",
        DestinationConfig::CustomWebhook(CustomWebhook {
            url: None,
            host: None,
            port: -1,
            path: None,
            query_params: BTreeMap::new(),
            header_params: BTreeMap::new(),
        }),
    );
    assert!(hookless.validate().is_err());

    let no_recipients = Destination::new(
        "e",
        DestinationConfig::Email(Email {
            email_account_id: "acct".into(),
            recipients: vec![],
        }),
    );
    assert!(no_recipients.validate().is_err());

    let sns = Destination::new(
        "n",
        DestinationConfig::Sns(Sns {
            topic_arn: "arn:aws:sns:us-east-1:1:t".into(),
            role_arn: None,
        }),
    );
    assert!(sns.validate().is_ok());
    assert!(slack("ok").validate().is_ok());
}

// ── Stream ──

#[test]
fn stream_round_trip_keeps_webhook_maps() {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    let mut dest = Destination::new(
        "hook",
        DestinationConfig::CustomWebhook(CustomWebhook {
            url: Some("https://example.com/alert".into()),
            host: None,
            port: 8443,
            path: Some("/alert".into()),
            query_params: BTreeMap::new(),
            header_params: headers,
        }),
    );
    dest.user = Some(User::new("alice", vec!["ops".into()], vec![], vec![]));
    dest.last_update_time = Some(1_700_000_000_000);

    let decoded = Destination::from_bytes(&dest.to_bytes()).unwrap();
    assert_eq!(decoded, dest);
}
