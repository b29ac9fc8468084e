use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use vigil_alerting::action::{
    GetMonitorRequest, GetMonitorResponse, IndexDestinationRequest, IndexDestinationResponse,
    IndexMonitorRequest,
};
use vigil_model::{
    Chime, Destination, DestinationConfig, IntervalUnit, Monitor, MonitorType, Schedule, Sns,
};
use vigil_types::{
    JobId, PrimaryTerm, Readable, RefreshPolicy, RestMethod, RestStatus, SeqNo, StreamError,
    User, Writeable,
};

fn refresh_policy() -> impl Strategy<Value = RefreshPolicy> {
    prop_oneof![
        Just(RefreshPolicy::None),
        Just(RefreshPolicy::Immediate),
        Just(RefreshPolicy::WaitUntil),
    ]
}

fn method() -> impl Strategy<Value = RestMethod> {
    prop_oneof![Just(RestMethod::Post), Just(RestMethod::Put)]
}

fn owner() -> impl Strategy<Value = Option<User>> {
    proptest::option::of(
        ("[a-z]{0,8}", proptest::collection::vec("[a-z]{1,6}", 0..3)).prop_map(|(name, roles)| {
            User::new(name, roles, vec![], vec![])
        }),
    )
}

fn destination() -> impl Strategy<Value = Destination> {
    let config = prop_oneof![
        "https://[a-z]{1,10}\\.example".prop_map(|url| DestinationConfig::Chime(Chime { url })),
        ("arn:[a-z0-9:]{1,20}", proptest::option::of("arn:[a-z]{1,8}")).prop_map(
            |(topic_arn, role_arn)| DestinationConfig::Sns(Sns { topic_arn, role_arn })
        ),
        Just(DestinationConfig::TestAction),
    ];
    ("\\PC{0,16}", config, owner(), any::<i32>(), proptest::option::of(any::<i64>())).prop_map(
        |(name, config, user, schema_version, last_update_time)| {
            let mut d = Destination::new(name, config);
            d.user = user;
            d.schema_version = schema_version;
            d.last_update_time = last_update_time;
            d
        },
    )
}

fn destination_request() -> impl Strategy<Value = IndexDestinationRequest> {
    (
        proptest::option::of("[A-Za-z0-9_-]{1,20}"),
        any::<i64>(),
        any::<i64>(),
        refresh_policy(),
        method(),
        destination(),
    )
        .prop_map(|(id, seq_no, primary_term, refresh_policy, method, job)| {
            IndexDestinationRequest {
                id: id.map(|s| JobId::parse(&s).unwrap()),
                seq_no: SeqNo::new(seq_no),
                primary_term: PrimaryTerm::new(primary_term),
                refresh_policy,
                method,
                job,
            }
        })
}

proptest! {
    #[test]
    fn destination_request_round_trips(request in destination_request()) {
        let decoded = IndexDestinationRequest::from_bytes(&request.to_bytes()).unwrap();
        prop_assert_eq!(decoded, request);
    }

    #[test]
    fn truncated_request_is_rejected(request in destination_request(), cut in 1usize..8) {
        let bytes = request.to_bytes();
        let cut = cut.min(bytes.len());
        prop_assert!(IndexDestinationRequest::from_bytes(&bytes[..bytes.len() - cut]).is_err());
    }
}

#[test]
fn absent_id_survives_round_trip() {
    let request = IndexDestinationRequest::create(Destination::new(
        "d",
        DestinationConfig::TestAction,
    ));
    let decoded = IndexDestinationRequest::from_bytes(&request.to_bytes()).unwrap();
    assert!(decoded.id.is_none());
    assert_eq!(decoded.seq_no, SeqNo::UNASSIGNED);
    assert_eq!(decoded.primary_term, PrimaryTerm::UNASSIGNED);
    assert_eq!(decoded.refresh_policy, RefreshPolicy::Immediate);
}

#[test]
fn monitor_request_round_trip() {
    let mut m = Monitor::new(
        "cpu",
        MonitorType::BucketLevelMonitor,
        Schedule::Period {
            interval: 5,
            unit: IntervalUnit::Hours,
        },
    );
    m.inputs = vec![json!({ "search": { "indices": ["metrics-*"], "query": { "size": 0 } } })];
    m.triggers = vec![json!({ "bucket_level_trigger": { "name": "hot" } })];
    let request = IndexMonitorRequest::update(
        JobId::parse("m-1").unwrap(),
        SeqNo::new(4),
        PrimaryTerm::new(2),
        m,
    )
    .with_refresh_policy(RefreshPolicy::None);

    let decoded = IndexMonitorRequest::from_bytes(&request.to_bytes()).unwrap();
    assert_eq!(decoded, request);
}

#[test]
fn responses_round_trip() {
    let response = IndexDestinationResponse {
        id: JobId::generate(),
        version: 3,
        seq_no: SeqNo::new(9),
        primary_term: PrimaryTerm::new(1),
        status: RestStatus::Created,
        job: Destination::new("d", DestinationConfig::TestAction),
    };
    assert_eq!(
        IndexDestinationResponse::from_bytes(&response.to_bytes()).unwrap(),
        response
    );

    let get = GetMonitorResponse {
        id: JobId::parse("m").unwrap(),
        version: 1,
        seq_no: SeqNo::new(0),
        primary_term: PrimaryTerm::new(1),
        status: RestStatus::Ok,
        monitor: None,
    };
    assert_eq!(GetMonitorResponse::from_bytes(&get.to_bytes()).unwrap(), get);

    let mut request = GetMonitorRequest::new(JobId::parse("m").unwrap());
    request.version = Some(2);
    assert_eq!(GetMonitorRequest::from_bytes(&request.to_bytes()).unwrap(), request);
}

#[test]
fn trailing_bytes_are_rejected() {
    let request = GetMonitorRequest::head(JobId::parse("m").unwrap());
    let mut bytes = request.to_bytes();
    bytes.push(0);
    assert!(matches!(
        GetMonitorRequest::from_bytes(&bytes),
        Err(StreamError::TrailingBytes(1))
    ));
}

#[test]
fn unknown_ordinal_is_rejected() {
    let request = GetMonitorRequest::new(JobId::parse("m").unwrap());
    let mut bytes = request.to_bytes();
    // method ordinal sits right before the trailing fetch_source flag
    let at = bytes.len() - 2;
    bytes[at] = 42;
    assert!(matches!(
        GetMonitorRequest::from_bytes(&bytes),
        Err(StreamError::InvalidOrdinal { ordinal: 42, .. })
    ));
}

#[test]
fn request_validation() {
    let mut request = IndexDestinationRequest::create(Destination::new(
        "d",
        DestinationConfig::TestAction,
    ));
    assert!(request.validate().is_ok());
    request.method = RestMethod::Put;
    assert_eq!(
        request.validate().unwrap_err().to_string(),
        "bad request: Missing destination ID"
    );

    let mut monitor_request = IndexMonitorRequest::create(Monitor::new(
        "m",
        MonitorType::QueryLevelMonitor,
        Schedule::Cron {
            expression: "0 0 * * *".into(),
            timezone: "UTC".into(),
        },
    ));
    monitor_request.method = RestMethod::Put;
    assert_eq!(
        monitor_request.validate().unwrap_err().to_string(),
        "bad request: Missing monitor ID"
    );
}

#[test]
fn json_form_for_cli_output() {
    let response = IndexDestinationResponse {
        id: JobId::parse("abc").unwrap(),
        version: 1,
        seq_no: SeqNo::new(0),
        primary_term: PrimaryTerm::new(1),
        status: RestStatus::Created,
        job: Destination::new("d", DestinationConfig::TestAction),
    };
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["id"], json!("abc"));
    assert_eq!(value["status"], json!("CREATED"));
    assert_eq!(value["job"]["type"], json!("test_action"));
}
