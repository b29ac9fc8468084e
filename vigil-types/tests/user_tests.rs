use vigil_types::{Caller, User, ALL_ACCESS_ROLE};

fn user(name: &str, backend_roles: &[&str]) -> User {
    User::new(
        name,
        backend_roles.iter().map(|s| s.to_string()).collect(),
        vec![],
        vec![],
    )
}

#[test]
fn anonymous_user_is_empty() {
    let anon = User::anonymous();
    assert!(anon.is_anonymous());
    assert!(anon.name.is_empty());
    assert!(!user("alice", &[]).is_anonymous());
}

#[test]
fn shares_backend_role() {
    let a = user("a", &["ops", "eng"]);
    let b = user("b", &["eng"]);
    let c = user("c", &["finance"]);
    assert!(a.shares_backend_role_with(&b));
    assert!(b.shares_backend_role_with(&a));
    assert!(!a.shares_backend_role_with(&c));
    assert!(!user("d", &[]).shares_backend_role_with(&a));
}

#[test]
fn admin_detection() {
    let mut admin = user("root", &[]);
    admin.roles.push(ALL_ACCESS_ROLE.to_string());
    assert!(admin.is_admin());
    assert!(!user("plain", &["ops"]).is_admin());
}

#[test]
fn caller_owner_stamp() {
    let alice = user("alice", &["ops"]);
    assert_eq!(Caller::Authenticated(alice.clone()).owner(), alice);
    assert_eq!(Caller::SecurityDisabled.owner(), User::anonymous());
    assert!(Caller::SecurityDisabled.user().is_none());
    assert_eq!(Caller::Authenticated(alice).name(), "alice");
}

#[test]
fn user_deserializes_with_missing_role_lists() {
    let u: User = serde_json::from_str(r#"{"name":"bob"}"#).unwrap();
    assert_eq!(u.name, "bob");
    assert!(u.backend_roles.is_empty());
    assert!(u.custom_attribute_names.is_empty());
}
