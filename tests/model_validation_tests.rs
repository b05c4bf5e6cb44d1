use chrono::Utc;
use serde_json::json;
use user_gate::models::{
    CreateUserRequest, Role, UpdateUserRequest, User, UserFilter, UserProfile,
};
use uuid::Uuid;

fn sample_user() -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: "Jane".to_string(),
        email: "jane@example.com".to_string(),
        role: Role::Admin,
        password_hash: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
        must_reset_password: false,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_role_wire_format_is_lowercase() {
    assert_eq!(serde_json::to_value(Role::User).unwrap(), json!("user"));
    assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
    assert_eq!(serde_json::from_value::<Role>(json!("admin")).unwrap(), Role::Admin);

    // Closed set: near misses do not parse.
    assert!(serde_json::from_value::<Role>(json!("Admin")).is_err());
    assert!(serde_json::from_value::<Role>(json!("superuser")).is_err());

    assert_eq!(Role::default(), Role::User);
    assert_eq!(Role::Admin.to_string(), "admin");
}

#[test]
fn test_user_profile_drops_the_hash() {
    let user = sample_user();
    let hash = user.password_hash.clone();

    let json_output = serde_json::to_string(&UserProfile::from(user)).unwrap();

    assert!(!json_output.contains(&hash));
    assert!(!json_output.contains("password_hash"));
    assert!(json_output.contains(r#""role":"admin""#));
}

#[test]
fn test_create_request_role_defaults_to_none() {
    let req: CreateUserRequest =
        serde_json::from_value(json!({ "name": "N", "email": "n@example.com" })).unwrap();
    assert_eq!(req.role, None);
    assert_eq!(req.role.unwrap_or_default(), Role::User);
}

#[test]
fn test_update_request_ignores_identity_and_secret() {
    let req: UpdateUserRequest = serde_json::from_value(json!({
        "id": "00000000-0000-0000-0000-000000000000",
        "password": "pwned",
        "name": "New Title Only"
    }))
    .unwrap();

    assert_eq!(req.name.as_deref(), Some("New Title Only"));
    assert!(req.email.is_none());
    assert!(req.role.is_none());

    let json_output = serde_json::to_string(&req).unwrap();
    assert_eq!(json_output, r#"{"name":"New Title Only"}"#);
}

#[test]
fn test_user_filter_matching() {
    let user = sample_user();

    assert!(UserFilter::default().matches(&user));
    assert!(UserFilter::by_email("jane@example.com").matches(&user));
    assert!(!UserFilter::by_email("john@example.com").matches(&user));
    assert!(
        !UserFilter {
            role: Some(Role::User),
            ..UserFilter::default()
        }
        .matches(&user)
    );
}
