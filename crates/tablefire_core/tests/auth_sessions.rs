mod common;

use common::{demo_email, seeded_floor, sign_in};
use tablefire_core::auth::AuthError;
use tablefire_core::model::staff::Role;
use tablefire_core::provision::DEMO_PASSWORD;
use tablefire_core::service::admin_service::AdminService;
use tablefire_core::service::auth_service::{AuthService, NewStaff};
use tablefire_core::service::ServiceError;

fn new_server(email: &str, password: &str) -> NewStaff {
    NewStaff {
        email: email.to_string(),
        password: password.to_string(),
        full_name: "Nila Raman".to_string(),
        role: Role::Server,
    }
}

#[test]
fn sign_in_resolves_session_and_sign_out_ends_it() {
    let floor = seeded_floor();
    let auth = AuthService::new(&floor.conn, &floor.feed);

    let session = auth
        .sign_in("  SERVER@bhairuha.local ", DEMO_PASSWORD)
        .unwrap();
    assert_eq!(session.role(), Role::Server);
    assert_eq!(session.staff.full_name, "Arsath Malik");

    let resolved = auth.current_user(&session.token).unwrap();
    assert_eq!(resolved.staff_id(), session.staff_id());

    assert!(auth.sign_out(&session.token).unwrap());
    assert!(!auth.sign_out(&session.token).unwrap());
    assert!(matches!(
        auth.current_user(&session.token),
        Err(ServiceError::Auth(AuthError::InvalidSession))
    ));
}

#[test]
fn wrong_password_and_unknown_email_fail_identically() {
    let floor = seeded_floor();
    let auth = AuthService::new(&floor.conn, &floor.feed);

    let wrong_password = auth.sign_in(demo_email(Role::Admin), "not-the-password");
    let unknown_email = auth.sign_in("ghost@bhairuha.local", DEMO_PASSWORD);

    assert!(matches!(
        wrong_password,
        Err(ServiceError::Auth(AuthError::InvalidCredentials))
    ));
    assert!(matches!(
        unknown_email,
        Err(ServiceError::Auth(AuthError::InvalidCredentials))
    ));
}

#[test]
fn expired_sessions_do_not_resolve() {
    let floor = seeded_floor();
    let session = sign_in(&floor, Role::Kitchen);
    floor
        .conn
        .execute(
            "UPDATE sessions SET expires_at = 0 WHERE token = ?1;",
            [session.token.as_str()],
        )
        .unwrap();

    let auth = AuthService::new(&floor.conn, &floor.feed);
    assert!(matches!(
        auth.current_user(&session.token),
        Err(ServiceError::Auth(AuthError::InvalidSession))
    ));
}

#[test]
fn only_admins_sign_up_staff() {
    let floor = seeded_floor();
    let auth = AuthService::new(&floor.conn, &floor.feed);
    let admin = sign_in(&floor, Role::Admin);
    let server = sign_in(&floor, Role::Server);

    let denied = auth.sign_up(&server, &new_server("nila@bhairuha.local", "longenough"));
    assert!(matches!(
        denied,
        Err(ServiceError::Auth(AuthError::PermissionDenied { .. }))
    ));

    let created = auth
        .sign_up(&admin, &new_server("Nila@Bhairuha.local", "longenough"))
        .unwrap();
    assert_eq!(created.email, "nila@bhairuha.local");
    assert!(created.is_active);

    let session = auth.sign_in("nila@bhairuha.local", "longenough").unwrap();
    assert_eq!(session.role(), Role::Server);
}

#[test]
fn sign_up_rejects_weak_passwords_and_taken_emails() {
    let floor = seeded_floor();
    let auth = AuthService::new(&floor.conn, &floor.feed);
    let admin = sign_in(&floor, Role::Admin);

    assert!(matches!(
        auth.sign_up(&admin, &new_server("short@bhairuha.local", "1234567")),
        Err(ServiceError::Auth(AuthError::WeakPassword))
    ));
    assert!(matches!(
        auth.sign_up(&admin, &new_server(demo_email(Role::Server), "longenough")),
        Err(ServiceError::Auth(AuthError::EmailTaken(_)))
    ));
}

#[test]
fn deactivated_staff_lose_their_sessions_and_cannot_sign_in() {
    let floor = seeded_floor();
    let auth = AuthService::new(&floor.conn, &floor.feed);
    let admin = sign_in(&floor, Role::Admin);
    let kitchen = sign_in(&floor, Role::Kitchen);

    AdminService::new(&floor.conn, &floor.feed, &admin)
        .set_staff_active(kitchen.staff_id(), false)
        .unwrap();

    assert!(matches!(
        auth.current_user(&kitchen.token),
        Err(ServiceError::Auth(AuthError::InvalidSession))
    ));
    assert!(matches!(
        auth.sign_in(demo_email(Role::Kitchen), DEMO_PASSWORD),
        Err(ServiceError::Auth(AuthError::InactiveAccount))
    ));
}

#[test]
fn sign_in_is_audited() {
    let floor = seeded_floor();
    let admin = sign_in(&floor, Role::Admin);

    let entries = AdminService::new(&floor.conn, &floor.feed, &admin)
        .audit_log(10)
        .unwrap();
    assert!(entries
        .iter()
        .any(|entry| entry.action == "sign_in" && entry.user_id == admin.staff_id()));
}
