use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bolt_engine::{
    db_types::User,
    traits::UserManagementError,
};

use super::{
    helpers::send_request,
    mocks::{MockUserManager, MockWorkspace},
};
use crate::{
    config::ServerOptions,
    data_objects::SlashCommand,
    errors::SlackApiError,
    integrations::slack::{SlackMember, SlackProfile},
    routes::{AddUserRoute, ADD_USER_USAGE},
};

const ADMIN: &str = "UADMIN";

fn command(user_id: &str, text: &str) -> SlashCommand {
    SlashCommand { command: "/add-user".into(), text: text.into(), user_id: user_id.into(), channel_id: "D1".into() }
}

fn jane() -> SlackMember {
    SlackMember {
        id: "U123".into(),
        name: "jane".into(),
        deleted: false,
        tz: "Asia/Jerusalem".into(),
        profile: SlackProfile {
            real_name: "Jane Q. Doe".into(),
            real_name_normalized: "Jane Q. Doe".into(),
            email: "jane@example.com".into(),
            phone: "050-1234567".into(),
        },
    }
}

fn configure(db: MockUserManager, slack: MockWorkspace) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let options = ServerOptions { admin_user_ids: vec![ADMIN.to_string()] };
        cfg.service(AddUserRoute::<MockUserManager, MockWorkspace>::new())
            .app_data(web::Data::new(db))
            .app_data(web::Data::new(slack))
            .app_data(web::Data::new(options));
    }
}

async fn run(cmd: SlashCommand, db: MockUserManager, slack: MockWorkspace) -> (StatusCode, String) {
    let req = TestRequest::post().uri("/add-user").set_form(&cmd);
    send_request(req, configure(db, slack)).await
}

#[actix_web::test]
async fn only_admins_may_add_users() {
    let _ = env_logger::try_init().ok();
    let mut db = MockUserManager::new();
    db.expect_add_user().never();
    let mut slack = MockWorkspace::new();
    slack.expect_find_member_by_handle().never();
    let (status, _) = run(command("U999", r#""Jane Doe" @jane"#), db, slack).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn unknown_commands_are_rejected() {
    let mut cmd = command(ADMIN, r#""Jane Doe" @jane"#);
    cmd.command = "/remove-user".into();
    let (status, _) = run(cmd, MockUserManager::new(), MockWorkspace::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn malformed_text_gets_the_usage() {
    for text in ["", "jane", r#""Jane Doe" jane"#, r#""Jane Doe" @jane extra"#, r#""Jane Doe @jane"#] {
        let mut slack = MockWorkspace::new();
        slack.expect_find_member_by_handle().never();
        let (status, body) = run(command(ADMIN, text), MockUserManager::new(), slack).await;
        assert_eq!(status, StatusCode::OK, "{text}");
        assert_eq!(body, ADD_USER_USAGE, "{text}");
    }
}

#[actix_web::test]
async fn unknown_handle() {
    let mut db = MockUserManager::new();
    db.expect_add_user().never();
    let mut slack = MockWorkspace::new();
    slack.expect_find_member_by_handle().withf(|handle| handle == "nobody").times(1).returning(|_| Ok(None));
    let (status, body) = run(command(ADMIN, r#""No Body" @nobody"#), db, slack).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"user "nobody" not found"#);
}

#[actix_web::test]
async fn slack_failures_are_server_errors() {
    let mut slack = MockWorkspace::new();
    slack
        .expect_find_member_by_handle()
        .returning(|_| Err(SlackApiError::Api { method: "users.list".into(), error: "ratelimited".into() }));
    let (status, body) = run(command(ADMIN, r#""Jane Doe" @jane"#), MockUserManager::new(), slack).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("ratelimited"));
}

#[actix_web::test]
async fn user_is_added_under_the_given_name() {
    let mut db = MockUserManager::new();
    db.expect_add_user()
        .withf(|u| {
            u.full_name == "Jane Doe"
                && u.transport_id == "U123"
                && u.email == "jane@example.com"
                && u.phone == "050-1234567"
                && u.timezone == "Asia/Jerusalem"
        })
        .times(1)
        .returning(|u| {
            Ok(User {
                id: "1".into(),
                full_name: u.full_name,
                email: u.email,
                phone: u.phone,
                timezone: u.timezone,
                transport_id: u.transport_id,
                payment_preferences: vec![],
            })
        });
    let mut slack = MockWorkspace::new();
    slack.expect_find_member_by_handle().withf(|handle| handle == "jane").returning(|_| Ok(Some(jane())));
    let (status, body) = run(command(ADMIN, r#""Jane Doe" @jane"#), db, slack).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"OK, got you. I added <@U123> as "Jane Doe""#);
}

#[actix_web::test]
async fn storage_errors_are_reported_to_the_admin() {
    let mut db = MockUserManager::new();
    db.expect_add_user().returning(|u| Err(UserManagementError::DuplicateUser(u.transport_id)));
    let mut slack = MockWorkspace::new();
    slack.expect_find_member_by_handle().returning(|_| Ok(Some(jane())));
    let (status, body) = run(command(ADMIN, r#""Jane Doe" @jane"#), db, slack).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Error adding user: A user with transport id U123 already exists");
}
