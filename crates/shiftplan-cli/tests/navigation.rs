//! Binary tests for guarded navigation and session expiry.


use assert_cmd::cargo::cargo_bin_cmd;
use fixtures::{TOKEN, api_url, can_bind_localhost, mount_me_ok, mount_periods, read_state, store_token};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_open_without_session_lands_on_login() {
    let home = TempDir::new().unwrap();

    // No stored token: no request is made, so any URL will do.
    cargo_bin_cmd!("shiftplan")
        .env("SHIFTPLAN_HOME", home.path())
        .env("SHIFTPLAN_API_URL", "http://127.0.0.1:9/api")
        .args(["open", "#/plans/3"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Redirected to #/login"))
        .stdout(predicate::str::contains("Not logged in"));
}

#[tokio::test]
async fn test_open_plan_detail() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    store_token(home.path(), TOKEN);
    let server = MockServer::start().await;
    mount_me_ok(&server).await;
    mount_periods(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/plans/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3,
            "name": "Week 14 rota",
            "planningPeriodId": 11,
            "description": "Night shifts doubled"
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("shiftplan")
        .env("SHIFTPLAN_HOME", home.path())
        .env("SHIFTPLAN_API_URL", api_url(&server))
        .args(["open", "#/plans/3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan 3: Week 14 rota"))
        .stdout(predicate::str::contains("Night shifts doubled"));
}

#[tokio::test]
async fn test_open_login_when_signed_in_redirects_home() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    store_token(home.path(), TOKEN);
    let server = MockServer::start().await;
    mount_me_ok(&server).await;
    mount_periods(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    cargo_bin_cmd!("shiftplan")
        .env("SHIFTPLAN_HOME", home.path())
        .env("SHIFTPLAN_API_URL", api_url(&server))
        .args(["open", "login"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Redirected to #/plans"))
        .stdout(predicate::str::contains("No plans found."));
}

#[tokio::test]
async fn test_periods_marks_first_as_active() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    store_token(home.path(), TOKEN);
    let server = MockServer::start().await;
    mount_me_ok(&server).await;
    mount_periods(&server).await;

    let output = cargo_bin_cmd!("shiftplan")
        .env("SHIFTPLAN_HOME", home.path())
        .env("SHIFTPLAN_API_URL", api_url(&server))
        .arg("periods")
        .output()
        .unwrap();

    assert!(output.status.success(), "Command failed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let active_line = stdout.lines().find(|line| line.contains('*')).unwrap();
    assert!(active_line.contains("Spring 2026"));
    assert!(stdout.contains("Summer 2026"));
}

#[tokio::test]
async fn test_periods_rejects_unknown_selection() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    store_token(home.path(), TOKEN);
    let server = MockServer::start().await;
    mount_me_ok(&server).await;
    mount_periods(&server).await;

    cargo_bin_cmd!("shiftplan")
        .env("SHIFTPLAN_HOME", home.path())
        .env("SHIFTPLAN_API_URL", api_url(&server))
        .args(["periods", "--select", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown planning period 99"));
}

#[tokio::test]
async fn test_plans_list_uses_active_period() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    store_token(home.path(), TOKEN);
    let server = MockServer::start().await;
    mount_me_ok(&server).await;
    mount_periods(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .and(query_param("planningPeriodId", "11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 3, "name": "Week 14 rota", "planningPeriodId": 11 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("shiftplan")
        .env("SHIFTPLAN_HOME", home.path())
        .env("SHIFTPLAN_API_URL", api_url(&server))
        .args(["plans", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Week 14 rota"));
}

#[tokio::test]
async fn test_unauthorized_response_expires_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    store_token(home.path(), TOKEN);
    let server = MockServer::start().await;
    mount_me_ok(&server).await;
    mount_periods(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/api/plans/3"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("shiftplan")
        .env("SHIFTPLAN_HOME", home.path())
        .env("SHIFTPLAN_API_URL", api_url(&server))
        .args(["plans", "delete", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session expired. Run `shiftplan login`."));

    assert!(read_state(home.path()).get("access_token").is_none());
}
