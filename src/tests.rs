//! Integration tests: a real server on a random port, a temp-dir SQLite
//! database, and reqwest as the client.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

const ADMIN_EMAIL: &str = "admin@church.test";
const ADMIN_PASSWORD: &str = "admin-password";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    admin_token: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let upload_dir = temp_dir.path().join("uploads");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let config = Config {
            jwt_secret: "integration-test-secret".to_string(),
            db_path,
            upload_dir,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            admin_email: None,
            admin_password: None,
        };

        // Seed the admin account directly; login happens over HTTP below
        let hash = crate::auth::hash_password(ADMIN_PASSWORD).unwrap();
        repo.create_user(ADMIN_EMAIL, &hash, "Admin", crate::models::Role::Admin)
            .await
            .expect("Failed to seed admin");

        let state = AppState {
            repo: repo.clone(),
            config: Arc::new(config),
        };

        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let client = Client::new();
        let mut fixture = TestFixture {
            client,
            base_url,
            repo,
            admin_token: String::new(),
            _temp_dir: temp_dir,
        };
        fixture.admin_token = fixture.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        fixture
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "login should succeed");
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Register a VIEWER account and return its token.
    async fn viewer_token(&self, email: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .bearer_auth(&self.admin_token)
            .json(&json!({
                "email": email,
                "password": "viewer-password",
                "name": "Viewer User",
                "role": "VIEWER",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        self.login(email, "viewer-password").await
    }

    async fn create_member(&self, name: &str, email: Option<&str>) -> Value {
        let mut body = json!({ "name": name });
        if let Some(email) = email {
            body["email"] = json!(email);
        }
        let resp = self
            .client
            .post(self.url("/api/members"))
            .bearer_auth(&self.admin_token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }

    async fn create_category(&self, name: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/categories"))
            .bearer_auth(&self.admin_token)
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }

    async fn create_contribution(
        &self,
        member_id: &str,
        category_id: &str,
        amount: f64,
        contribution_type: &str,
        date: Option<&str>,
    ) -> Value {
        let mut body = json!({
            "memberId": member_id,
            "categoryId": category_id,
            "type": contribution_type,
            "amount": amount,
            "paymentMethod": "CASH",
        });
        if let Some(date) = date {
            body["date"] = json!(date);
        }
        let resp = self
            .client
            .post(self.url("/api/contributions"))
            .bearer_auth(&self.admin_token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_login_creates_session_expiring_in_seven_days() {
    let fixture = TestFixture::new().await;

    let user = fixture
        .repo
        .find_user_by_email(ADMIN_EMAIL)
        .await
        .unwrap()
        .unwrap();
    let session = fixture
        .repo
        .latest_session_for_user(&user.id)
        .await
        .unwrap()
        .expect("login should have created a session");

    let expires = chrono::DateTime::parse_from_rfc3339(&session.expires_at).unwrap();
    let expected = chrono::Utc::now() + chrono::Duration::days(7);
    let skew = (expires.with_timezone(&chrono::Utc) - expected)
        .num_seconds()
        .abs();
    assert!(skew < 60, "session expiry should be about 7 days out");
}

#[tokio::test]
async fn test_failed_login_leaves_no_session() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": "nobody@church.test", "password": "whatever" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Only the fixture's own login session exists
    let user = fixture
        .repo
        .find_user_by_email(ADMIN_EMAIL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        fixture.repo.count_sessions_for_user(&user.id).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let fixture = TestFixture::new().await;

    for path in ["/api/members", "/api/contributions", "/api/dashboard/stats"] {
        let resp = fixture.client.get(fixture.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 401, "{} should be gated", path);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_me_and_logout() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/me"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["email"], ADMIN_EMAIL);
    assert_eq!(body["role"], "ADMIN");
    assert!(body.get("passwordHash").is_none());

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/logout"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let user = fixture
        .repo
        .find_user_by_email(ADMIN_EMAIL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        fixture.repo.count_sessions_for_user(&user.id).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_change_password_flow() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .patch(fixture.url("/api/auth/change-password"))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({ "currentPassword": "not-the-password", "newPassword": "brand-new-pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .client
        .patch(fixture.url("/api/auth/change-password"))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({ "currentPassword": ADMIN_PASSWORD, "newPassword": "brand-new-pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Old password no longer works, new one does
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    fixture.login(ADMIN_EMAIL, "brand-new-pw").await;
}

#[tokio::test]
async fn test_register_requires_admin() {
    let fixture = TestFixture::new().await;
    let viewer = fixture.viewer_token("viewer@church.test").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .bearer_auth(&viewer)
        .json(&json!({
            "email": "another@church.test",
            "password": "password",
            "name": "Another",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_member_crud() {
    let fixture = TestFixture::new().await;

    let member = fixture
        .create_member("Maria Santos", Some("maria@church.test"))
        .await;
    let id = member["id"].as_str().unwrap();
    assert_eq!(member["active"], true);

    // Detail view includes giving history
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/members/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(detail["name"], "Maria Santos");
    assert_eq!(detail["totalContributed"], 0.0);
    assert_eq!(detail["recentContributions"].as_array().unwrap().len(), 0);

    // Full update
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/members/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({ "name": "Maria S. Oliveira", "phone": "+55 11 99999-0000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["name"], "Maria S. Oliveira");
    assert_eq!(updated["phone"], "+55 11 99999-0000");

    // Search matches substrings case-insensitively
    fixture.create_member("Pedro Lima", None).await;
    let resp = fixture
        .client
        .get(fixture.url("/api/members?search=oliveira"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["members"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total"], 1);

    let resp = fixture
        .client
        .get(fixture.url("/api/members/no-such-id"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_member_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/members"))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({ "name": "Al", "email": "not-an-email" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    // Both violations reported at once
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_member_soft_delete() {
    let fixture = TestFixture::new().await;

    let member = fixture.create_member("Ana Costa", None).await;
    let id = member["id"].as_str().unwrap();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/members/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Still fetchable by id, but inactive
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/members/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(detail["active"], false);

    // Absent from the active listing
    let resp = fixture
        .client
        .get(fixture.url("/api/members?active=true"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["members"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_member_delete_requires_admin() {
    let fixture = TestFixture::new().await;
    let viewer = fixture.viewer_token("viewer2@church.test").await;

    let member = fixture.create_member("João Pereira", None).await;
    let id = member["id"].as_str().unwrap();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/members/{}", id)))
        .bearer_auth(&viewer)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_concurrent_duplicate_member_email() {
    let fixture = TestFixture::new().await;

    let body = json!({ "name": "Duplicated Person", "email": "dup@church.test" });
    let first = fixture
        .client
        .post(fixture.url("/api/members"))
        .bearer_auth(&fixture.admin_token)
        .json(&body)
        .send();
    let second = fixture
        .client
        .post(fixture.url("/api/members"))
        .bearer_auth(&fixture.admin_token)
        .json(&body)
        .send();

    let (first, second) = tokio::join!(first, second);
    let mut statuses = vec![
        first.unwrap().status().as_u16(),
        second.unwrap().status().as_u16(),
    ];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![201, 409]);
}

#[tokio::test]
async fn test_category_create_and_conflict() {
    let fixture = TestFixture::new().await;

    let category = fixture.create_category("Construction Fund").await;
    assert_eq!(category["active"], true);

    let resp = fixture
        .client
        .post(fixture.url("/api/categories"))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({ "name": "Construction Fund" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = fixture
        .client
        .get(fixture.url("/api/categories"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_contribution_rejects_non_positive_amount() {
    let fixture = TestFixture::new().await;
    let member = fixture.create_member("Test Member", None).await;
    let category = fixture.create_category("General").await;

    for amount in [0.0, -10.0] {
        let resp = fixture
            .client
            .post(fixture.url("/api/contributions"))
            .bearer_auth(&fixture.admin_token)
            .json(&json!({
                "memberId": member["id"],
                "categoryId": category["id"],
                "type": "TITHE",
                "amount": amount,
                "paymentMethod": "CASH",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    // Nothing was inserted
    let resp = fixture
        .client
        .get(fixture.url("/api/contributions"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_contribution_filters_and_total_amount() {
    let fixture = TestFixture::new().await;
    let member = fixture.create_member("Giver One", None).await;
    let other = fixture.create_member("Giver Two", None).await;
    let category = fixture.create_category("General").await;
    let member_id = member["id"].as_str().unwrap();
    let other_id = other["id"].as_str().unwrap();
    let category_id = category["id"].as_str().unwrap();

    fixture
        .create_contribution(member_id, category_id, 100.0, "TITHE", None)
        .await;
    fixture
        .create_contribution(member_id, category_id, 25.0, "OFFERING", None)
        .await;
    fixture
        .create_contribution(other_id, category_id, 50.0, "TITHE", None)
        .await;

    // Filter by type: the sum covers the whole filtered set
    let resp = fixture
        .client
        .get(fixture.url("/api/contributions?type=TITHE&limit=1"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["contributions"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["totalAmount"], 150.0);

    // Filter by member
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/contributions?memberId={}", member_id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["totalAmount"], 125.0);

    // Member and category ride along inlined
    let row = &body["contributions"][0];
    assert_eq!(row["member"]["name"], "Giver One");
    assert_eq!(row["category"]["name"], "General");
}

#[tokio::test]
async fn test_contribution_update_is_merge_patch() {
    let fixture = TestFixture::new().await;
    let member = fixture.create_member("Giver", None).await;
    let category = fixture.create_category("General").await;

    let contribution = fixture
        .create_contribution(
            member["id"].as_str().unwrap(),
            category["id"].as_str().unwrap(),
            80.0,
            "OFFERING",
            None,
        )
        .await;
    let id = contribution["id"].as_str().unwrap();

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/contributions/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({ "amount": 95.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();

    // Only the amount changed; everything else survives
    assert_eq!(updated["amount"], 95.5);
    assert_eq!(updated["type"], "OFFERING");
    assert_eq!(updated["paymentMethod"], "CASH");
    assert_eq!(updated["date"], contribution["date"]);
}

#[tokio::test]
async fn test_contribution_delete_requires_admin() {
    let fixture = TestFixture::new().await;
    let viewer = fixture.viewer_token("viewer3@church.test").await;
    let member = fixture.create_member("Giver", None).await;
    let category = fixture.create_category("General").await;

    let contribution = fixture
        .create_contribution(
            member["id"].as_str().unwrap(),
            category["id"].as_str().unwrap(),
            10.0,
            "TITHE",
            None,
        )
        .await;
    let id = contribution["id"].as_str().unwrap();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/contributions/{}", id)))
        .bearer_auth(&viewer)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Admin can
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/contributions/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/contributions/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_verify_toggle_sets_and_clears_audit_fields() {
    let fixture = TestFixture::new().await;
    let member = fixture.create_member("Giver", None).await;
    let category = fixture.create_category("General").await;

    let contribution = fixture
        .create_contribution(
            member["id"].as_str().unwrap(),
            category["id"].as_str().unwrap(),
            40.0,
            "TITHE",
            None,
        )
        .await;
    let id = contribution["id"].as_str().unwrap();
    assert_eq!(contribution["verified"], false);

    let resp = fixture
        .client
        .patch(fixture.url(&format!("/api/contributions/{}/verify", id)))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({ "verified": true }))
        .send()
        .await
        .unwrap();
    let verified: Value = resp.json().await.unwrap();
    assert_eq!(verified["verified"], true);
    assert!(verified["verifiedBy"].is_string());
    assert!(verified["verifiedAt"].is_string());

    let resp = fixture
        .client
        .patch(fixture.url(&format!("/api/contributions/{}/verify", id)))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({ "verified": false }))
        .send()
        .await
        .unwrap();
    let unverified: Value = resp.json().await.unwrap();
    assert_eq!(unverified["verified"], false);
    assert!(unverified.get("verifiedBy").is_none());
    assert!(unverified.get("verifiedAt").is_none());
}

#[tokio::test]
async fn test_events_crud_and_merge_patch() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/events"))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({ "title": "Sunday Service", "datetime": "2025-09-07T10:00:00Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let event: Value = resp.json().await.unwrap();
    let id = event["id"].as_str().unwrap();

    // Merge-patch: only the title changes
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/events/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({ "title": "Evening Service" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["title"], "Evening Service");
    assert_eq!(updated["datetime"], event["datetime"]);

    // Range filter
    let resp = fixture
        .client
        .get(fixture.url("/api/events?from=2025-09-01&to=2025-09-30"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["events"].as_array().unwrap().len(), 1);

    // A date-only upper bound includes events later that same day
    let resp = fixture
        .client
        .get(fixture.url("/api/events?from=2025-09-07&to=2025-09-07"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["events"].as_array().unwrap().len(), 1);

    let resp = fixture
        .client
        .get(fixture.url("/api/events?from=2025-10-01"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["events"].as_array().unwrap().len(), 0);

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/events/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/events/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_member_photo_upload() {
    let fixture = TestFixture::new().await;
    let member = fixture.create_member("Photogenic Member", None).await;
    let id = member["id"].as_str().unwrap();

    // Unsupported content type is refused
    let form = reqwest::multipart::Form::new().part(
        "photo",
        reqwest::multipart::Part::bytes(b"plain text".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/members/{}/photo", id)))
        .bearer_auth(&fixture.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let form = reqwest::multipart::Form::new().part(
        "photo",
        reqwest::multipart::Part::bytes(vec![0xFF, 0xD8, 0xFF, 0xE0])
            .file_name("photo.jpg")
            .mime_str("image/jpeg")
            .unwrap(),
    );
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/members/{}/photo", id)))
        .bearer_auth(&fixture.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let photo_url = body["photoUrl"].as_str().unwrap();
    assert!(photo_url.ends_with(".jpg"));
    assert!(std::fs::metadata(photo_url).is_ok(), "file should be stored");

    // The stored path is persisted on the member row
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/members/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(detail["profilePhoto"], photo_url);
}

#[tokio::test]
async fn test_contribution_receipt_upload() {
    let fixture = TestFixture::new().await;
    let member = fixture.create_member("Giver", None).await;
    let category = fixture.create_category("General").await;
    let contribution = fixture
        .create_contribution(
            member["id"].as_str().unwrap(),
            category["id"].as_str().unwrap(),
            60.0,
            "TITHE",
            None,
        )
        .await;
    let id = contribution["id"].as_str().unwrap();

    let form = reqwest::multipart::Form::new().part(
        "receipt",
        reqwest::multipart::Part::bytes(b"%PDF-1.4".to_vec())
            .file_name("receipt.pdf")
            .mime_str("application/pdf")
            .unwrap(),
    );
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/contributions/{}/receipt", id)))
        .bearer_auth(&fixture.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let receipt_url = body["receiptUrl"].as_str().unwrap();
    assert!(receipt_url.ends_with(".pdf"));
    assert!(std::fs::metadata(receipt_url).is_ok(), "file should be stored");

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/contributions/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(detail["receipt"], receipt_url);

    // Receipts on missing contributions are a 404
    let form = reqwest::multipart::Form::new().part(
        "receipt",
        reqwest::multipart::Part::bytes(b"%PDF-1.4".to_vec())
            .file_name("receipt.pdf")
            .mime_str("application/pdf")
            .unwrap(),
    );
    let resp = fixture
        .client
        .post(fixture.url("/api/contributions/no-such-id/receipt"))
        .bearer_auth(&fixture.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_malformed_body_reports_error_shape() {
    let fixture = TestFixture::new().await;

    // Syntactically broken JSON
    let resp = fixture
        .client
        .post(fixture.url("/api/members"))
        .bearer_auth(&fixture.admin_token)
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
    assert!(!body["details"].as_array().unwrap().is_empty());

    // Out-of-enum value
    let member = fixture.create_member("Giver", None).await;
    let category = fixture.create_category("General").await;
    let resp = fixture
        .client
        .post(fixture.url("/api/contributions"))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({
            "memberId": member["id"],
            "categoryId": category["id"],
            "type": "BRIBERY",
            "amount": 10.0,
            "paymentMethod": "CASH",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_dashboard_on_empty_database() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/dashboard/stats"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let stats: Value = resp.json().await.unwrap();

    let overview = &stats["overview"];
    assert_eq!(overview["totalAmount"], 0.0);
    assert_eq!(overview["totalCount"], 0);
    assert_eq!(overview["monthlyTotal"], 0.0);
    assert_eq!(overview["weeklyTotal"], 0.0);
    assert_eq!(overview["yearlyTotal"], 0.0);
    assert_eq!(overview["totalMembers"], 0);
    assert_eq!(overview["activeMembers"], 0);
    assert!(stats["topContributors"].as_array().unwrap().is_empty());
    assert!(stats["recentContributions"].as_array().unwrap().is_empty());
    assert!(stats["charts"]["monthlyEvolution"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_member_detail_with_no_contributions() {
    let fixture = TestFixture::new().await;
    let member = fixture.create_member("Quiet Member", None).await;
    let id = member["id"].as_str().unwrap();

    // Empty-set totals still decode as numbers
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/members/{}", id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(detail["totalContributed"], 0.0);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/contributions?memberId={}", id)))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["totalAmount"], 0.0);
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_dashboard_stats() {
    let fixture = TestFixture::new().await;
    let member_a = fixture.create_member("Member A", None).await;
    let member_b = fixture.create_member("Member B", None).await;
    let category = fixture.create_category("General").await;
    let a_id = member_a["id"].as_str().unwrap();
    let b_id = member_b["id"].as_str().unwrap();
    let category_id = category["id"].as_str().unwrap();

    // Current-month contributions: A gives 150 total, B gives 300
    fixture
        .create_contribution(a_id, category_id, 100.0, "TITHE", None)
        .await;
    fixture
        .create_contribution(a_id, category_id, 50.0, "OFFERING", None)
        .await;
    fixture
        .create_contribution(b_id, category_id, 300.0, "TITHE", None)
        .await;

    // One contribution about six months back, inside the trailing year
    let old_date = (chrono::Utc::now() - chrono::Duration::days(200))
        .format("%Y-%m-%dT12:00:00Z")
        .to_string();
    fixture
        .create_contribution(b_id, category_id, 70.0, "TITHE", Some(&old_date))
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/dashboard/stats"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let stats: Value = resp.json().await.unwrap();

    let overview = &stats["overview"];
    assert_eq!(overview["monthlyTotal"], 450.0);
    assert_eq!(overview["monthlyCount"], 3);
    assert_eq!(overview["totalAmount"], 520.0);
    assert_eq!(overview["totalCount"], 4);
    assert_eq!(overview["totalMembers"], 2);
    assert_eq!(overview["activeMembers"], 2);

    // Ranked by current-month totals: B (300) ahead of A (150)
    let top = stats["topContributors"].as_array().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["id"], *b_id);
    assert_eq!(top[0]["total"], 300.0);
    assert_eq!(top[1]["id"], *a_id);
    assert_eq!(top[1]["total"], 150.0);

    // Exactly two populated months, most recent first, empty months absent
    let evolution = stats["charts"]["monthlyEvolution"].as_array().unwrap();
    assert_eq!(evolution.len(), 2);
    assert!(evolution[0]["month"].as_str().unwrap() > evolution[1]["month"].as_str().unwrap());
    assert_eq!(evolution[1]["total"], 70.0);
    assert_eq!(evolution[1]["count"], 1);

    // Current-month type distribution
    let types = stats["charts"]["typeDistribution"].as_array().unwrap();
    let tithe = types.iter().find(|t| t["type"] == "TITHE").unwrap();
    assert_eq!(tithe["total"], 400.0);
    assert_eq!(tithe["count"], 2);

    let recent = stats["recentContributions"].as_array().unwrap();
    assert_eq!(recent.len(), 4);
}

#[tokio::test]
async fn test_top_contributor_ties_break_by_member_id() {
    let fixture = TestFixture::new().await;
    let member_a = fixture.create_member("Tied One", None).await;
    let member_b = fixture.create_member("Tied Two", None).await;
    let category = fixture.create_category("General").await;
    let a_id = member_a["id"].as_str().unwrap();
    let b_id = member_b["id"].as_str().unwrap();
    let category_id = category["id"].as_str().unwrap();

    fixture
        .create_contribution(a_id, category_id, 120.0, "TITHE", None)
        .await;
    fixture
        .create_contribution(b_id, category_id, 120.0, "TITHE", None)
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/dashboard/stats"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    let stats: Value = resp.json().await.unwrap();
    let top = stats["topContributors"].as_array().unwrap();

    let mut expected = vec![a_id, b_id];
    expected.sort_unstable();
    assert_eq!(top[0]["id"], *expected[0]);
    assert_eq!(top[1]["id"], *expected[1]);
}
