//! End-to-end HTTP tests against the nullable store and gateways.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use guestpass_crypto::{sign_webhook_payload, Audience, KeyRing, TokenCodec, TokenRequest};
use guestpass_lifecycle::{EngineConfig, EngineDeps, MemberProfile, PassEngine};
use guestpass_nullables::{
    NullClock, NullMembership, NullNotifier, NullStore, NullVerificationGateway,
    NullWalletIssuer,
};
use guestpass_rpc::{create_app, AppState, WebhookSettings};
use guestpass_store::ResidentStore;
use guestpass_types::{BuildingCalendar, Resident, ResidentId, Role, Timestamp};

/// 2025-06-01T09:00:00Z
const NOW: u64 = 1_748_768_400;
const WEBHOOK_SECRET: &[u8] = b"whsec_test";

struct TestApp {
    app: Router,
    store: Arc<NullStore>,
    clock: Arc<NullClock>,
    codec: TokenCodec,
    host: String,
    staff: String,
}

impl TestApp {
    fn new() -> Self {
        Self::with_webhook_secret(Some(WEBHOOK_SECRET.to_vec()))
    }

    fn with_webhook_secret(secret: Option<Vec<u8>>) -> Self {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(NOW));
        let codec = TokenCodec::new(
            "guestpass.test",
            KeyRing::new().with_signing_key("k1", b"signing-secret".to_vec()),
        );
        let membership = NullMembership::new().with_member(
            "cred-grace",
            MemberProfile {
                external_id: "member-grace".into(),
                name: "Grace Hopper".into(),
                email: None,
                phone: None,
                unit: Some("12B".into()),
                verified_member: true,
                role: Role::Resident,
            },
        );
        let engine = PassEngine::new(
            EngineDeps {
                store: store.clone(),
                clock: clock.clone(),
                codec: codec.clone(),
                wallet_secret: Some(b"wallet-secret".to_vec()),
                verification: Arc::new(NullVerificationGateway::new()),
                notifier: Arc::new(NullNotifier::new()),
                wallet: Arc::new(NullWalletIssuer::new()),
                membership: Arc::new(membership),
            },
            EngineConfig {
                public_base_url: "https://guest.test".into(),
                calendar: BuildingCalendar::utc(),
                call_timeout: Duration::from_millis(200),
                ..EngineConfig::default()
            },
        );
        let app = create_app(AppState::new(
            Arc::new(engine),
            WebhookSettings {
                secret,
                ..WebhookSettings::default()
            },
        ));

        let mut test = Self {
            app,
            store,
            clock,
            codec,
            host: String::new(),
            staff: String::new(),
        };
        test.host = test.resident("res-host", Role::Resident);
        test.staff = test.resident("res-staff", Role::Staff);
        test
    }

    /// Store a verified resident and return a session token for them.
    fn resident(&self, id: &str, role: Role) -> String {
        self.store
            .put_resident(&Resident {
                id: ResidentId::parse(id).unwrap(),
                external_id: format!("ext-{id}"),
                name: "Grace Hopper".into(),
                email: None,
                phone: None,
                unit: Some("12B".into()),
                verified_member: true,
                role,
                created_at: Timestamp::new(NOW),
                last_login_at: Timestamp::new(NOW),
            })
            .unwrap();
        let now = Timestamp::new(NOW);
        self.codec
            .mint(
                TokenRequest::new(Audience::ResidentSession, id, now.plus_secs(8 * 3600))
                    .role(role.as_str()),
                now,
            )
            .unwrap()
            .token
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, bearer: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn webhook(&self, event: Value) -> (StatusCode, Value) {
        let body = event.to_string();
        let signature =
            sign_webhook_payload(WEBHOOK_SECRET, Timestamp::new(NOW), body.as_bytes()).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/api/webhooks/identity")
            .header("content-type", "application/json")
            .header("identity-signature", signature)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Invite a guest for `visit_date` and return (passId, completion token).
    async fn invite(&self, visit_date: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/guest/invite",
                Some(&self.host),
                json!({
                    "guestName": "Ada Lovelace",
                    "guestEmail": "ada@example.com",
                    "visitDate": visit_date,
                    "floor": "12",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let link = body["link"].as_str().unwrap();
        let token = link.split_once("token=").unwrap().1.to_string();
        (body["passId"].as_str().unwrap().to_string(), token)
    }
}

fn verified_event(session_id: &str, pass_id: &str) -> Value {
    json!({
        "type": "identity.verification_session.verified",
        "data": {"object": {"id": session_id, "metadata": {"guest_pass_id": pass_id}}}
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn protected_routes_need_a_bearer_token() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/admin/check-in", None, json!({"token": "x"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app.get("/api/resident/passes", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_then_list_passes() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/auth/session", None, json!({"credential": "cred-grace"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/resident/passes", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["passes"], json!([]));

    let (status, body) = app
        .post("/api/auth/session", None, json!({"credential": "nope"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn guest_journey_from_invite_to_check_out() {
    let app = TestApp::new();
    let (pass_id, token) = app.invite("2025-06-01").await;

    let (status, details) = app
        .get(&format!("/api/guest/invitation?token={token}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["guestName"], "Ada Lovelace");

    let (status, started) = app
        .post(
            "/api/guest/complete",
            None,
            json!({
                "token": token,
                "firstName": "Ada",
                "lastName": "Lovelace",
                "phone": "+15550100",
                "idLast4": "1234",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{started}");
    let session_id = started["sessionId"].as_str().unwrap().to_string();

    let (status, again) = app
        .post(
            "/api/guest/complete",
            None,
            json!({"token": token, "firstName": "Ada", "lastName": "L", "phone": "1"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["error"], "invalid_or_used_token");

    let (status, applied) = app.webhook(verified_event(&session_id, &pass_id)).await;
    assert_eq!(status, StatusCode::OK, "{applied}");
    assert_eq!(applied["result"], "applied");
    assert_eq!(applied["detail"], "approved");

    let (status, duplicate) = app.webhook(verified_event(&session_id, &pass_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(duplicate["result"], "already_processed");

    let (status, progress) = app
        .get(
            &format!("/api/guest/verification-status?passId={pass_id}&sessionId={session_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["status"], "approved");
    assert!(progress["walletUrl"].is_string());

    let (status, approved) = app
        .post(
            "/api/guest/approve",
            Some(&app.host),
            json!({"passId": pass_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{approved}");
    assert_eq!(approved["pass"]["status"], "scheduled");

    let (status, qr) = app
        .get(&format!("/api/passes/{pass_id}/qr"), Some(&app.host))
        .await;
    assert_eq!(status, StatusCode::OK);
    let door = qr["token"].as_str().unwrap().to_string();

    let (status, entry) = app
        .post("/api/admin/check-in", Some(&app.staff), json!({"token": door}))
        .await;
    assert_eq!(status, StatusCode::OK, "{entry}");
    assert_eq!(entry["ok"], true);
    assert_eq!(entry["message"], "Checked in");
    assert_eq!(entry["passId"], pass_id.as_str());
    assert_eq!(entry["guard"]["guestName"], "Ada Lovelace");

    let (status, replay) = app
        .post("/api/admin/check-in", Some(&app.staff), json!({"token": door}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["message"], "Already checked-in");

    let (status, out) = app
        .post(
            "/api/admin/check-out",
            Some(&app.staff),
            json!({"passId": pass_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["pass"]["status"], "checked_out");

    let (status, used) = app
        .post("/api/admin/check-in", Some(&app.staff), json!({"token": door}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(used["ok"], false);
    assert_eq!(used["message"], "Token already used");
}

#[tokio::test]
async fn door_refusals_carry_their_reason() {
    let app = TestApp::new();
    let (pass_id, _) = app.invite("2025-06-01").await;
    let (_, qr) = app
        .get(&format!("/api/passes/{pass_id}/qr"), Some(&app.host))
        .await;
    let door = qr["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .post("/api/admin/check-in", Some(&app.host), json!({"token": door}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    app.clock.advance(600);
    let (status, body) = app
        .post("/api/admin/check-in", Some(&app.staff), json!({"token": door}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_expired");
}

#[tokio::test]
async fn next_day_pass_is_the_wrong_day() {
    let app = TestApp::new();
    let (pass_id, _) = app.invite("2025-06-02").await;
    let (_, qr) = app
        .get(&format!("/api/passes/{pass_id}/qr"), Some(&app.host))
        .await;
    let (status, body) = app
        .post(
            "/api/admin/check-in",
            Some(&app.staff),
            json!({"token": qr["token"]}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "wrong_day");
}

#[tokio::test]
async fn webhook_signature_is_required() {
    let app = TestApp::new();
    let body = verified_event("vs_1", "p-1").to_string();

    let unsigned = Request::builder()
        .method("POST")
        .uri("/api/webhooks/identity")
        .body(Body::from(body.clone()))
        .unwrap();
    let (status, _) = app.send(unsigned).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let forged = sign_webhook_payload(b"other", Timestamp::new(NOW), body.as_bytes()).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/identity")
        .header("identity-signature", forged)
        .body(Body::from(body))
        .unwrap();
    let (status, response) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_signature");
}

#[tokio::test]
async fn webhook_without_secret_is_a_misconfiguration() {
    let app = TestApp::with_webhook_secret(None);
    let (status, body) = app.webhook(verified_event("vs_1", "p-1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "system_misconfiguration");
}

#[tokio::test]
async fn webhook_for_unknown_pass_is_acknowledged() {
    let app = TestApp::new();
    let (status, body) = app.webhook(verified_event("vs_1", "no-such-pass")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "ignored");
}

#[tokio::test]
async fn signed_webhook_without_session_is_acknowledged() {
    let app = TestApp::new();
    let (pass_id, _) = app.invite("2025-06-01").await;
    let (status, body) = app
        .webhook(json!({
            "type": "identity.verification_session.verified",
            "metadata": {"passId": pass_id},
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "ignored");
    assert_eq!(body["detail"], "no session id");
}

#[tokio::test]
async fn webhook_store_outage_asks_for_redelivery() {
    let app = TestApp::new();
    let (pass_id, _) = app.invite("2025-06-01").await;
    app.store.set_unavailable(true);
    let (status, body) = app.webhook(verified_event("vs_1", &pass_id)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "store_unavailable");
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/guest/invite")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", app.host))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn staff_list_filters_by_date() {
    let app = TestApp::new();
    app.invite("2025-06-01").await;
    app.invite("2025-06-03").await;

    let (status, body) = app
        .get("/api/admin/passes?date=2025-06-03", Some(&app.staff))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["passes"].as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/admin/passes", Some(&app.host)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn dashboard_is_for_staff() {
    let app = TestApp::new();
    let (pass_id, _) = app.invite("2025-06-01").await;
    app.invite("2025-06-02").await;

    let (status, metrics) = app.get("/api/admin/metrics", Some(&app.staff)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["ok"], true);
    assert_eq!(metrics["totalPasses"], 2);
    assert_eq!(metrics["scheduledToday"], 1);
    assert_eq!(metrics["inBuilding"], 0);
    assert_eq!(metrics["checkedInToday"], 0);

    let (status, feed) = app
        .get("/api/admin/recent-activity", Some(&app.staff))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["total"], 2);
    let activities = feed["activities"].as_array().unwrap();
    assert_eq!(activities.len(), 2);
    assert!(activities
        .iter()
        .any(|a| a["id"] == format!("{pass_id}_created").as_str()));
    assert_eq!(activities[0]["type"], "created");
    assert_eq!(activities[0]["hostName"], "Grace Hopper");

    let (status, body) = app.get("/api/admin/metrics", Some(&app.host)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    let (status, _) = app.get("/api/admin/recent-activity", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

