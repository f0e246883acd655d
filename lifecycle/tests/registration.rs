//! Guest completion, identity verification callbacks and host approval.

mod common;

use std::time::Duration;

use guestpass_crypto::{Audience, TokenRequest};
use guestpass_lifecycle::{
    CheckInOutcome, Delivery, GatewayError, InviteRequest, PassError, VerificationEvent,
    VerificationEventKind, WebhookOutcome,
};
use guestpass_store::PassStore;
use guestpass_types::{PassId, PassStatus, Role, VerificationOutcome};

use common::*;

fn event(kind: &str, session_id: &str, pass_id: &PassId) -> VerificationEvent {
    VerificationEvent {
        kind: VerificationEventKind::parse(kind),
        session_id: session_id.to_string(),
        pass_id: Some(pass_id.clone()),
    }
}

/// Invite, then complete registration. Returns the pass and session ids.
async fn pending(h: &Harness) -> (PassId, String) {
    let (pass_id, token) = h.invite(date(6, 1)).await;
    let started = h
        .engine
        .complete_registration(&token, submission())
        .await
        .unwrap();
    (pass_id, started.session_id)
}

#[tokio::test]
async fn completion_starts_verification_and_consumes_the_link() {
    let h = Harness::new();
    let (pass_id, token) = h.invite(date(6, 1)).await;

    let started = h
        .engine
        .complete_registration(&token, submission())
        .await
        .unwrap();
    assert_eq!(started.session_id, "vs_null_1");
    assert!(started.verification_url.contains("vs_null_1"));

    let pass = h.pass(&pass_id);
    assert_eq!(pass.status, PassStatus::PendingVerification);
    assert_eq!(pass.extended.pending_nonce, None);
    assert_eq!(pass.guest.phone.as_deref(), Some("+15550100"));
    assert_eq!(pass.verification_session(), Some("vs_null_1"));
    let requests = h.verification.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].return_url.starts_with("https://guest.test/"));

    // Scenario C: the same link again.
    let err = h
        .engine
        .complete_registration(&token, submission())
        .await
        .unwrap_err();
    assert_eq!(err, PassError::InvalidOrUsedToken);
    assert_eq!(h.pass(&pass_id).status, PassStatus::PendingVerification);
    assert_eq!(h.verification.requests().len(), 1);
}

#[tokio::test]
async fn provider_failure_leaves_the_link_usable() {
    let h = Harness::new();
    let (pass_id, token) = h.invite(date(6, 1)).await;

    h.verification
        .fail_with(Some(GatewayError::Unavailable("identity provider".into())));
    let err = h
        .engine
        .complete_registration(&token, submission())
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "{err:?}");
    let pass = h.pass(&pass_id);
    assert_eq!(pass.status, PassStatus::Scheduled);
    assert!(pass.extended.pending_nonce.is_some());

    h.verification.fail_with(None);
    h.engine
        .complete_registration(&token, submission())
        .await
        .unwrap();
    assert_eq!(h.pass(&pass_id).status, PassStatus::PendingVerification);
}

#[tokio::test]
async fn slow_provider_times_out_without_consuming_the_link() {
    let h = Harness::new();
    let (pass_id, token) = h.invite(date(6, 1)).await;

    h.verification.delay(Some(Duration::from_millis(500)));
    let err = h
        .engine
        .complete_registration(&token, submission())
        .await
        .unwrap_err();
    assert!(matches!(err, PassError::TransientDependencyFailure(_)));
    assert!(h.pass(&pass_id).extended.pending_nonce.is_some());

    h.verification.delay(None);
    assert!(h
        .engine
        .complete_registration(&token, submission())
        .await
        .is_ok());
}

#[tokio::test]
async fn concurrent_completions_consume_the_link_once() {
    let h = Harness::new();
    let (pass_id, token) = h.invite(date(6, 1)).await;
    h.verification.delay(Some(Duration::from_millis(20)));

    let (a, b) = tokio::join!(
        h.engine.complete_registration(&token, submission()),
        h.engine.complete_registration(&token, submission()),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| r.as_ref().err() == Some(&PassError::InvalidOrUsedToken)));
    let pass = h.pass(&pass_id);
    assert_eq!(pass.status, PassStatus::PendingVerification);
    let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
    assert_eq!(pass.verification_session(), Some(winner.session_id.as_str()));
}

#[tokio::test]
async fn completion_started_before_midnight_judges_the_entry_day() {
    let h = Harness::new();
    let (pass_id, token) = h.invite(date(6, 1)).await;
    h.set_time(JUNE_1 + DAY - 5);
    h.verification.delay(Some(Duration::from_millis(50)));

    let (started, _) = tokio::join!(
        h.engine.complete_registration(&token, submission()),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.set_time(JUNE_1 + DAY + 5);
        },
    );

    assert!(started.is_ok());
    assert_eq!(h.pass(&pass_id).status, PassStatus::PendingVerification);
}

#[tokio::test]
async fn completion_rejects_bad_input_and_foreign_tokens() {
    let h = Harness::new();
    let (pass_id, token) = h.invite(date(6, 1)).await;

    let mut incomplete = submission();
    incomplete.phone = String::new();
    assert!(matches!(
        h.engine.complete_registration(&token, incomplete).await,
        Err(PassError::InvalidInput(_))
    ));

    let now = h.now();
    let door = h
        .codec
        .mint(
            TokenRequest::new(Audience::DoorScanner, pass_id.as_str(), now.plus_secs(600))
                .host("res-host"),
            now,
        )
        .unwrap();
    assert!(matches!(
        h.engine.complete_registration(&door.token, submission()).await,
        Err(PassError::TokenInvalid(_))
    ));

    let wrong_host = h
        .codec
        .mint(
            TokenRequest::new(Audience::GuestPrereg, pass_id.as_str(), now.plus_secs(600))
                .host("res-other")
                .nonce("whatever"),
            now,
        )
        .unwrap();
    assert!(matches!(
        h.engine
            .complete_registration(&wrong_host.token, submission())
            .await,
        Err(PassError::TokenInvalid(_))
    ));
    assert_eq!(h.pass(&pass_id).status, PassStatus::Scheduled);
}

#[tokio::test]
async fn completion_link_expires() {
    let h = Harness::new();
    let (_, token) = h.invite(date(6, 3)).await;
    h.clock.advance(DAY);
    assert_eq!(
        h.engine
            .complete_registration(&token, submission())
            .await
            .unwrap_err(),
        PassError::TokenExpired
    );
}

#[tokio::test]
async fn legacy_token_without_nonce_works_once() {
    let h = Harness::new();
    let (pass_id, _) = h.invite(date(6, 1)).await;
    let mut pass = h.pass(&pass_id);
    pass.extended.pending_nonce = None;
    h.store.update_pass(&pass, pass.revision).unwrap();

    let now = h.now();
    let legacy = h
        .codec
        .mint(
            TokenRequest::new(Audience::GuestPrereg, pass_id.as_str(), now.plus_secs(DAY))
                .host("res-host"),
            now,
        )
        .unwrap()
        .token;

    h.engine
        .complete_registration(&legacy, submission())
        .await
        .unwrap();
    assert_eq!(
        h.engine
            .complete_registration(&legacy, submission())
            .await
            .unwrap_err(),
        PassError::InvalidOrUsedToken
    );
}

#[tokio::test]
async fn invitation_lookup_does_not_consume() {
    let h = Harness::new();
    let (pass_id, token) = h.invite(date(6, 1)).await;

    let details = h.engine.invitation_details(&token).unwrap();
    assert_eq!(details.pass_id, pass_id.to_string());
    assert_eq!(details.guest_name, "Ada Lovelace");
    assert_eq!(details.host_name.as_deref(), Some("Grace Hopper"));
    assert_eq!(details.status, PassStatus::Scheduled);
    h.engine.invitation_details(&token).unwrap();

    h.engine
        .complete_registration(&token, submission())
        .await
        .unwrap();
    assert_eq!(
        h.engine.invitation_details(&token).unwrap_err(),
        PassError::InvalidOrUsedToken
    );
}

#[tokio::test]
async fn scenario_d_verified_event_approves_and_issues_wallet_once() {
    let h = Harness::new();
    let (pass_id, session_id) = pending(&h).await;

    let outcome = h
        .engine
        .handle_verification_event(event(
            "identity.verification_session.verified",
            &session_id,
            &pass_id,
        ))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Applied(PassStatus::Approved));

    let pass = h.pass(&pass_id);
    assert_eq!(pass.status, PassStatus::Approved);
    let record = pass.extended.verification.as_ref().unwrap();
    assert_eq!(record.outcome, VerificationOutcome::Verified);
    assert_eq!(record.resolved_at, Some(h.now()));
    assert!(pass.wallet_url().is_some());
    let issued = h.wallet.issued();
    assert_eq!(issued.len(), 1);
    assert!(issued[0].qr_payload.contains("securityHash"));

    let again = h
        .engine
        .handle_verification_event(event("verified", &session_id, &pass_id))
        .await
        .unwrap();
    assert_eq!(again, WebhookOutcome::AlreadyProcessed);
    assert_eq!(h.wallet.issued().len(), 1);
    assert_eq!(h.pass(&pass_id).status, PassStatus::Approved);
}

#[tokio::test]
async fn wallet_failure_is_recorded_not_raised() {
    let h = Harness::new();
    let (pass_id, session_id) = pending(&h).await;
    h.wallet
        .fail_with(Some(GatewayError::Unavailable("wallet signer".into())));

    let outcome = h
        .engine
        .handle_verification_event(event("verified", &session_id, &pass_id))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Applied(PassStatus::Approved));
    let pass = h.pass(&pass_id);
    assert_eq!(pass.wallet_url(), None);
    let wallet = pass.extended.wallet.as_ref().unwrap();
    assert!(wallet.last_error.is_some());
}

#[tokio::test]
async fn mismatched_events_are_ignored() {
    let h = Harness::new();
    let (pass_id, session_id) = pending(&h).await;

    let wrong_session = h
        .engine
        .handle_verification_event(event("verified", "vs_someone_else", &pass_id))
        .await
        .unwrap();
    assert!(matches!(wrong_session, WebhookOutcome::Ignored(_)));

    let ghost = PassId::parse("no-such-pass").unwrap();
    let unknown = h
        .engine
        .handle_verification_event(event("verified", &session_id, &ghost))
        .await
        .unwrap();
    assert!(matches!(unknown, WebhookOutcome::Ignored(_)));

    let processing = h
        .engine
        .handle_verification_event(event(
            "identity.verification_session.processing",
            &session_id,
            &pass_id,
        ))
        .await
        .unwrap();
    assert!(matches!(processing, WebhookOutcome::Ignored(_)));

    let unrouted = h
        .engine
        .handle_verification_event(VerificationEvent {
            kind: VerificationEventKind::Verified,
            session_id: session_id.clone(),
            pass_id: None,
        })
        .await
        .unwrap();
    assert!(matches!(unrouted, WebhookOutcome::Ignored(_)));

    assert_eq!(h.pass(&pass_id).status, PassStatus::PendingVerification);
    assert!(h.wallet.issued().is_empty());
}

#[tokio::test]
async fn requires_input_fails_verification() {
    let h = Harness::new();
    let (pass_id, session_id) = pending(&h).await;
    let outcome = h
        .engine
        .handle_verification_event(event("requires_input", &session_id, &pass_id))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Applied(PassStatus::VerificationFailed)
    );
    assert!(h.wallet.issued().is_empty());

    let status = h
        .engine
        .verification_status(&pass_id, &session_id)
        .unwrap();
    assert_eq!(status.status, PassStatus::VerificationFailed);
    assert_eq!(status.message, "Verification failed");
}

#[tokio::test]
async fn store_outage_during_webhook_is_retryable() {
    let h = Harness::new();
    let (pass_id, session_id) = pending(&h).await;
    h.store.set_unavailable(true);
    let err = h
        .engine
        .handle_verification_event(event("verified", &session_id, &pass_id))
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    h.store.set_unavailable(false);
    assert_eq!(
        h.engine
            .handle_verification_event(event("verified", &session_id, &pass_id))
            .await
            .unwrap(),
        WebhookOutcome::Applied(PassStatus::Approved)
    );
}

#[tokio::test]
async fn verification_status_needs_the_matching_session() {
    let h = Harness::new();
    let (pass_id, session_id) = pending(&h).await;

    let status = h
        .engine
        .verification_status(&pass_id, &session_id)
        .unwrap();
    assert_eq!(status.status, PassStatus::PendingVerification);
    assert_eq!(status.wallet_url, None);
    assert!(matches!(
        h.engine.verification_status(&pass_id, "vs_other"),
        Err(PassError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn approved_guest_is_scheduled_then_admitted() {
    let h = Harness::new();
    let (pass_id, session_id) = pending(&h).await;
    h.engine
        .handle_verification_event(event("verified", &session_id, &pass_id))
        .await
        .unwrap();

    assert!(matches!(
        h.engine.approve(&pass_id, &h.stranger, true),
        Err(PassError::Forbidden(_))
    ));
    let view = h.engine.approve(&pass_id, &h.host, true).unwrap();
    assert_eq!(view.status, PassStatus::Scheduled);

    let door = h.engine.issue_door_token(&pass_id, &h.host).unwrap();
    let entry = h.engine.check_in(&door.token, &h.staff).unwrap();
    assert_eq!(entry.outcome, CheckInOutcome::CheckedIn);
    let left = h.engine.check_out(&pass_id, &h.staff).unwrap();
    assert_eq!(left.status, PassStatus::CheckedOut);
}

#[tokio::test]
async fn host_rejection_cancels() {
    let h = Harness::new();
    let (pass_id, session_id) = pending(&h).await;
    h.engine
        .handle_verification_event(event("verified", &session_id, &pass_id))
        .await
        .unwrap();
    let view = h.engine.approve(&pass_id, &h.host, false).unwrap();
    assert_eq!(view.status, PassStatus::Canceled);
    assert!(matches!(
        h.engine.approve(&pass_id, &h.host, true),
        Err(PassError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn invite_with_phone_sends_sms() {
    let h = Harness::new();
    let result = h
        .engine
        .invite(
            &h.host,
            InviteRequest {
                guest_phone: Some("+15550100".into()),
                visit_date: Some(date(6, 2)),
                ..InviteRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(result.delivery, Delivery::Sms);
    assert!(result.link.starts_with("https://guest.test/guest/complete?token="));
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+15550100");
    assert!(sent[0].1.contains(&result.link));
}

#[tokio::test]
async fn failed_sms_falls_back_to_link() {
    let h = Harness::new();
    h.notifier
        .fail_with(Some(GatewayError::Unavailable("sms".into())));
    let result = h
        .engine
        .invite(
            &h.host,
            InviteRequest {
                guest_phone: Some("+15550100".into()),
                visit_date: Some(date(6, 2)),
                ..InviteRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(result.delivery, Delivery::Link);
    assert_eq!(result.pass.status, PassStatus::Scheduled);
}

#[tokio::test]
async fn invite_validation() {
    let h = Harness::new();
    let no_contact = h
        .engine
        .invite(
            &h.host,
            InviteRequest {
                visit_date: Some(date(6, 2)),
                ..InviteRequest::default()
            },
        )
        .await;
    assert!(matches!(no_contact, Err(PassError::InvalidInput(_))));

    let past = h
        .engine
        .invite(
            &h.host,
            InviteRequest {
                guest_email: Some("ada@example.com".into()),
                visit_date: Some(date(5, 31)),
                ..InviteRequest::default()
            },
        )
        .await;
    assert!(matches!(past, Err(PassError::InvalidInput(_))));
}

#[tokio::test]
async fn unverified_hosts_cannot_invite() {
    let h = Harness::new();
    let unverified = add_resident(&h.store, "res-new", "New Tenant", false, Role::Resident);
    let result = h
        .engine
        .invite(
            &unverified,
            InviteRequest {
                guest_email: Some("ada@example.com".into()),
                visit_date: Some(date(6, 2)),
                ..InviteRequest::default()
            },
        )
        .await;
    assert!(matches!(result, Err(PassError::Forbidden(_))));
}

#[tokio::test]
async fn registered_pass_links_to_verification() {
    let h = Harness::new();
    let result = h
        .engine
        .register(
            &h.host,
            InviteRequest {
                guest_name: Some("Ada Lovelace".into()),
                guest_phone: Some("+15550100".into()),
                ..InviteRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(result.pass.status, PassStatus::Registered);
    assert_eq!(result.pass.visit_date, date(6, 1));
    assert!(result.link.contains("/guest/verify?token="));

    let started = h
        .engine
        .complete_registration(&token_of(&result.link), submission())
        .await
        .unwrap();
    let pass_id = PassId::parse(result.pass_id).unwrap();
    assert_eq!(
        h.pass(&pass_id).verification_session(),
        Some(started.session_id.as_str())
    );
}
