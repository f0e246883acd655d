#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use guestpass_crypto::{generate_nonce, Audience, KeyRing, TokenCodec, TokenRequest};
use guestpass_lifecycle::{
    Clock, EngineConfig, EngineDeps, InviteRequest, MemberProfile, PassEngine,
    RegistrationSubmission, Session,
};
use guestpass_nullables::{
    NullClock, NullMembership, NullNotifier, NullStore, NullVerificationGateway,
    NullWalletIssuer,
};
use guestpass_store::{PassStore, ResidentStore};
use guestpass_types::{
    BuildingCalendar, GuestIdentity, Pass, PassId, PassStatus, Resident, ResidentId, Role,
    Timestamp,
};

/// 2025-06-01T00:00:00Z
pub const JUNE_1: u64 = 1_748_736_000;
pub const HOUR: u64 = 3600;
pub const DAY: u64 = 24 * HOUR;

pub const ISSUER: &str = "guestpass.test";
pub const WALLET_SECRET: &[u8] = b"wallet-secret";

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

pub fn key_ring() -> KeyRing {
    KeyRing::new()
        .with_verify_only_key("k0", b"previous-signing-secret".to_vec())
        .with_signing_key("k1", b"current-signing-secret".to_vec())
}

pub struct Harness {
    pub engine: PassEngine,
    pub store: Arc<NullStore>,
    pub clock: Arc<NullClock>,
    pub verification: Arc<NullVerificationGateway>,
    pub notifier: Arc<NullNotifier>,
    pub wallet: Arc<NullWalletIssuer>,
    pub membership: Arc<NullMembership>,
    pub codec: TokenCodec,
    pub host: Session,
    pub staff: Session,
    pub stranger: Session,
}

impl Harness {
    /// Clock at 09:00 UTC on 2025-06-01.
    pub fn new() -> Self {
        Self::with_keys(key_ring())
    }

    pub fn with_keys(keys: KeyRing) -> Self {
        Self::build(keys, BuildingCalendar::utc())
    }

    /// Building clock `minutes` east of UTC; same 09:00 UTC start.
    pub fn in_offset_minutes(minutes: i32) -> Self {
        Self::build(key_ring(), BuildingCalendar::from_offset_minutes(minutes).unwrap())
    }

    fn build(keys: KeyRing, calendar: BuildingCalendar) -> Self {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(JUNE_1 + 9 * HOUR));
        let verification = Arc::new(NullVerificationGateway::new());
        let notifier = Arc::new(NullNotifier::new());
        let wallet = Arc::new(NullWalletIssuer::new());
        let membership = Arc::new(NullMembership::new().with_member(
            "cred-grace",
            MemberProfile {
                external_id: "member-grace".into(),
                name: "Grace Hopper".into(),
                email: Some("grace@example.com".into()),
                phone: None,
                unit: Some("12B".into()),
                verified_member: true,
                role: Role::Resident,
            },
        ));
        let codec = TokenCodec::new(ISSUER, keys);

        let engine = PassEngine::new(
            EngineDeps {
                store: store.clone(),
                clock: clock.clone(),
                codec: codec.clone(),
                wallet_secret: Some(WALLET_SECRET.to_vec()),
                verification: verification.clone(),
                notifier: notifier.clone(),
                wallet: wallet.clone(),
                membership: membership.clone(),
            },
            EngineConfig {
                public_base_url: "https://guest.test".into(),
                building_code: Some("FT001".into()),
                calendar,
                call_timeout: Duration::from_millis(200),
                ..EngineConfig::default()
            },
        );

        let host = add_resident(&store, "res-host", "Grace Hopper", true, Role::Resident);
        let staff = add_resident(&store, "res-staff", "Door Desk", true, Role::Staff);
        let stranger = add_resident(&store, "res-other", "Alan Turing", true, Role::Resident);

        Self {
            engine,
            store,
            clock,
            verification,
            notifier,
            wallet,
            membership,
            codec,
            host,
            staff,
            stranger,
        }
    }

    pub fn set_time(&self, secs: u64) {
        self.clock.set(secs);
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn pass(&self, id: &PassId) -> Pass {
        self.store.get_pass(id).unwrap()
    }

    /// Invite a guest (email only) and return the pass id and link token.
    pub async fn invite(&self, visit_date: NaiveDate) -> (PassId, String) {
        let result = self
            .engine
            .invite(
                &self.host,
                InviteRequest {
                    guest_name: Some("Ada Lovelace".into()),
                    guest_email: Some("ada@example.com".into()),
                    visit_date: Some(visit_date),
                    floor: Some("12".into()),
                    ..InviteRequest::default()
                },
            )
            .await
            .unwrap();
        (PassId::parse(&result.pass_id).unwrap(), token_of(&result.link))
    }

    /// A `scheduled` pass written straight to the store.
    pub fn scheduled_pass(&self, visit_date: NaiveDate) -> Pass {
        let pass = Pass::new(
            self.host.resident_id.clone(),
            GuestIdentity {
                name: "Ada Lovelace".into(),
                email: Some("ada@example.com".into()),
                phone: None,
            },
            visit_date,
            PassStatus::Scheduled,
            Timestamp::new(JUNE_1),
        );
        self.store.insert_pass(&pass).unwrap()
    }

    /// Door token minted directly, with an arbitrary lifetime.
    pub fn door_token(&self, pass: &Pass, ttl: u64) -> String {
        let now = self.clock.now();
        self.codec
            .mint(
                TokenRequest::new(Audience::DoorScanner, pass.id.as_str(), now.plus_secs(ttl))
                    .host(pass.resident_id.as_str())
                    .nonce(generate_nonce()),
                now,
            )
            .unwrap()
            .token
    }
}

pub fn add_resident(
    store: &NullStore,
    id: &str,
    name: &str,
    verified: bool,
    role: Role,
) -> Session {
    let resident = Resident {
        id: ResidentId::parse(id).unwrap(),
        external_id: format!("ext-{id}"),
        name: name.into(),
        email: None,
        phone: None,
        unit: Some("12B".into()),
        verified_member: verified,
        role,
        created_at: Timestamp::new(JUNE_1),
        last_login_at: Timestamp::new(JUNE_1),
    };
    store.put_resident(&resident).unwrap();
    Session {
        resident_id: resident.id,
        role,
    }
}

pub fn token_of(link: &str) -> String {
    link.split_once("token=").unwrap().1.to_string()
}

pub fn submission() -> RegistrationSubmission {
    RegistrationSubmission {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: Some("ada@example.com".into()),
        phone: "+15550100".into(),
        id_country: Some("GB".into()),
        id_type: Some("passport".into()),
        id_last4: Some("1234".into()),
        policy_version: Some("2025-01".into()),
    }
}
