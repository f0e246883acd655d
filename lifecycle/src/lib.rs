//! Guest pass lifecycle engine.
//!
//! A pass moves `invited | registered | scheduled -> pending_verification ->
//! approved -> scheduled -> checked_in -> checked_out`, with
//! `verification_failed`, `verification_canceled` and `canceled` as side
//! exits and `expired` derived at read time once the visit day has passed.
//!
//! Three guarantees are enforced here:
//! 1. **Single use**: completion tokens carry a nonce that the consuming
//!    write clears.
//! 2. **Idempotent check-in**: the used-token ledger and the pass update are
//!    written atomically; replays return the recorded outcome.
//! 3. **Day gating**: entry only on the visit day, building-local.
//!
//! External collaborators (identity provider, SMS, wallet signing,
//! membership) sit behind the traits in [`gateway`].

pub mod admin;
pub mod checkin;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod guards;
pub mod invite;
pub mod registration;
pub mod session;
pub mod state;
pub mod verification;
pub mod view;

pub use checkin::{CheckInOutcome, CheckInResult, DoorToken};
pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use dashboard::{ActivityEvent, ActivityKind, DashboardMetrics, RecentActivity};
pub use engine::{EngineDeps, PassEngine};
pub use error::PassError;
pub use gateway::{
    GatewayError, MemberProfile, MembershipProvider, Notifier, VerificationGateway,
    VerificationRequest, VerificationSession, WalletArtifact, WalletIssuer, WalletPassRequest,
};
pub use invite::{Delivery, InvitationDetails, InviteRequest, InviteResult};
pub use registration::{RegistrationStarted, RegistrationSubmission, VerificationStatusView};
pub use session::{Session, SessionGrant};
pub use state::{next_status, PassEvent};
pub use verification::{VerificationEvent, VerificationEventKind, WebhookOutcome};
pub use view::{GuardView, PassView};
