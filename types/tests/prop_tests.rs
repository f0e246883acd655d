use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use guestpass_types::{GuestIdentity, Pass, PassStatus, ResidentId, Timestamp};

fn any_status() -> impl Strategy<Value = PassStatus> {
    prop::sample::select(PassStatus::ALL.to_vec())
}

fn pass_on(visit: NaiveDate, status: PassStatus) -> Pass {
    let mut pass = Pass::new(
        ResidentId::parse("res-prop").unwrap(),
        GuestIdentity::default(),
        visit,
        PassStatus::Scheduled,
        Timestamp::new(0),
    );
    pass.status = status;
    pass
}

proptest! {
    /// A pass is never reported expired on or before its visit date.
    #[test]
    fn not_expired_until_visit_day_passes(status in any_status(), offset in 0i64..400) {
        let visit = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let today = visit - Duration::days(offset);
        let pass = pass_on(visit, status);
        prop_assert_eq!(pass.effective_status(today), status);
    }

    /// After the visit date only pre-entry passes change classification.
    #[test]
    fn expiry_only_touches_pre_entry(status in any_status(), offset in 1i64..400) {
        let visit = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let today = visit + Duration::days(offset);
        let effective = pass_on(visit, status).effective_status(today);
        if status.is_pre_entry() {
            prop_assert_eq!(effective, PassStatus::Expired);
        } else {
            prop_assert_eq!(effective, status);
        }
    }

    /// Terminal and pre-entry are disjoint.
    #[test]
    fn terminal_states_are_not_pre_entry(status in any_status()) {
        prop_assert!(!(status.is_terminal() && status.is_pre_entry()));
    }
}
