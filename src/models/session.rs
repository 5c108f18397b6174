use crate::models::Attributes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A time-bounded authentication grant tying a client to a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    /// Past this instant the session turns idle and read paths reject it.
    pub active_expires: DateTime<Utc>,
    /// Past this instant the session is dead and no longer renewable.
    pub idle_expires: DateTime<Utc>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    /// Past the active deadline but still renewable by write paths.
    Idle,
    Dead,
}

impl Session {
    /// State is a pure function of the clock versus the two deadlines.
    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        if now < self.active_expires {
            SessionState::Active
        } else if now < self.idle_expires {
            SessionState::Idle
        } else {
            SessionState::Dead
        }
    }

    pub fn is_dead(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == SessionState::Dead
    }
}

/// Partial update for a session row. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub active_expires: Option<DateTime<Utc>>,
    pub idle_expires: Option<DateTime<Utc>>,
    /// Attribute keys to merge onto the stored record.
    pub attributes: Option<Attributes>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn session(active: i64, idle: i64) -> Session {
        Session {
            id: "s".to_string(),
            user_id: "u".to_string(),
            active_expires: DateTime::from_timestamp(active, 0).unwrap(),
            idle_expires: DateTime::from_timestamp(idle, 0).unwrap(),
            attributes: Attributes::new(),
        }
    }

    #[test]
    fn deadlines_are_exclusive() {
        let s = session(100, 200);
        let at = |secs| DateTime::from_timestamp(secs, 0).unwrap();
        assert_eq!(s.state(at(99)), SessionState::Active);
        assert_eq!(s.state(at(100)), SessionState::Idle);
        assert_eq!(s.state(at(199)), SessionState::Idle);
        assert_eq!(s.state(at(200)), SessionState::Dead);
    }

    proptest! {
        #[test]
        fn state_partitions_the_timeline(active in 0i64..100_000, span in 1i64..100_000, now in -1_000i64..201_000) {
            let s = session(active, active + span);
            let now = DateTime::from_timestamp(now, 0).unwrap();
            let expected = if now < s.active_expires {
                SessionState::Active
            } else if now < s.idle_expires {
                SessionState::Idle
            } else {
                SessionState::Dead
            };
            prop_assert_eq!(s.state(now), expected);
            prop_assert_eq!(s.is_dead(now), expected == SessionState::Dead);
        }
    }
}
