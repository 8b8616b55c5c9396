use serde::{Deserialize, Serialize};
use std::fmt;

use crate::preferences::PreferenceStore;
use crate::profile::ProfileSync;
use crate::view_state::{Navigator, ViewTag};
use crate::AppError;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(UserId);

/// What the identity provider hands back for an established session.
/// The token itself stays in the shell.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionHandle {
    pub user_id: UserId,
}

/// Fields collected at sign-up and attached as identity metadata.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ProfileSeed {
    pub username: String,
    pub full_name: String,
    pub phone: String,
}

/// One row of `userProfiles`, keyed by the identity-provider user id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    #[serde(rename = "id")]
    pub user_id: UserId,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Profile {
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            gender: None,
            country: None,
            avatar_url: None,
        }
    }
}

/// Identifies one session lifetime. Every login or logout moves the
/// generation forward, so a response tagged with an older fence can be
/// recognised and dropped.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fence {
    pub user_id: UserId,
    pub generation: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<UserId>,
    generation: u64,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The fence for the live session, if any.
    #[must_use]
    pub fn fence(&self) -> Option<Fence> {
        self.user_id.as_ref().map(|user_id| Fence {
            user_id: user_id.clone(),
            generation: self.generation,
        })
    }

    pub fn begin(&mut self, user_id: UserId) -> Fence {
        self.generation = self.generation.wrapping_add(1);
        self.user_id = Some(user_id.clone());
        Fence {
            user_id,
            generation: self.generation,
        }
    }

    pub fn end(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.user_id = None;
    }
}

/// Requests that allow at most one outstanding call each.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct InFlight {
    pub sign_in: bool,
    pub sign_up: bool,
    pub sign_out: bool,
    pub reset_email: bool,
    pub password_update: bool,
}

/// Whether the session redeemed from a recovery link turned out usable.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecoveryLink {
    #[default]
    Unchecked,
    Valid,
    Invalid,
}

#[derive(Clone, Debug, Default)]
pub struct Model {
    pub started: bool,
    pub page_url: Option<String>,

    pub navigator: Navigator,
    /// Last tag announced to the shell.
    pub announced_view: Option<ViewTag>,

    pub session: Session,
    pub recovery_link: RecoveryLink,
    pub in_flight: InFlight,

    pub profile: ProfileSync,
    pub preferences: PreferenceStore,

    pub active_error: Option<AppError>,
    pub notice: Option<String>,
}

impl Model {
    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_session_change_moves_the_fence() {
        let mut session = Session::default();
        assert!(session.fence().is_none());

        let first = session.begin(UserId::new("u1"));
        assert_eq!(session.fence(), Some(first.clone()));

        session.end();
        assert!(!session.is_authenticated());

        let second = session.begin(UserId::new("u1"));
        assert_eq!(first.user_id, second.user_id);
        assert_ne!(first, second);
    }

    #[test]
    fn profile_row_uses_column_names() {
        let row: Profile = serde_json::from_str(
            r#"{"id":"u1","gender":"female","country":null,"avatar_url":"https://cdn/a.png"}"#,
        )
        .unwrap();
        assert_eq!(row.user_id, UserId::new("u1"));
        assert_eq!(row.gender.as_deref(), Some("female"));
        assert_eq!(row.country, None);

        let partial: Profile = serde_json::from_str(r#"{"id":"u2"}"#).unwrap();
        assert_eq!(partial, Profile::empty(UserId::new("u2")));
    }
}
