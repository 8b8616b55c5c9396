use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

use crate::avatar::AvatarFile;
use crate::capabilities::{GatewayResult, KvResult};
use crate::model::ProfileSeed;
use crate::profile::{LoadTicket, SaveTicket};
use crate::view_state::ViewTag;

// --- Secret wrapper: redacts Debug, zeroizes on Drop ---

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(s: String) -> Self {
        Self(s)
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

// --- Event enum: capability responses boxed ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    /// First event from the shell, carrying the page URL as loaded.
    AppStarted {
        url: String,
    },

    // Navigation
    OpenScreen {
        view: ViewTag,
    },
    CloseScreen,
    ToggleAuthForm,
    ForgotPasswordOpened,
    ForgotPasswordClosed,
    RegistrationConfirmationDismissed,

    // Auth
    SignInRequested {
        email: String,
        password: Secret,
    },
    SignUpRequested {
        email: String,
        password: Secret,
        seed: ProfileSeed,
    },
    SignOutRequested,
    PasswordResetEmailRequested {
        email: String,
    },
    UpdatePasswordRequested {
        new_password: Secret,
        confirm_password: Secret,
    },

    // Profile editing
    GenderEdited {
        value: String,
    },
    CountryEdited {
        value: String,
    },
    CountryFocused,
    CountrySuggestionSelected {
        name: String,
    },
    AvatarSelected {
        file: AvatarFile,
        /// Local object URL the shell made for the selected file.
        preview_url: String,
    },
    AvatarDiscarded,
    /// `now_ms` names the uploaded object, so it comes from the shell clock.
    SaveProfileRequested {
        now_ms: u64,
    },
    RemoveAvatarRequested,

    // Preferences
    DarkModeToggled,

    DismissError,
    DismissNotice,

    // Capability Responses (boxed to keep enum size small)
    CurrentUserResolved {
        recovery: bool,
        result: Box<GatewayResult>,
    },
    SignInCompleted(Box<GatewayResult>),
    SignUpCompleted(Box<GatewayResult>),
    SignOutCompleted(Box<GatewayResult>),
    PasswordResetEmailSent(Box<GatewayResult>),
    PasswordUpdated(Box<GatewayResult>),
    ProfileFetched {
        ticket: LoadTicket,
        result: Box<GatewayResult>,
    },
    AvatarUploaded {
        ticket: Box<SaveTicket>,
        result: Box<GatewayResult>,
    },
    ProfileUpserted {
        ticket: Box<SaveTicket>,
        result: Box<GatewayResult>,
    },
    PreferenceRead {
        key: String,
        result: Box<KvResult>,
    },
    PreferenceWritten {
        key: String,
        result: Box<KvResult>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted { .. } => "app_started",
            Self::OpenScreen { .. } => "open_screen",
            Self::CloseScreen => "close_screen",
            Self::ToggleAuthForm => "toggle_auth_form",
            Self::ForgotPasswordOpened => "forgot_password_opened",
            Self::ForgotPasswordClosed => "forgot_password_closed",
            Self::RegistrationConfirmationDismissed => "registration_confirmation_dismissed",
            Self::SignInRequested { .. } => "sign_in_requested",
            Self::SignUpRequested { .. } => "sign_up_requested",
            Self::SignOutRequested => "sign_out_requested",
            Self::PasswordResetEmailRequested { .. } => "password_reset_email_requested",
            Self::UpdatePasswordRequested { .. } => "update_password_requested",
            Self::GenderEdited { .. } => "gender_edited",
            Self::CountryEdited { .. } => "country_edited",
            Self::CountryFocused => "country_focused",
            Self::CountrySuggestionSelected { .. } => "country_suggestion_selected",
            Self::AvatarSelected { .. } => "avatar_selected",
            Self::AvatarDiscarded => "avatar_discarded",
            Self::SaveProfileRequested { .. } => "save_profile_requested",
            Self::RemoveAvatarRequested => "remove_avatar_requested",
            Self::DarkModeToggled => "dark_mode_toggled",
            Self::DismissError => "dismiss_error",
            Self::DismissNotice => "dismiss_notice",
            Self::CurrentUserResolved { .. } => "current_user_resolved",
            Self::SignInCompleted(_) => "sign_in_completed",
            Self::SignUpCompleted(_) => "sign_up_completed",
            Self::SignOutCompleted(_) => "sign_out_completed",
            Self::PasswordResetEmailSent(_) => "password_reset_email_sent",
            Self::PasswordUpdated(_) => "password_updated",
            Self::ProfileFetched { .. } => "profile_fetched",
            Self::AvatarUploaded { .. } => "avatar_uploaded",
            Self::ProfileUpserted { .. } => "profile_upserted",
            Self::PreferenceRead { .. } => "preference_read",
            Self::PreferenceWritten { .. } => "preference_written",
        }
    }

    /// Events raised by the shell on behalf of the user, as opposed to
    /// capability responses.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::AppStarted { .. }
                | Self::CurrentUserResolved { .. }
                | Self::SignInCompleted(_)
                | Self::SignUpCompleted(_)
                | Self::SignOutCompleted(_)
                | Self::PasswordResetEmailSent(_)
                | Self::PasswordUpdated(_)
                | Self::ProfileFetched { .. }
                | Self::AvatarUploaded { .. }
                | Self::ProfileUpserted { .. }
                | Self::PreferenceRead { .. }
                | Self::PreferenceWritten { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_is_redacted() {
        let s = Secret::new("super_secret".into());
        assert_eq!(format!("{s:?}"), "[REDACTED]");
        assert_eq!(s.expose(), "super_secret");
    }

    #[test]
    fn secret_serializes_as_plain_string() {
        let s = Secret::from("pw123456");
        assert_eq!(serde_json::to_string(&s).unwrap(), r#""pw123456""#);
    }

    #[test]
    fn sign_in_event_never_prints_password() {
        let event = Event::SignInRequested {
            email: "a@b.c".into(),
            password: Secret::from("hunter22"),
        };
        assert!(!format!("{event:?}").contains("hunter22"));
        assert!(event.is_user_initiated());
    }

    #[test]
    fn capability_responses_are_not_user_initiated() {
        let event = Event::SignOutCompleted(Box::new(Ok(
            crate::capabilities::GatewayOutput::Done,
        )));
        assert!(!event.is_user_initiated());
        assert_eq!(event.name(), "sign_out_completed");
    }

    #[test]
    fn event_size_is_reasonable() {
        let size = std::mem::size_of::<Event>();
        assert!(
            size <= 160,
            "Event enum is {size} bytes, box more variants"
        );
    }
}
