//! Which screen is showing.
//!
//! The visible screen is derived, never stored: a fixed priority over the
//! recovery flag, the two screen toggles, the session flag and the selected
//! auth form decides it. Transitions only ever flip those inputs.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViewTag {
    Login,
    SignUp,
    Settings,
    Profile,
    Reset,
    Main,
}

impl ViewTag {
    pub const ALL: [ViewTag; 6] = [
        ViewTag::Login,
        ViewTag::SignUp,
        ViewTag::Settings,
        ViewTag::Profile,
        ViewTag::Reset,
        ViewTag::Main,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::SignUp => "sign_up",
            Self::Settings => "settings",
            Self::Profile => "profile",
            Self::Reset => "reset",
            Self::Main => "main",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthForm {
    #[default]
    Login,
    SignUp,
}

/// Lifecycle of a recovery link found in the page URL. Once consumed it
/// stays consumed until the next page load builds a fresh navigator.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecoveryState {
    #[default]
    Absent,
    Pending,
    Consumed,
}

/// Dialogs layered over the auth forms; they never change the tag.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Overlays {
    pub forgot_password: bool,
    pub registration_confirmation: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Navigator {
    recovery: RecoveryState,
    settings_open: bool,
    profile_open: bool,
    authenticated: bool,
    auth_form: AuthForm,
    overlays: Overlays,
}

impl Navigator {
    #[must_use]
    pub fn new(recovery_link: bool) -> Self {
        Self {
            recovery: if recovery_link {
                RecoveryState::Pending
            } else {
                RecoveryState::Absent
            },
            ..Self::default()
        }
    }

    /// Reset > Settings > Profile > Main (signed in) > Login/SignUp.
    #[must_use]
    pub fn current_view(&self) -> ViewTag {
        if self.recovery == RecoveryState::Pending {
            ViewTag::Reset
        } else if self.settings_open {
            ViewTag::Settings
        } else if self.profile_open {
            ViewTag::Profile
        } else if self.authenticated {
            ViewTag::Main
        } else {
            match self.auth_form {
                AuthForm::Login => ViewTag::Login,
                AuthForm::SignUp => ViewTag::SignUp,
            }
        }
    }

    #[must_use]
    pub fn recovery_pending(&self) -> bool {
        self.recovery == RecoveryState::Pending
    }

    #[must_use]
    pub fn recovery_state(&self) -> RecoveryState {
        self.recovery
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    #[must_use]
    pub fn auth_form(&self) -> AuthForm {
        self.auth_form
    }

    #[must_use]
    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    /// Records a login attempt. Returns true only when this call moved the
    /// navigator into the signed-in state.
    pub fn request_login(&mut self, success: bool) -> bool {
        if !success || self.authenticated {
            return false;
        }
        self.authenticated = true;
        self.settings_open = false;
        self.overlays = Overlays::default();
        true
    }

    pub fn request_logout(&mut self) {
        self.authenticated = false;
        self.settings_open = false;
        self.profile_open = false;
        self.auth_form = AuthForm::Login;
        self.overlays = Overlays::default();
    }

    /// Opens a screen on user request. Reset is only reachable through a
    /// recovery link and Profile only with a session; both requests are
    /// ignored otherwise. Returns whether anything changed.
    pub fn open_screen(&mut self, tag: ViewTag) -> bool {
        let before = self.clone();
        match tag {
            ViewTag::Reset => {}
            ViewTag::Settings => self.settings_open = true,
            ViewTag::Profile => {
                if self.authenticated {
                    self.settings_open = false;
                    self.profile_open = true;
                }
            }
            ViewTag::Main => {
                self.settings_open = false;
                self.profile_open = false;
            }
            ViewTag::Login | ViewTag::SignUp => {
                self.settings_open = false;
                self.profile_open = false;
                self.overlays = Overlays::default();
                self.auth_form = if tag == ViewTag::Login {
                    AuthForm::Login
                } else {
                    AuthForm::SignUp
                };
            }
        }
        *self != before
    }

    /// Back out of the topmost toggled screen.
    pub fn close_screen(&mut self) -> bool {
        if self.settings_open {
            self.settings_open = false;
            true
        } else if self.profile_open {
            self.profile_open = false;
            true
        } else {
            false
        }
    }

    pub fn toggle_auth_form(&mut self) {
        self.auth_form = match self.auth_form {
            AuthForm::Login => AuthForm::SignUp,
            AuthForm::SignUp => AuthForm::Login,
        };
        self.overlays = Overlays::default();
    }

    pub fn set_forgot_password(&mut self, open: bool) {
        self.overlays.forgot_password = open;
    }

    pub fn set_registration_confirmation(&mut self, open: bool) {
        self.overlays.registration_confirmation = open;
    }

    /// Ends the recovery flow and drops back to Login. Returns false when
    /// there was no pending recovery.
    pub fn complete_reset(&mut self) -> bool {
        if self.recovery != RecoveryState::Pending {
            return false;
        }
        self.recovery = RecoveryState::Consumed;
        self.request_logout();
        true
    }
}
