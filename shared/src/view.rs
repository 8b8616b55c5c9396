use serde::{Deserialize, Serialize};

use crate::model::{Model, RecoveryLink};
use crate::preferences::DARK_MODE;
use crate::view_state::ViewTag;
use crate::AppError;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScreenView {
    Login {
        is_signing_in: bool,
        forgot_password_open: bool,
        is_sending_reset_email: bool,
    },
    SignUp {
        is_signing_up: bool,
        confirmation_open: bool,
    },
    Settings {
        dark_mode: bool,
        can_open_profile: bool,
        is_signing_out: bool,
    },
    Profile {
        is_loading: bool,
        is_saving: bool,
        gender: String,
        country: String,
        country_suggestions: Vec<String>,
        show_country_suggestions: bool,
        /// The pending selection's local preview, else the stored avatar.
        preview_url: Option<String>,
        has_pending_upload: bool,
        can_remove_avatar: bool,
    },
    Reset {
        is_updating: bool,
        link_invalid: bool,
    },
    Main,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub view: ViewTag,
    pub screen: ScreenView,
    pub avatar_url: Option<String>,
    pub dark_mode: bool,
    pub error: Option<UserFacingError>,
    pub notice: Option<String>,
    pub is_authenticated: bool,
    pub user_id: Option<String>,
}

fn screen(model: &Model, view: ViewTag) -> ScreenView {
    let overlays = model.navigator.overlays();
    match view {
        ViewTag::Login => ScreenView::Login {
            is_signing_in: model.in_flight.sign_in,
            forgot_password_open: overlays.forgot_password,
            is_sending_reset_email: model.in_flight.reset_email,
        },
        ViewTag::SignUp => ScreenView::SignUp {
            is_signing_up: model.in_flight.sign_up,
            confirmation_open: overlays.registration_confirmation,
        },
        ViewTag::Settings => ScreenView::Settings {
            dark_mode: model.preferences.get(&DARK_MODE),
            can_open_profile: model.session.is_authenticated(),
            is_signing_out: model.in_flight.sign_out,
        },
        ViewTag::Profile => {
            let sync = &model.profile;
            let draft = sync.draft();
            let pending = sync.pending_upload();
            ScreenView::Profile {
                is_loading: sync.is_loading(),
                is_saving: sync.is_saving(),
                gender: draft.gender.clone(),
                country: draft.country.value().to_string(),
                country_suggestions: draft.country.suggestions().to_vec(),
                show_country_suggestions: draft.country.is_open(),
                preview_url: pending
                    .map(|p| p.preview_url.clone())
                    .or_else(|| sync.avatar_url().map(str::to_string)),
                has_pending_upload: pending.is_some(),
                can_remove_avatar: sync.avatar_url().is_some() || pending.is_some(),
            }
        }
        ViewTag::Reset => ScreenView::Reset {
            is_updating: model.in_flight.password_update,
            link_invalid: model.recovery_link == RecoveryLink::Invalid,
        },
        ViewTag::Main => ScreenView::Main,
    }
}

#[must_use]
pub fn build(model: &Model) -> ViewModel {
    let view = model.navigator.current_view();
    ViewModel {
        view,
        screen: screen(model, view),
        avatar_url: model.profile.avatar_url().map(str::to_string),
        dark_mode: model.preferences.get(&DARK_MODE),
        error: model.active_error.as_ref().map(UserFacingError::from),
        notice: model.notice.clone(),
        is_authenticated: model.session.is_authenticated(),
        user_id: model.session.user_id().map(ToString::to_string),
    }
}
