//! Session Gateway capability.
//!
//! The only route from the core to the identity provider, object storage and
//! row store. The shell performs the network call for each
//! [`GatewayOperation`] and answers with a [`GatewayResult`]; the core never
//! sees transport details, only the classified failure.

use crux_core::capability::{CapabilityContext, Operation};
use crux_core::macros::Capability;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::avatar::AvatarFile;
use crate::event::Secret;
use crate::model::{Profile, ProfileSeed, SessionHandle, UserId};
use crate::profile::ProfilePatch;

/// PostgREST code for "no rows returned" on a single-row select.
pub const NO_ROWS_CODE: &str = "PGRST116";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GatewayOperation {
    SignIn {
        email: String,
        password: Secret,
    },
    SignUp {
        email: String,
        password: Secret,
        seed: ProfileSeed,
    },
    SignOut,
    GetCurrentUser,
    RequestPasswordReset {
        email: String,
    },
    UpdatePassword {
        new_password: Secret,
    },
    /// Upload into the avatar bucket and answer with the object's public URL.
    UploadAvatar {
        user_id: UserId,
        path: String,
        file: AvatarFile,
    },
    /// Merge `patch` into the row keyed by `user_id`, inserting it if absent.
    UpsertProfile {
        user_id: UserId,
        patch: ProfilePatch,
    },
    FetchProfile {
        user_id: UserId,
    },
}

impl GatewayOperation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SignIn { .. } => "sign_in",
            Self::SignUp { .. } => "sign_up",
            Self::SignOut => "sign_out",
            Self::GetCurrentUser => "get_current_user",
            Self::RequestPasswordReset { .. } => "request_password_reset",
            Self::UpdatePassword { .. } => "update_password",
            Self::UploadAvatar { .. } => "upload_avatar",
            Self::UpsertProfile { .. } => "upsert_profile",
            Self::FetchProfile { .. } => "fetch_profile",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GatewayOutput {
    Session(SessionHandle),
    Done,
    CurrentUser(Option<UserId>),
    PublicUrl(String),
    Profile(Profile),
    MaybeProfile(Option<Profile>),
}

impl GatewayOutput {
    fn unexpected(self, expected: &str) -> GatewayError {
        GatewayError::UnexpectedOutput {
            expected: expected.to_string(),
            found: format!("{self:?}"),
        }
    }

    pub fn into_session(self) -> Result<SessionHandle, GatewayError> {
        match self {
            Self::Session(handle) => Ok(handle),
            other => Err(other.unexpected("session")),
        }
    }

    pub fn into_done(self) -> Result<(), GatewayError> {
        match self {
            Self::Done => Ok(()),
            other => Err(other.unexpected("done")),
        }
    }

    pub fn into_current_user(self) -> Result<Option<UserId>, GatewayError> {
        match self {
            Self::CurrentUser(user) => Ok(user),
            other => Err(other.unexpected("current_user")),
        }
    }

    pub fn into_public_url(self) -> Result<String, GatewayError> {
        match self {
            Self::PublicUrl(url) => Ok(url),
            other => Err(other.unexpected("public_url")),
        }
    }

    pub fn into_profile(self) -> Result<Profile, GatewayError> {
        match self {
            Self::Profile(profile) => Ok(profile),
            other => Err(other.unexpected("profile")),
        }
    }

    /// Accepts both the optional and the plain profile shapes, since some
    /// backends answer a single-row select with the row itself.
    pub fn into_maybe_profile(self) -> Result<Option<Profile>, GatewayError> {
        match self {
            Self::MaybeProfile(profile) => Ok(profile),
            Self::Profile(profile) => Ok(Some(profile)),
            other => Err(other.unexpected("maybe_profile")),
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum GatewayError {
    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("permission denied: {message}")]
    Permission { message: String },

    #[error("network failure: {message}")]
    Network { message: String },

    #[error("operation timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("not found")]
    NotFound,

    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected gateway output: expected {expected}, found {found}")]
    UnexpectedOutput { expected: String, found: String },
}

impl GatewayError {
    /// Classify a backend rejection for shells that only see a status code
    /// and an error body.
    #[must_use]
    pub fn classify(status: u16, message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("row-level security") || lower.contains("row level security") {
            return Self::Permission {
                message: message.to_string(),
            };
        }
        if message.contains(NO_ROWS_CODE) {
            return Self::NotFound;
        }

        match status {
            400 if lower.contains("invalid_grant") || lower.contains("invalid login") => {
                Self::Auth {
                    message: message.to_string(),
                }
            }
            401 => Self::Auth {
                message: message.to_string(),
            },
            403 => Self::Permission {
                message: message.to_string(),
            },
            404 | 406 => Self::NotFound,
            408 => Self::Timeout { timeout_ms: 0 },
            _ => Self::Rejected {
                status,
                message: message.to_string(),
            },
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

pub type GatewayResult = Result<GatewayOutput, GatewayError>;

impl Operation for GatewayOperation {
    type Output = GatewayResult;
}

#[derive(Capability)]
pub struct Gateway<Ev> {
    context: CapabilityContext<GatewayOperation, Ev>,
}

impl<Ev> Gateway<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<GatewayOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn sign_in<F>(&self, email: impl Into<String>, password: Secret, make_event: F)
    where
        F: FnOnce(GatewayResult) -> Ev + Send + 'static,
    {
        self.request(
            GatewayOperation::SignIn {
                email: email.into(),
                password,
            },
            make_event,
        );
    }

    pub fn sign_up<F>(
        &self,
        email: impl Into<String>,
        password: Secret,
        seed: ProfileSeed,
        make_event: F,
    ) where
        F: FnOnce(GatewayResult) -> Ev + Send + 'static,
    {
        self.request(
            GatewayOperation::SignUp {
                email: email.into(),
                password,
                seed,
            },
            make_event,
        );
    }

    pub fn sign_out<F>(&self, make_event: F)
    where
        F: FnOnce(GatewayResult) -> Ev + Send + 'static,
    {
        self.request(GatewayOperation::SignOut, make_event);
    }

    pub fn get_current_user<F>(&self, make_event: F)
    where
        F: FnOnce(GatewayResult) -> Ev + Send + 'static,
    {
        self.request(GatewayOperation::GetCurrentUser, make_event);
    }

    pub fn request_password_reset<F>(&self, email: impl Into<String>, make_event: F)
    where
        F: FnOnce(GatewayResult) -> Ev + Send + 'static,
    {
        self.request(
            GatewayOperation::RequestPasswordReset {
                email: email.into(),
            },
            make_event,
        );
    }

    pub fn update_password<F>(&self, new_password: Secret, make_event: F)
    where
        F: FnOnce(GatewayResult) -> Ev + Send + 'static,
    {
        self.request(GatewayOperation::UpdatePassword { new_password }, make_event);
    }

    pub fn upload_avatar<F>(&self, user_id: UserId, path: String, file: AvatarFile, make_event: F)
    where
        F: FnOnce(GatewayResult) -> Ev + Send + 'static,
    {
        self.request(
            GatewayOperation::UploadAvatar {
                user_id,
                path,
                file,
            },
            make_event,
        );
    }

    pub fn upsert_profile<F>(&self, user_id: UserId, patch: ProfilePatch, make_event: F)
    where
        F: FnOnce(GatewayResult) -> Ev + Send + 'static,
    {
        self.request(GatewayOperation::UpsertProfile { user_id, patch }, make_event);
    }

    pub fn fetch_profile<F>(&self, user_id: UserId, make_event: F)
    where
        F: FnOnce(GatewayResult) -> Ev + Send + 'static,
    {
        self.request(GatewayOperation::FetchProfile { user_id }, make_event);
    }

    fn request<F>(&self, operation: GatewayOperation, make_event: F)
    where
        F: FnOnce(GatewayResult) -> Ev + Send + 'static,
    {
        tracing::debug!(op = operation.name(), "gateway request");

        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(make_event(result));
        });
    }
}
