//! Profile synchronisation.
//!
//! Owns the authoritative copy of the signed-in user's row, the editable
//! draft over it, and the bookkeeping that keeps late responses from
//! landing on the wrong session. Every request carries a ticket; a response
//! is applied only if its ticket is still the outstanding one and its fence
//! matches the live session.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::avatar::{self, AvatarFile, PendingUpload};
use crate::capabilities::GatewayError;
use crate::countries::{CountryField, CountryIndex};
use crate::forms::ValidationError;
use crate::model::{Fence, Profile};
use crate::{AppError, ErrorKind};

/// A column edit in an upsert: leave the stored value alone, clear it, or
/// replace it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    #[default]
    Unchanged,
    Clear,
    Set(T),
}

impl<T> FieldUpdate<T> {
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    pub fn apply_to(self, current: &mut Option<T>) {
        match self {
            Self::Unchanged => {}
            Self::Clear => *current = None,
            Self::Set(value) => *current = Some(value),
        }
    }
}

impl FieldUpdate<String> {
    /// Compare an edited text field against what is stored. Blank input
    /// clears a stored value and otherwise leaves the column untouched.
    #[must_use]
    pub fn diff(stored: Option<&str>, edited: &str) -> Self {
        let edited = edited.trim();
        match (stored, edited.is_empty()) {
            (Some(_), true) => Self::Clear,
            (None, true) => Self::Unchanged,
            (Some(current), false) if current == edited => Self::Unchanged,
            (_, false) => Self::Set(edited.to_string()),
        }
    }
}

// `Unchanged` is expected to be skipped by the containing struct.
impl<T: Serialize> Serialize for FieldUpdate<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unchanged | Self::Clear => serializer.serialize_none(),
            Self::Set(value) => serializer.serialize_some(value),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Self::Clear, Self::Set))
    }
}

/// Column changes for one upsert. Omitted columns keep their stored value;
/// `null` clears one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub gender: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub country: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub avatar_url: FieldUpdate<String>,
}

impl ProfilePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gender.is_unchanged() && self.country.is_unchanged() && self.avatar_url.is_unchanged()
    }

    /// Merge into `profile` the way the row store does.
    pub fn apply_to(&self, profile: &mut Profile) {
        self.gender.clone().apply_to(&mut profile.gender);
        self.country.clone().apply_to(&mut profile.country);
        self.avatar_url.clone().apply_to(&mut profile.avatar_url);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub fence: Fence,
    pub seq: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SaveTicket {
    pub op_id: Uuid,
    pub fence: Fence,
    pub patch: ProfilePatch,
}

/// The next gateway call a save needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStep {
    Upload {
        ticket: SaveTicket,
        path: String,
        file: AvatarFile,
    },
    Upsert {
        ticket: SaveTicket,
    },
}

/// What a save does with the avatar column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarEdit {
    /// Upload the pending selection if any, and save the text fields.
    /// `now_ms` names the uploaded object.
    Keep { now_ms: u64 },
    /// Clear the avatar and nothing else.
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Applied { avatar_changed: bool },
    Stale,
    Failed(AppError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Continue(SaveStep),
    Stale,
    Failed(AppError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved { avatar_url: Option<String> },
    Stale,
    Failed(AppError),
}

/// Editable copies of the text fields.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub gender: String,
    pub country: CountryField,
}

impl ProfileDraft {
    fn from_profile(profile: Option<&Profile>) -> Self {
        Self {
            gender: profile.and_then(|p| p.gender.clone()).unwrap_or_default(),
            country: CountryField::with_value(
                profile.and_then(|p| p.country.clone()).unwrap_or_default(),
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileSync {
    profile: Option<Profile>,
    draft: ProfileDraft,
    pending_upload: Option<PendingUpload>,
    loading: Option<LoadTicket>,
    saving: Option<SaveTicket>,
    next_seq: u64,
}

impl ProfileSync {
    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.avatar_url.as_deref())
    }

    #[must_use]
    pub fn draft(&self) -> &ProfileDraft {
        &self.draft
    }

    #[must_use]
    pub fn pending_upload(&self) -> Option<&PendingUpload> {
        self.pending_upload.as_ref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.saving.is_some()
    }

    /// Start a fetch for `fence`, unless one for the same session is already
    /// out.
    pub fn begin_load(&mut self, fence: Fence) -> Option<LoadTicket> {
        if self.loading.as_ref().is_some_and(|t| t.fence == fence) {
            return None;
        }
        self.next_seq += 1;
        let ticket = LoadTicket {
            fence,
            seq: self.next_seq,
        };
        self.loading = Some(ticket.clone());
        Some(ticket)
    }

    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        active: Option<&Fence>,
        result: Result<Option<Profile>, GatewayError>,
    ) -> LoadOutcome {
        if self.loading.as_ref() != Some(ticket) || active != Some(&ticket.fence) {
            return LoadOutcome::Stale;
        }
        self.loading = None;

        let row = match result {
            Ok(row) => row,
            // No row yet is an empty profile, not a failure.
            Err(GatewayError::NotFound) => None,
            Err(e) => return LoadOutcome::Failed(e.into()),
        };

        let before = self.avatar_url().map(str::to_string);
        let profile = row.unwrap_or_else(|| Profile::empty(ticket.fence.user_id.clone()));
        self.draft = ProfileDraft::from_profile(Some(&profile));
        self.profile = Some(profile);

        LoadOutcome::Applied {
            avatar_changed: before.as_deref() != self.avatar_url(),
        }
    }

    pub fn set_gender(&mut self, value: impl Into<String>) {
        self.draft.gender = value.into();
    }

    pub fn edit_country(&mut self, value: impl Into<String>) {
        self.draft.country.input(value, &CountryIndex::default());
    }

    pub fn focus_country(&mut self) {
        self.draft.country.focus();
    }

    pub fn select_country(&mut self, name: impl Into<String>) {
        self.draft.country.select(name);
    }

    pub fn stage_upload(
        &mut self,
        file: AvatarFile,
        preview_url: impl Into<String>,
    ) -> Result<(), ValidationError> {
        avatar::validate(&file)?;
        self.pending_upload = Some(PendingUpload {
            file,
            preview_url: preview_url.into(),
        });
        Ok(())
    }

    pub fn discard_upload(&mut self) {
        self.pending_upload = None;
    }

    /// Leaving the editor drops the unsaved selection and edits.
    pub fn end_editing(&mut self) {
        self.pending_upload = None;
        self.draft = ProfileDraft::from_profile(self.profile.as_ref());
    }

    pub fn begin_save(
        &mut self,
        fence: Fence,
        avatar: AvatarEdit,
    ) -> Result<SaveStep, AppError> {
        if self.saving.is_some() {
            return Err(AppError::busy("save"));
        }

        let stored = self.profile.as_ref();
        let patch = match avatar {
            AvatarEdit::Remove => ProfilePatch {
                avatar_url: FieldUpdate::Clear,
                ..ProfilePatch::default()
            },
            AvatarEdit::Keep { .. } => ProfilePatch {
                gender: FieldUpdate::diff(
                    stored.and_then(|p| p.gender.as_deref()),
                    &self.draft.gender,
                ),
                country: FieldUpdate::diff(
                    stored.and_then(|p| p.country.as_deref()),
                    self.draft.country.value(),
                ),
                avatar_url: FieldUpdate::Unchanged,
            },
        };

        let ticket = SaveTicket {
            op_id: Uuid::new_v4(),
            fence,
            patch,
        };

        let step = match (avatar, &self.pending_upload) {
            (AvatarEdit::Keep { now_ms }, Some(pending)) => SaveStep::Upload {
                path: avatar::storage_path(&ticket.fence.user_id, &pending.file, now_ms),
                file: pending.file.clone(),
                ticket: ticket.clone(),
            },
            _ => SaveStep::Upsert {
                ticket: ticket.clone(),
            },
        };

        if avatar == AvatarEdit::Remove {
            self.pending_upload = None;
        }
        self.draft.country.close();
        self.saving = Some(ticket);
        Ok(step)
    }

    fn owns(&self, ticket: &SaveTicket, active: Option<&Fence>) -> bool {
        self.saving.as_ref().map(|t| t.op_id) == Some(ticket.op_id) && active == Some(&ticket.fence)
    }

    pub fn finish_upload(
        &mut self,
        ticket: &SaveTicket,
        active: Option<&Fence>,
        result: Result<String, GatewayError>,
    ) -> UploadOutcome {
        if !self.owns(ticket, active) {
            return UploadOutcome::Stale;
        }

        match result {
            Ok(public_url) => {
                let mut next = ticket.clone();
                next.patch.avatar_url = FieldUpdate::Set(public_url);
                self.saving = Some(next.clone());
                UploadOutcome::Continue(SaveStep::Upsert { ticket: next })
            }
            Err(e) => {
                self.saving = None;
                UploadOutcome::Failed(e.into())
            }
        }
    }

    pub fn finish_save(
        &mut self,
        ticket: &SaveTicket,
        active: Option<&Fence>,
        result: Result<Profile, GatewayError>,
    ) -> SaveOutcome {
        if !self.owns(ticket, active) {
            return SaveOutcome::Stale;
        }
        self.saving = None;

        match result {
            Ok(row) if row.user_id != ticket.fence.user_id => SaveOutcome::Failed(
                AppError::new(ErrorKind::Internal, "Saved profile belongs to another user")
                    .with_context("user_id", row.user_id.to_string()),
            ),
            Ok(row) => {
                // The returned row is newer than anything a pending fetch
                // could bring back.
                self.loading = None;
                if !ticket.patch.avatar_url.is_unchanged() {
                    self.pending_upload = None;
                }
                self.draft = ProfileDraft::from_profile(Some(&row));
                let avatar_url = row.avatar_url.clone();
                self.profile = Some(row);
                SaveOutcome::Saved { avatar_url }
            }
            Err(e) => SaveOutcome::Failed(e.into()),
        }
    }

    /// Drop everything tied to the session that just ended.
    pub fn clear(&mut self) {
        self.profile = None;
        self.draft = ProfileDraft::default();
        self.pending_upload = None;
        self.loading = None;
        self.saving = None;
    }
}
