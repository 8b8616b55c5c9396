use tracing::{debug, error, info, warn};

use crate::capabilities::{
    Capabilities, GatewayOutput, GatewayResult, KeyNamespace, KvKey, KvOutput, KvResult,
};
use crate::countries::CountryIndex;
use crate::event::{Event, Secret};
use crate::forms;
use crate::model::{Fence, Model, ProfileSeed, RecoveryLink, UserId};
use crate::preferences::{self, DARK_MODE};
use crate::profile::{
    AvatarEdit, LoadOutcome, LoadTicket, SaveOutcome, SaveStep, SaveTicket, UploadOutcome,
};
use crate::recovery;
use crate::view::{self, ViewModel};
use crate::view_state::{Navigator, ViewTag};
use crate::{AppError, ErrorKind, INVALID_RESET_LINK_MESSAGE};

pub const REGISTRATION_NOTICE: &str =
    "Registration successful! Please check your email to confirm your account.";
pub const RESET_EMAIL_NOTICE: &str = "Password reset email sent! Check your inbox.";
pub const PASSWORD_RESET_NOTICE: &str =
    "Password reset successful! Please sign in with your new password.";
pub const PROFILE_SAVED_NOTICE: &str = "Profile updated successfully!";

#[derive(Default)]
pub struct App;

impl App {
    // --- Session ---

    fn establish_session(model: &mut Model, caps: &Capabilities, user_id: UserId) {
        if model.session.user_id() == Some(&user_id) {
            debug!(user_id = %user_id, "session already active");
            return;
        }

        if let Some(previous) = model.session.user_id() {
            // Another account took over without a logout.
            info!(previous = %previous, user_id = %user_id, "switching accounts");
            Self::drop_session_state(model, caps);
        }

        let fence = model.session.begin(user_id);
        model.navigator.request_login(true);
        info!(user_id = %fence.user_id, generation = fence.generation, "session established");

        if !model.navigator.recovery_pending() {
            Self::load_profile(model, caps, fence);
        }
    }

    fn end_session(model: &mut Model, caps: &Capabilities) {
        model.session.end();
        Self::drop_session_state(model, caps);
        model.navigator.request_logout();
        model.clear_error();

        caps.notify.session_ended();
        info!(generation = model.session.generation(), "session ended");
    }

    /// Forget the profile, its pending upload and any outstanding load or
    /// save belonging to the current session.
    fn drop_session_state(model: &mut Model, caps: &Capabilities) {
        let had_avatar = model.profile.avatar_url().is_some();
        model.profile.clear();
        if had_avatar {
            caps.notify.avatar_changed(None);
        }
    }

    fn sign_out_remote(model: &mut Model, caps: &Capabilities) {
        model.in_flight.sign_out = true;
        caps.gateway
            .sign_out(|result| Event::SignOutCompleted(Box::new(result)));
    }

    // --- Profile ---

    fn load_profile(model: &mut Model, caps: &Capabilities, fence: Fence) {
        let Some(ticket) = model.profile.begin_load(fence) else {
            debug!("profile load already in flight");
            return;
        };

        let user_id = ticket.fence.user_id.clone();
        caps.gateway.fetch_profile(user_id, move |result| Event::ProfileFetched {
            ticket,
            result: Box::new(result),
        });
    }

    fn start_save(model: &mut Model, caps: &Capabilities, avatar: AvatarEdit) {
        let Some(fence) = model.session.fence() else {
            model.set_error(AppError::new(
                ErrorKind::InvalidState,
                "Please sign in to update your profile",
            ));
            return;
        };

        match model.profile.begin_save(fence, avatar) {
            Ok(step) => {
                model.clear_error();
                Self::dispatch_save_step(caps, step);
            }
            Err(e) => {
                warn!(error = %e, "save rejected");
                model.set_error(e);
            }
        }
    }

    fn dispatch_save_step(caps: &Capabilities, step: SaveStep) {
        match step {
            SaveStep::Upload { ticket, path, file } => {
                debug!(op_id = %ticket.op_id, path = %path, "uploading avatar");
                let user_id = ticket.fence.user_id.clone();
                caps.gateway.upload_avatar(user_id, path, file, move |result| {
                    Event::AvatarUploaded {
                        ticket: Box::new(ticket),
                        result: Box::new(result),
                    }
                });
            }
            SaveStep::Upsert { ticket } => {
                debug!(op_id = %ticket.op_id, "upserting profile");
                let user_id = ticket.fence.user_id.clone();
                let patch = ticket.patch.clone();
                caps.gateway.upsert_profile(user_id, patch, move |result| {
                    Event::ProfileUpserted {
                        ticket: Box::new(ticket),
                        result: Box::new(result),
                    }
                });
            }
        }
    }

    // --- Recovery ---

    fn complete_reset(model: &mut Model, caps: &Capabilities) {
        if !model.navigator.complete_reset() {
            return;
        }

        let path = model
            .page_url
            .as_deref()
            .map_or_else(|| "/".to_string(), recovery::path_only);
        caps.notify.replace_url(path.clone());
        model.page_url = Some(path);

        // The recovery session only exists to set the new password.
        if model.session.is_authenticated() {
            Self::end_session(model, caps);
            Self::sign_out_remote(model, caps);
        }
        info!("password recovery completed");
    }

    // --- Handlers ---

    fn handle_app_started(model: &mut Model, caps: &Capabilities, url: String) {
        if model.started {
            warn!("duplicate app start ignored");
            return;
        }
        model.started = true;

        let recovery_link = recovery::detect(&url);
        model.navigator = Navigator::new(recovery_link);
        model.page_url = Some(url);
        info!(recovery_link, "app started");

        for key in preferences::KNOWN_KEYS {
            match KvKey::new(KeyNamespace::Settings, key) {
                Ok(kv_key) => caps.store.get(kv_key, move |result| Event::PreferenceRead {
                    key: key.to_string(),
                    result: Box::new(result),
                }),
                Err(e) => error!(key, error = %e, "invalid preference key"),
            }
        }

        caps.gateway
            .get_current_user(move |result| Event::CurrentUserResolved {
                recovery: recovery_link,
                result: Box::new(result),
            });
    }

    fn handle_current_user(
        model: &mut Model,
        caps: &Capabilities,
        recovery: bool,
        result: GatewayResult,
    ) {
        let user = result.and_then(GatewayOutput::into_current_user);

        if recovery {
            if !model.navigator.recovery_pending() {
                debug!("recovery already finished, ignoring session lookup");
                return;
            }
            match user {
                Ok(Some(user_id)) => {
                    model.recovery_link = RecoveryLink::Valid;
                    Self::establish_session(model, caps, user_id);
                }
                Ok(None) => {
                    warn!("recovery link did not yield a session");
                    model.recovery_link = RecoveryLink::Invalid;
                    model.set_error(AppError::new(
                        ErrorKind::Authentication,
                        INVALID_RESET_LINK_MESSAGE,
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "recovery session lookup failed");
                    let err = AppError::from(e);
                    if err.kind == ErrorKind::Authentication || err.kind == ErrorKind::NotFound {
                        model.recovery_link = RecoveryLink::Invalid;
                        model.set_error(
                            AppError::new(ErrorKind::Authentication, INVALID_RESET_LINK_MESSAGE)
                                .with_internal(err.message),
                        );
                    } else {
                        model.set_error(err);
                    }
                }
            }
            return;
        }

        match user {
            Ok(Some(user_id)) => {
                if model.session.is_authenticated() {
                    debug!("session already established, restore skipped");
                    return;
                }
                Self::establish_session(model, caps, user_id);
            }
            Ok(None) => debug!("no stored session"),
            Err(e) => warn!(error = %e, "session restore failed"),
        }
    }

    fn handle_sign_in(model: &mut Model, caps: &Capabilities, email: &str, password: Secret) {
        if model.in_flight.sign_in {
            model.set_error(AppError::busy("sign in"));
            return;
        }
        if let Err(e) = forms::validate_sign_in(email, &password) {
            model.set_error(e.into());
            return;
        }

        model.clear_error();
        model.in_flight.sign_in = true;
        caps.gateway.sign_in(email.trim(), password, |result| {
            Event::SignInCompleted(Box::new(result))
        });
    }

    fn handle_sign_in_completed(model: &mut Model, caps: &Capabilities, result: GatewayResult) {
        model.in_flight.sign_in = false;

        match result.and_then(GatewayOutput::into_session) {
            Ok(handle) => {
                model.clear_error();
                Self::establish_session(model, caps, handle.user_id);
            }
            Err(e) => {
                warn!(error = %e, "sign in failed");
                model.navigator.request_login(false);
                model.set_error(e.into());
            }
        }
    }

    fn handle_sign_up(
        model: &mut Model,
        caps: &Capabilities,
        email: &str,
        password: Secret,
        seed: ProfileSeed,
    ) {
        if model.in_flight.sign_up {
            model.set_error(AppError::busy("sign up"));
            return;
        }
        if let Err(e) = forms::validate_sign_up(email, &password, &seed) {
            model.set_error(e.into());
            return;
        }

        model.clear_error();
        model.in_flight.sign_up = true;
        caps.gateway.sign_up(email.trim(), password, seed, |result| {
            Event::SignUpCompleted(Box::new(result))
        });
    }

    fn handle_sign_out(model: &mut Model, caps: &Capabilities) {
        if model.in_flight.sign_out {
            model.set_error(AppError::busy("sign out"));
            return;
        }
        if model.profile.is_saving() {
            warn!("sign out rejected while a profile save is outstanding");
            model.set_error(AppError::busy("profile save"));
            return;
        }
        if model.in_flight.password_update {
            warn!("sign out rejected while a password update is outstanding");
            model.set_error(AppError::busy("password update"));
            return;
        }
        Self::end_session(model, caps);
        Self::sign_out_remote(model, caps);
    }

    fn handle_update_password(
        model: &mut Model,
        caps: &Capabilities,
        new_password: Secret,
        confirm_password: &Secret,
    ) {
        if !model.navigator.recovery_pending() || !model.session.is_authenticated() {
            model.set_error(AppError::new(
                ErrorKind::Authentication,
                INVALID_RESET_LINK_MESSAGE,
            ));
            return;
        }
        if model.in_flight.password_update {
            model.set_error(AppError::busy("password update"));
            return;
        }
        if let Err(e) = forms::validate_new_password(&new_password, confirm_password) {
            model.set_error(e.into());
            return;
        }

        model.clear_error();
        model.in_flight.password_update = true;
        caps.gateway.update_password(new_password, |result| {
            Event::PasswordUpdated(Box::new(result))
        });
    }

    fn handle_reset_email(model: &mut Model, caps: &Capabilities, email: &str) {
        if model.in_flight.reset_email {
            model.set_error(AppError::busy("password reset email"));
            return;
        }
        if let Err(e) = forms::validate_email(email) {
            model.set_error(e.into());
            return;
        }

        model.clear_error();
        model.in_flight.reset_email = true;
        caps.gateway.request_password_reset(email.trim(), |result| {
            Event::PasswordResetEmailSent(Box::new(result))
        });
    }

    fn handle_profile_fetched(
        model: &mut Model,
        caps: &Capabilities,
        ticket: &LoadTicket,
        result: GatewayResult,
    ) {
        let active = model.session.fence();
        let result = result.and_then(GatewayOutput::into_maybe_profile);

        match model.profile.finish_load(ticket, active.as_ref(), result) {
            LoadOutcome::Applied { avatar_changed } => {
                debug!(seq = ticket.seq, "profile loaded");
                if avatar_changed {
                    caps.notify
                        .avatar_changed(model.profile.avatar_url().map(str::to_string));
                }
            }
            LoadOutcome::Stale => {
                warn!(
                    seq = ticket.seq,
                    generation = ticket.fence.generation,
                    "discarding stale profile load"
                );
            }
            LoadOutcome::Failed(e) => {
                warn!(error = %e, "profile load failed");
                model.set_error(e);
            }
        }
    }

    fn handle_avatar_uploaded(
        model: &mut Model,
        caps: &Capabilities,
        ticket: &SaveTicket,
        result: GatewayResult,
    ) {
        let active = model.session.fence();
        let result = result.and_then(GatewayOutput::into_public_url);

        match model.profile.finish_upload(ticket, active.as_ref(), result) {
            UploadOutcome::Continue(step) => Self::dispatch_save_step(caps, step),
            UploadOutcome::Stale => warn!(op_id = %ticket.op_id, "discarding stale avatar upload"),
            UploadOutcome::Failed(e) => {
                warn!(op_id = %ticket.op_id, error = %e, "avatar upload failed");
                model.set_error(e);
            }
        }
    }

    fn handle_profile_upserted(
        model: &mut Model,
        caps: &Capabilities,
        ticket: &SaveTicket,
        result: GatewayResult,
    ) {
        let active = model.session.fence();
        let result = result.and_then(GatewayOutput::into_profile);

        match model.profile.finish_save(ticket, active.as_ref(), result) {
            SaveOutcome::Saved { avatar_url } => {
                info!(op_id = %ticket.op_id, "profile saved");
                model.set_notice(PROFILE_SAVED_NOTICE);
                caps.notify.avatar_changed(avatar_url);
            }
            SaveOutcome::Stale => warn!(op_id = %ticket.op_id, "discarding stale profile save"),
            SaveOutcome::Failed(e) => {
                warn!(op_id = %ticket.op_id, error = %e, "profile save failed");
                model.set_error(e);
            }
        }
    }

    fn handle_dark_mode_toggled(model: &mut Model, caps: &Capabilities) {
        let dark = !model.preferences.get(&DARK_MODE);

        let persisted = model
            .preferences
            .set(&DARK_MODE, &dark)
            .and_then(|bytes| Ok((DARK_MODE.kv_key()?, bytes)))
            .and_then(|(key, bytes)| {
                caps.store.set(key, bytes, |result| Event::PreferenceWritten {
                    key: DARK_MODE.key().to_string(),
                    result: Box::new(result),
                })
            });
        if let Err(e) = persisted {
            warn!(error = %e, "dark mode not persisted");
        }

        caps.notify.theme_changed(dark);
    }

    fn handle_preference_read(model: &mut Model, caps: &Capabilities, key: &str, result: KvResult) {
        let bytes = match result {
            Ok(KvOutput::Value(bytes)) => bytes,
            Ok(other) => {
                error!(key, output = ?other, "unexpected store output");
                return;
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                warn!(key, error = %e, "preference read failed");
                return;
            }
        };

        match model.preferences.hydrate(key, bytes.as_deref()) {
            Ok(true) => {}
            Ok(false) => {
                debug!(key, "preference changed locally before read completed");
                return;
            }
            Err(e) => warn!(key, error = %e, "malformed preference, using default"),
        }

        if key == DARK_MODE.key() {
            caps.notify.theme_changed(model.preferences.get(&DARK_MODE));
        }
    }

    /// Announce the visible screen when it changed, and tidy up the editor
    /// when the user leaves it.
    fn sync_view(model: &mut Model, caps: &Capabilities) {
        let current = model.navigator.current_view();
        let previous = model.announced_view;
        if previous == Some(current) {
            return;
        }

        if previous == Some(ViewTag::Profile) {
            model.profile.end_editing();
        }
        if current == ViewTag::Profile {
            if let Some(fence) = model.session.fence() {
                if model.profile.profile().is_none() {
                    Self::load_profile(model, caps, fence);
                }
            }
        }

        model.announced_view = Some(current);
        info!(view = current.as_str(), "view changed");
        caps.notify.view_changed(current);
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            "update"
        );

        match event {
            Event::AppStarted { url } => Self::handle_app_started(model, caps, url),

            // Navigation
            Event::OpenScreen { view } => {
                if !model.navigator.open_screen(view) {
                    debug!(view = view.as_str(), "open screen had no effect");
                }
            }
            Event::CloseScreen => {
                model.navigator.close_screen();
            }
            Event::ToggleAuthForm => {
                model.navigator.toggle_auth_form();
                model.clear_error();
            }
            Event::ForgotPasswordOpened => {
                model.navigator.set_forgot_password(true);
                model.clear_error();
            }
            Event::ForgotPasswordClosed => model.navigator.set_forgot_password(false),
            Event::RegistrationConfirmationDismissed => {
                model.navigator.set_registration_confirmation(false);
                model.navigator.open_screen(ViewTag::Login);
            }

            // Auth
            Event::SignInRequested { email, password } => {
                Self::handle_sign_in(model, caps, &email, password);
            }
            Event::SignInCompleted(result) => Self::handle_sign_in_completed(model, caps, *result),
            Event::SignUpRequested {
                email,
                password,
                seed,
            } => Self::handle_sign_up(model, caps, &email, password, seed),
            Event::SignUpCompleted(result) => {
                model.in_flight.sign_up = false;
                match (*result).and_then(GatewayOutput::into_done) {
                    Ok(()) => {
                        info!("registration submitted");
                        model.navigator.set_registration_confirmation(true);
                        model.set_notice(REGISTRATION_NOTICE);
                    }
                    Err(e) => {
                        warn!(error = %e, "sign up failed");
                        model.set_error(e.into());
                    }
                }
            }
            Event::SignOutRequested => Self::handle_sign_out(model, caps),
            Event::SignOutCompleted(result) => {
                model.in_flight.sign_out = false;
                if let Err(e) = (*result).and_then(GatewayOutput::into_done) {
                    warn!(error = %e, "remote sign out failed, local session already cleared");
                }
            }
            Event::CurrentUserResolved { recovery, result } => {
                Self::handle_current_user(model, caps, recovery, *result);
            }
            Event::PasswordResetEmailRequested { email } => {
                Self::handle_reset_email(model, caps, &email);
            }
            Event::PasswordResetEmailSent(result) => {
                model.in_flight.reset_email = false;
                match (*result).and_then(GatewayOutput::into_done) {
                    Ok(()) => {
                        model.navigator.set_forgot_password(false);
                        model.set_notice(RESET_EMAIL_NOTICE);
                    }
                    Err(e) => {
                        warn!(error = %e, "password reset email failed");
                        model.set_error(e.into());
                    }
                }
            }
            Event::UpdatePasswordRequested {
                new_password,
                confirm_password,
            } => Self::handle_update_password(model, caps, new_password, &confirm_password),
            Event::PasswordUpdated(result) => {
                model.in_flight.password_update = false;
                match (*result).and_then(GatewayOutput::into_done) {
                    Ok(()) => {
                        model.set_notice(PASSWORD_RESET_NOTICE);
                        Self::complete_reset(model, caps);
                    }
                    Err(e) => {
                        warn!(error = %e, "password update failed");
                        model.set_error(e.into());
                    }
                }
            }

            // Profile editing
            Event::GenderEdited { value } => {
                if model.profile.is_saving() {
                    debug!("edit ignored while saving");
                } else {
                    model.profile.set_gender(value);
                }
            }
            Event::CountryEdited { value } => {
                if model.profile.is_saving() {
                    debug!("edit ignored while saving");
                } else {
                    model.profile.edit_country(value);
                }
            }
            Event::CountryFocused => model.profile.focus_country(),
            Event::CountrySuggestionSelected { name } => {
                if CountryIndex::default().contains(&name) {
                    model.profile.select_country(name);
                } else {
                    warn!(name = %name, "selected country is not in the list");
                    model.profile.edit_country(name);
                }
            }
            Event::AvatarSelected { file, preview_url } => {
                match model.profile.stage_upload(file, preview_url) {
                    Ok(()) => model.clear_error(),
                    Err(e) => model.set_error(e.into()),
                }
            }
            Event::AvatarDiscarded => model.profile.discard_upload(),
            Event::SaveProfileRequested { now_ms } => {
                Self::start_save(model, caps, AvatarEdit::Keep { now_ms });
            }
            Event::RemoveAvatarRequested => Self::start_save(model, caps, AvatarEdit::Remove),
            Event::ProfileFetched { ticket, result } => {
                Self::handle_profile_fetched(model, caps, &ticket, *result);
            }
            Event::AvatarUploaded { ticket, result } => {
                Self::handle_avatar_uploaded(model, caps, &ticket, *result);
            }
            Event::ProfileUpserted { ticket, result } => {
                Self::handle_profile_upserted(model, caps, &ticket, *result);
            }

            // Preferences
            Event::DarkModeToggled => Self::handle_dark_mode_toggled(model, caps),
            Event::PreferenceRead { key, result } => {
                Self::handle_preference_read(model, caps, &key, *result);
            }
            Event::PreferenceWritten { key, result } => {
                if let Err(e) = *result {
                    warn!(key = %key, error = %e, "preference write failed");
                }
            }

            Event::DismissError => model.clear_error(),
            Event::DismissNotice => model.notice = None,
        }

        Self::sync_view(model, caps);
        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::build(model)
    }
}
