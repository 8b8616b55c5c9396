#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use crux_core::testing::AppTester;
use crux_core::Request;
use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Rgba};

use shared::avatar::AvatarFile;
use shared::capabilities::{
    GatewayError, GatewayOperation, GatewayOutput, GatewayResult, KvOperation, KvOutput, UiSignal,
};
use shared::model::{Profile, SessionHandle, UserId};
use shared::{App, Effect, Event, Model, Secret, ViewModel};

pub const EMAIL: &str = "ana@example.com";
pub const PASSWORD: &str = "correct-horse";
pub const USER: &str = "u1";
pub const SECOND_EMAIL: &str = "bo@example.com";
pub const SECOND_PASSWORD: &str = "battery-staple";
pub const SECOND_USER: &str = "u2";

/// In-memory stand-in for the identity provider, bucket and row store.
#[derive(Default)]
pub struct FakeBackend {
    pub accounts: HashMap<String, (String, UserId)>,
    pub current_user: Option<UserId>,
    pub rows: HashMap<UserId, Profile>,
    pub uploads: Vec<String>,
    pub upserts: usize,
    pub reset_emails: Vec<String>,
    pub deny_profile_writes: bool,
    pub kv: HashMap<String, Vec<u8>>,
}

impl FakeBackend {
    pub fn with_account() -> Self {
        let mut backend = Self::default();
        backend.accounts.insert(
            EMAIL.to_string(),
            (PASSWORD.to_string(), UserId::new(USER)),
        );
        backend
    }

    pub fn with_two_accounts() -> Self {
        let mut backend = Self::with_account();
        backend.accounts.insert(
            SECOND_EMAIL.to_string(),
            (SECOND_PASSWORD.to_string(), UserId::new(SECOND_USER)),
        );
        backend
    }

    pub fn handle(&mut self, op: &GatewayOperation) -> GatewayResult {
        match op {
            GatewayOperation::SignIn { email, password } => match self.accounts.get(email) {
                Some((stored, user_id)) if stored == password.expose() => {
                    self.current_user = Some(user_id.clone());
                    Ok(GatewayOutput::Session(SessionHandle {
                        user_id: user_id.clone(),
                    }))
                }
                _ => Err(GatewayError::Auth {
                    message: "Invalid login credentials".into(),
                }),
            },
            GatewayOperation::SignUp {
                email, password, ..
            } => {
                if self.accounts.contains_key(email) {
                    return Err(GatewayError::Rejected {
                        status: 422,
                        message: "User already registered".into(),
                    });
                }
                let user_id = UserId::new(format!("u{}", self.accounts.len() + 1));
                self.accounts
                    .insert(email.clone(), (password.expose().to_string(), user_id));
                Ok(GatewayOutput::Done)
            }
            GatewayOperation::SignOut => {
                self.current_user = None;
                Ok(GatewayOutput::Done)
            }
            GatewayOperation::GetCurrentUser => {
                Ok(GatewayOutput::CurrentUser(self.current_user.clone()))
            }
            GatewayOperation::RequestPasswordReset { email } => {
                self.reset_emails.push(email.clone());
                Ok(GatewayOutput::Done)
            }
            GatewayOperation::UpdatePassword { new_password } => {
                let Some(user_id) = self.current_user.clone() else {
                    return Err(GatewayError::Auth {
                        message: "Auth session missing!".into(),
                    });
                };
                for (stored, id) in self.accounts.values_mut() {
                    if *id == user_id {
                        *stored = new_password.expose().to_string();
                    }
                }
                Ok(GatewayOutput::Done)
            }
            GatewayOperation::UploadAvatar { path, .. } => {
                self.uploads.push(path.clone());
                Ok(GatewayOutput::PublicUrl(public_url(path)))
            }
            GatewayOperation::UpsertProfile { user_id, patch } => {
                self.upserts += 1;
                if self.deny_profile_writes {
                    return Err(GatewayError::classify(
                        401,
                        "new row violates row-level security policy for table \"userProfiles\"",
                    ));
                }
                let row = self
                    .rows
                    .entry(user_id.clone())
                    .or_insert_with(|| Profile::empty(user_id.clone()));
                patch.apply_to(row);
                Ok(GatewayOutput::Profile(row.clone()))
            }
            GatewayOperation::FetchProfile { user_id } => match self.rows.get(user_id) {
                Some(row) => Ok(GatewayOutput::MaybeProfile(Some(row.clone()))),
                None => Err(GatewayError::classify(
                    406,
                    "JSON object requested, multiple (or no) rows returned (PGRST116)",
                )),
            },
        }
    }

    fn handle_kv(&mut self, op: &KvOperation) -> Result<KvOutput, shared::capabilities::KvError> {
        match op {
            KvOperation::Get { key } => Ok(KvOutput::Value(self.kv.get(&key.raw()).cloned())),
            KvOperation::Set { key, value } => {
                self.kv.insert(key.raw(), value.clone());
                Ok(KvOutput::Written)
            }
        }
    }
}

pub fn public_url(path: &str) -> String {
    format!("https://cdn.test/storage/v1/object/public/{path}")
}

pub fn row(avatar_url: Option<&str>) -> Profile {
    Profile {
        user_id: UserId::new(USER),
        gender: Some("female".into()),
        country: Some("Peru".into()),
        avatar_url: avatar_url.map(str::to_string),
    }
}

pub fn png_file(name: &str) -> AvatarFile {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_pixel(3, 3, Rgba([10, 20, 30, 255]));
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), 3, 3, ExtendedColorType::Rgba8)
        .unwrap();
    AvatarFile {
        name: name.into(),
        content_type: "image/png".into(),
        bytes,
    }
}

pub fn sign_in_event(password: &str) -> Event {
    Event::SignInRequested {
        email: EMAIL.into(),
        password: Secret::from(password),
    }
}

/// Drives the app against a [`FakeBackend`], recording shell signals.
pub struct Harness {
    pub app: AppTester<App, Effect>,
    pub model: Model,
    pub backend: FakeBackend,
    pub signals: Vec<UiSignal>,
}

impl Harness {
    pub fn new(backend: FakeBackend) -> Self {
        Self {
            app: AppTester::default(),
            model: Model::default(),
            backend,
            signals: Vec::new(),
        }
    }

    pub fn started(backend: FakeBackend, url: &str) -> Self {
        let mut harness = Self::new(backend);
        harness.run(Event::AppStarted { url: url.into() });
        harness
    }

    /// Dispatch and answer every gateway request from the backend until
    /// the app goes quiet.
    pub fn run(&mut self, event: Event) {
        let pending = self.pump(event, true);
        assert!(pending.is_empty());
    }

    /// Dispatch and hand back the gateway requests instead of answering
    /// them. Store requests are still answered.
    pub fn dispatch(&mut self, event: Event) -> Vec<Request<GatewayOperation>> {
        self.pump(event, false)
    }

    /// Answer a held request with `result`; follow-up requests are held too.
    pub fn resolve(
        &mut self,
        mut request: Request<GatewayOperation>,
        result: GatewayResult,
    ) -> Vec<Request<GatewayOperation>> {
        let update = self
            .app
            .resolve(&mut request, result)
            .expect("gateway request resolves");
        update
            .events
            .into_iter()
            .flat_map(|event| self.pump(event, false))
            .collect()
    }

    /// Answer a held request from the backend.
    pub fn resolve_with_backend(
        &mut self,
        request: Request<GatewayOperation>,
    ) -> Vec<Request<GatewayOperation>> {
        let result = self.backend.handle(&request.operation);
        self.resolve(request, result)
    }

    pub fn view(&self) -> ViewModel {
        self.app.view(&self.model)
    }

    pub fn take_signals(&mut self) -> Vec<UiSignal> {
        std::mem::take(&mut self.signals)
    }

    fn pump(&mut self, event: Event, answer_gateway: bool) -> Vec<Request<GatewayOperation>> {
        let mut held = Vec::new();
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let update = self.app.update(event, &mut self.model);
            for effect in update.effects {
                match effect {
                    Effect::Gateway(mut request) => {
                        if answer_gateway {
                            let result = self.backend.handle(&request.operation);
                            let update = self
                                .app
                                .resolve(&mut request, result)
                                .expect("gateway request resolves");
                            queue.extend(update.events);
                        } else {
                            held.push(request);
                        }
                    }
                    Effect::Store(mut request) => {
                        let result = self.backend.handle_kv(&request.operation);
                        let update = self
                            .app
                            .resolve(&mut request, result)
                            .expect("store request resolves");
                        queue.extend(update.events);
                    }
                    Effect::Notify(request) => self.signals.push(request.operation.clone()),
                    Effect::Render(_) => {}
                }
            }
        }

        held
    }
}

pub fn only<T>(mut items: Vec<T>) -> T {
    assert_eq!(items.len(), 1, "expected exactly one item");
    items.remove(0)
}
