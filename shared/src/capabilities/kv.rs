use crux_core::capability::{CapabilityContext, Operation};
use crux_core::macros::Capability;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_KEY_LENGTH: usize = 128;
pub const MAX_VALUE_SIZE: usize = 64 * 1024;

/// A validated key in the device-local store, rendered as `namespace:key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey {
    namespace: KeyNamespace,
    key: String,
}

impl KvKey {
    pub fn new(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, KvError> {
        let key = key.into();
        Self::validate_key(&key)?;
        Ok(Self { namespace, key })
    }

    #[must_use]
    pub fn raw(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.key)
    }

    fn validate_key(key: &str) -> Result<(), KvError> {
        let invalid = |reason: &str| KvError::InvalidKey {
            key: key.chars().take(50).collect(),
            reason: reason.to_string(),
        };

        if key.trim().is_empty() {
            return Err(invalid("key cannot be empty"));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(invalid("key exceeds maximum length"));
        }
        if key.contains(':') {
            return Err(invalid("key cannot contain the namespace separator"));
        }
        if key.chars().any(char::is_control) {
            return Err(invalid("key contains control characters"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyNamespace {
    Settings,
}

impl KeyNamespace {
    #[must_use]
    pub fn prefix(&self) -> &str {
        match self {
            KeyNamespace::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvOperation {
    Get { key: KvKey },
    Set { key: KvKey, value: Vec<u8> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvOutput {
    Value(Option<Vec<u8>>),
    Written,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvError {
    #[error("key not found: {key}")]
    NotFound { key: String },

    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("serialization error: {message}")]
    Serialization { message: String, key: Option<String> },
}

impl KvError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::NotFound { .. })
    }
}

pub type KvResult = Result<KvOutput, KvError>;

impl Operation for KvOperation {
    type Output = KvResult;
}

/// Device-local key/value persistence (`localStorage` on the web shell).
#[derive(Capability)]
pub struct Store<Ev> {
    context: CapabilityContext<KvOperation, Ev>,
}

impl<Ev> Store<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<KvOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn get<F>(&self, key: KvKey, make_event: F)
    where
        F: FnOnce(KvResult) -> Ev + Send + 'static,
    {
        self.request(KvOperation::Get { key }, make_event);
    }

    pub fn set<F>(&self, key: KvKey, value: Vec<u8>, make_event: F) -> Result<(), KvError>
    where
        F: FnOnce(KvResult) -> Ev + Send + 'static,
    {
        if value.len() > MAX_VALUE_SIZE {
            return Err(KvError::ValueTooLarge {
                size: value.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        self.request(KvOperation::Set { key, value }, make_event);
        Ok(())
    }

    fn request<F>(&self, operation: KvOperation, make_event: F)
    where
        F: FnOnce(KvResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(make_event(result));
        });
    }
}
