use crate::{controller::ListKind, settings::SettingKey};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("control for {0} is already registered")]
    DuplicateKey(SettingKey),
    #[error("no value available for {key}: {reason}")]
    MissingValue { key: SettingKey, reason: String },
    #[error("no control is bound to {0}")]
    UnboundKey(SettingKey),
}

/// The controller refused a write, either because the value is invalid or
/// because persisting it failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("write to {key} rejected: {reason}")]
pub struct WriteRejected {
    pub key: SettingKey,
    pub reason: String,
}

impl WriteRejected {
    pub fn new(key: SettingKey, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("status of {item} in {kind} unavailable: {reason}")]
pub struct StatusLookupError {
    pub kind: ListKind,
    pub item: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Write(#[from] WriteRejected),
}
