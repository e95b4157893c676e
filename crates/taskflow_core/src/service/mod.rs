//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep presentation layers decoupled from storage details.
//! - Map every failure to one user-facing message.
//!
//! # Invariants
//! - Local state is only produced from confirmed writes: services persist
//!   first and return the read-back item, never an optimistic copy.

pub mod stats_service;
pub mod work_item_service;

use crate::identity::AuthError;
use crate::model::work_item::ItemValidationError;
use crate::repo::work_item_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Use-case level failure.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected before reaching storage.
    Validation(ItemValidationError),
    /// Storage failure; never retried at this layer.
    Repo(RepoError),
    Auth(AuthError),
    NotSignedIn,
    /// Write succeeded but read-back disagreed.
    InconsistentState(&'static str),
}

impl ServiceError {
    /// Message suitable for a transient user notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => format!("Please fix the form: {err}."),
            Self::Repo(_) | Self::InconsistentState(_) => {
                "Could not reach your data right now. Please try again.".to_string()
            }
            Self::Auth(err) => err.user_message().to_string(),
            Self::NotSignedIn => "Please sign in first.".to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Auth(err) => write!(f, "{err}"),
            Self::NotSignedIn => write!(f, "no signed-in user"),
            Self::InconsistentState(details) => write!(f, "inconsistent item state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Auth(err) => Some(err),
            Self::NotSignedIn | Self::InconsistentState(_) => None,
        }
    }
}

impl From<ItemValidationError> for ServiceError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}
