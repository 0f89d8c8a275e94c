use crate::{codec::CodecError, gateway::GatewayError};
use socialgram_common::model::{
    Id, ModelValidationError, post::PostMarker, user::UserMarker,
};
use thiserror::Error;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ModelValidationError),
    #[error("A user cannot follow themself")]
    SelfFollow,
    #[error("Email or username already exists")]
    DuplicateIdentity,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("User with username {0:?} was not found.")]
    UserByUsernameNotFound(String),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Could not encode collection: {0}")]
    Codec(#[from] CodecError),
}

impl StoreError {
    /// Whether the error refers to an unknown user or post.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::UserByIdNotFound(_)
                | StoreError::UserByUsernameNotFound(_)
                | StoreError::PostByIdNotFound(_)
        )
    }

    /// Whether the error was caused by invalid caller input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::ValidationFailed(_) | StoreError::SelfFollow)
    }
}
