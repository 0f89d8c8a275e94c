pub mod auth;
pub mod message;
pub mod notification;
pub mod post;
pub mod user;

use crate::{
    model::user::InvalidUserHandleError,
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserHandle(#[from] InvalidUserHandleError),
    #[error("Required field `{0}` was empty")]
    EmptyField(&'static str),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct SocialgramEpoch;
impl Epoch for SocialgramEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type SocialgramSnowflake = Snowflake<SocialgramEpoch>;
pub type SocialgramSnowflakeGenerator = SnowflakeGenerator<SocialgramEpoch>;

/// Typed identifier of an entity; the marker keeps user, post, comment, ... ids apart.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(SocialgramSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: SocialgramSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> SocialgramSnowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<SocialgramSnowflake> for Id<Marker> {
    fn from(value: SocialgramSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(SocialgramSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

/// Returns `value` unless it is empty.
pub fn require_non_empty(
    field: &'static str,
    value: String,
) -> Result<String, ModelValidationError> {
    if value.is_empty() {
        Err(ModelValidationError::EmptyField(field))
    } else {
        Ok(value)
    }
}
