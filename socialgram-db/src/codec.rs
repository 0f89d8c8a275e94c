//! Turns entity collections into byte blobs and back.
//!
//! The encoding is JSON over the record types in [`crate::record`]. A blob that cannot be decoded
//! is reported as [`CodecError`] to the caller of [`decode_collection`], while
//! [`load_collection`] treats it as if the collection was never saved.

use crate::gateway::{GatewayError, PersistenceGateway, Scope};
use serde::{Serialize, de::DeserializeOwned};
use socialgram_common::model::ModelValidationError;
use thiserror::Error;
use tracing::warn;

pub const USERS_KEY: &str = "users";
pub const CURRENT_USER_KEY: &str = "current_user";
pub const POSTS_KEY: &str = "saved_posts";
pub const MESSAGES_KEY: &str = "saved_chats";
pub const NOTIFICATIONS_KEY: &str = "notifications";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Stored entity was invalid: {0}")]
    Invalid(#[from] ModelValidationError),
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encodes models through their record type `R`.
pub fn encode_collection<'a, M, R>(
    models: impl IntoIterator<Item = &'a M>,
) -> Result<Vec<u8>, CodecError>
where
    M: 'a,
    R: Serialize + From<&'a M>,
{
    let records: Vec<R> = models.into_iter().map(R::from).collect();
    encode(&records)
}

/// Decodes a blob of `R` records and validates each into a model.
pub fn decode_collection<R, M>(bytes: &[u8]) -> Result<Vec<M>, CodecError>
where
    R: DeserializeOwned,
    M: TryFrom<R, Error = ModelValidationError>,
{
    let records: Vec<R> = decode(bytes)?;
    let models = records
        .into_iter()
        .map(M::try_from)
        .collect::<Result<_, _>>()?;
    Ok(models)
}

/// Loads the collection stored under `key`.
///
/// Returns `Ok(None)` when the key is absent or its content cannot be decoded; only storage
/// failures are errors.
pub fn load_collection<R, M>(
    gateway: &dyn PersistenceGateway,
    key: &str,
) -> Result<Option<Vec<M>>, GatewayError>
where
    R: DeserializeOwned,
    M: TryFrom<R, Error = ModelValidationError>,
{
    let Some(bytes) = gateway.load(Scope::Entities, key)? else {
        return Ok(None);
    };

    match decode_collection::<R, M>(&bytes) {
        Ok(models) => Ok(Some(models)),
        Err(error) => {
            warn!(key, %error, "Discarding undecodable collection");
            Ok(None)
        }
    }
}
