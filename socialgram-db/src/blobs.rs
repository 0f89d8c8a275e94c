use crate::{
    error::Result,
    gateway::{PersistenceGateway, Scope},
};
use socialgram_common::model::{Id, post::PostMarker};
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

/// An opaque image payload.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Blob(Vec<u8>);

impl Blob {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Blob {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob").field("len", &self.0.len()).finish()
    }
}

/// Post images, stored one per key beside the entity collections.
#[derive(Clone, Debug)]
pub struct BlobStore {
    gateway: Arc<dyn PersistenceGateway>,
}

impl BlobStore {
    #[must_use]
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    pub fn put(&self, post_id: Id<PostMarker>, blob: &Blob) -> Result<()> {
        self.gateway
            .save(Scope::Blobs, &post_id.to_string(), blob.as_bytes())?;
        Ok(())
    }

    /// `None` means the post has no image.
    pub fn get(&self, post_id: Id<PostMarker>) -> Result<Option<Blob>> {
        let bytes = self.gateway.load(Scope::Blobs, &post_id.to_string())?;
        Ok(bytes.map(Blob))
    }

    pub fn remove(&self, post_id: Id<PostMarker>) -> Result<()> {
        self.gateway.remove(Scope::Blobs, &post_id.to_string())?;
        Ok(())
    }
}
