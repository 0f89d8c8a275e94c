//! Scoped key/value byte storage the stores persist into.

use std::{
    collections::HashMap,
    fmt::{Debug, Display, Formatter},
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use thiserror::Error;
use tracing::{trace, warn};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Scope {
    /// Encoded entity collections under fixed names such as `users`.
    Entities,
    /// Opaque payloads, e.g. post images, keyed by entity id.
    Blobs,
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Scope::Entities => "entities",
            Scope::Blobs => "blobs",
        })
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("IO error accessing {scope}/{key}: {source}")]
    Io {
        scope: Scope,
        key: String,
        #[source]
        source: io::Error,
    },
}

pub trait PersistenceGateway: Send + Sync + Debug {
    fn load(&self, scope: Scope, key: &str) -> Result<Option<Vec<u8>>, GatewayError>;

    fn save(&self, scope: Scope, key: &str, bytes: &[u8]) -> Result<(), GatewayError>;

    /// Removing a missing key is not an error.
    fn remove(&self, scope: Scope, key: &str) -> Result<(), GatewayError>;
}

/// One entity key to write; `None` removes the key.
pub type EntityWrite<'a> = (&'a str, Option<&'a [u8]>);

fn apply(
    gateway: &dyn PersistenceGateway,
    key: &str,
    value: Option<&[u8]>,
) -> Result<(), GatewayError> {
    match value {
        Some(bytes) => gateway.save(Scope::Entities, key, bytes),
        None => gateway.remove(Scope::Entities, key),
    }
}

/// Writes entity keys in order.
///
/// If any write fails, the keys already written get their previous content back before the error
/// is returned, so either all writes land or none do.
pub fn write_entities(
    gateway: &dyn PersistenceGateway,
    writes: &[EntityWrite<'_>],
) -> Result<(), GatewayError> {
    let mut written: Vec<(&str, Option<Vec<u8>>)> = Vec::with_capacity(writes.len());

    for &(key, value) in writes {
        let result = gateway
            .load(Scope::Entities, key)
            .and_then(|previous| apply(gateway, key, value).map(|()| previous));

        match result {
            Ok(previous) => written.push((key, previous)),
            Err(error) => {
                for (key, previous) in written.into_iter().rev() {
                    if let Err(restore) = apply(gateway, key, previous.as_deref()) {
                        warn!(key, %restore, "Could not restore entity after failed write");
                    }
                }
                return Err(error);
            }
        }
    }

    Ok(())
}

fn validate_key(key: &str) -> Result<(), GatewayError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(GatewayError::InvalidKey(key.to_owned()))
    }
}

/// Keeps everything in process memory.
///
/// Clones of an `Arc<MemoryGateway>` act like two sessions on one device.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    entries: Mutex<HashMap<(Scope, String), Vec<u8>>>,
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceGateway for MemoryGateway {
    fn load(&self, scope: Scope, key: &str) -> Result<Option<Vec<u8>>, GatewayError> {
        validate_key(key)?;
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(&(scope, key.to_owned())).cloned())
    }

    fn save(&self, scope: Scope, key: &str, bytes: &[u8]) -> Result<(), GatewayError> {
        validate_key(key)?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert((scope, key.to_owned()), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, scope: Scope, key: &str) -> Result<(), GatewayError> {
        validate_key(key)?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&(scope, key.to_owned()));
        Ok(())
    }
}

/// Stores every key as a file below a root directory.
///
/// Entities go to `entities/<key>.json`, blobs to `blobs/<key>.bin`. Writes land in a temporary
/// file first and are renamed into place, so readers never see a half-written value.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct FileGateway {
    root: PathBuf,
}

impl FileGateway {
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        for scope in [Scope::Entities, Scope::Blobs] {
            fs::create_dir_all(root.join(scope.to_string()))?;
        }
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, scope: Scope, key: &str) -> Result<PathBuf, GatewayError> {
        validate_key(key)?;
        let extension = match scope {
            Scope::Entities => "json",
            Scope::Blobs => "bin",
        };
        Ok(self
            .root
            .join(scope.to_string())
            .join(format!("{key}.{extension}")))
    }
}

impl PersistenceGateway for FileGateway {
    fn load(&self, scope: Scope, key: &str) -> Result<Option<Vec<u8>>, GatewayError> {
        let path = self.path(scope, key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(GatewayError::Io {
                scope,
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn save(&self, scope: Scope, key: &str, bytes: &[u8]) -> Result<(), GatewayError> {
        let path = self.path(scope, key)?;
        let temporary = path.with_extension("tmp");
        let io_error = |source| GatewayError::Io {
            scope,
            key: key.to_owned(),
            source,
        };

        fs::write(&temporary, bytes).map_err(io_error)?;
        fs::rename(&temporary, &path).map_err(io_error)?;
        trace!(%scope, key, len = bytes.len(), "Saved value");

        Ok(())
    }

    fn remove(&self, scope: Scope, key: &str) -> Result<(), GatewayError> {
        let path = self.path(scope, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(GatewayError::Io {
                scope,
                key: key.to_owned(),
                source,
            }),
        }
    }
}


#[cfg(test)]
pub(crate) mod testing {
    use crate::gateway::{GatewayError, MemoryGateway, PersistenceGateway, Scope};
    use std::io;

    /// A [`MemoryGateway`] whose writes to one entity key always fail.
    #[derive(Debug)]
    pub(crate) struct FailingGateway {
        inner: MemoryGateway,
        failing_key: &'static str,
    }

    impl FailingGateway {
        pub(crate) fn new(failing_key: &'static str) -> Self {
            Self {
                inner: MemoryGateway::new(),
                failing_key,
            }
        }

        fn check(&self, scope: Scope, key: &str) -> Result<(), GatewayError> {
            if scope == Scope::Entities && key == self.failing_key {
                Err(GatewayError::Io {
                    scope,
                    key: key.to_owned(),
                    source: io::Error::other("disk full"),
                })
            } else {
                Ok(())
            }
        }
    }

    impl PersistenceGateway for FailingGateway {
        fn load(&self, scope: Scope, key: &str) -> Result<Option<Vec<u8>>, GatewayError> {
            self.inner.load(scope, key)
        }

        fn save(&self, scope: Scope, key: &str, bytes: &[u8]) -> Result<(), GatewayError> {
            self.check(scope, key)?;
            self.inner.save(scope, key, bytes)
        }

        fn remove(&self, scope: Scope, key: &str) -> Result<(), GatewayError> {
            self.check(scope, key)?;
            self.inner.remove(scope, key)
        }
    }
}
