//! Process-local cache of constructed encodings.
//!
//! Building an encoding means reading and parsing a vocabulary file of up to
//! a few hundred thousand lines, so callers keep one [`EncodingCache`] and ask
//! it for encodings by name. There is no global instance.

use std::env;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use rustc_hash::FxHashMap;

use super::encoding::{Encoding, EncodingError};
use super::presets::Preset;

/// Environment variable naming the vocabulary directory for
/// [`EncodingCache::from_env`].
pub const BASE_DIR_ENV: &str = "TIKBPE_BASE_DIR";

/// Default number of loaded presets kept before the least recently used one
/// is dropped.
pub const DEFAULT_CAPACITY: usize = 8;

struct Inner {
    /// Presets read from disk, bounded.
    loaded: LruCache<String, Arc<Encoding>>,
    /// Encodings handed in by the caller, never evicted.
    registered: FxHashMap<String, Arc<Encoding>>,
}

/// Loads preset encodings on first use and hands out shared handles.
pub struct EncodingCache {
    base_dir: PathBuf,
    inner: Mutex<Inner>,
}

impl EncodingCache {
    /// Cache reading vocabulary files from `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_capacity(base_dir, DEFAULT_CAPACITY)
    }

    /// Cache keeping at most `capacity` loaded presets (minimum 1).
    pub fn with_capacity(base_dir: impl Into<PathBuf>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            base_dir: base_dir.into(),
            inner: Mutex::new(Inner {
                loaded: LruCache::new(capacity),
                registered: FxHashMap::default(),
            }),
        }
    }

    /// Cache over `$TIKBPE_BASE_DIR`, or `$HOME/.tikbpe` when unset.
    pub fn from_env() -> Self {
        let base_dir = match env::var_os(BASE_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join(".tikbpe"),
        };
        log::debug!("encoding cache base dir: {}", base_dir.display());
        Self::new(base_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn capacity(&self) -> usize {
        self.lock().loaded.cap().get()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The tables stay consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encoding by name: registered encodings first, then presets.
    ///
    /// A preset not yet cached is loaded from `base_dir`. The vocabulary is
    /// read without holding the lock, so other lookups are not blocked.
    pub fn get_encoding(&self, name: &str) -> Result<Arc<Encoding>, EncodingError> {
        {
            let mut inner = self.lock();
            if let Some(encoding) = inner.registered.get(name) {
                return Ok(Arc::clone(encoding));
            }
            if let Some(encoding) = inner.loaded.get(name) {
                log::trace!("encoding cache hit: {name}");
                return Ok(Arc::clone(encoding));
            }
        }

        let preset =
            Preset::from_name(name).ok_or_else(|| EncodingError::UnknownEncoding(name.to_string()))?;
        let encoding = Arc::new(preset.load(&self.base_dir)?);

        let mut inner = self.lock();
        // Another thread may have finished the same load first.
        if let Some(existing) = inner.loaded.get(name) {
            return Ok(Arc::clone(existing));
        }
        if let Some((evicted, _)) = inner.loaded.push(name.to_string(), Arc::clone(&encoding)) {
            if evicted != name {
                log::debug!("encoding cache full, evicted {evicted}");
            }
        }
        log::info!("loaded encoding {name} ({} tokens)", encoding.n_vocab());
        Ok(encoding)
    }

    /// Encoding used by a model name.
    pub fn encoding_for_model(&self, model: &str) -> Result<Arc<Encoding>, EncodingError> {
        let preset =
            Preset::for_model(model).ok_or_else(|| EncodingError::UnknownModel(model.to_string()))?;
        self.get_encoding(preset.name())
    }

    /// Make a custom encoding available under its own name.
    ///
    /// Registered encodings take precedence over presets of the same name
    /// and are never evicted. Returns the previous registration, if any.
    pub fn register(&self, encoding: Encoding) -> Option<Arc<Encoding>> {
        let name = encoding.name().to_string();
        log::debug!("registering encoding {name}");
        self.lock().registered.insert(name, Arc::new(encoding))
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<Encoding>> {
        self.lock().registered.remove(name)
    }

    /// Drop a loaded preset. Handles already given out stay valid.
    pub fn evict(&self, name: &str) -> bool {
        self.lock().loaded.pop(name).is_some()
    }

    /// Drop every loaded preset and registration.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.loaded.clear();
        inner.registered.clear();
    }

    /// Number of cached encodings, registered ones included.
    pub fn len(&self) -> usize {
        let inner = self.lock();
        inner.loaded.len() + inner.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EncodingCache {
    fn default() -> Self {
        Self::from_env()
    }
}
