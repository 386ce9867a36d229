//! Persistent crop cache keyed by image content.
//!
//! Crops survive application restarts, file renames and folder moves: an
//! image is identified by a [`fingerprint`] of its size and leading bytes,
//! not by its path. The stored image dimensions guard against a different
//! file that happens to share the fingerprint.
//!
//! ## Storage
//!
//! `crop_cache.json` in the application directory:
//!
//! ```json
//! {
//!   "version": 1,
//!   "images": {
//!     "4c1f2a_9b0e3d7a11c2f4e8": {
//!       "img_w": 5120,
//!       "img_h": 2880,
//!       "last_used": "2026-02-10T14:30:00Z",
//!       "crops": { "16:9": [0, 0, 5120, 2880], "8:5": [256, 0, 4608, 2880] }
//!     }
//!   }
//! }
//! ```
//!
//! A missing, corrupt or wrong-version file loads as an empty cache. Absent
//! or malformed entries are plain misses; the cache never raises an error
//! at the user. `last_used` is recorded on every store but nothing evicts
//! on it, so the file grows with every distinct image ever opened.

use crate::geometry::{AspectKey, CropRect, clamp};
use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Name of the cache file within the application directory.
pub const CACHE_FILENAME: &str = "crop_cache.json";

/// Version of the cache format. Files with any other version are ignored.
const CACHE_VERSION: u32 = 1;

/// Bytes hashed from the start of each file.
pub const FINGERPRINT_READ_SIZE: u64 = 64 * 1024;

/// Cached crops for one image.
///
/// Crops are kept as raw JSON so a single malformed rectangle can be
/// skipped without losing the rest of the entry. Entries themselves are
/// stored raw in [`CropCache::images`] and only decoded on lookup.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct CacheEntry {
    #[serde(default)]
    pub img_w: u32,
    #[serde(default)]
    pub img_h: u32,
    #[serde(default)]
    pub last_used: String,
    #[serde(default)]
    pub crops: BTreeMap<String, serde_json::Value>,
}

/// The whole cache file. `images` holds undecoded entries so one bad entry
/// costs a miss for that image, not the rest of the file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CropCache {
    pub version: u32,
    pub images: BTreeMap<String, serde_json::Value>,
}

impl Default for CropCache {
    fn default() -> Self {
        Self::empty()
    }
}

impl CropCache {
    pub fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            images: BTreeMap::new(),
        }
    }

    /// Load from the application directory. Returns an empty cache if the
    /// file doesn't exist or can't be used (corruption, version mismatch).
    pub fn load(dir: &Path) -> Self {
        let path = cache_path(dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() == io::ErrorKind::NotFound {
                    tracing::debug!(path = %path.display(), "no crop cache, starting fresh");
                } else {
                    tracing::warn!(path = %path.display(), "failed to read crop cache ({e}), starting fresh");
                }
                return Self::empty();
            }
        };
        let cache: Self = match serde_json::from_str(&content) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to parse crop cache ({e}), starting fresh");
                return Self::empty();
            }
        };
        if cache.version != CACHE_VERSION {
            tracing::warn!(
                path = %path.display(),
                "crop cache version {} is not supported, starting fresh",
                cache.version
            );
            return Self::empty();
        }
        tracing::info!(path = %path.display(), "loaded crop cache with {} entries", cache.len());
        cache
    }

    /// Save to the application directory, creating it if needed.
    pub fn save(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let path = cache_path(dir);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        tracing::debug!(path = %path.display(), "saved crop cache ({} entries)", self.len());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Cached crops for an image.
    ///
    /// Misses when the fingerprint is unknown or the stored dimensions
    /// differ from the image's. Malformed keys or rectangles are skipped and
    /// surviving rectangles are clamped to the image; an entry with nothing
    /// left is a miss.
    pub fn lookup(
        &self,
        fingerprint: &str,
        img_w: u32,
        img_h: u32,
    ) -> Option<BTreeMap<AspectKey, CropRect>> {
        let entry = self.entry(fingerprint)?;
        if entry.img_w != img_w || entry.img_h != img_h {
            tracing::debug!(
                "crop cache dimension mismatch for {fingerprint}: cached {}x{}, actual {img_w}x{img_h}",
                entry.img_w,
                entry.img_h
            );
            return None;
        }

        let crops: BTreeMap<AspectKey, CropRect> = entry
            .crops
            .iter()
            .filter_map(|(key, value)| {
                let key = AspectKey::parse(key)?;
                let rect = serde_json::from_value::<[u32; 4]>(value.clone()).ok()?;
                Some((key, clamp(CropRect::from_array(rect), img_w, img_h)))
            })
            .collect();

        (!crops.is_empty()).then_some(crops)
    }

    /// Decode the entry stored under a fingerprint. A malformed entry reads
    /// as absent.
    pub fn entry(&self, fingerprint: &str) -> Option<CacheEntry> {
        let raw = self.images.get(fingerprint)?;
        match serde_json::from_value(raw.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("ignoring malformed crop cache entry {fingerprint}: {e}");
                None
            }
        }
    }

    /// Record an image's crops, replacing any previous entry and stamping
    /// `last_used` with the current UTC time.
    pub fn store(
        &mut self,
        fingerprint: &str,
        img_w: u32,
        img_h: u32,
        crops: &BTreeMap<AspectKey, CropRect>,
    ) {
        let crops: serde_json::Map<String, serde_json::Value> = crops
            .iter()
            .map(|(key, rect)| (key.to_string(), serde_json::json!(rect.to_array())))
            .collect();
        self.images.insert(
            fingerprint.to_string(),
            serde_json::json!({
                "img_w": img_w,
                "img_h": img_h,
                "last_used": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                "crops": crops,
            }),
        );
    }
}

/// Resolve the cache file path for an application directory.
pub fn cache_path(dir: &Path) -> PathBuf {
    dir.join(CACHE_FILENAME)
}

/// Content fingerprint: file size plus a truncated SHA-256 of the first
/// 64 KiB, formatted as `"{size_hex}_{hash16}"`.
///
/// Renamed or moved files keep their fingerprint; files that share a
/// leading 64 KiB are told apart by size.
pub fn fingerprint(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let mut head = Vec::with_capacity(FINGERPRINT_READ_SIZE as usize);
    file.take(FINGERPRINT_READ_SIZE).read_to_end(&mut head)?;
    let digest = format!("{:x}", Sha256::digest(&head));
    Ok(format!("{size:x}_{}", &digest[..16]))
}

/// How a folder scan resolved each image's crops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreStats {
    pub restored: u32,
    pub defaulted: u32,
}

impl RestoreStats {
    pub fn restore(&mut self) {
        self.restored += 1;
    }

    pub fn default_crop(&mut self) {
        self.defaulted += 1;
    }

    pub fn total(&self) -> u32 {
        self.restored + self.defaulted
    }
}

impl fmt::Display for RestoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.restored > 0 {
            write!(
                f,
                "{} restored, {} defaulted ({} total)",
                self.restored,
                self.defaulted,
                self.total()
            )
        } else {
            write!(f, "{} defaulted", self.defaulted)
        }
    }
}
