//! The working set of images and their crops.
//!
//! A [`Session`] owns everything the crop editor mutates: the active ratio
//! configuration, the crop cache, and one [`ImageState`] per scanned file.
//! Nothing here is shared with export workers; [`Session::build_jobs`] hands
//! out self-contained copies instead.
//!
//! ## Cache checkpoints
//!
//! Every crop edit updates the in-memory [`CropCache`] at once. The file is
//! only written at checkpoints:
//!
//! | Checkpoint | Method |
//! |---|---|
//! | folder scanned | [`Session::scan`] |
//! | selection changed | [`Session::select`] |
//! | ratios replaced | [`Session::replace_ratios`] |
//! | shutdown | [`Session::close`] |
//!
//! A failed write is logged and the session carries on.

use crate::crop_cache::{self, CropCache, RestoreStats};
use crate::export::{ExportJob, ExportReport};
use crate::geometry::{
    self, AspectKey, CropRect, Direction, DragMode, NudgeStep, auto_center_max, clamp,
};
use crate::imaging::{ExportSettings, ImageBackend, LogoSettings};
use crate::ratios::{ConfigError, RatioGroup, RatioStore, reconcile_crops};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("not a folder: {}", .0.display())]
    NotAFolder(PathBuf),
    #[error("cannot scan folder: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no image at position {0}")]
    NoSuchImage(usize),
    #[error("ratio {0} is not configured")]
    UnknownRatio(AspectKey),
}

/// One scanned source image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageState {
    pub path: PathBuf,
    /// Path relative to the scanned folder.
    pub rel_path: PathBuf,
    pub img_w: u32,
    pub img_h: u32,
    /// `None` when the file could not be fingerprinted; such images are
    /// never cached.
    pub fingerprint: Option<String>,
    pub crops: BTreeMap<AspectKey, CropRect>,
    pub reviewed: bool,
    pub processed: bool,
}

impl ImageState {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Subfolder mirrored under each target folder, if any.
    pub fn rel_parent(&self) -> Option<PathBuf> {
        self.rel_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

/// Review and export counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub total: usize,
    pub reviewed: usize,
    pub processed: usize,
}

pub struct Session {
    config_dir: PathBuf,
    store: RatioStore,
    ratios: Vec<RatioGroup>,
    cache: CropCache,
    root: Option<PathBuf>,
    images: Vec<ImageState>,
    selected: Option<usize>,
}

impl Session {
    /// Load ratios (healing them if needed) and the crop cache from the
    /// application directory.
    pub fn open(config_dir: &Path) -> Self {
        let store = RatioStore::new(config_dir);
        let ratios = store.load();
        let cache = CropCache::load(config_dir);
        Self {
            config_dir: config_dir.to_path_buf(),
            store,
            ratios,
            cache,
            root: None,
            images: Vec::new(),
            selected: None,
        }
    }

    pub fn ratios(&self) -> &[RatioGroup] {
        &self.ratios
    }

    pub fn images(&self) -> &[ImageState] {
        &self.images
    }

    pub fn image(&self, index: usize) -> Result<&ImageState, SessionError> {
        self.images.get(index).ok_or(SessionError::NoSuchImage(index))
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn cache(&self) -> &CropCache {
        &self.cache
    }

    /// Position of the image at `path`.
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.images.iter().position(|img| img.path == path)
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    /// Replace the image list with the supported files under `root`.
    ///
    /// Files are sorted case-insensitively by relative path. Files whose
    /// dimensions can't be read are skipped. Crops come from the cache when
    /// it has them, reconciled against the current ratios, and default to
    /// auto-center-max otherwise.
    ///
    /// Scanning only reads the cache. Entries are written by edits and ratio
    /// changes, so crops for ratios outside the current configuration stay
    /// cached for when that ratio comes back.
    pub fn scan(
        &mut self,
        backend: &impl ImageBackend,
        root: &Path,
        recursive: bool,
    ) -> Result<RestoreStats, SessionError> {
        if !root.is_dir() {
            return Err(SessionError::NotAFolder(root.to_path_buf()));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).max_depth(max_depth) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if entry.file_type().is_file() && backend.supports(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort_by_cached_key(|p| {
            p.strip_prefix(root)
                .unwrap_or(p)
                .to_string_lossy()
                .to_lowercase()
        });

        let mut stats = RestoreStats::default();
        let mut images = Vec::with_capacity(files.len());
        for path in files {
            let dims = match backend.identify(&path) {
                Ok(dims) if dims.width > 0 && dims.height > 0 => dims,
                Ok(_) => {
                    tracing::warn!("skipping {}: image has no pixels", path.display());
                    continue;
                }
                Err(e) => {
                    tracing::warn!("skipping {}: {e}", path.display());
                    continue;
                }
            };
            let fingerprint = match crop_cache::fingerprint(&path) {
                Ok(fp) => Some(fp),
                Err(e) => {
                    tracing::warn!("cannot fingerprint {}, crops won't be cached: {e}", path.display());
                    None
                }
            };

            let cached = fingerprint
                .as_deref()
                .and_then(|fp| self.cache.lookup(fp, dims.width, dims.height));
            let crops = match cached {
                Some(cached) => {
                    stats.restore();
                    reconcile_crops(&cached, &self.ratios, dims.width, dims.height)
                }
                None => {
                    stats.default_crop();
                    default_crops(&self.ratios, dims.width, dims.height)
                }
            };

            images.push(ImageState {
                rel_path: path.strip_prefix(root).unwrap_or(&path).to_path_buf(),
                path,
                img_w: dims.width,
                img_h: dims.height,
                fingerprint,
                crops,
                reviewed: false,
                processed: false,
            });
        }

        tracing::info!("scanned {}: {} image(s), {stats}", root.display(), images.len());
        self.images = images;
        self.root = Some(root.to_path_buf());
        self.selected = None;
        self.flush_cache();
        Ok(stats)
    }

    // ========================================================================
    // Selection and crop edits
    // ========================================================================

    /// Make `index` the current image. Flushes the cache and marks the
    /// image reviewed.
    pub fn select(&mut self, index: usize) -> Result<&ImageState, SessionError> {
        if index >= self.images.len() {
            return Err(SessionError::NoSuchImage(index));
        }
        self.flush_cache();
        self.selected = Some(index);
        let image = &mut self.images[index];
        image.reviewed = true;
        Ok(image)
    }

    pub fn crop(&self, index: usize, key: AspectKey) -> Result<CropRect, SessionError> {
        self.image(index)?
            .crops
            .get(&key)
            .copied()
            .ok_or(SessionError::UnknownRatio(key))
    }

    /// Replace a crop. The rectangle is clamped to the image.
    pub fn set_crop(
        &mut self,
        index: usize,
        key: AspectKey,
        rect: CropRect,
    ) -> Result<CropRect, SessionError> {
        self.edit(index, key, |_, img_w, img_h| clamp(rect, img_w, img_h))
    }

    /// Apply a pointer drag that started at `press` with the crop at
    /// `start`. Called on every pointer move with the same `start`.
    pub fn drag(
        &mut self,
        index: usize,
        key: AspectKey,
        mode: DragMode,
        start: CropRect,
        press: (f64, f64),
        pointer: (f64, f64),
    ) -> Result<CropRect, SessionError> {
        self.edit(index, key, |_, img_w, img_h| {
            geometry::drag(mode, start, key.as_f64(), press, pointer, img_w, img_h)
        })
    }

    pub fn nudge(
        &mut self,
        index: usize,
        key: AspectKey,
        direction: Direction,
        step: NudgeStep,
    ) -> Result<CropRect, SessionError> {
        self.edit(index, key, |current, img_w, img_h| {
            geometry::nudge(current, direction, step, img_w, img_h)
        })
    }

    /// Reset one crop to auto-center-max.
    pub fn auto_center(&mut self, index: usize, key: AspectKey) -> Result<CropRect, SessionError> {
        self.edit(index, key, |_, img_w, img_h| {
            auto_center_max(img_w, img_h, key.ratio())
        })
    }

    /// Reset every crop of an image to auto-center-max.
    pub fn auto_center_all(&mut self, index: usize) -> Result<(), SessionError> {
        let image = self
            .images
            .get_mut(index)
            .ok_or(SessionError::NoSuchImage(index))?;
        image.crops = default_crops(&self.ratios, image.img_w, image.img_h);
        self.remember(index);
        Ok(())
    }

    fn edit(
        &mut self,
        index: usize,
        key: AspectKey,
        apply: impl FnOnce(CropRect, u32, u32) -> CropRect,
    ) -> Result<CropRect, SessionError> {
        let image = self
            .images
            .get_mut(index)
            .ok_or(SessionError::NoSuchImage(index))?;
        let current = image
            .crops
            .get_mut(&key)
            .ok_or(SessionError::UnknownRatio(key))?;
        *current = apply(*current, image.img_w, image.img_h);
        let rect = *current;
        self.remember(index);
        Ok(rect)
    }

    /// Copy an image's crops into the in-memory cache.
    fn remember(&mut self, index: usize) {
        let image = &self.images[index];
        if let Some(fp) = &image.fingerprint {
            self.cache.store(fp, image.img_w, image.img_h, &image.crops);
        }
    }

    // ========================================================================
    // Ratio changes
    // ========================================================================

    /// Validate and persist a new ratio configuration, then reconcile every
    /// loaded image against it. Nothing changes when validation fails.
    pub fn replace_ratios(&mut self, groups: Vec<RatioGroup>) -> Result<(), SessionError> {
        self.store.save(&groups)?;
        self.ratios = groups;
        for index in 0..self.images.len() {
            let image = &mut self.images[index];
            image.crops = reconcile_crops(&image.crops, &self.ratios, image.img_w, image.img_h);
            self.remember(index);
        }
        self.flush_cache();
        Ok(())
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// One self-contained job per image.
    pub fn build_jobs(
        &self,
        output_root: &Path,
        settings: &ExportSettings,
        logo: Option<&LogoSettings>,
    ) -> Vec<ExportJob> {
        self.images
            .iter()
            .enumerate()
            .map(|(index, image)| ExportJob {
                index,
                source: image.path.clone(),
                img_w: image.img_w,
                img_h: image.img_h,
                crops: image.crops.clone(),
                groups: self.ratios.clone(),
                output_root: output_root.to_path_buf(),
                rel_parent: image.rel_parent(),
                settings: *settings,
                logo: logo.cloned(),
            })
            .collect()
    }

    /// Record a finished export job.
    pub fn apply_report(&mut self, report: &ExportReport) {
        if report.is_success()
            && let Some(image) = self.images.get_mut(report.index)
        {
            image.processed = true;
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            total: self.images.len(),
            reviewed: self.images.iter().filter(|i| i.reviewed).count(),
            processed: self.images.iter().filter(|i| i.processed).count(),
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the crop cache. Failures are logged, never returned.
    pub fn flush_cache(&self) {
        if let Err(e) = self.cache.save(&self.config_dir) {
            tracing::warn!(
                path = %crop_cache::cache_path(&self.config_dir).display(),
                "failed to save crop cache: {e}"
            );
        }
    }

    /// Final checkpoint.
    pub fn close(self) {
        self.flush_cache();
    }
}

fn default_crops(groups: &[RatioGroup], img_w: u32, img_h: u32) -> BTreeMap<AspectKey, CropRect> {
    groups
        .iter()
        .map(|g| (g.aspect_key(), auto_center_max(img_w, img_h, g.aspect())))
        .collect()
}
