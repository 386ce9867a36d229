//! Per-image export: decode once, crop once per ratio group, resize per
//! target, overlay the logo, encode.
//!
//! An [`ExportJob`] is fully self-contained (paths, dimensions, crop
//! rectangles, ratio definitions, encoder and logo settings) and
//! serializable, so a worker never reaches back into session state. Every
//! failure, including a panic inside a decoder, comes back as an
//! [`ExportReport`] tagged with the image's index and name.
//!
//! ## Output layout
//!
//! ```text
//! <output_root>/
//! ├── Ratio 16x9/
//! │   ├── beach.png
//! │   ├── beach-01.png           # second source also named beach.*
//! │   └── trips/2024/            # input subfolder mirrored
//! │       └── harbor.png
//! └── Ratio 12x5/
//!     └── beach.png
//! ```
//!
//! Existing files are never overwritten: names are reserved with
//! create-new semantics and collide forward to `-01`, `-02`, ...

use crate::geometry::{AspectKey, CropRect, auto_center_max, clamp};
use crate::imaging::operations::{self, EncodeError};
use crate::imaging::{BackendError, ExportSettings, ImageBackend, LogoSettings};
use crate::ratios::RatioGroup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("decode failed: {0}")]
    Decode(#[source] BackendError),
    #[error("logo failed: {0}")]
    Logo(#[source] BackendError),
    #[error("encode failed for {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Everything needed to export one source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    /// Position in the session's image list.
    pub index: usize,
    pub source: PathBuf,
    pub img_w: u32,
    pub img_h: u32,
    /// Crop per aspect key. Groups without an entry use auto-center-max.
    pub crops: BTreeMap<AspectKey, CropRect>,
    pub groups: Vec<RatioGroup>,
    pub output_root: PathBuf,
    /// Source subfolder relative to the scanned root, mirrored under each
    /// target folder.
    pub rel_parent: Option<PathBuf>,
    pub settings: ExportSettings,
    pub logo: Option<LogoSettings>,
}

impl ExportJob {
    /// Source file name for reports.
    pub fn name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }

    fn stem(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string())
    }

    /// Directory a target's files go to.
    pub fn output_dir(&self, folder: &str) -> PathBuf {
        let dir = self.output_root.join(folder);
        match &self.rel_parent {
            Some(rel) => dir.join(rel),
            None => dir,
        }
    }

    /// Total files this job writes on success.
    pub fn output_count(&self) -> usize {
        self.groups.iter().map(|g| g.targets.len()).sum()
    }
}

/// Outcome of one job, sent back to the orchestrator.
#[derive(Debug)]
pub struct ExportReport {
    pub index: usize,
    pub name: String,
    /// Written paths, in group/target order.
    pub outcome: Result<Vec<PathBuf>, ExportError>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Reserve `dir/stem.ext`, or the first free `dir/stem-NN.ext`.
///
/// The file is created atomically, so two workers exporting same-named
/// sources into one folder always end up with distinct files.
pub fn reserve_unique_path(dir: &Path, stem: &str, ext: &str) -> io::Result<(PathBuf, File)> {
    let mut counter: u32 = 0;
    loop {
        let name = if counter == 0 {
            format!("{stem}.{ext}")
        } else {
            format!("{stem}-{counter:02}.{ext}")
        };
        let candidate = dir.join(name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Export one image to every target of every group.
pub fn export_image(
    backend: &impl ImageBackend,
    job: &ExportJob,
) -> Result<Vec<PathBuf>, ExportError> {
    let img = backend
        .decode(&job.source)
        .map_err(ExportError::Decode)?
        .to_rgb8();
    let (img_w, img_h) = img.dimensions();
    if img_w == 0 || img_h == 0 {
        return Err(ExportError::Decode(BackendError::Decode(format!(
            "{} decoded to an empty image",
            job.source.display()
        ))));
    }
    if (img_w, img_h) != (job.img_w, job.img_h) {
        tracing::warn!(
            "{}: decoded size {img_w}x{img_h} differs from scanned {}x{}",
            job.name(),
            job.img_w,
            job.img_h
        );
    }

    let stem = job.stem();
    let ext = job.settings.format.extension();
    let mut written = Vec::with_capacity(job.output_count());

    for group in &job.groups {
        let rect = match job.crops.get(&group.aspect_key()) {
            Some(stored) => clamp(*stored, img_w, img_h),
            None => auto_center_max(img_w, img_h, group.aspect()),
        };
        let cropped = operations::crop(&img, rect);

        for target in &group.targets {
            let mut out = operations::resize_exact(&cropped, target.target_w, target.target_h);
            if let Some(logo) = &job.logo {
                out = operations::composite_logo(backend, out, logo).map_err(ExportError::Logo)?;
            }

            let dir = job.output_dir(&target.folder);
            fs::create_dir_all(&dir).map_err(|source| ExportError::Io {
                path: dir.clone(),
                source,
            })?;
            let (path, file) =
                reserve_unique_path(&dir, &stem, ext).map_err(|source| ExportError::Io {
                    path: dir.join(format!("{stem}.{ext}")),
                    source,
                })?;

            if let Err(source) = operations::encode(&out, BufWriter::new(file), &job.settings) {
                // Leave no truncated file behind
                let _ = fs::remove_file(&path);
                return Err(ExportError::Encode { path, source });
            }
            tracing::debug!(path = %path.display(), "wrote {}x{}", target.target_w, target.target_h);
            written.push(path);
        }
    }

    Ok(written)
}

/// Run a job with panic isolation and wrap the outcome in a report.
pub fn run_job(backend: &impl ImageBackend, job: &ExportJob) -> ExportReport {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| export_image(backend, job)))
        .unwrap_or_else(|payload| Err(ExportError::Panicked(panic_message(payload.as_ref()))));
    ExportReport {
        index: job.index,
        name: job.name(),
        outcome,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
