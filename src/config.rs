//! Application directory and processing settings.
//!
//! ## Application Directory
//!
//! Ratio definitions and the crop cache live in one per-user directory:
//!
//! ```text
//! ~/.config/wallcrop/          # dirs::config_dir() on Linux
//! ├── ratios.json              # ratio groups and targets
//! └── crop_cache.json          # crops keyed by content fingerprint
//! ```
//!
//! The location is resolved in order:
//!
//! 1. `--config-dir <PATH>` on the command line
//! 2. the `WALLCROP_CONFIG_DIR` environment variable
//! 3. the platform config directory joined with `wallcrop`
//!
//! ## Workers
//!
//! Export runs on `cores - 1` workers, keeping one core for the
//! coordinating thread. A configured maximum can only lower that.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the application directory.
pub const CONFIG_DIR_ENV: &str = "WALLCROP_CONFIG_DIR";

/// Directory name under the platform config directory.
pub const APP_DIR_NAME: &str = "wallcrop";

#[derive(Error, Debug)]
pub enum AppDirError {
    #[error("no configuration directory: set {CONFIG_DIR_ENV} or pass --config-dir")]
    Unavailable,
    #[error("cannot create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve the application directory from the flag, the environment, and
/// the platform default, then create it.
pub fn resolve_config_dir(flag: Option<&Path>) -> Result<PathBuf, AppDirError> {
    let dir = pick_config_dir(
        flag,
        std::env::var_os(CONFIG_DIR_ENV),
        dirs::config_dir(),
    )
    .ok_or(AppDirError::Unavailable)?;
    std::fs::create_dir_all(&dir).map_err(|source| AppDirError::Create {
        path: dir.clone(),
        source,
    })?;
    tracing::debug!(path = %dir.display(), "using application directory");
    Ok(dir)
}

fn pick_config_dir(
    flag: Option<&Path>,
    env: Option<OsString>,
    platform: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(flag) = flag {
        return Some(flag.to_path_buf());
    }
    if let Some(env) = env.filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(env));
    }
    platform.map(|base| base.join(APP_DIR_NAME))
}

/// Parallel export settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of export workers.
    /// When absent, defaults to one less than the number of CPU cores.
    /// Larger values are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective worker count.
///
/// - `None` → `max(1, cores - 1)`
/// - `Some(n)` → `min(n, that)`, never below 1
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    workers_for(cores, config.max_workers)
}

fn workers_for(cores: usize, max_workers: Option<usize>) -> usize {
    let available = cores.saturating_sub(1).max(1);
    max_workers
        .map(|n| n.clamp(1, available))
        .unwrap_or(available)
}
