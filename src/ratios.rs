//! Ratio groups and export targets.
//!
//! A [`RatioGroup`] is a named aspect ratio with one or more [`Target`]
//! resolutions. Every target in a group shares one crop rectangle per image;
//! groups are joined to an image's crops by their normalized [`AspectKey`].
//!
//! ## File format
//!
//! `ratios.json` in the application directory holds a versioned envelope:
//!
//! ```json
//! {
//!   "version": 1,
//!   "ratios": [
//!     {
//!       "name": "16:9",
//!       "ratio_w": 16,
//!       "ratio_h": 9,
//!       "targets": [
//!         { "target_w": 3840, "target_h": 2160, "folder": "Ratio 16x9" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! ## Load policy
//!
//! Loading never fails. A missing, unreadable, unparseable, wrong-version or
//! invalid file is replaced with [`default_ratios`] (and the defaults are
//! written back). Saving is strict: the whole configuration is validated
//! first and nothing is written if any issue is found.

use crate::geometry::{AspectKey, CropRect, auto_center_max, clamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the ratio configuration inside the application directory.
pub const RATIOS_FILENAME: &str = "ratios.json";

const FORMAT_VERSION: u32 = 1;

const INVALID_FOLDER_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\', '\0'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid ratio configuration:\n{}", format_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One validation failure, located by 1-based group/target position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub location: String,
    pub message: String,
}

impl ConfigIssue {
    fn group(index: usize, message: impl Into<String>) -> Self {
        Self {
            location: format!("Ratio #{}", index + 1),
            message: message.into(),
        }
    }

    fn target(group: usize, target: usize, message: impl Into<String>) -> Self {
        Self {
            location: format!("Ratio #{} target #{}", group + 1, target + 1),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// One output resolution and its destination folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    pub target_w: u32,
    pub target_h: u32,
    /// Single directory component under the output root.
    pub folder: String,
}

impl Target {
    pub fn new(target_w: u32, target_h: u32, folder: impl Into<String>) -> Self {
        Self {
            target_w,
            target_h,
            folder: folder.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatioGroup {
    pub name: String,
    pub ratio_w: u32,
    pub ratio_h: u32,
    pub targets: Vec<Target>,
}

impl RatioGroup {
    /// Normalized key joining this group to image crops.
    ///
    /// # Panics
    /// If either ratio component is zero. Validated groups never are.
    pub fn aspect_key(&self) -> AspectKey {
        AspectKey::new(self.ratio_w, self.ratio_h)
    }

    pub fn aspect(&self) -> (u32, u32) {
        (self.ratio_w, self.ratio_h)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RatiosFile {
    version: u32,
    ratios: Vec<RatioGroup>,
}

/// Built-in configuration used on first launch and whenever the file is
/// unusable.
pub fn default_ratios() -> Vec<RatioGroup> {
    [(16, 9, 2160), (16, 10, 2400), (12, 5, 1600)]
        .into_iter()
        .map(|(w, h, target_h)| RatioGroup {
            name: format!("{w}:{h}"),
            ratio_w: w,
            ratio_h: h,
            targets: vec![Target::new(3840, target_h, format!("Ratio {w}x{h}"))],
        })
        .collect()
}

// ============================================================================
// Validation
// ============================================================================

/// Check that a folder name is safe to use as one directory component on
/// every desktop platform. Returns the problem, or `None` if valid.
pub fn validate_folder_name(folder: &str) -> Option<String> {
    let trimmed = folder.trim();
    if trimmed.is_empty() {
        return Some("folder must be a non-empty string".into());
    }
    if folder != trimmed || folder.starts_with('.') || folder.ends_with('.') {
        return Some("folder must not start or end with a dot or space".into());
    }
    if folder.contains("..") || folder.contains('/') || folder.contains('\\') {
        return Some("folder must not contain path separators or '..'".into());
    }
    if Path::new(folder).is_absolute() {
        return Some("folder must not be an absolute path".into());
    }

    let mut bad: Vec<char> = folder
        .chars()
        .filter(|c| INVALID_FOLDER_CHARS.contains(c))
        .collect();
    if !bad.is_empty() {
        bad.sort_unstable();
        bad.dedup();
        let listed: Vec<String> = bad.iter().map(|c| format!("{c:?}")).collect();
        return Some(format!(
            "folder contains invalid characters: {}",
            listed.join(" ")
        ));
    }

    let stem = folder.split('.').next().unwrap_or(folder).to_ascii_uppercase();
    if RESERVED_NAMES.contains(&stem.as_str()) {
        return Some(format!("folder uses reserved name '{stem}'"));
    }

    None
}

/// Validate a whole configuration, collecting every issue.
pub fn validate(groups: &[RatioGroup]) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    let mut keys_seen: HashMap<AspectKey, &str> = HashMap::new();
    let mut folders_seen: HashMap<&str, String> = HashMap::new();

    if groups.is_empty() {
        issues.push(ConfigIssue {
            location: "Ratios".into(),
            message: "at least one ratio group is required".into(),
        });
    }

    for (i, group) in groups.iter().enumerate() {
        let name = group.name.as_str();
        if name.trim().is_empty() {
            issues.push(ConfigIssue::group(i, "name must be a non-empty string"));
        }

        let mut positive = true;
        for (field, value) in [("ratio_w", group.ratio_w), ("ratio_h", group.ratio_h)] {
            if value == 0 {
                positive = false;
                issues.push(ConfigIssue::group(
                    i,
                    format!("{field} must be a positive integer, got {value}"),
                ));
            }
        }

        if positive {
            let key = group.aspect_key();
            match keys_seen.get(&key) {
                Some(first) => issues.push(ConfigIssue::group(
                    i,
                    format!(
                        "('{name}') normalized aspect ratio {key} duplicates group '{first}'"
                    ),
                )),
                None => {
                    keys_seen.insert(key, name);
                }
            }
        }

        if group.targets.is_empty() {
            issues.push(ConfigIssue::group(i, "targets must be a non-empty list"));
            continue;
        }

        for (j, target) in group.targets.iter().enumerate() {
            // Targets may stretch their group's crop slightly: 3440x1440 and
            // 2560x1080 both sit under 21:9.
            for (field, value) in [("target_w", target.target_w), ("target_h", target.target_h)] {
                if value == 0 {
                    issues.push(ConfigIssue::target(
                        i,
                        j,
                        format!("{field} must be a positive integer, got {value}"),
                    ));
                }
            }

            if let Some(problem) = validate_folder_name(&target.folder) {
                issues.push(ConfigIssue::target(i, j, problem));
            }

            let folder = target.folder.trim();
            if !folder.is_empty() {
                match folders_seen.get(folder) {
                    Some(first) => issues.push(ConfigIssue::target(
                        i,
                        j,
                        format!("duplicate folder '{folder}' (also used by {first})"),
                    )),
                    None => {
                        folders_seen.insert(folder, format!("'{name}' target #{}", j + 1));
                    }
                }
            }
        }
    }

    issues
}

// ============================================================================
// Persistence
// ============================================================================

/// Location of `ratios.json` and its load/save policy.
#[derive(Debug, Clone)]
pub struct RatioStore {
    path: PathBuf,
}

impl RatioStore {
    /// Store for `ratios.json` inside `config_dir`.
    pub fn new(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(RATIOS_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, healing it with defaults when unusable.
    pub fn load(&self) -> Vec<RatioGroup> {
        match self.try_load() {
            Ok(groups) => groups,
            Err(reason) => {
                tracing::warn!(path = %self.path.display(), "{reason}; restoring default ratios");
                self.write_defaults();
                default_ratios()
            }
        }
    }

    fn try_load(&self) -> Result<Vec<RatioGroup>, String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err("ratio configuration not found".into());
            }
            Err(e) => return Err(format!("failed to read ratio configuration: {e}")),
        };
        let file: RatiosFile = serde_json::from_str(&content)
            .map_err(|e| format!("failed to parse ratio configuration: {e}"))?;
        if file.version != FORMAT_VERSION {
            return Err(format!(
                "unsupported ratio configuration version {}",
                file.version
            ));
        }
        let issues = validate(&file.ratios);
        if !issues.is_empty() {
            return Err(format!(
                "ratio configuration failed validation:\n{}",
                format_issues(&issues)
            ));
        }
        Ok(file.ratios)
    }

    /// Validate and write. Nothing is written when validation fails.
    pub fn save(&self, groups: &[RatioGroup]) -> Result<(), ConfigError> {
        let issues = validate(groups);
        if !issues.is_empty() {
            return Err(ConfigError::Invalid(issues));
        }
        self.write(groups)?;
        tracing::info!(
            path = %self.path.display(),
            "saved {} ratio group(s)",
            groups.len()
        );
        Ok(())
    }

    fn write(&self, groups: &[RatioGroup]) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, to_envelope_json(groups)?)?;
        Ok(())
    }

    fn write_defaults(&self) {
        if let Err(e) = self.write(&default_ratios()) {
            tracing::error!(path = %self.path.display(), "could not write default ratios: {e}");
        }
    }
}

/// Pretty-printed versioned envelope for a configuration.
pub fn to_envelope_json(groups: &[RatioGroup]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&RatiosFile {
        version: FORMAT_VERSION,
        ratios: groups.to_vec(),
    })
}

/// Parse a configuration envelope without validating it.
pub fn from_envelope_json(json: &str) -> Result<Vec<RatioGroup>, ConfigError> {
    let file: RatiosFile = serde_json::from_str(json)?;
    if file.version != FORMAT_VERSION {
        return Err(ConfigError::Invalid(vec![ConfigIssue {
            location: "Envelope".into(),
            message: format!("unsupported version {}", file.version),
        }]));
    }
    Ok(file.ratios)
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Bring one image's crops in line with a new configuration.
///
/// Crops for keys that no longer exist are dropped, crops for new keys get
/// the auto-center-max default, and crops for surviving keys are kept
/// (clamped to the image).
pub fn reconcile_crops(
    crops: &BTreeMap<AspectKey, CropRect>,
    groups: &[RatioGroup],
    img_w: u32,
    img_h: u32,
) -> BTreeMap<AspectKey, CropRect> {
    groups
        .iter()
        .map(|group| {
            let key = group.aspect_key();
            let rect = match crops.get(&key) {
                Some(existing) => clamp(*existing, img_w, img_h),
                None => auto_center_max(img_w, img_h, group.aspect()),
            };
            (key, rect)
        })
        .collect()
}
