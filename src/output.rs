//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every image is shown by its position and file name first, with the
//! details that matter for the command (crops, written files, errors) as
//! indented context lines. Paths are shown relative to the scanned folder
//! or the output root so the listing reads as an inventory.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Images
//! 001 beach.png (6000x4000)
//!     16:9: 6000x3375 at (0, 312)
//!     12:5: 6000x2500 at (0, 750)
//! 002 harbor.png (4000x3000)
//!     Source: trips/harbor.png
//!     16:9: 4000x2250 at (0, 375)
//!     12:5: 4000x1667 at (0, 666)
//!
//! Crops: 1 restored, 1 defaulted (2 total)
//! ```
//!
//! ## Export
//!
//! ```text
//! [001/002] beach.png
//!     Ratio 16x9/beach.png
//!     Ratio 12x5/beach.png
//! [002/002] harbor.png FAILED
//!     decode failed: ...
//!
//! Exported 1 of 2 images (2 files)
//! Failed: 1
//!     harbor.png: decode failed: ...
//! ```
//!
//! ## Ratios
//!
//! ```text
//! 001 16:9 (16:9)
//!     3840x2160 → Ratio 16x9/
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary, MAX_LISTED_FAILURES};
use crate::crop_cache::RestoreStats;
use crate::geometry::{AspectKey, CropRect};
use crate::ratios::{ConfigIssue, RatioGroup};
use crate::session::ImageState;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `001 beach.png (6000x4000)`
fn image_header(index: usize, image: &ImageState) -> String {
    format!(
        "{} {} ({}x{})",
        format_index(index),
        image.name(),
        image.img_w,
        image.img_h
    )
}

fn crop_line(label: &str, rect: CropRect) -> String {
    format!("{}{}: {}", indent(1), label, rect)
}

fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

// ============================================================================
// Scan
// ============================================================================

/// Format the scanned image list with each image's crops, in ratio order.
pub fn format_scan_output(
    images: &[ImageState],
    groups: &[RatioGroup],
    stats: &RestoreStats,
) -> Vec<String> {
    let mut lines = vec!["Images".to_string()];
    for (i, image) in images.iter().enumerate() {
        lines.extend(format_image(i + 1, image, groups));
    }
    if images.is_empty() {
        lines.push(format!("{}(no supported images)", indent(1)));
    }
    lines.push(String::new());
    lines.push(format!("Crops: {stats}"));
    lines
}

/// One image with its crops. The source line appears only for images in
/// subfolders, where the name alone is ambiguous.
pub fn format_image(position: usize, image: &ImageState, groups: &[RatioGroup]) -> Vec<String> {
    let mut lines = vec![image_header(position, image)];
    if image.rel_parent().is_some() {
        lines.push(format!("{}Source: {}", indent(1), image.rel_path.display()));
    }
    for group in groups {
        let key = group.aspect_key();
        if let Some(rect) = image.crops.get(&key) {
            lines.push(crop_line(&key.to_string(), *rect));
        }
    }
    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(images: &[ImageState], groups: &[RatioGroup], stats: &RestoreStats) {
    for line in format_scan_output(images, groups, stats) {
        println!("{}", line);
    }
}

/// Result of a headless crop edit.
pub fn format_crop_result(position: usize, image: &ImageState, key: AspectKey, rect: CropRect) -> Vec<String> {
    vec![image_header(position, image), crop_line(&key.to_string(), rect)]
}

// ============================================================================
// Export
// ============================================================================

fn progress_prefix(completed: usize, total: usize) -> String {
    let width = total.to_string().len().max(3);
    format!("[{completed:0>width$}/{total:0>width$}]")
}

/// Format a single batch event as display lines. `Started` produces none;
/// the finished line follows quickly enough on its own.
pub fn format_batch_event(event: &BatchEvent, output_root: &Path) -> Vec<String> {
    match event {
        BatchEvent::Started { .. } => Vec::new(),
        BatchEvent::Succeeded {
            name,
            written,
            completed,
            total,
            ..
        } => {
            let mut lines = vec![format!("{} {}", progress_prefix(*completed, *total), name)];
            lines.extend(
                written
                    .iter()
                    .map(|p| format!("{}{}", indent(1), relative_display(p, output_root))),
            );
            lines
        }
        BatchEvent::Failed {
            name,
            error,
            completed,
            total,
            ..
        } => vec![
            format!("{} {} FAILED", progress_prefix(*completed, *total), name),
            format!("{}{}", indent(1), error),
        ],
        BatchEvent::Skipped { name, .. } => vec![format!("{}skipped {}", indent(1), name)],
    }
}

/// Aggregate outcome: counts, the first failures, and skipped jobs.
pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Exported {} of {} images ({} files)",
        summary.succeeded, summary.total, summary.files_written
    )];
    if summary.failed() > 0 {
        lines.push(format!("Failed: {}", summary.failed()));
        lines.extend(
            summary
                .failure_lines(MAX_LISTED_FAILURES)
                .into_iter()
                .map(|l| format!("{}{}", indent(1), l)),
        );
    }
    if summary.cancelled() {
        lines.push(format!("Skipped: {} (cancelled)", summary.skipped));
    }
    lines
}

pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Ratios
// ============================================================================

/// Ratio groups with their targets.
pub fn format_ratios(groups: &[RatioGroup]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, group) in groups.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            group.name,
            group.aspect_key()
        ));
        for target in &group.targets {
            lines.push(format!(
                "{}{}x{} → {}/",
                indent(1),
                target.target_w,
                target.target_h,
                target.folder
            ));
        }
    }
    lines
}

pub fn print_ratios(groups: &[RatioGroup]) {
    for line in format_ratios(groups) {
        println!("{}", line);
    }
}

/// Every validation issue, one per line.
pub fn format_config_issues(issues: &[ConfigIssue]) -> Vec<String> {
    let mut lines = vec![format!(
        "{} problem{} found",
        issues.len(),
        if issues.len() == 1 { "" } else { "s" }
    )];
    lines.extend(issues.iter().map(|issue| format!("{}{}", indent(1), issue)));
    lines
}

pub fn print_config_issues(issues: &[ConfigIssue]) {
    for line in format_config_issues(issues) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratios::{Target, default_ratios, validate};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn image(rel: &str, w: u32, h: u32, groups: &[RatioGroup]) -> ImageState {
        let crops: BTreeMap<_, _> = groups
            .iter()
            .map(|g| {
                (
                    g.aspect_key(),
                    crate::geometry::auto_center_max(w, h, g.aspect()),
                )
            })
            .collect();
        ImageState {
            path: PathBuf::from("/photos").join(rel),
            rel_path: PathBuf::from(rel),
            img_w: w,
            img_h: h,
            fingerprint: None,
            crops,
            reviewed: false,
            processed: false,
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn progress_prefix_widens_for_large_batches() {
        assert_eq!(progress_prefix(3, 12), "[003/012]");
        assert_eq!(progress_prefix(7, 1500), "[0007/1500]");
    }

    // =========================================================================
    // Scan output tests
    // =========================================================================

    #[test]
    fn scan_lists_images_and_crops() {
        let groups = default_ratios();
        let images = vec![
            image("beach.png", 6000, 4000, &groups),
            image("trips/harbor.png", 4000, 3000, &groups),
        ];
        let stats = RestoreStats {
            restored: 1,
            defaulted: 1,
        };
        let lines = format_scan_output(&images, &groups, &stats);

        assert_eq!(lines[0], "Images");
        assert_eq!(lines[1], "001 beach.png (6000x4000)");
        assert_eq!(lines[2], "    16:9: 6000x3375 at (0, 312)");
        assert_eq!(lines[3], "    8:5: 6000x3750 at (0, 125)");
        assert_eq!(lines[4], "    12:5: 6000x2500 at (0, 750)");
        assert_eq!(lines[5], "002 harbor.png (4000x3000)");
        assert_eq!(lines[6], "    Source: trips/harbor.png");
        assert_eq!(lines.last().unwrap(), "Crops: 1 restored, 1 defaulted (2 total)");
    }

    #[test]
    fn scan_empty_folder() {
        let lines = format_scan_output(&[], &default_ratios(), &RestoreStats::default());
        assert_eq!(lines[1], "    (no supported images)");
        assert_eq!(lines.last().unwrap(), "Crops: 0 defaulted");
    }

    #[test]
    fn crop_result_lines() {
        let groups = default_ratios();
        let img = image("beach.png", 6000, 4000, &groups);
        let lines = format_crop_result(
            4,
            &img,
            AspectKey::new(16, 9),
            CropRect::new(10, 20, 3200, 1800),
        );
        assert_eq!(
            lines,
            vec!["004 beach.png (6000x4000)", "    16:9: 3200x1800 at (10, 20)"]
        );
    }

    // =========================================================================
    // Export output tests
    // =========================================================================

    #[test]
    fn succeeded_event_lists_relative_files() {
        let event = BatchEvent::Succeeded {
            index: 0,
            name: "beach.png".into(),
            written: vec![
                PathBuf::from("/out/Ratio 16x9/beach.png"),
                PathBuf::from("/out/Ratio 12x5/beach.png"),
            ],
            completed: 1,
            total: 2,
        };
        assert_eq!(
            format_batch_event(&event, Path::new("/out")),
            vec![
                "[001/002] beach.png",
                "    Ratio 16x9/beach.png",
                "    Ratio 12x5/beach.png"
            ]
        );
    }

    #[test]
    fn failed_and_skipped_events() {
        let failed = BatchEvent::Failed {
            index: 1,
            name: "harbor.png".into(),
            error: "decode failed: truncated".into(),
            completed: 2,
            total: 2,
        };
        assert_eq!(
            format_batch_event(&failed, Path::new("/out")),
            vec!["[002/002] harbor.png FAILED", "    decode failed: truncated"]
        );

        let skipped = BatchEvent::Skipped {
            index: 2,
            name: "c.png".into(),
        };
        assert_eq!(format_batch_event(&skipped, Path::new("/out")), vec!["    skipped c.png"]);

        let started = BatchEvent::Started {
            index: 0,
            name: "a.png".into(),
        };
        assert!(format_batch_event(&started, Path::new("/out")).is_empty());
    }

    #[test]
    fn summary_caps_failure_list() {
        let summary = BatchSummary {
            total: 14,
            succeeded: 2,
            files_written: 6,
            failures: (0..12)
                .map(|i| (format!("img{i}.png"), "broken".to_string()))
                .collect(),
            ..Default::default()
        };
        let lines = format_batch_summary(&summary);
        assert_eq!(lines[0], "Exported 2 of 14 images (6 files)");
        assert_eq!(lines[1], "Failed: 12");
        assert_eq!(lines[2], "    img0.png: broken");
        assert_eq!(lines.last().unwrap(), "    ...and 2 more");
        assert_eq!(lines.len(), 2 + MAX_LISTED_FAILURES + 1);
    }

    #[test]
    fn summary_reports_cancellation() {
        let summary = BatchSummary {
            total: 5,
            succeeded: 2,
            files_written: 2,
            skipped: 3,
            ..Default::default()
        };
        assert_eq!(
            format_batch_summary(&summary),
            vec!["Exported 2 of 5 images (2 files)", "Skipped: 3 (cancelled)"]
        );
    }

    // =========================================================================
    // Ratio output tests
    // =========================================================================

    #[test]
    fn ratios_list_targets() {
        let groups = vec![RatioGroup {
            name: "Wide".into(),
            ratio_w: 32,
            ratio_h: 18,
            targets: vec![
                Target::new(3840, 2160, "Wide 4K"),
                Target::new(1920, 1080, "Wide HD"),
            ],
        }];
        assert_eq!(
            format_ratios(&groups),
            vec!["001 Wide (16:9)", "    3840x2160 → Wide 4K/", "    1920x1080 → Wide HD/"]
        );
    }

    #[test]
    fn issues_are_all_listed() {
        let mut groups = default_ratios();
        groups[0].name.clear();
        groups[1].targets.clear();
        let issues = validate(&groups);
        let lines = format_config_issues(&issues);
        assert_eq!(lines[0], format!("{} problems found", issues.len()));
        assert!(lines.iter().any(|l| l.starts_with("    Ratio #1:")));
        assert!(lines.iter().any(|l| l.starts_with("    Ratio #2:")));
    }
}
