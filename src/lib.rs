//! # wallcrop
//!
//! Batch wallpaper cropping: one crop per aspect ratio for every image in a
//! folder, exported to any number of target resolutions.
//!
//! # Architecture
//!
//! ```text
//! scan      folder  →  Session (ImageState per file, crops from cache or default)
//! edit      Session →  geometry engine (drag, nudge, clamp) → crop cache
//! export    Session →  ExportJob per image → worker pool → target folders
//! ```
//!
//! The interactive editor is an external collaborator: it drives a
//! [`session::Session`] and renders [`preview::PreviewLoader`] output. The
//! `wallcrop` binary drives the same API headlessly.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Crop rectangles, aspect keys, max/center crops, clamp, corner-drag resize, nudge |
//! | [`ratios`] | Ratio groups and targets: validation, self-healing `ratios.json`, reconciliation |
//! | [`crop_cache`] | Crops keyed by content fingerprint, persisted as `crop_cache.json` |
//! | [`session`] | The scanned image list, crop edits, cache checkpoints, job building |
//! | [`preview`] | Background decode of the selected image with stale-result dropping |
//! | [`export`] | One image → every target file, with panic isolation |
//! | [`batch`] | Worker pool, per-job status, cancellation, aggregate summary |
//! | [`imaging`] | Decode backends, tool probe, crop/resize/logo/encode operations |
//! | [`config`] | Application directory resolution and worker count |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content Fingerprints, Not Paths
//!
//! Crops are cached under a fingerprint of the file's size and the hash of
//! its first 64 KiB. Renaming or moving a wallpaper keeps its crops; editing
//! it in place invalidates them. The stored dimensions guard against the rare
//! prefix collision.
//!
//! ## Self-Contained Jobs
//!
//! An [`export::ExportJob`] carries copies of everything it needs. Workers
//! share nothing mutable with the session, so the pool needs no locks and a
//! panicking decoder only fails its own image.
//!
//! ## Heal, Don't Fail
//!
//! A corrupt or outdated `ratios.json` is replaced with the built-in
//! defaults; a corrupt crop cache starts empty. Neither blocks startup.
//! Saving a configuration, on the other hand, is all-or-nothing and reports
//! every problem at once.

pub mod batch;
pub mod config;
pub mod crop_cache;
pub mod export;
pub mod geometry;
pub mod imaging;
pub mod output;
pub mod preview;
pub mod ratios;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
