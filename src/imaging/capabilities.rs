//! External tool detection.
//!
//! Layered (PSD) and vector (AI, SVG) inputs are handed to ImageMagick, and
//! AI files additionally need Ghostscript as ImageMagick's PostScript
//! delegate. Which of those exist is probed once at startup; the result is
//! passed to [`RustBackend`](super::RustBackend) rather than re-queried.

use std::process::{Command, Stdio};

/// Raster formats decoded in-process by the `image` crate.
const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// ImageMagick subcommands that v6 ships as standalone binaries.
const V6_SUBCOMMANDS: &[&str] = &["identify", "composite", "mogrify", "montage"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagickVersion {
    /// Single `magick` binary.
    V7,
    /// `convert`, `identify`, ... as separate binaries.
    V6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub magick: Option<MagickVersion>,
    pub ghostscript: bool,
}

impl Capabilities {
    /// No external tools: raster formats only.
    pub fn none() -> Self {
        Self::default()
    }

    /// Detect ImageMagick and Ghostscript on `PATH`.
    pub fn probe() -> Self {
        let magick = if runs("magick", "--version") {
            Some(MagickVersion::V7)
        } else if runs("convert", "--version") {
            Some(MagickVersion::V6)
        } else {
            None
        };

        let gs_candidates: &[&str] = if cfg!(windows) {
            &["gswin64c", "gswin32c", "gs"]
        } else {
            &["gs"]
        };
        let ghostscript = gs_candidates.iter().any(|cmd| runs(cmd, "--version"));

        let caps = Self {
            magick,
            ghostscript,
        };
        tracing::debug!(?caps, "probed external imaging tools");
        caps
    }

    pub fn has_magick(&self) -> bool {
        self.magick.is_some()
    }

    /// AI files need both ImageMagick and its Ghostscript delegate.
    pub fn can_rasterize_ai(&self) -> bool {
        self.magick.is_some() && self.ghostscript
    }

    /// Input extensions that can be opened with these tools, lowercase.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut exts = RASTER_EXTENSIONS.to_vec();
        if self.has_magick() {
            exts.push("psd");
        }
        if self.can_rasterize_ai() {
            exts.push("ai");
        }
        exts
    }

    /// Build an ImageMagick command that works on v6 and v7.
    ///
    /// A leading subcommand such as `identify` becomes `magick identify` on
    /// v7 and plain `identify` on v6; anything else is a `magick`/`convert`
    /// invocation. Returns `None` when ImageMagick is unavailable.
    pub fn magick_command(&self, args: &[&str]) -> Option<Command> {
        let version = self.magick?;
        let mut cmd = match version {
            MagickVersion::V7 => {
                let mut cmd = Command::new("magick");
                cmd.args(args);
                cmd
            }
            MagickVersion::V6 => match args.split_first() {
                Some((first, rest)) if V6_SUBCOMMANDS.contains(first) => {
                    let mut cmd = Command::new(first);
                    cmd.args(rest);
                    cmd
                }
                _ => {
                    let mut cmd = Command::new("convert");
                    cmd.args(args);
                    cmd
                }
            },
        };
        cmd.stdin(Stdio::null());
        Some(cmd)
    }
}

fn runs(program: &str, arg: &str) -> bool {
    Command::new(program)
        .arg(arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}
