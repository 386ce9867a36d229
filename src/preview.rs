//! Background decoding for the interactive preview.
//!
//! Every [`PreviewLoader::request`] starts a decode on its own thread and
//! bumps a generation counter. Decodes are never interrupted; when a result
//! arrives for a generation that is no longer the latest, it is dropped.

use crate::imaging::{BackendError, ImageBackend};
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// A decoded preview for the current selection.
#[derive(Debug)]
pub struct Preview {
    pub generation: u64,
    /// Position of the image in the session.
    pub index: usize,
    pub image: Result<DynamicImage, BackendError>,
    /// Source pixels per preview pixel (1.0 when not downscaled).
    pub scale: f64,
}

pub struct PreviewLoader<B> {
    backend: Arc<B>,
    latest: Arc<AtomicU64>,
    max_side: Option<u32>,
    tx: Sender<Preview>,
    rx: Receiver<Preview>,
}

impl<B: ImageBackend + Send + 'static> PreviewLoader<B> {
    pub fn new(backend: Arc<B>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            latest: Arc::new(AtomicU64::new(0)),
            max_side: None,
            tx,
            rx,
        }
    }

    /// Downscale previews so their longest side is at most `max_side`.
    pub fn with_max_side(mut self, max_side: u32) -> Self {
        self.max_side = Some(max_side.max(1));
        self
    }

    /// Generation of the most recent request.
    pub fn current(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Start decoding `path`, superseding any request still in flight.
    pub fn request(&self, index: usize, path: PathBuf) -> u64 {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let max_side = self.max_side;

        let spawned = std::thread::Builder::new()
            .name(format!("wallcrop-preview-{generation}"))
            .spawn(move || {
                let (image, scale) = match backend.decode(&path) {
                    Ok(img) => {
                        let (img, scale) = fit(img, max_side);
                        (Ok(img), scale)
                    }
                    Err(e) => (Err(e), 1.0),
                };
                let _ = tx.send(Preview {
                    generation,
                    index,
                    image,
                    scale,
                });
            });
        if let Err(e) = spawned {
            tracing::warn!("could not start preview decode: {e}");
        }
        generation
    }

    /// Drop whatever is in flight without starting a new decode.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    /// Return the latest preview if it has arrived, discarding stale ones.
    pub fn poll(&self) -> Option<Preview> {
        while let Ok(preview) = self.rx.try_recv() {
            if let Some(fresh) = self.accept(preview) {
                return Some(fresh);
            }
        }
        None
    }

    /// Block until the latest preview arrives or `timeout` passes.
    pub fn wait(&self, timeout: Duration) -> Option<Preview> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(preview) => {
                    if let Some(fresh) = self.accept(preview) {
                        return Some(fresh);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn accept(&self, preview: Preview) -> Option<Preview> {
        let latest = self.current();
        if preview.generation == latest {
            Some(preview)
        } else {
            tracing::debug!(
                "discarding stale preview for image {} (generation {}, latest {latest})",
                preview.index,
                preview.generation
            );
            None
        }
    }
}

fn fit(img: DynamicImage, max_side: Option<u32>) -> (DynamicImage, f64) {
    let longest = img.width().max(img.height());
    match max_side {
        Some(max) if longest > max => {
            let small = img.thumbnail(max, max);
            let scale = longest as f64 / small.width().max(small.height()) as f64;
            (small, scale)
        }
        _ => (img, 1.0),
    }
}
