use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use futures::channel::oneshot;
use image::RgbaImage;
use log::{info, warn};
use parking_lot::RwLock;

/// Turns a file the `image` crate cannot read (PDF, AI, EMF...) into pixels.
///
/// Implementations are external; only the first page or frame is expected.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, path: &Path) -> Option<RgbaImage>;
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Loads files into pixel buffers.
///
/// Raster formats are decoded directly; other extensions go to the
/// rasterizer registered for them. Failures are logged and yield `None`.
#[derive(Clone, Default)]
pub struct Importer {
    rasterizers: Arc<RwLock<HashMap<String, Arc<dyn Rasterizer>>>>,
}

impl std::fmt::Debug for Importer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<String> = self.rasterizers.read().keys().cloned().collect();
        extensions.sort();
        f.debug_struct("Importer")
            .field("rasterizers", &extensions)
            .finish()
    }
}

impl Importer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route files with `extension` (without the dot, any case) to `rasterizer`.
    pub fn register(&self, extension: &str, rasterizer: Arc<dyn Rasterizer>) {
        self.rasterizers
            .write()
            .insert(extension.trim_start_matches('.').to_ascii_lowercase(), rasterizer);
    }

    pub fn has_rasterizer(&self, extension: &str) -> bool {
        self.rasterizers
            .read()
            .contains_key(&extension.trim_start_matches('.').to_ascii_lowercase())
    }

    pub fn import_blocking(&self, path: &Path) -> Option<RgbaImage> {
        let rasterizer =
            extension_of(path).and_then(|ext| self.rasterizers.read().get(&ext).cloned());
        let pixels = match rasterizer {
            Some(rasterizer) => rasterizer.rasterize(path),
            None => match image::open(path) {
                Ok(image) => Some(image.to_rgba8()),
                Err(e) => {
                    warn!("Failed to import {}: {e}", path.display());
                    None
                }
            },
        };
        let pixels = pixels.filter(|p| p.width() > 0 && p.height() > 0);
        match &pixels {
            Some(p) => info!("Imported {} ({}x{})", path.display(), p.width(), p.height()),
            None => warn!("Nothing imported from {}", path.display()),
        }
        pixels
    }

    /// Import on a worker thread. The document is untouched until the caller
    /// picks the result up on its own thread.
    pub fn import_async(&self, path: impl Into<PathBuf>) -> ImportHandle {
        let path = path.into();
        let (sender, receiver) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let importer = self.clone();
        let flag = Arc::clone(&cancelled);
        let spawned = thread::Builder::new()
            .name("figcraft-import".to_string())
            .spawn(move || {
                if flag.load(Ordering::Acquire) {
                    return;
                }
                let pixels = importer.import_blocking(&path);
                if flag.load(Ordering::Acquire) {
                    info!("Import of {} cancelled", path.display());
                    return;
                }
                // the receiving side may be gone already
                let _ = sender.send(pixels);
            });
        if let Err(e) = spawned {
            warn!("Could not start import worker: {e}");
        }
        ImportHandle {
            receiver,
            cancelled,
            done: false,
        }
    }
}

/// Pending result of [`Importer::import_async`]
#[derive(Debug)]
pub struct ImportHandle {
    receiver: oneshot::Receiver<Option<RgbaImage>>,
    cancelled: Arc<AtomicBool>,
    done: bool,
}

impl ImportHandle {
    /// Stop waiting. The worker drops its result instead of sending it.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.receiver.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Poll without blocking: `None` while still running, then the result
    /// exactly once. Cancelled or failed imports finish as `Some(None)`.
    pub fn try_take(&mut self) -> Option<Option<RgbaImage>> {
        if self.done {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(Some(pixels)) => {
                self.done = true;
                Some(pixels)
            }
            Ok(None) => None,
            Err(oneshot::Canceled) => {
                self.done = true;
                Some(None)
            }
        }
    }

    /// Block until the worker finishes.
    pub fn wait(self) -> Option<RgbaImage> {
        if self.done {
            return None;
        }
        futures::executor::block_on(self.receiver).ok().flatten()
    }
}
