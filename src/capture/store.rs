//! Screenshot Store: two bounded queues of PNG files on disk.
//!
//! Primary and Auxiliary are independent: each holds at most `capacity`
//! entries and evicts its own oldest entry on overflow. An entry and its
//! file live and die together.

use super::thumbnail::{encode_png, media_type_for, thumbnail_data_url};
use super::{QueueKind, ScreenshotRef};
use crate::error::StoreError;
use crate::llm::ImageBlock;
use base64::Engine;
use image::DynamicImage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

struct ScreenshotQueue {
    dir: PathBuf,
    entries: VecDeque<PathBuf>,
}

impl ScreenshotQueue {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            entries: VecDeque::new(),
        }
    }

    fn snapshot(&self) -> Vec<ScreenshotRef> {
        self.entries
            .iter()
            .enumerate()
            .map(|(position, path)| ScreenshotRef {
                path: path.clone(),
                position,
            })
            .collect()
    }

    fn clear(&mut self) {
        for path in self.entries.drain(..) {
            remove_file_quietly(&path);
        }
    }
}

pub struct ScreenshotStore {
    capacity: usize,
    primary: ScreenshotQueue,
    auxiliary: ScreenshotQueue,
}

impl ScreenshotStore {
    /// Files go to `<root>/screenshots` and `<root>/extra_screenshots`.
    /// Directories are created lazily on first capture.
    pub fn new(root: impl AsRef<Path>, capacity: usize) -> Self {
        let root = root.as_ref();
        Self {
            capacity: capacity.max(1),
            primary: ScreenshotQueue::new(root.join("screenshots")),
            auxiliary: ScreenshotQueue::new(root.join("extra_screenshots")),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn queue(&self, kind: QueueKind) -> &ScreenshotQueue {
        match kind {
            QueueKind::Primary => &self.primary,
            QueueKind::Auxiliary => &self.auxiliary,
        }
    }

    fn queue_mut(&mut self, kind: QueueKind) -> &mut ScreenshotQueue {
        match kind {
            QueueKind::Primary => &mut self.primary,
            QueueKind::Auxiliary => &mut self.auxiliary,
        }
    }

    /// Store an image at the back of `kind`, evicting that queue's oldest
    /// entry first when it is full.
    pub fn capture(
        &mut self,
        kind: QueueKind,
        image: &DynamicImage,
    ) -> Result<ScreenshotRef, StoreError> {
        let png_bytes = encode_png(image)?;
        let capacity = self.capacity;
        let queue = self.queue_mut(kind);

        std::fs::create_dir_all(&queue.dir).map_err(|e| StoreError::io(&queue.dir, e))?;
        let path = queue.dir.join(format!("{}.png", uuid::Uuid::new_v4()));
        std::fs::write(&path, &png_bytes).map_err(|e| StoreError::io(&path, e))?;

        while queue.entries.len() >= capacity {
            if let Some(oldest) = queue.entries.pop_front() {
                log::info!("[CAPTURE] {:?} queue full — evicting {}", kind, oldest.display());
                remove_file_quietly(&oldest);
            }
        }
        queue.entries.push_back(path.clone());

        log::info!(
            "[CAPTURE] Stored {} ({} bytes) in {:?} queue, {} of {}",
            path.display(),
            png_bytes.len(),
            kind,
            queue.entries.len(),
            capacity
        );
        Ok(ScreenshotRef {
            path,
            position: queue.entries.len() - 1,
        })
    }

    /// Remove an entry from whichever queue holds it, along with its file.
    pub fn delete(&mut self, path: &Path) -> Result<QueueKind, StoreError> {
        for kind in [QueueKind::Primary, QueueKind::Auxiliary] {
            let queue = self.queue_mut(kind);
            if let Some(index) = queue.entries.iter().position(|p| p == path) {
                if let Some(removed) = queue.entries.remove(index) {
                    remove_file_quietly(&removed);
                }
                log::info!("[CAPTURE] Deleted {} from {:?} queue", path.display(), kind);
                return Ok(kind);
            }
        }
        Err(StoreError::NotFound(path.display().to_string()))
    }

    pub fn list(&self, kind: QueueKind) -> Vec<ScreenshotRef> {
        self.queue(kind).snapshot()
    }

    pub fn list_primary(&self) -> Vec<ScreenshotRef> {
        self.list(QueueKind::Primary)
    }

    pub fn list_auxiliary(&self) -> Vec<ScreenshotRef> {
        self.list(QueueKind::Auxiliary)
    }

    pub fn len(&self, kind: QueueKind) -> usize {
        self.queue(kind).entries.len()
    }

    pub fn is_empty(&self, kind: QueueKind) -> bool {
        self.queue(kind).entries.is_empty()
    }

    pub fn clear_auxiliary(&mut self) {
        self.auxiliary.clear();
    }

    pub fn clear_all(&mut self) {
        self.primary.clear();
        self.auxiliary.clear();
    }

    /// Thumbnail of a stored entry as a data URL.
    pub fn preview(&self, path: &Path) -> Result<String, StoreError> {
        let bytes = std::fs::read(path).map_err(|e| StoreError::io(path, e))?;
        Ok(thumbnail_data_url(&bytes)?)
    }

    /// Read the files behind `refs` as base64 image blocks, in order.
    pub fn load_images(refs: &[ScreenshotRef]) -> Result<Vec<ImageBlock>, StoreError> {
        refs.iter()
            .map(|r| {
                let bytes = std::fs::read(&r.path).map_err(|e| StoreError::io(&r.path, e))?;
                Ok(ImageBlock {
                    media_type: media_type_for(&r.path).to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(bytes),
                })
            })
            .collect()
    }
}

fn remove_file_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("[CAPTURE] Failed to remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot() -> DynamicImage {
        DynamicImage::new_rgb8(8, 8)
    }

    #[test]
    fn capture_at_capacity_evicts_oldest_of_that_queue_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScreenshotStore::new(dir.path(), 2);

        let aux = store.capture(QueueKind::Auxiliary, &shot()).unwrap();
        let first = store.capture(QueueKind::Primary, &shot()).unwrap();
        let second = store.capture(QueueKind::Primary, &shot()).unwrap();
        let third = store.capture(QueueKind::Primary, &shot()).unwrap();

        let primary: Vec<_> = store.list_primary().into_iter().map(|r| r.path).collect();
        assert_eq!(primary, vec![second.path, third.path]);
        assert!(!first.path.exists());
        assert_eq!(store.list_auxiliary(), vec![aux]);
    }

    #[test]
    fn queue_size_never_exceeds_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScreenshotStore::new(dir.path(), 3);
        for i in 0..10 {
            let r = store.capture(QueueKind::Primary, &shot()).unwrap();
            assert!(store.len(QueueKind::Primary) <= 3);
            assert_eq!(r.position, store.len(QueueKind::Primary) - 1);
            if i % 3 == 0 {
                store.delete(&r.path).unwrap();
            }
        }
        assert!(store.len(QueueKind::Primary) <= 3);
    }

    #[test]
    fn delete_renumbers_positions() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScreenshotStore::new(dir.path(), 5);
        let a = store.capture(QueueKind::Primary, &shot()).unwrap();
        let b = store.capture(QueueKind::Primary, &shot()).unwrap();
        let c = store.capture(QueueKind::Primary, &shot()).unwrap();

        assert_eq!(store.delete(&b.path).unwrap(), QueueKind::Primary);
        assert!(!b.path.exists());

        let listed = store.list_primary();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], ScreenshotRef { path: a.path, position: 0 });
        assert_eq!(listed[1], ScreenshotRef { path: c.path, position: 1 });
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScreenshotStore::new(dir.path(), 5);
        let err = store.delete(Path::new("/nope.png")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn clear_auxiliary_keeps_primary() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScreenshotStore::new(dir.path(), 5);
        store.capture(QueueKind::Primary, &shot()).unwrap();
        let aux = store.capture(QueueKind::Auxiliary, &shot()).unwrap();

        store.clear_auxiliary();
        assert!(store.is_empty(QueueKind::Auxiliary));
        assert!(!aux.path.exists());
        assert_eq!(store.len(QueueKind::Primary), 1);

        store.clear_all();
        assert!(store.is_empty(QueueKind::Primary));
    }

    #[test]
    fn load_images_returns_base64_png_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScreenshotStore::new(dir.path(), 5);
        store.capture(QueueKind::Primary, &DynamicImage::new_rgb8(2, 2)).unwrap();
        store.capture(QueueKind::Primary, &DynamicImage::new_rgb8(4, 4)).unwrap();

        let blocks = ScreenshotStore::load_images(&store.list_primary()).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.media_type == "image/png"));
        let second = base64::engine::general_purpose::STANDARD
            .decode(&blocks[1].data)
            .unwrap();
        assert_eq!(image::load_from_memory(&second).unwrap().width(), 4);
    }

    #[test]
    fn preview_of_stored_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScreenshotStore::new(dir.path(), 5);
        let r = store.capture(QueueKind::Primary, &shot()).unwrap();
        assert!(store.preview(&r.path).unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path(), 0);
        assert_eq!(store.capacity(), 1);
    }
}
