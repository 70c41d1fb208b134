use crate::kernel::services::ports::{FileMetadata, SegmentNotification};
use std::sync::OnceLock;

/// Set-once holder for the path and encoding of the searched file.
///
/// Filled from the first notification whose encoding is known; later
/// notifications are ignored.
#[derive(Debug, Default)]
pub struct MetadataCapture {
    cell: OnceLock<FileMetadata>,
}

impl MetadataCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the notification that filled the cell.
    pub fn observe(&self, notification: &SegmentNotification) -> bool {
        if self.cell.get().is_some() {
            return false;
        }
        let Some(encoding) = notification.segments.encoding else {
            return false;
        };
        self.cell
            .set(FileMetadata {
                path: notification.segments.path.clone(),
                encoding,
            })
            .is_ok()
    }

    pub fn get(&self) -> Option<&FileMetadata> {
        self.cell.get()
    }
}
