use crate::kernel::services::ports::{Segment, SegmentNotification};

/// Projects the segment list out of upstream notifications, dropping
/// consecutive sets that are structurally equal to the previous one.
#[derive(Debug, Default)]
pub struct SegmentDescriptorStore {
    current: Option<Vec<Segment>>,
}

impl SegmentDescriptorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new segment set, or `None` if it did not change.
    pub fn observe(&mut self, notification: &SegmentNotification) -> Option<&[Segment]> {
        let segments = &notification.segments.segments;
        if self.current.as_ref() == Some(segments) {
            return None;
        }
        self.current = Some(segments.clone());
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&[Segment]> {
        self.current.as_deref()
    }
}
