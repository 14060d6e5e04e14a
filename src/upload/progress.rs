use std::collections::HashMap;

/// Aggregate progress of one upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub sent: u64,
    pub total: u64,
    pub percentage: u8,
}

/// Byte-level event for a single part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteEvent {
    /// bytes of the part written to the wire so far
    Progress(u64),
    Error(u64),
    Abort(u64),
    /// the part was confirmed by the backend
    Uploaded,
}

/// Folds per-part byte counts into a [`ProgressSnapshot`].
///
/// In-flight parts live in a cache keyed by part index; once a part is
/// confirmed its cached count moves into `uploaded_size` so it is never
/// counted twice.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total: u64,
    uploaded_size: u64,
    cache: HashMap<u16, u64>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Apply an event for the part at `index` and return the new aggregate
    pub fn record(&mut self, index: u16, event: ByteEvent) -> ProgressSnapshot {
        match event {
            ByteEvent::Progress(loaded) | ByteEvent::Error(loaded) | ByteEvent::Abort(loaded) => {
                self.cache.insert(index, loaded);
            }

            ByteEvent::Uploaded => {
                self.uploaded_size += self.cache.remove(&index).unwrap_or(0);
            }
        }

        self.snapshot()
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        let in_progress: u64 = self.cache.values().sum();

        // simultaneous in-flight chunks may transiently overshoot
        let sent = (self.uploaded_size + in_progress).min(self.total);

        ProgressSnapshot {
            sent,
            total: self.total,
            percentage: percentage(sent, self.total),
        }
    }
}

// round(100 * sent / total)
fn percentage(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }

    let (sent, total) = (u128::from(sent), u128::from(total));

    u8::try_from((sent * 200 + total) / (total * 2)).unwrap_or(100)
}
