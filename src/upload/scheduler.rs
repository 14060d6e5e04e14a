use crate::upload::part::{Part, UploadedPart};
use std::collections::HashMap;

/// What the scheduler wants to do next
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// a slot is free, start this part
    Start(Part),
    /// every slot is taken, wait for a settlement
    Saturated,
    /// nothing left to start, transfers still in flight
    Waiting,
    /// nothing pending and nothing in flight
    Finished,
}

/// Bookkeeping for the pending queue, the in-flight set and the uploaded parts.
///
/// A part number lives in exactly one of the three collections. `H` is the
/// handle used to cancel an in-flight transfer.
#[derive(Debug)]
pub struct Scheduler<H> {
    max_concurrency: usize,
    pending: Vec<Part>,
    active: HashMap<u16, (Part, H)>,
    uploaded: Vec<UploadedPart>,
}

impl<H> Scheduler<H> {
    #[must_use]
    pub fn new(parts: Vec<Part>, max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            pending: parts,
            active: HashMap::new(),
            uploaded: Vec::new(),
        }
    }

    /// Pops the most recently queued part when a slot is free, the caller
    /// must [`activate`](Self::activate) it.
    pub fn next(&mut self) -> Dispatch {
        if self.active.len() >= self.max_concurrency {
            return Dispatch::Saturated;
        }

        match self.pending.pop() {
            Some(part) => Dispatch::Start(part),
            None if self.active.is_empty() => Dispatch::Finished,
            None => Dispatch::Waiting,
        }
    }

    pub fn activate(&mut self, part: Part, handle: H) {
        log::debug!("Activating part: {}", part.get_number());
        self.active.insert(part.get_number(), (part, handle));
    }

    #[must_use]
    pub fn is_active(&self, number: u16) -> bool {
        self.active.contains_key(&number)
    }

    /// Record a confirmed part, returns `false` when the part was not in flight
    pub fn complete(&mut self, uploaded: UploadedPart) -> bool {
        if self.active.remove(&uploaded.number).is_none() {
            log::warn!("Discarding result of part {}, not in flight", uploaded.number);
            return false;
        }

        self.uploaded.push(uploaded);
        true
    }

    /// Put a failed part back on top of the pending queue
    pub fn fail(&mut self, number: u16) -> bool {
        match self.active.remove(&number) {
            Some((part, _)) => {
                self.pending.push(part);
                true
            }
            None => false,
        }
    }

    /// Requeue every in-flight part and hand back their handles for cancellation
    pub fn halt(&mut self) -> Vec<H> {
        let mut active: Vec<(Part, H)> = self.active.drain().map(|(_, entry)| entry).collect();
        active.sort_by_key(|(part, _)| part.get_number());

        active
            .into_iter()
            .map(|(part, handle)| {
                self.pending.push(part);
                handle
            })
            .collect()
    }

    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    #[must_use]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn pending_numbers(&self) -> Vec<u16> {
        let mut numbers: Vec<u16> = self.pending.iter().map(Part::get_number).collect();
        numbers.sort_unstable();
        numbers
    }

    #[must_use]
    pub fn uploaded(&self) -> &[UploadedPart] {
        &self.uploaded
    }
}
