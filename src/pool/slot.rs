// src/pool/slot.rs

use crate::exec::ProcessHandle;
use crate::pool::job::Job;

/// Result of polling one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Available,
    Busy,
}

/// The job running in a slot together with its process.
///
/// Keeping both in one value means a slot is either fully occupied or empty.
pub(crate) struct Occupant {
    pub job: Job,
    pub handle: Box<dyn ProcessHandle>,
}

#[derive(Default)]
pub(crate) struct Slot {
    pub occupant: Option<Occupant>,
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }

    /// Drop the occupant, releasing its handle.
    pub fn clear(&mut self) -> Option<Job> {
        self.occupant.take().map(|o| o.job)
    }
}
