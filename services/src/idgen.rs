//! Generation of globally-unique, time-ordered 64-bit identifiers.
//!
//! Articles, tags and tag assignments share one id space. Any generator that
//! produces strictly increasing 64-bit ids satisfies the contract; the
//! default packs a millisecond timestamp with a machine id and bumps through
//! a CAS loop so ids never repeat or go backwards within a process, even
//! when the wall clock stalls inside one millisecond.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::store::Id;

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Id;
}

const MACHINE_BITS: u32 = 16;

/// Snowflake-style generator: `millis << 16 | machine_id`, monotonized.
pub struct FlakeIdGenerator {
    machine_id: u16,
    last: AtomicI64,
}

impl FlakeIdGenerator {
    pub fn new(machine_id: u16) -> Self {
        Self {
            machine_id,
            last: AtomicI64::new(0),
        }
    }

    fn candidate(&self) -> i64 {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        (millis << MACHINE_BITS) | i64::from(self.machine_id)
    }
}

impl IdGenerator for FlakeIdGenerator {
    fn next_id(&self) -> Id {
        let candidate = self.candidate();
        loop {
            let last = self.last.load(Ordering::Acquire);
            let id = candidate.max(last + 1);
            if self
                .last
                .compare_exchange(last, id, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return id;
            }
        }
    }
}

/// Deterministic counter generator, for tests.
pub struct SequenceIdGenerator {
    next: AtomicI64,
}

impl SequenceIdGenerator {
    pub fn starting_at(first: Id) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn next_id(&self) -> Id {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
