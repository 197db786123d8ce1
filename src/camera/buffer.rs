//! Double-buffered hand-off of the latest frame.
//!
//! The capture thread writes into the slot the front index does not point
//! at, then publishes it by storing its index. Readers lock the front slot
//! for as long as they hold a [`FrameRef`], so a read never observes a
//! half-written frame.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// Front index value before anything has been published.
const NONE: usize = usize::MAX;

#[derive(Debug)]
struct Slot {
    data: Vec<u8>,
    sequence: u64,
}

/// Two fixed-size frame buffers and the index of the published one.
#[derive(Debug)]
pub struct FrameSlots {
    slots: [Mutex<Slot>; 2],
    front: AtomicUsize,
    published: AtomicU64,
    frame_len: usize,
}

/// Outcome of one producer write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// The frame is now the one readers see
    Published,
    /// A reader still held the back slot; the frame was dropped
    Skipped,
}

impl FrameSlots {
    /// Allocate both slots up front.
    pub fn new(frame_len: usize) -> Self {
        let slot = || {
            Mutex::new(Slot {
                data: vec![0; frame_len],
                sequence: 0,
            })
        };
        Self {
            slots: [slot(), slot()],
            front: AtomicUsize::new(NONE),
            published: AtomicU64::new(0),
            frame_len,
        }
    }

    /// Size in bytes of every frame.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Number of frames published so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }

    /// Fill the back slot with `fill` and publish it if `fill` succeeds.
    ///
    /// Must only be called from a single producer thread. On error nothing
    /// is published and the front slot is untouched.
    pub fn write_with<E>(
        &self,
        fill: impl FnOnce(&mut [u8]) -> Result<(), E>,
    ) -> Result<Publish, E> {
        let back = match self.front.load(Ordering::Acquire) {
            NONE => 0,
            front => 1 - front,
        };

        let mut slot = match self.slots[back].try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Ok(Publish::Skipped),
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
        };

        fill(&mut slot.data)?;

        let sequence = self.published.fetch_add(1, Ordering::AcqRel) + 1;
        slot.sequence = sequence;
        drop(slot);

        self.front.store(back, Ordering::Release);
        Ok(Publish::Published)
    }

    /// Borrow the most recently published frame.
    ///
    /// Returns `None` until the first frame has been published.
    pub fn latest(&self) -> Option<FrameRef<'_>> {
        let front = self.front.load(Ordering::Acquire);
        if front == NONE {
            return None;
        }
        let guard = self.slots[front]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Some(FrameRef { guard })
    }
}

/// Read access to a published frame.
///
/// Holding this keeps the producer from reusing the slot, so drop it once
/// the frame has been uploaded or copied.
pub struct FrameRef<'a> {
    guard: MutexGuard<'a, Slot>,
}

impl FrameRef<'_> {
    /// Publish counter value of this frame, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.guard.sequence
    }
}

impl Deref for FrameRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard.data
    }
}

impl std::fmt::Debug for FrameRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRef")
            .field("sequence", &self.sequence())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn fill(value: u8) -> impl FnOnce(&mut [u8]) -> Result<(), ()> {
        move |buf| {
            buf.fill(value);
            Ok(())
        }
    }

    #[test]
    fn test_empty_before_first_publish() {
        let slots = FrameSlots::new(16);
        assert!(slots.latest().is_none());
        assert_eq!(slots.published(), 0);
    }

    #[test]
    fn test_publish_alternates_slots() {
        let slots = FrameSlots::new(4);

        assert_eq!(slots.write_with(fill(1)), Ok(Publish::Published));
        assert_eq!(&*slots.latest().unwrap(), &[1, 1, 1, 1]);

        assert_eq!(slots.write_with(fill(2)), Ok(Publish::Published));
        let frame = slots.latest().unwrap();
        assert_eq!(&*frame, &[2, 2, 2, 2]);
        assert_eq!(frame.sequence(), 2);
    }

    #[test]
    fn test_failed_fill_keeps_published_frame() {
        let slots = FrameSlots::new(4);
        slots.write_with(fill(0xAB)).unwrap();

        let result: Result<Publish, &str> = slots.write_with(|buf| {
            buf.fill(0);
            Err("boom")
        });
        assert_eq!(result, Err("boom"));

        let frame = slots.latest().unwrap();
        assert_eq!(&*frame, &[0xAB; 4]);
        assert_eq!(frame.sequence(), 1);
        assert_eq!(slots.published(), 1);
    }

    #[test]
    fn test_held_reader_skips_producer() {
        let slots = FrameSlots::new(2);
        slots.write_with(fill(1)).unwrap();
        slots.write_with(fill(2)).unwrap();

        // Reader holds slot 1 (value 2); the next back slot is 0, then 1
        let held = slots.latest().unwrap();
        assert_eq!(slots.write_with(fill(3)), Ok(Publish::Published));
        assert_eq!(slots.write_with(fill(4)), Ok(Publish::Skipped));
        assert_eq!(&*held, &[2, 2]);
        drop(held);

        assert_eq!(&*slots.latest().unwrap(), &[3, 3]);
    }

    #[test]
    fn test_concurrent_reads_never_tear() {
        let slots = Arc::new(FrameSlots::new(4096));
        let producer = {
            let slots = Arc::clone(&slots);
            thread::spawn(move || {
                for i in 0..2000u32 {
                    slots.write_with(fill((i % 251) as u8)).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let slots = Arc::clone(&slots);
                thread::spawn(move || {
                    for _ in 0..2000 {
                        if let Some(frame) = slots.latest() {
                            assert_eq!(frame.len(), 4096);
                            let first = frame[0];
                            assert!(frame.iter().all(|&b| b == first), "torn frame");
                        }
                    }
                })
            })
            .collect();

        producer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert!(slots.published() > 0);
    }
}
