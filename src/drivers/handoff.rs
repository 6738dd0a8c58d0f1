//! Single-slot handoff from the acquisition thread to the display context.
//!
//! The slot holds at most one undelivered value. Sending never blocks: a
//! value the consumer has not picked up yet is replaced by the newer one.
//! The consumer selects on [`SlotReceiver::receiver`] in its own event loop,
//! so delivered values are handled there and never on the sending thread.
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
pub struct SlotSender<T> {
    tx: Sender<T>,
    // Kept only to evict a stale value when the slot is full.
    evict: Receiver<T>,
    superseded: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}
pub struct SlotReceiver<T> {
    rx: Receiver<T>,
    superseded: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}
pub fn latest_slot<T>() -> (SlotSender<T>, SlotReceiver<T>) {
    let (tx, rx) = bounded(1);
    let superseded = Arc::new(AtomicU64::new(0));
    let closed = Arc::new(AtomicBool::new(false));
    (
        SlotSender {
            tx,
            evict: rx.clone(),
            superseded: Arc::clone(&superseded),
            closed: Arc::clone(&closed),
        },
        SlotReceiver {
            rx,
            superseded,
            closed,
        },
    )
}
impl<T> SlotSender<T> {
    /// Publishes `value`, replacing any value still waiting in the slot.
    ///
    /// Returns `false` once the receiving side has been dropped.
    pub fn send(&self, value: T) -> bool {
        // `evict` keeps the channel open, so receiver drop is tracked separately.
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let mut value = value;
        loop {
            match self.tx.try_send(value) {
                Ok(()) => break,
                Err(TrySendError::Full(back)) => {
                    if self.evict.try_recv().is_ok() {
                        self.superseded.fetch_add(1, Ordering::Relaxed);
                    }
                    value = back;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
        true
    }
    pub fn superseded(&self) -> u64 {
        self.superseded.load(Ordering::Relaxed)
    }
}
impl<T> SlotReceiver<T> {
    /// Underlying channel, for `select!` in an event loop.
    pub fn receiver(&self) -> &Receiver<T> {
        &self.rx
    }
    /// Number of values replaced before the consumer saw them.
    pub fn superseded(&self) -> u64 {
        self.superseded.load(Ordering::Relaxed)
    }
}
impl<T> Drop for SlotReceiver<T> {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::TryRecvError;
    #[test]
    fn newest_value_wins_when_consumer_is_slow() {
        let (tx, rx) = latest_slot();
        for i in 0..5 {
            assert!(tx.send(i));
        }
        assert_eq!(rx.receiver().try_recv(), Ok(4));
        assert_eq!(rx.receiver().try_recv(), Err(TryRecvError::Empty));
        assert_eq!(rx.superseded(), 4);
        assert_eq!(tx.superseded(), 4);
    }
    #[test]
    fn dropping_sender_disconnects_after_last_value() {
        let (tx, rx) = latest_slot();
        tx.send("last");
        drop(tx);
        assert_eq!(rx.receiver().try_recv(), Ok("last"));
        assert_eq!(rx.receiver().try_recv(), Err(TryRecvError::Disconnected));
    }
    #[test]
    fn send_reports_dropped_receiver() {
        let (tx, rx) = latest_slot::<u32>();
        drop(rx);
        assert!(!tx.send(7));
    }
}
