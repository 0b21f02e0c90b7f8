//! Non-blocking progress event emitter.
//!
//! `emit()` runs on the conversion path and must never stall it:
//!
//! - Never blocks (uses `try_send`, not `send`)
//! - Never fails (returns `()`, drops are counted)
//!
//! If the buffer is full or the receiver is gone, the event is dropped and
//! the drop counter is incremented.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::PipelineEvent;

/// Bounded, non-blocking event emitter.
///
/// # Example
///
/// ```ignore
/// let (emitter, receiver) = EventEmitter::new(1024);
/// let converter = ConverterBuilder::new(client).emitter(Arc::new(emitter)).build()?;
///
/// let report = converter.convert(text).await?;
/// for event in receiver.try_recv_batch(usize::MAX) {
///     println!("{}", event.payload.event_type_str());
/// }
/// ```
pub struct EventEmitter {
    sender: Sender<PipelineEvent>,

    events_emitted: AtomicU64,
    events_dropped: AtomicU64,
}

impl EventEmitter {
    /// Create a new emitter with the given buffer size.
    ///
    /// Returns the emitter and the receiving end.
    pub fn new(buffer_size: usize) -> (Self, EventReceiver) {
        let (sender, receiver) = bounded(buffer_size);

        let emitter = Self {
            sender,
            events_emitted: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
        };

        (emitter, EventReceiver { receiver })
    }

    /// Emit an event - never blocks, never fails.
    #[inline]
    pub fn emit(&self, event: PipelineEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {
                self.events_emitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(event)) => {
                tracing::trace!("Event buffer full, dropping {}", event.payload.event_type_str());
                self.events_dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {
                self.events_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Current emit/drop counts.
    pub fn stats(&self) -> EmitterStats {
        EmitterStats {
            emitted: self.events_emitted.load(Ordering::Relaxed),
            dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }

    pub fn has_capacity(&self) -> bool {
        !self.sender.is_full()
    }
}

/// Emitter statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterStats {
    /// Events delivered to the channel
    pub emitted: u64,
    /// Events dropped (buffer full or receiver disconnected)
    pub dropped: u64,
}

impl EmitterStats {
    /// Drop rate as a fraction (0.0 to 1.0).
    pub fn drop_rate(&self) -> f64 {
        let total = self.emitted + self.dropped;
        if total == 0 {
            0.0
        } else {
            self.dropped as f64 / total as f64
        }
    }
}

/// Receiving end of the progress channel.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<PipelineEvent>,
}

impl EventReceiver {
    /// Blocking receive. `None` once every emitter is dropped.
    pub fn recv(&self) -> Option<PipelineEvent> {
        self.receiver.recv().ok()
    }

    /// Non-blocking receive. `None` if the channel is empty.
    pub fn try_recv(&self) -> Option<PipelineEvent> {
        self.receiver.try_recv().ok()
    }

    /// Up to `max` pending events, without blocking.
    pub fn try_recv_batch(&self, max: usize) -> Vec<PipelineEvent> {
        let mut batch = Vec::with_capacity(max.min(64));
        while batch.len() < max {
            match self.receiver.try_recv() {
                Ok(event) => batch.push(event),
                Err(_) => break,
            }
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Shared emitter handle.
pub type SharedEmitter = Arc<EventEmitter>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_emit_succeeds() {
        let (emitter, receiver) = EventEmitter::new(10);

        emitter.emit(PipelineEvent::started(Uuid::new_v4(), 42));

        let stats = emitter.stats();
        assert_eq!(stats.emitted, 1);
        assert_eq!(stats.dropped, 0);
        assert!(receiver.try_recv().is_some());
    }

    #[test]
    fn test_emit_drops_when_full() {
        let (emitter, _receiver) = EventEmitter::new(2);

        emitter.emit(PipelineEvent::segmented(Uuid::nil(), 1));
        emitter.emit(PipelineEvent::segmented(Uuid::nil(), 2));
        emitter.emit(PipelineEvent::segmented(Uuid::nil(), 3));

        let stats = emitter.stats();
        assert_eq!(stats.emitted, 2);
        assert_eq!(stats.dropped, 1);
        assert!(!emitter.has_capacity());
    }

    #[test]
    fn test_emit_drops_when_disconnected() {
        let (emitter, receiver) = EventEmitter::new(10);
        drop(receiver);

        emitter.emit(PipelineEvent::segmented(Uuid::nil(), 1));

        assert_eq!(emitter.stats().dropped, 1);
        assert_eq!(emitter.stats().drop_rate(), 1.0);
    }

    #[test]
    fn test_batch_receive_keeps_order() {
        let (emitter, receiver) = EventEmitter::new(10);
        for count in 0..5 {
            emitter.emit(PipelineEvent::segmented(Uuid::nil(), count));
        }

        let batch = receiver.try_recv_batch(3);
        assert_eq!(batch.len(), 3);
        assert_eq!(receiver.len(), 2);
        assert!(matches!(
            batch[2].payload,
            super::super::types::EventPayload::InstructionsSegmented { count: 2 }
        ));
    }
}
