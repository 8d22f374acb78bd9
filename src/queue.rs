//! # Hand-off Queue Module
//!
//! Bounded single-producer/single-consumer queues between interrupt context
//! and the main loop. The producer half never blocks and never allocates:
//! when the queue is full the incoming item is dropped and counted.
//!
//! ## Why heapless
//! `heapless::spsc::Queue` is index-based with atomic head/tail updates, so the
//! two halves can live in different execution contexts without a lock.
//! A queue with `N` slots holds `N - 1` items.

use heapless::spsc::{Consumer, Producer, Queue};

/// 500 samples: two seconds at the default 4 ms period
pub const SAMPLE_QUEUE_SLOTS: usize = 501;
/// 30 pending rotary/button events
pub const EVENT_QUEUE_SLOTS: usize = 31;

pub struct HandoffQueue<T, const N: usize> {
    queue: Queue<T, N>,
}

impl<T, const N: usize> HandoffQueue<T, N> {
    pub const fn new() -> Self {
        Self { queue: Queue::new() }
    }

    /// Split into the interrupt-side writer and the main-loop reader
    pub fn split(&mut self) -> (QueueWriter<'_, T, N>, QueueReader<'_, T, N>) {
        let (producer, consumer) = self.queue.split();
        (
            QueueWriter { producer, dropped: 0 },
            QueueReader { consumer },
        )
    }
}

impl<T, const N: usize> Default for HandoffQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half, owned by the interrupt handler
pub struct QueueWriter<'q, T, const N: usize> {
    producer: Producer<'q, T, N>,
    dropped: u32,
}

impl<'q, T, const N: usize> QueueWriter<'q, T, N> {
    /// Push without blocking. Returns `false` and drops `item` when full.
    pub fn try_push(&mut self, item: T) -> bool {
        match self.producer.enqueue(item) {
            Ok(()) => true,
            Err(_) => {
                self.dropped = self.dropped.wrapping_add(1);
                false
            }
        }
    }

    /// Items discarded because the reader fell behind
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// Consumer half, owned by the main loop
pub struct QueueReader<'q, T, const N: usize> {
    consumer: Consumer<'q, T, N>,
}

impl<'q, T, const N: usize> QueueReader<'q, T, N> {
    pub fn try_pop(&mut self) -> Option<T> {
        self.consumer.dequeue()
    }

    #[allow(dead_code)]
    pub fn has_data(&self) -> bool {
        self.consumer.ready()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    #[allow(dead_code)]
    pub fn capacity(&self) -> usize {
        N - 1
    }

    /// Discard everything pending, returning how many items were dropped
    pub fn clear(&mut self) -> usize {
        let mut discarded = 0;
        while self.consumer.dequeue().is_some() {
            discarded += 1;
        }
        discarded
    }
}
