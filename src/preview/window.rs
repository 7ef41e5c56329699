use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::ops::ControlFlow;

/// How a window run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    /// Every item was started and completed
    Completed { completed: usize },
    /// The completion handler asked to stop; remaining items were never started
    Stopped { completed: usize },
}

/// Sliding window over a work list: at most `capacity` operations are pending,
/// and each completion pulls the next pending item into the freed slot.
///
/// Everything runs on the calling task. Nothing is spawned here.
#[derive(Debug, Clone, Copy)]
pub struct BoundedWindow {
    capacity: usize,
}

impl BoundedWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run `start` over `items`, handing each result to `on_complete` in completion order.
    ///
    /// Returning `ControlFlow::Break` from `on_complete` stops new work from starting.
    /// Operations already in flight cannot be interrupted: they are awaited and their
    /// results dropped.
    pub async fn run<I, F, Fut, C>(&self, items: I, mut start: F, mut on_complete: C) -> WindowOutcome
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future,
        C: FnMut(Fut::Output) -> ControlFlow<()>,
    {
        let mut pending = items.into_iter();
        let mut in_flight = FuturesUnordered::new();
        for item in pending.by_ref().take(self.capacity) {
            in_flight.push(start(item));
        }

        let mut completed = 0;
        while let Some(output) = in_flight.next().await {
            completed += 1;

            if on_complete(output).is_break() {
                while in_flight.next().await.is_some() {}
                return WindowOutcome::Stopped { completed };
            }

            if let Some(item) = pending.next() {
                in_flight.push(start(item));
            }
        }

        WindowOutcome::Completed { completed }
    }
}
