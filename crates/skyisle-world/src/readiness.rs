//! Chunk residency tickets.
//!
//! Loading a chunk hands back a [`ChunkReady`] future that resolves once the
//! chunk is resident. Callers await it instead of polling residency, so no
//! block is written into a chunk that has not materialized yet.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use parking_lot::Mutex;
use skyisle_common::{ChunkPos, WorldError, WorldResult};

/// Future resolving when a chunk becomes resident (or fails to load).
#[derive(Debug)]
pub struct ChunkReady {
    chunk: ChunkPos,
    state: ReadyState,
}

#[derive(Debug)]
enum ReadyState {
    Done(Option<WorldResult<()>>),
    Waiting(oneshot::Receiver<WorldResult<()>>),
}

impl ChunkReady {
    /// A ticket for a chunk that is already resident.
    #[must_use]
    pub fn ready(chunk: ChunkPos) -> Self {
        Self {
            chunk,
            state: ReadyState::Done(Some(Ok(()))),
        }
    }

    /// A ticket that has already failed.
    #[must_use]
    pub fn failed(chunk: ChunkPos, error: WorldError) -> Self {
        Self {
            chunk,
            state: ReadyState::Done(Some(Err(error))),
        }
    }

    /// The chunk this ticket waits for.
    #[must_use]
    pub const fn chunk(&self) -> ChunkPos {
        self.chunk
    }

    /// Whether the ticket resolved without waiting.
    #[must_use]
    pub const fn is_immediate(&self) -> bool {
        matches!(self.state, ReadyState::Done(_))
    }
}

impl Future for ChunkReady {
    type Output = WorldResult<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let chunk = this.chunk;
        match &mut this.state {
            ReadyState::Done(result) => Poll::Ready(result.take().unwrap_or(Ok(()))),
            ReadyState::Waiting(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(WorldError::LoadFailed {
                    chunk,
                    reason: "loader dropped the ticket".into(),
                })),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

/// Outstanding residency tickets, grouped by chunk.
#[derive(Debug, Default)]
pub struct ChunkTickets {
    waiting: Mutex<HashMap<ChunkPos, Vec<oneshot::Sender<WorldResult<()>>>>>,
}

impl ChunkTickets {
    /// Creates an empty ticket table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket for `chunk`.
    ///
    /// The boolean is `true` when this is the first outstanding ticket for the
    /// chunk, i.e. the caller should start the load.
    #[must_use]
    pub fn subscribe(&self, chunk: ChunkPos) -> (ChunkReady, bool) {
        let (sender, receiver) = oneshot::channel();
        let mut waiting = self.waiting.lock();
        let senders = waiting.entry(chunk).or_default();
        let first = senders.is_empty();
        senders.push(sender);
        (
            ChunkReady {
                chunk,
                state: ReadyState::Waiting(receiver),
            },
            first,
        )
    }

    /// Resolves every ticket for `chunk` as resident. Returns how many were woken.
    pub fn resolve(&self, chunk: ChunkPos) -> usize {
        let senders = self.waiting.lock().remove(&chunk).unwrap_or_default();
        let count = senders.len();
        for sender in senders {
            // A dropped receiver just means nobody is waiting any more.
            let _ = sender.send(Ok(()));
        }
        count
    }

    /// Fails every ticket for `chunk`.
    pub fn fail(&self, chunk: ChunkPos, reason: &str) -> usize {
        let senders = self.waiting.lock().remove(&chunk).unwrap_or_default();
        let count = senders.len();
        for sender in senders {
            let _ = sender.send(Err(WorldError::LoadFailed {
                chunk,
                reason: reason.to_string(),
            }));
        }
        count
    }

    /// Chunks with outstanding tickets.
    #[must_use]
    pub fn pending(&self) -> Vec<ChunkPos> {
        let mut chunks: Vec<ChunkPos> = self.waiting.lock().keys().copied().collect();
        chunks.sort();
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::FutureExt;

    #[test]
    fn test_ready_ticket_resolves_immediately() {
        let ticket = ChunkReady::ready(ChunkPos::new(0, 0));
        assert!(ticket.is_immediate());
        assert!(block_on(ticket).is_ok());
    }

    #[test]
    fn test_subscribe_then_resolve() {
        let tickets = ChunkTickets::new();
        let chunk = ChunkPos::new(2, -1);
        let (mut first, is_first) = tickets.subscribe(chunk);
        let (second, is_first_again) = tickets.subscribe(chunk);
        assert!(is_first);
        assert!(!is_first_again);

        assert!((&mut first).now_or_never().is_none());
        assert_eq!(tickets.resolve(chunk), 2);
        assert!(block_on(first).is_ok());
        assert!(block_on(second).is_ok());
        assert!(tickets.pending().is_empty());
    }

    #[test]
    fn test_failed_load_propagates() {
        let tickets = ChunkTickets::new();
        let chunk = ChunkPos::new(0, 0);
        let (ticket, _) = tickets.subscribe(chunk);
        tickets.fail(chunk, "disk on fire");
        assert!(matches!(block_on(ticket), Err(WorldError::LoadFailed { .. })));
    }

    #[test]
    fn test_dropped_sender_is_an_error() {
        let tickets = ChunkTickets::new();
        let (ticket, _) = tickets.subscribe(ChunkPos::new(0, 0));
        drop(tickets);
        assert!(block_on(ticket).is_err());
    }
}
