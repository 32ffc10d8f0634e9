//! Synchronous, unbuffered hand-off of 32-bit words between threads.
//!
//! A [`Communicator`] pairs each `speak` call with exactly one `listen` call.
//! Neither side returns until the word has changed hands: there is no queue,
//! so a speaker with no listener (or a listener with no speaker) blocks.
//!
//! # Design
//! - **One lock**: a single `Mutex` guards the message slot, both waiter
//!   counters and the ticket counters. Counters are never touched outside it.
//! - **Two condvars**: listeners sleep on `speaker_ready` until a word is in
//!   the slot; speakers sleep on `listener_ready` until the slot is free or
//!   until their own word has been claimed.
//! - **Tickets**: publishing a word stamps it with a ticket. The speaker waits
//!   for *that* ticket to be claimed, so another speaker's exchange can never
//!   satisfy its wait.
//!
//! Every wait re-checks its predicate under the lock after waking, which
//! covers spurious wakeups and wakeups stolen by a thread that got the lock
//! first.
//!
//! # Thread Safety
//! `Communicator` is `Send + Sync`; share it with `Arc` or place it in a `static`.
//! Pairing order between several waiting speakers (or listeners) is whatever
//! order the underlying mutex hands out the lock. FIFO is not promised.

use crate::state::{ExchangeState, Waiting};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

pub struct Communicator {
    state: Mutex<ExchangeState>,
    /// Signalled when a listener claims a word: the slot is free again and
    /// one speaker's ticket has been honoured.
    listener_ready: Condvar,
    /// Signalled when a speaker publishes a word into the slot.
    speaker_ready: Condvar,
}

impl Communicator {
    /// Creates an idle communicator.
    ///
    /// `const` so a process-wide instance can live in a `static`.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(ExchangeState::new()),
            listener_ready: Condvar::new(),
            speaker_ready: Condvar::new(),
        }
    }

    /// Hands `word` to exactly one listener.
    ///
    /// Blocks until a `listen` call on this communicator has taken `word`.
    /// With no listener ever arriving, this never returns.
    pub fn speak(&self, word: u32) {
        let mut state = self.lock();
        state.register_speaker();
        trace!(word, waiting = ?state.waiting(), "speak called");

        // Only one word may sit unclaimed in the slot.
        state = self.wait_on(&self.listener_ready, state, |s| !s.slot_free());

        let ticket = state.publish(word);
        trace!(word, ticket, "word published");
        self.speaker_ready.notify_one();

        state = self.wait_on(&self.listener_ready, state, |s| !s.is_claimed(ticket));

        state.release_speaker();
        trace!(word, ticket, waiting = ?state.waiting(), "speak paired");
    }

    /// Waits for a speaker and returns the word it handed over.
    ///
    /// Each word is returned by exactly one `listen` call.
    pub fn listen(&self) -> u32 {
        let mut state = self.lock();
        state.register_listener();
        trace!(waiting = ?state.waiting(), "listen called");

        let (ticket, word) = loop {
            if let Some(claim) = state.claim() {
                break claim;
            }
            state = self.wait(&self.speaker_ready, state);
        };

        state.release_listener();
        trace!(word, ticket, waiting = ?state.waiting(), "word claimed");

        // Wakes the speaker owning `ticket` as well as any speaker queued for
        // the slot. A single notify could land on the wrong one of those.
        self.listener_ready.notify_all();
        word
    }

    /// How many callers are currently inside `speak` / `listen`.
    ///
    /// Stale as soon as it returns; meant for diagnostics and tests.
    pub fn waiting(&self) -> Waiting {
        self.lock().waiting()
    }

    /// Number of words that have changed hands so far.
    pub fn exchanges(&self) -> u64 {
        self.lock().claimed()
    }

    // No code panics while holding the lock, so a poisoned mutex still guards
    // consistent state.
    fn lock(&self) -> MutexGuard<'_, ExchangeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(
        &self,
        cv: &Condvar,
        guard: MutexGuard<'a, ExchangeState>,
    ) -> MutexGuard<'a, ExchangeState> {
        cv.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_on<'a, F>(
        &self,
        cv: &Condvar,
        guard: MutexGuard<'a, ExchangeState>,
        blocked: F,
    ) -> MutexGuard<'a, ExchangeState>
    where
        F: FnMut(&mut ExchangeState) -> bool,
    {
        cv.wait_while(guard, blocked)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Communicator {
    fn default() -> Self {
        let communicator = Self::new();
        debug!("communicator created");
        communicator
    }
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Communicator")
            .field("waiting", &state.waiting())
            .field("exchanges", &state.claimed())
            .finish()
    }
}
