//! Mutable state shared by every caller of a [`Communicator`](crate::Communicator).
//!
//! Nothing in here synchronizes on its own: the communicator keeps an
//! [`ExchangeState`] behind its mutex and only touches it with the lock held.
//!
//! # Tickets
//!
//! Each published word is stamped with a ticket, `published` after increment.
//! A listener claiming the word advances `claimed` to the same value. Both
//! counters only ever grow, so a speaker holding ticket `t` knows its word was
//! taken exactly when `claimed >= t`, regardless of how many exchanges happened
//! after its own before it got the lock back.
//!
//! ```text
//! slot empty:     published == claimed       pending_message == None
//! slot occupied:  published == claimed + 1   pending_message == Some(word)
//! ```

/// Snapshot of how many callers are currently inside `speak` / `listen`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Waiting {
    pub speakers: usize,
    pub listeners: usize,
}

#[derive(Debug, Default)]
pub(crate) struct ExchangeState {
    /// The word handed from the publishing speaker to whichever listener claims it.
    pending_message: Option<u32>,
    speakers_waiting: usize,
    listeners_waiting: usize,
    /// Last ticket handed out to a publishing speaker.
    published: u64,
    /// Last ticket taken by a listener.
    claimed: u64,
}

impl ExchangeState {
    pub(crate) const fn new() -> Self {
        Self {
            pending_message: None,
            speakers_waiting: 0,
            listeners_waiting: 0,
            published: 0,
            claimed: 0,
        }
    }

    #[inline]
    pub(crate) fn waiting(&self) -> Waiting {
        Waiting {
            speakers: self.speakers_waiting,
            listeners: self.listeners_waiting,
        }
    }

    #[inline]
    pub(crate) fn claimed(&self) -> u64 {
        self.claimed
    }

    #[inline]
    pub(crate) fn register_speaker(&mut self) {
        self.speakers_waiting += 1;
    }

    #[inline]
    pub(crate) fn register_listener(&mut self) {
        self.listeners_waiting += 1;
    }

    #[inline]
    pub(crate) fn release_speaker(&mut self) {
        debug_assert!(self.speakers_waiting > 0);
        self.speakers_waiting -= 1;
    }

    #[inline]
    pub(crate) fn release_listener(&mut self) {
        debug_assert!(self.listeners_waiting > 0);
        self.listeners_waiting -= 1;
    }

    /// A speaker may publish only once the previous word has been claimed.
    #[inline]
    pub(crate) fn slot_free(&self) -> bool {
        self.pending_message.is_none()
    }

    /// Places `word` in the slot and returns the ticket its claim will carry.
    ///
    /// Callers must have observed [`slot_free`](Self::slot_free) under the same lock.
    pub(crate) fn publish(&mut self, word: u32) -> u64 {
        debug_assert!(self.slot_free());
        self.pending_message = Some(word);
        self.published += 1;
        self.published
    }

    /// Takes the pending word, binding it to the caller.
    ///
    /// Returns `None` if the slot is empty, which a listener only sees if it
    /// skipped its wait predicate.
    pub(crate) fn claim(&mut self) -> Option<(u64, u32)> {
        let word = self.pending_message.take()?;
        self.claimed += 1;
        debug_assert_eq!(self.claimed, self.published);
        Some((self.claimed, word))
    }

    /// Has the word published under `ticket` been taken by a listener?
    #[inline]
    pub(crate) fn is_claimed(&self, ticket: u64) -> bool {
        self.claimed >= ticket
    }
}
