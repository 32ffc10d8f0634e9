//! Harnesses shared by the integration tests.
//!
//! Each harness is generic over [`Rendezvous`] so that the naive counter
//! scheme in `broken_variant.rs` can be driven through the exact workloads the
//! real communicator passes.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tryst_comm::Communicator;

/// Upper bound for any balanced workload to finish.
pub const DEADLINE: Duration = Duration::from_secs(30);

pub trait Rendezvous: Send + Sync + 'static {
    fn speak(&self, word: u32);
    fn listen(&self) -> u32;
    /// Speakers that have entered `speak` and not yet returned.
    fn speakers_inside(&self) -> usize;
}

impl Rendezvous for Communicator {
    fn speak(&self, word: u32) {
        Communicator::speak(self, word)
    }

    fn listen(&self) -> u32 {
        Communicator::listen(self)
    }

    fn speakers_inside(&self) -> usize {
        self.waiting().speakers
    }
}

/// Runs `f` on a helper thread; `None` if it outlives `deadline`.
pub fn within<T: Send + 'static>(
    deadline: Duration,
    f: impl FnOnce() -> T + Send + 'static,
) -> Option<T> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(deadline).ok()
}

/// Polls `pred` until it holds, panicking after five seconds.
pub fn wait_until(what: &str, mut pred: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !pred() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Runs `n` speakers (words `0..n`) and `n` listeners concurrently and returns
/// every word the listeners received, sorted.
pub fn exchange_all<R: Rendezvous>(comm: Arc<R>, n: u32) -> Vec<u32> {
    let speakers: Vec<_> = (0..n)
        .map(|word| {
            let comm = Arc::clone(&comm);
            thread::spawn(move || comm.speak(word))
        })
        .collect();
    let listeners: Vec<_> = (0..n)
        .map(|_| {
            let comm = Arc::clone(&comm);
            thread::spawn(move || comm.listen())
        })
        .collect();

    for s in speakers {
        s.join().expect("speaker panicked");
    }
    let mut heard: Vec<u32> = listeners
        .into_iter()
        .map(|l| l.join().expect("listener panicked"))
        .collect();
    heard.sort_unstable();
    heard
}

/// Parks `n` speakers (words `0..n`) one after another, then releases `n`
/// listeners at once.
///
/// Returns the sorted words heard, or `None` if the listeners did not all
/// return within `deadline`.
pub fn park_speakers_then_listen<R: Rendezvous>(
    comm: Arc<R>,
    n: u32,
    deadline: Duration,
) -> Option<Vec<u32>> {
    let mut speakers = Vec::with_capacity(n as usize);
    for word in 0..n {
        let handle = {
            let comm = Arc::clone(&comm);
            thread::spawn(move || comm.speak(word))
        };
        speakers.push(handle);
        let parked = word as usize + 1;
        wait_until("speaker to park", || comm.speakers_inside() == parked);
    }

    within(deadline, move || {
        let listeners: Vec<_> = (0..n)
            .map(|_| {
                let comm = Arc::clone(&comm);
                thread::spawn(move || comm.listen())
            })
            .collect();
        let mut heard: Vec<u32> = listeners
            .into_iter()
            .map(|l| l.join().expect("listener panicked"))
            .collect();
        for s in speakers {
            s.join().expect("speaker panicked");
        }
        heard.sort_unstable();
        heard
    })
}
