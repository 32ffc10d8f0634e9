//! Randomized interleavings of speakers and listeners.
//!
//! Each case spawns a shuffled mix of speakers and listeners, staggers their
//! arrival with small random delays, and checks that the listeners collectively
//! received every spoken word exactly once.

use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tryst_comm::{Communicator, Waiting};

#[derive(Debug, Clone, Copy)]
enum Role {
    Speaker,
    Listener,
}

/// A balanced arrival schedule: `n` speakers and `n` listeners in random order,
/// each with its own arrival delay in microseconds.
fn schedule() -> impl Strategy<Value = Vec<(Role, u64)>> {
    (1usize..24).prop_flat_map(|n| {
        let mut roles = vec![Role::Speaker; n];
        roles.extend(std::iter::repeat_n(Role::Listener, n));
        (
            Just(roles).prop_shuffle(),
            prop::collection::vec(0u64..300, 2 * n),
        )
            .prop_map(|(roles, delays)| roles.into_iter().zip(delays).collect())
    })
}

/// Runs one schedule; returns (spoken, heard), both sorted.
fn run(schedule: Vec<(Role, u64)>) -> (Vec<u32>, Vec<u32>) {
    let comm = Arc::new(Communicator::new());
    let start = Arc::new(Barrier::new(schedule.len()));

    let mut spoken = Vec::new();
    let mut handles = Vec::new();
    let mut next_word = 0u32;

    for (role, delay_us) in schedule {
        let comm = Arc::clone(&comm);
        let start = Arc::clone(&start);
        let handle = match role {
            Role::Speaker => {
                let word = next_word;
                next_word += 1;
                spoken.push(word);
                thread::spawn(move || {
                    start.wait();
                    thread::sleep(Duration::from_micros(delay_us));
                    comm.speak(word);
                    None
                })
            }
            Role::Listener => thread::spawn(move || {
                start.wait();
                thread::sleep(Duration::from_micros(delay_us));
                Some(comm.listen())
            }),
        };
        handles.push(handle);
    }

    let mut heard: Vec<u32> = handles
        .into_iter()
        .filter_map(|h| h.join().expect("caller panicked"))
        .collect();
    heard.sort_unstable();

    assert_eq!(comm.waiting(), Waiting::default());
    assert_eq!(comm.exchanges(), spoken.len() as u64);
    (spoken, heard)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn every_word_heard_exactly_once(schedule in schedule()) {
        let (spoken, heard) = run(schedule);
        prop_assert_eq!(spoken, heard);
    }

    #[test]
    fn repeated_rounds_on_shared_instance(rounds in 1u32..50, pairs in 1u32..6) {
        let comm = Arc::new(Communicator::new());

        let speakers: Vec<_> = (0..pairs)
            .map(|p| {
                let comm = Arc::clone(&comm);
                thread::spawn(move || {
                    for r in 0..rounds {
                        comm.speak(p * rounds + r);
                    }
                })
            })
            .collect();
        let listeners: Vec<_> = (0..pairs)
            .map(|_| {
                let comm = Arc::clone(&comm);
                thread::spawn(move || (0..rounds).map(|_| comm.listen()).collect::<Vec<_>>())
            })
            .collect();

        for s in speakers {
            s.join().unwrap();
        }
        let mut heard: Vec<u32> = listeners.into_iter().flat_map(|l| l.join().unwrap()).collect();
        heard.sort_unstable();

        let expected: Vec<u32> = (0..pairs * rounds).collect();
        prop_assert_eq!(heard, expected);
        prop_assert_eq!(comm.exchanges(), (pairs * rounds) as u64);
    }
}
