use anyhow::{Context, anyhow, ensure};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tryst_comm::Communicator;
use tryst_config::TrystConfig;

fn main() -> anyhow::Result<()> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => TrystConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => TrystConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        speakers = cfg.speakers,
        listeners = cfg.listeners,
        total_words = cfg.total_words(),
        "TRYST: starting exchange"
    );

    let start = Instant::now();
    let mut heard = run(&cfg)?;
    let elapsed = start.elapsed();

    heard.sort_unstable();
    let expected = cfg.total_words();
    ensure!(
        heard.len() as u64 == expected,
        "heard {} words, expected {expected}",
        heard.len()
    );
    if let Some((i, &w)) = heard.iter().enumerate().find(|&(i, &w)| w as u64 != i as u64) {
        return Err(anyhow!("word {i} missing or duplicated (found {w} in its place)"));
    }

    let rate = expected as f64 / elapsed.as_secs_f64();
    info!(elapsed = ?elapsed, "TRYST: all {expected} words delivered once (~{rate:.0} ex/s)");
    Ok(())
}

/// Runs the configured workload on one shared communicator and returns every
/// word the listeners heard, in arrival order per listener.
fn run(cfg: &TrystConfig) -> anyhow::Result<Vec<u32>> {
    let comm = Arc::new(Communicator::default());

    // Stopped on every exit path, including a failed spawn below. Threads
    // already spawned at that point stay blocked until the process exits.
    let _reporter = Reporter::spawn(
        Arc::clone(&comm),
        Duration::from_millis(cfg.report_interval_ms),
    )?;

    let mut speakers = Vec::with_capacity(cfg.speakers as usize);
    for s in 0..cfg.speakers {
        let comm = Arc::clone(&comm);
        let first = s * cfg.words_per_speaker;
        let words = first..first + cfg.words_per_speaker;
        let handle = thread::Builder::new()
            .name(format!("speaker-{s}"))
            .spawn(move || {
                for word in words {
                    comm.speak(word);
                }
            })
            .context("spawning speaker")?;
        speakers.push(handle);
    }

    let per_listener = cfg.words_per_listener();
    let mut listeners: Vec<JoinHandle<Vec<u32>>> = Vec::with_capacity(cfg.listeners as usize);
    for l in 0..cfg.listeners {
        let comm = Arc::clone(&comm);
        let handle = thread::Builder::new()
            .name(format!("listener-{l}"))
            .spawn(move || (0..per_listener).map(|_| comm.listen()).collect())
            .context("spawning listener")?;
        listeners.push(handle);
    }

    for handle in speakers {
        handle.join().map_err(|_| anyhow!("speaker thread panicked"))?;
    }
    let mut heard = Vec::with_capacity(cfg.total_words() as usize);
    for handle in listeners {
        heard.extend(handle.join().map_err(|_| anyhow!("listener thread panicked"))?);
    }

    Ok(heard)
}

/// Background thread logging the exchange rate every `interval`.
///
/// Dropping it stops and joins the thread.
struct Reporter {
    done: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Reporter {
    fn spawn(comm: Arc<Communicator>, interval: Duration) -> anyhow::Result<Self> {
        let done = Arc::new(AtomicBool::new(false));
        let handle = {
            let done = Arc::clone(&done);
            thread::Builder::new()
                .name("reporter".into())
                .spawn(move || report_until_done(&comm, &done, interval))
                .context("spawning reporter")?
        };
        Ok(Self {
            done,
            handle: Some(handle),
        })
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.done.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("reporter thread panicked");
            }
        }
    }
}

fn report_until_done(comm: &Communicator, done: &AtomicBool, interval: Duration) {
    let mut last = Instant::now();
    let mut last_count = 0u64;
    while !done.load(Ordering::Acquire) {
        thread::park_timeout(interval.saturating_sub(last.elapsed()));
        if last.elapsed() < interval {
            continue;
        }
        let count = comm.exchanges();
        let rate = (count - last_count) as f64 / last.elapsed().as_secs_f64();
        info!(exchanges = count, waiting = ?comm.waiting(), "TRYST: ~{rate:.0} ex/s");
        last_count = count;
        last = Instant::now();
    }
}
