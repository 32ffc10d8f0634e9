use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tryst_comm::Communicator;

// ─── Statistics ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub stddev: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BenchResult {
    pub name: String,
    pub unit: String,
    pub stats: Stats,
}

pub fn compute_stats(samples: &mut [u64]) -> Stats {
    assert!(!samples.is_empty(), "cannot compute stats on empty samples");
    samples.sort_unstable();

    let count = samples.len();
    let sum: u64 = samples.iter().sum();
    let mean = sum as f64 / count as f64;

    let variance = samples
        .iter()
        .map(|&x| {
            let diff = x as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / count as f64;

    Stats {
        min: samples[0],
        max: samples[count - 1],
        mean,
        stddev: variance.sqrt(),
        p50: percentile_sorted(samples, 50.0),
        p90: percentile_sorted(samples, 90.0),
        p99: percentile_sorted(samples, 99.0),
        p999: percentile_sorted(samples, 99.9),
        count,
    }
}

fn percentile_sorted(sorted: &[u64], pct: f64) -> u64 {
    let len = sorted.len();
    if len == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0 * len as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(len - 1);
    sorted[idx]
}

// ─── Measurement Harness ────────────────────────────────────────────────────

pub fn measure_batched<F: FnMut()>(
    name: &str,
    batches: usize,
    batch_size: usize,
    warmup: usize,
    mut f: F,
) -> BenchResult {
    for _ in 0..warmup * batch_size {
        f();
    }

    let mut samples = Vec::with_capacity(batches);
    for _ in 0..batches {
        let start = Instant::now();
        for _ in 0..batch_size {
            f();
        }
        let total = start.elapsed().as_nanos();
        let per_op = ((total + (batch_size as u128 / 2)) / batch_size as u128) as u64;
        samples.push(per_op.max(1));
    }

    BenchResult {
        name: name.to_string(),
        unit: "ns/op".to_string(),
        stats: compute_stats(&mut samples),
    }
}

/// Joins a worker, re-raising its panic on the caller.
fn join_worker<T>(handle: thread::JoinHandle<T>) -> T {
    match handle.join() {
        Ok(v) => v,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

// ─── Workloads ──────────────────────────────────────────────────────────────

/// Round-trip latency through two communicators.
///
/// The calling thread speaks on `ping`; an echo thread listens on it and speaks
/// the word straight back on `pong`. Each sample covers two full rendezvous.
pub fn ping_pong_samples(rounds: usize, warmup: usize) -> Vec<u64> {
    let ping = Arc::new(Communicator::new());
    let pong = Arc::new(Communicator::new());
    let total = rounds + warmup;

    let echo = {
        let (ping, pong) = (Arc::clone(&ping), Arc::clone(&pong));
        thread::spawn(move || {
            for _ in 0..total {
                pong.speak(ping.listen());
            }
        })
    };

    let mut samples = Vec::with_capacity(rounds);
    for i in 0..total {
        let start = Instant::now();
        ping.speak(i as u32);
        let back = pong.listen();
        let elapsed = start.elapsed().as_nanos() as u64;
        debug_assert_eq!(back, i as u32);
        if i >= warmup {
            samples.push(elapsed.max(1));
        }
    }

    join_worker(echo);
    samples
}

/// Per-`listen` cost with a dedicated speaker always ready, in batches.
pub fn listen_batched(batches: usize, batch_size: usize, warmup: usize) -> BenchResult {
    let comm = Arc::new(Communicator::new());
    let total = (warmup + batches) * batch_size;

    let speaker = {
        let comm = Arc::clone(&comm);
        thread::spawn(move || {
            for word in 0..total {
                comm.speak(word as u32);
            }
        })
    };

    let result = measure_batched("listen (1 speaker)", batches, batch_size, warmup, || {
        std::hint::black_box(comm.listen());
    });

    join_worker(speaker);
    result
}

/// Runs `pairs` speakers and `pairs` listeners over one communicator and returns
/// the exchanges per second achieved.
pub fn exchange_throughput(pairs: u32, words_per_pair: u32) -> f64 {
    let comm = Arc::new(Communicator::new());
    let start = Instant::now();

    let speakers: Vec<_> = (0..pairs)
        .map(|p| {
            let comm = Arc::clone(&comm);
            thread::spawn(move || {
                for i in 0..words_per_pair {
                    comm.speak(p * words_per_pair + i);
                }
            })
        })
        .collect();
    let listeners: Vec<_> = (0..pairs)
        .map(|_| {
            let comm = Arc::clone(&comm);
            thread::spawn(move || {
                for _ in 0..words_per_pair {
                    std::hint::black_box(comm.listen());
                }
            })
        })
        .collect();

    for h in speakers.into_iter().chain(listeners) {
        join_worker(h);
    }

    let elapsed = start.elapsed();
    comm.exchanges() as f64 / elapsed.as_secs_f64()
}

// ─── Resource Usage ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ResourceSnapshot {
    pub max_rss_bytes: i64,
    pub vol_ctx_switches: i64,
    pub invol_ctx_switches: i64,
    pub user_time_us: i64,
    pub sys_time_us: i64,
}

pub fn capture_rusage() -> ResourceSnapshot {
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    #[cfg(target_os = "linux")]
    let max_rss_bytes = usage.ru_maxrss * 1024;
    #[cfg(not(target_os = "linux"))]
    let max_rss_bytes = usage.ru_maxrss;
    ResourceSnapshot {
        max_rss_bytes,
        vol_ctx_switches: usage.ru_nvcsw,
        invol_ctx_switches: usage.ru_nivcsw,
        user_time_us: usage.ru_utime.tv_sec * 1_000_000 + usage.ru_utime.tv_usec as i64,
        sys_time_us: usage.ru_stime.tv_sec * 1_000_000 + usage.ru_stime.tv_usec as i64,
    }
}

// ─── Display ────────────────────────────────────────────────────────────────

pub fn format_ns(ns: f64) -> String {
    let abs = ns.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1} ms", ns / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.1} us", ns / 1_000.0)
    } else {
        format!("{:.0} ns", ns)
    }
}

pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}

pub fn print_result_row(r: &BenchResult) {
    println!(
        "  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  {}",
        r.name, r.stats.min, r.stats.p50, r.stats.p90, r.stats.p99, r.stats.p999, r.stats.max, r.unit,
    );
}

pub fn print_table_header() {
    println!(
        "  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  unit",
        "Benchmark", "min", "p50", "p90", "p99", "p99.9", "max",
    );
    println!("  {}", "─".repeat(90));
}

pub fn section_header(title: &str) {
    println!("\n{}", "─".repeat(90));
    println!("  {title}");
    println!("{}\n", "─".repeat(90));
}
