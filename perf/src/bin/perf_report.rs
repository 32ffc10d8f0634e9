use tryst_perf::*;

const PING_PONG_ROUNDS: usize = 100_000;
const PING_PONG_WARMUP: usize = 10_000;
const THROUGHPUT_WORDS: u32 = 50_000;

fn main() {
    let rusage_start = capture_rusage();
    let mut results: Vec<BenchResult> = Vec::new();

    let bar = "\u{2550}".repeat(90);
    println!("\n{bar}");
    println!("  TRYST PERFORMANCE REPORT");
    println!("  rendezvous latency + N×N throughput");
    println!("{bar}");

    // ── Latency ──
    section_header("HAND-OFF LATENCY");
    print_table_header();

    let mut samples = ping_pong_samples(PING_PONG_ROUNDS, PING_PONG_WARMUP);
    let ping_pong = BenchResult {
        name: "ping-pong (2 rendezvous)".to_string(),
        unit: "ns/rt".to_string(),
        stats: compute_stats(&mut samples),
    };
    print_result_row(&ping_pong);
    results.push(ping_pong);

    let listen = listen_batched(1_000, 100, 50);
    print_result_row(&listen);
    results.push(listen);

    // ── Throughput ──
    section_header("THROUGHPUT (one shared communicator)");
    println!("  {:<12} {:>14} {:>14}", "pairs", "exchanges/s", "per exchange");
    println!("  {}", "─".repeat(44));

    let mut throughput = Vec::new();
    for pairs in [1u32, 2, 4, 8, 16] {
        let rate = exchange_throughput(pairs, THROUGHPUT_WORDS / pairs);
        println!(
            "  {:<12} {:>14} {:>14}",
            pairs,
            format_count(rate as u64),
            format_ns(1e9 / rate),
        );
        throughput.push(serde_json::json!({ "pairs": pairs, "exchanges_per_sec": rate }));
    }

    // ── Resources ──
    let rusage_end = capture_rusage();
    section_header("RESOURCES");
    println!(
        "  voluntary ctx switches:   {}",
        rusage_end.vol_ctx_switches - rusage_start.vol_ctx_switches
    );
    println!(
        "  involuntary ctx switches: {}",
        rusage_end.invol_ctx_switches - rusage_start.invol_ctx_switches
    );
    println!(
        "  user / sys time:          {} / {}",
        format_ns((rusage_end.user_time_us - rusage_start.user_time_us) as f64 * 1_000.0),
        format_ns((rusage_end.sys_time_us - rusage_start.sys_time_us) as f64 * 1_000.0),
    );

    // ── JSON ──
    let output = serde_json::json!({
        "report_type": "rendezvous",
        "latency": results,
        "throughput": throughput,
        "resources": { "start": rusage_start, "end": rusage_end },
    });

    let results_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/results");
    let _ = std::fs::create_dir_all(results_dir);
    let json_path = format!("{results_dir}/report.json");
    match serde_json::to_string_pretty(&output)
        .map_err(std::io::Error::other)
        .and_then(|json| std::fs::write(&json_path, json))
    {
        Ok(()) => println!("\n{bar}\n  Results saved to: {json_path}\n{bar}\n"),
        Err(e) => eprintln!("failed to write {json_path}: {e}"),
    }
}
