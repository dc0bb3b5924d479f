//! Replay a recorded scroll session through the section tracker
//!
//! Usage: replay_scroll_trace <trace.jsonl> [tracker_config.json]
//!
//! Prints every active-section transition with its timestamp and cause, so
//! scoring weights, bottom tolerance and debounce window can be tuned against
//! real sessions without a browser.

use anyhow::{bail, Context};
use portfolio_site_rust::tracking::{parse_trace, replay};
use portfolio_site_rust::TrackerConfig;
use std::path::Path;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        bail!("usage: {} <trace.jsonl> [tracker_config.json]", args[0]);
    }

    let trace_path = Path::new(&args[1]);
    let config = match args.get(2) {
        Some(path) => TrackerConfig::load(Path::new(path))?,
        None => TrackerConfig::default(),
    };

    let contents = std::fs::read_to_string(trace_path)
        .with_context(|| format!("Failed to read trace: {:?}", trace_path))?;
    let events = parse_trace(&contents)?;

    println!("Replaying {} events from {:?}", events.len(), trace_path);
    println!(
        "  weights: area/{} + {}/(|top| + {})",
        config.resolver.weights.area_divisor,
        config.resolver.weights.proximity_numerator,
        config.resolver.weights.proximity_offset
    );
    println!("  bottom tolerance: {}px", config.resolver.bottom_tolerance_px);
    match config.resolver.debounce_ms {
        Some(ms) => println!("  debounce: {}ms", ms),
        None => println!("  debounce: off"),
    }
    println!("  grace period: {}ms", config.guard.grace_period_ms);

    let start = Instant::now();
    let report = replay(&events, &config)?;
    let elapsed = start.elapsed();

    println!("\n{}", "=".repeat(60));
    println!("TRANSITIONS");
    println!("{}", "=".repeat(60));
    for t in &report.transitions {
        println!("{:>8} ms  {:<20} ({:?})", t.at_ms, t.section_id, t.cause);
    }

    println!("\n{}", "=".repeat(60));
    println!("SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Events:               {}", report.events);
    println!("Transitions:          {}", report.transitions.len());
    println!("Rejected navigations: {}", report.rejected_navigations);
    println!("Final section:        {}", report.final_section);
    println!("Final progress:       {:.1}%", report.final_progress * 100.0);
    println!("Replay time:          {:.3} ms", elapsed.as_secs_f64() * 1000.0);

    Ok(())
}
