//! TimedCache simulator - drives a cache from a single-threaded event loop

mod workload;

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use timedcache::{Config, TimedCache};
use tracing::{debug, info};

use crate::workload::{Session, Summary, Traffic};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Keys opened before traffic starts
    #[arg(short, long, default_value_t = 100_000)]
    keys: u64,

    /// Keys that keep receiving traffic
    #[arg(long, default_value_t = 1_000)]
    hot_keys: u64,

    /// Idle timeout in milliseconds
    #[arg(short, long, default_value_t = 2_000)]
    timeout_ms: u64,

    /// Minimum time between sweeps in milliseconds
    #[arg(short, long, default_value_t = 250)]
    sweep_interval_ms: u64,

    /// Event loop tick in milliseconds
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,

    /// Reads per tick
    #[arg(long, default_value_t = 50)]
    accesses_per_tick: u64,

    /// New keys per tick
    #[arg(long, default_value_t = 5)]
    new_per_tick: u64,

    /// Run length in milliseconds
    #[arg(short, long, default_value_t = 5_000)]
    duration_ms: u64,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = Config::new(Duration::from_millis(args.timeout_ms))
        .with_sweep_interval(Duration::from_millis(args.sweep_interval_ms));

    let closed = Arc::new(AtomicU64::new(0));
    let closer = Arc::clone(&closed);
    let mut cache = TimedCache::from_config(&config)?.on_evict(move |session: &Session| {
        debug!(
            id = session.id,
            age_ms = session.opened.elapsed().as_millis() as u64,
            "closing idle session"
        );
        closer.fetch_add(1, Ordering::Relaxed);
        Ok(())
    });

    info!("Starting tcsim v{}", env!("CARGO_PKG_VERSION"));
    info!("Idle timeout: {:?}", config.timeout);
    info!("Sweep interval: {:?}", config.sweep_interval);

    cache.extend((0..args.keys).map(|id| (id, Session::open(id))));
    info!("Opened {} sessions", cache.len());

    let mut traffic = Traffic::new(
        args.hot_keys.min(args.keys),
        args.accesses_per_tick,
        args.new_per_tick,
        args.keys,
    );
    let mut summary = Summary::default();
    let mut ticker = tokio::time::interval(Duration::from_millis(args.tick_ms.max(1)));
    let deadline = tokio::time::sleep(Duration::from_millis(args.duration_ms));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = ticker.tick() => {
                summary.ticks += 1;

                for id in traffic.touched() {
                    if cache.get(&id).is_none() {
                        cache.put(id, Session::open(id));
                        summary.reopened += 1;
                    }
                }
                for id in traffic.opened() {
                    cache.put(id, Session::open(id));
                }

                let started = Instant::now();
                if let Some(outcome) = cache.maybe_sweep() {
                    let elapsed = started.elapsed();
                    summary.record_sweep(&outcome, elapsed);
                    if outcome.evicted > 0 {
                        info!(
                            scanned = outcome.scanned,
                            live = cache.len(),
                            elapsed_us = elapsed.as_micros() as u64,
                            "Swept {} idle sessions",
                            outcome.evicted
                        );
                    }
                }
            }
        }
    }

    summary.remaining = cache.len();
    summary.closed = closed.load(Ordering::Relaxed);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!("Ticks:             {}", summary.ticks);
        info!("Live sessions:     {}", summary.remaining);
        info!("Evicted:           {}", summary.evicted);
        info!("Closed by sweep:   {}", summary.closed);
        info!("Reopened:          {}", summary.reopened);
        info!("Sweeps:            {}", summary.sweeps);
        info!("Largest sweep:     {} accesses", summary.max_scanned);
        info!("Slowest sweep:     {} us", summary.max_sweep_micros);
        info!("Hit ratio:         {:.3}", cache.stats().hit_ratio());
    }

    Ok(())
}
