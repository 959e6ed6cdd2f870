//! Builds per-run histograms from synthetic timing samples, merges them and
//! prints the merged shape against its reference distributions.
//!
//! Run with: RUST_LOG=debug cargo run -p profile-histogram --example profile_demo

use profile_histogram::{
    Histogram, HistogramConfig, HistogramReader, HistogramWriter, MergeBuilder,
};
use rand::prelude::*;
use rand_distr::LogNormal;
use std::io::Cursor;

fn run(seed: u64, samples: usize, bins: usize) -> (Histogram, f64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = LogNormal::new(3.0, 0.4).unwrap();

    let mut h = Histogram::new();
    let mut total = 0.0;
    for _ in 0..samples {
        // roughly one sample in five never reached the timed region
        let value = if rng.gen_bool(0.2) { 0.0 } else { dist.sample(&mut rng) };
        h.add_to_list(value, 1.0);
        total += 1.0;
    }
    h.build_from_list_fit(bins, total);
    (h, total)
}

fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    let config = HistogramConfig::default();

    let runs: Vec<(Histogram, f64)> = (0..4).map(|seed| run(seed, 250, config.bin_count)).collect();
    for (i, (h, _)) in runs.iter().enumerate() {
        println!("=== run {} ===", i);
        print!("{}", h);
        println!("{}", h.summary());
    }

    let total: f64 = runs.iter().map(|(_, tw)| tw).sum();
    let refs: Vec<&Histogram> = runs.iter().map(|(h, _)| h).collect();
    let merged = MergeBuilder::from_config(&config, total).merge(&refs)?;

    println!("\n=== merged ===");
    print!("{}", merged);
    println!("mean {:.3} (with zeros {:.3})", merged.mean(false), merged.mean(true));
    println!("stdev {:.3}", merged.stdev(false));
    if let Some((lo, hi)) = merged.quantile_range(0.05, 0.95) {
        println!("90% of nonzero weight in [{:.3}, {:.3}]", lo, hi);
    }
    println!(
        "P(run 0 < run 1) ~ {:.3}",
        runs[0].0.est_prob_less_than(&runs[1].0)
    );
    println!("summary: {}", merged.summary());

    let mut writer = HistogramWriter::new(Vec::new(), config.clone());
    writer.write(1, &merged)?;
    let bytes = writer.into_inner();
    println!("\nencoded merged histogram in {} bytes", bytes.len());

    let mut reader = HistogramReader::new(Cursor::new(bytes), config);
    let (id, back) = reader.read(total)?;
    println!("read back #{}: median {:.3}", id, back.quantile(0.5));

    Ok(())
}
