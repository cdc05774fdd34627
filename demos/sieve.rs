use clap::Parser;

use u_sieve::distributions::LogNormal;
use u_sieve::experiment::{run, run_parallel, ExperimentConfig, SamplingStrategy};
use u_sieve::truncated::{TruncatedLogNormal, TruncationBounds};

/// Draws samples of rock diameters from a screened log-normal population.
#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Mean of ln(D) for the unscreened rocks.
    #[arg(long, value_name = "FLOAT", default_value_t = std::f64::consts::LN_2, allow_negative_numbers = true)]
    mu: f64,

    /// Standard deviation of ln(D) for the unscreened rocks.
    #[arg(long, value_name = "FLOAT", default_value_t = 1.0)]
    sigma: f64,

    /// Small aperture size.
    #[arg(long, value_name = "FLOAT", default_value_t = 0.375)]
    d_min: f64,

    /// Large aperture size.
    #[arg(long, value_name = "FLOAT", default_value_t = 1.0)]
    d_max: f64,

    /// Number of rocks in each sample.
    #[arg(short = 'n', long, value_name = "INT", default_value_t = 100)]
    sample_size: usize,

    /// Number of samples.
    #[arg(short = 'm', long, value_name = "INT", default_value_t = 11)]
    sample_count: usize,

    /// Random seed.
    #[arg(long, value_name = "INT", default_value_t = 42)]
    seed: u64,

    /// Compute the samples in parallel.
    #[clap(long)]
    parallel: bool,

    /// Sample from an inverse-CDF table with this many nodes instead of
    /// solving every draw.
    #[clap(long, value_name = "INT")]
    table: Option<usize>,

    /// Print every diameter.
    #[clap(long)]
    show_samples: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let config = ExperimentConfig {
        distribution: LogNormal::new(args.mu, args.sigma)?,
        bounds: TruncationBounds::new(args.d_min, args.d_max)?,
        sample_size: args.sample_size,
        sample_count: args.sample_count,
        strategy: match args.table {
            Some(nodes) => SamplingStrategy::Tabulated { nodes },
            None => SamplingStrategy::RootFinding,
        },
    };

    let result = if args.parallel {
        run_parallel(&config, args.seed)?
    } else {
        run(&config, args.seed)?
    };

    let norm = result.normalization();
    println!(
        "F(d_min) = {:.5}, F(d_max) = {:.5}, surviving fraction = {:.5}",
        norm.f_at_d_min,
        norm.f_at_d_max,
        norm.mass()
    );

    println!("\n{:>8} {:>10} {:>10}", "sample", "mean", "variance");
    for (i, (sample, summary)) in result
        .samples()
        .iter()
        .zip(result.sample_summaries())
        .enumerate()
    {
        println!("{:>8} {:>10.3} {:>10.3}", i + 1, summary.mean, summary.variance);
        if args.show_samples {
            let values: Vec<String> = sample.iter().map(|d| format!("{d:.3}")).collect();
            println!("         [{}]", values.join(", "));
        }
    }

    match result.means_summary() {
        Some(means) => println!(
            "\nmean of the sampling mean = {:.3}, variance of the sampling mean = {:.6}",
            means.mean, means.variance
        ),
        None => println!("\nsingle sample: variance of the sampling mean is undefined"),
    }

    let pooled = result.pooled_summary()?;
    println!(
        "all {} rocks: mean = {:.3}, variance = {:.3}, range = [{:.3}, {:.3}]",
        pooled.count, pooled.mean, pooled.variance, pooled.min, pooled.max
    );

    let screen = TruncatedLogNormal::with_normalization(config.distribution, config.bounds, *norm);
    println!(
        "screened population: mean = {:.3}, variance = {:.3}",
        screen.mean()?,
        screen.variance()?
    );

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
