use anyhow::Result;
use clap::Parser;
use pawprint_cli::cli::{Cli, Commands};
use pawprint_cli::{run_preflight, split_dataset, PreflightOptions, SplitConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::SplitDataset {
            raw_dir,
            output_dir,
            train_ratio,
            seed,
            verbose,
        } => {
            init_logging(verbose);

            let config = SplitConfig {
                raw_dir,
                output_dir,
                train_ratio,
                seed,
            };
            let report = split_dataset(&config)?;

            println!("Dataset split complete!");
            println!();
            println!("{}", report);
        }

        Commands::Preflight {
            root,
            model_config,
            model,
            static_dir,
            json,
            verbose,
        } => {
            init_logging(verbose);

            let options = PreflightOptions {
                root,
                model_config,
                model,
                static_dir,
            };
            let report = run_preflight(&options);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Pre-deployment checks");
                println!("{}", "=".repeat(60));
                println!();
                println!("{}", report);
            }

            if !report.passed() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "pawprint=debug" } else { "pawprint=warn" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
