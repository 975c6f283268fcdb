use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pawprint")]
#[command(author, version, about = "Pawprint dataset and deployment tools")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a folder-per-class image collection into train/ and val/
    SplitDataset {
        /// Directory holding one sub-directory per class
        #[arg(long, default_value = "raw-img")]
        raw_dir: PathBuf,

        /// Where train/ and val/ are created
        #[arg(long, default_value = "animals-10")]
        output_dir: PathBuf,

        /// Fraction of each class copied to train/
        #[arg(long, default_value_t = 0.8)]
        train_ratio: f64,

        /// Shuffle seed for a reproducible split
        #[arg(long)]
        seed: Option<u64>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check a checkout is ready to deploy
    Preflight {
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Model config YAML, relative to the root
        #[arg(long, default_value = "models/animals10.yaml")]
        model_config: PathBuf,

        /// Weights file, relative to the root; read from the model config when omitted
        #[arg(long)]
        model: Option<PathBuf>,

        /// Directory with index.html, script.js and style.css, relative to the root
        #[arg(long, default_value = "crates/pawprint-server/static")]
        static_dir: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}
