//! Train/validation split of a folder-per-class image collection

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Inputs for [`split_dataset`]
#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub raw_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Fraction of each class that goes to `train/`, in `[0, 1]`
    pub train_ratio: f64,
    /// Fixed seed for a reproducible shuffle
    pub seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("raw-img"),
            output_dir: PathBuf::from("animals-10"),
            train_ratio: 0.8,
            seed: None,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.train_ratio) {
            bail!("train ratio must be within [0, 1], got {}", self.train_ratio);
        }
        if !self.raw_dir.is_dir() {
            bail!("raw image directory not found: {}", self.raw_dir.display());
        }
        Ok(())
    }

    pub fn train_dir(&self) -> PathBuf {
        self.output_dir.join("train")
    }

    pub fn val_dir(&self) -> PathBuf {
        self.output_dir.join("val")
    }
}

/// Per-class outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSplit {
    pub class: String,
    pub train: usize,
    pub val: usize,
}

/// What [`split_dataset`] copied
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub train_dir: PathBuf,
    pub val_dir: PathBuf,
    pub classes: Vec<ClassSplit>,
}

impl SplitReport {
    pub fn train_total(&self) -> usize {
        self.classes.iter().map(|c| c.train).sum()
    }

    pub fn val_total(&self) -> usize {
        self.classes.iter().map(|c| c.val).sum()
    }
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<16} {:>8} {:>8}", "class", "train", "val")?;
        for class in &self.classes {
            writeln!(f, "{:<16} {:>8} {:>8}", class.class, class.train, class.val)?;
        }
        writeln!(
            f,
            "{:<16} {:>8} {:>8}",
            "total",
            self.train_total(),
            self.val_total()
        )?;
        writeln!(f)?;
        writeln!(f, "Train folder: {}", self.train_dir.display())?;
        write!(f, "Validation folder: {}", self.val_dir.display())
    }
}

/// Number of files from a class of `n` that go to `train/`
pub fn train_count(n: usize, ratio: f64) -> usize {
    ((n as f64) * ratio).floor() as usize
}

/// Copy every class sub-directory of `raw_dir` into `train/<class>` and
/// `val/<class>` under `output_dir`.
///
/// Classes are visited in name order and each class's files are sorted
/// before shuffling, so a fixed seed always produces the same split.
/// Entries of `raw_dir` that are not directories are ignored. Source files
/// are copied, never moved.
pub fn split_dataset(config: &SplitConfig) -> Result<SplitReport> {
    config.validate()?;

    let train_dir = config.train_dir();
    let val_dir = config.val_dir();
    fs::create_dir_all(&train_dir)
        .with_context(|| format!("creating {}", train_dir.display()))?;
    fs::create_dir_all(&val_dir).with_context(|| format!("creating {}", val_dir.display()))?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut classes = Vec::new();
    for (class, class_path) in class_dirs(&config.raw_dir)? {
        let mut files = list_files(&class_path)?;
        files.shuffle(&mut rng);

        let n_train = train_count(files.len(), config.train_ratio);
        let (train, val) = files.split_at(n_train);

        copy_all(&class_path, train, &train_dir.join(&class))?;
        copy_all(&class_path, val, &val_dir.join(&class))?;

        debug!(class = %class, train = train.len(), val = val.len(), "Class split");
        classes.push(ClassSplit {
            class,
            train: train.len(),
            val: val.len(),
        });
    }

    info!(
        classes = classes.len(),
        output = %config.output_dir.display(),
        "Dataset split complete"
    );

    Ok(SplitReport {
        train_dir,
        val_dir,
        classes,
    })
}

fn class_dirs(raw_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(raw_dir).with_context(|| format!("reading {}", raw_dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
    }
    dirs.sort();
    Ok(dirs)
}

fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(files)
}

fn copy_all(from: &Path, names: &[String], to: &Path) -> Result<()> {
    fs::create_dir_all(to).with_context(|| format!("creating {}", to.display()))?;
    for name in names {
        let src = from.join(name);
        let dst = to.join(name);
        fs::copy(&src, &dst)
            .with_context(|| format!("copying {} to {}", src.display(), dst.display()))?;
    }
    Ok(())
}
