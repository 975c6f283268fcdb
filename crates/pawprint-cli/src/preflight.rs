//! Pre-deployment checks
//!
//! Each check lands in a named section with a pass, warn or fail status.
//! Only failures make the run unsuccessful.

use pawprint_classifiers::ModelConfig;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Weights above this size cannot be deployed
pub const MODEL_SIZE_FAIL_BYTES: u64 = 500 * 1024 * 1024;

/// Weights above this size deploy, but slowly
pub const MODEL_SIZE_WARN_BYTES: u64 = 100 * 1024 * 1024;

/// Crates the server manifest must pull in
pub const REQUIRED_CRATES: &[&str] = &["axum", "tokio", "candle-core", "image", "serde"];

/// Binary the Procfile has to start
pub const SERVER_BINARY: &str = "pawprint-server";

/// Number of classes the animals-10 model predicts
pub const EXPECTED_CLASSES: usize = 10;

const STATUS_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl CheckStatus {
    fn marker(self) -> &'static str {
        match self {
            Self::Pass => "[ok]  ",
            Self::Warn => "[warn]",
            Self::Fail => "[FAIL]",
        }
    }
}

/// One line of the report
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub section: &'static str,
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

/// Where to look
#[derive(Debug, Clone)]
pub struct PreflightOptions {
    pub root: PathBuf,
    /// Relative to `root`
    pub model_config: PathBuf,
    /// Relative to `root`; taken from the model config when `None`
    pub model: Option<PathBuf>,
    /// Relative to `root`
    pub static_dir: PathBuf,
}

impl Default for PreflightOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            model_config: PathBuf::from("models/animals10.yaml"),
            model: None,
            static_dir: PathBuf::from("crates/pawprint-server/static"),
        }
    }
}

/// Every check that ran, in order
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreflightReport {
    pub checks: Vec<Check>,
}

impl PreflightReport {
    fn push(
        &mut self,
        section: &'static str,
        name: impl Into<String>,
        status: CheckStatus,
        detail: impl Into<String>,
    ) {
        self.checks.push(Check {
            section,
            name: name.into(),
            status,
            detail: detail.into(),
        });
    }

    /// True when nothing failed; warnings are allowed
    pub fn passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// Checks from one section
    pub fn section(&self, section: &str) -> Vec<&Check> {
        self.checks.iter().filter(|c| c.section == section).collect()
    }

    /// Status of the first check called `name`
    pub fn status_of(&self, name: &str) -> Option<CheckStatus> {
        self.checks.iter().find(|c| c.name == name).map(|c| c.status)
    }
}

impl fmt::Display for PreflightReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(60);
        let mut current = None;

        for check in &self.checks {
            if current != Some(check.section) {
                if current.is_some() {
                    writeln!(f)?;
                }
                writeln!(f, "{}", check.section)?;
                writeln!(f, "{}", rule)?;
                current = Some(check.section);
            }
            writeln!(f, "{} {}: {}", check.status.marker(), check.name, check.detail)?;
        }

        writeln!(f)?;
        writeln!(f, "{}", "=".repeat(60))?;
        write!(
            f,
            "{} passed, {} warnings, {} failed. {}",
            self.count(CheckStatus::Pass),
            self.count(CheckStatus::Warn),
            self.count(CheckStatus::Fail),
            if self.passed() {
                "Ready to deploy."
            } else {
                "Fix the failures above before deploying."
            }
        )
    }
}

/// Map a weights file size to a status
pub fn model_size_status(bytes: u64) -> CheckStatus {
    if bytes > MODEL_SIZE_FAIL_BYTES {
        CheckStatus::Fail
    } else if bytes > MODEL_SIZE_WARN_BYTES {
        CheckStatus::Warn
    } else {
        CheckStatus::Pass
    }
}

/// Run every check against `options.root`
pub fn run_preflight(options: &PreflightOptions) -> PreflightReport {
    let mut report = PreflightReport::default();
    let root = options.root.as_path();

    let config_path = root.join(&options.model_config);
    let model_config = ModelConfig::from_file(&config_path);
    let weights = match (&options.model, &model_config) {
        (Some(model), _) => Weights::Local(root.join(model)),
        (None, Ok(config)) => match config.local_path() {
            Some(path) => Weights::Local(path.to_path_buf()),
            None => Weights::Hub,
        },
        (None, Err(_)) => Weights::Unknown,
    };

    check_required_files(&mut report, options, &weights);
    check_model(&mut report, &config_path, &model_config, weights.path());
    check_git(&mut report, root, weights.path());
    check_manifest(&mut report, root);
    check_procfile(&mut report, root);
    check_toolchain(&mut report, root);

    debug!(
        checks = report.checks.len(),
        failed = report.count(CheckStatus::Fail),
        "Preflight finished"
    );
    report
}

/// Where the weights are expected to come from
enum Weights {
    Local(PathBuf),
    Hub,
    Unknown,
}

impl Weights {
    fn path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Hub | Self::Unknown => None,
        }
    }
}

const FILES: &str = "Required files";

fn check_required_files(report: &mut PreflightReport, options: &PreflightOptions, weights: &Weights) {
    let root = options.root.as_path();

    match weights {
        Weights::Local(path) => file_exists(report, "Model weights", path),
        Weights::Hub => report.push(
            FILES,
            "Model weights",
            CheckStatus::Pass,
            "fetched from the Hugging Face Hub at startup",
        ),
        Weights::Unknown => report.push(
            FILES,
            "Model weights",
            CheckStatus::Fail,
            "location unknown; the model config could not be read",
        ),
    }

    file_exists(report, "Model config file", &root.join(&options.model_config));
    file_exists(report, "Cargo manifest", &root.join("Cargo.toml"));
    file_exists(report, "Procfile", &root.join("Procfile"));
    file_exists(report, "Toolchain file", &root.join("rust-toolchain.toml"));

    let static_dir = root.join(&options.static_dir);
    file_exists(report, "Upload page", &static_dir.join("index.html"));
    file_exists(report, "Frontend script", &static_dir.join("script.js"));
    file_exists(report, "Stylesheet", &static_dir.join("style.css"));
}

fn file_exists(report: &mut PreflightReport, name: &str, path: &Path) {
    match fs::metadata(path) {
        Ok(meta) => report.push(
            FILES,
            name,
            CheckStatus::Pass,
            format!("{} ({} bytes)", path.display(), meta.len()),
        ),
        Err(_) => report.push(
            FILES,
            name,
            CheckStatus::Fail,
            format!("{} not found", path.display()),
        ),
    }
}

const MODEL: &str = "Model";

fn check_model(
    report: &mut PreflightReport,
    config_path: &Path,
    config: &pawprint_core::Result<ModelConfig>,
    weights: Option<&Path>,
) {
    if let Some(meta) = weights.and_then(|p| fs::metadata(p).ok()) {
        let bytes = meta.len();
        let mb = bytes as f64 / (1024.0 * 1024.0);
        let status = model_size_status(bytes);
        let detail = match status {
            CheckStatus::Pass => format!("{:.2} MB", mb),
            CheckStatus::Warn => format!("{:.2} MB, large models slow down deploys and cold starts", mb),
            CheckStatus::Fail => format!("{:.2} MB, above the 500 MB limit", mb),
        };
        report.push(MODEL, "Model size", status, detail);
    }

    match config {
        Ok(config) => {
            report.push(
                MODEL,
                "Model config",
                CheckStatus::Pass,
                format!("{} v{} ({:?})", config.name, config.version, config.architecture),
            );

            let classes = config.class_labels().len();
            if classes == EXPECTED_CLASSES {
                report.push(MODEL, "Class labels", CheckStatus::Pass, format!("{} labels", classes));
            } else {
                report.push(
                    MODEL,
                    "Class labels",
                    CheckStatus::Warn,
                    format!("{} labels, expected {}", classes, EXPECTED_CLASSES),
                );
            }
        }
        Err(e) => report.push(
            MODEL,
            "Model config",
            CheckStatus::Fail,
            format!("{}: {}", config_path.display(), e),
        ),
    }
}

const GIT: &str = "Git";

fn check_git(report: &mut PreflightReport, root: &Path, weights: Option<&Path>) {
    if !root.join(".git").exists() {
        report.push(GIT, "Repository", CheckStatus::Fail, "not a git repository");
        return;
    }
    report.push(GIT, "Repository", CheckStatus::Pass, "git repository detected");

    if let Some(weights) = weights {
        let relative = weights.strip_prefix(root).unwrap_or(weights);
        let relative = relative.to_string_lossy().into_owned();
        match git(root, &["ls-files", "--", &relative]) {
            Ok(out) if !out.trim().is_empty() => {
                report.push(GIT, "Model tracked", CheckStatus::Pass, format!("{} is tracked", relative))
            }
            Ok(_) => report.push(
                GIT,
                "Model tracked",
                CheckStatus::Warn,
                format!("{} is not tracked (check .gitignore)", relative),
            ),
            Err(e) => report.push(GIT, "Model tracked", CheckStatus::Warn, e),
        }
    }

    match git(root, &["status", "--porcelain"]) {
        Ok(out) if out.trim().is_empty() => {
            report.push(GIT, "Working tree", CheckStatus::Pass, "no uncommitted changes")
        }
        Ok(out) => {
            let preview: String = out.trim().chars().take(STATUS_PREVIEW_CHARS).collect();
            report.push(
                GIT,
                "Working tree",
                CheckStatus::Warn,
                format!("uncommitted changes:\n{}", preview),
            )
        }
        Err(e) => report.push(GIT, "Working tree", CheckStatus::Warn, e),
    }
}

fn git(root: &Path, args: &[&str]) -> Result<String, String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map_err(|e| format!("git unavailable: {}", e))?;

    if !output.status.success() {
        return Err(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

const MANIFEST: &str = "Cargo manifest";

fn check_manifest(report: &mut PreflightReport, root: &Path) {
    let Ok(content) = fs::read_to_string(root.join("Cargo.toml")) else {
        return;
    };
    let content = content.to_lowercase();

    for krate in REQUIRED_CRATES {
        if declares_dependency(&content, krate) {
            report.push(MANIFEST, *krate, CheckStatus::Pass, "declared");
        } else {
            report.push(MANIFEST, *krate, CheckStatus::Fail, "not found in Cargo.toml");
        }
    }
}

/// Whether a manifest line declares `name` as a key (`name = ..`,
/// `name.workspace = true`) or a `[dependencies.name]` table
fn declares_dependency(manifest: &str, name: &str) -> bool {
    manifest.lines().any(|line| {
        let line = line.trim();
        if let Some(table) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            return table.contains("dependencies.") && table.rsplit('.').next() == Some(name);
        }
        match line.strip_prefix(name) {
            Some(rest) => {
                let rest = rest.trim_start();
                rest.starts_with('=') || rest.starts_with('.')
            }
            None => false,
        }
    })
}

const PROCFILE: &str = "Procfile";

fn check_procfile(report: &mut PreflightReport, root: &Path) {
    let Ok(content) = fs::read_to_string(root.join("Procfile")) else {
        return;
    };
    let content = content.trim();

    if content.contains(SERVER_BINARY) {
        report.push(PROCFILE, "Start command", CheckStatus::Pass, content);
    } else {
        report.push(
            PROCFILE,
            "Start command",
            CheckStatus::Fail,
            format!("'{}' does not start {}", content, SERVER_BINARY),
        );
    }
}

const TOOLCHAIN: &str = "Toolchain";

fn check_toolchain(report: &mut PreflightReport, root: &Path) {
    let Ok(content) = fs::read_to_string(root.join("rust-toolchain.toml")) else {
        return;
    };

    let channel = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("channel"))
        .and_then(|line| line.split_once('='))
        .map(|(_, value)| value.trim().trim_matches('"').to_string());

    match channel {
        Some(channel) if !channel.is_empty() => {
            report.push(TOOLCHAIN, "Channel", CheckStatus::Pass, channel)
        }
        _ => report.push(
            TOOLCHAIN,
            "Channel",
            CheckStatus::Warn,
            "rust-toolchain.toml should declare a channel, e.g. channel = \"1.80\"",
        ),
    }
}
