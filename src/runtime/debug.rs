//! Debug logging for event execution
//!
//! All runtime diagnostics go through the `log` facade with one target per
//! area (`eventweave::engine`, `eventweave::flow`, ...). [`DebugLogger`] is a
//! small `log::Log` implementation that filters those records by category
//! and level and writes them to stderr or a file.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

/// Debug log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// All internal state changes
    Trace,
    /// Development debugging information
    Debug,
    /// Important state changes
    Info,
    /// Potential issues
    Warn,
    /// Error situations
    Error,
}

impl LogLevel {
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// Debug log category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebugCategory {
    /// Command dispatch and notifications
    Engine,
    /// Control flow (branches, labels, suspensions)
    Flow,
    /// Variable operations
    Variables,
    /// Instance lifecycle and ticking
    Scheduler,
    /// Persistence queue flushes
    Persistence,
}

impl DebugCategory {
    /// Category of a `log` target, `None` for foreign targets
    pub fn from_target(target: &str) -> Option<Self> {
        let area = target.strip_prefix("eventweave::")?;
        match area.split("::").next()? {
            "engine" => Some(DebugCategory::Engine),
            "flow" => Some(DebugCategory::Flow),
            "variables" => Some(DebugCategory::Variables),
            "scheduler" => Some(DebugCategory::Scheduler),
            "persistence" => Some(DebugCategory::Persistence),
            _ => None,
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Enable debug logging
    pub enabled: bool,
    /// Minimum log level
    pub level: LogLevel,
    /// Output destination
    pub output: DebugOutput,
    /// Enabled categories
    pub categories: HashSet<DebugCategory>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        let mut categories = HashSet::new();
        categories.insert(DebugCategory::Engine);
        categories.insert(DebugCategory::Flow);

        Self {
            enabled: std::env::var("EVENTWEAVE_DEBUG").is_ok(),
            level: LogLevel::Debug,
            output: DebugOutput::Stderr,
            categories,
        }
    }
}

impl DebugConfig {
    pub fn all_categories(mut self) -> Self {
        self.categories.extend([
            DebugCategory::Engine,
            DebugCategory::Flow,
            DebugCategory::Variables,
            DebugCategory::Scheduler,
            DebugCategory::Persistence,
        ]);
        self
    }

    /// Whether a record with this target and level passes the filter
    pub fn allows(&self, target: &str, level: log::Level) -> bool {
        if !self.enabled || level > self.level.to_filter() {
            return false;
        }
        match DebugCategory::from_target(target) {
            Some(category) => self.categories.contains(&category),
            // Warnings from dependencies are still worth seeing
            None => level <= log::Level::Warn,
        }
    }
}

/// Debug output destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DebugOutput {
    /// Output to stderr
    Stderr,
    /// Append to a file
    File(String),
}

/// `log::Log` implementation driven by a [`DebugConfig`]
pub struct DebugLogger {
    config: DebugConfig,
    file: Option<Mutex<File>>,
}

impl DebugLogger {
    pub fn new(config: DebugConfig) -> std::io::Result<Self> {
        let file = match &config.output {
            DebugOutput::Stderr => None,
            DebugOutput::File(path) => Some(Mutex::new(
                OpenOptions::new().create(true).append(true).open(path)?,
            )),
        };
        Ok(Self { config, file })
    }

    /// Install as the global logger
    pub fn init(config: DebugConfig) -> anyhow::Result<()> {
        let max_level = if config.enabled {
            config.level.to_filter()
        } else {
            log::LevelFilter::Off
        };
        let logger = Self::new(config)?;
        log::set_boxed_logger(Box::new(logger))
            .map_err(|err| anyhow::anyhow!("failed to install logger: {err}"))?;
        log::set_max_level(max_level);
        Ok(())
    }

    fn format(record: &log::Record) -> String {
        let category = DebugCategory::from_target(record.target())
            .map(|category| format!("{category:?}"))
            .unwrap_or_else(|| record.target().to_string());
        format!("[{}] {:10} {}", record.level(), category, record.args())
    }
}

impl log::Log for DebugLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.config.allows(metadata.target(), metadata.level())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);
        match &self.file {
            None => eprintln!("{line}"),
            Some(file) => {
                if let Ok(mut file) = file.lock() {
                    let _ = writeln!(file, "{line}");
                }
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file
            && let Ok(mut file) = file.lock()
        {
            let _ = file.flush();
        }
    }
}
