//! Report configuration: TOML file values merged with command line flags
//!
//! ```toml
//! sort = ["max", "count"]
//! per_cpu = true
//! format = "json"
//! heat_data = "/tmp/irq.heat"
//! ```

use crate::cli::{Cli, OutputFormat};
use crate::event::EventClass;
use crate::report::{CpuSelection, DEFAULT_HEAT_DATA};
use crate::sort::{SortChain, SortKeyError, SortRegistry, DEFAULT_SORT_ORDER};
use crate::trace_reader::TraceFormat;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// `sort` may be written as `"max, avg"` or `["max", "avg"]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SortSpec {
    Text(String),
    List(Vec<String>),
}

impl SortSpec {
    pub fn chain(&self, registry: &SortRegistry) -> Result<SortChain, SortKeyError> {
        match self {
            Self::Text(spec) => SortChain::parse(spec, registry),
            Self::List(names) => SortChain::from_names(names, registry),
        }
    }
}

/// Values read from a config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub sort: Option<SortSpec>,
    pub cpu: Option<u32>,
    pub irq: Option<u32>,
    pub softirq: Option<u32>,
    pub per_cpu: Option<bool>,
    pub format: Option<OutputFormat>,
    pub input_format: Option<TraceFormat>,
    pub heat_data: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Effective settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub sort: SortSpec,
    pub cpu: Option<u32>,
    pub irq: Option<u32>,
    pub softirq: Option<u32>,
    pub per_cpu: bool,
    pub format: OutputFormat,
    pub input_format: TraceFormat,
    pub heat_data: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sort: SortSpec::Text(DEFAULT_SORT_ORDER.to_string()),
            cpu: None,
            irq: None,
            softirq: None,
            per_cpu: false,
            format: OutputFormat::default(),
            input_format: TraceFormat::default(),
            heat_data: PathBuf::from(DEFAULT_HEAT_DATA),
        }
    }
}

impl ReportConfig {
    /// Command line flags win over file values, file values over defaults
    pub fn resolve(cli: &Cli, file: Option<FileConfig>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            sort: cli
                .sort
                .clone()
                .map(SortSpec::Text)
                .or(file.sort)
                .unwrap_or(defaults.sort),
            cpu: cli.cpu.or(file.cpu),
            irq: cli.irq.or(file.irq),
            softirq: cli.softirq.or(file.softirq),
            per_cpu: cli.per_cpu || file.per_cpu.unwrap_or(defaults.per_cpu),
            format: cli.format.or(file.format).unwrap_or(defaults.format),
            input_format: cli
                .input_format
                .or(file.input_format)
                .unwrap_or(defaults.input_format),
            heat_data: cli
                .heat_data
                .clone()
                .or(file.heat_data)
                .unwrap_or(defaults.heat_data),
        }
    }

    pub fn sort_chain(&self, registry: &SortRegistry) -> Result<SortChain, SortKeyError> {
        self.sort.chain(registry)
    }

    /// Single-key selection; irq takes precedence over softirq
    pub fn key_selection(&self) -> Option<(EventClass, u32)> {
        self.irq
            .map(|key| (EventClass::Irq, key))
            .or_else(|| self.softirq.map(|key| (EventClass::Softirq, key)))
    }

    /// CPU tables printed after the global one in summary mode
    pub fn cpu_selection(&self) -> CpuSelection {
        if self.per_cpu {
            CpuSelection::All
        } else if let Some(cpu) = self.cpu {
            CpuSelection::Only(cpu)
        } else {
            CpuSelection::None
        }
    }
}
