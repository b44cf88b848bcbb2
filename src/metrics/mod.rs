//! Metric family registry
//!
//! Each monitored family (cpu, mem, disk) declares which raw sample keys it
//! needs, how the chart percentage is derived from them and how the text
//! after the chart bar is rendered.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::integrations::api::MetricSample;

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Samples of one family keyed by name
pub type SampleMap<'a> = HashMap<&'a str, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFamily {
    Cpu,
    Mem,
    Disk,
}

impl MetricFamily {
    /// Fetch and display order
    pub const ALL: [MetricFamily; 3] = [Self::Cpu, Self::Mem, Self::Disk];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Mem => "mem",
            Self::Disk => "disk",
        }
    }

    /// Label shown in front of the chart
    pub fn label(self) -> &'static str {
        match self {
            Self::Cpu => "CPU:",
            Self::Mem => "Memory:",
            Self::Disk => "Disk:",
        }
    }

    pub fn percent_key(self) -> &'static str {
        match self {
            Self::Cpu => CpuProfile::PERCENT_KEY,
            Self::Mem => MemProfile::PERCENT_KEY,
            Self::Disk => DiskProfile::PERCENT_KEY,
        }
    }

    pub fn display_keys(self) -> &'static [&'static str] {
        match self {
            Self::Cpu => CpuProfile::DISPLAY_KEYS,
            Self::Mem => MemProfile::DISPLAY_KEYS,
            Self::Disk => DiskProfile::DISPLAY_KEYS,
        }
    }

    /// Chart percentage in `[0, 100]`
    pub fn percent(self, samples: &SampleMap<'_>) -> Result<f64, MetricMissing> {
        match self {
            Self::Cpu => CpuProfile::percent(samples),
            Self::Mem => MemProfile::percent(samples),
            Self::Disk => DiskProfile::percent(samples),
        }
    }

    /// Text rendered after the chart bar
    pub fn display_text(self, samples: &SampleMap<'_>) -> Result<String, MetricMissing> {
        match self {
            Self::Cpu => CpuProfile::display_text(samples),
            Self::Mem => MemProfile::display_text(samples),
            Self::Disk => DiskProfile::display_text(samples),
        }
    }

    fn wants(self, name: &str) -> bool {
        self.percent_key() == name || self.display_keys().iter().any(|key| *key == name)
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sample the family needs was not part of the fetched snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("metric `{key}` missing from {family} samples")]
pub struct MetricMissing {
    pub family: MetricFamily,
    pub key: &'static str,
}

/// Index the samples a family cares about by name. Later duplicates win.
pub fn sample_map(family: MetricFamily, samples: &[MetricSample]) -> SampleMap<'_> {
    samples
        .iter()
        .filter(|s| family.wants(&s.name))
        .map(|s| (s.name.as_str(), s.value))
        .collect()
}

/// Static description of one metric family.
pub trait Profile {
    /// Converted display values, in template order
    type Display;

    const FAMILY: MetricFamily;
    const PERCENT_KEY: &'static str;
    const DISPLAY_KEYS: &'static [&'static str];

    /// Map the raw percent sample onto the chart scale
    fn normalize(raw: f64) -> f64;

    /// `values` holds one entry per `DISPLAY_KEYS`, in declared order
    fn convert(values: &[f64]) -> Self::Display;

    fn render(display: &Self::Display) -> String;

    fn percent(samples: &SampleMap<'_>) -> Result<f64, MetricMissing> {
        let raw = lookup(samples, Self::FAMILY, Self::PERCENT_KEY)?;
        Ok(Self::normalize(raw).clamp(0.0, 100.0))
    }

    fn display_text(samples: &SampleMap<'_>) -> Result<String, MetricMissing> {
        let values = Self::DISPLAY_KEYS
            .iter()
            .map(|key| lookup(samples, Self::FAMILY, key))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::render(&Self::convert(&values)))
    }
}

fn lookup(
    samples: &SampleMap<'_>,
    family: MetricFamily,
    key: &'static str,
) -> Result<f64, MetricMissing> {
    samples
        .get(key)
        .copied()
        .ok_or(MetricMissing { family, key })
}

pub struct CpuProfile;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuDisplay {
    pub user: f64,
    pub sys: f64,
    pub idle: f64,
}

impl Profile for CpuProfile {
    type Display = CpuDisplay;

    const FAMILY: MetricFamily = MetricFamily::Cpu;
    const PERCENT_KEY: &'static str = "cpu_idle";
    const DISPLAY_KEYS: &'static [&'static str] = &["cpu_user", "cpu_sys", "cpu_idle"];

    fn normalize(raw: f64) -> f64 {
        100.0 - raw
    }

    fn convert(values: &[f64]) -> CpuDisplay {
        CpuDisplay {
            user: values[0],
            sys: values[1],
            idle: values[2],
        }
    }

    fn render(d: &CpuDisplay) -> String {
        format!(
            "{:2.0}% user, {:.2}% sys, {:2.0}% idle",
            d.user, d.sys, d.idle
        )
    }
}

pub struct MemProfile;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemDisplay {
    pub used_mb: f64,
    pub free_mb: f64,
}

impl Profile for MemProfile {
    type Display = MemDisplay;

    const FAMILY: MetricFamily = MetricFamily::Mem;
    const PERCENT_KEY: &'static str = "mem_percent_used";
    const DISPLAY_KEYS: &'static [&'static str] = &["mem_used", "mem_free"];

    fn normalize(raw: f64) -> f64 {
        raw
    }

    fn convert(values: &[f64]) -> MemDisplay {
        MemDisplay {
            used_mb: values[0] / MIB,
            free_mb: values[1] / MIB,
        }
    }

    fn render(d: &MemDisplay) -> String {
        format!("{:.2}MB used, {:.2}MB free", d.used_mb, d.free_mb)
    }
}

pub struct DiskProfile;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskDisplay {
    pub free_gb: f64,
    pub total_gb: f64,
}

impl Profile for DiskProfile {
    type Display = DiskDisplay;

    const FAMILY: MetricFamily = MetricFamily::Disk;
    const PERCENT_KEY: &'static str = "capacity";
    const DISPLAY_KEYS: &'static [&'static str] = &["bsize", "bfree", "blocks"];

    fn normalize(raw: f64) -> f64 {
        raw
    }

    fn convert(values: &[f64]) -> DiskDisplay {
        let block_size = values[0];
        DiskDisplay {
            free_gb: values[1] * block_size / GIB,
            total_gb: values[2] * block_size / GIB,
        }
    }

    fn render(d: &DiskDisplay) -> String {
        format!("{:.2}GB free, {:.2}GB total", d.free_gb, d.total_gb)
    }
}
