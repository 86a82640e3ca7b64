// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

use crate::duration::duration_from_string;
use crate::timespec::TimeSpec;
use crate::wire::Expressions;

/// A dashboard definition loaded from YAML.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardConfig {
    pub api_url: Option<String>,
    #[serde(default)]
    pub expressions: Expressions,
    #[serde(default)]
    pub time: TimeConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TimeConfig {
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration: Option<String>,
    pub stepsize: Option<String>,
}

impl TimeConfig {
    /// Duration strings that do not parse are treated as absent.
    pub fn to_time_spec(&self) -> TimeSpec {
        TimeSpec::new(
            self.begin,
            self.end,
            parse_duration_field("duration", self.duration.as_deref()),
            parse_duration_field("stepsize", self.stepsize.as_deref()),
        )
    }
}

fn parse_duration_field(field: &str, value: Option<&str>) -> Option<u64> {
    let value = value?;
    match duration_from_string(value) {
        Ok(secs) => Some(secs),
        Err(e) => {
            warn!(field, value, "ignoring time field: {e}");
            None
        }
    }
}

pub fn load_config(path: &Path) -> Result<DashboardConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: DashboardConfig =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}
