// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Human duration strings such as `"1d 2h 30m"`.
//!
//! Durations are whole seconds. Parsing happens at the input boundary (config
//! file, command line); the resolver only ever sees parsed values.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[0-9]+[dhms](?:\s+[0-9]+[dhms])*\s*$").expect("duration pattern compiles")
});

static COMPONENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)([dhms])").expect("component pattern compiles"));

/// Test if the string is a valid duration.
pub fn valid_duration_string(s: &str) -> bool {
    DURATION_RE.is_match(s)
}

/// Render seconds as a duration string, omitting zero components.
pub fn duration_to_string(secs: u64) -> String {
    let days = secs / SECS_PER_DAY;
    let hours = secs % SECS_PER_DAY / SECS_PER_HOUR;
    let minutes = secs % SECS_PER_HOUR / SECS_PER_MINUTE;
    let seconds = secs % SECS_PER_MINUTE;

    let mut parts = Vec::with_capacity(4);
    if days != 0 {
        parts.push(format!("{days}d"));
    }
    if hours != 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes != 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds != 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

/// Parse a duration string into seconds.
pub fn duration_from_string(s: &str) -> Result<u64> {
    if !valid_duration_string(s) {
        return Err(Error::InvalidDurationString(s.to_string()));
    }

    let invalid = || Error::InvalidDurationString(s.to_string());
    let mut total: u64 = 0;
    for caps in COMPONENT_RE.captures_iter(s) {
        let count: u64 = caps[1].parse().map_err(|_| invalid())?;
        let unit = match &caps[2] {
            "d" => SECS_PER_DAY,
            "h" => SECS_PER_HOUR,
            "m" => SECS_PER_MINUTE,
            _ => 1,
        };
        total = count
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(invalid)?;
    }
    Ok(total)
}
