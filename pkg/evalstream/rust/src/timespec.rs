// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! User time specification and the two windows derived from it.

use chrono::{DateTime, TimeDelta, Utc};

/// User-supplied time specification. Every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeSpec {
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Seconds.
    pub duration: Option<u64>,
    /// Seconds.
    pub stepsize: Option<u64>,
}

impl TimeSpec {
    /// A zero duration or stepsize counts as unspecified.
    pub fn new(
        begin: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        duration: Option<u64>,
        stepsize: Option<u64>,
    ) -> Self {
        Self {
            begin,
            end,
            duration: duration.filter(|&d| d != 0),
            stepsize: stepsize.filter(|&s| s != 0),
        }
    }

    /// Same spec with zero durations cleared; for values built field by field.
    pub fn normalized(self) -> Self {
        Self::new(self.begin, self.end, self.duration, self.stepsize)
    }

    /// Duration in seconds; zero counts as unset.
    pub fn duration_secs(&self) -> Option<u64> {
        self.duration.filter(|&d| d != 0)
    }

    pub fn duration_delta(&self) -> Option<TimeDelta> {
        self.duration_secs().map(secs_to_delta)
    }

    pub fn stepsize_delta(&self) -> Option<TimeDelta> {
        self.stepsize.filter(|&s| s != 0).map(secs_to_delta)
    }
}

pub(crate) fn secs_to_delta(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// What to ask the evaluation server for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestWindow {
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub stepsize: Option<TimeDelta>,
}

impl RequestWindow {
    /// Query parameters in epoch milliseconds; absent fields are omitted.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if let Some(begin) = self.begin {
            params.push(("begin", begin.timestamp_millis().to_string()));
        }
        if let Some(end) = self.end {
            params.push(("end", end.timestamp_millis().to_string()));
        }
        if let Some(stepsize) = self.stepsize {
            params.push(("stepsize", stepsize.num_milliseconds().to_string()));
        }
        params
    }
}

/// Receives timestamps observed past a filter window's end.
pub trait SyncEndObserver {
    fn observe(&self, timestamp: DateTime<Utc>);
}

/// What to display. Applied retroactively to accumulated data when active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterWindow {
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl FilterWindow {
    pub fn new(begin: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { begin, end }
    }

    /// A pass-through filter.
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.begin.is_some() && self.end.is_some()
    }

    /// True iff `timestamp` is to be kept.
    ///
    /// A timestamp beyond `end` is reported to `observer` so the live end
    /// anchor can move forward.
    pub fn test<O>(&self, timestamp: DateTime<Utc>, observer: &O) -> bool
    where
        O: SyncEndObserver + ?Sized,
    {
        if self.end.is_some_and(|end| end < timestamp) {
            observer.observe(timestamp);
        }
        self.begin.is_none_or(|begin| begin <= timestamp)
    }
}
