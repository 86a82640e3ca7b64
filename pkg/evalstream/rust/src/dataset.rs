// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Accumulated evaluation results.
//!
//! A `DataSet` only grows through `merge` and only shrinks through
//! `retain_if`. Lines keep append order; headers keep first-seen order.

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};

/// One scrape: a timestamp and the value of every series present at it.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetLine {
    pub timestamp: DateTime<Utc>,
    pub values: FxHashMap<String, f64>,
}

impl DataSetLine {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            values: FxHashMap::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    headers: Vec<String>,
    lines: Vec<DataSetLine>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a data set from lines, deriving headers in first-seen order.
    ///
    /// `ordered_ids` lists series ids in the order they were encountered; ids
    /// that do not occur in any line are ignored.
    pub fn from_lines(lines: Vec<DataSetLine>, ordered_ids: &[String]) -> Self {
        let mut ds = Self {
            headers: Vec::new(),
            lines,
        };
        let present: FxHashSet<&str> = ds
            .lines
            .iter()
            .flat_map(|l| l.values.keys().map(String::as_str))
            .collect();
        let mut seen = FxHashSet::default();
        let headers = ordered_ids
            .iter()
            .filter(|id| present.contains(id.as_str()) && seen.insert(id.as_str()))
            .cloned()
            .collect();
        ds.headers = headers;
        ds
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn lines(&self) -> &[DataSetLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.lines.last().map(|l| l.timestamp)
    }

    /// Value of series `header` on line `index`, if present.
    pub fn value(&self, index: usize, header: &str) -> Option<f64> {
        self.lines.get(index)?.values.get(header).copied()
    }

    /// Append `other`'s lines and union its headers, never removing any.
    pub fn merge(&mut self, other: DataSet) -> &mut Self {
        for header in other.headers {
            if !self.headers.contains(&header) {
                self.headers.push(header);
            }
        }
        self.lines.extend(other.lines);
        self
    }

    /// Drop lines failing `keep`, then recompute headers from what remains.
    pub fn retain_if<F>(&mut self, mut keep: F) -> &mut Self
    where
        F: FnMut(&DataSetLine) -> bool,
    {
        self.lines.retain(|line| keep(line));
        let present: FxHashSet<&str> = self
            .lines
            .iter()
            .flat_map(|l| l.values.keys().map(String::as_str))
            .collect();
        self.headers.retain(|h| present.contains(h.as_str()));
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    pub(crate) fn chunk(rows: &[(i64, &[(&str, f64)])]) -> DataSet {
        let mut order = Vec::new();
        let lines = rows
            .iter()
            .map(|(ms, values)| {
                let mut line = DataSetLine::new(at(*ms));
                for (id, v) in values.iter() {
                    order.push(id.to_string());
                    line.values.insert(id.to_string(), *v);
                }
                line
            })
            .collect();
        DataSet::from_lines(lines, &order)
    }

    #[test]
    fn test_from_lines_first_seen_order() {
        let ds = chunk(&[(1, &[("b", 1.0), ("a", 2.0)]), (2, &[("c", 3.0), ("a", 4.0)])]);
        assert_eq!(ds.headers(), ["b", "a", "c"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(1, "a"), Some(4.0));
        assert_eq!(ds.value(0, "c"), None);
    }

    #[test]
    fn test_merge_appends_in_order() {
        let c1 = chunk(&[(1, &[("x", 1.0)])]);
        let c2 = chunk(&[(2, &[("y", 2.0)]), (3, &[("x", 3.0)])]);
        let c3 = chunk(&[(4, &[("z", 4.0), ("y", 5.0)])]);

        let mut ds = DataSet::new();
        ds.merge(c1.clone()).merge(c2.clone()).merge(c3.clone());

        let expected: Vec<_> = c1
            .lines()
            .iter()
            .chain(c2.lines())
            .chain(c3.lines())
            .cloned()
            .collect();
        assert_eq!(ds.lines(), expected.as_slice());
        assert_eq!(ds.headers(), ["x", "y", "z"]);
        assert_eq!(ds.last_timestamp(), Some(at(4)));
    }

    #[test]
    fn test_merge_never_drops_headers() {
        let mut ds = chunk(&[(1, &[("x", 1.0)])]);
        ds.merge(DataSet::new());
        assert_eq!(ds.headers(), ["x"]);
    }

    #[test]
    fn test_retain_rebuilds_headers() {
        let mut ds = chunk(&[(1, &[("old", 1.0)]), (5, &[("new", 2.0)]), (9, &[("new", 3.0)])]);
        ds.retain_if(|l| l.timestamp >= at(5));
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.headers(), ["new"]);
    }

    #[test]
    fn test_retain_idempotent() {
        let mut once = chunk(&[(1, &[("a", 1.0)]), (2, &[("b", 2.0)]), (3, &[("a", 3.0)])]);
        let keep = |l: &DataSetLine| l.timestamp != at(2);
        once.retain_if(keep);
        let mut twice = once.clone();
        twice.retain_if(keep);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut ds = chunk(&[(1, &[("a", 1.0)])]);
        let snapshot = ds.clone();
        ds.merge(chunk(&[(2, &[("b", 2.0)])]));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.headers(), ["a"]);
    }
}
