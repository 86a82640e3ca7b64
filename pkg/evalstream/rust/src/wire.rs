// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Request and response formats of the evaluation and validation endpoints.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::dataset::{DataSet, DataSetLine};
use crate::error::{Error, Result};
use crate::timespec::RequestWindow;

/// Labeled query expressions, label -> expression text.
pub type Expressions = BTreeMap<String, String>;

/// Server-side long-poll budget sent with every evaluation request.
pub const LONG_POLL_DELAY: Duration = Duration::from_millis(3000);

/// Continuation state returned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub begin: DateTime<Utc>,
    pub cookie: Option<String>,
    pub iter: Option<String>,
}

/// One evaluation request.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalQuery {
    pub exprs: Expressions,
    pub window: RequestWindow,
    pub delay: Duration,
    pub cursor: Option<Cursor>,
}

impl EvalQuery {
    pub fn new(exprs: Expressions, window: RequestWindow) -> Self {
        Self {
            exprs,
            window,
            delay: LONG_POLL_DELAY,
            cursor: None,
        }
    }

    /// Move the query forward to continue after `chunk`.
    pub fn advance(&mut self, chunk: &EvalChunk) {
        self.cursor = Some(Cursor {
            begin: chunk.new_begin,
            cookie: chunk.cookie.clone(),
            iter: chunk.iter.clone(),
        });
    }

    /// Query parameters, in a stable order.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .exprs
            .iter()
            .map(|(label, expr)| (format!("expr:{label}"), expr.clone()))
            .collect();

        let mut window = self.window;
        if let Some(cursor) = &self.cursor {
            window.begin = Some(cursor.begin);
        }
        params.extend(window.params().into_iter().map(|(k, v)| (k.to_string(), v)));
        params.push(("delay".to_string(), self.delay.as_millis().to_string()));

        if let Some(cursor) = &self.cursor {
            if let Some(cookie) = &cursor.cookie {
                params.push(("cookie".to_string(), cookie.clone()));
            }
            if let Some(iter) = &cursor.iter {
                params.push(("iter".to_string(), iter.clone()));
            }
        }
        params
    }
}

/// A decoded page of evaluation results.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalChunk {
    pub data: DataSet,
    pub new_begin: DateTime<Utc>,
    pub cookie: Option<String>,
    pub iter: Option<String>,
    pub last: bool,
}

/// Raw body of an evaluation response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalIterResponse {
    #[serde(default)]
    pub data: Vec<EvalLine>,
    pub new_begin: i64,
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default)]
    pub iter: Option<String>,
    #[serde(default)]
    pub last: bool,
}

#[derive(Debug, Deserialize)]
pub struct EvalLine {
    pub timestamp_msec: i64,
    #[serde(default)]
    pub metrics: TaggedMetrics,
}

#[derive(Debug, Deserialize)]
pub struct MetricValue {
    pub name_tags: String,
    pub value: f64,
}

/// The `metrics` object of a line, keeping document order of its tags.
#[derive(Debug, Default)]
pub struct TaggedMetrics(pub Vec<(String, Vec<MetricValue>)>);

impl<'de> Deserialize<'de> for TaggedMetrics {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TaggedMetricsVisitor;

        impl<'de> Visitor<'de> for TaggedMetricsVisitor {
            type Value = TaggedMetrics;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of tag to metric list")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((tag, metrics)) = map.next_entry::<String, Vec<MetricValue>>()? {
                    entries.push((tag, metrics));
                }
                Ok(TaggedMetrics(entries))
            }
        }

        deserializer.deserialize_map(TaggedMetricsVisitor)
    }
}

pub(crate) fn instant_from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(Error::InvalidTimestamp(ms))
}

impl TryFrom<EvalIterResponse> for EvalChunk {
    type Error = Error;

    fn try_from(resp: EvalIterResponse) -> Result<Self> {
        let mut order = Vec::new();
        let mut lines = Vec::with_capacity(resp.data.len());
        for line in resp.data {
            let mut out = DataSetLine::new(instant_from_millis(line.timestamp_msec)?);
            for (_tag, metrics) in line.metrics.0 {
                for metric in metrics {
                    order.push(metric.name_tags.clone());
                    out.values.insert(metric.name_tags, metric.value);
                }
            }
            lines.push(out);
        }

        Ok(EvalChunk {
            data: DataSet::from_lines(lines, &order),
            new_begin: instant_from_millis(resp.new_begin)?,
            cookie: resp.cookie,
            iter: resp.iter,
            last: resp.last,
        })
    }
}

/// Decode a raw evaluation response body.
pub fn decode_chunk(body: &[u8]) -> Result<EvalChunk> {
    let resp: EvalIterResponse = serde_json::from_slice(body)?;
    EvalChunk::try_from(resp)
}

/// Result of the expression validation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Validation {
    pub ok: bool,
    #[serde(default)]
    pub normalized_query: Option<String>,
    #[serde(default)]
    pub parse_errors: Vec<String>,
}
