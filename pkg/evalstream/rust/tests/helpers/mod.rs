// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use evalstream::{DataSet, DataSetLine, EvalChunk, EvalQuery, EvalTransport, Expressions, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

pub fn exprs(pairs: &[(&str, &str)]) -> Expressions {
    pairs
        .iter()
        .map(|(label, query)| (label.to_string(), query.to_string()))
        .collect()
}

/// A page whose lines carry the given `(series, value)` pairs. The cursor
/// strings are derived from `new_begin` so continuations can be checked.
pub fn page(rows: Vec<(i64, Vec<(&str, f64)>)>, new_begin: i64, last: bool) -> EvalChunk {
    let mut order = Vec::new();
    let lines = rows
        .into_iter()
        .map(|(ms, values)| {
            let mut line = DataSetLine::new(at(ms));
            for (id, v) in values {
                order.push(id.to_string());
                line.values.insert(id.to_string(), v);
            }
            line
        })
        .collect();
    EvalChunk {
        data: DataSet::from_lines(lines, &order),
        new_begin: at(new_begin),
        cookie: Some(format!("cookie-{new_begin}")),
        iter: Some(format!("iter-{new_begin}")),
        last,
    }
}

pub fn timestamps(data: &DataSet) -> Vec<i64> {
    data.lines()
        .iter()
        .map(|l| l.timestamp.timestamp_millis())
        .collect()
}

/// Await `fut`, panicking if it takes longer than `DEFAULT_TIMEOUT`.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(DEFAULT_TIMEOUT, fut)
        .await
        .expect("timed out")
}

/// Replies to requests from a fixed script. Once the script runs out, every
/// further request stays pending.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<EvalChunk>>>,
    queries: Mutex<Vec<EvalQuery>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<EvalChunk>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<EvalQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl EvalTransport for ScriptedTransport {
    async fn fetch(&self, query: &EvalQuery) -> Result<EvalChunk> {
        self.queries.lock().unwrap().push(query.clone());
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

/// A request waiting for the test to answer it.
pub struct PendingFetch {
    pub query: EvalQuery,
    respond: oneshot::Sender<Result<EvalChunk>>,
}

impl PendingFetch {
    pub fn respond(self, result: Result<EvalChunk>) {
        let _ = self.respond.send(result);
    }
}

/// Hands every request to the test, which decides when and how to answer.
pub struct ManualTransport {
    requests: mpsc::UnboundedSender<PendingFetch>,
}

impl ManualTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingFetch>) {
        let (requests, rx) = mpsc::unbounded_channel();
        (Self { requests }, rx)
    }
}

impl EvalTransport for ManualTransport {
    async fn fetch(&self, query: &EvalQuery) -> Result<EvalChunk> {
        let (respond, rx) = oneshot::channel();
        let pending = PendingFetch {
            query: query.clone(),
            respond,
        };
        if self.requests.send(pending).is_err() {
            return std::future::pending().await;
        }
        match rx.await {
            Ok(result) => result,
            Err(_) => std::future::pending().await,
        }
    }
}
