// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Evaluation of a live expression set over the live request window.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::dataset::DataSet;
use crate::error::Result;
use crate::resolver::TimeWindowResolver;
use crate::stream::{EvaluationStream, Snapshots};
use crate::transport::EvalTransport;
use crate::wire::Expressions;

/// Creates evaluation streams against one transport and one resolver.
///
/// One service exists per session; charts share it.
pub struct EvaluationService<T> {
    transport: Arc<T>,
    resolver: TimeWindowResolver,
}

impl<T: EvalTransport> EvaluationService<T> {
    pub fn new(transport: Arc<T>, resolver: TimeWindowResolver) -> Self {
        Self {
            transport,
            resolver,
        }
    }

    pub fn resolver(&self) -> &TimeWindowResolver {
        &self.resolver
    }

    /// One stream over the current request window.
    pub fn stream(&self, exprs: Expressions) -> Snapshots {
        EvaluationStream::new(Arc::clone(&self.transport), self.resolver.clone(), exprs).begin()
    }

    /// Evaluate the latest expressions over the latest request window.
    ///
    /// Whenever either changes, the running stream is cancelled and a fresh
    /// one starts. Dropping the returned stream stops everything.
    pub fn evaluate(
        &self,
        exprs: watch::Receiver<Expressions>,
    ) -> UnboundedReceiverStream<Result<DataSet>> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(switch_streams(
            Arc::clone(&self.transport),
            self.resolver.clone(),
            exprs,
            tx,
        ));
        UnboundedReceiverStream::new(rx)
    }
}

async fn switch_streams<T: EvalTransport>(
    transport: Arc<T>,
    resolver: TimeWindowResolver,
    mut exprs_rx: watch::Receiver<Expressions>,
    tx: mpsc::UnboundedSender<Result<DataSet>>,
) {
    let mut request_rx = resolver.subscribe_request();
    let mut exprs_open = true;

    loop {
        let window = *request_rx.borrow_and_update();
        let exprs = exprs_rx.borrow_and_update().clone();
        let mut current = if exprs.is_empty() {
            debug!("no expressions, waiting for changes");
            None
        } else {
            debug!(
                expressions = exprs.len(),
                begin = ?window.begin,
                end = ?window.end,
                "starting evaluation stream"
            );
            Some(
                EvaluationStream::with_window(
                    Arc::clone(&transport),
                    resolver.clone(),
                    exprs,
                    window,
                )
                .begin(),
            )
        };

        loop {
            tokio::select! {
                item = next_snapshot(&mut current) => match item {
                    Some(item) => {
                        if tx.send(item).is_err() {
                            return;
                        }
                    }
                    None => current = None,
                },
                changed = request_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
                changed = exprs_rx.changed(), if exprs_open => {
                    if changed.is_err() {
                        exprs_open = false;
                        continue;
                    }
                    break;
                }
                _ = tx.closed() => return,
            }
        }
        // The superseded stream is cancelled when `current` drops here.
    }
}

async fn next_snapshot(current: &mut Option<Snapshots>) -> Option<Result<DataSet>> {
    match current {
        Some(snapshots) => snapshots.next().await,
        None => std::future::pending().await,
    }
}
