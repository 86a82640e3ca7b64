// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Paginated evaluation loop.
//!
//! An `EvaluationStream` issues one request at a time against the evaluation
//! endpoint, merges every page into its buffer, trims the buffer with the
//! resolver's live filter window and hands a copy to the consumer. The loop
//! runs until the server marks a page as last, a request fails, or the
//! consumer cancels.
//!
//! Cancellation never aborts a dispatched request. Its response is dropped on
//! arrival and the buffer is not touched again.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::dataset::DataSet;
use crate::error::Result;
use crate::resolver::TimeWindowResolver;
use crate::state::StreamState;
use crate::timespec::{FilterWindow, RequestWindow};
use crate::transport::EvalTransport;
use crate::wire::{EvalQuery, Expressions};

pub struct EvaluationStream<T> {
    transport: Arc<T>,
    resolver: TimeWindowResolver,
    query: EvalQuery,
    in_flight: DataSet,
}

impl<T: EvalTransport> EvaluationStream<T> {
    /// Stream `exprs` over the resolver's current request window.
    pub fn new(transport: Arc<T>, resolver: TimeWindowResolver, exprs: Expressions) -> Self {
        let window = resolver.request_window();
        Self::with_window(transport, resolver, exprs, window)
    }

    pub fn with_window(
        transport: Arc<T>,
        resolver: TimeWindowResolver,
        exprs: Expressions,
        window: RequestWindow,
    ) -> Self {
        Self {
            transport,
            resolver,
            query: EvalQuery::new(exprs, window),
            in_flight: DataSet::new(),
        }
    }

    /// Start fetching. The returned stream yields a snapshot after every page.
    pub fn begin(self) -> Snapshots {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(StreamState::Created);
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(self.run(tx, stop_rx, state_tx));
        Snapshots {
            rx,
            stop: stop_tx,
            state: state_rx,
        }
    }

    async fn run(
        self,
        tx: mpsc::UnboundedSender<Result<DataSet>>,
        mut stop_rx: watch::Receiver<bool>,
        state: watch::Sender<StreamState>,
    ) {
        let EvaluationStream {
            transport,
            resolver,
            mut query,
            mut in_flight,
        } = self;
        let mut filter_rx = resolver.subscribe_filter();
        let mut filter_open = true;
        let mut pages: u64 = 0;

        loop {
            if *stop_rx.borrow() {
                transition(&state, StreamState::Cancelled);
                return;
            }
            transition(&state, StreamState::Fetching);

            let mut cancelled = false;
            let result = {
                let fetch = transport.fetch(&query);
                tokio::pin!(fetch);
                loop {
                    tokio::select! {
                        biased;
                        result = &mut fetch => break result,
                        _ = stop_rx.changed(), if !cancelled => {
                            // Release the buffer; only the dispatched request
                            // is still awaited, and its response is dropped.
                            cancelled = true;
                            drop(std::mem::take(&mut in_flight));
                            debug!(pages, "cancelled with a request in flight");
                        }
                        changed = filter_rx.changed(), if filter_open && !cancelled => {
                            if changed.is_err() {
                                filter_open = false;
                                continue;
                            }
                            if *stop_rx.borrow() {
                                continue;
                            }
                            let filter = *filter_rx.borrow_and_update();
                            if apply_filter(&mut in_flight, &filter, &resolver) {
                                debug!(lines = in_flight.len(), "filter window moved, re-emitting");
                                let _ = tx.send(Ok(in_flight.clone()));
                            }
                        }
                    }
                }
            };

            if cancelled || *stop_rx.borrow() {
                debug!(pages, "discarding response for cancelled stream");
                transition(&state, StreamState::Cancelled);
                return;
            }

            let chunk = match result {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(error = %err, pages, "evaluation request failed");
                    transition(&state, StreamState::Failed);
                    let _ = tx.send(Err(err));
                    return;
                }
            };

            pages += 1;
            let last = chunk.last;
            query.advance(&chunk);
            in_flight.merge(chunk.data);
            let filter = *filter_rx.borrow_and_update();
            apply_filter(&mut in_flight, &filter, &resolver);
            debug!(
                pages,
                lines = in_flight.len(),
                series = in_flight.headers().len(),
                last,
                "merged evaluation page"
            );

            if last {
                info!(pages, lines = in_flight.len(), "evaluation complete");
                transition(&state, StreamState::Completed);
                let _ = tx.send(Ok(in_flight));
                return;
            }
            if tx.send(Ok(in_flight.clone())).is_err() {
                transition(&state, StreamState::Cancelled);
                return;
            }
        }
    }
}

/// Trim `data` with `filter` if it is active. Returns true if lines were dropped.
fn apply_filter(data: &mut DataSet, filter: &FilterWindow, resolver: &TimeWindowResolver) -> bool {
    if !filter.is_active() {
        return false;
    }
    let before = data.len();
    data.retain_if(|line| filter.test(line.timestamp, resolver));
    data.len() != before
}

fn transition(state: &watch::Sender<StreamState>, next: StreamState) {
    state.send_if_modified(|current| {
        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "ignoring invalid stream transition");
            return false;
        }
        *current = next;
        true
    });
}

/// Live sequence of snapshots from an `EvaluationStream`.
///
/// Dropping it cancels the stream.
pub struct Snapshots {
    rx: mpsc::UnboundedReceiver<Result<DataSet>>,
    stop: watch::Sender<bool>,
    state: watch::Receiver<StreamState>,
}

impl Snapshots {
    /// Stop the stream. No further request is issued and the response to an
    /// outstanding one is discarded. Snapshots already delivered stay readable.
    pub fn cancel(&mut self) {
        self.stop.send_replace(true);
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.stop.borrow()
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    pub fn states(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }
}

impl Stream for Snapshots {
    type Item = Result<DataSet>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Snapshots {
    fn drop(&mut self) {
        self.stop.send_replace(true);
    }
}
