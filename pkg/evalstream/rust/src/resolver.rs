// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Time window resolution.
//!
//! The resolver owns the session's single `TimeSpec` and the live "sync end"
//! anchor. It publishes three derived values over `watch` channels:
//!
//! - the request window (what to fetch),
//! - the filter window (what to show),
//! - a human representation of the interval.
//!
//! Each channel replays its current value to new subscribers and only
//! publishes values that differ from the previous one. State changes and
//! their broadcast happen under one lock, so every reader sees a consistent
//! sequence regardless of runtime flavor.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::duration::duration_to_string;
use crate::timespec::{FilterWindow, RequestWindow, SyncEndObserver, TimeSpec, secs_to_delta};

/// Lookback in seconds used when only an end is given.
pub const DEFAULT_LOOKBACK_SECS: u64 = 3600;

struct ResolverState {
    spec: TimeSpec,
    sync_end: DateTime<Utc>,
}

struct Inner {
    state: Mutex<ResolverState>,
    request_tx: watch::Sender<RequestWindow>,
    filter_tx: watch::Sender<FilterWindow>,
    representation_tx: watch::Sender<String>,
}

/// Shared handle to the session's time window resolver.
///
/// Cloning is cheap; all clones observe and mutate the same state.
#[derive(Clone)]
pub struct TimeWindowResolver {
    inner: Arc<Inner>,
}

impl TimeWindowResolver {
    /// Create a resolver whose sync end starts at the current time.
    pub fn new(spec: TimeSpec) -> Self {
        Self::with_sync_end(spec, Utc::now())
    }

    /// Create a resolver with an explicit initial sync end.
    pub fn with_sync_end(spec: TimeSpec, sync_end: DateTime<Utc>) -> Self {
        let spec = spec.normalized();
        let (request_tx, _) = watch::channel(resolve_request(&spec, sync_end));
        let (filter_tx, _) = watch::channel(resolve_filter(&spec, sync_end));
        let (representation_tx, _) = watch::channel(describe(&spec));
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ResolverState { spec, sync_end }),
                request_tx,
                filter_tx,
                representation_tx,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ResolverState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the time specification and republish every derived value.
    pub fn update(&self, spec: TimeSpec) {
        let spec = spec.normalized();
        let mut state = self.state();
        state.spec = spec;
        debug!(
            begin = ?spec.begin,
            end = ?spec.end,
            duration = ?spec.duration,
            stepsize = ?spec.stepsize,
            "time spec updated"
        );
        publish(&self.inner.request_tx, resolve_request(&spec, state.sync_end));
        publish(&self.inner.filter_tx, resolve_filter(&spec, state.sync_end));
        publish(&self.inner.representation_tx, describe(&spec));
    }

    pub fn time_spec(&self) -> TimeSpec {
        self.state().spec
    }

    pub fn sync_end(&self) -> DateTime<Utc> {
        self.state().sync_end
    }

    pub fn request_window(&self) -> RequestWindow {
        *self.inner.request_tx.borrow()
    }

    pub fn filter_window(&self) -> FilterWindow {
        *self.inner.filter_tx.borrow()
    }

    pub fn representation(&self) -> String {
        self.inner.representation_tx.borrow().clone()
    }

    pub fn subscribe_request(&self) -> watch::Receiver<RequestWindow> {
        self.inner.request_tx.subscribe()
    }

    pub fn subscribe_filter(&self) -> watch::Receiver<FilterWindow> {
        self.inner.filter_tx.subscribe()
    }

    pub fn subscribe_representation(&self) -> watch::Receiver<String> {
        self.inner.representation_tx.subscribe()
    }

    /// Current request window, then every change.
    pub fn request_windows(&self) -> WatchStream<RequestWindow> {
        WatchStream::new(self.subscribe_request())
    }

    /// Current filter window, then every change.
    pub fn filter_windows(&self) -> WatchStream<FilterWindow> {
        WatchStream::new(self.subscribe_filter())
    }

    /// Current representation, then every change.
    pub fn representations(&self) -> WatchStream<String> {
        WatchStream::new(self.subscribe_representation())
    }
}

impl SyncEndObserver for TimeWindowResolver {
    /// Advance the sync end if `timestamp` is later; never moves backwards.
    fn observe(&self, timestamp: DateTime<Utc>) {
        let mut state = self.state();
        if state.sync_end < timestamp {
            state.sync_end = timestamp;
            publish(&self.inner.filter_tx, resolve_filter(&state.spec, timestamp));
        }
    }
}

fn publish<T: PartialEq>(tx: &watch::Sender<T>, value: T) {
    tx.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    });
}

/// Resolve the window to request from the server.
pub fn resolve_request(spec: &TimeSpec, sync_end: DateTime<Utc>) -> RequestWindow {
    let duration = spec.duration_delta();
    let stepsize = spec.stepsize_delta();
    let (begin, end) = match (spec.begin, spec.end, duration) {
        (None, None, None) => (None, None),
        (None, None, Some(d)) => (Some(sub(sync_end, d)), None),
        (None, Some(end), None) => {
            let lookback = secs_to_delta(DEFAULT_LOOKBACK_SECS);
            (Some(sub(end, lookback)), Some(end))
        }
        (None, Some(end), Some(d)) => (Some(sub(end, d)), Some(end)),
        (Some(begin), None, None) => (Some(begin), None),
        (Some(begin), None, Some(d)) => (Some(begin), Some(add(begin, d))),
        (Some(begin), Some(end), _) => (Some(begin), Some(end)),
    };
    RequestWindow {
        begin,
        end,
        stepsize,
    }
}

/// Resolve the window applied to accumulated data.
pub fn resolve_filter(spec: &TimeSpec, sync_end: DateTime<Utc>) -> FilterWindow {
    match (spec.begin, spec.end, spec.duration_delta()) {
        (None, None, None) => FilterWindow::new(None, Some(sync_end)),
        (None, None, Some(d)) => FilterWindow::new(Some(sub(sync_end, d)), Some(sync_end)),
        (Some(begin), None, None) => FilterWindow::new(Some(begin), Some(sync_end)),
        (None, Some(_), _) | (Some(_), None, Some(_)) | (Some(_), Some(_), _) => {
            FilterWindow::inactive()
        }
    }
}

/// Human description of the interval covered by `spec`.
pub fn describe(spec: &TimeSpec) -> String {
    match (spec.begin, spec.end, spec.duration_secs()) {
        (None, None, None) => "all time".to_string(),
        (None, None, Some(secs)) => duration_to_string(secs),
        (None, Some(end), secs) => {
            let begin = sub(end, secs_to_delta(secs.unwrap_or(DEFAULT_LOOKBACK_SECS)));
            format!("{} - {}", format_instant(begin), format_instant(end))
        }
        (Some(begin), None, None) => format!("since {}", format_instant(begin)),
        (Some(begin), None, Some(secs)) => {
            let end = add(begin, secs_to_delta(secs));
            format!("{} - {}", format_instant(begin), format_instant(end))
        }
        (Some(begin), Some(end), _) => {
            format!("{} - {}", format_instant(begin), format_instant(end))
        }
    }
}

pub fn format_instant(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn sub(t: DateTime<Utc>, d: TimeDelta) -> DateTime<Utc> {
    t.checked_sub_signed(d).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn add(t: DateTime<Utc>, d: TimeDelta) -> DateTime<Utc> {
    t.checked_add_signed(d).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::at;
    use futures::StreamExt;

    const HOUR_MS: i64 = 3_600_000;

    fn spec(begin: Option<i64>, end: Option<i64>, duration: Option<u64>) -> TimeSpec {
        TimeSpec::new(begin.map(at), end.map(at), duration, None)
    }

    fn check(
        begin: Option<i64>,
        end: Option<i64>,
        duration: Option<u64>,
        request: (Option<i64>, Option<i64>),
        filter: (Option<i64>, Option<i64>),
    ) {
        let sync_end = at(100 * HOUR_MS);
        let resolver = TimeWindowResolver::with_sync_end(spec(begin, end, duration), sync_end);
        let r = resolver.request_window();
        let f = resolver.filter_window();
        assert_eq!((r.begin, r.end), (request.0.map(at), request.1.map(at)));
        assert_eq!((f.begin, f.end), (filter.0.map(at), filter.1.map(at)));
    }

    #[test]
    fn test_resolution_table() {
        let now = 100 * HOUR_MS;
        let b = 10 * HOUR_MS;
        let e = 50 * HOUR_MS;
        let d = 2 * 3600;
        let d_ms = 2 * HOUR_MS;

        check(None, None, None, (None, None), (None, Some(now)));
        check(None, None, Some(d), (Some(now - d_ms), None), (Some(now - d_ms), Some(now)));
        check(None, Some(e), None, (Some(e - HOUR_MS), Some(e)), (None, None));
        check(None, Some(e), Some(d), (Some(e - d_ms), Some(e)), (None, None));
        check(Some(b), None, None, (Some(b), None), (Some(b), Some(now)));
        check(Some(b), None, Some(d), (Some(b), Some(b + d_ms)), (None, None));
        check(Some(b), Some(e), None, (Some(b), Some(e)), (None, None));
        check(Some(b), Some(e), Some(d), (Some(b), Some(e)), (None, None));
    }

    #[test]
    fn test_stepsize_flows_through() {
        let resolver = TimeWindowResolver::with_sync_end(
            TimeSpec::new(None, None, None, Some(30)),
            at(0),
        );
        assert_eq!(resolver.request_window().stepsize, Some(TimeDelta::seconds(30)));
    }

    #[test]
    fn test_representation() {
        let b = at(0);
        let e = at(2 * HOUR_MS);
        let cases = [
            (spec(None, None, None), "all time".to_string()),
            (spec(None, None, Some(5400)), "1h 30m".to_string()),
            (
                spec(None, Some(2 * HOUR_MS), None),
                format!("{} - {}", format_instant(at(HOUR_MS)), format_instant(e)),
            ),
            (
                spec(None, Some(2 * HOUR_MS), Some(7200)),
                format!("{} - {}", format_instant(b), format_instant(e)),
            ),
            (spec(Some(0), None, None), format!("since {}", format_instant(b))),
            (
                spec(Some(0), None, Some(7200)),
                format!("{} - {}", format_instant(b), format_instant(e)),
            ),
            (
                spec(Some(0), Some(2 * HOUR_MS), None),
                format!("{} - {}", format_instant(b), format_instant(e)),
            ),
        ];
        for (spec, expected) in cases {
            assert_eq!(describe(&spec), expected, "{spec:?}");
        }
        assert_eq!(format_instant(b), "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_zero_duration_literal_means_all_time() {
        let zero = TimeSpec {
            duration: Some(0),
            stepsize: Some(0),
            ..Default::default()
        };
        assert_eq!(describe(&zero), "all time");
        assert_eq!(resolve_filter(&zero, at(5_000)), FilterWindow::new(None, Some(at(5_000))));

        let resolver = TimeWindowResolver::with_sync_end(spec(None, None, Some(60)), at(5_000));
        resolver.update(zero);
        assert_eq!(resolver.time_spec(), TimeSpec::default());
        assert_eq!(resolver.representation(), "all time");
        assert_eq!(resolver.request_window(), RequestWindow::default());
        assert!(!resolver.filter_window().is_active());
    }

    #[test]
    fn test_sync_end_monotonic() {
        let resolver = TimeWindowResolver::with_sync_end(spec(None, None, Some(60)), at(1_000));
        let filter = resolver.filter_window();

        filter.test(at(3_000), &resolver);
        assert_eq!(resolver.sync_end(), at(3_000));
        filter.test(at(2_000), &resolver);
        assert_eq!(resolver.sync_end(), at(3_000));
        filter.test(at(1_500), &resolver);
        assert_eq!(resolver.sync_end(), at(3_000));

        assert_eq!(resolver.filter_window().end, Some(at(3_000)));
        assert_eq!(resolver.filter_window().begin, Some(at(3_000 - 60_000)));
    }

    #[test]
    fn test_sync_end_does_not_move_request() {
        let resolver = TimeWindowResolver::with_sync_end(spec(None, None, Some(60)), at(1_000));
        let before = resolver.request_window();
        resolver.observe(at(50_000));
        assert_eq!(resolver.request_window(), before);
    }

    #[test]
    fn test_update_publishes_only_changes() {
        let resolver = TimeWindowResolver::with_sync_end(spec(Some(0), None, None), at(1_000));
        let mut request_rx = resolver.subscribe_request();
        let mut repr_rx = resolver.subscribe_representation();

        resolver.update(spec(Some(0), None, None));
        assert!(!request_rx.has_changed().unwrap());
        assert!(!repr_rx.has_changed().unwrap());

        resolver.update(spec(Some(0), None, Some(60)));
        assert!(request_rx.has_changed().unwrap());
        assert_eq!(request_rx.borrow_and_update().end, Some(at(60_000)));
        assert!(repr_rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_late_subscriber_replays_current() {
        let resolver = TimeWindowResolver::with_sync_end(TimeSpec::default(), at(0));
        resolver.update(spec(None, None, Some(3600)));

        let mut windows = resolver.request_windows();
        let first = windows.next().await.unwrap();
        assert_eq!(first.begin, Some(at(-HOUR_MS)));

        resolver.update(spec(Some(5), None, None));
        let second = windows.next().await.unwrap();
        assert_eq!(second.begin, Some(at(5)));

        let mut reprs = resolver.representations();
        assert_eq!(reprs.next().await.unwrap(), format!("since {}", format_instant(at(5))));
    }

    #[tokio::test]
    async fn test_filter_stream_sees_sync_end_advance() {
        let resolver = TimeWindowResolver::with_sync_end(spec(None, None, Some(1)), at(0));
        let mut filters = resolver.filter_windows();
        assert_eq!(filters.next().await.unwrap().end, Some(at(0)));

        resolver.observe(at(10_000));
        let advanced = filters.next().await.unwrap();
        assert_eq!(advanced.end, Some(at(10_000)));
        assert_eq!(advanced.begin, Some(at(9_000)));
    }
}
