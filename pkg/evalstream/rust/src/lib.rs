// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Incremental evaluation streaming for time-series metric dashboards.
//!
//! ## Architecture
//!
//! 1. **Time windows** (`resolver` module) - Turns the user's begin / end /
//!    duration / stepsize into a request window and a filter window, both
//!    anchored to a live "sync end" that advances as newer data arrives.
//!
//! 2. **Evaluation streams** (`stream` module) - Fetches pages from the
//!    evaluation endpoint one at a time, merges them into a `DataSet` and
//!    emits a snapshot after each page until the server reports the last one.
//!
//! 3. **Service** (`service` module) - Restarts streams whenever the
//!    expressions or the request window change.
//!
//! The `evalwatch` binary wires these to an HTTP transport and renders the
//! latest snapshot as a table:
//!
//! ```bash
//! evalwatch --api-url http://localhost:9998/api/monsoon \
//!   --expr cpu='avg(system.cpu.user)' \
//!   --duration '1h' --stepsize '10s'
//! ```

pub mod config;
pub mod dataset;
pub mod duration;
pub mod error;
pub mod render;
pub mod resolver;
pub mod service;
pub mod state;
pub mod stream;
pub mod timespec;
pub mod transport;
pub mod wire;

pub use dataset::{DataSet, DataSetLine};
pub use error::{Error, Result};
pub use resolver::TimeWindowResolver;
pub use service::EvaluationService;
pub use state::StreamState;
pub use stream::{EvaluationStream, Snapshots};
pub use timespec::{FilterWindow, RequestWindow, SyncEndObserver, TimeSpec};
pub use transport::{EvalTransport, HttpTransport};
pub use wire::{EvalChunk, EvalQuery, Expressions};
