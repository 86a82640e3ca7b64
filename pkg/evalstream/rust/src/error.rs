// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

/// Errors surfaced by the evaluation engine.
///
/// Transport-family errors (`Transport`, `Status`, `Decode`, `InvalidTimestamp`)
/// terminate the stream that hit them and nothing else.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("timestamp out of range: {0} ms")]
    InvalidTimestamp(i64),

    #[error("invalid duration string: {0:?}")]
    InvalidDurationString(String),
}

impl Error {
    /// True for errors raised while talking to the evaluation server.
    pub fn is_transport(&self) -> bool {
        !matches!(self, Error::InvalidDurationString(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
