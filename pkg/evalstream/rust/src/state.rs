// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Constructed, no request issued yet.
    Created,
    /// A request is outstanding.
    Fetching,
    /// The server sent its last page.
    Completed,
    /// A request failed; the error was delivered to the consumer.
    Failed,
    /// The consumer detached.
    Cancelled,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Failed | StreamState::Cancelled
        )
    }

    pub(crate) fn can_transition_to(self, next: StreamState) -> bool {
        use StreamState::*;
        matches!(
            (self, next),
            (Created, Fetching)
                | (Created, Cancelled)
                | (Fetching, Fetching)
                | (Fetching, Completed)
                | (Fetching, Failed)
                | (Fetching, Cancelled)
        )
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Created => write!(f, "created"),
            StreamState::Fetching => write!(f, "fetching"),
            StreamState::Completed => write!(f, "completed"),
            StreamState::Failed => write!(f, "failed"),
            StreamState::Cancelled => write!(f, "cancelled"),
        }
    }
}
