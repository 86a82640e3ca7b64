// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Transport seam between evaluation streams and the server.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::wire::{EvalChunk, EvalQuery, Validation, decode_chunk};

/// Path of the paginated evaluation endpoint, relative to the API base URL.
pub const EVAL_ITER_PATH: &str = "/eval/iter";

/// Path of the expression validation endpoint, relative to the API base URL.
pub const VALIDATE_PATH: &str = "/validate";

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:9998/api/monsoon";

/// Client timeout; comfortably above the server long-poll budget.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches one page of evaluation results.
pub trait EvalTransport: Send + Sync + 'static {
    fn fetch(&self, query: &EvalQuery) -> impl Future<Output = Result<EvalChunk>> + Send;
}

/// HTTP client for the evaluation API.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new client with the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server whether `expr` parses.
    pub async fn validate(&self, expr: &str) -> Result<Validation> {
        let url = format!("{}{}", self.base_url, VALIDATE_PATH);
        let body = self.get(&url, &[("expr".to_string(), expr.to_string())]).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<Vec<u8>> {
        let resp = self.client.get(url).query(params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

impl EvalTransport for HttpTransport {
    async fn fetch(&self, query: &EvalQuery) -> Result<EvalChunk> {
        let url = format!("{}{}", self.base_url, EVAL_ITER_PATH);
        let params = query.params();
        debug!(url = %url, continuation = query.cursor.is_some(), "fetching evaluation page");
        let body = self.get(&url, &params).await?;
        decode_chunk(&body)
    }
}
