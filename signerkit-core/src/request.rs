//! Thin HTTP wrapper shared by all node calls: per-request timeout and a
//! versioned User-Agent, no retries.

use std::time::Duration;

use serde::Serialize;

use crate::error::SignerError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Request {
    client: reqwest::Client,
}

impl Request {
    pub(crate) fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub(crate) async fn post<T>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, SignerError>
    where
        T: Serialize + Sync,
    {
        Ok(self
            .client
            .post(url)
            .timeout(REQUEST_TIMEOUT)
            .header(reqwest::header::USER_AGENT, user_agent())
            .json(body)
            .send()
            .await?)
    }

    pub(crate) async fn get(&self, url: &str) -> Result<reqwest::Response, SignerError> {
        Ok(self
            .client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .header(reqwest::header::USER_AGENT, user_agent())
            .send()
            .await?)
    }
}

fn user_agent() -> String {
    format!("signerkit-core/{}", env!("CARGO_PKG_VERSION"))
}
