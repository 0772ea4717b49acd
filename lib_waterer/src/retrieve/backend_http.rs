//! `reqwest` implementation of [`Transport`] against the waterer backend.
//!
//! One client instance is shared across all pollers to reuse the connection
//! pool. Every request carries a timeout so a hung backend turns into a
//! failed tick instead of a stalled poller.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::Url;

use crate::error::{Error, Result};
use crate::model::{Envelope, PumpSettings, StatusHistory};
use crate::retrieve::Transport;

const REQUEST_TIMEOUT_SECS: u64 = 10;

pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Builds a client for the given backend base URL, e.g.
    /// `http://127.0.0.1:5000/`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(Error::transport)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("waterer-dash/0.1")
            .build()
            .map_err(Error::transport)?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(Error::transport)
    }

    async fn get_data<T>(&self, path: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(Error::transport)?;

        let envelope: Envelope<T> = response.json().await.map_err(Error::transport)?;
        Ok(envelope.data)
    }

    async fn post_data<T>(&self, path: &str, body: serde_json::Value) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(Error::transport)?;

        let envelope: Envelope<T> = response.json().await.map_err(Error::transport)?;
        Ok(envelope.data)
    }
}

impl Transport for BackendClient {
    fn fetch_since(
        &self,
        channel: usize,
        earliest_epoch_s: Option<f64>,
    ) -> BoxFuture<'_, Result<StatusHistory>> {
        async move {
            let body = serde_json::json!({ "earliest_time": earliest_epoch_s });
            self.post_data(&format!("get_status_since/{channel}"), body)
                .await
        }
        .boxed()
    }

    fn fetch_settings(&self, channel: usize) -> BoxFuture<'_, Result<PumpSettings>> {
        async move { self.get_data(&format!("settings/{channel}")).await }.boxed()
    }

    fn write_settings(
        &self,
        channel: usize,
        settings: &PumpSettings,
    ) -> BoxFuture<'_, Result<PumpSettings>> {
        let settings = settings.clone();
        async move {
            let body = serde_json::to_value(&settings).map_err(Error::transport)?;
            self.post_data(&format!("set_settings/{channel}"), body).await
        }
        .boxed()
    }

    fn clear_history(&self, channel: usize) -> BoxFuture<'_, Result<()>> {
        async move {
            // The backend answers {"data": ""}; only the status matters.
            let _: serde_json::Value = self.get_data(&format!("clear_status/{channel}")).await?;
            Ok(())
        }
        .boxed()
    }

    fn num_channels(&self) -> BoxFuture<'_, Result<i64>> {
        async move { self.get_data("num_pumps").await }.boxed()
    }

    fn connect_info(&self) -> BoxFuture<'_, Result<String>> {
        async move {
            let url = self.endpoint("")?;
            let response = self
                .http
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(Error::transport)?;

            let banner: serde_json::Value = response.json().await.map_err(Error::transport)?;
            Ok(banner.to_string())
        }
        .boxed()
    }
}
