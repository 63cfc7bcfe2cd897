use crate::config::KubernetesStrategy;
use crate::endpoint::{EndpointSource, EndpointSubset, WatchEvent};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct EndpointsResponse {
    #[serde(default)]
    subsets: Vec<EndpointSubset>,
}

/// 轮询 Kubernetes Endpoints 资源的端点来源
pub struct KubernetesEndpointsSource {
    client: Client,
    url: String,
    bearer_token: Option<String>,
    poll_interval: Duration,
}

impl KubernetesEndpointsSource {
    pub fn new(strategy: &KubernetesStrategy) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(strategy.read_timeout))
            .build()?;

        let url = format!(
            "{}/api/v1/namespaces/{}/endpoints/{}",
            strategy.api_url.trim_end_matches('/'),
            strategy.namespace,
            strategy.service_name
        );

        Ok(Self {
            client,
            url,
            bearer_token: strategy.bearer_token.clone(),
            poll_interval: Duration::from_secs(strategy.poll_interval.max(1)),
        })
    }

    pub fn endpoints_url(&self) -> &str {
        &self.url
    }

    /// 当前端点；服务不存在时返回 None
    pub async fn fetch(&self) -> Result<Option<Vec<EndpointSubset>>> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let endpoints: EndpointsResponse = response.error_for_status()?.json().await?;
        Ok(Some(endpoints.subsets))
    }
}

#[async_trait]
impl EndpointSource for KubernetesEndpointsSource {
    async fn watch(&self, events: mpsc::Sender<WatchEvent>) -> Result<()> {
        let mut last: Option<Option<Vec<EndpointSubset>>> = None;
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            ticker.tick().await;
            let current = self.fetch().await?;
            if last.as_ref() == Some(&current) {
                continue;
            }

            let event = match (&last, &current) {
                (_, None) => WatchEvent::Deleted,
                (Some(Some(_)), Some(subsets)) => WatchEvent::Modified(subsets.clone()),
                (_, Some(subsets)) => WatchEvent::Added(subsets.clone()),
            };
            debug!(url = %self.url, event = ?event, "Endpoints changed");

            if events.send(event).await.is_err() {
                return Ok(());
            }
            last = Some(current);
        }
    }
}
