use crate::error::{DiscoveryError, Result};
use crate::picker::{compute_move_with, EngineInstance, EngineMove, EnginePicker, RoutingKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Endpoints 中的一组地址与端口
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSubset {
    #[serde(default)]
    pub addresses: Vec<EndpointAddress>,

    #[serde(default)]
    pub ports: Vec<EndpointPort>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointAddress {
    pub ip: String,

    #[serde(default)]
    pub hostname: Option<String>,
}

impl EndpointAddress {
    /// 优先使用主机名，没有时使用 IP
    pub fn host(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.ip)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPort {
    pub port: u16,

    #[serde(default)]
    pub name: Option<String>,
}

/// 服务端点变化事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(Vec<EndpointSubset>),
    Modified(Vec<EndpointSubset>),
    Deleted,
}

/// 服务端点来源
#[async_trait]
pub trait EndpointSource: Send + Sync {
    /// 持续把端点变化发送到 `events`
    ///
    /// 正常结束（包括接收端关闭）返回 Ok；返回错误时由调用方延迟后重启。
    async fn watch(&self, events: mpsc::Sender<WatchEvent>) -> Result<()>;
}

struct WatchTaskHandle {
    shutdown_tx: watch::Sender<bool>,
    join_handle: JoinHandle<()>,
}

/// 基于服务端点的实例选择
///
/// 实例列表随端点事件整体替换，分区号即实例在列表中的下标。
pub struct ServiceEndpointPicker {
    seed: u32,
    source: Arc<dyn EndpointSource>,
    restart_delay: Duration,
    instances: Arc<RwLock<Vec<EngineInstance>>>,
    watch_task: Mutex<Option<WatchTaskHandle>>,
}

impl ServiceEndpointPicker {
    pub fn new(source: Arc<dyn EndpointSource>, seed: u32, restart_delay: Duration) -> Self {
        Self {
            seed,
            source,
            restart_delay,
            instances: Arc::new(RwLock::new(Vec::new())),
            watch_task: Mutex::new(None),
        }
    }

    /// 启动后台 watch；已启动时不做任何事
    pub async fn start(&self) {
        let mut task = self.watch_task.lock().await;
        if task.is_some() {
            return;
        }

        info!("Starting service endpoint watch");
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join_handle = tokio::spawn(run_watch(
            self.source.clone(),
            self.instances.clone(),
            self.restart_delay,
            shutdown_rx,
        ));

        *task = Some(WatchTaskHandle {
            shutdown_tx,
            join_handle,
        });
    }

    /// 停止后台 watch 并等待其退出
    pub async fn stop(&self) {
        let handle = self.watch_task.lock().await.take();
        if let Some(handle) = handle {
            info!("Stopping service endpoint watch");
            let _ = handle.shutdown_tx.send(true);
            let _ = handle.join_handle.await;
        }
    }

    pub async fn is_running(&self) -> bool {
        self.watch_task.lock().await.is_some()
    }

    /// 应用一次端点事件
    pub async fn handle_event(&self, event: WatchEvent) {
        apply_event(&self.instances, event).await;
    }
}

async fn apply_event(instances: &RwLock<Vec<EngineInstance>>, event: WatchEvent) {
    match event {
        WatchEvent::Added(subsets) | WatchEvent::Modified(subsets) => {
            let mut updated = Vec::new();
            for subset in &subsets {
                for port in &subset.ports {
                    for address in &subset.addresses {
                        let partition = updated.len();
                        updated.push(EngineInstance::new(address.host(), port.port, partition));
                    }
                }
            }
            info!(count = updated.len(), instances = ?updated, "Updated engine instances");
            *instances.write().await = updated;
        }
        WatchEvent::Deleted => {
            info!("Engine service deleted, clearing instances");
            instances.write().await.clear();
        }
    }
}

async fn run_watch(
    source: Arc<dyn EndpointSource>,
    instances: Arc<RwLock<Vec<EngineInstance>>>,
    restart_delay: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let (tx, mut rx) = mpsc::channel(16);
        let watch_future = source.watch(tx);
        tokio::pin!(watch_future);

        let outcome = loop {
            tokio::select! {
                result = &mut watch_future => break Some(result),
                Some(event) = rx.recv() => apply_event(&instances, event).await,
                _ = shutdown_rx.changed() => break None,
            }
        };

        let Some(result) = outcome else {
            debug!("Endpoint watch shut down");
            return;
        };

        while let Ok(event) = rx.try_recv() {
            apply_event(&instances, event).await;
        }

        match result {
            Ok(()) => {
                debug!("Finished watching endpoints");
                return;
            }
            Err(e) => {
                warn!("Failed during endpoints watch: {}", e);
                tokio::select! {
                    _ = tokio::time::sleep(restart_delay) => {}
                    _ = shutdown_rx.changed() => return,
                }
            }
        }
    }
}

#[async_trait]
impl EnginePicker for ServiceEndpointPicker {
    async fn pick_recipient(&self, key: &RoutingKey) -> Result<EngineInstance> {
        let instances = self.instances.read().await;
        let partition = key.partition(self.seed, instances.len())?;
        Ok(instances[partition].clone())
    }

    async fn pick_all(&self) -> Vec<EngineInstance> {
        self.instances.read().await.clone()
    }

    async fn pick_by_partition(&self, partition: usize) -> Result<EngineInstance> {
        let instances = self.instances.read().await;
        instances
            .get(partition)
            .cloned()
            .ok_or(DiscoveryError::PartitionOutOfRange {
                partition,
                partitions: instances.len(),
            })
    }

    async fn compute_move(
        &self,
        key: &RoutingKey,
        from_partitions: usize,
        to_partitions: usize,
    ) -> Result<Option<EngineMove>> {
        compute_move_with(self, self.seed, key, from_partitions, to_partitions).await
    }
}

impl Drop for ServiceEndpointPicker {
    fn drop(&mut self) {
        if let Some(handle) = self.watch_task.get_mut().take() {
            handle.join_handle.abort();
        }
    }
}
