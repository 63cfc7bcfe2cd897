use crate::error::{DiscoveryError, Result};
use crate::hash::{consistent_hash, hash_parts};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 事件引擎实例
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineInstance {
    pub host: String,
    pub port: u16,
    pub partition: usize,
}

impl EngineInstance {
    pub fn new(host: impl Into<String>, port: u16, partition: usize) -> Self {
        Self {
            host: host.into(),
            port,
            partition,
        }
    }
}

impl fmt::Display for EngineInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.host, self.port, self.partition)
    }
}

/// 分区数变化时某个 key 的迁移
///
/// 分区总是确定的；实例只在当前已知时给出，例如缩容后旧分区的实例已经不在列表中。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMove {
    pub from_partition: usize,
    pub to_partition: usize,
    pub from: Option<EngineInstance>,
    pub to: Option<EngineInstance>,
}

/// 路由键
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingKey {
    pub tenant_id: String,
    pub resource_id: String,
    pub collection_name: String,
}

impl RoutingKey {
    pub fn new(
        tenant_id: impl Into<String>,
        resource_id: impl Into<String>,
        collection_name: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            resource_id: resource_id.into(),
            collection_name: collection_name.into(),
        }
    }

    /// 在 `partitions` 个分区中为该 key 选择分区
    pub fn partition(&self, seed: u32, partitions: usize) -> Result<usize> {
        if partitions == 0 {
            return Err(DiscoveryError::NoPartitionsAvailable);
        }
        let hash = hash_parts(
            seed,
            &[
                self.tenant_id.as_str(),
                self.resource_id.as_str(),
                self.collection_name.as_str(),
            ],
        )?;
        Ok(consistent_hash(hash, partitions))
    }
}

/// 事件引擎实例选择策略
#[async_trait]
pub trait EnginePicker: Send + Sync {
    /// 为路由键选择负责的实例
    async fn pick_recipient(&self, key: &RoutingKey) -> Result<EngineInstance>;

    /// 所有已知实例
    async fn pick_all(&self) -> Vec<EngineInstance>;

    /// 指定分区对应的实例
    async fn pick_by_partition(&self, partition: usize) -> Result<EngineInstance>;

    /// 分区数从 `from_partitions` 变为 `to_partitions` 时该 key 是否需要迁移
    async fn compute_move(
        &self,
        key: &RoutingKey,
        from_partitions: usize,
        to_partitions: usize,
    ) -> Result<Option<EngineMove>>;
}

/// 计算迁移，实例由 `pick` 按分区解析
pub(crate) async fn compute_move_with<P>(
    picker: &P,
    seed: u32,
    key: &RoutingKey,
    from_partitions: usize,
    to_partitions: usize,
) -> Result<Option<EngineMove>>
where
    P: EnginePicker + ?Sized,
{
    let from = key.partition(seed, from_partitions)?;
    let to = key.partition(seed, to_partitions)?;

    if from == to {
        return Ok(None);
    }

    Ok(Some(EngineMove {
        from_partition: from,
        to_partition: to,
        from: resolve_instance(picker, from).await?,
        to: resolve_instance(picker, to).await?,
    }))
}

/// 分区当前没有实例时返回 None
async fn resolve_instance<P>(picker: &P, partition: usize) -> Result<Option<EngineInstance>>
where
    P: EnginePicker + ?Sized,
{
    match picker.pick_by_partition(partition).await {
        Ok(instance) => Ok(Some(instance)),
        Err(DiscoveryError::PartitionOutOfRange { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}
