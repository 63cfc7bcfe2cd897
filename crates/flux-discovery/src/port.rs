use crate::config::PortStrategy;
use crate::error::{DiscoveryError, Result};
use crate::picker::{compute_move_with, EngineInstance, EngineMove, EnginePicker, RoutingKey};
use async_trait::async_trait;

/// 端口策略：单机上的固定实例组，实例 i 监听 `starting_port + i`
///
/// `pick_by_partition` 不限制分区上限，方便计算扩容后的迁移目标。
pub struct PortStrategyPicker {
    strategy: PortStrategy,
    seed: u32,
}

impl PortStrategyPicker {
    pub fn new(strategy: PortStrategy, seed: u32) -> Self {
        Self { strategy, seed }
    }

    fn instance(&self, partition: usize) -> Result<EngineInstance> {
        let port = usize::from(self.strategy.starting_port)
            .checked_add(partition)
            .and_then(|port| u16::try_from(port).ok())
            .ok_or(DiscoveryError::PartitionOutOfRange {
                partition,
                partitions: self.strategy.partitions,
            })?;
        Ok(EngineInstance::new(self.strategy.host.clone(), port, partition))
    }
}

#[async_trait]
impl EnginePicker for PortStrategyPicker {
    async fn pick_recipient(&self, key: &RoutingKey) -> Result<EngineInstance> {
        let partition = key.partition(self.seed, self.strategy.partitions)?;
        self.instance(partition)
    }

    async fn pick_all(&self) -> Vec<EngineInstance> {
        (0..self.strategy.partitions)
            .filter_map(|partition| self.instance(partition).ok())
            .collect()
    }

    async fn pick_by_partition(&self, partition: usize) -> Result<EngineInstance> {
        self.instance(partition)
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
