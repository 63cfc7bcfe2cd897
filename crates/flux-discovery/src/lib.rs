pub mod config;
pub mod endpoint;
pub mod error;
pub mod hash;
pub mod kubernetes;
pub mod picker;
pub mod port;

pub use config::{DiscoveryProperties, KubernetesStrategy, PortStrategy};
pub use endpoint::{
    EndpointAddress, EndpointPort, EndpointSource, EndpointSubset, ServiceEndpointPicker,
    WatchEvent,
};
pub use error::{DiscoveryError, Result};
pub use kubernetes::KubernetesEndpointsSource;
pub use picker::{EngineInstance, EngineMove, EnginePicker, RoutingKey};
pub use port::PortStrategyPicker;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 根据配置创建实例选择器
///
/// 同时配置两种策略时使用端口策略；Kubernetes 策略会立即启动后台 watch。
pub async fn build_picker(props: &DiscoveryProperties) -> Result<Arc<dyn EnginePicker>> {
    if let Some(strategy) = &props.port_strategy {
        info!(
            host = %strategy.host,
            starting_port = strategy.starting_port,
            partitions = strategy.partitions,
            "Using port strategy engine picker"
        );
        return Ok(Arc::new(PortStrategyPicker::new(
            strategy.clone(),
            props.hash_function_seed,
        )));
    }

    if let Some(strategy) = &props.kubernetes_strategy {
        let source = KubernetesEndpointsSource::new(strategy)?;
        info!(url = %source.endpoints_url(), "Using kubernetes endpoints engine picker");

        let picker = ServiceEndpointPicker::new(
            Arc::new(source),
            props.hash_function_seed,
            Duration::from_secs(strategy.restart_delay),
        );
        picker.start().await;
        return Ok(Arc::new(picker));
    }

    Err(DiscoveryError::NotConfigured)
}
