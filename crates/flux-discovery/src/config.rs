use serde::{Deserialize, Serialize};

/// 实例发现配置
///
/// `port_strategy` 与 `kubernetes_strategy` 二选一。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryProperties {
    #[serde(default)]
    pub hash_function_seed: u32,

    #[serde(default)]
    pub port_strategy: Option<PortStrategy>,

    #[serde(default)]
    pub kubernetes_strategy: Option<KubernetesStrategy>,
}

/// 固定数量的实例，端口从 `starting_port` 开始连续分配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortStrategy {
    #[serde(default = "default_partitions")]
    pub partitions: usize,

    #[serde(default = "default_starting_port")]
    pub starting_port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for PortStrategy {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            starting_port: default_starting_port(),
            host: default_host(),
        }
    }
}

/// 通过 Kubernetes Endpoints 发现实例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KubernetesStrategy {
    /// API Server 地址，默认是集群内访问地址
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// 请求超时（秒）
    #[serde(default = "default_read_timeout")]
    pub read_timeout: u64,

    /// 轮询间隔（秒）
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// watch 失败后重启前的等待（秒）
    #[serde(default = "default_restart_delay")]
    pub restart_delay: u64,

    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for KubernetesStrategy {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            service_name: default_service_name(),
            namespace: default_namespace(),
            read_timeout: default_read_timeout(),
            poll_interval: default_poll_interval(),
            restart_delay: default_restart_delay(),
            bearer_token: None,
        }
    }
}

fn default_partitions() -> usize {
    1
}

fn default_starting_port() -> u16 {
    9192
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_api_url() -> String {
    "https://kubernetes".to_string()
}

fn default_service_name() -> String {
    "kapacitor".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_read_timeout() -> u64 {
    20
}

fn default_poll_interval() -> u64 {
    10
}

fn default_restart_delay() -> u64 {
    5
}
