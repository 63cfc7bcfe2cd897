use anyhow::{anyhow, Result};
use flux_discovery::DiscoveryProperties;
use serde::{Deserialize, Serialize};

/// 事件引擎配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EventEngineConfig {
    #[serde(default)]
    pub system: SystemConfig,

    #[serde(default)]
    pub processor: ProcessorConfig,

    #[serde(default)]
    pub discovery: DiscoveryProperties,
}

/// 系统配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SystemConfig {
    pub name: String,
    pub version: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: "FLUX Event Engine".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

/// 任务未指定时使用的处理参数
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_count")]
    pub default_quorum_count: usize,

    #[serde(default = "default_consecutive")]
    pub default_consecutive_count: u32,
}

fn default_count() -> usize {
    1
}

fn default_consecutive() -> u32 {
    1
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            default_quorum_count: default_count(),
            default_consecutive_count: default_consecutive(),
        }
    }
}

impl EventEngineConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.processor.default_quorum_count == 0 {
            return Err(anyhow!("default_quorum_count must be greater than 0"));
        }

        if self.processor.default_consecutive_count == 0 {
            return Err(anyhow!("default_consecutive_count must be greater than 0"));
        }

        match (
            &self.discovery.port_strategy,
            &self.discovery.kubernetes_strategy,
        ) {
            (None, None) => Err(anyhow!(
                "discovery requires either port_strategy or kubernetes_strategy"
            )),
            (Some(_), Some(_)) => Err(anyhow!(
                "discovery must configure only one of port_strategy and kubernetes_strategy"
            )),
            _ => Ok(()),
        }
    }
}
