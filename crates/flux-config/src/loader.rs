use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File, FileFormat};
use flux_types::EventEngineTask;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::{EventEngineConfig, ProcessorConfig};

/// 环境变量覆盖的默认前缀，例如 `EVENT__PROCESSOR__DEFAULT_QUORUM_COUNT`
pub const DEFAULT_ENV_PREFIX: &str = "EVENT";

const CONFIG_FILE: &str = "event-engine.toml";

/// 配置加载器
pub struct ConfigLoader {
    config_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// 创建配置加载器
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// 使用其它环境变量前缀
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// 加载事件引擎配置
    ///
    /// 默认值 < `event-engine.toml` < 环境变量；配置文件不存在时只使用默认值和环境变量。
    pub fn load(&self) -> Result<EventEngineConfig> {
        let config_path = self.config_dir.join(CONFIG_FILE);

        let config = Config::builder()
            .add_source(Config::try_from(&EventEngineConfig::default())?)
            .add_source(
                File::new(
                    config_path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                    FileFormat::Toml,
                )
                .required(false),
            )
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// 加载任务定义（按扩展名识别 JSON 或 TOML）
    ///
    /// 任务未指定 `zone_quorum_count`、`default_consecutive_count` 时使用处理器默认值，
    /// 未指定 `id` 时生成一个。
    pub fn load_task<P: AsRef<Path>>(&self, path: P) -> Result<EventEngineTask> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read task file {}", path.display()))?;

        let mut value: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => return Err(anyhow!("Unsupported task file extension: {:?}", other)),
        };

        let processor = self.load()?.processor;
        apply_task_defaults(&mut value, &processor)?;

        serde_json::from_value(value)
            .with_context(|| format!("Invalid task definition in {}", path.display()))
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        self.load()?.validate()
    }
}

fn apply_task_defaults(value: &mut Value, processor: &ProcessorConfig) -> Result<()> {
    let task = value
        .as_object_mut()
        .ok_or_else(|| anyhow!("Task definition must be a table"))?;

    task.entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));

    let params = task
        .entry("task_parameters")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| anyhow!("task_parameters must be a table"))?;

    params
        .entry("zone_quorum_count")
        .or_insert_with(|| Value::from(processor.default_quorum_count));
    params
        .entry("default_consecutive_count")
        .or_insert_with(|| Value::from(processor.default_consecutive_count));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_default_config() {
        let temp_dir = tempdir().unwrap();
        let loader = ConfigLoader::new(temp_dir.path()).with_env_prefix("EVENT_TEST_DEFAULTS");

        let config = loader.load().unwrap();
        assert_eq!(config, EventEngineConfig::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_content = r#"
[system]
name = "Test Engine"
version = "2.0.0"

[processor]
default_quorum_count = 2
default_consecutive_count = 3

[discovery]
hash_function_seed = 7

[discovery.port_strategy]
partitions = 4
"#;

        fs::write(temp_dir.path().join("event-engine.toml"), config_content).unwrap();

        let loader = ConfigLoader::new(temp_dir.path()).with_env_prefix("EVENT_TEST_FILE");
        let config = loader.load().unwrap();

        assert_eq!(config.system.name, "Test Engine");
        assert_eq!(config.processor.default_quorum_count, 2);
        assert_eq!(config.processor.default_consecutive_count, 3);
        assert_eq!(config.discovery.hash_function_seed, 7);

        let port = config.discovery.port_strategy.unwrap();
        assert_eq!(port.partitions, 4);
        assert_eq!(port.starting_port, 9192);
        assert!(loader.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join("event-engine.toml"),
            "[processor]\ndefault_quorum_count = 2\n",
        )
        .unwrap();

        std::env::set_var("EVENT_TEST_ENV__PROCESSOR__DEFAULT_QUORUM_COUNT", "5");
        let loader = ConfigLoader::new(temp_dir.path()).with_env_prefix("EVENT_TEST_ENV");
        let config = loader.load().unwrap();
        std::env::remove_var("EVENT_TEST_ENV__PROCESSOR__DEFAULT_QUORUM_COUNT");

        assert_eq!(config.processor.default_quorum_count, 5);
    }

    #[test]
    fn test_validate_requires_discovery() {
        let temp_dir = tempdir().unwrap();
        let loader = ConfigLoader::new(temp_dir.path()).with_env_prefix("EVENT_TEST_VALIDATE");

        assert!(loader.validate().is_err());
    }

    #[test]
    fn test_load_task_applies_defaults() {
        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join("event-engine.toml"),
            "[processor]\ndefault_quorum_count = 2\ndefault_consecutive_count = 3\n",
        )
        .unwrap();

        let task_path = temp_dir.path().join("task.json");
        fs::write(
            &task_path,
            r#"{
                "tenant_id": "t-1",
                "task_parameters": {
                    "metric_group": "cpu",
                    "zone_quorum_count": 1,
                    "state_expressions": []
                }
            }"#,
        )
        .unwrap();

        let loader = ConfigLoader::new(temp_dir.path()).with_env_prefix("EVENT_TEST_TASK_JSON");
        let task = loader.load_task(&task_path).unwrap();

        assert_eq!(task.tenant_id, "t-1");
        assert_eq!(task.task_parameters.zone_quorum_count, 1);
        assert_eq!(task.task_parameters.default_consecutive_count, 3);
    }

    #[test]
    fn test_load_task_from_toml() {
        let temp_dir = tempdir().unwrap();
        let task_path = temp_dir.path().join("task.toml");
        fs::write(
            &task_path,
            r#"
id = "2bd4fa5e-2e1c-4f5e-9e1a-3b8f0d4c1a11"
tenant_id = "t-2"

[task_parameters]
metric_group = "mem"

[[task_parameters.state_expressions]]
state = "CRITICAL"
message = "free #{free}"

[task_parameters.state_expressions.expression]
type = "comparison"
input = { metric = "free" }
comparator = "<"
comparison_value = 10
"#,
        )
        .unwrap();

        let loader = ConfigLoader::new(temp_dir.path()).with_env_prefix("EVENT_TEST_TASK_TOML");
        let task = loader.load_task(&task_path).unwrap();

        assert_eq!(task.id.to_string(), "2bd4fa5e-2e1c-4f5e-9e1a-3b8f0d4c1a11");
        assert_eq!(task.task_parameters.zone_quorum_count, 1);
        assert_eq!(task.task_parameters.state_expressions.len(), 1);
        assert_eq!(
            task.task_parameters.state_expressions[0].message.as_deref(),
            Some("free #{free}")
        );
    }

    #[test]
    fn test_load_task_unsupported_extension() {
        let temp_dir = tempdir().unwrap();
        let task_path = temp_dir.path().join("task.yaml");
        fs::write(&task_path, "tenant_id: t-1").unwrap();

        let loader = ConfigLoader::new(temp_dir.path());
        assert!(loader.load_task(&task_path).is_err());
    }
}
