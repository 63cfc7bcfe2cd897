//! 旧版 TICK 引擎（Kapacitor）告警事件模型
//!
//! 事件 ID 由任务脚本生成，形如
//! `537730-cpu-23cf9954-9b13-47e6-96b8-94b1c9b02009:system_monitor_id=...,system_monitoring_zone=null,system_resource_id=development:0`

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 发送到 Kapacitor 的指标上的通用标签名
pub mod tags {
    pub const RESOURCE_ID: &str = "resourceId";
    pub const ACCOUNT: &str = "account";
    pub const ACCOUNT_TYPE: &str = "accountType";
    pub const RESOURCE_LABEL: &str = "resourceLabel";
    pub const MONITORING_SYSTEM: &str = "monitoringSystem";
}

lazy_static! {
    static ref TASK_FIELDS: Regex = Regex::new(concat!(
        r"^(?P<tenant>[a-zA-Z0-9_]+)-(?P<measurement>[a-zA-Z]+)-(?P<task>[a-zA-Z0-9\-]+):",
        r"[a-zA-Z_]+=(?P<monitor>[a-zA-Z0-9\-]+),",
        r"[a-zA-Z_]+=(?P<zone>[a-zA-Z0-9\-]+),",
        r"[a-zA-Z_]+=(?P<resource>[a-zA-Z0-9\-:]+)",
    ))
    .expect("task fields pattern is valid");
}

#[derive(Debug, Error, PartialEq)]
pub enum KapacitorIdError {
    #[error("Event id does not match the task fields format: {0}")]
    Malformed(String),
}

/// 告警事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KapacitorEvent {
    pub id: String,

    #[serde(default)]
    pub duration: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EventData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(default)]
    pub recoverable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub series: Vec<SeriesItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesItem {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
}

/// 从事件 ID 中解析出的任务字段
#[derive(Debug, Clone, PartialEq)]
pub struct KapacitorTaskFields {
    /// 租户 ID（ID 中的下划线还原为冒号）
    pub tenant_id: String,
    pub measurement: String,
    pub task_id: Option<Uuid>,
    pub monitor_id: Option<Uuid>,
    /// 代理（agent）事件没有区域
    pub zone_id: Option<String>,
    pub resource_id: String,
}

impl KapacitorEvent {
    /// 解析事件 ID
    pub fn task_fields(&self) -> Result<KapacitorTaskFields, KapacitorIdError> {
        let caps = TASK_FIELDS
            .captures(&self.id)
            .ok_or_else(|| KapacitorIdError::Malformed(self.id.clone()))?;

        let zone = &caps["zone"];
        Ok(KapacitorTaskFields {
            tenant_id: caps["tenant"].replace('_', ":"),
            measurement: caps["measurement"].to_string(),
            task_id: Uuid::parse_str(&caps["task"]).ok(),
            monitor_id: Uuid::parse_str(&caps["monitor"]).ok(),
            zone_id: if zone == "null" { None } else { Some(zone.to_string()) },
            resource_id: caps["resource"].to_string(),
        })
    }

    /// 状态变更的分组键：`tenant:resource:monitor:task`
    pub fn alert_group_id(&self) -> Result<String, KapacitorIdError> {
        let fields = self.task_fields()?;
        Ok(format!(
            "{}:{}:{}:{}",
            fields.tenant_id,
            fields.resource_id,
            display_uuid(fields.monitor_id),
            display_uuid(fields.task_id),
        ))
    }
}

fn display_uuid(id: Option<Uuid>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "null".to_string())
}
