use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// 任务告警状态
///
/// 声明顺序即状态全集的顺序；状态表达式的求值优先级由任务配置中的顺序决定，
/// 与严重程度无关。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Critical,
    Warning,
    Ok,
}

impl TaskState {
    /// 所有已声明的状态
    pub const ALL: [TaskState; 3] = [TaskState::Critical, TaskState::Warning, TaskState::Ok];
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Critical => write!(f, "CRITICAL"),
            TaskState::Warning => write!(f, "WARNING"),
            TaskState::Ok => write!(f, "OK"),
        }
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqualTo,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqualTo,
    #[serde(rename = "==")]
    EqualTo,
    #[serde(rename = "!=")]
    NotEqualTo,
    #[serde(rename = "=~")]
    RegexMatch,
    #[serde(rename = "!~")]
    NotRegexMatch,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparator::GreaterThan => ">",
            Comparator::GreaterThanOrEqualTo => ">=",
            Comparator::LessThan => "<",
            Comparator::LessThanOrEqualTo => "<=",
            Comparator::EqualTo => "==",
            Comparator::NotEqualTo => "!=",
            Comparator::RegexMatch => "=~",
            Comparator::NotRegexMatch => "!~",
        };
        f.write_str(symbol)
    }
}

/// 比较表达式左侧的输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonInput {
    /// 当前采样中的指标
    Metric(String),

    /// 指标相对上一次采样的每秒变化率
    Rate { of: String },

    /// 当前采样中 part / whole 的百分比
    Percentage { part: String, whole: String },

    /// 上一次采样中的指标值
    Previous { of: String },
}

impl ComparisonInput {
    pub fn metric(name: impl Into<String>) -> Self {
        ComparisonInput::Metric(name.into())
    }
}

impl fmt::Display for ComparisonInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonInput::Metric(name) => write!(f, "{}", name),
            ComparisonInput::Rate { of } => write!(f, "rate({})", of),
            ComparisonInput::Percentage { part, whole } => {
                write!(f, "percentage({}, {})", part, whole)
            }
            ComparisonInput::Previous { of } => write!(f, "previous({})", of),
        }
    }
}

/// 比较表达式右侧的字面量，类型决定使用数值比较还是字符串比较
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparisonValue {
    Number(f64),
    Text(String),
}

impl From<f64> for ComparisonValue {
    fn from(v: f64) -> Self {
        ComparisonValue::Number(v)
    }
}

impl From<i64> for ComparisonValue {
    fn from(v: i64) -> Self {
        ComparisonValue::Number(v as f64)
    }
}

impl From<i32> for ComparisonValue {
    fn from(v: i32) -> Self {
        ComparisonValue::Number(v as f64)
    }
}

impl From<&str> for ComparisonValue {
    fn from(v: &str) -> Self {
        ComparisonValue::Text(v.to_string())
    }
}

impl fmt::Display for ComparisonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonValue::Number(v) => write!(f, "{}", v),
            ComparisonValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// 比较表达式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonExpression {
    pub input: ComparisonInput,
    pub comparator: Comparator,
    pub comparison_value: ComparisonValue,
}

/// 逻辑运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

/// 逻辑表达式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalExpression {
    pub operator: LogicalOperator,
    pub expressions: Vec<Expression>,
}

/// 表达式树
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    Comparison(ComparisonExpression),
    Logical(LogicalExpression),
}

impl Expression {
    /// 构造比较表达式
    pub fn comparison(
        input: ComparisonInput,
        comparator: Comparator,
        comparison_value: impl Into<ComparisonValue>,
    ) -> Self {
        Expression::Comparison(ComparisonExpression {
            input,
            comparator,
            comparison_value: comparison_value.into(),
        })
    }

    pub fn and(expressions: Vec<Expression>) -> Self {
        Expression::Logical(LogicalExpression {
            operator: LogicalOperator::And,
            expressions,
        })
    }

    pub fn or(expressions: Vec<Expression>) -> Self {
        Expression::Logical(LogicalExpression {
            operator: LogicalOperator::Or,
            expressions,
        })
    }
}

impl fmt::Display for ComparisonExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.input, self.comparator, self.comparison_value)
    }
}

impl fmt::Display for LogicalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = match self.operator {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        };
        let parts: Vec<String> = self.expressions.iter().map(|e| e.to_string()).collect();
        write!(f, "({})", parts.join(separator))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Comparison(c) => fmt::Display::fmt(c, f),
            Expression::Logical(l) => fmt::Display::fmt(l, f),
        }
    }
}

/// 状态表达式：表达式成立时候选状态为 `state`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateExpression {
    pub state: TaskState,
    pub expression: Expression,

    /// 消息模板，支持 `#{metric}` 占位符
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 事件引擎任务参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEngineTaskParameters {
    /// 指标分组（measurement）
    #[serde(default)]
    pub metric_group: String,

    /// 标签选择器
    #[serde(default)]
    pub label_selector: HashMap<String, String>,

    /// 区域标签名（仅用于展示）
    #[serde(default)]
    pub zone_label: String,

    /// 总体状态变更所需的区域数
    #[serde(default = "default_count")]
    pub zone_quorum_count: usize,

    /// 每个状态需要连续观测的次数
    #[serde(default = "default_count_u32")]
    pub default_consecutive_count: u32,

    /// 按优先级排列的状态表达式
    #[serde(default)]
    pub state_expressions: Vec<StateExpression>,
}

fn default_count() -> usize {
    1
}

fn default_count_u32() -> u32 {
    1
}

impl Default for EventEngineTaskParameters {
    fn default() -> Self {
        Self {
            metric_group: String::new(),
            label_selector: HashMap::new(),
            zone_label: String::new(),
            zone_quorum_count: 1,
            default_consecutive_count: 1,
            state_expressions: Vec::new(),
        }
    }
}

/// 事件引擎任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEngineTask {
    pub id: Uuid,
    pub tenant_id: String,

    #[serde(default)]
    pub name: String,

    pub task_parameters: EventEngineTaskParameters,
}

impl EventEngineTask {
    pub fn new(tenant_id: impl Into<String>, task_parameters: EventEngineTaskParameters) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            name: String::new(),
            task_parameters,
        }
    }
}
