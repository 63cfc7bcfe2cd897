use thiserror::Error;
use uuid::Uuid;

/// 配置错误：构建任务上下文或状态机时发现的非法配置
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("State specs must be non-empty")]
    EmptyStateSpecs,

    #[error("Consecutive count for state {state} must be greater than 0, got {count}")]
    InvalidConsecutiveCount { state: String, count: u32 },

    #[error("Quorum must be greater than 0")]
    InvalidQuorum,

    #[error("Unknown state: {0}")]
    UnknownState(String),
}

/// 表达式求值错误：任务定义本身有问题，而不是"未匹配"
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Invalid comparator {comparator} for {operand} comparison in {expression}")]
    InvalidComparator {
        comparator: String,
        operand: &'static str,
        expression: String,
    },

    #[error("Invalid {operand} input type in {expression}")]
    InvalidInput {
        operand: &'static str,
        expression: String,
    },

    #[error("Metric {metric} is not a {expected} value in {expression}")]
    OperandType {
        metric: String,
        expected: &'static str,
        expression: String,
    },

    #[error("Invalid regex {pattern}: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("Sub-expression of {expression} is not valid: {source}")]
    SubExpression {
        expression: String,
        #[source]
        source: Box<EvaluationError>,
    },
}

/// flux-event 统一错误类型
#[derive(Error, Debug)]
pub enum EventError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Unknown task: {0}")]
    UnknownTask(Uuid),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, EventError>;
