//! 状态表达式求值
//!
//! 缺失的指标解析为 None，使比较结果为 false；比较符与操作数类型不匹配、
//! 输入类型无法解析等属于任务定义错误，返回 [`EvaluationError`]。

use crate::error::EvaluationError;
use flux_types::{
    Comparator, ComparisonExpression, ComparisonInput, ComparisonValue, EventProcessorInput,
    Expression, LogicalExpression, LogicalOperator,
};
use regex::Regex;

/// 针对当前采样（以及上一次采样）求值
pub struct ExpressionEvaluator<'a> {
    current: &'a EventProcessorInput,
    previous: Option<&'a EventProcessorInput>,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(current: &'a EventProcessorInput, previous: Option<&'a EventProcessorInput>) -> Self {
        Self { current, previous }
    }

    pub fn evaluate(&self, expression: &Expression) -> Result<bool, EvaluationError> {
        match expression {
            Expression::Logical(logical) => self.evaluate_logical(logical),
            Expression::Comparison(comparison) => self.evaluate_comparison(comparison),
        }
    }

    fn evaluate_logical(&self, logical: &LogicalExpression) -> Result<bool, EvaluationError> {
        let wrap = |e: EvaluationError| EvaluationError::SubExpression {
            expression: logical.to_string(),
            source: Box::new(e),
        };

        match logical.operator {
            LogicalOperator::Or => {
                for sub in &logical.expressions {
                    if self.evaluate(sub).map_err(wrap)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            LogicalOperator::And => {
                for sub in &logical.expressions {
                    if !self.evaluate(sub).map_err(wrap)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    fn evaluate_comparison(&self, expr: &ComparisonExpression) -> Result<bool, EvaluationError> {
        match &expr.comparison_value {
            ComparisonValue::Number(rhs) => {
                let lhs = self.resolve_number(expr)?;
                compare_numbers(lhs, expr, *rhs)
            }
            ComparisonValue::Text(rhs) => {
                let lhs = self.resolve_string(expr)?;
                compare_strings(lhs, expr, rhs)
            }
        }
    }

    fn resolve_number(&self, expr: &ComparisonExpression) -> Result<Option<f64>, EvaluationError> {
        match &expr.input {
            ComparisonInput::Metric(name) => number(self.current, name, expr),
            ComparisonInput::Rate { of } => self.resolve_rate(of, expr),
            ComparisonInput::Percentage { part, whole } => {
                let part = number(self.current, part, expr)?;
                let whole = number(self.current, whole, expr)?;
                Ok(match (part, whole) {
                    (Some(part), Some(whole)) => Some(100.0 * (part / whole)),
                    _ => None,
                })
            }
            ComparisonInput::Previous { of } => match self.previous {
                Some(previous) => number(previous, of, expr),
                None => Ok(None),
            },
        }
    }

    /// 每秒变化率，时间差按整秒计算
    fn resolve_rate(
        &self,
        of: &str,
        expr: &ComparisonExpression,
    ) -> Result<Option<f64>, EvaluationError> {
        let Some(previous) = self.previous else {
            return Ok(None);
        };

        let current_value = number(self.current, of, expr)?;
        let previous_value = number(previous, of, expr)?;
        let (Some(current_value), Some(previous_value)) = (current_value, previous_value) else {
            return Ok(None);
        };

        let delta_seconds = (self.current.timestamp - previous.timestamp).num_seconds();
        if delta_seconds == 0 {
            return Ok(None);
        }

        Ok(Some((current_value - previous_value) / delta_seconds as f64))
    }

    fn resolve_string(&self, expr: &ComparisonExpression) -> Result<Option<&'a str>, EvaluationError> {
        let ComparisonInput::Metric(name) = &expr.input else {
            return Err(EvaluationError::InvalidInput {
                operand: "string",
                expression: expr.to_string(),
            });
        };

        match self.current.metric(name) {
            None => Ok(None),
            Some(value) => value.as_str().map(Some).ok_or_else(|| EvaluationError::OperandType {
                metric: name.clone(),
                expected: "string",
                expression: expr.to_string(),
            }),
        }
    }
}

/// 便捷函数：对单个表达式求值
pub fn evaluate(
    current: &EventProcessorInput,
    previous: Option<&EventProcessorInput>,
    expression: &Expression,
) -> Result<bool, EvaluationError> {
    ExpressionEvaluator::new(current, previous).evaluate(expression)
}

fn number(
    sample: &EventProcessorInput,
    name: &str,
    expr: &ComparisonExpression,
) -> Result<Option<f64>, EvaluationError> {
    match sample.metric(name) {
        None => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| EvaluationError::OperandType {
            metric: name.to_string(),
            expected: "numeric",
            expression: expr.to_string(),
        }),
    }
}

fn compare_numbers(
    lhs: Option<f64>,
    expr: &ComparisonExpression,
    rhs: f64,
) -> Result<bool, EvaluationError> {
    let op: fn(f64, f64) -> bool = match expr.comparator {
        Comparator::GreaterThan => |l, r| l > r,
        Comparator::GreaterThanOrEqualTo => |l, r| l >= r,
        Comparator::LessThan => |l, r| l < r,
        Comparator::LessThanOrEqualTo => |l, r| l <= r,
        Comparator::EqualTo => |l, r| l == r,
        Comparator::NotEqualTo => |l, r| l != r,
        Comparator::RegexMatch | Comparator::NotRegexMatch => {
            return Err(EvaluationError::InvalidComparator {
                comparator: expr.comparator.to_string(),
                operand: "numeric",
                expression: expr.to_string(),
            })
        }
    };

    Ok(lhs.map_or(false, |lhs| op(lhs, rhs)))
}

fn compare_strings(
    lhs: Option<&str>,
    expr: &ComparisonExpression,
    rhs: &str,
) -> Result<bool, EvaluationError> {
    match expr.comparator {
        Comparator::EqualTo => Ok(lhs.map_or(false, |lhs| lhs == rhs)),
        Comparator::NotEqualTo => Ok(lhs.map_or(false, |lhs| lhs != rhs)),
        Comparator::RegexMatch | Comparator::NotRegexMatch => {
            let pattern = Regex::new(rhs).map_err(|e| EvaluationError::InvalidRegex {
                pattern: rhs.to_string(),
                reason: e.to_string(),
            })?;
            let negate = expr.comparator == Comparator::NotRegexMatch;
            Ok(lhs.map_or(false, |lhs| pattern.is_match(lhs) != negate))
        }
        _ => Err(EvaluationError::InvalidComparator {
            comparator: expr.comparator.to_string(),
            operand: "string",
            expression: expr.to_string(),
        }),
    }
}
