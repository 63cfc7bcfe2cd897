use flux_types::MetricValue;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"#\{([^}]+)\}").expect("valid placeholder pattern");
}

/// 缺失指标的占位文本
pub const UNDEFINED: &str = "undefined";

/// 把消息模板中的 `#{name}` 替换为对应指标值
pub fn interpolate(template: Option<&str>, metrics: &HashMap<String, MetricValue>) -> Option<String> {
    let template = template?;
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| match metrics.get(&caps[1]) {
        Some(value) => value.to_string(),
        None => UNDEFINED.to_string(),
    });
    Some(rendered.into_owned())
}
