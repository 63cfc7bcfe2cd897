//! 告警状态机
//!
//! 两层结构：每个区域一个去抖状态机（[`ConsecutiveCountStateMachine`] 或
//! [`LatchingStateHolder`]），再由 [`QuorumStateMachine`] 按法定区域数汇总出总体状态。

pub mod consecutive;
pub mod latching;
pub mod quorum;

pub use consecutive::{ConsecutiveCountStateMachine, StateSpec};
pub use latching::LatchingStateHolder;
pub use quorum::{MultiStateTransition, QuorumStateMachine};

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// 状态迁移；`from` 为 None 表示从初始的不确定状态迁出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition<S> {
    pub from: Option<S>,
    pub to: S,
}

impl<S> StateTransition<S> {
    pub fn new(from: Option<S>, to: S) -> Self {
        Self { from, to }
    }
}

/// 状态持有者
pub trait StateHolder<S>: Send {
    /// 处理一次输入状态
    ///
    /// 返回 Some 表示状态已迁移，随后 [`StateHolder::state`] 返回迁移后的状态。
    fn process(&mut self, input: S) -> Result<Option<StateTransition<S>>, ConfigError>;

    /// 当前持有的状态，不确定时为 None
    fn state(&self) -> Option<&S>;
}

/// 为每个新出现的区域创建状态持有者
pub trait StateHolderFactory<S>: Send + Sync {
    fn create(&self) -> Box<dyn StateHolder<S>>;
}

impl<S, F> StateHolderFactory<S> for F
where
    F: Fn() -> Box<dyn StateHolder<S>> + Send + Sync,
{
    fn create(&self) -> Box<dyn StateHolder<S>> {
        self()
    }
}
