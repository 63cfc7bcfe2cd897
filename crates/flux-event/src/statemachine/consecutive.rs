use super::{StateHolder, StateTransition};
use crate::error::ConfigError;
use std::fmt::Debug;
use tracing::trace;

/// 状态及其需要连续观测的次数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSpec<S> {
    state: S,
    consecutive_count: u32,
}

impl<S: Debug> StateSpec<S> {
    pub fn new(state: S, consecutive_count: u32) -> Result<Self, ConfigError> {
        if consecutive_count < 1 {
            return Err(ConfigError::InvalidConsecutiveCount {
                state: format!("{:?}", state),
                count: consecutive_count,
            });
        }
        Ok(Self {
            state,
            consecutive_count,
        })
    }

    /// 连续次数为 1 的状态
    pub fn of(state: S) -> Self {
        Self {
            state,
            consecutive_count: 1,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn consecutive_count(&self) -> u32 {
        self.consecutive_count
    }
}

#[derive(Debug, Clone)]
struct PendingState {
    spec_index: usize,
    remainder: u32,
}

/// 连续计数去抖状态机
///
/// 候选状态必须连续出现其 `consecutive_count` 次才会迁移过去；
/// 中途出现其它候选会丢弃已有计数，出现当前状态会清空待定计数。
#[derive(Debug, Clone)]
pub struct ConsecutiveCountStateMachine<S> {
    specs: Vec<StateSpec<S>>,
    current: Option<S>,
    pending: Option<PendingState>,
}

impl<S> ConsecutiveCountStateMachine<S>
where
    S: Clone + PartialEq + Debug,
{
    /// 初始状态为第一个声明的状态
    pub fn new(specs: Vec<StateSpec<S>>) -> Result<Self, ConfigError> {
        let current = specs
            .first()
            .map(|spec| spec.state.clone())
            .ok_or(ConfigError::EmptyStateSpecs)?;

        Ok(Self {
            specs,
            current: Some(current),
            pending: None,
        })
    }

    /// 从不确定状态开始，第一次迁移的 `from` 为 None
    pub fn starting_indeterminate(mut self) -> Self {
        self.current = None;
        self
    }

    /// 待定的目标状态及剩余次数
    pub fn pending(&self) -> Option<(&S, u32)> {
        self.pending
            .as_ref()
            .map(|p| (&self.specs[p.spec_index].state, p.remainder))
    }

    fn spec_index(&self, input: &S) -> Result<usize, ConfigError> {
        self.specs
            .iter()
            .position(|spec| &spec.state == input)
            .ok_or_else(|| ConfigError::UnknownState(format!("{:?}", input)))
    }
}

impl<S> StateHolder<S> for ConsecutiveCountStateMachine<S>
where
    S: Clone + PartialEq + Debug + Send,
{
    fn process(&mut self, input: S) -> Result<Option<StateTransition<S>>, ConfigError> {
        if self.current.as_ref() == Some(&input) {
            self.pending = None;
            return Ok(None);
        }

        let mut pending = match self.pending.take() {
            Some(p) if self.specs[p.spec_index].state == input => p,
            previous => match self.spec_index(&input) {
                Ok(index) => PendingState {
                    spec_index: index,
                    remainder: self.specs[index].consecutive_count,
                },
                Err(e) => {
                    self.pending = previous;
                    return Err(e);
                }
            },
        };

        pending.remainder = pending.remainder.saturating_sub(1);

        if pending.remainder == 0 {
            let from = self.current.replace(input.clone());
            Ok(Some(StateTransition::new(from, input)))
        } else {
            trace!(state = ?input, remaining = pending.remainder, "Pending state");
            self.pending = Some(pending);
            Ok(None)
        }
    }

    fn state(&self) -> Option<&S> {
        self.current.as_ref()
    }
}
