use super::{StateHolder, StateTransition};
use crate::error::ConfigError;

/// 锁存最近一次处理的状态，仅在状态变化时报告迁移
#[derive(Debug, Clone)]
pub struct LatchingStateHolder<S> {
    state: Option<S>,
}

impl<S: Clone + PartialEq> LatchingStateHolder<S> {
    pub fn new() -> Self {
        Self { state: None }
    }

    /// 与之前锁存的状态不同时返回迁移并锁存新状态
    pub fn latch(&mut self, input: S) -> Option<StateTransition<S>> {
        if self.state.as_ref() == Some(&input) {
            return None;
        }
        let from = self.state.replace(input.clone());
        Some(StateTransition::new(from, input))
    }

    pub fn held(&self) -> Option<&S> {
        self.state.as_ref()
    }
}

impl<S: Clone + PartialEq> Default for LatchingStateHolder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateHolder<S> for LatchingStateHolder<S>
where
    S: Clone + PartialEq + Send,
{
    fn process(&mut self, input: S) -> Result<Option<StateTransition<S>>, ConfigError> {
        Ok(self.latch(input))
    }

    fn state(&self) -> Option<&S> {
        self.state.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_first_and_changes() {
        let mut holder = LatchingStateHolder::new();
        assert!(holder.held().is_none());

        assert_eq!(holder.latch("a"), Some(StateTransition::new(None, "a")));
        assert_eq!(holder.latch("a"), None);
        assert_eq!(holder.latch("b"), Some(StateTransition::new(Some("a"), "b")));
        assert_eq!(holder.held(), Some(&"b"));
    }

    #[test]
    fn test_process_never_fails() {
        let mut holder: LatchingStateHolder<String> = LatchingStateHolder::default();
        assert!(holder.process("x".to_string()).unwrap().is_some());
        assert!(holder.process("x".to_string()).unwrap().is_none());
        assert_eq!(holder.state().map(String::as_str), Some("x"));
    }
}
