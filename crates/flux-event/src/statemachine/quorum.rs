use super::{LatchingStateHolder, StateHolder, StateHolderFactory, StateTransition};
use crate::error::ConfigError;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use tracing::debug;

/// 总体状态迁移，附带达到法定数时各区域的状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiStateTransition<S, E: Ord> {
    pub overall: StateTransition<S>,
    pub observations: BTreeMap<E, Option<S>>,
}

/// 法定数状态机
///
/// 每个区域维护一个独立的状态持有者（首次出现时创建，之后不会移除）。
/// 某个区域本地迁移后，若处于新状态的区域数达到法定数，则把新状态送入总体锁存器；
/// 总体状态确实变化时才返回迁移。
///
/// 只有发生本地迁移的区域会触发法定数的重新计算，区域停止上报不会触发。
pub struct QuorumStateMachine<S, E> {
    quorum: usize,
    factory: Box<dyn StateHolderFactory<S>>,
    entries: HashMap<E, Box<dyn StateHolder<S>>>,
    overall: LatchingStateHolder<S>,
}

impl<S, E> QuorumStateMachine<S, E>
where
    S: Clone + PartialEq + Debug + Send + 'static,
    E: Clone + Eq + Hash + Ord + Debug,
{
    pub fn new(
        quorum: usize,
        factory: impl StateHolderFactory<S> + 'static,
    ) -> Result<Self, ConfigError> {
        if quorum == 0 {
            return Err(ConfigError::InvalidQuorum);
        }
        Ok(Self {
            quorum,
            factory: Box::new(factory),
            entries: HashMap::new(),
            overall: LatchingStateHolder::new(),
        })
    }

    /// 每个区域使用锁存器（等价于连续次数为 1）
    pub fn latching(quorum: usize) -> Result<Self, ConfigError> {
        Self::new(quorum, || -> Box<dyn StateHolder<S>> {
            Box::new(LatchingStateHolder::new())
        })
    }

    pub fn process(
        &mut self,
        entry: E,
        input: S,
    ) -> Result<Option<MultiStateTransition<S, E>>, ConfigError> {
        let holder = match self.entries.entry(entry) {
            Entry::Occupied(o) => o.into_mut(),
            Entry::Vacant(v) => {
                debug!(entry = ?v.key(), "Tracking new quorum entry");
                v.insert(self.factory.create())
            }
        };

        match holder.process(input)? {
            Some(local) => Ok(self.evaluate_quorum(local)),
            None => Ok(None),
        }
    }

    fn evaluate_quorum(&mut self, local: StateTransition<S>) -> Option<MultiStateTransition<S, E>> {
        let count = self
            .entries
            .values()
            .filter(|holder| holder.state() == Some(&local.to))
            .count();

        debug!(
            from = ?local.from,
            to = ?local.to,
            count,
            quorum = self.quorum,
            "Entry state transitioned"
        );

        if count < self.quorum {
            return None;
        }

        let overall = self.overall.latch(local.to)?;
        Some(MultiStateTransition {
            overall,
            observations: self.observations(),
        })
    }

    /// 各区域当前状态
    pub fn observations(&self) -> BTreeMap<E, Option<S>> {
        self.entries
            .iter()
            .map(|(entry, holder)| (entry.clone(), holder.state().cloned()))
            .collect()
    }

    pub fn overall_state(&self) -> Option<&S> {
        self.overall.held()
    }

    pub fn entry_state(&self, entry: &E) -> Option<&S> {
        self.entries.get(entry).and_then(|holder| holder.state())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }
}
