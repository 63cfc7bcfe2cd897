use crate::error::ConfigError;
use crate::processor::FALLBACK_STATE;
use crate::statemachine::{
    ConsecutiveCountStateMachine, MultiStateTransition, QuorumStateMachine, StateHolder, StateSpec,
};
use flux_types::{EventEngineTask, EventProcessorInput, TaskState};
use std::collections::BTreeMap;
use tracing::debug;

/// 单个任务的处理上下文
///
/// 持有任务定义、区域法定数状态机以及最近一次成功处理的采样。
/// 上下文不做内部同步：所有修改都通过 `&mut self` 进行，
/// 跨任务共享时请使用 [`crate::registry::EventProcessorRegistry`]。
pub struct EventProcessorContext {
    task: EventEngineTask,
    state_machine: QuorumStateMachine<TaskState, String>,
    previous_input: Option<EventProcessorInput>,
}

impl EventProcessorContext {
    /// 根据任务定义构建上下文
    ///
    /// 每个区域的去抖状态机覆盖全部 [`TaskState`]，连续次数取
    /// `default_consecutive_count`，并从不确定状态开始。
    pub fn from_task(task: EventEngineTask) -> Result<Self, ConfigError> {
        let params = &task.task_parameters;

        let specs = TaskState::ALL
            .iter()
            .map(|state| StateSpec::new(*state, params.default_consecutive_count))
            .collect::<Result<Vec<_>, _>>()?;

        if !specs.iter().any(|spec| *spec.state() == FALLBACK_STATE) {
            return Err(ConfigError::UnknownState(FALLBACK_STATE.to_string()));
        }

        let prototype = ConsecutiveCountStateMachine::new(specs)?.starting_indeterminate();
        let state_machine = QuorumStateMachine::new(
            params.zone_quorum_count,
            move || -> Box<dyn StateHolder<TaskState>> { Box::new(prototype.clone()) },
        )?;

        debug!(
            task_id = %task.id,
            quorum = params.zone_quorum_count,
            consecutive_count = params.default_consecutive_count,
            "Built event processor context"
        );

        Ok(Self {
            task,
            state_machine,
            previous_input: None,
        })
    }

    pub fn task(&self) -> &EventEngineTask {
        &self.task
    }

    /// 上一次成功处理的采样
    pub fn previous_input(&self) -> Option<&EventProcessorInput> {
        self.previous_input.as_ref()
    }

    pub(crate) fn set_previous_input(&mut self, input: EventProcessorInput) {
        self.previous_input = Some(input);
    }

    /// 处理某个区域的候选状态
    pub fn process_zone_state(
        &mut self,
        zone: &str,
        state: TaskState,
    ) -> Result<Option<MultiStateTransition<TaskState, String>>, ConfigError> {
        self.state_machine.process(zone.to_string(), state)
    }

    pub fn overall_state(&self) -> Option<TaskState> {
        self.state_machine.overall_state().copied()
    }

    pub fn zone_state(&self, zone: &str) -> Option<TaskState> {
        self.state_machine.entry_state(&zone.to_string()).copied()
    }

    pub fn zone_states(&self) -> BTreeMap<String, Option<TaskState>> {
        self.state_machine.observations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_types::EventEngineTaskParameters;

    fn task(quorum: usize, consecutive: u32) -> EventEngineTask {
        EventEngineTask::new(
            "t-1",
            EventEngineTaskParameters {
                zone_quorum_count: quorum,
                default_consecutive_count: consecutive,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_from_task() {
        let ctx = EventProcessorContext::from_task(task(2, 3)).unwrap();
        assert!(ctx.previous_input().is_none());
        assert!(ctx.overall_state().is_none());
        assert!(ctx.zone_states().is_empty());
    }

    #[test]
    fn test_invalid_task_parameters() {
        assert_eq!(
            EventProcessorContext::from_task(task(0, 1)).err(),
            Some(ConfigError::InvalidQuorum)
        );
        assert!(matches!(
            EventProcessorContext::from_task(task(1, 0)).err(),
            Some(ConfigError::InvalidConsecutiveCount { count: 0, .. })
        ));
    }

    #[test]
    fn test_zones_start_indeterminate() {
        let mut ctx = EventProcessorContext::from_task(task(1, 2)).unwrap();

        assert_eq!(ctx.process_zone_state("west", TaskState::Ok).unwrap(), None);
        assert_eq!(ctx.zone_state("west"), None);

        let transition = ctx.process_zone_state("west", TaskState::Ok).unwrap().unwrap();
        assert_eq!(transition.overall.from, None);
        assert_eq!(transition.overall.to, TaskState::Ok);
        assert_eq!(ctx.zone_state("west"), Some(TaskState::Ok));
        assert_eq!(ctx.overall_state(), Some(TaskState::Ok));
    }
}
