use crate::context::EventProcessorContext;
use crate::error::Result;
use crate::expression::ExpressionEvaluator;
use crate::interpolate::interpolate;
use crate::statemachine::MultiStateTransition;
use flux_types::{EventProcessorInput, TaskState};
use tracing::{debug, info};

/// 没有任何状态表达式匹配时的候选状态
pub const FALLBACK_STATE: TaskState = TaskState::Ok;

/// 总体状态变更回调
pub trait StateChangeHandler {
    fn handle_state_change(
        &mut self,
        transition: &MultiStateTransition<TaskState, String>,
        message: Option<&str>,
    );
}

impl<F> StateChangeHandler for F
where
    F: FnMut(&MultiStateTransition<TaskState, String>, Option<&str>),
{
    fn handle_state_change(
        &mut self,
        transition: &MultiStateTransition<TaskState, String>,
        message: Option<&str>,
    ) {
        self(transition, message)
    }
}

/// 通过 tracing 记录状态变更
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStateChangeHandler;

impl StateChangeHandler for TracingStateChangeHandler {
    fn handle_state_change(
        &mut self,
        transition: &MultiStateTransition<TaskState, String>,
        message: Option<&str>,
    ) {
        info!(
            from = ?transition.overall.from,
            to = %transition.overall.to,
            observations = ?transition.observations,
            message = message.unwrap_or(""),
            "Task state changed"
        );
    }
}

/// 事件处理器
///
/// 对每个采样：按声明顺序找出第一个成立的状态表达式作为候选状态，
/// 送入该区域的状态机；总体状态变化时渲染消息并回调。
#[derive(Debug, Default, Clone, Copy)]
pub struct EventProcessor;

impl EventProcessor {
    pub fn new() -> Self {
        Self
    }

    /// 处理一次采样
    ///
    /// 求值或状态机出错时直接返回错误，不会调用回调，也不会更新上一次采样。
    pub fn process<H>(
        &self,
        ctx: &mut EventProcessorContext,
        input: EventProcessorInput,
        handler: &mut H,
    ) -> Result<()>
    where
        H: StateChangeHandler + ?Sized,
    {
        let (state, template) = self.candidate_state(ctx, &input)?;

        debug!(
            task_id = %ctx.task().id,
            zone = %input.zone,
            candidate = %state,
            "Evaluated sample"
        );

        if let Some(transition) = ctx.process_zone_state(&input.zone, state)? {
            let message = interpolate(template.as_deref(), &input.metrics);
            handler.handle_state_change(&transition, message.as_deref());
        }

        ctx.set_previous_input(input);
        Ok(())
    }

    /// 候选状态及其消息模板
    pub fn candidate_state(
        &self,
        ctx: &EventProcessorContext,
        input: &EventProcessorInput,
    ) -> Result<(TaskState, Option<String>)> {
        let evaluator = ExpressionEvaluator::new(input, ctx.previous_input());

        for state_expression in &ctx.task().task_parameters.state_expressions {
            if evaluator.evaluate(&state_expression.expression)? {
                return Ok((state_expression.state, state_expression.message.clone()));
            }
        }

        Ok((FALLBACK_STATE, None))
    }
}
