use crate::context::EventProcessorContext;
use crate::error::{EventError, Result};
use crate::processor::{EventProcessor, StateChangeHandler};
use flux_types::{EventEngineTask, EventProcessorInput};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

/// 任务上下文注册表
///
/// 每个任务一把异步锁，同一任务的采样串行处理，不同任务之间互不阻塞。
pub struct EventProcessorRegistry {
    contexts: Arc<RwLock<HashMap<Uuid, Arc<Mutex<EventProcessorContext>>>>>,
    processor: EventProcessor,
}

impl EventProcessorRegistry {
    pub fn new() -> Self {
        Self {
            contexts: Arc::new(RwLock::new(HashMap::new())),
            processor: EventProcessor::new(),
        }
    }

    /// 注册任务；同一 id 已存在时替换其上下文（区域状态随之重置）
    pub async fn register_task(&self, task: EventEngineTask) -> Result<()> {
        let task_id = task.id;
        let name = task.name.clone();
        let context = EventProcessorContext::from_task(task)?;

        let mut contexts = self.contexts.write().await;
        let replaced = contexts
            .insert(task_id, Arc::new(Mutex::new(context)))
            .is_some();

        info!(task_id = %task_id, name = %name, replaced, "Registered event task");
        Ok(())
    }

    pub async fn remove_task(&self, task_id: &Uuid) -> bool {
        let removed = self.contexts.write().await.remove(task_id).is_some();
        if removed {
            info!(task_id = %task_id, "Removed event task");
        }
        removed
    }

    pub async fn task_ids(&self) -> Vec<Uuid> {
        self.contexts.read().await.keys().copied().collect()
    }

    pub async fn contains(&self, task_id: &Uuid) -> bool {
        self.contexts.read().await.contains_key(task_id)
    }

    /// 处理发往某个任务的采样
    pub async fn process<H>(
        &self,
        task_id: &Uuid,
        input: EventProcessorInput,
        handler: &mut H,
    ) -> Result<()>
    where
        H: StateChangeHandler + ?Sized,
    {
        let context = {
            let contexts = self.contexts.read().await;
            contexts
                .get(task_id)
                .cloned()
                .ok_or(EventError::UnknownTask(*task_id))?
        };

        let mut ctx = context.lock().await;
        self.processor.process(&mut ctx, input, handler)
    }
}

impl Default for EventProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statemachine::MultiStateTransition;
    use flux_types::{
        Comparator, ComparisonInput, EventEngineTaskParameters, Expression, StateExpression,
        TaskState,
    };

    fn task() -> EventEngineTask {
        EventEngineTask::new(
            "t-1",
            EventEngineTaskParameters {
                zone_quorum_count: 1,
                state_expressions: vec![StateExpression {
                    state: TaskState::Critical,
                    expression: Expression::comparison(
                        ComparisonInput::metric("usage"),
                        Comparator::GreaterThan,
                        90,
                    ),
                    message: None,
                }],
                ..Default::default()
            },
        )
    }

    fn input(usage: i64) -> EventProcessorInput {
        EventProcessorInput::new(chrono::Utc::now(), "west", Default::default())
            .with_metric("usage", usage)
    }

    #[tokio::test]
    async fn test_register_and_remove() {
        let registry = EventProcessorRegistry::new();
        let task = task();
        let id = task.id;

        registry.register_task(task).await.unwrap();
        assert!(registry.contains(&id).await);
        assert_eq!(registry.task_ids().await, vec![id]);

        assert!(registry.remove_task(&id).await);
        assert!(!registry.remove_task(&id).await);
        assert!(!registry.contains(&id).await);
    }

    #[tokio::test]
    async fn test_register_invalid_task() {
        let registry = EventProcessorRegistry::new();
        let mut task = task();
        task.task_parameters.zone_quorum_count = 0;

        let err = registry.register_task(task).await.unwrap_err();
        assert!(matches!(err, EventError::Config(_)));
        assert!(registry.task_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_process_routes_to_task() {
        let registry = EventProcessorRegistry::new();
        let task = task();
        let id = task.id;
        registry.register_task(task).await.unwrap();

        let mut states = Vec::new();
        let mut handler = |t: &MultiStateTransition<TaskState, String>, _: Option<&str>| {
            states.push(t.overall.to);
        };

        registry.process(&id, input(95), &mut handler).await.unwrap();
        registry.process(&id, input(10), &mut handler).await.unwrap();
        assert_eq!(states, vec![TaskState::Critical, TaskState::Ok]);
    }

    #[tokio::test]
    async fn test_process_unknown_task() {
        let registry = EventProcessorRegistry::new();
        let id = Uuid::new_v4();
        let mut handler = crate::processor::TracingStateChangeHandler;

        let err = registry.process(&id, input(1), &mut handler).await.unwrap_err();
        assert!(matches!(err, EventError::UnknownTask(unknown) if unknown == id));
    }

    #[tokio::test]
    async fn test_reregister_resets_state() {
        let registry = EventProcessorRegistry::new();
        let task = task();
        let id = task.id;
        registry.register_task(task.clone()).await.unwrap();

        let mut count = 0;
        let mut handler = |_: &MultiStateTransition<TaskState, String>, _: Option<&str>| count += 1;

        registry.process(&id, input(95), &mut handler).await.unwrap();
        registry.register_task(task).await.unwrap();
        registry.process(&id, input(95), &mut handler).await.unwrap();
        assert_eq!(count, 2);
    }
}
