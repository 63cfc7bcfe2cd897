use flux_event::{
    EventError, EventProcessor, EventProcessorContext, EventProcessorRegistry,
    MultiStateTransition,
};
use flux_types::{
    Comparator, ComparisonInput, EventEngineTask, EventEngineTaskParameters, EventProcessorInput,
    Expression, StateExpression, TaskState,
};
use std::collections::HashMap;

const WARNING_MESSAGE: &str = "usage getting too high";

type Seen = Vec<(Option<TaskState>, TaskState, Option<String>)>;

/// CRITICAL: usage > 75 或 idle <= 10；WARNING: usage > 50；法定数 2，连续次数 1
fn build_task() -> EventEngineTask {
    let params = EventEngineTaskParameters {
        metric_group: "cpu".to_string(),
        label_selector: HashMap::from([
            ("resource_id".to_string(), "r-1".to_string()),
            ("monitor_id".to_string(), "m-1".to_string()),
        ]),
        zone_label: "monitoring_zone_id".to_string(),
        zone_quorum_count: 2,
        default_consecutive_count: 1,
        state_expressions: vec![
            StateExpression {
                state: TaskState::Critical,
                expression: Expression::or(vec![
                    Expression::comparison(
                        ComparisonInput::metric("usage"),
                        Comparator::GreaterThan,
                        75,
                    ),
                    Expression::comparison(
                        ComparisonInput::metric("idle"),
                        Comparator::LessThanOrEqualTo,
                        10,
                    ),
                ]),
                message: Some(
                    "Usage of #{usage} is too high or idle of #{idle} is too low".to_string(),
                ),
            },
            StateExpression {
                state: TaskState::Warning,
                expression: Expression::comparison(
                    ComparisonInput::metric("usage"),
                    Comparator::GreaterThan,
                    50,
                ),
                message: Some(WARNING_MESSAGE.to_string()),
            },
        ],
    };
    EventEngineTask::new("t-1", params)
}

fn build_input(timestamp: &str, zone: &str, usage: i64, idle: i64) -> EventProcessorInput {
    EventProcessorInput::new(timestamp.parse().unwrap(), zone, HashMap::new())
        .with_metric("usage", usage)
        .with_metric("idle", idle)
}

/// 处理一个采样，返回本次触发的回调
fn process_next(
    processor: &EventProcessor,
    ctx: &mut EventProcessorContext,
    input: EventProcessorInput,
) -> Seen {
    let mut seen = Seen::new();
    let mut handler = |t: &MultiStateTransition<TaskState, String>, message: Option<&str>| {
        seen.push((t.overall.from, t.overall.to, message.map(str::to_string)));
    };
    processor.process(ctx, input, &mut handler).unwrap();
    seen
}

fn called(from: Option<TaskState>, to: TaskState, message: Option<&str>) -> Seen {
    vec![(from, to, message.map(str::to_string))]
}

/// 两个区域、法定数 2 的完整状态变化过程
#[test]
fn test_process_scenario() {
    let processor = EventProcessor::new();
    let mut ctx = EventProcessorContext::from_task(build_task()).unwrap();

    // 初始状态不确定
    let seen = process_next(&processor, &mut ctx, build_input("2007-12-03T10:15:30Z", "public/west", 25, 50));
    assert!(seen.is_empty());

    let seen = process_next(&processor, &mut ctx, build_input("2007-12-03T10:15:31Z", "public/east", 31, 50));
    assert_eq!(seen, called(None, TaskState::Ok, None));

    let seen = process_next(&processor, &mut ctx, build_input("2007-12-03T10:15:32Z", "public/west", 60, 50));
    assert!(seen.is_empty());

    let seen = process_next(&processor, &mut ctx, build_input("2007-12-03T10:15:33Z", "public/east", 61, 50));
    assert_eq!(seen, called(Some(TaskState::Ok), TaskState::Warning, Some(WARNING_MESSAGE)));

    let seen = process_next(&processor, &mut ctx, build_input("2007-12-03T10:15:34Z", "public/west", 90, 50));
    assert!(seen.is_empty());

    let seen = process_next(&processor, &mut ctx, build_input("2007-12-03T10:15:35Z", "public/east", 91, 50));
    assert_eq!(
        seen,
        called(
            Some(TaskState::Warning),
            TaskState::Critical,
            Some("Usage of 91 is too high or idle of 50 is too low"),
        )
    );

    let seen = process_next(&processor, &mut ctx, build_input("2007-12-03T10:15:36Z", "public/west", 65, 50));
    assert!(seen.is_empty());

    let seen = process_next(&processor, &mut ctx, build_input("2007-12-03T10:15:37Z", "public/east", 66, 50));
    assert_eq!(seen, called(Some(TaskState::Critical), TaskState::Warning, Some(WARNING_MESSAGE)));

    let seen = process_next(&processor, &mut ctx, build_input("2007-12-03T10:15:38Z", "public/west", 65, 10));
    assert!(seen.is_empty());

    let seen = process_next(&processor, &mut ctx, build_input("2007-12-03T10:15:39Z", "public/east", 66, 9));
    assert_eq!(
        seen,
        called(
            Some(TaskState::Warning),
            TaskState::Critical,
            Some("Usage of 66 is too high or idle of 9 is too low"),
        )
    );

    assert_eq!(ctx.overall_state(), Some(TaskState::Critical));
    assert_eq!(ctx.zone_state("public/west"), Some(TaskState::Critical));
    assert_eq!(ctx.zone_state("public/east"), Some(TaskState::Critical));
}

/// 快照中包含所有区域的当前状态
#[test]
fn test_transition_observations() {
    let processor = EventProcessor::new();
    let mut ctx = EventProcessorContext::from_task(build_task()).unwrap();

    let mut observed = Vec::new();
    let mut handler = |t: &MultiStateTransition<TaskState, String>, _: Option<&str>| {
        observed.push(t.observations.clone());
    };

    processor
        .process(&mut ctx, build_input("2007-12-03T10:15:30Z", "public/west", 90, 50), &mut handler)
        .unwrap();
    processor
        .process(&mut ctx, build_input("2007-12-03T10:15:31Z", "public/east", 10, 50), &mut handler)
        .unwrap();
    processor
        .process(&mut ctx, build_input("2007-12-03T10:15:32Z", "public/south", 95, 50), &mut handler)
        .unwrap();

    assert_eq!(observed.len(), 1);
    let snapshot = &observed[0];
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot["public/west"], Some(TaskState::Critical));
    assert_eq!(snapshot["public/east"], Some(TaskState::Ok));
    assert_eq!(snapshot["public/south"], Some(TaskState::Critical));
}

/// 求值出错时不回调、不更新上一次采样
#[test]
fn test_evaluation_error_preserves_previous_sample() {
    let processor = EventProcessor::new();
    let mut ctx = EventProcessorContext::from_task(build_task()).unwrap();

    let first = build_input("2007-12-03T10:15:30Z", "public/west", 25, 50);
    process_next(&processor, &mut ctx, first.clone());
    assert_eq!(ctx.previous_input(), Some(&first));

    let mut calls = 0;
    let mut handler = |_: &MultiStateTransition<TaskState, String>, _: Option<&str>| calls += 1;

    let bad = EventProcessorInput::new("2007-12-03T10:15:31Z".parse().unwrap(), "public/east", HashMap::new())
        .with_metric("usage", "high")
        .with_metric("idle", 50);
    let err = processor.process(&mut ctx, bad, &mut handler).unwrap_err();

    assert!(matches!(err, EventError::Evaluation(_)));
    assert_eq!(calls, 0);
    assert_eq!(ctx.previous_input(), Some(&first));
    assert_eq!(ctx.zone_state("public/east"), None);
}

/// 变化率表达式使用上一次成功处理的采样
#[test]
fn test_rate_expression_uses_previous_sample() {
    let params = EventEngineTaskParameters {
        state_expressions: vec![StateExpression {
            state: TaskState::Critical,
            expression: Expression::comparison(
                ComparisonInput::Rate {
                    of: "errors".to_string(),
                },
                Comparator::GreaterThanOrEqualTo,
                3,
            ),
            message: Some("errors rising to #{errors}".to_string()),
        }],
        ..Default::default()
    };
    let processor = EventProcessor::new();
    let mut ctx = EventProcessorContext::from_task(EventEngineTask::new("t-1", params)).unwrap();

    let sample = |ts: &str, errors: i64| {
        EventProcessorInput::new(ts.parse().unwrap(), "west", HashMap::new()).with_metric("errors", errors)
    };

    // 没有上一次采样，变化率为空
    let seen = process_next(&processor, &mut ctx, sample("2020-01-01T00:00:00Z", 10));
    assert_eq!(seen, called(None, TaskState::Ok, None));

    let seen = process_next(&processor, &mut ctx, sample("2020-01-01T00:00:05Z", 25));
    assert_eq!(
        seen,
        called(Some(TaskState::Ok), TaskState::Critical, Some("errors rising to 25"))
    );
}

/// 通过注册表处理，未知任务返回错误
#[tokio::test]
async fn test_registry_scenario() {
    let registry = EventProcessorRegistry::new();
    let task = build_task();
    let task_id = task.id;
    registry.register_task(task).await.unwrap();

    let mut seen = Seen::new();
    let mut handler = |t: &MultiStateTransition<TaskState, String>, message: Option<&str>| {
        seen.push((t.overall.from, t.overall.to, message.map(str::to_string)));
    };

    registry
        .process(&task_id, build_input("2007-12-03T10:15:30Z", "public/west", 90, 50), &mut handler)
        .await
        .unwrap();
    registry
        .process(&task_id, build_input("2007-12-03T10:15:31Z", "public/east", 91, 50), &mut handler)
        .await
        .unwrap();

    let unknown = uuid::Uuid::new_v4();
    let err = registry
        .process(&unknown, build_input("2007-12-03T10:15:32Z", "public/east", 91, 50), &mut handler)
        .await
        .unwrap_err();
    assert!(matches!(err, EventError::UnknownTask(id) if id == unknown));

    assert_eq!(
        seen,
        called(
            None,
            TaskState::Critical,
            Some("Usage of 91 is too high or idle of 50 is too low"),
        )
    );
}
