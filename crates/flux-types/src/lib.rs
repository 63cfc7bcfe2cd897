pub mod input;
pub mod kapacitor;
pub mod task;

pub use input::{EventProcessorInput, MetricValue};
pub use kapacitor::{KapacitorEvent, KapacitorIdError, KapacitorTaskFields};
pub use task::{
    Comparator, ComparisonExpression, ComparisonInput, ComparisonValue, EventEngineTask,
    EventEngineTaskParameters, Expression, LogicalExpression, LogicalOperator, StateExpression,
    TaskState,
};
