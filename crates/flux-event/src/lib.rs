pub mod context;
pub mod error;
pub mod expression;
pub mod interpolate;
pub mod processor;
pub mod registry;
pub mod statemachine;

pub use context::EventProcessorContext;
pub use error::{ConfigError, EvaluationError, EventError, Result};
pub use expression::{evaluate, ExpressionEvaluator};
pub use interpolate::interpolate;
pub use processor::{EventProcessor, StateChangeHandler, TracingStateChangeHandler, FALLBACK_STATE};
pub use registry::EventProcessorRegistry;
pub use statemachine::{
    ConsecutiveCountStateMachine, LatchingStateHolder, MultiStateTransition, QuorumStateMachine,
    StateHolder, StateHolderFactory, StateSpec, StateTransition,
};
