//! Decision policy: rule table, Decision value and flow state machine.

pub mod decision;
pub mod engine;
pub mod flow;

pub use decision::{blocks, Decision, Priority};
pub use engine::{DecisionPolicy, PolicyError};
pub use flow::{FlowId, FlowStage};
