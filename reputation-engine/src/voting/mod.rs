//! Vote state machine and the reputation policy it applies.
pub mod policy;
mod state_machine;

pub use state_machine::{ReputationDelta, Transition, VoteEffects, VoteStateMachine, VoteWrite};
