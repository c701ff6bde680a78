use reputation_shared::types::{ReputationChangeKind, TargetType, VoteKind};

use crate::config::RepeatVotePolicy;
use crate::errors::VoteError;
use crate::voting::policy::vote_reputation;

/// Outcome of comparing the vote on record with the requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No vote on record: create one.
    Create { kind: VoteKind },
    /// A vote of the other kind is on record: change its kind in place.
    Flip { from: VoteKind, to: VoteKind },
    /// The same kind is on record and the retract policy is active.
    Retract { kind: VoteKind },
    /// The same kind is on record and the reject policy is active.
    RejectDuplicate { kind: VoteKind },
}

/// Write to perform on the vote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteWrite {
    Insert(VoteKind),
    UpdateKind(VoteKind),
    Delete,
}

/// Signed reputation change owed to the target's author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReputationDelta {
    pub kind: ReputationChangeKind,
    pub delta: i32,
    pub description: String,
}

/// Everything a non-rejected transition does to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteEffects {
    pub transition: Transition,
    pub write: VoteWrite,
    /// Amount to add to the target's `vote_count`.
    pub vote_count_delta: i32,
    pub reputation: ReputationDelta,
}

/// Pure decision logic for votes. Holds no state besides its policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoteStateMachine {
    policy: RepeatVotePolicy,
}

impl VoteStateMachine {
    pub fn new(policy: RepeatVotePolicy) -> Self {
        Self { policy }
    }

    /// Decides the transition for `requested` given the vote on record.
    pub fn decide(&self, existing: Option<VoteKind>, requested: VoteKind) -> Transition {
        match existing {
            None => Transition::Create { kind: requested },
            Some(current) if current != requested => Transition::Flip {
                from: current,
                to: requested,
            },
            Some(current) => match self.policy {
                RepeatVotePolicy::Reject => Transition::RejectDuplicate { kind: current },
                RepeatVotePolicy::Retract => Transition::Retract { kind: current },
            },
        }
    }

    /// Decides the transition and computes its effects on a target of
    /// `target_type`.
    ///
    /// # Errors
    ///
    /// Returns [`VoteError::DuplicateVote`] when the transition is
    /// [`Transition::RejectDuplicate`].
    pub fn plan(
        &self,
        target_type: TargetType,
        existing: Option<VoteKind>,
        requested: VoteKind,
    ) -> Result<VoteEffects, VoteError> {
        let transition = self.decide(existing, requested);
        transition.effects(target_type)
    }
}

impl Transition {
    /// Aggregate and reputation deltas of this transition.
    pub fn effects(self, target_type: TargetType) -> Result<VoteEffects, VoteError> {
        let weight = vote_reputation(target_type);
        let target = target_type.as_str();

        let (write, vote_count_delta, reputation) = match self {
            Transition::RejectDuplicate { kind } => return Err(VoteError::DuplicateVote(kind)),
            Transition::Create { kind } => (
                VoteWrite::Insert(kind),
                kind.sign(),
                ReputationDelta {
                    kind: created_kind(target_type, kind),
                    delta: kind.sign() * weight,
                    description: match kind {
                        VoteKind::Up => format!("{target} upvoted"),
                        VoteKind::Down => format!("{target} downvoted"),
                    },
                },
            ),
            Transition::Flip { to, .. } => (
                VoteWrite::UpdateKind(to),
                2 * to.sign(),
                ReputationDelta {
                    kind: match target_type {
                        TargetType::Question => ReputationChangeKind::QuestionVoteChanged,
                        TargetType::Answer => ReputationChangeKind::AnswerVoteChanged,
                    },
                    delta: 2 * to.sign() * weight,
                    description: format!("{target} vote changed to {to}"),
                },
            ),
            Transition::Retract { kind } => (
                VoteWrite::Delete,
                -kind.sign(),
                ReputationDelta {
                    kind: match target_type {
                        TargetType::Question => ReputationChangeKind::QuestionVoteRetracted,
                        TargetType::Answer => ReputationChangeKind::AnswerVoteRetracted,
                    },
                    delta: -kind.sign() * weight,
                    description: format!("{target} {kind} retracted"),
                },
            ),
        };

        Ok(VoteEffects {
            transition: self,
            write,
            vote_count_delta,
            reputation,
        })
    }
}

fn created_kind(target_type: TargetType, kind: VoteKind) -> ReputationChangeKind {
    match (target_type, kind) {
        (TargetType::Question, VoteKind::Up) => ReputationChangeKind::QuestionUpvoted,
        (TargetType::Question, VoteKind::Down) => ReputationChangeKind::QuestionDownvoted,
        (TargetType::Answer, VoteKind::Up) => ReputationChangeKind::AnswerUpvoted,
        (TargetType::Answer, VoteKind::Down) => ReputationChangeKind::AnswerDownvoted,
    }
}
