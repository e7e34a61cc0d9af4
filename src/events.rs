/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events a [`RoundState`](crate::round::state::RoundState) emits, for event handling
//! and logging.
//!
//! An event for a given action indicates that the action has been completed (or, for the "Reject"
//! events, refused). Events are only fired after the round state has released its lock, so handlers are
//! free to call back into the round state.
//!
//! Values carried by events are in their canonical (Borsh) encoding, so that handlers do not need to
//! know the type of value being agreed upon.

use std::time::SystemTime;

use crate::round::types::Phase;
use crate::types::{basic::View, validators::VerifyingKey};

pub enum Event {
    AcceptPrePrepare(AcceptPrePrepareEvent),
    AcceptVote(AcceptVoteEvent),
    RejectVote(RejectVoteEvent),
    CollectQuorum(CollectQuorumEvent),
    QuorumAnomaly(QuorumAnomalyEvent),
    UpdateView(UpdateViewEvent),
    RejectSnapshot(RejectSnapshotEvent),
}

/// A proposal was accepted from a PRE-PREPARE message.
pub struct AcceptPrePrepareEvent {
    pub timestamp: SystemTime,
    pub view: View,
    pub proposal: Vec<u8>,
}

/// A vote was recorded.
pub struct AcceptVoteEvent {
    pub timestamp: SystemTime,
    pub signer: VerifyingKey,
    pub view: View,
    pub phase: Phase,
    pub value: Vec<u8>,
}

/// A vote was refused.
pub struct RejectVoteEvent {
    pub timestamp: SystemTime,
    pub signer: VerifyingKey,
    pub view: View,
    pub phase: Phase,
    pub value: Vec<u8>,
    pub reason: RejectVoteReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectVoteReason {
    /// The vote is for a different view than the round state's.
    ViewMismatch,

    /// The signer is not in the validator set.
    UnknownValidator,

    /// The signer already voted for the same value.
    DuplicateVote,

    /// The signer already voted for a different value.
    ConflictingVote,
}

/// A phase reached a quorum for the first time.
pub struct CollectQuorumEvent {
    pub timestamp: SystemTime,
    pub view: View,
    pub phase: Phase,
    pub value: Vec<u8>,
    pub supporters: usize,
}

/// More than one value reached a quorum in a phase. `chosen` is the value reported as the phase's
/// majority.
pub struct QuorumAnomalyEvent {
    pub timestamp: SystemTime,
    pub view: View,
    pub phase: Phase,
    pub chosen: Vec<u8>,
    pub contenders: usize,
}

/// The round or sequence number was set.
pub struct UpdateViewEvent {
    pub timestamp: SystemTime,
    pub view: View,
}

/// A byte sequence failed to decode into a round state.
pub struct RejectSnapshotEvent {
    pub timestamp: SystemTime,
    pub len: usize,
    pub cause: RejectSnapshotCause,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectSnapshotCause {
    TooLarge,
    MalformedEncoding,
    InvariantViolation,
}
