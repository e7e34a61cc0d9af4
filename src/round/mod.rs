/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-round state of the PBFT protocol.
//!
//! For every (round, sequence) pair that the outer state machine works on, a [`RoundState`](state::RoundState)
//! stores:
//! 1. The proposal accepted from the round's PRE-PREPARE, if any.
//! 2. Three [`QuorumSet`](types::QuorumSet)s, one each for the PREPARE, COMMIT, and CHECKPOINT votes.
//!
//! The state machine hands authenticated messages to the round state, and polls
//! [`two_thirds_majority`](state::RoundState::two_thirds_majority) to decide when to move to the next phase.
//!
//! ## Quorums
//!
//! A validator set of `n` validators tolerates `f = (n - 1) / 3` faulty validators. A value is certified
//! in a phase once `2f + 1` distinct validators have voted for it in that phase.
//!
//! ## Persistence
//!
//! Round states can be encoded into, and decoded from, a [canonical byte sequence](codec). This crate does
//! not write these bytes anywhere.

pub mod codec;

pub mod messages;

pub mod state;

pub mod types;
