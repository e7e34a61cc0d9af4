/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-round state of a Practical Byzantine Fault Tolerant (PBFT) consensus engine.
//!
//! This crate tracks, for one (round, sequence) pair, the proposed value and the votes that validators
//! cast for it in the PREPARE, COMMIT, and CHECKPOINT phases. It answers whether a phase has collected a
//! quorum of matching votes, and encodes its state canonically so that every replica holding the same
//! state produces the same bytes.
//!
//! Networking, signature verification, validator set management, and the state machine that decides when
//! to start or abandon a round all live outside of this crate.
//!
//! ## Getting started
//!
//! ```no_run
//! use ed25519_dalek::SigningKey;
//! use pbft_round_state::round::{messages::{PrePrepare, Vote}, state::RoundState, types::Phase};
//! use pbft_round_state::types::{basic::*, validators::ValidatorSet};
//! # let keys: Vec<SigningKey> = Vec::new();
//!
//! let view = View::new(RoundNumber::init(), SequenceNumber::new(1));
//! let validator_set = ValidatorSet::new(keys.iter().map(|k| k.verifying_key()));
//! let round_state: RoundState<u64> = RoundState::new(view, validator_set);
//!
//! round_state.accept_pre_prepare(PrePrepare::new(view, 42)).unwrap();
//! for key in &keys {
//!     let _ = round_state.add_vote(&key.verifying_key(), Vote::prepare(view, 42));
//! }
//! if let Some(majority) = round_state.two_thirds_majority(Phase::Prepare) {
//!     println!("prepared {}", majority.value);
//! }
//! ```

pub mod config;

pub mod events;

pub mod round;

pub mod types;

pub(crate) mod event_bus;

pub(crate) mod logging;

pub use event_bus::HandlerPtr;
