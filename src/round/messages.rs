/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Messages that a [`RoundState`](super::state::RoundState) accepts.
//!
//! These messages reach the round state only after their senders have been authenticated, so they carry
//! no signatures. The signer of a [`Vote`] is passed alongside it.

use borsh::{BorshDeserialize, BorshSerialize};

use super::types::{Phase, Value};
use crate::types::basic::View;

/// Proposes `proposal` as the value to agree on in `view`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PrePrepare<V: Value> {
    pub view: View,
    pub proposal: V,
}

impl<V: Value> PrePrepare<V> {
    pub fn new(view: View, proposal: V) -> Self {
        Self { view, proposal }
    }
}

/// A PREPARE, COMMIT, or CHECKPOINT vote for `value` in `view`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Vote<V: Value> {
    pub view: View,
    pub phase: Phase,
    pub value: V,
}

impl<V: Value> Vote<V> {
    pub fn new(view: View, phase: Phase, value: V) -> Self {
        Self { view, phase, value }
    }

    pub fn prepare(view: View, value: V) -> Self {
        Self::new(view, Phase::Prepare, value)
    }

    pub fn commit(view: View, value: V) -> Self {
        Self::new(view, Phase::Commit, value)
    }

    pub fn checkpoint(view: View, value: V) -> Self {
        Self::new(view, Phase::Checkpoint, value)
    }
}
