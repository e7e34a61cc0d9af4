/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Canonical encoding of round states.
//!
//! A round state encodes as the Borsh encoding of the tuple:
//!
//! ```text
//! (round, sequence, proposal?, prepares, commits, checkpoints)
//! ```
//!
//! where each quorum set encodes as its validator set (verifying keys in ascending order of their bytes)
//! followed by its votes (`(verifying key, value)` pairs in ascending order of the verifying keys' bytes).
//!
//! Replicas holding logically identical round states therefore produce identical bytes, regardless of
//! the order in which they received votes. This makes the encoding suitable for hashing, which
//! [`RoundState::hash`](super::state::RoundState::hash) does.
//!
//! Decoding is strict: trailing bytes, unsorted or repeated keys, invalid keys, votes from outside
//! the validator set, and quorum sets that disagree on the validator set are all rejected, so that a corrupt snapshot is never adopted as consensus state.

use std::{collections::BTreeMap, io, sync::Arc};

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256 as CryptoHasher};

use super::state::RoundStateSnapshot;
use super::types::{InvariantViolation, QuorumSet, Value};
use crate::events::RejectSnapshotCause;
use crate::types::{
    basic::{CryptoHash, RoundNumber, SequenceNumber},
    validators::{ValidatorSet, ValidatorSetBytes, ValidatorSetBytesError, VerifyingKeyBytes},
};

/// Intermediate representation of [`QuorumSet`] for safe serialization and deserialization.
#[derive(Clone, BorshSerialize, BorshDeserialize)]
pub(crate) struct QuorumSetBytes<V: Value> {
    validator_set: ValidatorSetBytes,
    // Strictly ascending by verifying key bytes.
    votes: Vec<(VerifyingKeyBytes, V)>,
}

impl<V: Value> From<&QuorumSet<V>> for QuorumSetBytes<V> {
    fn from(value: &QuorumSet<V>) -> Self {
        QuorumSetBytes {
            validator_set: value.validator_set().into(),
            votes: value
                .iter()
                .map(|(validator, vote)| (*validator, vote.clone()))
                .collect(),
        }
    }
}

impl<V: Value> QuorumSetBytes<V> {
    // Convert into a quorum set over `validator_set`, which must be the checked form of
    // `self.validator_set`.
    fn into_quorum_set(
        self,
        validator_set: Arc<ValidatorSet>,
    ) -> Result<QuorumSet<V>, InvariantViolation> {
        if !self.votes.windows(2).all(|pair| pair[0].0 < pair[1].0) {
            return Err(InvariantViolation::VotesNotCanonical);
        }

        let mut votes = BTreeMap::new();
        for (validator, vote) in self.votes {
            if !validator_set.contains_bytes(&validator) {
                return Err(InvariantViolation::VoteFromNonMember { validator });
            }
            votes.insert(validator, vote);
        }

        Ok(QuorumSet::from_parts(validator_set, votes))
    }
}

impl From<ValidatorSetBytesError> for InvariantViolation {
    fn from(value: ValidatorSetBytesError) -> Self {
        match value {
            ValidatorSetBytesError::NotCanonical => InvariantViolation::ValidatorSetNotCanonical,
            ValidatorSetBytesError::InvalidVerifyingKey { key } => {
                InvariantViolation::InvalidValidatorKey { key }
            }
        }
    }
}

/// Intermediate representation of [`RoundStateSnapshot`] for safe serialization and deserialization.
#[derive(Clone, BorshSerialize, BorshDeserialize)]
pub(crate) struct RoundStateBytes<V: Value> {
    round: RoundNumber,
    sequence: SequenceNumber,
    proposal: Option<V>,
    prepares: QuorumSetBytes<V>,
    commits: QuorumSetBytes<V>,
    checkpoints: QuorumSetBytes<V>,
}

impl<V: Value> From<&RoundStateSnapshot<V>> for RoundStateBytes<V> {
    fn from(value: &RoundStateSnapshot<V>) -> Self {
        RoundStateBytes {
            round: value.round,
            sequence: value.sequence,
            proposal: value.proposal.clone(),
            prepares: (&value.prepares).into(),
            commits: (&value.commits).into(),
            checkpoints: (&value.checkpoints).into(),
        }
    }
}

impl<V: Value> TryFrom<RoundStateBytes<V>> for RoundStateSnapshot<V> {
    type Error = InvariantViolation;

    fn try_from(value: RoundStateBytes<V>) -> Result<Self, Self::Error> {
        // The three phases of a round count votes against one validator set.
        if value.commits.validator_set != value.prepares.validator_set
            || value.checkpoints.validator_set != value.prepares.validator_set
        {
            return Err(InvariantViolation::ValidatorSetsDiffer);
        }
        let validator_set = Arc::new(ValidatorSet::try_from(value.prepares.validator_set.clone())?);

        Ok(RoundStateSnapshot {
            round: value.round,
            sequence: value.sequence,
            proposal: value.proposal,
            prepares: value.prepares.into_quorum_set(Arc::clone(&validator_set))?,
            commits: value.commits.into_quorum_set(Arc::clone(&validator_set))?,
            checkpoints: value.checkpoints.into_quorum_set(validator_set)?,
        })
    }
}

impl<V: Value> RoundStateBytes<V> {
    pub(crate) fn encode(&self) -> io::Result<Vec<u8>> {
        self.try_to_vec()
    }
}

/// Decode `bytes` into a snapshot, refusing to parse inputs longer than `max_len`.
pub(crate) fn decode<V: Value>(
    bytes: &[u8],
    max_len: usize,
) -> Result<RoundStateSnapshot<V>, DecodeError> {
    if bytes.len() > max_len {
        return Err(DecodeError::SnapshotTooLarge {
            len: bytes.len(),
            limit: max_len,
        });
    }

    let round_state_bytes = RoundStateBytes::<V>::try_from_slice(bytes)?;
    Ok(RoundStateSnapshot::try_from(round_state_bytes)?)
}

/// SHA256 hash of an encoded round state.
pub(crate) fn hash(encoding: &[u8]) -> CryptoHash {
    let mut hasher = CryptoHasher::new();
    hasher.update(encoding);
    CryptoHash::new(hasher.finalize().into())
}

/// Enumerates the ways decoding a round state can fail.
#[derive(Debug)]
pub enum DecodeError {
    /// The byte sequence is longer than the configured
    /// [`max_snapshot_bytes`](crate::config::Configuration::max_snapshot_bytes).
    SnapshotTooLarge { len: usize, limit: usize },

    /// The byte sequence is not a Borsh encoding of a round state: it is truncated, has trailing bytes, or
    /// has fields of the wrong shape.
    MalformedEncoding(io::Error),

    /// The byte sequence is well-formed, but describes a round state that breaks one of its invariants.
    InvariantViolation(InvariantViolation),
}

impl DecodeError {
    pub(crate) fn cause(&self) -> RejectSnapshotCause {
        match self {
            DecodeError::SnapshotTooLarge { .. } => RejectSnapshotCause::TooLarge,
            DecodeError::MalformedEncoding(_) => RejectSnapshotCause::MalformedEncoding,
            DecodeError::InvariantViolation(_) => RejectSnapshotCause::InvariantViolation,
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(value: io::Error) -> Self {
        DecodeError::MalformedEncoding(value)
    }
}

impl From<InvariantViolation> for DecodeError {
    fn from(value: InvariantViolation) -> Self {
        DecodeError::InvariantViolation(value)
    }
}
