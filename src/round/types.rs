/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of types specific to collecting votes within a round: the [`QuorumSet`] and the
//! [`Majority`] it reports.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    sync::Arc,
};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::validators::{ValidatorSet, VerifyingKey, VerifyingKeyBytes};

/// A value that validators can propose and vote for.
///
/// Values are compared for equality when tallying votes, and their Borsh encoding is used both in the
/// canonical encoding of a round state and to break ties between values.
pub trait Value: Clone + Eq + BorshSerialize + BorshDeserialize + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + Eq + BorshSerialize + BorshDeserialize + Send + Sync + 'static {}

/// The Borsh encoding of `value`.
pub(crate) fn canonical_bytes<V: BorshSerialize>(value: &V) -> Vec<u8> {
    // Serializing into a Vec only fails if a user-provided BorshSerialize impl fails.
    value.try_to_vec().unwrap_or_else(|err| {
        log::warn!("Failed to serialize a value, using empty bytes in its place: {}", err);
        Vec::new()
    })
}

/// The vote phases of PBFT. Each phase collects its votes in a separate [`QuorumSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum Phase {
    Prepare,
    Commit,
    Checkpoint,
}

/// Accumulates at most one vote per validator from a given [validator set](ValidatorSet), and reports
/// whether a value has been voted for by a quorum of them.
///
/// ## First vote wins
///
/// A correct validator casts exactly one vote per phase per round. A validator that sends a second vote
/// is therefore faulty, and its second vote is rejected with [`AddVoteError::AlreadyVoted`] instead of
/// replacing the first. This stops a faulty validator from withdrawing support for a value that may
/// already have been counted towards a quorum.
///
/// ## Ordering of votes
///
/// Votes are kept in ascending order of the voters' verifying key bytes, so that iterating through them,
/// and therefore encoding them, gives the same result on every replica.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuorumSet<V: Value> {
    validator_set: Arc<ValidatorSet>,
    votes: BTreeMap<VerifyingKeyBytes, V>,
}

impl<V: Value> QuorumSet<V> {
    /// Create an empty `QuorumSet` accepting votes from the members of `validator_set`.
    pub fn new(validator_set: Arc<ValidatorSet>) -> Self {
        Self {
            validator_set,
            votes: BTreeMap::new(),
        }
    }

    /// Create a `QuorumSet` out of already checked parts. Every key in `votes` must be a member of
    /// `validator_set`.
    pub(crate) fn from_parts(
        validator_set: Arc<ValidatorSet>,
        votes: BTreeMap<VerifyingKeyBytes, V>,
    ) -> Self {
        Self {
            validator_set,
            votes,
        }
    }

    /// Record that `validator` voted for `value`.
    ///
    /// Fails without changing the quorum set if `validator` is not in the validator set, or if it has
    /// already voted.
    pub fn add(&mut self, validator: &VerifyingKey, value: V) -> Result<(), AddVoteError> {
        if !self.validator_set.contains(validator) {
            return Err(AddVoteError::UnknownValidator);
        }

        match self.votes.entry(validator.to_bytes()) {
            Entry::Occupied(existing) => Err(AddVoteError::AlreadyVoted {
                conflicting: *existing.get() != value,
            }),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    /// Get the number of distinct validators that have voted, for any value.
    pub fn size(&self) -> usize {
        self.votes.len()
    }

    /// Get the vote recorded for `validator`, if it has voted.
    pub fn get(&self, validator: &VerifyingKey) -> Option<&V> {
        self.votes.get(&validator.to_bytes())
    }

    /// Check whether `validator` has voted.
    pub fn has_voted(&self, validator: &VerifyingKey) -> bool {
        self.votes.contains_key(&validator.to_bytes())
    }

    /// Get the validator set this quorum set accepts votes from.
    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validator_set
    }

    /// Get the number of matching votes a value needs to count as certified.
    pub fn quorum(&self) -> usize {
        self.validator_set.quorum()
    }

    /// Get a copy of every recorded vote, keyed by the voter's verifying key bytes.
    pub fn values(&self) -> BTreeMap<VerifyingKeyBytes, V> {
        self.votes.clone()
    }

    /// Iterate through the recorded votes in ascending order of the voters' verifying key bytes.
    pub fn iter(&self) -> impl Iterator<Item = (&VerifyingKeyBytes, &V)> {
        self.votes.iter()
    }

    /// Get the value with the most supporters, if it is supported by at least a [quorum](Self::quorum) of
    /// validators.
    ///
    /// If more than one value reaches a quorum, the one with the most supporters is returned, and among
    /// those with equally many, the one with the lexicographically smallest Borsh encoding. The returned
    /// [`Majority`] then carries [`InvariantViolation::ConflictingQuorums`], since two quorums for different
    /// values can only form if the validator set's fault assumption was broken.
    pub fn two_thirds_majority(&self) -> Option<Majority<V>> {
        let mut tallies: Vec<(&V, usize)> = Vec::new();
        for value in self.votes.values() {
            match tallies.iter_mut().find(|(tallied, _)| *tallied == value) {
                Some((_, supporters)) => *supporters += 1,
                None => tallies.push((value, 1)),
            }
        }

        let quorum = self.quorum();
        let mut contenders: Vec<(&V, usize)> = tallies
            .into_iter()
            .filter(|(_, supporters)| *supporters >= quorum)
            .collect();

        match contenders.len() {
            0 => None,
            1 => {
                let (value, supporters) = contenders[0];
                Some(Majority {
                    value: value.clone(),
                    supporters,
                    violation: None,
                })
            }
            n => {
                contenders.sort_by_cached_key(|(value, supporters)| {
                    (std::cmp::Reverse(*supporters), canonical_bytes(*value))
                });
                let (value, supporters) = contenders[0];
                Some(Majority {
                    value: value.clone(),
                    supporters,
                    violation: Some(InvariantViolation::ConflictingQuorums { contenders: n }),
                })
            }
        }
    }
}

/// A value that has been voted for by at least a quorum of validators in a [`QuorumSet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Majority<V> {
    /// The certified value.
    pub value: V,

    /// How many distinct validators voted for `value`.
    pub supporters: usize,

    /// Set if more than one value reached a quorum. Callers should log this: it is never expected
    /// under a correct validator set.
    pub violation: Option<InvariantViolation>,
}

impl<V> Majority<V> {
    /// Check whether the majority was chosen among conflicting quorums.
    pub fn is_anomalous(&self) -> bool {
        self.violation.is_some()
    }
}

/// Enumerates the ways a [`QuorumSet::add`] call can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddVoteError {
    /// The voter is not a member of the quorum set's validator set.
    UnknownValidator,

    /// The voter already has a recorded vote. `conflicting` is set if the rejected vote was for a
    /// different value than the recorded one, which is evidence that the voter is faulty.
    AlreadyVoted { conflicting: bool },
}

/// States that should be structurally impossible in a consensus round. Encountering one means that a
/// round state was corrupted, or that the validator set was miscomputed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// More than one value reached a quorum in the same quorum set.
    ConflictingQuorums { contenders: usize },

    /// A validator set lists a key that is not a valid Ed25519 verifying key.
    InvalidValidatorKey { key: VerifyingKeyBytes },

    /// A validator set does not list its validators in strictly ascending order.
    ValidatorSetNotCanonical,

    /// A quorum set does not list its votes in strictly ascending order of the voters' keys.
    VotesNotCanonical,

    /// A quorum set contains a vote from a validator outside of its validator set.
    VoteFromNonMember { validator: VerifyingKeyBytes },

    /// The quorum sets of a round state do not all count votes against the same validator set.
    ValidatorSetsDiffer,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand_core::OsRng;

    fn quorum_set(n: usize) -> (Vec<VerifyingKey>, QuorumSet<u64>) {
        let keys: Vec<VerifyingKey> = (0..n)
            .map(|_| SigningKey::generate(&mut OsRng).verifying_key())
            .collect();
        let validator_set = Arc::new(ValidatorSet::new(keys.clone()));
        (keys, QuorumSet::new(validator_set))
    }

    #[test]
    fn repeated_vote_for_the_same_value_is_not_conflicting() {
        let (keys, mut votes) = quorum_set(4);
        votes.add(&keys[0], 7).unwrap();
        assert_eq!(
            votes.add(&keys[0], 7),
            Err(AddVoteError::AlreadyVoted { conflicting: false })
        );
        assert_eq!(
            votes.add(&keys[0], 8),
            Err(AddVoteError::AlreadyVoted { conflicting: true })
        );
        assert_eq!(votes.size(), 1);
    }

    #[test]
    fn majority_requires_a_quorum() {
        let (keys, mut votes) = quorum_set(7);
        for key in &keys[..4] {
            votes.add(key, 1).unwrap();
        }
        assert_eq!(votes.two_thirds_majority(), None);

        votes.add(&keys[4], 1).unwrap();
        assert_eq!(
            votes.two_thirds_majority(),
            Some(Majority {
                value: 1,
                supporters: 5,
                violation: None
            })
        );
    }

    struct Unserializable;

    impl BorshSerialize for Unserializable {
        fn serialize<W: std::io::Write>(&self, _writer: &mut W) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "unserializable"))
        }
    }

    #[test]
    fn failed_serialization_falls_back_to_empty_bytes() {
        assert_eq!(canonical_bytes(&Unserializable), Vec::<u8>::new());
        assert_eq!(canonical_bytes(&513u64), vec![1, 2, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn conflicting_quorums_prefer_the_best_supported_value() {
        // n = 3 tolerates no faults, so a single vote is a quorum.
        let (keys, mut votes) = quorum_set(3);
        votes.add(&keys[0], 9).unwrap();
        votes.add(&keys[1], 2).unwrap();
        votes.add(&keys[2], 2).unwrap();

        let majority = votes.two_thirds_majority().unwrap();
        assert_eq!(majority.value, 2);
        assert_eq!(majority.supporters, 2);
        assert_eq!(
            majority.violation,
            Some(InvariantViolation::ConflictingQuorums { contenders: 2 })
        );
    }
}
