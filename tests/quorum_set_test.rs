/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Tests for the vote counting rules of [`QuorumSet`]: one vote per validator, votes only from the
//! validator set, and a majority only once `2f + 1` validators agree.

mod common;

use std::sync::Arc;

use pbft_round_state::round::types::{AddVoteError, InvariantViolation, Majority, QuorumSet};

use common::validators::{validator_set, verifying_keys};

const X: u64 = 1;
const Y: u64 = 2;

#[test]
fn four_validator_scenario() {
    // A, B, C, D: f = 1, Q = 3.
    let (keys, validator_set) = validator_set(4);
    let (a, b, c, d) = (&keys[0], &keys[1], &keys[2], &keys[3]);
    let mut votes: QuorumSet<u64> = QuorumSet::new(Arc::new(validator_set));
    assert_eq!(votes.quorum(), 3);

    votes.add(a, X).unwrap();
    votes.add(b, X).unwrap();
    assert_eq!(votes.two_thirds_majority(), None);

    votes.add(c, X).unwrap();
    assert_eq!(
        votes.two_thirds_majority(),
        Some(Majority {
            value: X,
            supporters: 3,
            violation: None
        })
    );

    votes.add(d, Y).unwrap();
    assert_eq!(votes.two_thirds_majority().map(|m| m.value), Some(X));

    assert_eq!(
        votes.add(b, Y),
        Err(AddVoteError::AlreadyVoted { conflicting: true })
    );
    assert_eq!(votes.get(b), Some(&X));
    assert_eq!(votes.two_thirds_majority().map(|m| m.value), Some(X));
}

#[test]
fn empty_quorum_set_has_no_majority() {
    let (_, validator_set) = validator_set(4);
    let votes: QuorumSet<u64> = QuorumSet::new(Arc::new(validator_set));
    assert_eq!(votes.size(), 0);
    assert_eq!(votes.two_thirds_majority(), None);
    assert!(votes.values().is_empty());
}

#[test]
fn first_vote_wins() {
    let (keys, validator_set) = validator_set(4);
    let mut votes: QuorumSet<u64> = QuorumSet::new(Arc::new(validator_set));

    votes.add(&keys[0], 1).unwrap();
    for value in 2..10 {
        assert_eq!(
            votes.add(&keys[0], value),
            Err(AddVoteError::AlreadyVoted { conflicting: true })
        );
    }

    assert_eq!(votes.size(), 1);
    assert_eq!(votes.values().get(&keys[0].to_bytes()), Some(&1));
    assert!(votes.has_voted(&keys[0]));
    assert!(!votes.has_voted(&keys[1]));
}

#[test]
fn votes_from_unknown_validators_are_rejected() {
    let (keys, validator_set) = validator_set(4);
    let outsiders = verifying_keys(3);
    let mut votes: QuorumSet<u64> = QuorumSet::new(Arc::new(validator_set));
    votes.add(&keys[0], 1).unwrap();

    for outsider in &outsiders {
        assert_eq!(votes.add(outsider, 1), Err(AddVoteError::UnknownValidator));
        assert_eq!(votes.size(), 1);
        assert!(!votes.has_voted(outsider));
    }
}

#[test]
fn majority_is_stable_under_up_to_f_byzantine_votes() {
    // n = 10: f = 3, Q = 7.
    let (keys, validator_set) = validator_set(10);
    let mut votes: QuorumSet<u64> = QuorumSet::new(Arc::new(validator_set));
    for key in &keys[..7] {
        votes.add(key, 100).unwrap();
    }
    let majority = votes.two_thirds_majority().unwrap();

    for (i, key) in keys[7..].iter().enumerate() {
        votes.add(key, 200 + i as u64).unwrap();
        assert_eq!(votes.two_thirds_majority().as_ref(), Some(&majority));
    }
    assert_eq!(votes.size(), 10);
}

#[test]
fn votes_iterate_in_ascending_key_order() {
    let (keys, validator_set) = validator_set(7);
    let mut votes: QuorumSet<u64> = QuorumSet::new(Arc::new(validator_set));
    for (i, key) in keys.iter().enumerate() {
        votes.add(key, i as u64).unwrap();
    }

    let voters: Vec<[u8; 32]> = votes.iter().map(|(voter, _)| *voter).collect();
    let mut sorted = voters.clone();
    sorted.sort();
    assert_eq!(voters, sorted);
}

#[test]
fn conflicting_quorums_are_flagged_and_resolved_deterministically() {
    // n = 6: f = 1, Q = 3, so two disjoint groups of three can both reach a quorum.
    let (keys, validator_set) = validator_set(6);
    let mut votes: QuorumSet<u64> = QuorumSet::new(Arc::new(validator_set));
    for key in &keys[..3] {
        votes.add(key, 513).unwrap();
    }
    for key in &keys[3..] {
        votes.add(key, 2).unwrap();
    }

    // Borsh encodes u64s as little endian: 513 is [1, 2, 0, ..] and 2 is [2, 0, ..].
    let majority = votes.two_thirds_majority().unwrap();
    assert_eq!(majority.value, 513);
    assert_eq!(majority.supporters, 3);
    assert!(majority.is_anomalous());
    assert_eq!(
        majority.violation,
        Some(InvariantViolation::ConflictingQuorums { contenders: 2 })
    );
}

#[test]
fn conflicting_quorums_in_the_smallest_validator_sets() {
    // n = 2 tolerates no faults, so every vote is a quorum on its own.
    let (keys, validator_set) = validator_set(2);
    let mut votes: QuorumSet<u64> = QuorumSet::new(Arc::new(validator_set));
    votes.add(&keys[0], 7).unwrap();
    assert!(!votes.two_thirds_majority().unwrap().is_anomalous());

    votes.add(&keys[1], 6).unwrap();
    let majority = votes.two_thirds_majority().unwrap();
    assert_eq!(majority.value, 6);
    assert!(majority.is_anomalous());
}
