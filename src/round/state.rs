/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`RoundState`]: everything a validator tracks about one (round, sequence) pair.
//!
//! ## Locking
//!
//! Every operation on a `RoundState` takes its lock for the duration of a single read or write, and never
//! across a call to an event handler. Individual operations are therefore atomic with respect to each
//! other, but sequences of operations are not: reading [`round`](RoundState::round) and then
//! [`sequence`](RoundState::sequence) may observe a `set_round` in between. Callers that need several
//! fields to be consistent with each other should use [`view`](RoundState::view) or
//! [`snapshot`](RoundState::snapshot).
//!
//! ## Lifecycle
//!
//! A `RoundState` is created when the outer state machine begins a new (round, sequence), and dropped once
//! that round is superseded or finalized. Its quorum sets are never carried over to another round, so
//! votes from an abandoned round cannot count towards a later one.

use std::{
    collections::BTreeMap,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::SystemTime,
};

use super::{
    codec::{self, DecodeError, RoundStateBytes},
    messages::{PrePrepare, Vote},
    types::{canonical_bytes, AddVoteError, InvariantViolation, Majority, Phase, QuorumSet, Value},
};
use crate::config::Configuration;
use crate::event_bus::EventHandlers;
use crate::events::*;
use crate::types::{
    basic::{CryptoHash, RoundNumber, SequenceNumber, View},
    validators::{ValidatorSet, VerifyingKey, VerifyingKeyBytes},
};

/// Thread-safe state of one consensus round.
///
/// `RoundState` is `Sync`, and is meant to be shared between the threads that handle messages, fire
/// timers, and persist state, e.g., by wrapping it in an [`Arc`].
pub struct RoundState<V: Value> {
    inner: Mutex<RoundStateSnapshot<V>>,
    event_handlers: EventHandlers,
}

/// An owned copy of every field of a [`RoundState`], taken at a single point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundStateSnapshot<V: Value> {
    pub round: RoundNumber,
    pub sequence: SequenceNumber,
    /// Set by the first accepted PRE-PREPARE, and never changed afterwards.
    pub proposal: Option<V>,
    pub prepares: QuorumSet<V>,
    pub commits: QuorumSet<V>,
    pub checkpoints: QuorumSet<V>,
}

impl<V: Value> RoundStateSnapshot<V> {
    fn new(view: View, validator_set: ValidatorSet) -> Self {
        let validator_set = Arc::new(validator_set);
        Self {
            round: view.round,
            sequence: view.sequence,
            proposal: None,
            prepares: QuorumSet::new(Arc::clone(&validator_set)),
            commits: QuorumSet::new(Arc::clone(&validator_set)),
            checkpoints: QuorumSet::new(validator_set),
        }
    }

    pub fn view(&self) -> View {
        View::new(self.round, self.sequence)
    }

    /// Get the quorum set that collects votes of `phase`.
    pub fn quorum_set(&self, phase: Phase) -> &QuorumSet<V> {
        match phase {
            Phase::Prepare => &self.prepares,
            Phase::Commit => &self.commits,
            Phase::Checkpoint => &self.checkpoints,
        }
    }

    fn quorum_set_mut(&mut self, phase: Phase) -> &mut QuorumSet<V> {
        match phase {
            Phase::Prepare => &mut self.prepares,
            Phase::Commit => &mut self.commits,
            Phase::Checkpoint => &mut self.checkpoints,
        }
    }

    /// Get the [canonical encoding](super::codec) of this snapshot.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        RoundStateBytes::from(self).encode()
    }
}

impl<V: Value> RoundState<V> {
    /// Create a round state for `view` with no proposal and no votes, accepting votes from the members of
    /// `validator_set`, and logging its events.
    pub fn new(view: View, validator_set: ValidatorSet) -> Self {
        Self::with_configuration(view, validator_set, &Configuration::default())
    }

    /// Create a round state for `view` with no proposal and no votes, accepting votes from the members of
    /// `validator_set`.
    pub fn with_configuration(view: View, validator_set: ValidatorSet, config: &Configuration) -> Self {
        Self {
            inner: Mutex::new(RoundStateSnapshot::new(view, validator_set)),
            event_handlers: EventHandlers::new(config),
        }
    }

    /// Get the accepted proposal, if a PRE-PREPARE has been accepted.
    pub fn proposal(&self) -> Option<V> {
        self.lock().proposal.clone()
    }

    /// Set the round number. The caller is responsible for never decreasing it.
    pub fn set_round(&self, round: RoundNumber) {
        let view = {
            let mut inner = self.lock();
            inner.round = round;
            inner.view()
        };
        self.fire_update_view(view);
    }

    pub fn round(&self) -> RoundNumber {
        self.lock().round
    }

    /// Set the sequence number.
    pub fn set_sequence(&self, sequence: SequenceNumber) {
        let view = {
            let mut inner = self.lock();
            inner.sequence = sequence;
            inner.view()
        };
        self.fire_update_view(view);
    }

    pub fn sequence(&self) -> SequenceNumber {
        self.lock().sequence
    }

    /// Get the round and sequence numbers, read together.
    pub fn view(&self) -> View {
        self.lock().view()
    }

    /// Store the proposal carried by `pre_prepare`.
    ///
    /// Fails without changing the round state if `pre_prepare` is for a different view, or if a proposal
    /// has already been accepted.
    pub fn accept_pre_prepare(&self, pre_prepare: PrePrepare<V>) -> Result<(), RoundStateError> {
        {
            let mut inner = self.lock();
            let current = inner.view();
            if pre_prepare.view != current {
                return Err(RoundStateError::ViewMismatch {
                    current,
                    received: pre_prepare.view,
                });
            }
            if inner.proposal.is_some() {
                return Err(RoundStateError::ProposalAlreadyAccepted);
            }
            inner.proposal = Some(pre_prepare.proposal.clone());
        }

        self.event_handlers
            .fire_handlers(Event::AcceptPrePrepare(AcceptPrePrepareEvent {
                timestamp: SystemTime::now(),
                view: pre_prepare.view,
                proposal: canonical_bytes(&pre_prepare.proposal),
            }));
        Ok(())
    }

    /// Record `vote`, cast by `signer`, in the quorum set of the vote's phase.
    ///
    /// `signer` must already have been authenticated as the sender of `vote`. Fails without changing the
    /// round state if the vote is for a different view, if `signer` is not in the validator set, or if
    /// `signer` already voted in that phase.
    pub fn add_vote(&self, signer: &VerifyingKey, vote: Vote<V>) -> Result<(), RoundStateError> {
        let Vote { view, phase, value } = vote;
        let value_bytes = canonical_bytes(&value);
        let mut events = Vec::new();

        let result = {
            let mut inner = self.lock();
            let current = inner.view();
            if view != current {
                Err(RoundStateError::ViewMismatch {
                    current,
                    received: view,
                })
            } else {
                let quorum_set = inner.quorum_set_mut(phase);
                let before = quorum_set.two_thirds_majority();
                match quorum_set.add(signer, value) {
                    Ok(()) => {
                        events.push(Event::AcceptVote(AcceptVoteEvent {
                            timestamp: SystemTime::now(),
                            signer: *signer,
                            view,
                            phase,
                            value: value_bytes.clone(),
                        }));
                        if let Some(after) = quorum_set.two_thirds_majority() {
                            events.extend(quorum_events(view, phase, before.as_ref(), &after));
                        }
                        Ok(())
                    }
                    Err(err) => Err(RoundStateError::from(err)),
                }
            }
        };

        if let Err(err) = &result {
            let reason = match err {
                RoundStateError::AddVoteError(err) => RejectVoteReason::from(*err),
                _ => RejectVoteReason::ViewMismatch,
            };
            events.push(Event::RejectVote(RejectVoteEvent {
                timestamp: SystemTime::now(),
                signer: *signer,
                view,
                phase,
                value: value_bytes,
                reason,
            }));
        }

        self.event_handlers.fire_all(events);
        result
    }

    /// Get the value voted for by a quorum of validators in `phase`, if any.
    pub fn two_thirds_majority(&self, phase: Phase) -> Option<Majority<V>> {
        self.lock().quorum_set(phase).two_thirds_majority()
    }

    /// Get the number of distinct validators that voted in `phase`.
    pub fn vote_count(&self, phase: Phase) -> usize {
        self.lock().quorum_set(phase).size()
    }

    /// Get a copy of the votes recorded in `phase`.
    pub fn votes(&self, phase: Phase) -> BTreeMap<VerifyingKeyBytes, V> {
        self.lock().quorum_set(phase).values()
    }

    /// Get a copy of every field, taken under a single acquisition of the lock.
    pub fn snapshot(&self) -> RoundStateSnapshot<V> {
        self.lock().clone()
    }

    /// Get the [canonical encoding](super::codec) of the round state.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let round_state_bytes = RoundStateBytes::from(&*self.lock());
        round_state_bytes.encode()
    }

    /// Get the SHA256 hash of the [canonical encoding](super::codec) of the round state.
    pub fn hash(&self) -> io::Result<CryptoHash> {
        Ok(codec::hash(&self.encode()?))
    }

    /// Decode a round state from its canonical encoding, logging its events.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::decode_with_configuration(bytes, &Configuration::default())
    }

    /// Decode a round state from its canonical encoding.
    ///
    /// The returned round state has a lock of its own, and can be shared between threads right away.
    pub fn decode_with_configuration(bytes: &[u8], config: &Configuration) -> Result<Self, DecodeError> {
        let event_handlers = EventHandlers::new(config);
        match codec::decode(bytes, config.max_snapshot_bytes) {
            Ok(snapshot) => Ok(Self {
                inner: Mutex::new(snapshot),
                event_handlers,
            }),
            Err(err) => {
                event_handlers.fire_handlers(Event::RejectSnapshot(RejectSnapshotEvent {
                    timestamp: SystemTime::now(),
                    len: bytes.len(),
                    cause: err.cause(),
                }));
                Err(err)
            }
        }
    }

    // Critical sections only read or assign fields, so a panic in another thread cannot have left the
    // state half-written.
    fn lock(&self) -> MutexGuard<'_, RoundStateSnapshot<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire_update_view(&self, view: View) {
        self.event_handlers
            .fire_handlers(Event::UpdateView(UpdateViewEvent {
                timestamp: SystemTime::now(),
                view,
            }))
    }
}

// Events caused by a vote that left `phase` with the majority `after`, where `before` was its majority
// prior to the vote.
fn quorum_events<V: Value>(
    view: View,
    phase: Phase,
    before: Option<&Majority<V>>,
    after: &Majority<V>,
) -> Vec<Event> {
    let mut events = Vec::new();

    if before.is_none() {
        events.push(Event::CollectQuorum(CollectQuorumEvent {
            timestamp: SystemTime::now(),
            view,
            phase,
            value: canonical_bytes(&after.value),
            supporters: after.supporters,
        }));
    }

    if let Some(InvariantViolation::ConflictingQuorums { contenders }) = &after.violation {
        if !before.map_or(false, |before| before.is_anomalous()) {
            events.push(Event::QuorumAnomaly(QuorumAnomalyEvent {
                timestamp: SystemTime::now(),
                view,
                phase,
                chosen: canonical_bytes(&after.value),
                contenders: *contenders,
            }));
        }
    }

    events
}

/// Enumerates the ways a call to [`RoundState`]'s mutating methods can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStateError {
    /// The message is for a different (round, sequence) than the round state's.
    ViewMismatch { current: View, received: View },

    /// A PRE-PREPARE arrived after a proposal had already been accepted.
    ProposalAlreadyAccepted,

    /// See: [`AddVoteError`].
    AddVoteError(AddVoteError),
}

impl From<AddVoteError> for RejectVoteReason {
    fn from(value: AddVoteError) -> Self {
        match value {
            AddVoteError::UnknownValidator => RejectVoteReason::UnknownValidator,
            AddVoteError::AlreadyVoted { conflicting: false } => RejectVoteReason::DuplicateVote,
            AddVoteError::AlreadyVoted { conflicting: true } => RejectVoteReason::ConflictingVote,
        }
    }
}

impl From<AddVoteError> for RoundStateError {
    fn from(value: AddVoteError) -> Self {
        RoundStateError::AddVoteError(value)
    }
}
