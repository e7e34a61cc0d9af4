/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the round state's
//! [configuration](crate::config::Configuration).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how an [AcceptVote](crate::events::AcceptVoteEvent) is printed:
//!
//! ```text
//! AcceptVote, 1701329264, Id5u7f6, 2, 17, Prepare, fNGCJyk
//! ```
//!
//! In the snippet:
//! - The third value is the first seven characters of the Base64 encoding of the signer's verifying key.
//! - The fourth and fifth values are the round and sequence numbers of the vote.
//! - The sixth value is the phase of the vote.
//! - The seventh value is the first seven characters of the Base64 encoding of the value voted for.
//!
//! Quorum anomalies and rejected snapshots are logged at the `warn` level. Every other event is logged
//! at the `info` level.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use std::{sync::Arc, time::SystemTime};

use crate::event_bus::HandlerPtr;
use crate::events::*;

// Names of each event in PascalCase for printing:
pub const ACCEPT_PRE_PREPARE: &str = "AcceptPrePrepare";
pub const ACCEPT_VOTE: &str = "AcceptVote";
pub const REJECT_VOTE: &str = "RejectVote";
pub const COLLECT_QUORUM: &str = "CollectQuorum";
pub const QUORUM_ANOMALY: &str = "QuorumAnomaly";
pub const UPDATE_VIEW: &str = "UpdateView";
pub const REJECT_SNAPSHOT: &str = "RejectSnapshot";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> HandlerPtr<Self>;
}

impl Logger for AcceptPrePrepareEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |accept_pre_prepare_event: &AcceptPrePrepareEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                ACCEPT_PRE_PREPARE,
                secs_since_unix_epoch(accept_pre_prepare_event.timestamp),
                accept_pre_prepare_event.view.round,
                accept_pre_prepare_event.view.sequence,
                first_seven_base64_chars(&accept_pre_prepare_event.proposal)
            )
        };
        Arc::new(logger)
    }
}

impl Logger for AcceptVoteEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |accept_vote_event: &AcceptVoteEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {:?}, {}",
                ACCEPT_VOTE,
                secs_since_unix_epoch(accept_vote_event.timestamp),
                first_seven_base64_chars(&accept_vote_event.signer.to_bytes()),
                accept_vote_event.view.round,
                accept_vote_event.view.sequence,
                accept_vote_event.phase,
                first_seven_base64_chars(&accept_vote_event.value)
            )
        };
        Arc::new(logger)
    }
}

impl Logger for RejectVoteEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |reject_vote_event: &RejectVoteEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {:?}, {}, {:?}",
                REJECT_VOTE,
                secs_since_unix_epoch(reject_vote_event.timestamp),
                first_seven_base64_chars(&reject_vote_event.signer.to_bytes()),
                reject_vote_event.view.round,
                reject_vote_event.view.sequence,
                reject_vote_event.phase,
                first_seven_base64_chars(&reject_vote_event.value),
                reject_vote_event.reason
            )
        };
        Arc::new(logger)
    }
}

impl Logger for CollectQuorumEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |collect_quorum_event: &CollectQuorumEvent| {
            log::info!(
                "{}, {}, {}, {}, {:?}, {}, {}",
                COLLECT_QUORUM,
                secs_since_unix_epoch(collect_quorum_event.timestamp),
                collect_quorum_event.view.round,
                collect_quorum_event.view.sequence,
                collect_quorum_event.phase,
                first_seven_base64_chars(&collect_quorum_event.value),
                collect_quorum_event.supporters
            )
        };
        Arc::new(logger)
    }
}

impl Logger for QuorumAnomalyEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |quorum_anomaly_event: &QuorumAnomalyEvent| {
            log::warn!(
                "{}, {}, {}, {}, {:?}, {}, {}",
                QUORUM_ANOMALY,
                secs_since_unix_epoch(quorum_anomaly_event.timestamp),
                quorum_anomaly_event.view.round,
                quorum_anomaly_event.view.sequence,
                quorum_anomaly_event.phase,
                first_seven_base64_chars(&quorum_anomaly_event.chosen),
                quorum_anomaly_event.contenders
            )
        };
        Arc::new(logger)
    }
}

impl Logger for UpdateViewEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |update_view_event: &UpdateViewEvent| {
            log::info!(
                "{}, {}, {}, {}",
                UPDATE_VIEW,
                secs_since_unix_epoch(update_view_event.timestamp),
                update_view_event.view.round,
                update_view_event.view.sequence
            )
        };
        Arc::new(logger)
    }
}

impl Logger for RejectSnapshotEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |reject_snapshot_event: &RejectSnapshotEvent| {
            log::warn!(
                "{}, {}, {}, {:?}",
                REJECT_SNAPSHOT,
                secs_since_unix_epoch(reject_snapshot_event.timestamp),
                reject_snapshot_event.len,
                reject_snapshot_event.cause
            )
        };
        Arc::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

// Clocks set before the Unix Epoch are printed as 0.
pub(crate) fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}
