/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! User-defined parameters shared by the [round states](crate::round::state::RoundState) of a consensus
//! engine.

use std::sync::Arc;
use typed_builder::TypedBuilder;

use crate::event_bus::HandlerPtr;
use crate::events::*;

/// Upper bound on the length of an encoded round state accepted by [`decode`] by default: 16 MiB.
///
/// [`decode`]: crate::round::state::RoundState::decode
pub const DEFAULT_MAX_SNAPSHOT_BYTES: usize = 16 * 1024 * 1024;

/// Stores the parameters of round states, that is:
/// 1. Whether events should be logged.
/// 2. The maximum length of a byte sequence that decoding will attempt to parse.
/// 3. Handlers to be invoked when round states emit [events](crate::events).
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Optional:
    - `.log_events(...)`
    - `.max_snapshot_bytes(...)`
    - `.on_accept_pre_prepare(...)`
    - `.on_accept_vote(...)`
    - `.on_reject_vote(...)`
    - `.on_collect_quorum(...)`
    - `.on_quorum_anomaly(...)`
    - `.on_update_view(...)`
    - `.on_reject_snapshot(...)`
"))]
pub struct Configuration {
    #[builder(default = true, setter(doc = "Enable logging? Defaults to true."))]
    pub log_events: bool,
    #[builder(
        default = DEFAULT_MAX_SNAPSHOT_BYTES,
        setter(doc = "Set the maximum length of a byte sequence that decoding will attempt to parse. Defaults to [DEFAULT_MAX_SNAPSHOT_BYTES].")
    )]
    pub max_snapshot_bytes: usize,
    #[builder(default, setter(transform = |handler: impl Fn(&AcceptPrePrepareEvent) + Send + Sync + 'static| Some(Arc::new(handler) as HandlerPtr<AcceptPrePrepareEvent>),
    doc = "Register a handler closure to be invoked after a proposal is accepted. Optional."))]
    pub on_accept_pre_prepare: Option<HandlerPtr<AcceptPrePrepareEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&AcceptVoteEvent) + Send + Sync + 'static| Some(Arc::new(handler) as HandlerPtr<AcceptVoteEvent>),
    doc = "Register a handler closure to be invoked after a vote is recorded. Optional."))]
    pub on_accept_vote: Option<HandlerPtr<AcceptVoteEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&RejectVoteEvent) + Send + Sync + 'static| Some(Arc::new(handler) as HandlerPtr<RejectVoteEvent>),
    doc = "Register a handler closure to be invoked after a vote is refused. Optional."))]
    pub on_reject_vote: Option<HandlerPtr<RejectVoteEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CollectQuorumEvent) + Send + Sync + 'static| Some(Arc::new(handler) as HandlerPtr<CollectQuorumEvent>),
    doc = "Register a handler closure to be invoked after a phase first reaches a quorum. Optional."))]
    pub on_collect_quorum: Option<HandlerPtr<CollectQuorumEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&QuorumAnomalyEvent) + Send + Sync + 'static| Some(Arc::new(handler) as HandlerPtr<QuorumAnomalyEvent>),
    doc = "Register a handler closure to be invoked after more than one value reaches a quorum in a phase. Optional."))]
    pub on_quorum_anomaly: Option<HandlerPtr<QuorumAnomalyEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&UpdateViewEvent) + Send + Sync + 'static| Some(Arc::new(handler) as HandlerPtr<UpdateViewEvent>),
    doc = "Register a handler closure to be invoked after the round or sequence number is set. Optional."))]
    pub on_update_view: Option<HandlerPtr<UpdateViewEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&RejectSnapshotEvent) + Send + Sync + 'static| Some(Arc::new(handler) as HandlerPtr<RejectSnapshotEvent>),
    doc = "Register a handler closure to be invoked after a byte sequence fails to decode into a round state. Optional."))]
    pub on_reject_snapshot: Option<HandlerPtr<RejectSnapshotEvent>>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::builder().build()
    }
}
