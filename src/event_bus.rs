/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Dispatches [events](crate::events) to the handlers registered for them.

use std::sync::Arc;

use crate::config::Configuration;
use crate::events::*;
use crate::logging::Logger;

/// Pointer to a handler closure. Handlers may be invoked from any thread that operates on a round state.
pub type HandlerPtr<T> = Arc<dyn Fn(&T) + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct EventHandlers {
    pub(crate) accept_pre_prepare_handlers: Vec<HandlerPtr<AcceptPrePrepareEvent>>,
    pub(crate) accept_vote_handlers: Vec<HandlerPtr<AcceptVoteEvent>>,
    pub(crate) reject_vote_handlers: Vec<HandlerPtr<RejectVoteEvent>>,
    pub(crate) collect_quorum_handlers: Vec<HandlerPtr<CollectQuorumEvent>>,
    pub(crate) quorum_anomaly_handlers: Vec<HandlerPtr<QuorumAnomalyEvent>>,
    pub(crate) update_view_handlers: Vec<HandlerPtr<UpdateViewEvent>>,
    pub(crate) reject_snapshot_handlers: Vec<HandlerPtr<RejectSnapshotEvent>>,
}

impl EventHandlers {
    /// Collect the handlers registered in `config`, preceded by the default logging handlers if
    /// `config.log_events` is set.
    pub(crate) fn new(config: &Configuration) -> EventHandlers {
        fn register<T: Logger>(
            handlers: &mut Vec<HandlerPtr<T>>,
            log_events: bool,
            user_handler: &Option<HandlerPtr<T>>,
        ) {
            if log_events {
                handlers.push(T::get_logger())
            }
            if let Some(handler) = user_handler {
                handlers.push(Arc::clone(handler))
            }
        }

        let mut event_handlers = EventHandlers::default();
        let log_events = config.log_events;

        register(
            &mut event_handlers.accept_pre_prepare_handlers,
            log_events,
            &config.on_accept_pre_prepare,
        );
        register(
            &mut event_handlers.accept_vote_handlers,
            log_events,
            &config.on_accept_vote,
        );
        register(
            &mut event_handlers.reject_vote_handlers,
            log_events,
            &config.on_reject_vote,
        );
        register(
            &mut event_handlers.collect_quorum_handlers,
            log_events,
            &config.on_collect_quorum,
        );
        register(
            &mut event_handlers.quorum_anomaly_handlers,
            log_events,
            &config.on_quorum_anomaly,
        );
        register(
            &mut event_handlers.update_view_handlers,
            log_events,
            &config.on_update_view,
        );
        register(
            &mut event_handlers.reject_snapshot_handlers,
            log_events,
            &config.on_reject_snapshot,
        );

        event_handlers
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::AcceptPrePrepare(accept_pre_prepare_event) => self
                .accept_pre_prepare_handlers
                .iter()
                .for_each(|handler| handler(&accept_pre_prepare_event)),

            Event::AcceptVote(accept_vote_event) => self
                .accept_vote_handlers
                .iter()
                .for_each(|handler| handler(&accept_vote_event)),

            Event::RejectVote(reject_vote_event) => self
                .reject_vote_handlers
                .iter()
                .for_each(|handler| handler(&reject_vote_event)),

            Event::CollectQuorum(collect_quorum_event) => self
                .collect_quorum_handlers
                .iter()
                .for_each(|handler| handler(&collect_quorum_event)),

            Event::QuorumAnomaly(quorum_anomaly_event) => self
                .quorum_anomaly_handlers
                .iter()
                .for_each(|handler| handler(&quorum_anomaly_event)),

            Event::UpdateView(update_view_event) => self
                .update_view_handlers
                .iter()
                .for_each(|handler| handler(&update_view_event)),

            Event::RejectSnapshot(reject_snapshot_event) => self
                .reject_snapshot_handlers
                .iter()
                .for_each(|handler| handler(&reject_snapshot_event)),
        }
    }

    pub(crate) fn fire_all(&self, events: Vec<Event>) {
        events
            .into_iter()
            .for_each(|event| self.fire_handlers(event))
    }
}
