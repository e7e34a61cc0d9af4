use std::sync::{Arc, Mutex};

use pbft_round_state::{
    config::Configuration,
    events::{RejectSnapshotCause, RejectVoteReason},
};

/// Records the names of the events emitted by round states built with its [configuration](Recorder::configuration).
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub(crate) fn new() -> Recorder {
        Recorder::default()
    }

    pub(crate) fn configuration(&self) -> Configuration {
        let (accept_pre_prepare, accept_vote, reject_vote, collect_quorum) =
            (self.clone(), self.clone(), self.clone(), self.clone());
        let (quorum_anomaly, update_view, reject_snapshot) = (self.clone(), self.clone(), self.clone());

        Configuration::builder()
            .on_accept_pre_prepare(move |_| accept_pre_prepare.push("AcceptPrePrepare".to_string()))
            .on_accept_vote(move |_| accept_vote.push("AcceptVote".to_string()))
            .on_reject_vote(move |event| reject_vote.push(reject_vote_name(event.reason)))
            .on_collect_quorum(move |event| {
                collect_quorum.push(format!("CollectQuorum({:?})", event.phase))
            })
            .on_quorum_anomaly(move |event| {
                quorum_anomaly.push(format!("QuorumAnomaly({})", event.contenders))
            })
            .on_update_view(move |_| update_view.push("UpdateView".to_string()))
            .on_reject_snapshot(move |event| {
                reject_snapshot.push(reject_snapshot_name(event.cause))
            })
            .build()
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|event| *event == name).count()
    }

    fn push(&self, name: String) {
        self.events.lock().unwrap().push(name)
    }
}

fn reject_vote_name(reason: RejectVoteReason) -> String {
    format!("RejectVote({:?})", reason)
}

fn reject_snapshot_name(cause: RejectSnapshotCause) -> String {
    format!("RejectSnapshot({:?})", cause)
}
