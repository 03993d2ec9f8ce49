use crate::client::{Call, Outcome, UpstreamClient};
use crate::errors::UpstreamError;
use crate::metrics_defs::DISPATCH_FANOUT_SIZE;
use shared::histogram;
use std::collections::HashMap;
use tokio::task::JoinSet;

/// Issues a batch of upstream calls for one inbound request.
///
/// Outcomes come back in the order the calls were given, one per call. Every
/// call is bounded by its own upstream timeout, so the dispatcher always
/// returns once the slowest call has finished or timed out. A timed-out call
/// becomes a failure in its own slot and never affects its siblings.
#[derive(Clone)]
pub struct Dispatcher {
    client: UpstreamClient,
}

impl Dispatcher {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    /// Runs every call concurrently and waits for all of them.
    pub async fn dispatch(&self, calls: Vec<Call>) -> Vec<Outcome> {
        histogram!(DISPATCH_FANOUT_SIZE).record(calls.len() as f64);

        // Each task owns exactly one slot; slots are only read after the join below.
        let mut slots: Vec<Option<Outcome>> = (0..calls.len()).map(|_| None).collect();
        let mut join_set = JoinSet::new();
        let mut task_slots = HashMap::new();

        for (index, call) in calls.into_iter().enumerate() {
            let client = self.client.clone();
            let abort_handle =
                join_set.spawn(async move { (index, client.execute(&call).await) });
            task_slots.insert(abort_handle.id(), index);
        }

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_, (index, outcome))) => slots[index] = Some(outcome),
                Err(e) => {
                    tracing::error!("Upstream task panicked: {}", e);
                    if let Some(index) = task_slots.get(&e.id()) {
                        slots[*index] = Some(Err(UpstreamError::Internal(format!(
                            "upstream task failed: {e}"
                        ))));
                    }
                }
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(UpstreamError::Internal("upstream task lost".into())))
            })
            .collect()
    }
}
