//! Majority quorum register
//!
//! Single-writer ABD-style register: a read collects a majority of tagged
//! values and keeps the one with the highest tag; a write first reads to learn
//! the highest tag `t`, then broadcasts its value under `t + 1` and waits for
//! a majority of acknowledgements.
//!
//! # Invariants
//!
//! 1. **Majority of discovered**: quorum is `n / 2 + 1` where `n` counts every
//!    discovered replica, including the ones that could not be contacted.
//! 2. **Max tag wins**: a read returns the value carried by the highest tag
//!    among the replicas that answered, never a value from a silent replica.
//! 3. **Bounded wait**: every round ends at its deadline; outstanding requests
//!    are dropped once quorum is reached or the deadline passes.
//!
//! Two writers racing on the same key can both read tag `t` and both write
//! `t + 1`. Callers serialize writers per key.
//!
//! A write that reaches quorum on a strict subset of replicas leaves the rest
//! stale. They are not repaired; the next read's max-tag selection hides them.

use crate::replica::{
    RegisterReplica, ReplicaDiscovery, ReplicaFailure, ReplicaSetSnapshot, Versioned,
};
use binas_core::{BinasError, Result, Tag};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

type KeyOf<D> = <<D as ReplicaDiscovery>::Replica as RegisterReplica>::Key;
type ValueOf<D> = <<D as ReplicaDiscovery>::Replica as RegisterReplica>::Value;

/// Majority size for `discovered` replicas
pub fn quorum_size(discovered: usize) -> usize {
    discovered / 2 + 1
}

/// Outcome of a quorum read or write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumResult<V> {
    /// Highest tag read, or the tag just written
    pub tag: Tag,
    /// Value carried by `tag`; `None` when no respondent stored the key
    pub value: Option<V>,
    /// Responses (reads) or acknowledgements (writes) counted toward quorum
    pub responses: usize,
    /// Size of the replica snapshot
    pub discovered: usize,
    /// Replicas excluded from this round and why
    pub failures: Vec<ReplicaFailure>,
}

struct Gathered<T> {
    responses: Vec<(String, T)>,
    failures: Vec<ReplicaFailure>,
}

/// Wait for a majority of `calls` to succeed, or give up.
///
/// Fails early once the calls still pending cannot make up the missing
/// responses. Returning drops the remaining calls.
async fn gather<T, F>(
    calls: Vec<(String, F)>,
    discovered: usize,
    mut failures: Vec<ReplicaFailure>,
    deadline: Instant,
    round: &'static str,
) -> Result<Gathered<T>>
where
    F: Future<Output = Result<T>>,
{
    let quorum = quorum_size(discovered);
    let mut pending: FuturesUnordered<_> = calls
        .into_iter()
        .map(|(replica, call)| async move { (replica, call.await) })
        .collect();
    let mut responses = Vec::with_capacity(quorum);

    let unreachable = |responded: usize| BinasError::QuorumUnreachable {
        discovered,
        quorum,
        responded,
    };

    while responses.len() < quorum {
        if responses.len() + pending.len() < quorum {
            tracing::warn!(
                round,
                discovered,
                quorum,
                responded = responses.len(),
                excluded = failures.len(),
                "Quorum cannot be reached"
            );
            return Err(unreachable(responses.len()));
        }

        match tokio::time::timeout_at(deadline, pending.next()).await {
            Ok(Some((replica, Ok(value)))) => {
                tracing::debug!(round, replica = %replica, "Replica responded");
                responses.push((replica, value));
            }
            Ok(Some((replica, Err(error)))) => {
                if error.is_replica_fault() {
                    tracing::debug!(round, replica = %replica, error = %error, "Excluding replica");
                } else {
                    tracing::warn!(round, replica = %replica, error = %error, "Unexpected replica error, excluding");
                }
                failures.push(ReplicaFailure { replica, error });
            }
            Ok(None) => return Err(unreachable(responses.len())),
            Err(_) => {
                tracing::warn!(
                    round,
                    discovered,
                    quorum,
                    responded = responses.len(),
                    outstanding = pending.len(),
                    "Quorum round timed out"
                );
                return Err(unreachable(responses.len()));
            }
        }
    }

    Ok(Gathered {
        responses,
        failures,
    })
}

/// Tag-versioned register replicated over a freshly discovered replica set.
#[derive(Debug)]
pub struct QuorumRegister<D> {
    discovery: D,
    timeout: Duration,
}

impl<D> QuorumRegister<D>
where
    D: ReplicaDiscovery,
{
    /// Create a register; each round waits at most `timeout`
    pub fn new(discovery: D, timeout: Duration) -> Self {
        Self { discovery, timeout }
    }

    /// Replica discovery used for every operation
    pub fn discovery(&self) -> &D {
        &self.discovery
    }

    /// Per-round deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Read the latest value of `key` from a majority.
    pub async fn read(&self, key: &KeyOf<D>) -> Result<QuorumResult<ValueOf<D>>> {
        let snapshot = self.discovery.discover().await?;
        self.read_snapshot(&snapshot, key).await
    }

    /// Write `value` under the next tag and wait for a majority to accept it.
    ///
    /// Both the internal read and the broadcast use the same snapshot, each
    /// bounded by its own deadline.
    pub async fn write(
        &self,
        key: &KeyOf<D>,
        value: ValueOf<D>,
    ) -> Result<QuorumResult<ValueOf<D>>> {
        let snapshot = self.discovery.discover().await?;
        let current = self.read_snapshot(&snapshot, key).await?;
        let tag = current.tag + 1;

        let (ready, failures) = snapshot.partition();
        let calls = ready
            .into_iter()
            .map(|replica| {
                (
                    replica.replica_id().to_string(),
                    replica.write(key, &value, tag),
                )
            })
            .collect();
        let deadline = Instant::now() + self.timeout;
        let gathered = gather(calls, snapshot.len(), failures, deadline, "write").await?;

        tracing::info!(
            key = ?key,
            tag,
            acks = gathered.responses.len(),
            discovered = snapshot.len(),
            "Quorum write committed"
        );

        Ok(QuorumResult {
            tag,
            value: Some(value),
            responses: gathered.responses.len(),
            discovered: snapshot.len(),
            failures: gathered.failures,
        })
    }

    async fn read_snapshot(
        &self,
        snapshot: &ReplicaSetSnapshot<D::Replica>,
        key: &KeyOf<D>,
    ) -> Result<QuorumResult<ValueOf<D>>> {
        let (ready, failures) = snapshot.partition();
        let calls = ready
            .into_iter()
            .map(|replica| (replica.replica_id().to_string(), replica.read(key)))
            .collect();
        let deadline = Instant::now() + self.timeout;
        let gathered = gather(calls, snapshot.len(), failures, deadline, "read").await?;

        let responses = gathered.responses.len();
        let latest = gathered
            .responses
            .into_iter()
            .map(|(_, versioned)| versioned)
            .max_by_key(|versioned| versioned.tag)
            .unwrap_or_else(Versioned::absent);

        tracing::debug!(key = ?key, tag = latest.tag, responses, "Quorum read");

        Ok(QuorumResult {
            tag: latest.tag,
            value: latest.value,
            responses,
            discovered: snapshot.len(),
            failures: gathered.failures,
        })
    }
}
