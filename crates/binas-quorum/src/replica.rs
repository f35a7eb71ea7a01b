//! Replica abstraction and per-operation replica snapshots

use async_trait::async_trait;
use binas_core::{BinasError, Result, Tag, UNKNOWN_TAG};
use std::fmt;

/// A value together with the tag it was written under.
///
/// `value` is `None` when the replica never stored the key; the tag is then
/// [`UNKNOWN_TAG`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<V> {
    /// Stored value, if any
    pub value: Option<V>,
    /// Version of `value`
    pub tag: Tag,
}

impl<V> Versioned<V> {
    /// A stored value
    pub fn new(value: V, tag: Tag) -> Self {
        Self {
            value: Some(value),
            tag,
        }
    }

    /// Nothing stored for this key
    pub fn absent() -> Self {
        Self {
            value: None,
            tag: UNKNOWN_TAG,
        }
    }
}

/// One replica of a tag-versioned register.
#[async_trait]
pub trait RegisterReplica: Send + Sync {
    /// Register key
    type Key: fmt::Debug + Send + Sync;
    /// Register value
    type Value: Clone + fmt::Debug + Send + Sync;

    /// Name used in logs and failure reports
    fn replica_id(&self) -> &str;

    /// Current value and tag; an unknown key is `Versioned::absent()`.
    async fn read(&self, key: &Self::Key) -> Result<Versioned<Self::Value>>;

    /// Store `value` under `tag`
    async fn write(&self, key: &Self::Key, value: &Self::Value, tag: Tag) -> Result<()>;
}

/// A replica that was discovered and either connected or failed to connect.
#[derive(Debug)]
pub enum ReplicaSlot<R> {
    /// Connected and ready for requests
    Ready(R),
    /// Discovered but unusable for this operation
    Faulted {
        /// Replica name
        replica: String,
        /// Why it is unusable
        error: BinasError,
    },
}

/// An excluded replica and the error that excluded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaFailure {
    /// Replica name
    pub replica: String,
    /// Error returned or raised for it
    pub error: BinasError,
}

/// The replica set returned by one discovery call.
///
/// Fixed for the duration of one quorum operation. Faulted members still
/// count toward the set size, so they raise the quorum without being able
/// to answer.
#[derive(Debug)]
pub struct ReplicaSetSnapshot<R> {
    members: Vec<ReplicaSlot<R>>,
}

impl<R> ReplicaSetSnapshot<R> {
    /// Snapshot over the given members
    pub fn new(members: Vec<ReplicaSlot<R>>) -> Self {
        Self { members }
    }

    /// Number of discovered replicas
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when discovery found nothing
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate over all members
    pub fn members(&self) -> impl Iterator<Item = &ReplicaSlot<R>> {
        self.members.iter()
    }

    pub(crate) fn partition(&self) -> (Vec<&R>, Vec<ReplicaFailure>) {
        let mut ready = Vec::with_capacity(self.members.len());
        let mut failures = Vec::new();
        for member in &self.members {
            match member {
                ReplicaSlot::Ready(replica) => ready.push(replica),
                ReplicaSlot::Faulted { replica, error } => failures.push(ReplicaFailure {
                    replica: replica.clone(),
                    error: error.clone(),
                }),
            }
        }
        (ready, failures)
    }
}

/// Produces a fresh replica snapshot for every quorum operation.
#[async_trait]
pub trait ReplicaDiscovery: Send + Sync {
    /// Replica type handed to the register
    type Replica: RegisterReplica;

    /// Discover the current replica set
    async fn discover(&self) -> Result<ReplicaSetSnapshot<Self::Replica>>;
}
