//! Directed "who vouches for whom" graph between identities.
//!
//! An edge `from -> to` means `from` vouches for `to`. The permission resolver walks edges
//! backwards ([`Direction::Incoming`]) so an identity inherits grants from everyone that
//! vouches for it, directly or transitively.

use crate::error::AccessResult;
use crate::security::PublicSignKey;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub from: PublicSignKey,
    pub to: PublicSignKey,
}

impl Relation {
    pub fn new(from: PublicSignKey, to: PublicSignKey) -> Self {
        Self { from, to }
    }

    /// The endpoint reached when following this edge in `direction`
    pub fn reached(&self, direction: Direction) -> PublicSignKey {
        match direction {
            Direction::Outgoing => self.to,
            Direction::Incoming => self.from,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Follow edges from `from` to `to`
    Outgoing,
    /// Follow edges from `to` back to `from`
    Incoming,
}

#[async_trait]
pub trait IdentityGraph: Send + Sync {
    /// Edges touching `identity`: where it is `from` for outgoing, `to` for incoming
    async fn relations(
        &self,
        identity: &PublicSignKey,
        direction: Direction,
    ) -> AccessResult<Vec<Relation>>;
}

struct Walk {
    frontier: VecDeque<PublicSignKey>,
    pending: VecDeque<Relation>,
    visited: HashSet<PublicSignKey>,
}

/// Lazily walk the graph breadth-first from `start`.
///
/// Yields each edge that reaches a not yet visited identity, so the stream is finite on cyclic
/// graphs. Call again to restart. A failing graph lookup ends the walk early.
pub fn path_generator<'a>(
    graph: &'a dyn IdentityGraph,
    start: PublicSignKey,
    direction: Direction,
) -> BoxStream<'a, Relation> {
    let walk = Walk {
        frontier: VecDeque::from([start]),
        pending: VecDeque::new(),
        visited: HashSet::from([start]),
    };

    stream::unfold(walk, move |mut walk| async move {
        loop {
            while let Some(relation) = walk.pending.pop_front() {
                let reached = relation.reached(direction);
                if walk.visited.insert(reached) {
                    walk.frontier.push_back(reached);
                    return Some((relation, walk));
                }
            }

            let node = walk.frontier.pop_front()?;
            match graph.relations(&node, direction).await {
                Ok(relations) => walk.pending.extend(relations),
                Err(e) => {
                    log::error!("Identity graph lookup failed for {}: {}", node, e);
                    return None;
                }
            }
        }
    })
    .boxed()
}

/// In-process identity graph with adjacency in both directions.
#[derive(Debug, Default)]
pub struct MemoryIdentityGraph {
    outgoing: RwLock<HashMap<PublicSignKey, HashSet<PublicSignKey>>>,
    incoming: RwLock<HashMap<PublicSignKey, HashSet<PublicSignKey>>>,
}

impl MemoryIdentityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `from -> to`. Adding an existing relation is not an error.
    pub async fn add_relation(&self, from: PublicSignKey, to: PublicSignKey) -> bool {
        let added = self.outgoing.write().await.entry(from).or_default().insert(to);
        self.incoming.write().await.entry(to).or_default().insert(from);
        added
    }

    pub async fn remove_relation(&self, from: &PublicSignKey, to: &PublicSignKey) -> bool {
        let removed = self
            .outgoing
            .write()
            .await
            .get_mut(from)
            .is_some_and(|targets| targets.remove(to));
        if let Some(sources) = self.incoming.write().await.get_mut(to) {
            sources.remove(from);
        }
        removed
    }
}

#[async_trait]
impl IdentityGraph for MemoryIdentityGraph {
    async fn relations(
        &self,
        identity: &PublicSignKey,
        direction: Direction,
    ) -> AccessResult<Vec<Relation>> {
        let relations = match direction {
            Direction::Outgoing => self
                .outgoing
                .read()
                .await
                .get(identity)
                .map(|targets| {
                    targets
                        .iter()
                        .map(|to| Relation::new(*identity, *to))
                        .collect()
                })
                .unwrap_or_default(),
            Direction::Incoming => self
                .incoming
                .read()
                .await
                .get(identity)
                .map(|sources| {
                    sources
                        .iter()
                        .map(|from| Relation::new(*from, *identity))
                        .collect()
                })
                .unwrap_or_default(),
        };
        Ok(relations)
    }
}
