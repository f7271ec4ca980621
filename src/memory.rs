/// In-process property graph.
///
/// `MemoryGraph` keeps nodes keyed by `(label, id)` and relationships in
/// insertion order. Each session call takes the lock for just that call,
/// the same granularity a remote graph session gives per query.

use crate::store::{
    Direction, GraphSession, GraphStore, Label, Link, Neighbor, Node, NodeRef, Properties,
    RelType, StoreError, WriteSummary,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

type NodeKey = (Label, String);

#[derive(Debug, Clone)]
struct StoredRelationship {
    from: NodeKey,
    rel: RelType,
    to: NodeKey,
    properties: Properties,
}

#[derive(Debug, Default)]
struct GraphData {
    nodes: HashMap<NodeKey, Properties>,
    relationships: Vec<StoredRelationship>,
}

impl GraphData {
    fn node(&self, key: &NodeKey) -> Option<Node> {
        self.nodes
            .get(key)
            .map(|props| Node::new(key.0, key.1.clone(), props.clone()))
    }

    fn find_relationship(&self, from: &NodeKey, rel: RelType, to: &NodeKey) -> Option<usize> {
        self.relationships
            .iter()
            .position(|r| r.rel == rel && &r.from == from && &r.to == to)
    }
}

fn key(node: &NodeRef) -> NodeKey {
    (node.label, node.id.clone())
}

/// Resolve a link relative to `origin` into `(from, to)` endpoints.
fn endpoints(origin: &NodeRef, link: &Link) -> (NodeKey, NodeKey) {
    match link.direction {
        Direction::Outgoing => (key(origin), key(&link.other)),
        Direction::Incoming => (key(&link.other), key(origin)),
    }
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
    data: RwLock<GraphData>,
    sessions: AtomicU64,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.data.read().map(|d| d.nodes.len()).unwrap_or(0)
    }

    pub fn relationship_count(&self) -> usize {
        self.data.read().map(|d| d.relationships.len()).unwrap_or(0)
    }

    /// Number of sessions handed out so far.
    pub fn sessions_opened(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }
}

impl GraphStore for MemoryGraph {
    fn session(&self) -> Result<Box<dyn GraphSession + '_>, StoreError> {
        let id = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(session = id, "session opened");
        Ok(Box::new(MemorySession { graph: self, id }))
    }
}

struct MemorySession<'a> {
    graph: &'a MemoryGraph,
    id: u64,
}

impl MemorySession<'_> {
    fn read(&self) -> Result<RwLockReadGuard<'_, GraphData>, StoreError> {
        self.graph.data.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GraphData>, StoreError> {
        self.graph.data.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Drop for MemorySession<'_> {
    fn drop(&mut self) {
        trace!(session = self.id, "session closed");
    }
}

impl GraphSession for MemorySession<'_> {
    fn node_exists(&self, label: Label, id: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.nodes.contains_key(&(label, id.to_string())))
    }

    fn get_node(&self, label: Label, id: &str) -> Result<Option<Node>, StoreError> {
        Ok(self.read()?.node(&(label, id.to_string())))
    }

    fn nodes(&self, label: Label) -> Result<Vec<Node>, StoreError> {
        let data = self.read()?;
        let mut nodes: Vec<Node> = data
            .nodes
            .keys()
            .filter(|(l, _)| *l == label)
            .filter_map(|k| data.node(k))
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nodes)
    }

    fn create_node(&self, node: Node, links: &[Link]) -> Result<WriteSummary, StoreError> {
        let mut data = self.write()?;
        let origin = node.reference();
        let node_key = key(&origin);

        if data.nodes.contains_key(&node_key) {
            return Err(StoreError::Query(format!("node {} already exists", origin)));
        }
        if let Some(missing) = links
            .iter()
            .find(|link| !data.nodes.contains_key(&key(&link.other)))
        {
            return Err(StoreError::Query(format!(
                "cannot link {} to missing node {}",
                origin, missing.other
            )));
        }

        let mut summary = WriteSummary {
            nodes_created: 1,
            properties_set: node.properties.len(),
            ..WriteSummary::default()
        };
        data.nodes.insert(node_key, node.properties);

        for link in links {
            let (from, to) = endpoints(&origin, link);
            data.relationships.push(StoredRelationship {
                from,
                rel: link.rel,
                to,
                properties: link.properties.clone(),
            });
            summary.relationships_created += 1;
            summary.properties_set += link.properties.len();
        }
        Ok(summary)
    }

    fn update_node(
        &self,
        label: Label,
        id: &str,
        properties: Properties,
    ) -> Result<WriteSummary, StoreError> {
        let mut data = self.write()?;
        let Some(stored) = data.nodes.get_mut(&(label, id.to_string())) else {
            return Ok(WriteSummary::default());
        };
        let mut summary = WriteSummary::default();
        for (k, v) in properties {
            if k == "id" {
                continue;
            }
            stored.insert(k, v);
            summary.properties_set += 1;
        }
        Ok(summary)
    }

    fn delete_node(&self, label: Label, id: &str) -> Result<WriteSummary, StoreError> {
        let mut data = self.write()?;
        let node_key = (label, id.to_string());
        if data.nodes.remove(&node_key).is_none() {
            return Ok(WriteSummary::default());
        }
        let before = data.relationships.len();
        data.relationships
            .retain(|r| r.from != node_key && r.to != node_key);
        Ok(WriteSummary {
            nodes_deleted: 1,
            relationships_deleted: before - data.relationships.len(),
            ..WriteSummary::default()
        })
    }

    fn neighbors(
        &self,
        label: Label,
        id: &str,
        rel: RelType,
        direction: Direction,
    ) -> Result<Vec<Neighbor>, StoreError> {
        let data = self.read()?;
        let origin = (label, id.to_string());
        let found = data
            .relationships
            .iter()
            .filter(|r| r.rel == rel)
            .filter_map(|r| {
                let other = match direction {
                    Direction::Outgoing if r.from == origin => &r.to,
                    Direction::Incoming if r.to == origin => &r.from,
                    _ => return None,
                };
                data.node(other).map(|node| Neighbor {
                    relationship: r.properties.clone(),
                    node,
                })
            })
            .collect();
        Ok(found)
    }

    fn merge_relationship(&self, from: &NodeRef, link: &Link) -> Result<WriteSummary, StoreError> {
        let mut data = self.write()?;
        let (start, end) = endpoints(from, link);
        if !data.nodes.contains_key(&start) || !data.nodes.contains_key(&end) {
            return Ok(WriteSummary::default());
        }

        match data.find_relationship(&start, link.rel, &end) {
            Some(index) => {
                let stored = &mut data.relationships[index].properties;
                for (k, v) in &link.properties {
                    stored.insert(k.clone(), v.clone());
                }
                Ok(WriteSummary {
                    properties_set: link.properties.len(),
                    ..WriteSummary::default()
                })
            }
            None => {
                data.relationships.push(StoredRelationship {
                    from: start,
                    rel: link.rel,
                    to: end,
                    properties: link.properties.clone(),
                });
                Ok(WriteSummary {
                    relationships_created: 1,
                    properties_set: link.properties.len(),
                    ..WriteSummary::default()
                })
            }
        }
    }

    fn update_relationship(&self, from: &NodeRef, link: &Link) -> Result<WriteSummary, StoreError> {
        let mut data = self.write()?;
        let (start, end) = endpoints(from, link);
        let Some(index) = data.find_relationship(&start, link.rel, &end) else {
            return Ok(WriteSummary::default());
        };
        let stored = &mut data.relationships[index].properties;
        for (k, v) in &link.properties {
            stored.insert(k.clone(), v.clone());
        }
        Ok(WriteSummary {
            properties_set: link.properties.len(),
            ..WriteSummary::default()
        })
    }

    fn delete_relationship(&self, from: &NodeRef, link: &Link) -> Result<WriteSummary, StoreError> {
        let mut data = self.write()?;
        let (start, end) = endpoints(from, link);
        let before = data.relationships.len();
        data.relationships
            .retain(|r| !(r.rel == link.rel && r.from == start && r.to == end));
        Ok(WriteSummary {
            relationships_deleted: before - data.relationships.len(),
            ..WriteSummary::default()
        })
    }
}
