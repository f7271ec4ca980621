/// Storage collaborator interface.
///
/// The scheduling core talks to a property graph through a short list of
/// query-shaped operations. A [`GraphStore`] hands out one [`GraphSession`]
/// per logical operation; the session is released when it is dropped, so
/// every exit path (including `?`) gives it back.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Property bag stored on nodes and relationships.
pub type Properties = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("query failed: {0}")]
    Query(String),

    #[error("malformed record: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Doctor,
    Patient,
    Clinic,
    Appointment,
    WorkShift,
}

impl Label {
    pub fn name(&self) -> &'static str {
        match self {
            Label::Doctor => "Doctor",
            Label::Patient => "Patient",
            Label::Clinic => "Clinic",
            Label::Appointment => "Appointment",
            Label::WorkShift => "WorkShift",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Relationship types in the clinic graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelType {
    /// Doctor -> Appointment
    Attends,
    /// Patient -> Appointment
    HasAppointment,
    /// Appointment -> Clinic
    OccursAt,
    /// Doctor -> WorkShift
    HasWorkShift,
    /// Doctor -> Clinic, carries `startDate`
    WorkAt,
}

impl RelType {
    pub fn name(&self) -> &'static str {
        match self {
            RelType::Attends => "ATTENDS",
            RelType::HasAppointment => "HAS_APPOINTMENT",
            RelType::OccursAt => "OCCURS_AT",
            RelType::HasWorkShift => "HAS_WORK_SHIFT",
            RelType::WorkAt => "WORK_AT",
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a relationship as seen from the node being queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub label: Label,
    pub id: String,
}

impl NodeRef {
    pub fn new(label: Label, id: impl Into<String>) -> Self {
        NodeRef {
            label,
            id: id.into(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.label, self.id)
    }
}

/// A labelled node. `properties` always contains the `id` key.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub label: Label,
    pub id: String,
    pub properties: Properties,
}

impl Node {
    pub fn new(label: Label, id: impl Into<String>, mut properties: Properties) -> Self {
        let id = id.into();
        properties.insert("id".to_string(), Value::String(id.clone()));
        Node {
            label,
            id,
            properties,
        }
    }

    /// Serialize a record into a node. The record must carry a string `id`.
    pub fn from_record<T: Serialize>(label: Label, record: &T) -> Result<Self, StoreError> {
        match serde_json::to_value(record)? {
            Value::Object(properties) => {
                let id = properties
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| StoreError::Query(format!("{} record has no id", label)))?;
                Ok(Node::new(label, id, properties))
            }
            other => Err(StoreError::Query(format!(
                "{} record must serialize to an object, got {}",
                label, other
            ))),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.properties.clone()))?)
    }

    pub fn reference(&self) -> NodeRef {
        NodeRef::new(self.label, self.id.clone())
    }
}

/// A relationship to create alongside (or from) a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub rel: RelType,
    pub direction: Direction,
    pub other: NodeRef,
    pub properties: Properties,
}

impl Link {
    pub fn outgoing(rel: RelType, label: Label, id: impl Into<String>) -> Self {
        Link {
            rel,
            direction: Direction::Outgoing,
            other: NodeRef::new(label, id),
            properties: Properties::new(),
        }
    }

    pub fn incoming(rel: RelType, label: Label, id: impl Into<String>) -> Self {
        Link {
            rel,
            direction: Direction::Incoming,
            other: NodeRef::new(label, id),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }
}

/// A node reached through a relationship, together with that
/// relationship's properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub relationship: Properties,
    pub node: Node,
}

/// Counters reported by every write.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub nodes_created: usize,
    pub nodes_deleted: usize,
    pub relationships_created: usize,
    pub relationships_deleted: usize,
    pub properties_set: usize,
}

impl WriteSummary {
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0
            || self.nodes_deleted > 0
            || self.relationships_created > 0
            || self.relationships_deleted > 0
            || self.properties_set > 0
    }
}

/// One logical unit of work against the graph.
pub trait GraphSession {
    fn node_exists(&self, label: Label, id: &str) -> Result<bool, StoreError>;

    fn get_node(&self, label: Label, id: &str) -> Result<Option<Node>, StoreError>;

    fn nodes(&self, label: Label) -> Result<Vec<Node>, StoreError>;

    /// Create `node` and all `links` at once. Fails without writing anything
    /// if the id is taken or a link endpoint is missing.
    fn create_node(&self, node: Node, links: &[Link]) -> Result<WriteSummary, StoreError>;

    /// Merge `properties` into an existing node. A missing node yields an
    /// empty summary.
    fn update_node(
        &self,
        label: Label,
        id: &str,
        properties: Properties,
    ) -> Result<WriteSummary, StoreError>;

    /// Remove a node and every relationship touching it.
    fn delete_node(&self, label: Label, id: &str) -> Result<WriteSummary, StoreError>;

    fn neighbors(
        &self,
        label: Label,
        id: &str,
        rel: RelType,
        direction: Direction,
    ) -> Result<Vec<Neighbor>, StoreError>;

    /// Create the relationship if absent, otherwise overwrite its properties.
    /// Missing endpoints yield an empty summary.
    fn merge_relationship(&self, from: &NodeRef, link: &Link) -> Result<WriteSummary, StoreError>;

    /// Overwrite properties of an existing relationship only.
    fn update_relationship(&self, from: &NodeRef, link: &Link) -> Result<WriteSummary, StoreError>;

    fn delete_relationship(&self, from: &NodeRef, link: &Link) -> Result<WriteSummary, StoreError>;
}

pub trait GraphStore: Send + Sync {
    fn session(&self) -> Result<Box<dyn GraphSession + '_>, StoreError>;
}

impl<S: GraphStore + ?Sized> GraphStore for Arc<S> {
    fn session(&self) -> Result<Box<dyn GraphSession + '_>, StoreError> {
        (**self).session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        id: String,
        name: String,
    }

    #[test]
    fn node_round_trips_a_record() {
        let record = Record {
            id: "d-1".into(),
            name: "Dr. Lan".into(),
        };
        let node = Node::from_record(Label::Doctor, &record).unwrap();
        assert_eq!(node.id, "d-1");
        assert_eq!(node.properties["id"], Value::String("d-1".into()));
        assert_eq!(node.decode::<Record>().unwrap(), record);
    }

    #[test]
    fn record_without_id_is_rejected() {
        #[derive(Serialize)]
        struct Anonymous {
            name: String,
        }
        let result = Node::from_record(Label::Doctor, &Anonymous { name: "x".into() });
        assert!(matches!(result, Err(StoreError::Query(_))));
    }

    #[test]
    fn empty_summary_has_no_updates() {
        assert!(!WriteSummary::default().contains_updates());
        let summary = WriteSummary {
            nodes_deleted: 1,
            ..WriteSummary::default()
        };
        assert!(summary.contains_updates());
    }

    #[test]
    fn names_match_graph_vocabulary() {
        assert_eq!(Label::WorkShift.to_string(), "WorkShift");
        assert_eq!(RelType::HasAppointment.to_string(), "HAS_APPOINTMENT");
        assert_eq!(NodeRef::new(Label::Clinic, "c-1").to_string(), "(Clinic:c-1)");
    }
}
