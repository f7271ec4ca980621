/// Existence predicates for referenced records.
///
/// Absence is not an error here; `require` is the one place that turns it
/// into `NotFound` for callers that need to stop.

use crate::error::SchedulingError;
use crate::store::{GraphSession, Label, StoreError};
use serde::de::DeserializeOwned;
use tracing::debug;

pub fn exists(session: &dyn GraphSession, label: Label, id: &str) -> Result<bool, StoreError> {
    let found = session.node_exists(label, id)?;
    debug!(%label, id, found, "existence check");
    Ok(found)
}

pub fn doctor_exists(session: &dyn GraphSession, id: &str) -> Result<bool, StoreError> {
    exists(session, Label::Doctor, id)
}

pub fn patient_exists(session: &dyn GraphSession, id: &str) -> Result<bool, StoreError> {
    exists(session, Label::Patient, id)
}

pub fn clinic_exists(session: &dyn GraphSession, id: &str) -> Result<bool, StoreError> {
    exists(session, Label::Clinic, id)
}

pub fn appointment_exists(session: &dyn GraphSession, id: &str) -> Result<bool, StoreError> {
    exists(session, Label::Appointment, id)
}

/// Fail with `NotFound` unless the record exists.
pub fn require(session: &dyn GraphSession, label: Label, id: &str) -> Result<(), SchedulingError> {
    if exists(session, label, id)? {
        Ok(())
    } else {
        Err(SchedulingError::not_found(label, id))
    }
}

/// Fetch and decode a record, or fail with `NotFound`.
pub fn load<T: DeserializeOwned>(
    session: &dyn GraphSession,
    label: Label,
    id: &str,
) -> Result<T, SchedulingError> {
    match session.get_node(label, id)? {
        Some(node) => Ok(node.decode()?),
        None => Err(SchedulingError::not_found(label, id)),
    }
}

/// Every record with `label`, ordered by id.
pub fn load_all<T: DeserializeOwned>(
    session: &dyn GraphSession,
    label: Label,
) -> Result<Vec<T>, SchedulingError> {
    let mut records = Vec::new();
    for node in session.nodes(label)? {
        records.push(node.decode()?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use crate::store::{GraphStore, Node, Properties};

    #[test]
    fn predicates_follow_labels() {
        let graph = MemoryGraph::new();
        let session = graph.session().unwrap();
        session
            .create_node(Node::new(Label::Patient, "p-1", Properties::new()), &[])
            .unwrap();

        assert!(patient_exists(session.as_ref(), "p-1").unwrap());
        assert!(!doctor_exists(session.as_ref(), "p-1").unwrap());
        assert!(!clinic_exists(session.as_ref(), "c-1").unwrap());
        assert!(!appointment_exists(session.as_ref(), "a-1").unwrap());
    }

    #[test]
    fn require_reports_missing_record() {
        let graph = MemoryGraph::new();
        let session = graph.session().unwrap();
        match require(session.as_ref(), Label::Clinic, "c-404") {
            Err(SchedulingError::NotFound { entity, id }) => {
                assert_eq!(entity, Label::Clinic);
                assert_eq!(id, "c-404");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
