/// Overlap checks against appointments already in the graph.
///
/// These are plain reads. They see committed state only, so two bookings
/// racing through the checks can both pass unless the caller serializes
/// check and write.

use crate::interval::Interval;
use crate::models::Appointment;
use crate::store::{Direction, GraphSession, Label, RelType, StoreError};
use tracing::debug;

/// Scheduled appointments linked to `owner` through `rel` that overlap
/// `proposed`.
pub fn conflicting_appointments(
    session: &dyn GraphSession,
    owner: Label,
    owner_id: &str,
    rel: RelType,
    proposed: &Interval,
) -> Result<Vec<Appointment>, StoreError> {
    let mut conflicts = Vec::new();
    for neighbor in session.neighbors(owner, owner_id, rel, Direction::Outgoing)? {
        let appointment: Appointment = neighbor.node.decode()?;
        if appointment.blocks(proposed) {
            conflicts.push(appointment);
        }
    }
    debug!(%owner, owner_id, conflicts = conflicts.len(), "conflict check");
    Ok(conflicts)
}

pub fn doctor_conflict(
    session: &dyn GraphSession,
    doctor_id: &str,
    proposed: &Interval,
) -> Result<bool, StoreError> {
    let conflicts = conflicting_appointments(session, Label::Doctor, doctor_id, RelType::Attends, proposed)?;
    Ok(!conflicts.is_empty())
}

pub fn patient_conflict(
    session: &dyn GraphSession,
    patient_id: &str,
    proposed: &Interval,
) -> Result<bool, StoreError> {
    let conflicts = conflicting_appointments(
        session,
        Label::Patient,
        patient_id,
        RelType::HasAppointment,
        proposed,
    )?;
    Ok(!conflicts.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use crate::models::AppointmentStatus;
    use crate::store::{GraphStore, Link, Node};
    use chrono::{DateTime, Utc};

    fn book(graph: &MemoryGraph, id: &str, start: &str, minutes: i64, status: AppointmentStatus) {
        let now = Utc::now();
        let appointment = Appointment {
            id: id.into(),
            appointment_date: DateTime::parse_from_rfc3339(start).unwrap(),
            duration: minutes,
            status,
            created_at: now,
            updated_at: now,
        };
        graph
            .session()
            .unwrap()
            .create_node(
                Node::from_record(Label::Appointment, &appointment).unwrap(),
                &[
                    Link::incoming(RelType::Attends, Label::Doctor, "d-1"),
                    Link::incoming(RelType::HasAppointment, Label::Patient, "p-1"),
                ],
            )
            .unwrap();
    }

    fn graph() -> MemoryGraph {
        let graph = MemoryGraph::new();
        let session = graph.session().unwrap();
        session
            .create_node(Node::new(Label::Doctor, "d-1", Default::default()), &[])
            .unwrap();
        session
            .create_node(Node::new(Label::Patient, "p-1", Default::default()), &[])
            .unwrap();
        drop(session);
        graph
    }

    fn at(ts: &str, minutes: i64) -> Interval {
        Interval::parse(ts, minutes).unwrap()
    }

    #[test]
    fn adjacent_appointments_are_compatible() {
        let graph = graph();
        book(&graph, "a-1", "2024-12-02T10:30:00Z", 30, AppointmentStatus::Scheduled);
        let session = graph.session().unwrap();

        assert!(!doctor_conflict(session.as_ref(), "d-1", &at("2024-12-02T10:00:00Z", 30)).unwrap());
        assert!(doctor_conflict(session.as_ref(), "d-1", &at("2024-12-02T10:00:00Z", 31)).unwrap());
        assert!(!doctor_conflict(session.as_ref(), "d-1", &at("2024-12-02T11:00:00Z", 30)).unwrap());
    }

    #[test]
    fn patient_conflicts_use_patient_edges() {
        let graph = graph();
        book(&graph, "a-1", "2024-12-02T10:00:00Z", 30, AppointmentStatus::Scheduled);
        let session = graph.session().unwrap();

        assert!(patient_conflict(session.as_ref(), "p-1", &at("2024-12-02T10:15:00Z", 30)).unwrap());
        assert!(!patient_conflict(session.as_ref(), "p-2", &at("2024-12-02T10:15:00Z", 30)).unwrap());
    }

    #[test]
    fn cancelled_and_completed_never_block() {
        let graph = graph();
        book(&graph, "a-1", "2024-12-02T10:00:00Z", 60, AppointmentStatus::Cancelled);
        book(&graph, "a-2", "2024-12-02T10:00:00Z", 60, AppointmentStatus::Completed);
        let session = graph.session().unwrap();

        assert!(!doctor_conflict(session.as_ref(), "d-1", &at("2024-12-02T10:15:00Z", 30)).unwrap());
        assert!(!patient_conflict(session.as_ref(), "p-1", &at("2024-12-02T10:15:00Z", 30)).unwrap());
    }

    #[test]
    fn lists_every_overlapping_appointment() {
        let graph = graph();
        book(&graph, "a-1", "2024-12-02T09:00:00Z", 60, AppointmentStatus::Scheduled);
        book(&graph, "a-2", "2024-12-02T10:00:00Z", 60, AppointmentStatus::Scheduled);
        book(&graph, "a-3", "2024-12-02T12:00:00Z", 60, AppointmentStatus::Scheduled);
        let session = graph.session().unwrap();

        let found = conflicting_appointments(
            session.as_ref(),
            Label::Doctor,
            "d-1",
            RelType::Attends,
            &at("2024-12-02T09:30:00Z", 60),
        )
        .unwrap();
        let ids: Vec<&str> = found.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["a-1", "a-2"]);
    }
}
