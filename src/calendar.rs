/// Work-shift management for the clinic scheduling system.
///
/// This module provides the Calendar struct which maintains each doctor's
/// weekly work shifts. A doctor may have several shifts on one day, but
/// never two that overlap.

use crate::availability;
use crate::error::{SchedulingError, Violation};
use crate::gate;
use crate::models::{parse_time_range, ClockTime, Day, WorkShift};
use crate::store::{Direction, GraphSession, GraphStore, Label, Link, Node, Properties, RelType};
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct Calendar<S: GraphStore> {
    store: S,
}

impl<S: GraphStore> Calendar<S> {
    pub fn new(store: S) -> Self {
        Calendar { store }
    }

    /// Add a work shift for a doctor.
    #[instrument(skip(self))]
    pub fn add_work_shift(
        &self,
        doctor_id: &str,
        day: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<WorkShift, SchedulingError> {
        let day = Day::from_string(day)?;
        let (start_time, end_time) = parse_time_range(start_time, end_time)?;

        let session = self.store.session()?;
        let s = session.as_ref();
        gate::require(s, Label::Doctor, doctor_id)?;
        ensure_no_overlap(s, doctor_id, day, start_time, end_time, None)?;

        let shift = WorkShift {
            id: Uuid::new_v4().to_string(),
            day,
            start_time,
            end_time,
        };
        s.create_node(
            Node::from_record(Label::WorkShift, &shift)?,
            &[Link::incoming(RelType::HasWorkShift, Label::Doctor, doctor_id)],
        )?;
        info!(shift_id = %shift.id, "work shift added");
        Ok(shift)
    }

    /// Move an existing shift to a new day or time range.
    ///
    /// The shift being updated is excluded from the overlap test.
    #[instrument(skip(self))]
    pub fn update_work_shift(
        &self,
        shift_id: &str,
        day: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<WorkShift, SchedulingError> {
        let day = Day::from_string(day)?;
        let (start_time, end_time) = parse_time_range(start_time, end_time)?;

        let session = self.store.session()?;
        let s = session.as_ref();
        gate::require(s, Label::WorkShift, shift_id)?;

        let owners = s.neighbors(Label::WorkShift, shift_id, RelType::HasWorkShift, Direction::Incoming)?;
        for owner in &owners {
            ensure_no_overlap(s, &owner.node.id, day, start_time, end_time, Some(shift_id))?;
        }

        let mut properties = Properties::new();
        properties.insert("day".into(), Value::String(day.name().into()));
        properties.insert("startTime".into(), Value::String(start_time.to_string()));
        properties.insert("endTime".into(), Value::String(end_time.to_string()));
        if !s.update_node(Label::WorkShift, shift_id, properties)?.contains_updates() {
            return Err(SchedulingError::not_found(Label::WorkShift, shift_id));
        }
        info!("work shift updated");
        gate::load(s, Label::WorkShift, shift_id)
    }

    #[instrument(skip(self))]
    pub fn delete_work_shift(&self, shift_id: &str) -> Result<(), SchedulingError> {
        let session = self.store.session()?;
        let summary = session.delete_node(Label::WorkShift, shift_id)?;
        if summary.nodes_deleted == 0 {
            return Err(SchedulingError::not_found(Label::WorkShift, shift_id));
        }
        info!("work shift deleted");
        Ok(())
    }

    /// Get a doctor's shifts on a given day, sorted by start time.
    #[instrument(skip(self))]
    pub fn shifts_on(&self, doctor_id: &str, day: &str) -> Result<Vec<WorkShift>, SchedulingError> {
        let day = Day::from_string(day)?;
        let session = self.store.session()?;
        gate::require(session.as_ref(), Label::Doctor, doctor_id)?;
        Ok(availability::shifts_on(session.as_ref(), doctor_id, day)?)
    }
}

fn ensure_no_overlap(
    session: &dyn GraphSession,
    doctor_id: &str,
    day: Day,
    start: ClockTime,
    end: ClockTime,
    exclude: Option<&str>,
) -> Result<(), SchedulingError> {
    let clash = availability::shifts_on(session, doctor_id, day)?
        .into_iter()
        .filter(|shift| Some(shift.id.as_str()) != exclude)
        .find(|shift| shift.overlaps_with(start, end));

    if let Some(existing) = clash {
        warn!(
            existing = %existing.id,
            "work shift overlaps {} - {}",
            existing.start_time,
            existing.end_time
        );
        return Err(Violation::WorkShiftOverlap(day.name().to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use std::sync::Arc;

    fn calendar() -> Calendar<Arc<MemoryGraph>> {
        let graph = Arc::new(MemoryGraph::new());
        graph
            .session()
            .unwrap()
            .create_node(Node::new(Label::Doctor, "d-1", Properties::new()), &[])
            .unwrap();
        Calendar::new(graph)
    }

    #[test]
    fn adds_and_lists_shifts() {
        let calendar = calendar();
        calendar.add_work_shift("d-1", "Monday", "13:00", "17:00").unwrap();
        calendar.add_work_shift("d-1", "monday", "08:00", "12:00").unwrap();
        calendar.add_work_shift("d-1", "Tuesday", "08:00", "12:00").unwrap();

        let monday = calendar.shifts_on("d-1", "Monday").unwrap();
        let starts: Vec<String> = monday.iter().map(|s| s.start_time.to_string()).collect();
        assert_eq!(starts, ["08:00", "13:00"]);
    }

    #[test]
    fn rejects_overlapping_shift_on_same_day() {
        let calendar = calendar();
        calendar.add_work_shift("d-1", "Monday", "09:00", "12:00").unwrap();

        let err = calendar.add_work_shift("d-1", "Monday", "11:00", "14:00").unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::WorkShiftOverlap("Monday".into())));

        // Touching ranges and other days are fine.
        calendar.add_work_shift("d-1", "Monday", "12:00", "14:00").unwrap();
        calendar.add_work_shift("d-1", "Friday", "11:00", "14:00").unwrap();
    }

    #[test]
    fn rejects_bad_input_before_storage() {
        let calendar = calendar();
        assert!(matches!(
            calendar.add_work_shift("d-1", "Caturday", "09:00", "12:00").unwrap_err().violation(),
            Some(Violation::InvalidDay(_))
        ));
        assert!(matches!(
            calendar.add_work_shift("d-1", "Monday", "9:00", "12:00").unwrap_err().violation(),
            Some(Violation::InvalidTimeFormat(_))
        ));
        assert!(matches!(
            calendar.add_work_shift("d-1", "Monday", "22:00", "02:00").unwrap_err().violation(),
            Some(Violation::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn unknown_doctor_is_not_found() {
        let calendar = calendar();
        let err = calendar.add_work_shift("d-404", "Monday", "09:00", "12:00").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_ignores_the_shift_itself() {
        let calendar = calendar();
        let shift = calendar.add_work_shift("d-1", "Monday", "09:00", "12:00").unwrap();
        calendar.add_work_shift("d-1", "Monday", "14:00", "16:00").unwrap();

        let moved = calendar.update_work_shift(&shift.id, "Monday", "10:00", "13:00").unwrap();
        assert_eq!(moved.start_time.to_string(), "10:00");
        assert_eq!(moved.end_time.to_string(), "13:00");

        let err = calendar.update_work_shift(&shift.id, "Monday", "12:00", "15:00").unwrap_err();
        assert!(matches!(err.violation(), Some(Violation::WorkShiftOverlap(_))));

        let moved = calendar.update_work_shift(&shift.id, "Wednesday", "12:00", "15:00").unwrap();
        assert_eq!(moved.day, Day::Wednesday);
        assert_eq!(calendar.shifts_on("d-1", "Monday").unwrap().len(), 1);
    }

    #[test]
    fn delete_reports_missing_shift() {
        let calendar = calendar();
        let shift = calendar.add_work_shift("d-1", "Monday", "09:00", "12:00").unwrap();
        calendar.delete_work_shift(&shift.id).unwrap();
        assert!(calendar.shifts_on("d-1", "Monday").unwrap().is_empty());
        assert!(calendar.delete_work_shift(&shift.id).unwrap_err().is_not_found());
        assert!(calendar.update_work_shift(&shift.id, "Monday", "09:00", "10:00").unwrap_err().is_not_found());
    }
}
