/// Checks a proposed interval against clinic opening hours and the
/// doctor's weekly work shifts.
///
/// Both checks look at wall-clock time only, in the offset the interval
/// was given in. Neither consults a specific calendar date beyond the
/// weekday.

use crate::interval::Interval;
use crate::models::{Clinic, Day, WorkShift};
use crate::store::{Direction, GraphSession, Label, RelType, StoreError};
use tracing::debug;

/// Load the doctor's shifts for one day, sorted by start time.
pub fn shifts_on(
    session: &dyn GraphSession,
    doctor_id: &str,
    day: Day,
) -> Result<Vec<WorkShift>, StoreError> {
    let mut shifts = Vec::new();
    for neighbor in session.neighbors(Label::Doctor, doctor_id, RelType::HasWorkShift, Direction::Outgoing)? {
        let shift: WorkShift = neighbor.node.decode()?;
        if shift.day == day {
            shifts.push(shift);
        }
    }
    shifts.sort_by_key(|s| s.start_time);
    Ok(shifts)
}

/// Check the interval against the clinic's opening hours.
///
/// Returns `Ok(None)` when the clinic does not exist so the caller can
/// decide how to report it.
pub fn within_clinic_hours(
    session: &dyn GraphSession,
    clinic_id: &str,
    interval: &Interval,
) -> Result<Option<bool>, StoreError> {
    let Some(node) = session.get_node(Label::Clinic, clinic_id)? else {
        return Ok(None);
    };
    let clinic: Clinic = node.decode()?;
    let open = clinic.is_open_during(interval);
    debug!(
        clinic_id,
        open_time = %clinic.open_time,
        close_time = %clinic.close_time,
        open,
        "clinic hours check"
    );
    Ok(Some(open))
}

/// Check that some shift of the doctor on the interval's weekday fully
/// contains it. A doctor without shifts that day never passes.
pub fn within_work_shift(
    session: &dyn GraphSession,
    doctor_id: &str,
    interval: &Interval,
) -> Result<bool, StoreError> {
    let day = Day::from(interval.weekday());
    let shifts = shifts_on(session, doctor_id, day)?;
    let covered = shifts.iter().any(|shift| shift.covers(interval));
    debug!(doctor_id, %day, shifts = shifts.len(), covered, "work shift check");
    Ok(covered)
}
