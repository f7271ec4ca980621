/// Appointment lifecycle management.
///
/// This module provides the AppointmentScheduler struct which books
/// appointments after checking, in order: the requested date, that the
/// doctor, patient and clinic exist, clinic opening hours, the doctor's
/// work shifts, and finally doctor and patient conflicts. It also owns
/// status changes, deletion and adding doctors to an existing booking.
///
/// Every public operation opens its own storage session and drops it on
/// return. With `serialize_bookings` set, booking operations also hold a
/// gate owned by the scheduler instance from the first check until the
/// write is committed. Bookings made through other scheduler instances,
/// or through this one with the gate off, may both pass the conflict
/// checks for the same slot.

use crate::availability;
use crate::config::SchedulerConfig;
use crate::conflict;
use crate::error::{SchedulingError, Violation};
use crate::gate;
use crate::interval::Interval;
use crate::models::{Appointment, AppointmentStatus, Clinic, Doctor, NewAppointment, Patient};
use crate::store::{
    Direction, GraphSession, GraphStore, Label, Link, Node, NodeRef, Properties, RelType,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

fn reject(violation: Violation) -> SchedulingError {
    warn!(reason = %violation, "request rejected");
    SchedulingError::Validation(violation)
}

pub struct AppointmentScheduler<S: GraphStore> {
    store: S,
    config: SchedulerConfig,
    booking_gate: Mutex<()>,
}

impl<S: GraphStore> AppointmentScheduler<S> {
    pub fn new(store: S, config: SchedulerConfig) -> Self {
        AppointmentScheduler {
            store,
            config,
            booking_gate: Mutex::new(()),
        }
    }

    fn hold_booking_gate(&self) -> Result<Option<MutexGuard<'_, ()>>, SchedulingError> {
        if !self.config.serialize_bookings {
            return Ok(None);
        }
        self.booking_gate.lock().map(Some).map_err(|_| {
            error!("booking gate poisoned");
            SchedulingError::Internal
        })
    }

    /// Book a new appointment.
    ///
    /// The returned record is `Scheduled` with `created_at == updated_at`.
    #[instrument(
        skip(self, request),
        fields(
            doctor_id = %request.doctor_id,
            patient_id = %request.patient_id,
            clinic_id = %request.clinic_id,
            appointment_date = %request.appointment_date,
            duration = request.duration,
        )
    )]
    pub fn create_appointment(&self, request: &NewAppointment) -> Result<Appointment, SchedulingError> {
        let interval = Interval::parse(&request.appointment_date, request.duration).map_err(reject)?;

        let _booking = self.hold_booking_gate()?;
        let session = self.store.session()?;
        let s = session.as_ref();

        gate::require(s, Label::Doctor, &request.doctor_id)?;
        gate::require(s, Label::Patient, &request.patient_id)?;
        gate::require(s, Label::Clinic, &request.clinic_id)?;

        ensure_clinic_hours(s, &request.clinic_id, &interval)?;
        ensure_work_shift(s, &request.doctor_id, &interval)?;
        ensure_no_doctor_conflict(s, &request.doctor_id, &interval)?;
        ensure_no_patient_conflict(s, &request.patient_id, &interval)?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4().to_string(),
            appointment_date: interval.start,
            duration: request.duration,
            status: AppointmentStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        s.create_node(
            Node::from_record(Label::Appointment, &appointment)?,
            &[
                Link::incoming(RelType::HasAppointment, Label::Patient, &request.patient_id),
                Link::outgoing(RelType::OccursAt, Label::Clinic, &request.clinic_id),
                Link::incoming(RelType::Attends, Label::Doctor, &request.doctor_id),
            ],
        )?;

        info!(appointment_id = %appointment.id, "appointment scheduled");
        Ok(appointment)
    }

    pub fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, SchedulingError> {
        let session = self.store.session()?;
        gate::load(session.as_ref(), Label::Appointment, appointment_id)
    }

    /// Change an appointment's status.
    ///
    /// `new_status` must be one of `Scheduled`, `Cancelled` or `Completed`;
    /// anything else is rejected before storage is touched. Which moves are
    /// allowed is decided by the configured transition policy.
    #[instrument(skip(self))]
    pub fn update_status(&self, appointment_id: &str, new_status: &str) -> Result<Appointment, SchedulingError> {
        let status = AppointmentStatus::from_string(new_status).map_err(reject)?;

        let session = self.store.session()?;
        let s = session.as_ref();
        let current: Appointment = gate::load(s, Label::Appointment, appointment_id)?;

        if !self.config.transition_policy.allows(current.status, status) {
            return Err(reject(Violation::IllegalTransition {
                from: current.status.name().to_string(),
                to: status.name().to_string(),
            }));
        }

        let mut properties = Properties::new();
        properties.insert("Status".into(), Value::String(status.name().into()));
        properties.insert("UpdatedAt".into(), Value::String(Utc::now().to_rfc3339()));
        if !s.update_node(Label::Appointment, appointment_id, properties)?.contains_updates() {
            return Err(SchedulingError::not_found(Label::Appointment, appointment_id));
        }

        info!(from = %current.status, to = %status, "appointment status updated");
        gate::load(s, Label::Appointment, appointment_id)
    }

    /// Delete an appointment and all its relationships.
    ///
    /// Deleting an id that does not exist is `NotFound`, not a silent success.
    #[instrument(skip(self))]
    pub fn delete_appointment(&self, appointment_id: &str) -> Result<(), SchedulingError> {
        let session = self.store.session()?;
        let summary = session.delete_node(Label::Appointment, appointment_id)?;
        if summary.nodes_deleted == 0 {
            return Err(SchedulingError::not_found(Label::Appointment, appointment_id));
        }
        info!(detached = summary.relationships_deleted, "appointment deleted");
        Ok(())
    }

    /// Add another attending doctor to an existing appointment.
    ///
    /// The doctor must have a work shift covering the appointment and no
    /// conflicting scheduled appointment. Existing attendees are kept.
    #[instrument(skip(self))]
    pub fn add_doctor(&self, appointment_id: &str, doctor_id: &str) -> Result<Appointment, SchedulingError> {
        let _booking = self.hold_booking_gate()?;
        let session = self.store.session()?;
        let s = session.as_ref();

        gate::require(s, Label::Appointment, appointment_id)?;
        gate::require(s, Label::Doctor, doctor_id)?;

        let appointment: Appointment = gate::load(s, Label::Appointment, appointment_id)?;
        let interval = appointment.interval().map_err(reject)?;

        let attending = s.neighbors(Label::Appointment, appointment_id, RelType::Attends, Direction::Incoming)?;
        if attending.iter().any(|n| n.node.id == doctor_id) {
            return Err(reject(Violation::AlreadyAttending));
        }

        ensure_work_shift(s, doctor_id, &interval)?;
        ensure_no_doctor_conflict(s, doctor_id, &interval)?;

        let summary = s.merge_relationship(
            &NodeRef::new(Label::Doctor, doctor_id),
            &Link::outgoing(RelType::Attends, Label::Appointment, appointment_id),
        )?;
        if !summary.contains_updates() {
            return Err(SchedulingError::not_found(Label::Appointment, appointment_id));
        }

        info!("doctor added to appointment");
        Ok(appointment)
    }

    /// Doctors attending an appointment.
    pub fn doctors_of(&self, appointment_id: &str) -> Result<Vec<Doctor>, SchedulingError> {
        self.related(appointment_id, RelType::Attends, Direction::Incoming)
    }

    /// Patients holding an appointment.
    pub fn patients_of(&self, appointment_id: &str) -> Result<Vec<Patient>, SchedulingError> {
        self.related(appointment_id, RelType::HasAppointment, Direction::Incoming)
    }

    /// The clinic an appointment takes place at, if it still exists.
    pub fn clinic_of(&self, appointment_id: &str) -> Result<Option<Clinic>, SchedulingError> {
        let clinics: Vec<Clinic> = self.related(appointment_id, RelType::OccursAt, Direction::Outgoing)?;
        Ok(clinics.into_iter().next())
    }

    fn related<T: serde::de::DeserializeOwned>(
        &self,
        appointment_id: &str,
        rel: RelType,
        direction: Direction,
    ) -> Result<Vec<T>, SchedulingError> {
        let session = self.store.session()?;
        let s = session.as_ref();
        gate::require(s, Label::Appointment, appointment_id)?;
        let mut records = Vec::new();
        for neighbor in s.neighbors(Label::Appointment, appointment_id, rel, direction)? {
            records.push(neighbor.node.decode()?);
        }
        Ok(records)
    }

    /// Check an interval against a clinic's opening hours on its own.
    #[instrument(skip(self))]
    pub fn check_clinic_hours(&self, clinic_id: &str, interval: &Interval) -> Result<(), SchedulingError> {
        let session = self.store.session()?;
        ensure_clinic_hours(session.as_ref(), clinic_id, interval)
    }

    /// Check an interval against a doctor's work shifts on its own.
    #[instrument(skip(self))]
    pub fn check_work_shift(&self, doctor_id: &str, interval: &Interval) -> Result<(), SchedulingError> {
        let session = self.store.session()?;
        gate::require(session.as_ref(), Label::Doctor, doctor_id)?;
        ensure_work_shift(session.as_ref(), doctor_id, interval)
    }

    #[instrument(skip(self))]
    pub fn check_doctor_conflict(&self, doctor_id: &str, interval: &Interval) -> Result<(), SchedulingError> {
        let session = self.store.session()?;
        gate::require(session.as_ref(), Label::Doctor, doctor_id)?;
        ensure_no_doctor_conflict(session.as_ref(), doctor_id, interval)
    }

    #[instrument(skip(self))]
    pub fn check_patient_conflict(&self, patient_id: &str, interval: &Interval) -> Result<(), SchedulingError> {
        let session = self.store.session()?;
        gate::require(session.as_ref(), Label::Patient, patient_id)?;
        ensure_no_patient_conflict(session.as_ref(), patient_id, interval)
    }
}

fn ensure_clinic_hours(
    session: &dyn GraphSession,
    clinic_id: &str,
    interval: &Interval,
) -> Result<(), SchedulingError> {
    match availability::within_clinic_hours(session, clinic_id, interval)? {
        Some(true) => Ok(()),
        Some(false) => Err(reject(Violation::OutsideClinicHours)),
        None => Err(SchedulingError::not_found(Label::Clinic, clinic_id)),
    }
}

fn ensure_work_shift(
    session: &dyn GraphSession,
    doctor_id: &str,
    interval: &Interval,
) -> Result<(), SchedulingError> {
    if availability::within_work_shift(session, doctor_id, interval)? {
        Ok(())
    } else {
        Err(reject(Violation::OutsideWorkShift))
    }
}

fn ensure_no_doctor_conflict(
    session: &dyn GraphSession,
    doctor_id: &str,
    interval: &Interval,
) -> Result<(), SchedulingError> {
    if conflict::doctor_conflict(session, doctor_id, interval)? {
        Err(reject(Violation::DoctorConflict))
    } else {
        Ok(())
    }
}

fn ensure_no_patient_conflict(
    session: &dyn GraphSession,
    patient_id: &str,
    interval: &Interval,
) -> Result<(), SchedulingError> {
    if conflict::patient_conflict(session, patient_id, interval)? {
        Err(reject(Violation::PatientConflict))
    } else {
        Ok(())
    }
}
