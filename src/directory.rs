/// Clinic, doctor and patient records, and the `WORK_AT` affiliations
/// between doctors and clinics.
///
/// Updates go through `ClinicUpdate` / `DoctorUpdate`; only the fields
/// listed there can change.

use crate::error::{SchedulingError, Violation};
use crate::gate;
use crate::models::{
    parse_date, parse_time_range, require_text, Affiliated, Clinic, ClockTime, Doctor,
    DoctorUpdate, NewClinic, NewDoctor, NewPatient, Patient, ClinicUpdate,
};
use crate::store::{
    Direction, GraphSession, GraphStore, Label, Link, Neighbor, Node, NodeRef, Properties,
    RelType, StoreError,
};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

const START_DATE: &str = "startDate";

pub struct Directory<S: GraphStore> {
    store: S,
}

impl<S: GraphStore> Directory<S> {
    pub fn new(store: S) -> Self {
        Directory { store }
    }

    #[instrument(skip(self, clinic), fields(name = %clinic.name))]
    pub fn create_clinic(&self, clinic: &NewClinic) -> Result<Clinic, SchedulingError> {
        require_text("name", &clinic.name)?;
        let (open_time, close_time) = parse_time_range(&clinic.open_time, &clinic.close_time)?;
        let record = Clinic {
            id: Uuid::new_v4().to_string(),
            name: clinic.name.clone(),
            address: clinic.address.clone(),
            phone: clinic.phone.clone(),
            open_time,
            close_time,
        };
        self.insert(Label::Clinic, &record, &record.id)?;
        Ok(record)
    }

    pub fn get_clinic(&self, id: &str) -> Result<Clinic, SchedulingError> {
        let session = self.store.session()?;
        gate::load(session.as_ref(), Label::Clinic, id)
    }

    pub fn list_clinics(&self) -> Result<Vec<Clinic>, SchedulingError> {
        let session = self.store.session()?;
        gate::load_all(session.as_ref(), Label::Clinic)
    }

    /// Apply an update; opening hours are re-validated against the
    /// resulting pair, not just the fields supplied.
    #[instrument(skip(self, update))]
    pub fn update_clinic(&self, id: &str, update: &ClinicUpdate) -> Result<Clinic, SchedulingError> {
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }
        let open_time = update
            .open_time
            .as_deref()
            .map(str::parse::<ClockTime>)
            .transpose()?;
        let close_time = update
            .close_time
            .as_deref()
            .map(str::parse::<ClockTime>)
            .transpose()?;

        let session = self.store.session()?;
        let s = session.as_ref();
        let current: Clinic = gate::load(s, Label::Clinic, id)?;

        let open = open_time.unwrap_or(current.open_time);
        let close = close_time.unwrap_or(current.close_time);
        if open >= close {
            return Err(Violation::InvalidTimeRange {
                start: open.to_string(),
                end: close.to_string(),
            }
            .into());
        }

        let mut properties = Properties::new();
        set_text(&mut properties, "name", &update.name);
        set_text(&mut properties, "address", &update.address);
        set_text(&mut properties, "phoneNumber", &update.phone);
        if let Some(open) = open_time {
            properties.insert("openTime".into(), Value::String(open.to_string()));
        }
        if let Some(close) = close_time {
            properties.insert("closeTime".into(), Value::String(close.to_string()));
        }
        self.apply(s, Label::Clinic, id, properties)
    }

    #[instrument(skip(self))]
    pub fn delete_clinic(&self, id: &str) -> Result<(), SchedulingError> {
        self.remove(Label::Clinic, id)
    }

    #[instrument(skip(self, doctor), fields(name = %doctor.name))]
    pub fn create_doctor(&self, doctor: &NewDoctor) -> Result<Doctor, SchedulingError> {
        require_text("name", &doctor.name)?;
        let record = Doctor {
            id: Uuid::new_v4().to_string(),
            name: doctor.name.clone(),
            specialization: doctor.specialization.clone(),
            phone: doctor.phone.clone(),
        };
        self.insert(Label::Doctor, &record, &record.id)?;
        Ok(record)
    }

    pub fn get_doctor(&self, id: &str) -> Result<Doctor, SchedulingError> {
        let session = self.store.session()?;
        gate::load(session.as_ref(), Label::Doctor, id)
    }

    pub fn list_doctors(&self) -> Result<Vec<Doctor>, SchedulingError> {
        let session = self.store.session()?;
        gate::load_all(session.as_ref(), Label::Doctor)
    }

    #[instrument(skip(self, update))]
    pub fn update_doctor(&self, id: &str, update: &DoctorUpdate) -> Result<Doctor, SchedulingError> {
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }
        let session = self.store.session()?;
        let s = session.as_ref();
        gate::require(s, Label::Doctor, id)?;

        let mut properties = Properties::new();
        set_text(&mut properties, "name", &update.name);
        set_text(&mut properties, "specialization", &update.specialization);
        set_text(&mut properties, "phone", &update.phone);
        self.apply(s, Label::Doctor, id, properties)
    }

    #[instrument(skip(self))]
    pub fn delete_doctor(&self, id: &str) -> Result<(), SchedulingError> {
        self.remove(Label::Doctor, id)
    }

    #[instrument(skip(self, patient), fields(name = %patient.name))]
    pub fn create_patient(&self, patient: &NewPatient) -> Result<Patient, SchedulingError> {
        require_text("name", &patient.name)?;
        let record = Patient {
            id: Uuid::new_v4().to_string(),
            name: patient.name.clone(),
            phone: patient.phone.clone(),
        };
        self.insert(Label::Patient, &record, &record.id)?;
        Ok(record)
    }

    pub fn get_patient(&self, id: &str) -> Result<Patient, SchedulingError> {
        let session = self.store.session()?;
        gate::load(session.as_ref(), Label::Patient, id)
    }

    /// Record that a doctor works at a clinic from `start_date`
    /// (`YYYY-MM-DD`). Adding an existing affiliation rebinds its date.
    #[instrument(skip(self))]
    pub fn add_doctor_to_clinic(
        &self,
        doctor_id: &str,
        clinic_id: &str,
        start_date: &str,
    ) -> Result<NaiveDate, SchedulingError> {
        let date = parse_date(start_date)?;
        let session = self.store.session()?;
        let s = session.as_ref();
        gate::require(s, Label::Doctor, doctor_id)?;
        gate::require(s, Label::Clinic, clinic_id)?;

        s.merge_relationship(&NodeRef::new(Label::Doctor, doctor_id), &work_at(clinic_id, date)?)?;
        info!(%date, "doctor affiliated with clinic");
        Ok(date)
    }

    #[instrument(skip(self))]
    pub fn update_affiliation_start(
        &self,
        doctor_id: &str,
        clinic_id: &str,
        start_date: &str,
    ) -> Result<NaiveDate, SchedulingError> {
        let date = parse_date(start_date)?;
        let session = self.store.session()?;
        let summary = session.update_relationship(
            &NodeRef::new(Label::Doctor, doctor_id),
            &work_at(clinic_id, date)?,
        )?;
        if !summary.contains_updates() {
            return Err(missing_affiliation(session.as_ref(), doctor_id, clinic_id)?);
        }
        info!(%date, "affiliation start date updated");
        Ok(date)
    }

    #[instrument(skip(self))]
    pub fn remove_doctor_from_clinic(&self, doctor_id: &str, clinic_id: &str) -> Result<(), SchedulingError> {
        let session = self.store.session()?;
        let summary = session.delete_relationship(
            &NodeRef::new(Label::Doctor, doctor_id),
            &Link::outgoing(RelType::WorkAt, Label::Clinic, clinic_id),
        )?;
        if summary.relationships_deleted == 0 {
            return Err(missing_affiliation(session.as_ref(), doctor_id, clinic_id)?);
        }
        info!("affiliation removed");
        Ok(())
    }

    pub fn clinics_of_doctor(&self, doctor_id: &str) -> Result<Vec<Affiliated<Clinic>>, SchedulingError> {
        let session = self.store.session()?;
        gate::require(session.as_ref(), Label::Doctor, doctor_id)?;
        let neighbors = session.neighbors(Label::Doctor, doctor_id, RelType::WorkAt, Direction::Outgoing)?;
        Ok(affiliated(neighbors)?)
    }

    pub fn doctors_of_clinic(&self, clinic_id: &str) -> Result<Vec<Affiliated<Doctor>>, SchedulingError> {
        let session = self.store.session()?;
        gate::require(session.as_ref(), Label::Clinic, clinic_id)?;
        let neighbors = session.neighbors(Label::Clinic, clinic_id, RelType::WorkAt, Direction::Incoming)?;
        Ok(affiliated(neighbors)?)
    }

    fn insert<T: serde::Serialize>(&self, label: Label, record: &T, id: &str) -> Result<(), SchedulingError> {
        let session = self.store.session()?;
        session.create_node(Node::from_record(label, record)?, &[])?;
        info!(%label, id, "record created");
        Ok(())
    }

    fn apply<T: DeserializeOwned>(
        &self,
        session: &dyn GraphSession,
        label: Label,
        id: &str,
        properties: Properties,
    ) -> Result<T, SchedulingError> {
        if !properties.is_empty() {
            let summary = session.update_node(label, id, properties)?;
            if !summary.contains_updates() {
                return Err(SchedulingError::not_found(label, id));
            }
            info!(%label, id, fields = summary.properties_set, "record updated");
        }
        gate::load(session, label, id)
    }

    fn remove(&self, label: Label, id: &str) -> Result<(), SchedulingError> {
        let session = self.store.session()?;
        let summary = session.delete_node(label, id)?;
        if summary.nodes_deleted == 0 {
            return Err(SchedulingError::not_found(label, id));
        }
        info!(%label, id, detached = summary.relationships_deleted, "record deleted");
        Ok(())
    }
}

fn set_text(properties: &mut Properties, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        properties.insert(key.to_string(), Value::String(value.clone()));
    }
}

fn work_at(clinic_id: &str, date: NaiveDate) -> Result<Link, StoreError> {
    Ok(Link::outgoing(RelType::WorkAt, Label::Clinic, clinic_id)
        .with_property(START_DATE, serde_json::to_value(date)?))
}

/// Pick the most specific `NotFound` for a missing affiliation: the doctor,
/// else the clinic (which is also reported when both exist but are not linked).
fn missing_affiliation(
    session: &dyn GraphSession,
    doctor_id: &str,
    clinic_id: &str,
) -> Result<SchedulingError, StoreError> {
    if !gate::doctor_exists(session, doctor_id)? {
        return Ok(SchedulingError::not_found(Label::Doctor, doctor_id));
    }
    Ok(SchedulingError::not_found(Label::Clinic, clinic_id))
}

fn affiliated<T: DeserializeOwned>(neighbors: Vec<Neighbor>) -> Result<Vec<Affiliated<T>>, StoreError> {
    neighbors
        .into_iter()
        .map(|neighbor| -> Result<Affiliated<T>, StoreError> {
            let start_date = neighbor
                .relationship
                .get(START_DATE)
                .cloned()
                .ok_or_else(|| StoreError::Query("WORK_AT relationship without startDate".into()))?;
            Ok(Affiliated {
                record: neighbor.node.decode()?,
                start_date: serde_json::from_value(start_date)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use std::sync::Arc;

    fn directory() -> Directory<Arc<MemoryGraph>> {
        Directory::new(Arc::new(MemoryGraph::new()))
    }

    fn new_clinic(open: &str, close: &str) -> NewClinic {
        NewClinic {
            name: "Riverside".into(),
            address: "1 Main St".into(),
            phone: "555-0100".into(),
            open_time: open.into(),
            close_time: close.into(),
        }
    }

    fn new_doctor(name: &str) -> NewDoctor {
        NewDoctor {
            name: name.into(),
            specialization: "Cardiology".into(),
            phone: "555-0199".into(),
        }
    }

    #[test]
    fn clinic_hours_are_validated() {
        let directory = directory();
        let clinic = directory.create_clinic(&new_clinic("09:00", "17:00")).unwrap();
        assert_eq!(directory.get_clinic(&clinic.id).unwrap(), clinic);

        assert!(matches!(
            directory.create_clinic(&new_clinic("17:00", "09:00")).unwrap_err().violation(),
            Some(Violation::InvalidTimeRange { .. })
        ));
        assert!(matches!(
            directory.create_clinic(&new_clinic("9am", "17:00")).unwrap_err().violation(),
            Some(Violation::InvalidTimeFormat(_))
        ));
    }

    #[test]
    fn clinic_update_checks_merged_hours() {
        let directory = directory();
        let clinic = directory.create_clinic(&new_clinic("09:00", "17:00")).unwrap();

        let late_open = ClinicUpdate {
            open_time: Some("18:00".into()),
            ..ClinicUpdate::default()
        };
        assert!(matches!(
            directory.update_clinic(&clinic.id, &late_open).unwrap_err().violation(),
            Some(Violation::InvalidTimeRange { .. })
        ));

        let update = ClinicUpdate {
            name: Some("Riverside East".into()),
            close_time: Some("19:30".into()),
            ..ClinicUpdate::default()
        };
        let updated = directory.update_clinic(&clinic.id, &update).unwrap();
        assert_eq!(updated.name, "Riverside East");
        assert_eq!(updated.close_time.to_string(), "19:30");
        assert_eq!(updated.address, clinic.address);

        assert!(directory.update_clinic("c-404", &update).unwrap_err().is_not_found());
    }

    #[test]
    fn empty_update_returns_current_record() {
        let directory = directory();
        let doctor = directory.create_doctor(&new_doctor("Dr. Lan")).unwrap();
        let same = directory.update_doctor(&doctor.id, &DoctorUpdate::default()).unwrap();
        assert_eq!(same, doctor);
    }

    #[test]
    fn doctor_crud() {
        let directory = directory();
        let doctor = directory.create_doctor(&new_doctor("Dr. Lan")).unwrap();
        let updated = directory
            .update_doctor(
                &doctor.id,
                &DoctorUpdate {
                    phone: Some("555-0000".into()),
                    ..DoctorUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.phone, "555-0000");
        assert_eq!(updated.specialization, "Cardiology");
        assert_eq!(directory.list_doctors().unwrap().len(), 1);

        directory.delete_doctor(&doctor.id).unwrap();
        assert!(directory.get_doctor(&doctor.id).unwrap_err().is_not_found());
        assert!(directory.delete_doctor(&doctor.id).unwrap_err().is_not_found());
    }

    #[test]
    fn names_cannot_be_blank() {
        let directory = directory();
        let err = directory.create_doctor(&new_doctor("  ")).unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::EmptyField("name")));
        let err = directory
            .create_patient(&NewPatient {
                name: String::new(),
                phone: "1".into(),
            })
            .unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::EmptyField("name")));
    }

    #[test]
    fn affiliations_carry_start_dates() {
        let directory = directory();
        let clinic = directory.create_clinic(&new_clinic("09:00", "17:00")).unwrap();
        let doctor = directory.create_doctor(&new_doctor("Dr. Lan")).unwrap();

        directory.add_doctor_to_clinic(&doctor.id, &clinic.id, "2024-01-15").unwrap();
        let clinics = directory.clinics_of_doctor(&doctor.id).unwrap();
        assert_eq!(clinics.len(), 1);
        assert_eq!(clinics[0].record.id, clinic.id);
        assert_eq!(clinics[0].start_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

        directory.add_doctor_to_clinic(&doctor.id, &clinic.id, "2024-03-01").unwrap();
        directory.update_affiliation_start(&doctor.id, &clinic.id, "2024-04-01").unwrap();
        let doctors = directory.doctors_of_clinic(&clinic.id).unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].start_date, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());

        directory.remove_doctor_from_clinic(&doctor.id, &clinic.id).unwrap();
        assert!(directory.doctors_of_clinic(&clinic.id).unwrap().is_empty());
        assert!(directory
            .remove_doctor_from_clinic(&doctor.id, &clinic.id)
            .unwrap_err()
            .is_not_found());
        assert!(directory
            .update_affiliation_start(&doctor.id, &clinic.id, "2024-05-01")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn affiliation_validates_inputs() {
        let directory = directory();
        let clinic = directory.create_clinic(&new_clinic("09:00", "17:00")).unwrap();
        let doctor = directory.create_doctor(&new_doctor("Dr. Lan")).unwrap();

        assert!(matches!(
            directory.add_doctor_to_clinic(&doctor.id, &clinic.id, "15-01-2024").unwrap_err().violation(),
            Some(Violation::InvalidDate(_))
        ));
        match directory.add_doctor_to_clinic("d-404", &clinic.id, "2024-01-15") {
            Err(SchedulingError::NotFound { entity, .. }) => assert_eq!(entity, Label::Doctor),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
