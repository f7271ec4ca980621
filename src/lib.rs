//! Appointment scheduling validation for a network of clinics.
//!
//! Doctors, patients, clinics, appointments and work shifts live in a
//! property graph behind the `GraphStore` trait. `AppointmentScheduler`
//! books and maintains appointments, `Calendar` manages work shifts and
//! `Directory` the remaining records.

pub mod availability;
pub mod calendar;
pub mod config;
pub mod conflict;
pub mod directory;
pub mod error;
pub mod gate;
pub mod interval;
pub mod memory;
pub mod models;
pub mod scheduler;
pub mod store;

pub use calendar::Calendar;
pub use config::{SchedulerConfig, Settings, TransitionPolicy};
pub use directory::Directory;
pub use error::{SchedulingError, Violation};
pub use interval::Interval;
pub use memory::MemoryGraph;
pub use models::{Appointment, AppointmentStatus, Clinic, Day, Doctor, NewAppointment, Patient, WorkShift};
pub use scheduler::AppointmentScheduler;
pub use store::{GraphSession, GraphStore, Label, StoreError};
