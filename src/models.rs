/// Data models for the clinic scheduling system.
///
/// This module defines the records persisted in the clinic graph:
/// - AppointmentStatus: lifecycle state of an appointment
/// - Day / ClockTime: weekly shift and opening-hour building blocks
/// - Appointment, Doctor, Patient, Clinic, WorkShift: stored records
/// - NewAppointment, NewClinic, ...: inbound requests and allow-listed updates

use crate::error::Violation;
use crate::interval::Interval;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an appointment.
///
/// New appointments always start as `Scheduled`. Only `Scheduled`
/// appointments take part in conflict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Convert a string to a status. Matching is exact.
    pub fn from_string(value: &str) -> Result<Self, Violation> {
        match value {
            "Scheduled" => Ok(AppointmentStatus::Scheduled),
            "Cancelled" => Ok(AppointmentStatus::Cancelled),
            "Completed" => Ok(AppointmentStatus::Completed),
            _ => Err(Violation::InvalidStatus(value.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Day of the week a work shift repeats on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    /// Parse a day name such as "Monday". Case and surrounding
    /// whitespace are ignored.
    pub fn from_string(value: &str) -> Result<Self, Violation> {
        match value.trim().to_lowercase().as_str() {
            "monday" => Ok(Day::Monday),
            "tuesday" => Ok(Day::Tuesday),
            "wednesday" => Ok(Day::Wednesday),
            "thursday" => Ok(Day::Thursday),
            "friday" => Ok(Day::Friday),
            "saturday" => Ok(Day::Saturday),
            "sunday" => Ok(Day::Sunday),
            _ => Err(Violation::InvalidDay(value.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for Day {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Day::Monday,
            Weekday::Tue => Day::Tuesday,
            Weekday::Wed => Day::Wednesday,
            Weekday::Thu => Day::Thursday,
            Weekday::Fri => Day::Friday,
            Weekday::Sat => Day::Saturday,
            Weekday::Sun => Day::Sunday,
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A wall-clock time of day in 24-hour `HH:mm` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(ClockTime)
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for ClockTime {
    type Err = Violation;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = value.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(Violation::InvalidTimeFormat(value.to_string()));
        }
        NaiveTime::parse_from_str(value, "%H:%M")
            .map(ClockTime)
            .map_err(|_| Violation::InvalidTimeFormat(value.to_string()))
    }
}

impl TryFrom<String> for ClockTime {
    type Error = Violation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(time: ClockTime) -> Self {
        time.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

/// Parse an `HH:mm` pair and require `start < end`.
pub fn parse_time_range(start: &str, end: &str) -> Result<(ClockTime, ClockTime), Violation> {
    let start_time: ClockTime = start.parse()?;
    let end_time: ClockTime = end.parse()?;
    if start_time >= end_time {
        return Err(Violation::InvalidTimeRange {
            start: start_time.to_string(),
            end: end_time.to_string(),
        });
    }
    Ok((start_time, end_time))
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, Violation> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| Violation::InvalidDate(value.to_string()))
}

/// True when `[start, end)` of `interval` lies inside `[open, close]` on a
/// single local day.
fn within_hours(interval: &Interval, open: ClockTime, close: ClockTime) -> bool {
    interval.is_same_day()
        && interval.start_time() >= open.as_naive()
        && interval.end_time() <= close.as_naive()
}

/// A persisted appointment. Field names on the wire follow the stored
/// property bag (`AppointmentDate`, `Status`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    #[serde(rename = "AppointmentDate")]
    pub appointment_date: DateTime<FixedOffset>,
    pub duration: i64,
    #[serde(rename = "Status")]
    pub status: AppointmentStatus,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The half-open interval this appointment occupies.
    pub fn interval(&self) -> Result<Interval, Violation> {
        Interval::from_duration(self.appointment_date, self.duration)
    }

    /// Check if this appointment blocks `proposed`.
    ///
    /// Only scheduled appointments block; a record with an unusable
    /// duration never does.
    pub fn blocks(&self, proposed: &Interval) -> bool {
        self.status == AppointmentStatus::Scheduled
            && self
                .interval()
                .map(|own| own.overlaps_with(proposed))
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialization: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clinic {
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(rename = "phoneNumber")]
    pub phone: String,
    pub open_time: ClockTime,
    pub close_time: ClockTime,
}

impl Clinic {
    /// Check if the clinic is open for the whole of `interval`.
    /// Both bounds are inclusive.
    pub fn is_open_during(&self, interval: &Interval) -> bool {
        within_hours(interval, self.open_time, self.close_time)
    }
}

/// A doctor's recurring weekly availability on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkShift {
    pub id: String,
    pub day: Day,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl WorkShift {
    /// Check if the shift covers the time of day of `interval`. The
    /// caller is responsible for matching the day.
    pub fn covers(&self, interval: &Interval) -> bool {
        within_hours(interval, self.start_time, self.end_time)
    }

    /// Check if this shift overlaps another range on the same day.
    pub fn overlaps_with(&self, start: ClockTime, end: ClockTime) -> bool {
        self.start_time < end && self.end_time > start
    }
}

/// A record reached through a `WORK_AT` relationship, with the date the
/// doctor started there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Affiliated<T> {
    #[serde(flatten)]
    pub record: T,
    pub start_date: NaiveDate,
}

/// Request to book a new appointment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub doctor_id: String,
    pub patient_id: String,
    pub clinic_id: String,
    pub appointment_date: String,
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClinic {
    pub name: String,
    pub address: String,
    #[serde(rename = "phoneNumber")]
    pub phone: String,
    pub open_time: String,
    pub close_time: String,
}

/// Fields of a clinic that may be changed after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone: Option<String>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewDoctor {
    pub name: String,
    pub specialization: String,
    pub phone: String,
}

/// Fields of a doctor that may be changed after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DoctorUpdate {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub phone: String,
}

/// Reject empty or whitespace-only text fields.
pub fn require_text(field: &'static str, value: &str) -> Result<(), Violation> {
    if value.trim().is_empty() {
        return Err(Violation::EmptyField(field));
    }
    Ok(())
}
