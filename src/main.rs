/// Command-line interface for the clinic scheduling system.
///
/// This binary provides an interactive CLI over an in-memory graph for
/// registering clinics, doctors, patients and work shifts, booking
/// appointments, and managing their status.

use chrono::{Datelike, Duration, Local, NaiveTime, SecondsFormat};
use clinic_scheduler::models::{NewClinic, NewDoctor, NewPatient};
use clinic_scheduler::{
    AppointmentScheduler, Calendar, Directory, MemoryGraph, NewAppointment, SchedulingError,
    Settings,
};
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type Graph = Arc<MemoryGraph>;

struct ClinicCLI {
    scheduler: AppointmentScheduler<Graph>,
    calendar: Calendar<Graph>,
    directory: Directory<Graph>,
    booked: Vec<String>,
    running: bool,
}

impl ClinicCLI {
    fn new(settings: &Settings) -> Self {
        let graph = Arc::new(MemoryGraph::new());
        ClinicCLI {
            scheduler: AppointmentScheduler::new(graph.clone(), settings.scheduler.clone()),
            calendar: Calendar::new(graph.clone()),
            directory: Directory::new(graph),
            booked: Vec::new(),
            running: true,
        }
    }

    fn print_header(&self) {
        println!("\n{}", "=".repeat(60));
        println!("       CLINIC APPOINTMENT SCHEDULING");
        println!("{}", "=".repeat(60));
    }

    fn print_menu(&self) {
        println!("\n--- Main Menu ---");
        println!("1. Add clinic");
        println!("2. Add doctor");
        println!("3. Add patient");
        println!("4. Add work shift");
        println!("5. Book appointment");
        println!("6. Update appointment status");
        println!("7. Add doctor to appointment");
        println!("8. Delete appointment");
        println!("9. View appointments");
        println!("10. List clinics and doctors");
        println!("11. Run demo");
        println!("12. Exit");
        println!("{}", "-".repeat(20));
    }

    fn get_input(&self, prompt: &str, default: Option<&str>) -> io::Result<String> {
        if let Some(def) = default {
            print!("{} [{}]: ", prompt, def);
        } else {
            print!("{}: ", prompt);
        }
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        let input = input.trim();

        if input.is_empty() {
            Ok(default.unwrap_or("").to_string())
        } else {
            Ok(input.to_string())
        }
    }

    fn get_int_input(&self, prompt: &str, default: Option<i64>) -> io::Result<i64> {
        loop {
            let default_str = default.map(|d| d.to_string());
            let input = self.get_input(prompt, default_str.as_deref())?;

            if let Ok(value) = input.parse::<i64>() {
                return Ok(value);
            }
            println!("Please enter a valid number");
        }
    }

    fn add_clinic(&mut self) -> io::Result<()> {
        println!("\n--- Add Clinic ---");
        let clinic = NewClinic {
            name: self.get_input("Name", Some("Downtown Clinic"))?,
            address: self.get_input("Address", Some("1 Main St"))?,
            phone: self.get_input("Phone number", Some("555-0100"))?,
            open_time: self.get_input("Opening time (HH:mm)", Some("09:00"))?,
            close_time: self.get_input("Closing time (HH:mm)", Some("17:00"))?,
        };
        match self.directory.create_clinic(&clinic) {
            Ok(clinic) => println!("\nClinic {} created with ID {}", clinic.name, clinic.id),
            Err(e) => report(&e),
        }
        Ok(())
    }

    fn add_doctor(&mut self) -> io::Result<()> {
        println!("\n--- Add Doctor ---");
        let doctor = NewDoctor {
            name: self.get_input("Name", Some("Dr. Smith"))?,
            specialization: self.get_input("Specialization", Some("General"))?,
            phone: self.get_input("Phone number", Some("555-0101"))?,
        };
        match self.directory.create_doctor(&doctor) {
            Ok(doctor) => println!("\nDoctor {} created with ID {}", doctor.name, doctor.id),
            Err(e) => report(&e),
        }

        let clinic_id = self.get_input("Clinic ID to work at (blank to skip)", None)?;
        if !clinic_id.is_empty() {
            let doctor_id = self.get_input("Doctor ID", None)?;
            let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
            let start_date = self.get_input("Start date (YYYY-MM-DD)", Some(&today))?;
            match self.directory.add_doctor_to_clinic(&doctor_id, &clinic_id, &start_date) {
                Ok(date) => println!("Affiliation recorded from {}", date),
                Err(e) => report(&e),
            }
        }
        Ok(())
    }

    fn add_patient(&mut self) -> io::Result<()> {
        println!("\n--- Add Patient ---");
        let patient = NewPatient {
            name: self.get_input("Name", None)?,
            phone: self.get_input("Phone number", None)?,
        };
        match self.directory.create_patient(&patient) {
            Ok(patient) => println!("\nPatient {} created with ID {}", patient.name, patient.id),
            Err(e) => report(&e),
        }
        Ok(())
    }

    fn add_work_shift(&mut self) -> io::Result<()> {
        println!("\n--- Add Work Shift ---");
        let doctor_id = self.get_input("Doctor ID", None)?;
        let day = self.get_input("Day", Some("Monday"))?;
        let start = self.get_input("Start time (HH:mm)", Some("09:00"))?;
        let end = self.get_input("End time (HH:mm)", Some("12:00"))?;

        match self.calendar.add_work_shift(&doctor_id, &day, &start, &end) {
            Ok(shift) => {
                println!("\nShift {} {} - {} added", shift.day, shift.start_time, shift.end_time);
                if let Ok(shifts) = self.calendar.shifts_on(&doctor_id, &day) {
                    println!("Shifts on {}: {}", shift.day, shifts.len());
                }
            }
            Err(e) => report(&e),
        }
        Ok(())
    }

    fn book_appointment(&mut self) -> io::Result<()> {
        println!("\n--- Book Appointment ---");
        let request = NewAppointment {
            doctor_id: self.get_input("Doctor ID", None)?,
            patient_id: self.get_input("Patient ID", None)?,
            clinic_id: self.get_input("Clinic ID", None)?,
            appointment_date: self.get_input("Start (RFC 3339, e.g. 2024-12-02T10:00:00Z)", None)?,
            duration: self.get_int_input("Duration (minutes)", Some(30))?,
        };
        match self.scheduler.create_appointment(&request) {
            Ok(appointment) => {
                println!("\nAppointment {} scheduled", appointment.id);
                self.booked.push(appointment.id);
            }
            Err(e) => report(&e),
        }
        Ok(())
    }

    fn update_status(&mut self) -> io::Result<()> {
        println!("\n--- Update Appointment Status ---");
        let id = self.get_input("Appointment ID", None)?;
        let status = self.get_input("New status (Scheduled/Cancelled/Completed)", Some("Cancelled"))?;
        match self.scheduler.update_status(&id, &status) {
            Ok(appointment) => println!("\nAppointment is now {}", appointment.status),
            Err(e) => report(&e),
        }
        Ok(())
    }

    fn add_doctor_to_appointment(&mut self) -> io::Result<()> {
        println!("\n--- Add Doctor to Appointment ---");
        let appointment_id = self.get_input("Appointment ID", None)?;
        let doctor_id = self.get_input("Doctor ID", None)?;
        match self.scheduler.add_doctor(&appointment_id, &doctor_id) {
            Ok(_) => println!("\nDoctor added"),
            Err(e) => report(&e),
        }
        Ok(())
    }

    fn delete_appointment(&mut self) -> io::Result<()> {
        println!("\n--- Delete Appointment ---");
        let id = self.get_input("Appointment ID", None)?;
        match self.scheduler.delete_appointment(&id) {
            Ok(()) => {
                self.booked.retain(|booked| booked != &id);
                println!("\nAppointment deleted");
            }
            Err(e) => report(&e),
        }
        Ok(())
    }

    fn view_appointments(&self) {
        if self.booked.is_empty() {
            println!("\nNo appointments booked in this session");
            return;
        }

        println!("\n--- Appointments ({}) ---", self.booked.len());
        for id in &self.booked {
            let appointment = match self.scheduler.get_appointment(id) {
                Ok(appointment) => appointment,
                Err(e) => {
                    report(&e);
                    continue;
                }
            };
            let doctors = self
                .scheduler
                .doctors_of(id)
                .map(|doctors| doctors.into_iter().map(|d| d.name).collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            let clinic = self
                .scheduler
                .clinic_of(id)
                .ok()
                .flatten()
                .map(|c| c.name)
                .unwrap_or_else(|| "-".to_string());

            println!(
                "  {} {} ({} min) [{}] at {} with {}",
                appointment.appointment_date.format("%Y-%m-%d %H:%M"),
                &appointment.id[..8],
                appointment.duration,
                appointment.status,
                clinic,
                doctors
            );
        }
    }

    fn list_records(&self) {
        match self.directory.list_clinics() {
            Ok(clinics) => {
                println!("\n--- Clinics ({}) ---", clinics.len());
                for clinic in clinics {
                    println!("  {} {} ({} - {})", clinic.id, clinic.name, clinic.open_time, clinic.close_time);
                }
            }
            Err(e) => report(&e),
        }
        match self.directory.list_doctors() {
            Ok(doctors) => {
                println!("\n--- Doctors ({}) ---", doctors.len());
                for doctor in doctors {
                    println!("  {} {} ({})", doctor.id, doctor.name, doctor.specialization);
                }
            }
            Err(e) => report(&e),
        }
    }

    fn run_demo(&mut self) -> Result<(), SchedulingError> {
        println!("\n--- Running Demo ---");

        let clinic = self.directory.create_clinic(&NewClinic {
            name: "Demo Clinic".to_string(),
            address: "1 Main St".to_string(),
            phone: "555-0100".to_string(),
            open_time: "09:00".to_string(),
            close_time: "17:00".to_string(),
        })?;
        let doctor = self.directory.create_doctor(&NewDoctor {
            name: "Dr. Demo".to_string(),
            specialization: "General".to_string(),
            phone: "555-0101".to_string(),
        })?;
        let patient = self.directory.create_patient(&NewPatient {
            name: "John Smith".to_string(),
            phone: "555-0102".to_string(),
        })?;
        self.calendar.add_work_shift(&doctor.id, "Monday", "09:00", "12:00")?;
        println!("Clinic open 09:00 - 17:00, {} works Monday 09:00 - 12:00", doctor.name);

        let today = Local::now().fixed_offset();
        let days_ahead = 7 - i64::from(today.weekday().num_days_from_monday());
        let monday = (today + Duration::days(days_ahead)).date_naive();
        let at = |hour: u32, minute: u32| -> String {
            let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
            monday
                .and_time(time)
                .and_local_timezone(*today.offset())
                .single()
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default()
        };
        let request = |date: String, duration: i64| NewAppointment {
            doctor_id: doctor.id.clone(),
            patient_id: patient.id.clone(),
            clinic_id: clinic.id.clone(),
            appointment_date: date,
            duration,
        };

        let attempts = [
            ("Monday 10:00 for 30 min", request(at(10, 0), 30)),
            ("Monday 10:15 for 30 min", request(at(10, 15), 30)),
            ("Monday 10:30 for 30 min", request(at(10, 30), 30)),
            ("Monday 13:00 for 30 min", request(at(13, 0), 30)),
        ];

        println!("\nBooking requests:");
        let mut first = None;
        for (label, attempt) in &attempts {
            match self.scheduler.create_appointment(attempt) {
                Ok(appointment) => {
                    println!("  {:25} -> scheduled", label);
                    first.get_or_insert_with(|| appointment.id.clone());
                    self.booked.push(appointment.id);
                }
                Err(e) => println!("  {:25} -> {}", label, e),
            }
        }

        if let Some(id) = first {
            self.scheduler.update_status(&id, "Cancelled")?;
            let rebooked = self.scheduler.create_appointment(&attempts[0].1)?;
            println!("\nCancelled the 10:00 booking and rebooked the slot");
            self.booked.push(rebooked.id);
        }

        println!("\nNote: the 10:15 request overlaps 10:00 - 10:30, while 10:30");
        println!("starts exactly when the first one ends and is accepted.");
        Ok(())
    }

    fn run(&mut self) -> io::Result<()> {
        self.print_header();

        while self.running {
            self.print_menu();

            let choice = self.get_int_input("Enter choice", Some(11))?;

            match choice {
                1 => self.add_clinic()?,
                2 => self.add_doctor()?,
                3 => self.add_patient()?,
                4 => self.add_work_shift()?,
                5 => self.book_appointment()?,
                6 => self.update_status()?,
                7 => self.add_doctor_to_appointment()?,
                8 => self.delete_appointment()?,
                9 => self.view_appointments(),
                10 => self.list_records(),
                11 => {
                    if let Err(e) = self.run_demo() {
                        report(&e);
                    }
                }
                12 => {
                    self.running = false;
                    println!("\nGoodbye!");
                }
                _ => println!("Invalid choice"),
            }
        }
        Ok(())
    }
}

fn report(err: &SchedulingError) {
    println!("\nError: {}", err);
}

fn main() {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut cli = ClinicCLI::new(&settings);
    match cli.run() {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => println!("\nGoodbye!"),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
