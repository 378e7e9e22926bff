//! Receptionist operations: patient registration and appointment booking.

use chrono::{DateTime, NaiveDateTime};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::{self, DatabaseError};
use crate::models::*;
use crate::validation::{double_option, max_length, parse_age, parse_choice, required_text, FieldErrors};

const FULL_NAME_MAX: usize = 200;
const PHONE_MAX: usize = 30;
const REASON_MAX: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum FrontDeskError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Completed appointments cannot be cancelled")]
    AlreadyCompleted,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<FieldErrors> for FrontDeskError {
    fn from(errors: FieldErrors) -> Self {
        FrontDeskError::Validation(errors)
    }
}

// ─── Patients ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientInput {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub age: Option<Option<i64>>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

fn resolve_patient_fields(current: Option<&Patient>, input: &PatientInput) -> Result<PatientFields, FieldErrors> {
    let mut errors = FieldErrors::new();

    let full_name = match (&input.full_name, current) {
        (None, Some(cur)) => cur.full_name.clone(),
        (value, _) => required_text(&mut errors, "full_name", value.as_deref()),
    };
    max_length(&mut errors, "full_name", &full_name, FULL_NAME_MAX);

    let age = match (input.age, current) {
        (Some(Some(v)), _) => parse_age(&mut errors, "age", v),
        (Some(None), _) => None,
        (None, cur) => cur.and_then(|c| c.age),
    };

    let gender = match (&input.gender, current) {
        (Some(v), _) => parse_choice(&mut errors, "gender", v).unwrap_or_default(),
        (None, cur) => cur.map(|c| c.gender).unwrap_or_default(),
    };

    let text = |value: &Option<String>, kept: Option<&String>| match value {
        Some(v) => v.trim().to_string(),
        None => kept.cloned().unwrap_or_default(),
    };
    let phone = text(&input.phone, current.map(|c| &c.phone));
    max_length(&mut errors, "phone", &phone, PHONE_MAX);
    let address = text(&input.address, current.map(|c| &c.address));

    errors.into_result()?;
    Ok(PatientFields { full_name, age, gender, phone, address })
}

pub fn list_patients(conn: &Connection, search: Option<&str>) -> Result<Vec<Patient>, FrontDeskError> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    Ok(db::list_patients(conn, search)?)
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Patient, FrontDeskError> {
    db::get_patient(conn, id)?.ok_or(FrontDeskError::NotFound("Patient"))
}

pub fn create_patient(conn: &Connection, input: &PatientInput) -> Result<Patient, FrontDeskError> {
    let fields = resolve_patient_fields(None, input)?;
    let patient = db::insert_patient(conn, &fields)?;
    tracing::info!(patient_id = patient.id, "Patient registered");
    Ok(patient)
}

/// Apply the fields present in `input`; absent fields are kept.
pub fn update_patient(conn: &Connection, id: i64, input: &PatientInput) -> Result<Patient, FrontDeskError> {
    let current = get_patient(conn, id)?;
    let fields = resolve_patient_fields(Some(&current), input)?;
    db::update_patient(conn, id, &fields)?;
    get_patient(conn, id)
}

// ─── Appointments ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentInput {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub appointment_datetime: Option<String>,
    pub reason: Option<String>,
}

/// Accepts RFC 3339 (offset converted to UTC) or a naive `YYYY-MM-DD[T ]HH:MM[:SS]`.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn resolve_appointment_fields(
    conn: &Connection,
    current: Option<&Appointment>,
    input: &AppointmentInput,
) -> Result<AppointmentFields, FrontDeskError> {
    let mut errors = FieldErrors::new();

    let doctor_id = match input.doctor_id.or(current.and_then(|c| c.doctor_id)) {
        Some(id) => {
            let is_doctor = db::get_employee(conn, id)?.is_some_and(|e| e.role == Role::Doctor);
            if !is_doctor {
                errors.add("doctor_id", format!("Invalid pk \"{id}\" - no doctor with this id."));
            }
            id
        }
        None => {
            errors.add("doctor_id", "This field is required.");
            0
        }
    };

    let patient_id = match input.patient_id.or(current.map(|c| c.patient_id)) {
        Some(id) => {
            if db::get_patient(conn, id)?.is_none() {
                errors.add("patient_id", format!("Invalid pk \"{id}\" - object does not exist."));
            }
            id
        }
        None => {
            errors.add("patient_id", "This field is required.");
            0
        }
    };

    let appointment_datetime = match (&input.appointment_datetime, current) {
        (Some(raw), _) => parse_datetime(raw),
        (None, Some(cur)) => Some(cur.appointment_datetime),
        (None, None) => None,
    };
    if appointment_datetime.is_none() {
        let message = if input.appointment_datetime.is_some() {
            "Datetime has wrong format. Use YYYY-MM-DDThh:mm[:ss]."
        } else {
            "This field is required."
        };
        errors.add("appointment_datetime", message);
    }

    let reason = match (&input.reason, current) {
        (Some(v), _) => v.trim().to_string(),
        (None, Some(cur)) => cur.reason.clone(),
        (None, None) => String::new(),
    };
    max_length(&mut errors, "reason", &reason, REASON_MAX);

    errors.into_result()?;
    let appointment_datetime = appointment_datetime
        .ok_or_else(|| FieldErrors::single("appointment_datetime", "This field is required."))?;
    Ok(AppointmentFields {
        doctor_id,
        patient_id,
        appointment_datetime,
        reason,
    })
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, FrontDeskError> {
    Ok(db::list_appointments(conn, filter)?)
}

pub fn get_appointment(conn: &Connection, id: i64) -> Result<Appointment, FrontDeskError> {
    db::get_appointment(conn, id)?.ok_or(FrontDeskError::NotFound("Appointment"))
}

/// Book a new appointment in the SCHEDULED state.
pub fn create_appointment(conn: &Connection, input: &AppointmentInput) -> Result<Appointment, FrontDeskError> {
    let fields = resolve_appointment_fields(conn, None, input)?;
    let appt = db::insert_appointment(conn, &fields)?;
    tracing::info!(
        appointment_id = appt.id,
        doctor_id = fields.doctor_id,
        patient_id = fields.patient_id,
        "Appointment booked"
    );
    Ok(appt)
}

/// Reschedule, reassign or change the reason. Absent fields are kept.
pub fn update_appointment(
    conn: &Connection,
    id: i64,
    input: &AppointmentInput,
) -> Result<Appointment, FrontDeskError> {
    let current = get_appointment(conn, id)?;
    let fields = resolve_appointment_fields(conn, Some(&current), input)?;
    db::update_appointment(conn, id, &fields)?;
    tracing::info!(appointment_id = id, "Appointment updated");
    get_appointment(conn, id)
}

pub fn cancel_appointment(conn: &Connection, id: i64) -> Result<Appointment, FrontDeskError> {
    let current = get_appointment(conn, id)?;
    if current.status == AppointmentStatus::Completed {
        return Err(FrontDeskError::AlreadyCompleted);
    }
    db::set_appointment_status(conn, id, AppointmentStatus::Cancelled)?;
    tracing::info!(appointment_id = id, "Appointment cancelled");
    get_appointment(conn, id)
}

/// Doctor-role employees available for booking.
pub fn list_doctors(conn: &Connection) -> Result<Vec<EmployeeRecord>, FrontDeskError> {
    Ok(db::list_employee_records(conn, Some(Role::Doctor))?)
}
