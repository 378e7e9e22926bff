//! Doctor-facing operations on the doctor's own appointments.
//!
//! Every lookup is scoped by `doctor_id`: an appointment assigned to
//! someone else is indistinguishable from one that does not exist.

use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::billing;
use crate::db::{self, DatabaseError};
use crate::models::*;
use crate::validation::{max_length, required_text, FieldErrors};

const MEDICINE_NAME_MAX: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum ConsultationError {
    #[error("Appointment not found or not assigned to you")]
    AppointmentNotFound,
    #[error("Prescription not found")]
    PrescriptionNotFound,
    #[error("Prescription already exists for this appointment")]
    PrescriptionExists,
    #[error("Prescription does not exist")]
    NoPrescription,
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<FieldErrors> for ConsultationError {
    fn from(errors: FieldErrors) -> Self {
        ConsultationError::Validation(errors)
    }
}

impl From<rusqlite::Error> for ConsultationError {
    fn from(err: rusqlite::Error) -> Self {
        ConsultationError::Database(err.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrescriptionInput {
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub items: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabOrderInput {
    pub tests: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PharmacyOrderInput {
    pub items: Option<Value>,
}

fn owned_appointment(
    conn: &Connection,
    doctor_id: i64,
    appointment_id: i64,
) -> Result<Appointment, ConsultationError> {
    db::get_appointment_for_doctor(conn, appointment_id, doctor_id)?
        .ok_or(ConsultationError::AppointmentNotFound)
}

fn clean_item(errors: &mut FieldErrors, field: &str, item: &NewPrescriptionItem) -> NewPrescriptionItem {
    let medicine_name = required_text(errors, field, Some(&item.medicine_name));
    max_length(errors, field, &medicine_name, MEDICINE_NAME_MAX);
    let trimmed = |v: &Option<String>| v.as_deref().map(str::trim).map(str::to_string);
    NewPrescriptionItem {
        medicine_name,
        dosage: trimmed(&item.dosage),
        duration: trimmed(&item.duration),
        instructions: trimmed(&item.instructions),
    }
}

/// Items are checked only once the appointment is known to be the caller's.
fn parse_prescription_items(value: Option<&Value>) -> Result<Vec<NewPrescriptionItem>, FieldErrors> {
    let items: Vec<NewPrescriptionItem> = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|_| FieldErrors::single("items", "Expected a list of items."))?,
    };
    let mut errors = FieldErrors::new();
    let cleaned = items
        .iter()
        .map(|item| clean_item(&mut errors, "items", item))
        .collect();
    errors.into_result()?;
    Ok(cleaned)
}

/// The doctor's appointments, latest first.
pub fn my_appointments(conn: &Connection, doctor_id: i64) -> Result<Vec<Appointment>, ConsultationError> {
    let filter = AppointmentFilter {
        doctor_id: Some(doctor_id),
        ..Default::default()
    };
    Ok(db::list_appointments(conn, &filter)?)
}

pub fn appointment_detail(
    conn: &Connection,
    doctor_id: i64,
    appointment_id: i64,
) -> Result<Appointment, ConsultationError> {
    owned_appointment(conn, doctor_id, appointment_id)
}

/// Write the prescription with its items and complete the appointment.
pub fn create_prescription(
    conn: &mut Connection,
    doctor_id: i64,
    appointment_id: i64,
    input: &PrescriptionInput,
) -> Result<Prescription, ConsultationError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let appointment = owned_appointment(&tx, doctor_id, appointment_id)?;
    if db::get_prescription_by_appointment(&tx, appointment.id)?.is_some() {
        return Err(ConsultationError::PrescriptionExists);
    }
    let items = parse_prescription_items(input.items.as_ref())?;

    let prescription_id = match db::insert_prescription(
        &tx,
        &appointment,
        doctor_id,
        input.notes.as_deref(),
        input.diagnosis.as_deref(),
    ) {
        Err(e) if e.is_unique_violation() => return Err(ConsultationError::PrescriptionExists),
        other => other?,
    };
    for item in &items {
        db::insert_prescription_item(&tx, prescription_id, item)?;
    }
    db::set_appointment_status(&tx, appointment.id, AppointmentStatus::Completed)?;
    let prescription = db::get_prescription(&tx, prescription_id)?
        .ok_or(ConsultationError::PrescriptionNotFound)?;
    tx.commit()?;

    tracing::info!(
        prescription_id,
        appointment_id,
        doctor_id,
        items = prescription.items.len(),
        "Prescription created"
    );
    Ok(prescription)
}

pub fn get_prescription(
    conn: &Connection,
    doctor_id: i64,
    appointment_id: i64,
) -> Result<Prescription, ConsultationError> {
    let appointment = owned_appointment(conn, doctor_id, appointment_id)?;
    db::get_prescription_by_appointment(conn, appointment.id)?
        .ok_or(ConsultationError::PrescriptionNotFound)
}

pub fn add_prescription_item(
    conn: &Connection,
    doctor_id: i64,
    appointment_id: i64,
    item: &NewPrescriptionItem,
) -> Result<PrescriptionItem, ConsultationError> {
    let appointment = owned_appointment(conn, doctor_id, appointment_id)?;
    let prescription = db::get_prescription_by_appointment(conn, appointment.id)?
        .ok_or(ConsultationError::NoPrescription)?;

    let mut errors = FieldErrors::new();
    let item = clean_item(&mut errors, "medicine_name", item);
    errors.into_result()?;

    let saved = db::insert_prescription_item(conn, prescription.id, &item)?;
    tracing::info!(prescription_id = prescription.id, item_id = saved.id, "Prescription item added");
    Ok(saved)
}

/// Store a lab order and, when it costs anything, its LAB charge.
pub fn create_lab_order(
    conn: &mut Connection,
    doctor_id: i64,
    appointment_id: i64,
    input: &LabOrderInput,
) -> Result<LabOrder, ConsultationError> {
    let tx = conn.transaction()?;
    let appointment = owned_appointment(&tx, doctor_id, appointment_id)?;
    let tests = billing::parse_lab_tests(input.tests.as_ref())?;
    let total = billing::lab_total(&tests)?;
    let order = db::insert_lab_order(&tx, &appointment, doctor_id, &tests)?;
    billing::record_charge(
        &tx,
        BillType::Lab,
        &appointment,
        total,
        &json!({ "lab_order_id": order.id, "appointment_id": appointment.id }),
    )?;
    tx.commit()?;

    tracing::info!(lab_order_id = order.id, appointment_id, tests = tests.len(), total, "Lab order created");
    Ok(order)
}

/// Store a pharmacy order and, when it costs anything, its PHARMACY charge.
pub fn create_pharmacy_order(
    conn: &mut Connection,
    doctor_id: i64,
    appointment_id: i64,
    input: &PharmacyOrderInput,
) -> Result<PharmacyOrder, ConsultationError> {
    let tx = conn.transaction()?;
    let appointment = owned_appointment(&tx, doctor_id, appointment_id)?;
    let items = billing::parse_pharmacy_items(input.items.as_ref())?;
    let total = billing::pharmacy_total(&items)?;
    let order = db::insert_pharmacy_order(&tx, &appointment, doctor_id, &items)?;
    billing::record_charge(
        &tx,
        BillType::Pharmacy,
        &appointment,
        total,
        &json!({ "pharmacy_order_id": order.id, "appointment_id": appointment.id }),
    )?;
    tx.commit()?;

    tracing::info!(pharmacy_order_id = order.id, appointment_id, items = items.len(), total, "Pharmacy order created");
    Ok(order)
}

pub fn complete_appointment(
    conn: &Connection,
    doctor_id: i64,
    appointment_id: i64,
) -> Result<(), ConsultationError> {
    let appointment = owned_appointment(conn, doctor_id, appointment_id)?;
    db::set_appointment_status(conn, appointment.id, AppointmentStatus::Completed)?;
    tracing::info!(appointment_id, doctor_id, "Appointment completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{make_appointment, make_doctor, make_patient};
    use crate::db::open_memory_database;

    struct Clinic {
        conn: Connection,
        doctor: Employee,
        other: Employee,
        appt: Appointment,
    }

    fn clinic() -> Clinic {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Ann", "Lee");
        let other = make_doctor(&conn, "Bo", "Chen");
        let patient = make_patient(&conn, "Tom Hart");
        let appt = make_appointment(&conn, doctor.id, patient.id);
        Clinic { conn, doctor, other, appt }
    }

    fn items(names: &[&str]) -> Option<Value> {
        Some(Value::Array(
            names
                .iter()
                .map(|name| json!({"medicine_name": name, "dosage": "500mg"}))
                .collect(),
        ))
    }

    fn item(name: &str) -> NewPrescriptionItem {
        NewPrescriptionItem {
            medicine_name: name.into(),
            dosage: Some("500mg".into()),
            ..Default::default()
        }
    }

    #[test]
    fn other_doctors_appointment_is_not_found() {
        let mut c = clinic();
        assert!(matches!(
            appointment_detail(&c.conn, c.other.id, c.appt.id),
            Err(ConsultationError::AppointmentNotFound)
        ));
        assert!(matches!(
            create_lab_order(&mut c.conn, c.other.id, c.appt.id, &LabOrderInput::default()),
            Err(ConsultationError::AppointmentNotFound)
        ));
        assert!(matches!(
            complete_appointment(&c.conn, c.other.id, c.appt.id),
            Err(ConsultationError::AppointmentNotFound)
        ));
        assert!(my_appointments(&c.conn, c.other.id).unwrap().is_empty());
        assert_eq!(my_appointments(&c.conn, c.doctor.id).unwrap().len(), 1);
    }

    #[test]
    fn prescription_with_items_completes_appointment() {
        let mut c = clinic();
        let input = PrescriptionInput {
            notes: Some("Rest".into()),
            diagnosis: Some("Flu".into()),
            items: items(&["Paracetamol", "Vitamin C"]),
        };
        let p = create_prescription(&mut c.conn, c.doctor.id, c.appt.id, &input).unwrap();
        assert_eq!(p.items.len(), 2);
        assert_eq!(p.doctor_id, Some(c.doctor.id));

        let appt = appointment_detail(&c.conn, c.doctor.id, c.appt.id).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Completed);

        assert!(matches!(
            create_prescription(&mut c.conn, c.doctor.id, c.appt.id, &input),
            Err(ConsultationError::PrescriptionExists)
        ));
    }

    #[test]
    fn blank_item_rejects_whole_prescription() {
        let mut c = clinic();
        let input = PrescriptionInput {
            items: items(&["Paracetamol", "  "]),
            ..Default::default()
        };
        assert!(matches!(
            create_prescription(&mut c.conn, c.doctor.id, c.appt.id, &input),
            Err(ConsultationError::Validation(_))
        ));
        assert!(matches!(
            get_prescription(&c.conn, c.doctor.id, c.appt.id),
            Err(ConsultationError::PrescriptionNotFound)
        ));
    }

    #[test]
    fn add_item_requires_prescription() {
        let mut c = clinic();
        assert!(matches!(
            add_prescription_item(&c.conn, c.doctor.id, c.appt.id, &item("Ibuprofen")),
            Err(ConsultationError::NoPrescription)
        ));

        create_prescription(&mut c.conn, c.doctor.id, c.appt.id, &PrescriptionInput::default()).unwrap();
        assert!(matches!(
            add_prescription_item(&c.conn, c.doctor.id, c.appt.id, &item("")),
            Err(ConsultationError::Validation(_))
        ));
        let added = add_prescription_item(&c.conn, c.doctor.id, c.appt.id, &item("Ibuprofen")).unwrap();
        assert_eq!(added.medicine_name, "Ibuprofen");
        assert_eq!(get_prescription(&c.conn, c.doctor.id, c.appt.id).unwrap().items.len(), 1);
    }

    #[test]
    fn priced_lab_order_creates_one_charge() {
        let mut c = clinic();
        let input = LabOrderInput {
            tests: Some(json!([{"test": "CBC", "price": 100}, {"test": "ESR", "price": "50"}])),
        };
        let order = create_lab_order(&mut c.conn, c.doctor.id, c.appt.id, &input).unwrap();

        let bills = db::list_billing_records(&c.conn, None).unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].bill_type, BillType::Lab);
        assert_eq!(bills[0].amount, 150.0);
        assert_eq!(bills[0].patient_name, "Tom Hart");
        assert_eq!(bills[0].additional_info["lab_order_id"], json!(order.id));
        assert_eq!(bills[0].additional_info["appointment_id"], json!(c.appt.id));
    }

    #[test]
    fn free_orders_create_no_charge() {
        let mut c = clinic();
        let lab = LabOrderInput { tests: Some(json!([{"test": "Screening"}])) };
        create_lab_order(&mut c.conn, c.doctor.id, c.appt.id, &lab).unwrap();
        let pharmacy = PharmacyOrderInput { items: Some(json!([{"name": "Sample", "qty": 3}])) };
        create_pharmacy_order(&mut c.conn, c.doctor.id, c.appt.id, &pharmacy).unwrap();
        assert!(db::list_billing_records(&c.conn, None).unwrap().is_empty());
    }

    #[test]
    fn pharmacy_charge_is_price_times_qty() {
        let mut c = clinic();
        let input = PharmacyOrderInput {
            items: Some(json!([
                {"name": "Paracetamol", "qty": 2, "price": 20},
                {"name": "Syrup", "qty": "1", "price": 35.5}
            ])),
        };
        let order = create_pharmacy_order(&mut c.conn, c.doctor.id, c.appt.id, &input).unwrap();
        assert_eq!(order.items.len(), 2);

        let bills = db::list_billing_records(&c.conn, Some(BillType::Pharmacy)).unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].amount, 75.5);
        assert_eq!(bills[0].additional_info["pharmacy_order_id"], json!(order.id));
    }

    #[test]
    fn malformed_items_store_nothing() {
        let mut c = clinic();
        let input = PharmacyOrderInput { items: Some(json!([{"name": "X", "qty": -2, "price": 5}])) };
        assert!(matches!(
            create_pharmacy_order(&mut c.conn, c.doctor.id, c.appt.id, &input),
            Err(ConsultationError::Validation(_))
        ));
        assert!(db::list_pharmacy_orders(&c.conn, None).unwrap().is_empty());
        assert!(db::list_billing_records(&c.conn, None).unwrap().is_empty());
    }

    #[test]
    fn ownership_is_checked_before_payload() {
        let mut c = clinic();
        let bad_prescription = PrescriptionInput {
            items: Some(json!("nope")),
            ..Default::default()
        };
        let bad_lab = LabOrderInput { tests: Some(json!("nope")) };
        let bad_pharmacy = PharmacyOrderInput { items: Some(json!([{"qty": -1}])) };

        for appointment_id in [c.appt.id, c.appt.id + 100] {
            assert!(matches!(
                create_prescription(&mut c.conn, c.other.id, appointment_id, &bad_prescription),
                Err(ConsultationError::AppointmentNotFound)
            ));
            assert!(matches!(
                create_lab_order(&mut c.conn, c.other.id, appointment_id, &bad_lab),
                Err(ConsultationError::AppointmentNotFound)
            ));
            assert!(matches!(
                create_pharmacy_order(&mut c.conn, c.other.id, appointment_id, &bad_pharmacy),
                Err(ConsultationError::AppointmentNotFound)
            ));
        }

        // The owner still gets the field errors.
        assert!(matches!(
            create_prescription(&mut c.conn, c.doctor.id, c.appt.id, &bad_prescription),
            Err(ConsultationError::Validation(_))
        ));
        assert!(matches!(
            create_lab_order(&mut c.conn, c.doctor.id, c.appt.id, &bad_lab),
            Err(ConsultationError::Validation(_))
        ));
    }

    #[test]
    fn medicine_name_up_to_255_chars() {
        let mut c = clinic();
        let longest = "a".repeat(255);
        let too_long = "a".repeat(256);
        assert!(matches!(
            create_prescription(
                &mut c.conn,
                c.doctor.id,
                c.appt.id,
                &PrescriptionInput { items: items(&[too_long.as_str()]), ..Default::default() },
            ),
            Err(ConsultationError::Validation(_))
        ));
        let p = create_prescription(
            &mut c.conn,
            c.doctor.id,
            c.appt.id,
            &PrescriptionInput { items: items(&[longest.as_str()]), ..Default::default() },
        )
        .unwrap();
        assert_eq!(p.items[0].medicine_name.len(), 255);
    }

    #[test]
    fn overflowing_order_total_stores_nothing() {
        let mut c = clinic();
        let input = PharmacyOrderInput {
            items: Some(json!([{"name": "X", "qty": 10, "price": 1.0e308}])),
        };
        assert!(matches!(
            create_pharmacy_order(&mut c.conn, c.doctor.id, c.appt.id, &input),
            Err(ConsultationError::Validation(_))
        ));
        assert!(db::list_pharmacy_orders(&c.conn, None).unwrap().is_empty());
        assert!(db::list_billing_records(&c.conn, None).unwrap().is_empty());
    }

    #[test]
    fn complete_marks_status() {
        let c = clinic();
        complete_appointment(&c.conn, c.doctor.id, c.appt.id).unwrap();
        let appt = db::get_appointment(&c.conn, c.appt.id).unwrap().unwrap();
        assert_eq!(appt.status, AppointmentStatus::Completed);
    }
}
