use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_SELECT: &str =
    "SELECT ap.id, ap.doctor_id, TRIM(e.first_name || ' ' || e.last_name),
            ap.patient_id, p.full_name, ap.appointment_datetime, ap.reason,
            ap.status, ap.created_at
     FROM appointments ap
     JOIN patients p ON p.id = ap.patient_id
     LEFT JOIN employees e ON e.id = ap.doctor_id";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        doctor_id: row.get(1)?,
        doctor_name: row.get(2)?,
        patient_id: row.get(3)?,
        patient_name: row.get(4)?,
        appointment_datetime: row.get(5)?,
        reason: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub fn insert_appointment(
    conn: &Connection,
    fields: &AppointmentFields,
) -> Result<Appointment, DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (doctor_id, patient_id, appointment_datetime, reason, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            fields.doctor_id,
            fields.patient_id,
            fields.appointment_datetime,
            fields.reason,
            AppointmentStatus::Scheduled,
            Utc::now(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_appointment(conn, id)?.ok_or_else(|| DatabaseError::not_found("Appointment", id))
}

pub fn get_appointment(conn: &Connection, id: i64) -> Result<Option<Appointment>, DatabaseError> {
    let appt = conn
        .query_row(
            &format!("{APPOINTMENT_SELECT} WHERE ap.id = ?1"),
            params![id],
            appointment_from_row,
        )
        .optional()?;
    Ok(appt)
}

/// The appointment only when it is assigned to `doctor_id`.
pub fn get_appointment_for_doctor(
    conn: &Connection,
    id: i64,
    doctor_id: i64,
) -> Result<Option<Appointment>, DatabaseError> {
    let appt = conn
        .query_row(
            &format!("{APPOINTMENT_SELECT} WHERE ap.id = ?1 AND ap.doctor_id = ?2"),
            params![id, doctor_id],
            appointment_from_row,
        )
        .optional()?;
    Ok(appt)
}

/// Appointments matching `filter`, latest first.
pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{APPOINTMENT_SELECT}
         WHERE (?1 IS NULL OR ap.doctor_id = ?1)
           AND (?2 IS NULL OR ap.patient_id = ?2)
           AND (?3 IS NULL OR ap.status = ?3)
         ORDER BY ap.appointment_datetime DESC, ap.id DESC"
    ))?;
    let rows = stmt.query_map(
        params![filter.doctor_id, filter.patient_id, filter.status],
        appointment_from_row,
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_appointment(
    conn: &Connection,
    id: i64,
    fields: &AppointmentFields,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET doctor_id = ?1, patient_id = ?2, appointment_datetime = ?3, reason = ?4
         WHERE id = ?5",
        params![
            fields.doctor_id,
            fields.patient_id,
            fields.appointment_datetime,
            fields.reason,
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

pub fn set_appointment_status(
    conn: &Connection,
    id: i64,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{make_appointment, make_doctor, make_patient};
    use crate::db::open_memory_database;

    #[test]
    fn insert_starts_scheduled_with_names() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Jane", "Smith");
        let patient = make_patient(&conn, "Amy Pond");
        let appt = make_appointment(&conn, doctor.id, patient.id);
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.doctor_name.as_deref(), Some("Jane Smith"));
        assert_eq!(appt.patient_name, "Amy Pond");
    }

    #[test]
    fn doctor_scoped_lookup_hides_other_doctors() {
        let conn = open_memory_database().unwrap();
        let mine = make_doctor(&conn, "Jane", "Smith");
        let other = make_doctor(&conn, "Greg", "House");
        let patient = make_patient(&conn, "Amy Pond");
        let appt = make_appointment(&conn, other.id, patient.id);

        assert!(get_appointment_for_doctor(&conn, appt.id, mine.id).unwrap().is_none());
        assert!(get_appointment_for_doctor(&conn, appt.id, other.id).unwrap().is_some());
    }

    #[test]
    fn list_filters_and_orders_latest_first() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Jane", "Smith");
        let patient = make_patient(&conn, "Amy Pond");
        let first = make_appointment(&conn, doctor.id, patient.id);
        let mut later = AppointmentFields {
            doctor_id: doctor.id,
            patient_id: patient.id,
            appointment_datetime: first.appointment_datetime + chrono::Duration::days(7),
            reason: "Follow-up".into(),
        };
        let second = insert_appointment(&conn, &later).unwrap();
        set_appointment_status(&conn, first.id, AppointmentStatus::Completed).unwrap();

        let all = list_appointments(&conn, &AppointmentFilter::default()).unwrap();
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let completed = list_appointments(
            &conn,
            &AppointmentFilter {
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, first.id);

        later.reason = "Rescheduled".into();
        update_appointment(&conn, second.id, &later).unwrap();
        assert_eq!(get_appointment(&conn, second.id).unwrap().unwrap().reason, "Rescheduled");
    }
}
