//! Appointment book commands.
//!
//! - `list_appointments`: sorted book plus display rows
//! - `create_appointment` / `update_appointment`: form submission without an editor session
//! - `delete_appointment`: removal after the caller has confirmed
//! - `begin_new_appointment` / `begin_edit_appointment` / `submit_appointment` / `discard_edit`: editor session
//! - `appointment_details`: details text for one appointment

use std::fmt::Display;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::form::{AppointmentForm, AppointmentRow};
use crate::models::Appointment;
use crate::scheduler::{EditSession, Scheduler};
use crate::store::SlotStorage;

/// Book contents in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentList {
    pub appointments: Vec<Appointment>,
    pub rows: Vec<AppointmentRow>,
}

/// Editor contents handed to the client when a session opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorState {
    pub session: EditSession,
    pub form: AppointmentForm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResult {
    pub removed: bool,
}

/// Sorted appointment list.
pub fn list_appointments<S, Tz>(state: &Scheduler<S, Tz>) -> Result<AppointmentList, String>
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    Ok(AppointmentList {
        appointments: state.list().to_vec(),
        rows: state.rows(),
    })
}

/// Schedules a new appointment from a filled form.
pub fn create_appointment<S, Tz>(
    form: AppointmentForm,
    state: &mut Scheduler<S, Tz>,
) -> Result<Appointment, String>
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    state.create(&form).map_err(|e| e.to_string())
}

/// Replaces the appointment named by `form.id`.
pub fn update_appointment<S, Tz>(
    form: AppointmentForm,
    state: &mut Scheduler<S, Tz>,
) -> Result<Appointment, String>
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    state.update(&form).map_err(|e| e.to_string())
}

/// Cancels an appointment. Confirmation is the caller's job.
pub fn delete_appointment<S, Tz>(
    id: String,
    state: &mut Scheduler<S, Tz>,
) -> Result<DeleteResult, String>
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if id.trim().is_empty() {
        return Err("Appointment ID is required".into());
    }
    let removed = state.delete(id.trim()).map_err(|e| e.to_string())?;
    Ok(DeleteResult { removed })
}

/// Opens the editor on a blank form.
pub fn begin_new_appointment<S, Tz>(state: &mut Scheduler<S, Tz>) -> Result<EditorState, String>
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let form = state.begin_new(Utc::now());
    Ok(EditorState {
        session: state.session().clone(),
        form,
    })
}

/// Opens the editor on an existing appointment.
pub fn begin_edit_appointment<S, Tz>(
    id: String,
    state: &mut Scheduler<S, Tz>,
) -> Result<EditorState, String>
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let form = state
        .begin_edit(id.trim())
        .ok_or_else(|| format!("Appointment not found: {id}"))?;
    Ok(EditorState {
        session: state.session().clone(),
        form,
    })
}

/// Saves the open editor.
pub fn submit_appointment<S, Tz>(
    form: AppointmentForm,
    state: &mut Scheduler<S, Tz>,
) -> Result<Appointment, String>
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    state.submit(&form).map_err(|e| e.to_string())
}

/// Closes the editor without saving.
pub fn discard_edit<S, Tz>(state: &mut Scheduler<S, Tz>) -> Result<EditSession, String>
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    state.discard();
    Ok(state.session().clone())
}

/// Details text for one appointment.
pub fn appointment_details<S, Tz>(id: String, state: &Scheduler<S, Tz>) -> Result<String, String>
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    state
        .details(id.trim())
        .ok_or_else(|| format!("Appointment not found: {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    use crate::ids::UuidIds;
    use crate::store::MemorySlots;

    fn state() -> Scheduler<MemorySlots, FixedOffset> {
        Scheduler::open(
            MemorySlots::new(),
            Box::new(UuidIds),
            FixedOffset::east_opt(0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 7, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn form() -> AppointmentForm {
        AppointmentForm {
            start: "2024-01-10T09:00".into(),
            title: "Checkup".into(),
            doctor: "Dr. X".into(),
            dept: "Cardio".into(),
            appointment_type: "routine".into(),
            duration: "45".into(),
            ..AppointmentForm::default()
        }
    }

    #[test]
    fn list_returns_rows_in_book_order() {
        let s = state();
        let list = list_appointments(&s).unwrap();
        assert_eq!(list.appointments.len(), 3);
        let ids: Vec<&str> = list.rows.iter().map(|r| r.id.as_str()).collect();
        let expected: Vec<&str> = list.appointments.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn create_then_delete() {
        let mut s = state();
        let created = create_appointment(form(), &mut s).unwrap();
        assert_eq!(created.duration, 45);
        assert!(delete_appointment(created.id.clone(), &mut s).unwrap().removed);
        assert!(!delete_appointment(created.id, &mut s).unwrap().removed);
    }

    #[test]
    fn delete_requires_id() {
        let mut s = state();
        assert!(delete_appointment("  ".into(), &mut s).is_err());
    }

    #[test]
    fn bad_input_never_fails_submission() {
        let mut s = state();
        let f = AppointmentForm {
            start: "whenever".into(),
            duration: "soon".into(),
            appointment_type: "???".into(),
            ..AppointmentForm::default()
        };
        let created = create_appointment(f, &mut s).unwrap();
        assert_eq!(created.duration, 30);
        assert_eq!(s.list().len(), 4);
    }

    #[test]
    fn update_through_command() {
        let mut s = state();
        let id = s.list()[0].id.clone();
        let mut f = begin_edit_appointment(id.clone(), &mut s).unwrap().form;
        s.discard();
        f.title = "Changed".into();
        let updated = update_appointment(f, &mut s).unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(s.get(&id).unwrap().title, "Changed");
    }

    #[test]
    fn editor_flow() {
        let mut s = state();
        let editor = begin_new_appointment(&mut s).unwrap();
        assert!(matches!(editor.session, EditSession::Editing(_)));
        assert_eq!(editor.form.duration, "30");

        let mut f = editor.form;
        f.title = "Scan".into();
        let saved = submit_appointment(f, &mut s).unwrap();
        assert_eq!(saved.title, "Scan");
        assert_eq!(s.session(), &EditSession::Idle);

        let err = submit_appointment(form(), &mut s).unwrap_err();
        assert_eq!(err, "No appointment is being edited");
    }

    #[test]
    fn discard_returns_idle() {
        let mut s = state();
        begin_new_appointment(&mut s).unwrap();
        assert_eq!(discard_edit(&mut s).unwrap(), EditSession::Idle);
    }

    #[test]
    fn unknown_ids_report_not_found() {
        let mut s = state();
        assert!(begin_edit_appointment("nope".into(), &mut s).is_err());
        assert!(appointment_details("nope".into(), &s).is_err());
    }

    #[test]
    fn details_for_seeded_appointment() {
        let s = state();
        let id = s.list()[0].id.clone();
        let text = appointment_details(id, &s).unwrap();
        assert!(text.contains("General Checkup"));
    }
}
