//! Command interface.
//!
//! Each request is one JSON object tagged by `command`; each response is
//! `{"ok": true, "data": ...}` or `{"ok": false, "error": "..."}`. Commands
//! run synchronously against the scheduler, one at a time.

pub mod appointment;

use std::fmt::Display;

use chrono::TimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::form::AppointmentForm;
use crate::scheduler::Scheduler;
use crate::store::SlotStorage;

/// Health check command, verifies the backend is running
pub fn health_check() -> String {
    tracing::debug!("Health check called");
    "ok".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    HealthCheck,
    ListAppointments,
    CreateAppointment { form: AppointmentForm },
    UpdateAppointment { form: AppointmentForm },
    DeleteAppointment { id: String },
    BeginNewAppointment,
    BeginEditAppointment { id: String },
    SubmitAppointment { form: AppointmentForm },
    DiscardEdit,
    AppointmentDetails { id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn from_result<T: Serialize>(result: Result<T, String>) -> Self {
        match result.and_then(|data| serde_json::to_value(data).map_err(|e| e.to_string())) {
            Ok(data) => Self {
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(error) => Self::failure(error),
        }
    }

    fn failure(error: String) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Run one decoded request.
pub fn handle<S, Tz>(request: Request, state: &mut Scheduler<S, Tz>) -> Response
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    use self::appointment as appt;

    match request {
        Request::HealthCheck => Response::from_result(Ok(health_check())),
        Request::ListAppointments => Response::from_result(appt::list_appointments(state)),
        Request::CreateAppointment { form } => {
            Response::from_result(appt::create_appointment(form, state))
        }
        Request::UpdateAppointment { form } => {
            Response::from_result(appt::update_appointment(form, state))
        }
        Request::DeleteAppointment { id } => {
            Response::from_result(appt::delete_appointment(id, state))
        }
        Request::BeginNewAppointment => Response::from_result(appt::begin_new_appointment(state)),
        Request::BeginEditAppointment { id } => {
            Response::from_result(appt::begin_edit_appointment(id, state))
        }
        Request::SubmitAppointment { form } => {
            Response::from_result(appt::submit_appointment(form, state))
        }
        Request::DiscardEdit => Response::from_result(appt::discard_edit(state)),
        Request::AppointmentDetails { id } => {
            Response::from_result(appt::appointment_details(id, state))
        }
    }
}

/// Decode and run one request line. Malformed requests get an error
/// response; they never touch the book.
pub fn dispatch<S, Tz>(line: &str, state: &mut Scheduler<S, Tz>) -> Response
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle(request, state),
        Err(e) => {
            tracing::warn!("Rejected malformed command: {e}");
            Response::failure(format!("Invalid command: {e}"))
        }
    }
}
