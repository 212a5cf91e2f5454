//! Form codec: flat string fields for the appointment editor.
//!
//! The editor shows `start` as local civil time with minute precision
//! (`YYYY-MM-DDTHH:MM`); the stored record keeps an absolute UTC instant.
//! Decoding is forgiving: whitespace is trimmed, an unusable duration
//! becomes 30 minutes, an unknown type becomes routine, and an unreadable
//! start falls back to the blank-form default instead of failing the submit.
//! A start is only readable if its year, before and after conversion to UTC,
//! has four digits.

use chrono::{DateTime, Datelike, Duration, DurationRound, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{
    is_storable, parse_duration, Appointment, AppointmentDraft, AppointmentType,
    DEFAULT_DURATION_MINUTES,
};

/// `datetime-local` input format.
pub const LOCAL_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Also accepted on input (some editors append seconds).
const LOCAL_INPUT_FORMAT_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";

/// Minutes between "now" and the start proposed by a blank form.
const BLANK_FORM_LEAD_MINUTES: i64 = 30;

/// Editor field set. Every field is free text as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentForm {
    pub id: String,
    pub start: String,
    pub title: String,
    pub desc: String,
    pub doctor: String,
    pub dept: String,
    #[serde(rename = "type")]
    pub appointment_type: String,
    #[serde(deserialize_with = "number_or_text")]
    pub duration: String,
}

/// Accept `"45"` or `45`; anything else reads as empty and decodes to the default.
fn number_or_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Map a local wall-clock time to an instant. Ambiguous times (clocks going
/// back) take the earlier instant; times inside a gap (clocks going forward)
/// are moved one hour later.
pub fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            local
                .checked_add_signed(Duration::hours(1))
                .and_then(|later| tz.from_local_datetime(&later).earliest())
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

/// Start proposed by a blank form: 30 minutes from now, seconds cleared.
pub fn default_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let proposed = now + Duration::minutes(BLANK_FORM_LEAD_MINUTES);
    proposed
        .duration_trunc(Duration::minutes(1))
        .unwrap_or(proposed)
}

/// Format an instant for the editor in `tz`.
pub fn to_local_input<Tz: TimeZone>(at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.with_timezone(tz).format(LOCAL_INPUT_FORMAT).to_string()
}

/// Parse an editor time typed in `tz`. Times that could not be stored and
/// read back (years outside 0..=9999) are treated as unreadable.
pub fn from_local_input<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, LOCAL_INPUT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, LOCAL_INPUT_FORMAT_SECONDS))
        .ok()
        .filter(|local| (0..=9999).contains(&local.year()))
        .map(|local| resolve_local(tz, local))
        .filter(is_storable)
}

/// Encode a record for editing, rendering `start` in `tz`.
pub fn encode_in<Tz: TimeZone>(appt: &Appointment, tz: &Tz) -> AppointmentForm
where
    Tz::Offset: std::fmt::Display,
{
    AppointmentForm {
        id: appt.id.clone(),
        start: to_local_input(&appt.start, tz),
        title: appt.title.clone(),
        desc: appt.desc.clone(),
        doctor: appt.doctor.clone(),
        dept: appt.dept.clone(),
        appointment_type: appt.appointment_type.as_str().to_string(),
        duration: appt.duration.to_string(),
    }
}

/// Decode an editor submission whose `start` was typed in `tz`.
/// `now` only matters when `start` is unreadable.
pub fn decode_in<Tz: TimeZone>(
    form: &AppointmentForm,
    tz: &Tz,
    now: DateTime<Utc>,
) -> AppointmentDraft {
    let id = form.id.trim();
    let start = from_local_input(&form.start, tz).unwrap_or_else(|| {
        tracing::warn!(start = %form.start, "Unreadable appointment start, using default");
        default_start(now)
    });

    AppointmentDraft {
        id: (!id.is_empty()).then(|| id.to_string()),
        start,
        title: form.title.trim().to_string(),
        desc: form.desc.trim().to_string(),
        doctor: form.doctor.trim().to_string(),
        dept: form.dept.trim().to_string(),
        appointment_type: AppointmentType::parse_lenient(&form.appointment_type),
        duration: parse_duration(&form.duration),
    }
}

/// Fields of a fresh "schedule appointment" form.
pub fn blank_in<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>) -> AppointmentForm
where
    Tz::Offset: std::fmt::Display,
{
    AppointmentForm {
        start: to_local_input(&default_start(now), tz),
        appointment_type: AppointmentType::Routine.as_str().to_string(),
        duration: DEFAULT_DURATION_MINUTES.to_string(),
        ..AppointmentForm::default()
    }
}

// ─── Display fields ───────────────────────────────────────────────────────────

/// List-row rendering of one appointment in the viewer's time zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRow {
    pub id: String,
    /// `DD MON`, e.g. `04 JUN`.
    pub date: String,
    /// `HH:MM`, 24-hour.
    pub time: String,
    pub duration_minutes: u32,
    pub title: String,
    pub desc: String,
    pub doctor: String,
    pub dept: String,
    pub type_label: String,
}

pub fn row_in<Tz: TimeZone>(appt: &Appointment, tz: &Tz) -> AppointmentRow
where
    Tz::Offset: std::fmt::Display,
{
    let local = appt.start.with_timezone(tz);
    AppointmentRow {
        id: appt.id.clone(),
        date: local.format("%d %b").to_string().to_uppercase(),
        time: local.format("%H:%M").to_string(),
        duration_minutes: appt.duration,
        title: appt.title.clone(),
        desc: appt.desc.clone(),
        doctor: appt.doctor.clone(),
        dept: appt.dept.clone(),
        type_label: appt.appointment_type.label().to_string(),
    }
}

/// Multi-line details block shown for a single appointment.
pub fn details_in<Tz: TimeZone>(appt: &Appointment, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let when = appt.start.with_timezone(tz).format("%Y-%m-%d %H:%M");
    let notes = if appt.desc.is_empty() { "(none)" } else { appt.desc.as_str() };
    format!(
        "Appointment Details:\nTitle: {}\nDoctor: {} ({})\nWhen: {}\nType: {}\nDuration: {} min\nNotes: {}",
        appt.title,
        appt.doctor,
        appt.dept,
        when,
        appt.appointment_type.label(),
        appt.duration,
        notes,
    )
}
