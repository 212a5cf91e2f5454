use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentType;

/// Duration applied when the submitted value is missing or unusable.
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// A stored appointment. Field names are the persisted wire keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    #[serde(with = "iso_millis")]
    pub start: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub desc: String,
    pub doctor: String,
    pub dept: String,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub duration: u32,
}

/// Decoded form submission. `id == None` asks for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub id: Option<String>,
    pub start: DateTime<Utc>,
    pub title: String,
    pub desc: String,
    pub doctor: String,
    pub dept: String,
    pub appointment_type: AppointmentType,
    pub duration: u32,
}

impl AppointmentDraft {
    /// Materialise the draft under a definitive identity.
    pub fn into_appointment(self, id: String) -> Appointment {
        Appointment {
            id,
            start: self.start,
            title: self.title,
            desc: self.desc,
            doctor: self.doctor,
            dept: self.dept,
            appointment_type: self.appointment_type,
            duration: self.duration,
        }
    }
}

impl From<Appointment> for AppointmentDraft {
    fn from(a: Appointment) -> Self {
        Self {
            id: Some(a.id),
            start: a.start,
            title: a.title,
            desc: a.desc,
            doctor: a.doctor,
            dept: a.dept,
            appointment_type: a.appointment_type,
            duration: a.duration,
        }
    }
}

/// Coerce a raw minute count to a positive duration.
pub fn positive_duration(minutes: i64) -> u32 {
    if minutes > 0 {
        u32::try_from(minutes).unwrap_or(DEFAULT_DURATION_MINUTES)
    } else {
        DEFAULT_DURATION_MINUTES
    }
}

/// Parse a submitted duration the way a leading-integer parse does:
/// surrounding whitespace and trailing text are ignored (`"45 min"` is 45).
/// Unparseable or non-positive input becomes the default duration.
pub fn parse_duration(raw: &str) -> u32 {
    let s = raw.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    match digits[..end].parse::<i64>() {
        Ok(n) => positive_duration(sign * n),
        // Empty, or more digits than fit: neither is a usable minute count.
        Err(_) => DEFAULT_DURATION_MINUTES,
    }
}

/// Format an instant the way it is persisted: `2024-01-10T09:00:00.000Z`.
pub fn format_instant(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// True if `at` has a four-digit year, the range `format_instant` output can
/// be read back from.
pub fn is_storable(at: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&at.year())
}

/// Parse a persisted instant. Any RFC 3339 offset is accepted and normalised to UTC.
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_instant(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_instant(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid instant: {raw}")))
    }
}
