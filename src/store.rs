//! Durable storage for the appointment book.
//!
//! The whole book lives in one named slot as a JSON array. Loading never
//! fails: an absent, unreadable or malformed slot reads as an empty book,
//! and individual records are validated one by one so that a single bad
//! entry does not take the rest down with it.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use rusqlite::Connection;
use serde_json::Value;

use crate::db::{self, DatabaseError};
use crate::models::{
    parse_duration, parse_instant, positive_duration, Appointment, AppointmentType,
    DEFAULT_DURATION_MINUTES,
};

/// Key-value slot backend.
pub trait SlotStorage {
    fn read_slot(&self, key: &str) -> Result<Option<String>, DatabaseError>;

    /// Replace the slot content in a single write.
    fn write_slot(&self, key: &str, value: &str) -> Result<(), DatabaseError>;
}

impl SlotStorage for Connection {
    fn read_slot(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        db::get_slot(self, key)
    }

    fn write_slot(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        db::set_slot(self, key, value)
    }
}

/// Process-local slots. Clones share the same map, so dropping one
/// handle and reading through another behaves like a reload.
#[derive(Debug, Clone, Default)]
pub struct MemorySlots {
    slots: Rc<RefCell<HashMap<String, String>>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a slot with raw text.
    pub fn with_slot(key: &str, value: &str) -> Self {
        let slots = Self::new();
        slots.slots.borrow_mut().insert(key.to_string(), value.to_string());
        slots
    }
}

impl SlotStorage for MemorySlots {
    fn read_slot(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn write_slot(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.slots.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The appointment book's view of a slot backend.
pub struct AppointmentStore<S> {
    storage: S,
    key: String,
}

impl<S: SlotStorage> AppointmentStore<S> {
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Read the whole book. Never fails; problems are logged and absorbed.
    pub fn load(&self) -> Vec<Appointment> {
        let raw = match self.storage.read_slot(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, "Appointment slot unreadable, starting empty: {e}");
                return Vec::new();
            }
        };
        decode_book(&raw)
    }

    /// Overwrite the slot with the full collection.
    pub fn save(&self, appointments: &[Appointment]) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(appointments)
            .map_err(|e| DatabaseError::Unavailable(format!("serialize appointments: {e}")))?;
        self.storage.write_slot(&self.key, &json)?;
        tracing::debug!(key = %self.key, count = appointments.len(), "Appointment book saved");
        Ok(())
    }
}

/// Decode a serialized book, dropping records that cannot be salvaged.
pub fn decode_book(raw: &str) -> Vec<Appointment> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    let entries = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(Value::Null) => return Vec::new(),
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "Appointment slot is not a list, ignoring it");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!("Appointment slot is not valid JSON, ignoring it: {e}");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut book = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match decode_record(entry) {
            Ok(appt) => {
                if seen.insert(appt.id.clone()) {
                    book.push(appt);
                } else {
                    tracing::warn!(index, id = %appt.id, "Dropping stored appointment with duplicate id");
                }
            }
            Err(reason) => tracing::warn!(index, "Dropping stored appointment: {reason}"),
        }
    }
    book
}

fn decode_record(entry: &Value) -> Result<Appointment, &'static str> {
    let obj = entry.as_object().ok_or("not an object")?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or("missing id")?
        .to_string();

    let start = obj
        .get("start")
        .and_then(Value::as_str)
        .and_then(parse_instant)
        .ok_or("missing or invalid start")?;

    // Trimmed like editor input, so stored records survive a form round trip.
    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };

    let appointment_type = obj
        .get("type")
        .and_then(Value::as_str)
        .map(AppointmentType::parse_lenient)
        .unwrap_or_default();

    let duration = match obj.get("duration") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .map(positive_duration)
            .unwrap_or(DEFAULT_DURATION_MINUTES),
        Some(Value::String(s)) => parse_duration(s),
        _ => DEFAULT_DURATION_MINUTES,
    };

    Ok(Appointment {
        id,
        start,
        title: text("title"),
        desc: text("desc"),
        doctor: text("doctor"),
        dept: text("dept"),
        appointment_type,
        duration,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STORAGE_KEY;
    use crate::db::sqlite::{open_database, open_memory_database};
    use chrono::{TimeZone, Utc};

    fn appt(id: &str, hour: u32) -> Appointment {
        Appointment {
            id: id.into(),
            start: Utc.with_ymd_and_hms(2024, 3, 1, hour, 15, 0).unwrap(),
            title: format!("Visit {id}"),
            desc: "notes".into(),
            doctor: "Dr. Who".into(),
            dept: "Time".into(),
            appointment_type: AppointmentType::FollowUp,
            duration: 20,
        }
    }

    fn memory_store(raw: &str) -> AppointmentStore<MemorySlots> {
        AppointmentStore::new(MemorySlots::with_slot(STORAGE_KEY, raw), STORAGE_KEY)
    }

    #[test]
    fn absent_slot_loads_empty() {
        let store = AppointmentStore::new(MemorySlots::new(), STORAGE_KEY);
        assert!(store.load().is_empty());
    }

    #[test]
    fn malformed_slot_loads_empty() {
        for raw in ["", "   ", "null", "{not json", "{\"id\":\"a\"}", "42", "\"text\""] {
            assert!(memory_store(raw).load().is_empty(), "raw = {raw:?}");
        }
    }

    #[test]
    fn save_then_load_reproduces_book() {
        let store = AppointmentStore::new(open_memory_database().unwrap(), STORAGE_KEY);
        let book = vec![appt("a", 9), appt("b", 11)];
        store.save(&book).unwrap();
        assert_eq!(store.load(), book);
    }

    #[test]
    fn save_overwrites_previous_book() {
        let store = AppointmentStore::new(MemorySlots::new(), STORAGE_KEY);
        store.save(&[appt("a", 9), appt("b", 10)]).unwrap();
        store.save(&[appt("c", 12)]).unwrap();
        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "c");
    }

    #[test]
    fn persisted_layout_uses_wire_keys() {
        let slots = MemorySlots::new();
        let store = AppointmentStore::new(slots.clone(), STORAGE_KEY);
        store.save(&[appt("a", 9)]).unwrap();

        let raw = slots.read_slot(STORAGE_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        let record = value[0].as_object().unwrap();
        let mut keys: Vec<&str> = record.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["dept", "desc", "doctor", "duration", "id", "start", "title", "type"]
        );
        assert_eq!(record["start"], "2024-03-01T09:15:00.000Z");
        assert_eq!(record["type"], "follow-up");
    }

    #[test]
    fn records_without_id_or_start_are_dropped() {
        let raw = r#"[
            {"id":"ok","start":"2024-03-01T09:00:00.000Z","title":"Keep","doctor":"d","dept":"x","type":"routine","duration":30},
            {"start":"2024-03-01T10:00:00.000Z","title":"No id"},
            {"id":"","start":"2024-03-01T10:00:00.000Z"},
            {"id":"bad-start","start":"yesterday"},
            {"id":"no-start"},
            "just a string"
        ]"#;
        let book = memory_store(raw).load();
        assert_eq!(book.len(), 1);
        assert_eq!(book[0].id, "ok");
    }

    #[test]
    fn missing_fields_are_defaulted() {
        let raw = r#"[{"id":"a","start":"2024-03-01T09:00:00.000Z"}]"#;
        let book = memory_store(raw).load();
        let a = &book[0];
        assert_eq!(a.title, "");
        assert_eq!(a.desc, "");
        assert_eq!(a.doctor, "");
        assert_eq!(a.dept, "");
        assert_eq!(a.appointment_type, AppointmentType::Routine);
        assert_eq!(a.duration, DEFAULT_DURATION_MINUTES);
    }

    #[test]
    fn loaded_text_survives_a_form_round_trip() {
        use crate::form::{decode_in, encode_in};

        let raw = r#"[{"id":" a ","start":"2024-03-01T09:00:00.000Z","title":" padded ",
            "desc":"notes\n","doctor":"\tDr. X","dept":"Cardio ","type":"routine","duration":30}]"#;
        let loaded = memory_store(raw).load().remove(0);
        assert_eq!(loaded.id, "a");
        assert_eq!(loaded.title, "padded");
        assert_eq!(loaded.desc, "notes");
        assert_eq!(loaded.doctor, "Dr. X");
        assert_eq!(loaded.dept, "Cardio");

        let draft = decode_in(&encode_in(&loaded, &Utc), &Utc, Utc::now());
        assert_eq!(draft.into_appointment(loaded.id.clone()), loaded);
    }

    #[test]
    fn durations_are_coerced() {
        let raw = r#"[
            {"id":"num","start":"2024-03-01T09:00:00.000Z","duration":45},
            {"id":"str","start":"2024-03-01T09:00:00.000Z","duration":"60"},
            {"id":"nan","start":"2024-03-01T09:00:00.000Z","duration":"abc"},
            {"id":"neg","start":"2024-03-01T09:00:00.000Z","duration":-5},
            {"id":"frac","start":"2024-03-01T09:00:00.000Z","duration":12.7},
            {"id":"null","start":"2024-03-01T09:00:00.000Z","duration":null}
        ]"#;
        let durations: Vec<(String, u32)> = memory_store(raw)
            .load()
            .into_iter()
            .map(|a| (a.id, a.duration))
            .collect();
        assert_eq!(
            durations,
            vec![
                ("num".to_string(), 45),
                ("str".to_string(), 60),
                ("nan".to_string(), 30),
                ("neg".to_string(), 30),
                ("frac".to_string(), 12),
                ("null".to_string(), 30),
            ]
        );
    }

    #[test]
    fn unknown_type_reads_as_routine() {
        let raw = r#"[{"id":"a","start":"2024-03-01T09:00:00.000Z","type":"surgery"},
                      {"id":"b","start":"2024-03-01T09:00:00.000Z","type":"specialist"}]"#;
        let book = memory_store(raw).load();
        assert_eq!(book[0].appointment_type, AppointmentType::Routine);
        assert_eq!(book[1].appointment_type, AppointmentType::Specialist);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let raw = r#"[{"id":"a","start":"2024-03-01T09:00:00.000Z","title":"first"},
                      {"id":"a","start":"2024-03-02T09:00:00.000Z","title":"second"}]"#;
        let book = memory_store(raw).load();
        assert_eq!(book.len(), 1);
        assert_eq!(book[0].title, "first");
    }

    #[test]
    fn survives_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("careslot.db");
        let book = vec![appt("a", 8), appt("b", 9)];
        {
            let store = AppointmentStore::new(open_database(&path).unwrap(), STORAGE_KEY);
            store.save(&book).unwrap();
        }
        let reopened = AppointmentStore::new(open_database(&path).unwrap(), STORAGE_KEY);
        assert_eq!(reopened.load(), book);
    }

    #[test]
    fn slots_are_keyed() {
        let slots = MemorySlots::new();
        let first = AppointmentStore::new(slots.clone(), "first");
        let second = AppointmentStore::new(slots, "second");
        first.save(&[appt("a", 9)]).unwrap();
        assert!(second.load().is_empty());
        assert_eq!(first.load().len(), 1);
    }
}
