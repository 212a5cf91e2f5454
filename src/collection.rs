//! In-memory appointment book backed by a durable slot.
//!
//! Readers always observe the book sorted by `start` (stable, so equal
//! starts keep insertion order). Every mutation is written through to the
//! store before it returns; if the write fails the mutation is rolled back
//! so memory and storage never disagree.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::db::DatabaseError;
use crate::form::resolve_local;
use crate::ids::IdSource;
use crate::models::{Appointment, AppointmentDraft, AppointmentType};
use crate::store::{AppointmentStore, SlotStorage};

/// Demo appointment created on first run.
struct SeedAppointment {
    offset_days: u32,
    title: &'static str,
    desc: &'static str,
    doctor: &'static str,
    dept: &'static str,
    appointment_type: AppointmentType,
    duration: u32,
}

const SEED: [SeedAppointment; 3] = [
    SeedAppointment {
        offset_days: 1,
        title: "General Checkup",
        desc: "Routine health examination",
        doctor: "Dr. Sarah Johnson",
        dept: "Internal Medicine",
        appointment_type: AppointmentType::Routine,
        duration: 45,
    },
    SeedAppointment {
        offset_days: 5,
        title: "Lab Results Review",
        desc: "Review recent test results",
        doctor: "Dr. Michael Chen",
        dept: "Laboratory Medicine",
        appointment_type: AppointmentType::FollowUp,
        duration: 30,
    },
    SeedAppointment {
        offset_days: 12,
        title: "Cardiology Consultation",
        desc: "Heart health evaluation",
        doctor: "Dr. Lisa Williams",
        dept: "Cardiology",
        appointment_type: AppointmentType::Specialist,
        duration: 60,
    },
];

/// Seed start: `now + offset days`, at `(10 + offset):30` local wall-clock time.
fn seed_start<Tz: TimeZone>(now: &DateTime<Tz>, offset_days: u32) -> DateTime<Utc> {
    let shifted = now.clone() + Duration::days(i64::from(offset_days));
    let local = shifted
        .date_naive()
        .and_hms_opt(10 + offset_days, 30, 0)
        .unwrap_or_else(|| shifted.naive_local());
    resolve_local(&now.timezone(), local)
}

pub struct AppointmentCollection<S> {
    store: AppointmentStore<S>,
    ids: Box<dyn IdSource>,
    items: Vec<Appointment>,
}

impl<S: SlotStorage> AppointmentCollection<S> {
    /// Load the book; on an empty store write the demo seed set.
    ///
    /// `now` fixes both the seed dates and the time zone their wall-clock
    /// times are interpreted in.
    pub fn initialize<Tz: TimeZone>(
        store: AppointmentStore<S>,
        ids: Box<dyn IdSource>,
        now: &DateTime<Tz>,
    ) -> Result<Self, DatabaseError> {
        let loaded = store.load();
        let seeded = loaded.is_empty();
        let items = if seeded {
            SEED.iter()
                .map(|seed| Appointment {
                    id: ids.generate(),
                    start: seed_start(now, seed.offset_days),
                    title: seed.title.into(),
                    desc: seed.desc.into(),
                    doctor: seed.doctor.into(),
                    dept: seed.dept.into(),
                    appointment_type: seed.appointment_type,
                    duration: seed.duration,
                })
                .collect()
        } else {
            loaded
        };

        let mut collection = Self { store, ids, items };
        collection.sort();
        if seeded {
            collection.store.save(&collection.items)?;
            tracing::info!(count = collection.items.len(), "Seeded empty appointment book");
        } else {
            tracing::info!(count = collection.items.len(), "Appointment book loaded");
        }
        Ok(collection)
    }

    /// Insert or replace. A draft whose id matches an entry replaces it
    /// wholesale; any other draft becomes a new entry under a fresh id.
    pub fn upsert(&mut self, draft: AppointmentDraft) -> Result<Appointment, DatabaseError> {
        let previous = self.items.clone();

        let position = draft
            .id
            .as_deref()
            .and_then(|id| self.items.iter().position(|a| a.id == id));

        let stored = match position {
            Some(index) => {
                let id = self.items[index].id.clone();
                let updated = draft.into_appointment(id);
                self.items[index] = updated.clone();
                tracing::debug!(id = %updated.id, "Appointment updated");
                updated
            }
            None => {
                if let Some(stale) = draft.id.as_deref() {
                    tracing::debug!(id = %stale, "Unknown appointment id, inserting as new");
                }
                let created = draft.into_appointment(self.ids.generate());
                self.items.push(created.clone());
                tracing::debug!(id = %created.id, "Appointment created");
                created
            }
        };

        self.sort();
        self.persist_or_rollback(previous)?;
        Ok(stored)
    }

    /// Delete by id. Returns whether an entry was removed; unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Result<bool, DatabaseError> {
        let Some(index) = self.items.iter().position(|a| a.id == id) else {
            tracing::debug!(id, "Remove of unknown appointment ignored");
            return Ok(false);
        };
        let previous = self.items.clone();
        self.items.remove(index);
        self.persist_or_rollback(previous)?;
        tracing::debug!(id, "Appointment removed");
        Ok(true)
    }

    /// Sorted, read-only view of the book.
    pub fn list(&self) -> &[Appointment] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Appointment> {
        self.items.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn sort(&mut self) {
        // Vec::sort_by_key is stable: equal starts keep insertion order.
        self.items.sort_by_key(|a| a.start);
    }

    fn persist_or_rollback(&mut self, previous: Vec<Appointment>) -> Result<(), DatabaseError> {
        if let Err(e) = self.store.save(&self.items) {
            tracing::warn!("Persisting appointment book failed, rolling back: {e}");
            self.items = previous;
            return Err(e);
        }
        Ok(())
    }
}
