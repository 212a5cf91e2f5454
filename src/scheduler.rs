//! Scheduling engine: the composition root of the appointment book.
//!
//! Owns the collection and the editor session. Every command runs to
//! completion synchronously: decode → mutate → persist → re-sort, after
//! which the caller re-renders from [`Scheduler::list`].
//!
//! Editor session:
//! ```text
//! Idle ──begin_new──▶ Editing(New) ──submit/discard──▶ Idle
//! Idle ──begin_edit─▶ Editing(Existing(id)) ──submit/discard──▶ Idle
//! ```

use std::fmt::Display;
use std::path::Path;

use chrono::{DateTime, Local, TimeZone, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collection::AppointmentCollection;
use crate::config;
use crate::db::{self, DatabaseError};
use crate::form::{self, AppointmentForm, AppointmentRow};
use crate::ids::{IdSource, UuidIds};
use crate::models::Appointment;
use crate::store::{AppointmentStore, SlotStorage};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("No appointment is being edited")]
    NoEditSession,
}

/// What the open editor will write on submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EditTarget {
    New,
    Existing(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "target", rename_all = "snake_case")]
pub enum EditSession {
    #[default]
    Idle,
    Editing(EditTarget),
}

pub struct Scheduler<S, Tz: TimeZone = Local> {
    book: AppointmentCollection<S>,
    session: EditSession,
    tz: Tz,
}

impl Scheduler<Connection, Local> {
    /// Open the SQLite-backed book at `path` in the viewer's time zone.
    pub fn open_database(path: &Path) -> Result<Self, SchedulerError> {
        let conn = db::open_database(path)?;
        tracing::info!(path = %path.display(), "Opening appointment book");
        Self::open(conn, Box::new(UuidIds), Local, Utc::now())
    }
}

impl<S, Tz> Scheduler<S, Tz>
where
    S: SlotStorage,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    /// Load (or seed) the book stored in `storage` under the default slot key.
    pub fn open(
        storage: S,
        ids: Box<dyn IdSource>,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<Self, SchedulerError> {
        let store = AppointmentStore::new(storage, config::STORAGE_KEY);
        let book = AppointmentCollection::initialize(store, ids, &now.with_timezone(&tz))?;
        Ok(Self {
            book,
            session: EditSession::Idle,
            tz,
        })
    }

    // ── Reads ───────────────────────────────────────────────

    /// Sorted snapshot of the book.
    pub fn list(&self) -> &[Appointment] {
        self.book.list()
    }

    pub fn get(&self, id: &str) -> Option<&Appointment> {
        self.book.get(id)
    }

    /// Display rows in list order.
    pub fn rows(&self) -> Vec<AppointmentRow> {
        self.book
            .list()
            .iter()
            .map(|a| form::row_in(a, &self.tz))
            .collect()
    }

    pub fn details(&self, id: &str) -> Option<String> {
        self.book.get(id).map(|a| form::details_in(a, &self.tz))
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    // ── Commands ────────────────────────────────────────────

    /// Insert a new appointment from a form. Any id on the form is ignored.
    pub fn create(&mut self, form: &AppointmentForm) -> Result<Appointment, SchedulerError> {
        let mut draft = form::decode_in(form, &self.tz, Utc::now());
        draft.id = None;
        Ok(self.book.upsert(draft)?)
    }

    /// Replace the appointment named by the form's id (insert if none matches).
    pub fn update(&mut self, form: &AppointmentForm) -> Result<Appointment, SchedulerError> {
        let draft = form::decode_in(form, &self.tz, Utc::now());
        Ok(self.book.upsert(draft)?)
    }

    /// Remove by id. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool, SchedulerError> {
        Ok(self.book.remove(id)?)
    }

    /// Remove after the caller confirms. Declining, or an unknown id, changes nothing.
    pub fn cancel<F>(&mut self, id: &str, confirm: F) -> Result<bool, SchedulerError>
    where
        F: FnOnce(&Appointment) -> bool,
    {
        let Some(appt) = self.book.get(id) else {
            return Ok(false);
        };
        if !confirm(appt) {
            tracing::debug!(id, "Cancellation declined");
            return Ok(false);
        }
        self.delete(id)
    }

    // ── Editor session ──────────────────────────────────────

    /// Open the editor on a blank form.
    pub fn begin_new(&mut self, now: DateTime<Utc>) -> AppointmentForm {
        self.session = EditSession::Editing(EditTarget::New);
        form::blank_in(&self.tz, now)
    }

    /// Open the editor on an existing appointment. Unknown ids leave the
    /// session untouched.
    pub fn begin_edit(&mut self, id: &str) -> Option<AppointmentForm> {
        let filled = form::encode_in(self.book.get(id)?, &self.tz);
        self.session = EditSession::Editing(EditTarget::Existing(filled.id.clone()));
        Some(filled)
    }

    /// Close the editor without saving.
    pub fn discard(&mut self) {
        self.session = EditSession::Idle;
    }

    /// Save the open editor. The session decides between insert and update;
    /// the form's own id is not trusted. On error the editor stays open.
    pub fn submit(&mut self, form: &AppointmentForm) -> Result<Appointment, SchedulerError> {
        let EditSession::Editing(target) = &self.session else {
            return Err(SchedulerError::NoEditSession);
        };
        let mut draft = form::decode_in(form, &self.tz, Utc::now());
        draft.id = match target {
            EditTarget::New => None,
            EditTarget::Existing(id) => Some(id.clone()),
        };
        let saved = self.book.upsert(draft)?;
        self.session = EditSession::Idle;
        Ok(saved)
    }
}
