//! Appointment identity generation.
//!
//! Ids are v4 UUIDs drawn from the operating system RNG. When the OS RNG is
//! unavailable the generator falls back to `<unix millis><16 hex digits>`,
//! where the suffix is drawn from the thread-local RNG and mixed with a
//! process-wide counter, so two calls in the same millisecond still differ.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use uuid::Uuid;

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Source of fresh appointment ids.
pub trait IdSource {
    fn generate(&self) -> String;
}

/// Random UUIDs, falling back to timestamp ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn generate(&self) -> String {
        let mut bytes = [0u8; 16];
        match OsRng.try_fill_bytes(&mut bytes) {
            Ok(()) => uuid::Builder::from_random_bytes(bytes)
                .into_uuid()
                .to_string(),
            Err(e) => {
                tracing::warn!("OS random source unavailable, using timestamp id: {e}");
                timestamp_id()
            }
        }
    }
}

/// Timestamp + random suffix ids only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampIds;

impl IdSource for TimestampIds {
    fn generate(&self) -> String {
        timestamp_id()
    }
}

/// Mint an id with the default strategy. Usable by any collaborator that
/// needs a unique token, not only the appointment book.
pub fn generate_id() -> String {
    UuidIds.generate()
}

fn timestamp_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let count = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    let suffix = rand::thread_rng().gen::<u64>() ^ count.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    format!("{millis}{suffix:016x}")
}

/// True if `id` parses as a UUID (as opposed to a fallback id).
pub fn is_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}
