use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Careslot";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the durable slot holding the serialized appointment book.
pub const STORAGE_KEY: &str = "mc_appointments_v1";

/// Environment variable that relocates the data directory (tests, portable installs).
pub const DATA_DIR_ENV: &str = "CARESLOT_DATA_DIR";

/// Get the application data directory.
/// `~/Careslot/` unless `CARESLOT_DATA_DIR` is set.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Path of the SQLite database that hosts the storage slots.
pub fn database_path() -> PathBuf {
    app_data_dir().join("careslot.db")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "careslot_lib=info,careslot=info,warn"
}
