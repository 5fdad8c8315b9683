//! Durable single-slot intent storage.

use crate::{IntentResult, PendingIntent};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

/// One pending intent, persisted as a JSON file so it survives app
/// restarts and process death during sign-in.
///
/// Single slot: [`store`](Self::store) unconditionally overwrites
/// whatever was parked before. The newest intent is the one the user
/// most recently expressed, so it wins.
pub struct PendingIntentStore {
    path: PathBuf,
    // Serializes writers; reads go straight to the file
    write_lock: Mutex<()>,
}

impl PendingIntentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Park `intent`, replacing any previously parked one.
    pub fn store(&self, intent: &PendingIntent) -> IntentResult<()> {
        let record = serde_json::to_string(intent)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, record)?;
        debug!(path = %intent.resolved_path, "Pending intent parked");
        Ok(())
    }

    /// The parked intent, if one can be read back intact.
    ///
    /// Fails closed: unreadable or corrupt slots are logged and treated
    /// as empty.
    pub fn get(&self) -> Option<PendingIntent> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(error) => {
                warn!(%error, "Pending intent unreadable, treating as empty");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(intent) => Some(intent),
            Err(error) => {
                warn!(%error, "Pending intent corrupt, treating as empty");
                None
            }
        }
    }

    /// Empty the slot. Idempotent.
    pub fn clear(&self) -> IntentResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Pending intent cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
