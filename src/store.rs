//! Flat-file reservation store.
//!
//! The full record list is reloaded from disk on every operation and
//! rewritten wholesale on every mutation. Mutations serialize behind a
//! process-wide writer lock, and the file is replaced via a temp-file
//! rename so a crashed write never leaves a truncated store behind.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::record::{normalize_payload, JsonMap, Reservation, OPTIONAL_FIELDS};
use crate::validate::Validator;

pub struct ReservationStore {
    data_path: PathBuf,
    validator: Validator,
    write_lock: Mutex<()>,
}

impl ReservationStore {
    /// Opens the store, creating the data file (and parent directories)
    /// with an empty list when absent.
    pub fn open(data_path: impl Into<PathBuf>, validator: Validator) -> std::io::Result<Self> {
        let data_path = data_path.into();
        if !data_path.exists() {
            if let Some(parent) = data_path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(&data_path, "[]")?;
        }
        Ok(Self {
            data_path,
            validator,
            write_lock: Mutex::new(()),
        })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Reads the full record list. A file that fails to parse degrades to
    /// an empty store; entries that are not well-formed records are dropped.
    fn load(&self) -> Vec<Reservation> {
        let text = match fs::read_to_string(&self.data_path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %self.data_path.display(), %err, "failed to read store file");
                return Vec::new();
            }
        };

        let entries: Vec<Value> = match serde_json::from_str(&text) {
            Ok(Value::Array(entries)) => entries,
            Ok(Value::Object(single)) => vec![Value::Object(single)],
            Ok(_) => {
                warn!(path = %self.data_path.display(), "store file is not a list");
                return Vec::new();
            }
            Err(err) => {
                warn!(path = %self.data_path.display(), %err, "store file failed to parse");
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(%err, "dropping malformed store entry");
                    None
                }
            })
            .collect()
    }

    /// Rewrites the whole list atomically (temp file + rename).
    fn persist(&self, records: &[Reservation]) -> Result<(), ApiError> {
        let json = serde_json::to_string_pretty(records)?;
        let tmp_path = self.data_path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.data_path)?;
        Ok(())
    }

    /// All records, optionally filtered by a case-insensitive substring
    /// search over guest name, email, and resort name.
    pub fn list(&self, search: Option<&str>) -> Vec<Reservation> {
        let records = self.load();
        match search.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => {
                let query = query.to_lowercase();
                records
                    .into_iter()
                    .filter(|record| record.matches_query(&query))
                    .collect()
            }
            None => records,
        }
    }

    pub fn get(&self, id: &str) -> Result<Reservation, ApiError> {
        let records = self.load();
        position_of(&records, id)
            .map(|index| records[index].clone())
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    /// One more than the maximum ID currently stored. Recomputed from live
    /// state, so IDs are reused after the highest record is deleted.
    pub fn next_id(&self) -> u64 {
        next_id_in(&self.load())
    }

    pub fn count(&self) -> usize {
        self.load().len()
    }

    /// Creates a record: assigns the next ID and both timestamps, fills
    /// optional fields, validates, appends, persists.
    pub fn create(&self, payload: JsonMap) -> Result<Reservation, ApiError> {
        let _guard = self.write_lock.lock();
        let mut records = self.load();

        let id = next_id_in(&records);
        let now = timestamp();

        let mut data = normalize_payload(payload);
        data.insert("id".to_string(), Value::from(id));
        data.insert("created_at".to_string(), Value::String(now.clone()));
        data.insert("updated_at".to_string(), Value::String(now));
        fill_optional_fields(&mut data);

        self.validator.validate(&data)?;
        let record: Reservation = serde_json::from_value(Value::Object(data))?;

        records.push(record.clone());
        self.persist(&records)?;
        info!(id, "reservation created");
        Ok(record)
    }

    /// Replaces a record wholesale with the supplied payload, preserving
    /// its `id` and `created_at` and refreshing `updated_at`. The store is
    /// left unchanged when validation fails.
    pub fn update(&self, id: &str, payload: JsonMap) -> Result<Reservation, ApiError> {
        let _guard = self.write_lock.lock();
        let mut records = self.load();

        let index = position_of(&records, id).ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        let existing = &records[index];

        let mut data = normalize_payload(payload);
        data.insert("id".to_string(), Value::from(existing.id));
        data.insert(
            "created_at".to_string(),
            Value::String(existing.created_at.clone()),
        );
        data.insert("updated_at".to_string(), Value::String(timestamp()));
        fill_optional_fields(&mut data);

        self.validator.validate(&data)?;
        let record: Reservation = serde_json::from_value(Value::Object(data))?;

        records[index] = record.clone();
        self.persist(&records)?;
        info!(id = record.id, "reservation updated");
        Ok(record)
    }

    /// Removes the first record matching the ID and returns its original ID.
    pub fn delete(&self, id: &str) -> Result<u64, ApiError> {
        let _guard = self.write_lock.lock();
        let mut records = self.load();

        let index = position_of(&records, id).ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        let removed = records.remove(index);

        self.persist(&records)?;
        info!(id = removed.id, "reservation deleted");
        Ok(removed.id)
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Numeric comparison first; non-numeric requests fall back to comparing
/// stringified forms.
fn position_of(records: &[Reservation], id: &str) -> Option<usize> {
    match id.trim().parse::<u64>() {
        Ok(wanted) => records.iter().position(|record| record.id == wanted),
        Err(_) => records.iter().position(|record| record.id.to_string() == id),
    }
}

fn next_id_in(records: &[Reservation]) -> u64 {
    records.iter().map(|record| record.id).max().unwrap_or(0) + 1
}

fn fill_optional_fields(data: &mut JsonMap) {
    for &field in OPTIONAL_FIELDS {
        data.entry(field.to_string())
            .or_insert_with(|| Value::String(String::new()));
    }
}
