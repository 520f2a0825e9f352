use crate::keys::SETTINGS_KEY;
use crate::store::{self, KvStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub min_password_length: usize,
    pub preselect_all_default: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_password_length: 6,
            preselect_all_default: false,
        }
    }
}

impl Settings {
    pub fn load(store: &dyn KvStore) -> Result<Self, StoreError> {
        let mut current = Self::default();
        if let Some(saved) = store::get_json::<Value>(store, SETTINGS_KEY)? {
            if let Some(saved_obj) = saved.as_object() {
                // Best-effort: a stale or hand-edited field must not block login.
                for (k, v) in saved_obj {
                    if let Err(e) = current.apply_field(k, v) {
                        tracing::warn!(field = %k, error = %e, "ignoring stored setting");
                    }
                }
            }
        }
        Ok(current)
    }

    pub fn save(&self, store: &dyn KvStore) -> Result<(), StoreError> {
        store::set_json(store, SETTINGS_KEY, self)
    }

    /// Applies every field of `patch` or none of them.
    pub fn merge_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        let mut next = self.clone();
        for (k, v) in patch {
            next.apply_field(k, v)?;
        }
        *self = next;
        Ok(())
    }

    fn apply_field(&mut self, key: &str, v: &Value) -> Result<(), String> {
        match key {
            "minPasswordLength" => {
                let n = v
                    .as_u64()
                    .ok_or_else(|| format!("{} must be an integer", key))?;
                if !(1..=128).contains(&n) {
                    return Err(format!("{} must be between 1 and 128", key));
                }
                self.min_password_length = n as usize;
            }
            "preselectAllDefault" => {
                self.preselect_all_default = v
                    .as_bool()
                    .ok_or_else(|| format!("{} must be a boolean", key))?;
            }
            _ => return Err(format!("unknown settings field: {}", key)),
        }
        Ok(())
    }
}
