//! Free-form settings record

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Collection, Entity, Record};

/// A key/value setting. The value is arbitrary JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub extra: Record,
}

impl Setting {
    #[must_use]
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            extra: Record::new(),
        }
    }
}

impl Entity for Setting {
    const COLLECTION: Collection = Collection::Settings;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn setting_record_has_key_and_value() {
        let setting = Setting::new("theme", json!("dark"));
        let record = setting.to_record().unwrap();
        assert_eq!(Collection::Settings.primary_key(&record).as_deref(), Some("theme"));
        assert_eq!(record.get("value"), Some(&json!("dark")));
    }
}
