use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of the film-percentage reference upload, kept as the backend sent it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceRecord(pub Value);

impl ReferenceRecord {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}
