use detect::Orientation;
use serde::{Deserialize, Serialize};

/// One catalogued fingerprint.
///
/// The natural key is `(individual_id, photo_id)`; an empty `photo_id` is a
/// valid key component meaning "no specific source photo".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub individual_id: String,
    pub display_name: String,
    #[serde(default)]
    pub photo_id: String,
    #[serde(default)]
    pub orientation: Orientation,
    pub vector: Vec<f32>,
}

impl EmbeddingRecord {
    pub fn new(
        individual_id: impl Into<String>,
        display_name: impl Into<String>,
        vector: Vec<f32>,
    ) -> Self {
        Self {
            individual_id: individual_id.into(),
            display_name: display_name.into(),
            photo_id: String::new(),
            orientation: Orientation::Unspecified,
            vector,
        }
    }

    pub fn with_photo_id(mut self, photo_id: impl Into<String>) -> Self {
        self.photo_id = photo_id.into();
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub(crate) fn key(&self) -> RecordKey {
        (self.individual_id.clone(), self.photo_id.clone())
    }
}

pub(crate) type RecordKey = (String, String);

/// Persisted metadata row; the vector lives in the snapshot's matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RecordMeta {
    pub individual_id: String,
    pub display_name: String,
    pub photo_id: String,
    pub orientation: Orientation,
}

impl From<&EmbeddingRecord> for RecordMeta {
    fn from(rec: &EmbeddingRecord) -> Self {
        Self {
            individual_id: rec.individual_id.clone(),
            display_name: rec.display_name.clone(),
            photo_id: rec.photo_id.clone(),
            orientation: rec.orientation,
        }
    }
}

impl RecordMeta {
    pub(crate) fn into_record(self, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            individual_id: self.individual_id,
            display_name: self.display_name,
            photo_id: self.photo_id,
            orientation: self.orientation,
            vector,
        }
    }
}
