use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScanError;
use crate::records::ScanResult;

/// What kind of document was photographed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    /// Medicine package or strip.
    Medicine,
    /// Handwritten or printed prescription.
    Prescription,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medicine => "medicine",
            Self::Prescription => "prescription",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "medicine" => Ok(Self::Medicine),
            "prescription" => Ok(Self::Prescription),
            other => Err(ScanError::InvalidInput(format!("unknown scan type '{other}'"))),
        }
    }
}

/// Identifier of a persisted scan.
pub type ScanId = Uuid;

/// One analyze call. Immutable once built; dropped when the pipeline ends.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub image_bytes: Vec<u8>,
    /// Declared media type from the upload, if any.
    pub mime_type: Option<String>,
    pub scan_type: ScanType,
    /// Requested language code exactly as received.
    pub language_code: String,
    pub user_id: Option<String>,
}

/// Where the narration audio can be played from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioReference {
    /// Self-contained `data:` URI.
    Embedded { data_uri: String },
    /// Separately fetched resource.
    Url { url: String },
}

impl AudioReference {
    pub fn embedded(&self) -> Option<&str> {
        match self {
            Self::Embedded { data_uri } => Some(data_uri),
            Self::Url { .. } => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url { url } => Some(url),
            Self::Embedded { .. } => None,
        }
    }
}

/// A completed scan as handed to (and read back from) the history store.
///
/// `result` is written untagged and read back according to `scan_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredScanRecord")]
pub struct ScanRecord {
    pub id: ScanId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub scan_type: ScanType,
    pub language_code: String,
    pub result: ScanResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioReference>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct StoredScanRecord {
    id: ScanId,
    #[serde(default)]
    owner_id: Option<String>,
    scan_type: ScanType,
    language_code: String,
    result: serde_json::Value,
    #[serde(default)]
    audio: Option<AudioReference>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StoredScanRecord> for ScanRecord {
    type Error = serde_json::Error;

    fn try_from(stored: StoredScanRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: stored.id,
            owner_id: stored.owner_id,
            scan_type: stored.scan_type,
            language_code: stored.language_code,
            result: ScanResult::decode_for(stored.scan_type, stored.result)?,
            audio: stored.audio,
            created_at: stored.created_at,
        })
    }
}

impl ScanRecord {
    pub fn new(
        owner_id: Option<String>,
        scan_type: ScanType,
        language_code: impl Into<String>,
        result: ScanResult,
        audio: Option<AudioReference>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            scan_type,
            language_code: language_code.into(),
            result,
            audio,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_type_parses_path_segment() {
        assert_eq!("medicine".parse::<ScanType>().unwrap(), ScanType::Medicine);
        assert_eq!("Prescription".parse::<ScanType>().unwrap(), ScanType::Prescription);
        assert!(matches!(
            "receipt".parse::<ScanType>(),
            Err(ScanError::InvalidInput(_))
        ));
    }

    #[test]
    fn record_serialization() {
        let record = ScanRecord::new(
            Some("7".into()),
            ScanType::Medicine,
            "hi",
            ScanResult::fallback("unreadable"),
            Some(AudioReference::Url {
                url: "/api/audio/a.mp3".into(),
            }),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["scan_type"], "medicine");
        assert_eq!(json["result"]["raw"], "unreadable");
        assert_eq!(json["audio"]["kind"], "url");

        let back: ScanRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn prescription_with_medicine_name_keeps_its_type() {
        let result = ScanResult::decode_for(
            ScanType::Prescription,
            serde_json::json!({
                "medicines": [{"name": "Amoxicillin"}],
                "medicine_name": "Amoxicillin",
                "overall_advice": "TDS"
            }),
        )
        .unwrap();
        let record = ScanRecord::new(Some("7".into()), ScanType::Prescription, "en", result, None);

        let text = serde_json::to_string(&record).unwrap();
        let back: ScanRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
        let ScanResult::Prescription(p) = back.result else {
            panic!("expected prescription");
        };
        assert_eq!(p.overall_advice, "TDS");
        assert_eq!(p.medicines.len(), 1);
    }
}
