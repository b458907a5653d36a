pub mod error;
pub mod language;
pub mod records;
pub mod traits;
pub mod types;

pub use error::{ScanError, Stage};
pub use language::Language;
pub use records::{
    DoctorInfo, DosageStrength, MedicineEntry, MedicineRecord, PatientInfo, PrescriptionRecord,
    RawFallbackRecord, ScanResult,
};
pub use traits::{EncodedImage, LlmProvider, LlmRequest, LlmResponse};
pub use types::{AudioReference, ScanId, ScanRecord, ScanRequest, ScanType};
