use std::path::Path;

use tracing::info;

use shared_models::booking::Doctor;

use crate::store::{StoreError, StoreResult};

/// Reads a JSON array of doctor records used to populate the in-memory directory.
pub fn load_doctors(path: impl AsRef<Path>) -> StoreResult<Vec<Doctor>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Backend(format!("Failed to read {}: {}", path.display(), e)))?;
    let doctors: Vec<Doctor> = serde_json::from_str(&raw)
        .map_err(|e| StoreError::Backend(format!("Failed to parse {}: {}", path.display(), e)))?;

    info!("Loaded {} doctors from {}", doctors.len(), path.display());
    Ok(doctors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_load_doctors_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "id": "7f0d3a5e-2b1c-4d8e-9f6a-1b2c3d4e5f60",
                "practitioner_id": "DOC001",
                "first_name": "John",
                "last_name": "Smith",
                "specialization": "Cardiology",
                "phone": "555-0100",
                "email": "doctor@hospital.com",
                "address": "1 Main St",
                "city": "Springfield",
                "state": "IL",
                "zip_code": "62701"
            }}]"#
        )
        .unwrap();

        let doctors = load_doctors(file.path()).unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].full_name(), "John Smith");
    }

    #[test]
    fn test_load_doctors_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert_matches!(load_doctors(file.path()), Err(StoreError::Backend(_)));
    }
}
