//! Raw record sources.
//!
//! Records come either from a JSON file supplied by the user or from the
//! built-in synthetic wildfire dataset.

use crate::models::Record;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Year used when the caller does not ask for one.
pub const DEFAULT_YEAR: i32 = 2024;

/// Synthetic wildfire suppression costs.
///
/// Four regions, each with an aircraft, personnel and equipment record.
/// Hours are only tracked for aircraft. The figures are the same for every
/// year.
pub fn mock_wildfire_costs(year: i32) -> Vec<Record> {
    debug!("Building synthetic dataset for year={}", year);

    vec![
        Record::new("South", "aircraft", 176_870.51, 116.9),
        Record::new("Central", "aircraft", 161_923.60, 102.7),
        Record::new("Northwest", "aircraft", 154_527.82, 94.8),
        Record::new("Northeast", "aircraft", 131_905.83, 123.2),
        Record::new("Central", "personnel", 97_266.43, 0.0),
        Record::new("Northeast", "personnel", 84_489.65, 0.0),
        Record::new("Northwest", "personnel", 76_568.23, 0.0),
        Record::new("South", "personnel", 74_011.79, 0.0),
        Record::new("Central", "equipment", 66_877.06, 0.0),
        Record::new("Northeast", "equipment", 61_460.99, 0.0),
        Record::new("Northwest", "equipment", 58_812.48, 0.0),
        Record::new("South", "equipment", 49_164.94, 0.0),
    ]
}

/// Load records from a JSON file holding an array of record objects.
pub fn load_records_file(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;

    let values: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("Records file is not a JSON array: {}", path.display()))?;

    let records = Record::from_values(&values)
        .with_context(|| format!("Invalid record in {}", path.display()))?;

    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mock_dataset_shape() {
        let records = mock_wildfire_costs(DEFAULT_YEAR);
        assert_eq!(records.len(), 12);

        for category in ["aircraft", "personnel", "equipment"] {
            let count = records
                .iter()
                .filter(|r| r.category.as_deref() == Some(category))
                .count();
            assert_eq!(count, 4);
        }

        assert!(records
            .iter()
            .filter(|r| r.category.as_deref() != Some("aircraft"))
            .all(|r| r.hours == 0.0));
    }

    #[test]
    fn test_load_records_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.json");
        std::fs::write(
            &path,
            r#"[
                {"region": "South", "category": "aircraft", "cost": 100.0, "hours": 5.0},
                {"region": "North", "category": "personnel", "cost": "30"}
            ]"#,
        )
        .unwrap();

        let records = load_records_file(&path).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].cost, 30.0);
        assert_eq!(records[1].hours, 0.0);
    }

    #[test]
    fn test_load_records_file_invalid_field() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.json");
        std::fs::write(&path, r#"[{"region": "South", "cost": [1, 2]}]"#).unwrap();

        let err = load_records_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("field `cost`"));
    }

    #[test]
    fn test_load_records_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_records_file(&temp_dir.path().join("nope.json")).is_err());
    }
}
