//! Entity snapshots read from the document store
//!
//! Field names follow the stored documents (`_id`, PascalCase attributes). Unknown fields are
//! ignored.

use serde::{Deserialize, Serialize};

/// Chemical stock record
///
/// The stored `MinQuantity` is not decoded: the configured chemical usage `min` is the only
/// stock floor applied when sampling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Chemical {
    #[serde(rename = "_id", alias = "ChemicalId")]
    pub id: String,
    #[serde(default)]
    pub chemical_name: Option<String>,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub measure_unit: Option<String>,
}

/// Facility equipment record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Equipment {
    #[serde(rename = "_id", alias = "EquipmentId")]
    pub id: String,
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Facility user record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(rename = "_id", alias = "UserId")]
    pub id: String,
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chemical_from_document() {
        let doc = json!({
            "_id": "c1",
            "ChemicalName": "Chlorine",
            "MinQuantity": 1.0,
            "Quantity": 3,
            "MeasureUnit": "kg",
            "UsageDescription": "ignored"
        });

        let chemical: Chemical = serde_json::from_value(doc).unwrap();
        assert_eq!(chemical.id, "c1");
        assert_eq!(chemical.quantity, 3.0);
        assert_eq!(chemical.chemical_name.as_deref(), Some("Chlorine"));
    }

    #[test]
    fn test_equipment_defaults_to_active() {
        let equipment: Equipment =
            serde_json::from_value(json!({"_id": "e1", "Type": "Pump"})).unwrap();
        assert_eq!(equipment.kind.as_deref(), Some("Pump"));
        assert!(equipment.is_active);
    }

    #[test]
    fn test_user_accepts_legacy_id_field() {
        let user: User =
            serde_json::from_value(json!({"UserId": "u1", "Type": "Customer"})).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.kind.as_deref(), Some("Customer"));
    }
}
