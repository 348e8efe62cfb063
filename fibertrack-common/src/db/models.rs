//! Fault record models
//!
//! `FaultFields` is everything a user or an upload supplies; `FaultRecord`
//! adds the surrogate id assigned by the store. `FaultPatch` carries a
//! partial edit.

use crate::text::non_blank;
use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// One reported fiber fault, minus its id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultFields {
    /// Natural key, unique across the store
    pub bulletin_number: String,
    pub week: Option<String>,
    pub region: String,
    pub province: String,
    pub route: String,
    pub location: String,
    pub start_time: Option<NaiveDateTime>,
    /// Absent while the fault is still open
    pub end_time: Option<NaiveDateTime>,
    pub consolidated_root_cause: Option<String>,
    pub root_cause: Option<String>,
    pub cable_type: Option<String>,
    /// `None` means unknown
    pub sla_breached: Option<bool>,
    /// Free-text duration, kept as written
    pub sla_duration: Option<String>,
    pub fault_duration: Option<String>,
    pub outage_duration: Option<String>,
    pub permanent_solution: Option<bool>,
    pub materials_used: Option<String>,
    pub notes: Option<String>,
    /// Comma-decimal text, not guaranteed numeric
    pub coordinate_a: Option<String>,
    pub coordinate_b: Option<String>,
    pub escort_status: Option<String>,
    pub service_impact: Option<String>,
    pub affected_services: Option<String>,
    pub relocation_needed: Option<String>,
    pub compensation_process: Option<String>,
    pub otdr_measurement: Option<String>,
    pub year: Option<i32>,
}

impl FaultFields {
    pub fn new(bulletin_number: impl Into<String>) -> Self {
        Self {
            bulletin_number: bulletin_number.into(),
            ..Default::default()
        }
    }

    /// Trim the key and descriptive text, turn blank optional text into `None`.
    ///
    /// Coordinates are left exactly as written unless blank.
    pub fn normalized(mut self) -> Self {
        self.bulletin_number = self.bulletin_number.trim().to_string();
        self.region = self.region.trim().to_string();
        self.province = self.province.trim().to_string();
        self.route = self.route.trim().to_string();
        self.location = self.location.trim().to_string();

        for field in [
            &mut self.week,
            &mut self.consolidated_root_cause,
            &mut self.root_cause,
            &mut self.cable_type,
            &mut self.sla_duration,
            &mut self.fault_duration,
            &mut self.outage_duration,
            &mut self.materials_used,
            &mut self.notes,
            &mut self.escort_status,
            &mut self.service_impact,
            &mut self.affected_services,
            &mut self.relocation_needed,
            &mut self.compensation_process,
            &mut self.otdr_measurement,
        ] {
            *field = field.as_deref().and_then(non_blank);
        }

        for coordinate in [&mut self.coordinate_a, &mut self.coordinate_b] {
            if coordinate.as_deref().map_or(false, |c| c.trim().is_empty()) {
                *coordinate = None;
            }
        }

        self
    }

    /// Reject fields that can never be stored
    pub fn validate(&self) -> Result<()> {
        if self.bulletin_number.trim().is_empty() {
            return Err(Error::InvalidInput(
                "bulletin_number must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A stored fault record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub id: i64,
    #[serde(flatten)]
    pub fields: FaultFields,
}

/// Deserialize a present-but-null JSON field as `Some(None)`.
///
/// Together with `#[serde(default)]` this separates "leave unchanged"
/// (field absent) from "clear" (field null).
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial edit of a record. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaultPatch {
    #[serde(default)]
    pub bulletin_number: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub week: Option<Option<String>>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_time: Option<Option<NaiveDateTime>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_time: Option<Option<NaiveDateTime>>,
    #[serde(default, deserialize_with = "double_option")]
    pub consolidated_root_cause: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub root_cause: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cable_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub sla_breached: Option<Option<bool>>,
    #[serde(default, deserialize_with = "double_option")]
    pub sla_duration: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub fault_duration: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub outage_duration: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub permanent_solution: Option<Option<bool>>,
    #[serde(default, deserialize_with = "double_option")]
    pub materials_used: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub coordinate_a: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub coordinate_b: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub escort_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub service_impact: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub affected_services: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub relocation_needed: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub compensation_process: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub otdr_measurement: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub year: Option<Option<i32>>,
}

impl FaultPatch {
    /// Apply the patch on top of `target`, then normalize the result
    pub fn apply_to(&self, target: &FaultFields) -> Result<FaultFields> {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }

        let mut next = target.clone();
        set(&mut next.bulletin_number, &self.bulletin_number);
        set(&mut next.week, &self.week);
        set(&mut next.region, &self.region);
        set(&mut next.province, &self.province);
        set(&mut next.route, &self.route);
        set(&mut next.location, &self.location);
        set(&mut next.start_time, &self.start_time);
        set(&mut next.end_time, &self.end_time);
        set(&mut next.consolidated_root_cause, &self.consolidated_root_cause);
        set(&mut next.root_cause, &self.root_cause);
        set(&mut next.cable_type, &self.cable_type);
        set(&mut next.sla_breached, &self.sla_breached);
        set(&mut next.sla_duration, &self.sla_duration);
        set(&mut next.fault_duration, &self.fault_duration);
        set(&mut next.outage_duration, &self.outage_duration);
        set(&mut next.permanent_solution, &self.permanent_solution);
        set(&mut next.materials_used, &self.materials_used);
        set(&mut next.notes, &self.notes);
        set(&mut next.coordinate_a, &self.coordinate_a);
        set(&mut next.coordinate_b, &self.coordinate_b);
        set(&mut next.escort_status, &self.escort_status);
        set(&mut next.service_impact, &self.service_impact);
        set(&mut next.affected_services, &self.affected_services);
        set(&mut next.relocation_needed, &self.relocation_needed);
        set(&mut next.compensation_process, &self.compensation_process);
        set(&mut next.otdr_measurement, &self.otdr_measurement);
        set(&mut next.year, &self.year);

        let next = next.normalized();
        next.validate()?;
        Ok(next)
    }
}

impl From<FaultFields> for FaultPatch {
    /// A patch that replaces every field (full update)
    fn from(f: FaultFields) -> Self {
        Self {
            bulletin_number: Some(f.bulletin_number),
            week: Some(f.week),
            region: Some(f.region),
            province: Some(f.province),
            route: Some(f.route),
            location: Some(f.location),
            start_time: Some(f.start_time),
            end_time: Some(f.end_time),
            consolidated_root_cause: Some(f.consolidated_root_cause),
            root_cause: Some(f.root_cause),
            cable_type: Some(f.cable_type),
            sla_breached: Some(f.sla_breached),
            sla_duration: Some(f.sla_duration),
            fault_duration: Some(f.fault_duration),
            outage_duration: Some(f.outage_duration),
            permanent_solution: Some(f.permanent_solution),
            materials_used: Some(f.materials_used),
            notes: Some(f.notes),
            coordinate_a: Some(f.coordinate_a),
            coordinate_b: Some(f.coordinate_b),
            escort_status: Some(f.escort_status),
            service_impact: Some(f.service_impact),
            affected_services: Some(f.affected_services),
            relocation_needed: Some(f.relocation_needed),
            compensation_process: Some(f.compensation_process),
            otdr_measurement: Some(f.otdr_measurement),
            year: Some(f.year),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_blanks_become_none() {
        let mut fields = FaultFields::new("  B-100 ");
        fields.notes = Some("   ".to_string());
        fields.root_cause = Some(" Kablo kopması ".to_string());
        fields.coordinate_a = Some(" 40,18 ".to_string());
        fields.coordinate_b = Some("".to_string());

        let fields = fields.normalized();
        assert_eq!(fields.bulletin_number, "B-100");
        assert_eq!(fields.notes, None);
        assert_eq!(fields.root_cause.as_deref(), Some("Kablo kopması"));
        // Coordinates stay verbatim
        assert_eq!(fields.coordinate_a.as_deref(), Some(" 40,18 "));
        assert_eq!(fields.coordinate_b, None);
    }

    #[test]
    fn test_validate_rejects_blank_key() {
        assert!(FaultFields::new("   ").validate().is_err());
        assert!(FaultFields::new("A1").validate().is_ok());
    }

    #[test]
    fn test_patch_absent_vs_null() {
        let mut current = FaultFields::new("A1");
        current.notes = Some("old".to_string());
        current.sla_breached = Some(true);
        current.region = "Bursa".to_string();

        let patch: FaultPatch =
            serde_json::from_str(r#"{"notes": null, "region": "İzmir"}"#).unwrap();
        let next = patch.apply_to(&current).unwrap();

        assert_eq!(next.notes, None);
        assert_eq!(next.region, "İzmir");
        assert_eq!(next.sla_breached, Some(true), "absent field is untouched");
        assert_eq!(next.bulletin_number, "A1");
    }

    #[test]
    fn test_patch_blank_key_rejected() {
        let patch = FaultPatch {
            bulletin_number: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(patch.apply_to(&FaultFields::new("A1")).is_err());
    }

    #[test]
    fn test_patch_rejects_unknown_field() {
        let result: std::result::Result<FaultPatch, _> =
            serde_json::from_str(r#"{"bulten_no": "A1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_full_patch_replaces_everything() {
        let mut current = FaultFields::new("A1");
        current.notes = Some("old".to_string());

        let replacement = FaultFields::new("A2");
        let next = FaultPatch::from(replacement.clone())
            .apply_to(&current)
            .unwrap();
        assert_eq!(next, replacement);
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = FaultRecord {
            id: 7,
            fields: FaultFields::new("A1"),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["bulletin_number"], "A1");
        assert!(json["start_time"].is_null());
    }
}
