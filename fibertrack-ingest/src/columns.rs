//! Spreadsheet header ↔ record field mapping
//!
//! Header text comes from the operators' fault sheets and is configuration,
//! not logic: every header can be overridden per field in `[ingest.columns]`.

use fibertrack_common::config::IngestConfig;
use fibertrack_common::{Error, Result};
use std::collections::BTreeMap;

/// Record fields that can be filled from a spreadsheet column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    BulletinNumber,
    Week,
    Region,
    Province,
    Route,
    Location,
    StartTime,
    EndTime,
    ConsolidatedRootCause,
    RootCause,
    CableType,
    SlaBreached,
    SlaDuration,
    FaultDuration,
    OutageDuration,
    PermanentSolution,
    MaterialsUsed,
    Notes,
    CoordinateA,
    CoordinateB,
    EscortStatus,
    ServiceImpact,
    AffectedServices,
    RelocationNeeded,
    CompensationProcess,
    OtdrMeasurement,
    Year,
}

impl Column {
    /// Every column, in export order
    pub const ALL: [Column; 27] = [
        Column::BulletinNumber,
        Column::Week,
        Column::Region,
        Column::Province,
        Column::Route,
        Column::Location,
        Column::StartTime,
        Column::EndTime,
        Column::ConsolidatedRootCause,
        Column::RootCause,
        Column::CableType,
        Column::SlaBreached,
        Column::SlaDuration,
        Column::FaultDuration,
        Column::OutageDuration,
        Column::PermanentSolution,
        Column::MaterialsUsed,
        Column::Notes,
        Column::CoordinateA,
        Column::CoordinateB,
        Column::EscortStatus,
        Column::ServiceImpact,
        Column::AffectedServices,
        Column::RelocationNeeded,
        Column::CompensationProcess,
        Column::OtdrMeasurement,
        Column::Year,
    ];

    /// Columns an upload must carry unless configured otherwise
    pub const DEFAULT_REQUIRED: [Column; 11] = [
        Column::BulletinNumber,
        Column::Region,
        Column::Province,
        Column::Route,
        Column::Location,
        Column::StartTime,
        Column::EndTime,
        Column::ConsolidatedRootCause,
        Column::RootCause,
        Column::SlaBreached,
        Column::FaultDuration,
    ];

    /// Record field name, as used in `[ingest.columns]` and the JSON API
    pub fn field_name(self) -> &'static str {
        match self {
            Column::BulletinNumber => "bulletin_number",
            Column::Week => "week",
            Column::Region => "region",
            Column::Province => "province",
            Column::Route => "route",
            Column::Location => "location",
            Column::StartTime => "start_time",
            Column::EndTime => "end_time",
            Column::ConsolidatedRootCause => "consolidated_root_cause",
            Column::RootCause => "root_cause",
            Column::CableType => "cable_type",
            Column::SlaBreached => "sla_breached",
            Column::SlaDuration => "sla_duration",
            Column::FaultDuration => "fault_duration",
            Column::OutageDuration => "outage_duration",
            Column::PermanentSolution => "permanent_solution",
            Column::MaterialsUsed => "materials_used",
            Column::Notes => "notes",
            Column::CoordinateA => "coordinate_a",
            Column::CoordinateB => "coordinate_b",
            Column::EscortStatus => "escort_status",
            Column::ServiceImpact => "service_impact",
            Column::AffectedServices => "affected_services",
            Column::RelocationNeeded => "relocation_needed",
            Column::CompensationProcess => "compensation_process",
            Column::OtdrMeasurement => "otdr_measurement",
            Column::Year => "year",
        }
    }

    /// Header text used by the fault sheets
    pub fn default_header(self) -> &'static str {
        match self {
            Column::BulletinNumber => "Bülten Numarası",
            Column::Week => "Hafta",
            Column::Region => "Bölge",
            Column::Province => "İL",
            Column::Route => "Güzergah",
            Column::Location => "Lokasyon",
            Column::StartTime => "Arıza Başlangıç",
            Column::EndTime => "Arıza Bitiş",
            Column::ConsolidatedRootCause => "Arıza Konsolide Kök Neden",
            Column::RootCause => "Arıza Kök Neden",
            Column::CableType => "KABLO TIPI",
            Column::SlaBreached => "HAGS Aşıldı mı",
            Column::SlaDuration => "HAGS SURESI",
            Column::FaultDuration => "Arıza Süresi",
            Column::OutageDuration => "KESINTI SÜRESİ",
            Column::PermanentSolution => "KALICI ÇÖZÜM SAĞLANDI",
            Column::MaterialsUsed => "KULLANILAN MALZEME",
            Column::Notes => "ACIKLAMA",
            Column::CoordinateA => "KORDINAT A",
            Column::CoordinateB => "KORDINAT B",
            Column::EscortStatus => "Refakat Durumu",
            Column::ServiceImpact => "Servis Etkisi",
            // Sic: the sheets spell it this way
            Column::AffectedServices => "SERİVS ETKİSİ",
            Column::RelocationNeeded => "YER DEĞİŞİKLİĞİ",
            Column::CompensationProcess => "TAZMİNAT SÜRECİ",
            Column::OtdrMeasurement => "OTDR ÖLÇÜMÜ",
            Column::Year => "YIL",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.field_name() == name)
    }
}

/// Header text for every column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    headers: BTreeMap<Column, String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            headers: Column::ALL
                .iter()
                .map(|c| (*c, c.default_header().to_string()))
                .collect(),
        }
    }
}

impl ColumnMap {
    /// Default headers with per-field overrides applied.
    ///
    /// Unknown field names are a configuration error rather than being
    /// silently ignored.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut map = Self::default();
        for (field, header) in overrides {
            let column = Column::from_field_name(field).ok_or_else(|| {
                Error::Config(format!("Unknown field in [ingest.columns]: {}", field))
            })?;
            let header = header.trim();
            if header.is_empty() {
                return Err(Error::Config(format!(
                    "Blank header for field {} in [ingest.columns]",
                    field
                )));
            }
            map.headers.insert(column, header.to_string());
        }
        Ok(map)
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Self::with_overrides(&config.columns)
    }

    pub fn header(&self, column: Column) -> &str {
        self.headers
            .get(&column)
            .map(String::as_str)
            .unwrap_or_else(|| column.default_header())
    }

    /// Required headers: the configured list, or the default required
    /// columns under their (possibly overridden) headers
    pub fn required_columns(&self, config: &IngestConfig) -> Vec<String> {
        match &config.required_columns {
            Some(columns) => columns.iter().map(|c| c.trim().to_string()).collect(),
            None => Column::DEFAULT_REQUIRED
                .iter()
                .map(|c| self.header(*c).to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for column in Column::ALL {
            assert_eq!(Column::from_field_name(column.field_name()), Some(column));
        }
        assert_eq!(Column::from_field_name("bulten_no"), None);
    }

    #[test]
    fn test_default_required_headers() {
        let required = ColumnMap::default().required_columns(&IngestConfig::default());
        assert_eq!(required.len(), 11);
        assert_eq!(required[0], "Bülten Numarası");
        assert!(required.contains(&"HAGS Aşıldı mı".to_string()));
        assert!(!required.contains(&"KORDINAT A".to_string()));
    }

    #[test]
    fn test_override_flows_into_required_columns() {
        let mut overrides = BTreeMap::new();
        overrides.insert("bulletin_number".to_string(), " Bulten No ".to_string());
        let map = ColumnMap::with_overrides(&overrides).unwrap();

        assert_eq!(map.header(Column::BulletinNumber), "Bulten No");
        let required = map.required_columns(&IngestConfig::default());
        assert_eq!(required[0], "Bulten No");
    }

    #[test]
    fn test_explicit_required_list_wins() {
        let config = IngestConfig {
            required_columns: Some(vec![" Bülten Numarası ".to_string()]),
            ..Default::default()
        };
        let required = ColumnMap::default().required_columns(&config);
        assert_eq!(required, vec!["Bülten Numarası".to_string()]);
    }

    #[test]
    fn test_unknown_override_rejected() {
        let mut overrides = BTreeMap::new();
        overrides.insert("colour".to_string(), "Renk".to_string());
        assert!(matches!(
            ColumnMap::with_overrides(&overrides),
            Err(Error::Config(_))
        ));
    }
}
