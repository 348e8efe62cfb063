//! Coordinate parsing for map output
//!
//! Records store coordinates exactly as typed (`40,1828`). Only here are they
//! read as numbers; a record whose coordinates do not parse is left off the
//! map, it never fails the response.

use chrono::NaiveDateTime;
use fibertrack_common::db::models::FaultRecord;
use serde::Serialize;

/// Comma or period decimal text → finite number
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Coordinate A is latitude, coordinate B longitude. Both must parse and lie
/// within the globe.
pub fn lat_lon(record: &FaultRecord) -> Option<(f64, f64)> {
    let lat = parse_coordinate(record.fields.coordinate_a.as_deref()?)?;
    let lon = parse_coordinate(record.fields.coordinate_b.as_deref()?)?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}

/// One fault on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub id: i64,
    pub bulletin_number: String,
    pub latitude: f64,
    pub longitude: f64,
    pub region: String,
    pub province: String,
    pub location: String,
    pub root_cause: Option<String>,
    pub start_time: Option<NaiveDateTime>,
}

/// Points for every record with usable coordinates, input order kept
pub fn map_points(records: &[FaultRecord]) -> Vec<MapPoint> {
    records
        .iter()
        .filter_map(|record| {
            let (latitude, longitude) = lat_lon(record)?;
            let f = &record.fields;
            Some(MapPoint {
                id: record.id,
                bulletin_number: f.bulletin_number.clone(),
                latitude,
                longitude,
                region: f.region.clone(),
                province: f.province.clone(),
                location: f.location.clone(),
                root_cause: f.root_cause.clone(),
                start_time: f.start_time,
            })
        })
        .collect()
}
