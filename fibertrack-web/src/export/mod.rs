//! Read-side renderings of the record store: map points, KML, XLSX

pub mod coordinates;
pub mod kml;
pub mod xlsx;

pub use coordinates::{map_points, parse_coordinate, MapPoint};
