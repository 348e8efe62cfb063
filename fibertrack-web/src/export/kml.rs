//! KML document of fault locations

use super::coordinates::MapPoint;
use fibertrack_common::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Render points as a KML 2.2 document, one placemark per fault
pub fn render_kml(document_name: &str, points: &[MapPoint]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write(
        &mut writer,
        Event::Start(BytesStart::new("kml").with_attributes([("xmlns", KML_NAMESPACE)])),
    )?;
    write(&mut writer, Event::Start(BytesStart::new("Document")))?;
    text_element(&mut writer, "name", document_name)?;

    for point in points {
        write(&mut writer, Event::Start(BytesStart::new("Placemark")))?;
        text_element(&mut writer, "name", &point.bulletin_number)?;
        text_element(&mut writer, "description", &describe(point))?;
        write(&mut writer, Event::Start(BytesStart::new("Point")))?;
        // KML wants lon,lat[,alt]
        text_element(
            &mut writer,
            "coordinates",
            &format!("{},{},0", point.longitude, point.latitude),
        )?;
        write(&mut writer, Event::End(BytesEnd::new("Point")))?;
        write(&mut writer, Event::End(BytesEnd::new("Placemark")))?;
    }

    write(&mut writer, Event::End(BytesEnd::new("Document")))?;
    write(&mut writer, Event::End(BytesEnd::new("kml")))?;

    Ok(writer.into_inner().into_inner())
}

fn describe(point: &MapPoint) -> String {
    let mut parts: Vec<String> = [&point.region, &point.province, &point.location]
        .into_iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect();
    if let Some(cause) = &point.root_cause {
        parts.push(cause.clone());
    }
    if let Some(start) = point.start_time {
        parts.push(start.format("%d.%m.%Y %H:%M").to_string());
    }
    parts.join(" / ")
}

fn text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str) -> Result<()> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Internal(format!("KML write failed: {}", e)))
}
