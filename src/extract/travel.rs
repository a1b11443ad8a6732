// src/extract/travel.rs

use anyhow::{anyhow, Context, Result};
use quick_xml::{events::Event, Reader};
use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::model::RawFiling;

const TRAVEL_TAG: &[u8] = b"Travel";

fn resolve_entity(name: &str) -> String {
    match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or(name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()
            } else {
                name.strip_prefix('#').and_then(|dec| dec.parse().ok())
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| format!("&{};", name))
        }
    }
}

/// Parse one filings XML document. Every `<Travel>` element becomes a flat
/// map of its direct children (tag → trimmed text); empty children are left
/// out. Text of deeper descendants is folded into the enclosing child.
pub fn parse_travel_xml(xml: &[u8], year: &str) -> Result<Vec<RawFiling>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = Vec::new();

    let mut record: Option<RawFiling> = None;
    let mut field: Option<(String, String)> = None;
    // element depth below the open <Travel>
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if record.is_some() {
                    depth += 1;
                    if depth == 1 {
                        let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                        field = Some((tag, String::new()));
                    }
                } else if e.local_name().as_ref() == TRAVEL_TAG {
                    record = Some(RawFiling::new(year));
                    depth = 0;
                }
            }
            Ok(Event::End(_)) => {
                if let Some(rec) = record.as_mut() {
                    if depth == 0 {
                        out.extend(record.take());
                    } else {
                        if depth == 1 {
                            if let Some((tag, text)) = field.take() {
                                let text = text.trim();
                                if !text.is_empty() {
                                    rec.fields.insert(tag, text.to_string());
                                }
                            }
                        }
                        depth -= 1;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, text)) = field.as_mut() {
                    let s = e
                        .decode()
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    text.push_str(&s);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, text)) = field.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some((_, text)) = field.as_mut() {
                    text.push_str(&resolve_entity(&String::from_utf8_lossy(&e)));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow!(
                    "malformed XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

/// Extract filings from every `.xml` member of a yearly archive. A member
/// that fails to parse is logged and skipped.
pub fn read_travel_archive<R: Read + Seek>(reader: R, year: &str) -> Result<Vec<RawFiling>> {
    let mut archive = ZipArchive::new(reader).context("opening zip archive")?;
    let mut out = Vec::new();

    for i in 0..archive.len() {
        let mut file = match archive.by_index(i) {
            Ok(f) => f,
            Err(e) => {
                warn!(year, index = i, error = %e, "unreadable zip entry");
                continue;
            }
        };
        let name = file.name().to_string();
        if file.is_dir() || !name.to_ascii_lowercase().ends_with(".xml") {
            debug!(year, file = %name, "skipping non-xml entry");
            continue;
        }

        let mut bytes = Vec::with_capacity(file.size() as usize);
        if let Err(e) = file.read_to_end(&mut bytes) {
            warn!(year, file = %name, error = %e, "failed reading zip entry");
            continue;
        }

        match parse_travel_xml(&bytes, year) {
            Ok(filings) => {
                info!(year, file = %name, records = filings.len(), "parsed filings xml");
                out.extend(filings);
            }
            Err(e) => {
                let head = String::from_utf8_lossy(&bytes[..bytes.len().min(200)]).into_owned();
                warn!(year, file = %name, error = %format!("{:#}", e), head = %head, "skipping malformed xml");
            }
        }
    }

    Ok(out)
}

/// [`read_travel_archive`] on a file on disk.
pub fn read_travel_zip(path: &Path, year: &str) -> Result<Vec<RawFiling>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_travel_archive(BufReader::new(file), year)
        .with_context(|| format!("reading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<GiftTravelFilings>
  <Travel>
    <DocID>500012345</DocID>
    <FilerName>Pat Aide</FilerName>
    <MemberName>Doe, Jane</MemberName>
    <State>TX</State>
    <District>10</District>
    <Year>2024</Year>
    <Destination>Austin, TX</Destination>
    <DepartureDate>3/14/2024</DepartureDate>
    <ReturnDate>3/16/2024</ReturnDate>
    <TravelSponsor>Smith &amp; Wesson Foundation</TravelSponsor>
    <FilingType></FilingType>
  </Travel>
  <Travel>
    <DocID>500012346</DocID>
    <FilerName>Lee Clerk</FilerName>
    <MemberName><![CDATA[Roe, Sam]]></MemberName>
    <Destination>Tokyo</Destination>
  </Travel>
</GiftTravelFilings>"#;

    #[test]
    fn one_map_per_travel_element() {
        let filings = parse_travel_xml(SAMPLE.as_bytes(), "2025").unwrap();
        assert_eq!(filings.len(), 2);

        let first = &filings[0];
        assert_eq!(first.year, "2025");
        assert_eq!(first.get("DocID").as_deref(), Some("500012345"));
        assert_eq!(first.get("Year").as_deref(), Some("2024"));
        assert_eq!(
            first.get("TravelSponsor").as_deref(),
            Some("Smith & Wesson Foundation")
        );
        assert!(!first.fields.contains_key("FilingType"));

        let second = &filings[1];
        assert_eq!(second.get("MemberName").as_deref(), Some("Roe, Sam"));
        assert_eq!(second.get("State"), None);
    }

    #[test]
    fn ignores_elements_outside_travel() {
        let xml = b"<Root><Header><DocID>x</DocID></Header><Travel><DocID>1</DocID></Travel></Root>";
        let filings = parse_travel_xml(xml, "2024").unwrap();
        assert_eq!(filings.len(), 1);
        assert_eq!(filings[0].get("DocID").as_deref(), Some("1"));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = b"<Root><Travel><DocID>1</Travel></Root>";
        assert!(parse_travel_xml(xml, "2024").is_err());
    }

    #[test]
    fn entity_references_inside_text() {
        let xml = b"<R><Travel><FilerName>Jos&#233; &lt;Pepe&gt; Ni&#xF1;o</FilerName></Travel></R>";
        let filings = parse_travel_xml(xml, "2024").unwrap();
        assert_eq!(filings[0].get("FilerName").as_deref(), Some("Jos\u{e9} <Pepe> Ni\u{f1}o"));
    }

    #[test]
    fn numeric_entities_resolve() {
        assert_eq!(resolve_entity("#233"), "é");
        assert_eq!(resolve_entity("#x41"), "A");
        assert_eq!(resolve_entity("nbsp"), "&nbsp;");
    }

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut w = zip::ZipWriter::new(&mut cursor);
            for (name, body) in entries {
                w.start_file(*name, SimpleFileOptions::default()).unwrap();
                w.write_all(body.as_bytes()).unwrap();
            }
            w.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn reads_xml_members_and_skips_the_rest() {
        let bytes = zip_with(&[
            ("2025Travel.xml", SAMPLE),
            ("2025Travel.txt", "DocID\tFilerName\n"),
            ("broken.xml", "<Root><Travel><DocID>1</Travel>"),
        ]);
        let filings = read_travel_archive(Cursor::new(bytes), "2025").unwrap();
        assert_eq!(filings.len(), 2);
    }

    #[test]
    fn not_a_zip_is_an_error() {
        assert!(read_travel_archive(Cursor::new(b"<html>".to_vec()), "2025").is_err());
    }
}
