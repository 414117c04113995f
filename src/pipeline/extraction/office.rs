//! DOCX and XLSX: ZIP containers of XML parts.

use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::Regex;
use zip::result::ZipError;
use zip::ZipArchive;

use super::html::decode_numeric_entities;
use super::types::FormatExtractor;
use super::ExtractionError;

/// Inflated size cap for a single XML part.
const MAX_XML_PART_BYTES: u64 = 64 * 1024 * 1024;

/// Last column Excel can address (XFD).
const MAX_COLUMN_INDEX: usize = 16_383;

static SHARED_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<si\b[^>]*>(.*?)</si>").unwrap());

static TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<t\b[^>]*>(.*?)</t>").unwrap());

static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<row\b[^>]*?(?:/>|>(.*?)</row>)").unwrap());

static CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<c\b([^>]*?)(?:/>|>(.*?)</c>)").unwrap());

static CELL_TYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\bt="([^"]*)""#).unwrap());

static CELL_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\br="([A-Z]+)[0-9]+""#).unwrap());

static VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<v>(.*?)</v>").unwrap());

static SHEET_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^xl/worksheets/sheet([0-9]+)\.xml$").unwrap());

/// Word documents: body, headers and footers.
pub struct DocxExtractor;

impl FormatExtractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut archive = open_archive(bytes)?;

        let body = read_entry(&mut archive, "word/document.xml")?.ok_or_else(|| {
            ExtractionError::CorruptDocument("DOCX missing word/document.xml".into())
        })?;

        let mut extra_parts: Vec<String> = archive
            .file_names()
            .filter(|name| {
                (name.starts_with("word/header") || name.starts_with("word/footer"))
                    && name.ends_with(".xml")
            })
            .map(str::to_string)
            .collect();
        extra_parts.sort();

        let mut chunks = vec![word_xml_to_text(&body)];
        for name in extra_parts {
            if let Some(xml) = read_entry(&mut archive, &name)? {
                chunks.push(word_xml_to_text(&xml));
            }
        }

        Ok(chunks
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// Excel workbooks: every sheet, one tab-separated line per row.
pub struct XlsxExtractor;

impl FormatExtractor for XlsxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut archive = open_archive(bytes)?;

        let shared = match read_entry(&mut archive, "xl/sharedStrings.xml")? {
            Some(xml) => parse_shared_strings(&xml),
            None => Vec::new(),
        };

        let mut sheets: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| {
                let caps = SHEET_PART.captures(name)?;
                let number = caps[1].parse::<u32>().ok()?;
                Some((number, name.to_string()))
            })
            .collect();
        sheets.sort();

        if sheets.is_empty() {
            return Err(ExtractionError::CorruptDocument(
                "XLSX contains no worksheets".into(),
            ));
        }

        let mut chunks = Vec::with_capacity(sheets.len());
        for (number, name) in sheets {
            let Some(xml) = read_entry(&mut archive, &name)? else {
                continue;
            };
            let rows = sheet_rows(&xml, &shared)?;
            if rows.is_empty() {
                continue;
            }
            chunks.push(format!("# Sheet {number}\n{}", rows.join("\n")));
        }

        Ok(chunks.join("\n\n"))
    }
}

fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, ExtractionError> {
    if !bytes.starts_with(b"PK") {
        return Err(ExtractionError::CorruptDocument(
            "File is not an Office (ZIP) container".into(),
        ));
    }
    ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::CorruptDocument(format!("Failed to open ZIP archive: {e}")))
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, ExtractionError> {
    read_entry_capped(archive, name, MAX_XML_PART_BYTES)
}

fn read_entry_capped(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    limit: u64,
) -> Result<Option<String>, ExtractionError> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(ExtractionError::CorruptDocument(format!(
                "Failed to open entry {name}: {e}"
            )))
        }
    };
    let too_large = || {
        ExtractionError::CorruptDocument(format!(
            "XML entry {name} inflates beyond {limit} bytes"
        ))
    };
    if entry.size() > limit {
        return Err(too_large());
    }

    // The declared size can lie; the read itself is bounded too
    let mut raw = Vec::new();
    entry.take(limit + 1).read_to_end(&mut raw).map_err(|e| {
        ExtractionError::CorruptDocument(format!("Failed to read XML entry {name}: {e}"))
    })?;
    if raw.len() as u64 > limit {
        return Err(too_large());
    }

    String::from_utf8(raw).map(Some).map_err(|_| {
        ExtractionError::CorruptDocument(format!("XML entry {name} is not valid UTF-8"))
    })
}

fn word_xml_to_text(xml: &str) -> String {
    let with_breaks = xml
        .replace("</w:p>", "\n")
        .replace("</w:tr>", "\n")
        .replace("</w:tc>", "\t")
        .replace("<w:tab/>", "\t")
        .replace("<w:br/>", "\n");

    let decoded = decode_xml_entities(&strip_tags(&with_breaks));
    decoded
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_shared_strings(xml: &str) -> Vec<String> {
    SHARED_STRING
        .captures_iter(xml)
        .map(|si| {
            let runs: String = TEXT_RUN
                .captures_iter(&si[1])
                .map(|t| t[1].to_string())
                .collect();
            decode_xml_entities(&runs)
        })
        .collect()
}

fn sheet_rows(xml: &str, shared: &[String]) -> Result<Vec<String>, ExtractionError> {
    let mut rows = Vec::new();
    for row in ROW.captures_iter(xml) {
        let Some(body) = row.get(1) else {
            continue;
        };
        let mut cells: Vec<String> = Vec::new();
        for cell in CELL.captures_iter(body.as_str()) {
            let attrs = cell.get(1).map_or("", |m| m.as_str());
            let inner = cell.get(2).map_or("", |m| m.as_str());

            if let Some(reference) = CELL_REF.captures(attrs) {
                let col = column_index(&reference[1]).ok_or_else(|| {
                    ExtractionError::CorruptDocument(format!(
                        "Cell reference {} is beyond the last column",
                        &reference[1]
                    ))
                })?;
                if cells.len() < col {
                    cells.resize(col, String::new());
                }
            }
            cells.push(cell_text(attrs, inner, shared));
        }
        while cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
        if !cells.is_empty() {
            rows.push(cells.join("\t"));
        }
    }
    Ok(rows)
}

fn cell_text(attrs: &str, inner: &str, shared: &[String]) -> String {
    let cell_type = CELL_TYPE.captures(attrs).map(|c| c[1].to_string());
    let value = VALUE.captures(inner).map(|v| v[1].to_string());

    match cell_type.as_deref() {
        Some("s") => value
            .and_then(|v| v.trim().parse::<usize>().ok())
            .and_then(|idx| shared.get(idx).cloned())
            .unwrap_or_default(),
        Some("inlineStr") => {
            let runs: String = TEXT_RUN
                .captures_iter(inner)
                .map(|t| t[1].to_string())
                .collect();
            decode_xml_entities(&runs)
        }
        _ => value.map(|v| decode_xml_entities(&v)).unwrap_or_default(),
    }
}

/// "A" → 0, "Z" → 25, "AA" → 26. `None` past column XFD.
fn column_index(letters: &str) -> Option<usize> {
    let mut acc = 0usize;
    for b in letters.bytes() {
        acc = acc.checked_mul(26)?.checked_add((b - b'A' + 1) as usize)?;
        if acc > MAX_COLUMN_INDEX + 1 {
            return None;
        }
    }
    acc.checked_sub(1)
}

fn strip_tags(xml: &str) -> String {
    let mut result = String::with_capacity(xml.len());
    let mut in_tag = false;
    for ch in xml.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result
}

fn decode_xml_entities(text: &str) -> String {
    decode_numeric_entities(text)
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
