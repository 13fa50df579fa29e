//! XML parsers for build-service responses
//!
//! All responses are flat single-level documents; the parsers collect
//! attributes of the root element's direct children only, in document
//! order. Malformed XML or a non-numeric mtime is a parse error, which
//! callers treat as fatal.

use super::ObsError;
use crate::Timestamp;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// `name` attributes of the root's `<entry>` children, in document order.
///
/// Used for `/source/{project}` package listings.
pub fn entry_names(xml: &str) -> Result<Vec<String>, ObsError> {
    collect_child_attrs(xml, b"entry", b"name")
}

/// `name` attributes of the root's `<project>` children, in document order.
///
/// Used for `/search/project/id` collections.
pub fn project_names(xml: &str) -> Result<Vec<String>, ObsError> {
    collect_child_attrs(xml, b"project", b"name")
}

/// `mtime` attributes of the root's `<entry>` children as Unix timestamps,
/// in document order.
///
/// Used for `/source/{project}/{package}` file listings. Every entry must
/// carry an mtime.
pub fn entry_mtimes(xml: &str) -> Result<Vec<Timestamp>, ObsError> {
    collect_child_attrs(xml, b"entry", b"mtime")?
        .into_iter()
        .map(|raw| {
            raw.parse::<Timestamp>()
                .map_err(|_| ObsError::Parse(format!("invalid mtime attribute: {:?}", raw)))
        })
        .collect()
}

fn collect_child_attrs(xml: &str, element: &[u8], attr: &[u8]) -> Result<Vec<String>, ObsError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut values = Vec::new();
    // Depth 1 is "direct child of the root element"; nested occurrences of
    // the same element name are ignored.
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) => {
                if depth == 1 && e.name().as_ref() == element {
                    values.push(require_attr(e, attr)?);
                }
            }
            Ok(Event::Start(ref e)) => {
                if depth == 1 && e.name().as_ref() == element {
                    values.push(require_attr(e, attr)?);
                }
                depth += 1;
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ObsError::Parse(format!("invalid XML response: {}", e)));
            }
            _ => {}
        }
    }

    Ok(values)
}

fn require_attr(e: &BytesStart, name: &[u8]) -> Result<String, ObsError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ObsError::Parse(format!("invalid attribute: {}", e)))?;
        if attr.key.as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| ObsError::Parse(format!("invalid attribute value: {}", e)))?;
            return Ok(value.to_string());
        }
    }
    Err(ObsError::Parse(format!(
        "element is missing the {} attribute",
        String::from_utf8_lossy(name)
    )))
}
