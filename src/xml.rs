// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

//! Parsers for the panel's XML resources.
//!
//! Every document has the same shape: a fixed root element holding either
//! named leaf fields (`generalInfo`) or a list of repeated children
//! (`zonesStatus/zone`, ...). Parsing is all-or-nothing: a missing element
//! fails the whole document, so callers never see a partial list.
//!
//! Element text is trimmed; an element that is present but empty yields an
//! empty string.
//!
//! Bodies are decoded with the encoding named in the XML declaration (a BOM
//! takes precedence), UTF-8 when there is none.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use roxmltree::{Document, Node};

use crate::devices::{DeviceInfo, OutputStatus, PartitionStatus, ZoneStatus};
use crate::error::{LaresError, Result};

/// The encoding named by `<?xml ... encoding="..."?>`, if any.
fn declared_encoding(body: &[u8]) -> Option<&'static Encoding> {
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    let decl = body.strip_prefix(b"<?xml")?;
    let end = decl.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&decl[..end]).ok()?;
    let (_, value) = decl.split_once("encoding")?;
    let value = value.trim_start().strip_prefix('=')?.trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &value[1..];
    let label = &value[..value.find(quote)?];
    // A declaration readable as ASCII rules out UTF-16
    Encoding::for_label(label.trim().as_bytes()).map(Encoding::output_encoding)
}

/// Decode a response body to text.
fn decode(body: &[u8]) -> Result<Cow<'_, str>> {
    let encoding = declared_encoding(body).unwrap_or(UTF_8);
    let (text, actual, malformed) = encoding.decode(body);
    if malformed {
        return Err(LaresError::unexpected(format!(
            "body is not valid {}",
            actual.name()
        )));
    }
    Ok(text)
}

fn parse_document(text: &str) -> Result<Document<'_>> {
    Ok(Document::parse(text)?)
}

/// Return the root element if it is named `expected`.
fn root<'a, 'i>(doc: &'a Document<'i>, expected: &str) -> Result<Node<'a, 'i>> {
    let root = doc.root_element();
    if root.has_tag_name(expected) {
        Ok(root)
    } else {
        Err(LaresError::unexpected(format!(
            "expected <{expected}> root, found <{}>",
            root.tag_name().name()
        )))
    }
}

/// Element children of `parent` named `name`, in document order.
fn children<'a, 'i>(parent: Node<'a, 'i>, name: &'a str) -> impl Iterator<Item = Node<'a, 'i>> {
    parent
        .children()
        .filter(move |n| n.is_element() && n.has_tag_name(name))
}

fn text_of(node: Node<'_, '_>) -> String {
    node.text().map(str::trim).unwrap_or_default().to_string()
}

/// Text of the first child element named `name`.
fn child_text(parent: Node<'_, '_>, name: &str) -> Result<String> {
    parent
        .children()
        .find(|n| n.is_element() && n.has_tag_name(name))
        .map(text_of)
        .ok_or_else(|| {
            LaresError::unexpected(format!(
                "<{}> has no <{name}> element",
                parent.tag_name().name()
            ))
        })
}

/// Parse `info/generalInfo.xml`.
pub fn parse_general_info(body: &[u8]) -> Result<DeviceInfo> {
    let text = decode(body)?;
    let doc = parse_document(&text)?;
    let info = root(&doc, "generalInfo")?;
    Ok(DeviceInfo {
        name: child_text(info, "productName")?,
        info: child_text(info, "info1")?,
    })
}

/// Parse a description document: `<{root}><{item}>label</{item}>...</{root}>`.
///
/// Used for the zone, output and partition description resources.
pub fn parse_descriptions(body: &[u8], root_name: &str, item: &str) -> Result<Vec<String>> {
    let text = decode(body)?;
    let doc = parse_document(&text)?;
    let list = root(&doc, root_name)?;
    Ok(children(list, item).map(text_of).collect())
}

/// Parse `zones/zonesStatus48IP.xml`.
pub fn parse_zone_statuses(body: &[u8]) -> Result<Vec<ZoneStatus>> {
    let text = decode(body)?;
    let doc = parse_document(&text)?;
    let list = root(&doc, "zonesStatus")?;
    children(list, "zone")
        .map(|zone| {
            Ok(ZoneStatus {
                status: child_text(zone, "status")?,
                bypass: child_text(zone, "bypass")?,
                alarm: child_text(zone, "alarm")?,
            })
        })
        .collect()
}

/// Parse `outputs/outputsStatus48IP.xml`.
pub fn parse_output_statuses(body: &[u8]) -> Result<Vec<OutputStatus>> {
    let text = decode(body)?;
    let doc = parse_document(&text)?;
    let list = root(&doc, "outputsStatus")?;
    children(list, "output")
        .map(|output| {
            Ok(OutputStatus {
                status: child_text(output, "status")?,
                value: child_text(output, "value")?,
                output_type: child_text(output, "type")?,
            })
        })
        .collect()
}

/// Parse the partition status resource: one text element per partition.
pub fn parse_partition_statuses(body: &[u8]) -> Result<Vec<PartitionStatus>> {
    let text = decode(body)?;
    let doc = parse_document(&text)?;
    let list = root(&doc, "partitionsStatus")?;
    Ok(children(list, "partition")
        .map(|p| PartitionStatus::from_raw(&text_of(p)))
        .collect())
}
