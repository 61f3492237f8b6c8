use crate::boxes::{BoxBody, BoxTree, BoxView, FourCC};
use crate::fields::{Entry, Field};
use crate::known_boxes::KnownBox;
use crate::parser::{ParseOptions, Parser};
use anyhow::Context;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

/// A JSON-serializable representation of a single box.
///
/// This is designed for JSON output in tools like `isodump`.
#[derive(Debug, Serialize)]
pub struct JsonBox {
    /// Absolute byte offset of this box
    pub offset: u64,
    /// Total size of this box including header and payload
    pub size: u64,
    pub header_size: u64,
    pub payload_size: u64,

    /// Four-character box type code (e.g., "ftyp", "moov")
    pub typ: String,
    /// UUID for `uuid` boxes, as 32 hex digits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Human-readable box type name (e.g., "Movie Header Box")
    pub full_name: String,
    /// "opaque", "container", "decoded" or "custom"
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<JsonBox>,
}

fn kind_of(view: &BoxView<'_>) -> &'static str {
    match view.body() {
        BoxBody::Opaque => "opaque",
        BoxBody::Container => "container",
        BoxBody::Custom(_) => "custom",
        _ => "decoded",
    }
}

/// Walks one box's introspection sequence into a [`JsonBox`].
pub fn build_json(view: BoxView<'_>) -> JsonBox {
    let hdr = view.header();
    let mut fields = Vec::new();
    let mut children = Vec::new();
    for entry in view.entries() {
        match entry {
            Entry::Field(f) => fields.push(f),
            Entry::Box(child) => children.push(build_json(child)),
        }
    }

    JsonBox {
        offset: hdr.start,
        size: hdr.size,
        header_size: hdr.header_size,
        payload_size: hdr.payload_size(),
        typ: hdr.typ.to_string(),
        uuid: hdr.uuid.map(hex::encode),
        full_name: KnownBox::from(hdr.typ).full_name().to_string(),
        kind: kind_of(&view),
        fields,
        children,
    }
}

pub fn json_tree(tree: &BoxTree) -> Vec<JsonBox> {
    tree.roots().map(build_json).collect()
}

/// Indented text rendering of the tree, down to `max_depth`.
pub fn render_text(tree: &BoxTree, max_depth: usize) -> String {
    let mut out = String::new();
    for root in tree.roots() {
        render_box(&mut out, root, 0, max_depth);
    }
    out
}

fn render_box(out: &mut String, view: BoxView<'_>, depth: usize, max_depth: usize) {
    let indent = "  ".repeat(depth);
    let hdr = view.header();
    let typ = match hdr.uuid {
        Some(u) => format!("uuid:{}", hex::encode(u)),
        None => hdr.typ.to_string(),
    };
    let _ = writeln!(
        out,
        "{indent}{:>8} {:>10} {} ({})",
        format!("{:#x}", hdr.start),
        hdr.size,
        typ,
        KnownBox::from(hdr.typ).full_name()
    );

    for entry in view.entries() {
        match entry {
            Entry::Field(f) => {
                let _ = match &f.formatted {
                    Some(s) => writeln!(out, "{indent}    {}: {} ({})", f.label, f.raw, s),
                    None => writeln!(out, "{indent}    {}: {}", f.label, f.raw),
                };
            }
            Entry::Box(child) if depth < max_depth => render_box(out, child, depth + 1, max_depth),
            Entry::Box(_) => {}
        }
    }
}

/// A parsed file together with the bytes its tree refers to.
#[derive(Debug)]
pub struct Analysis {
    pub data: Vec<u8>,
    pub tree: BoxTree,
}

/// Reads and parses a whole file.
pub fn analyze_file(path: impl AsRef<Path>, options: ParseOptions) -> anyhow::Result<Analysis> {
    let path = path.as_ref();
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let tree = Parser::new()
        .with_options(options)
        .parse(&data)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(Analysis { data, tree })
}

/// Payload bytes of every box tagged `tag`, in file order.
pub fn payloads<'t, 'd>(
    tree: &'t BoxTree,
    data: &'d [u8],
    tag: FourCC,
) -> Vec<(BoxView<'t>, &'d [u8])> {
    tree.find_all(tag)
        .filter_map(|b| {
            let hdr = b.header();
            let start = usize::try_from(hdr.start + hdr.header_size).ok()?;
            let end = usize::try_from(hdr.end()).ok()?;
            data.get(start..end).map(|p| (b, p))
        })
        .collect()
}
