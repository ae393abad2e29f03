//! Markdown rendering of extracted documents.
//!
//! A pure function of the extracted content plus the storage key prefix:
//! the same inputs always produce the same artifact.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{ExtractedDocument, ImageContent, ImageFormat, Table};

/// The rendered markdown plus the object keys its image references point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownArtifact {
    pub content: String,
    /// Placeholder (`image_1`, `image_2`, ...) to full object key, embedded
    /// images only. Remote images are linked by URL and never uploaded.
    pub image_references: BTreeMap<String, String>,
}

/// Object key for the n-th embedded image under a document's prefix.
pub fn image_key(prefix: &str, n: usize, format: ImageFormat) -> String {
    format!("{prefix}/{}", image_rel_path(n, format))
}

/// Path of the n-th embedded image relative to the markdown document.
fn image_rel_path(n: usize, format: ImageFormat) -> String {
    format!("images/image_{n}.{}", format.extension())
}

/// Embedded images in document order, numbered from 1. The numbering here
/// is what `to_markdown` uses for placeholders, so uploads keyed off this
/// iterator always match the artifact's references.
pub fn embedded_images(
    doc: &ExtractedDocument,
) -> impl Iterator<Item = (usize, &[u8], ImageFormat)> {
    doc.images
        .iter()
        .filter_map(|image| match &image.content {
            ImageContent::Embedded { data, format } => Some((data.as_slice(), *format)),
            ImageContent::Remote { .. } => None,
        })
        .enumerate()
        .map(|(i, (data, format))| (i + 1, data, format))
}

/// Render an extracted document as a markdown artifact.
///
/// Layout: optional title heading, text blocks, tables, images, then a
/// key-value table when the extraction produced one. Sections are joined
/// by blank lines and the result gets a final cleanup pass.
pub fn to_markdown(doc: &ExtractedDocument, prefix: &str) -> MarkdownArtifact {
    let mut sections: Vec<String> = Vec::new();

    if let Some(title) = doc.info.title.as_deref() {
        let title = title.trim();
        if !title.is_empty() {
            sections.push(format!("# {title}"));
        }
    }

    for block in &doc.text {
        let block = block.trim();
        if !block.is_empty() {
            sections.push(block.to_string());
        }
    }

    for table in &doc.tables {
        let gfm = table_to_gfm(table);
        if !gfm.is_empty() {
            sections.push(gfm);
        }
    }

    let mut image_references = BTreeMap::new();
    let mut image_lines: Vec<String> = Vec::new();
    let mut n = 0usize;
    for image in &doc.images {
        match &image.content {
            ImageContent::Embedded { format, .. } => {
                n += 1;
                image_lines.push(format!("![image {n}]({})", image_rel_path(n, *format)));
                image_references.insert(format!("image_{n}"), image_key(prefix, n, *format));
            }
            ImageContent::Remote { url, alt } => {
                let alt = alt.trim();
                let alt = if alt.is_empty() { "image" } else { alt };
                image_lines.push(format!("![{alt}]({url})"));
            }
        }
    }
    if !image_lines.is_empty() {
        sections.push(image_lines.join("\n\n"));
    }

    if !doc.key_values.is_empty() {
        sections.push(format!(
            "## Key values\n\n{}",
            key_values_to_gfm(&doc.key_values)
        ));
    }

    let content = finalize(&sections.join("\n\n"));
    MarkdownArtifact {
        content,
        image_references,
    }
}

/// Render a table as GitHub Flavored Markdown, first row as the header.
fn table_to_gfm(table: &Table) -> String {
    if table.is_empty() {
        return String::new();
    }

    let mut lines = Vec::new();
    for (i, row) in table.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|cell| gfm_cell(cell)).collect();
        lines.push(format!("| {} |", cells.join(" | ")));

        // Separator after the first row (header)
        if i == 0 {
            let sep: Vec<&str> = cells.iter().map(|_| "---").collect();
            lines.push(format!("| {} |", sep.join(" | ")));
        }
    }
    lines.join("\n")
}

fn key_values_to_gfm(key_values: &BTreeMap<String, String>) -> String {
    let mut lines = vec!["| Key | Value |".to_string(), "| --- | --- |".to_string()];
    for (key, value) in key_values {
        lines.push(format!("| {} | {} |", gfm_cell(key), gfm_cell(value)));
    }
    lines.join("\n")
}

/// Make a string safe inside a GFM table cell.
fn gfm_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

/// Final cleanup: LF line endings, runs of blank lines collapsed to at
/// most two, exactly one trailing newline.
fn finalize(input: &str) -> String {
    let s = input.replace("\r\n", "\n").replace('\r', "\n");
    let s = RE_BLANK_LINES.replace_all(&s, "\n\n\n");
    let trimmed = s.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{trimmed}\n")
    }
}
