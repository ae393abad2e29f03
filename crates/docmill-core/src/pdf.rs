//! Raw PDF object access built on lopdf.
//!
//! Page text comes from mupdf (the `docmill-pdf-mupdf` crate); this module
//! covers what that path does not expose: embedded image streams and the
//! `/Info` document dictionary. The Azure adapter also uses it to attach
//! images and metadata to analysis results.

use lopdf::{Dictionary, Document, Object, ObjectId};
use once_cell::sync::Lazy;

use crate::extractor::ExtractError;
use crate::{DocumentInfo, ImageFormat};

/// An image stream pulled out of a page's XObject resources.
#[derive(Debug, Clone)]
pub struct PdfImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    /// 1-based page number the image appeared on.
    pub page: usize,
    pub width: u32,
    pub height: u32,
}

/// A parsed PDF held in memory.
pub struct PdfFile {
    doc: Document,
    byte_len: usize,
}

impl PdfFile {
    pub fn load(bytes: &[u8]) -> Result<Self, ExtractError> {
        let doc = Document::load_mem(bytes).map_err(|e| ExtractError::Open(e.to_string()))?;
        Ok(Self {
            doc,
            byte_len: bytes.len(),
        })
    }

    /// Size of the original file in bytes.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// All image XObjects in the document, in page order.
    ///
    /// Streams that fail to resolve or decompress are skipped rather than
    /// failing the whole document.
    pub fn images(&self) -> Vec<PdfImage> {
        let mut images = Vec::new();
        for (page_number, page_id) in self.doc.get_pages() {
            let resources = page_resources(&self.doc, page_id);
            let Ok(xobjects) = resources.get(b"XObject") else {
                continue;
            };
            let Ok(xobjects) = resolve_ref(&self.doc, xobjects).as_dict() else {
                continue;
            };
            for (name, entry) in xobjects.iter() {
                match image_from_xobject(&self.doc, entry, page_number as usize) {
                    Ok(Some(image)) => images.push(image),
                    // Not an image XObject (e.g. a form)
                    Ok(None) => {}
                    Err(reason) => {
                        tracing::debug!(
                            page = page_number,
                            name = %String::from_utf8_lossy(name),
                            %reason,
                            "skipping unreadable image xobject"
                        );
                    }
                }
            }
        }
        images
    }

    /// Document metadata from the trailer's `/Info` dictionary, plus the
    /// page count. Absent or malformed entries are simply left unset.
    pub fn info(&self) -> DocumentInfo {
        let mut info = DocumentInfo {
            page_count: Some(self.page_count()),
            ..DocumentInfo::default()
        };
        let Some(dict) = info_dict(&self.doc) else {
            return info;
        };
        info.title = string_from_dict(&self.doc, dict, b"Title");
        info.author = string_from_dict(&self.doc, dict, b"Author");
        info.subject = string_from_dict(&self.doc, dict, b"Subject");
        info.keywords = string_from_dict(&self.doc, dict, b"Keywords");
        info.creation_date = string_from_dict(&self.doc, dict, b"CreationDate");
        info.mod_date = string_from_dict(&self.doc, dict, b"ModDate");
        info
    }
}

/// Read one XObject entry as an image. `Ok(None)` means the entry is a
/// non-image XObject and should be ignored.
fn image_from_xobject(
    doc: &Document,
    entry: &Object,
    page: usize,
) -> Result<Option<PdfImage>, String> {
    let stream = resolve_ref(doc, entry)
        .as_stream()
        .map_err(|e| e.to_string())?;

    let subtype = stream
        .dict
        .get(b"Subtype")
        .ok()
        .and_then(|o| o.as_name_str().ok())
        .unwrap_or("");
    if subtype != "Image" {
        return Ok(None);
    }

    let width = stream
        .dict
        .get(b"Width")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0) as u32;
    let height = stream
        .dict
        .get(b"Height")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0) as u32;

    // /Filter can be a single name or an array of names
    let filters: Vec<String> = stream
        .dict
        .get(b"Filter")
        .ok()
        .and_then(|o| {
            if let Ok(name) = o.as_name_str() {
                Some(vec![name.to_string()])
            } else if let Ok(arr) = o.as_array() {
                Some(
                    arr.iter()
                        .filter_map(|item| {
                            resolve_ref(doc, item)
                                .as_name_str()
                                .ok()
                                .map(|s| s.to_string())
                        })
                        .collect(),
                )
            } else {
                None
            }
        })
        .unwrap_or_default();

    // The last filter in the chain decides the stored format: DCTDecode
    // streams are complete JPEG files, anything else is raw sample data.
    let format = if filters.last().map(String::as_str) == Some("DCTDecode") {
        ImageFormat::Jpeg
    } else {
        ImageFormat::Raw
    };

    let data = match format {
        // A lone DCTDecode filter means the stream content IS the JPEG
        ImageFormat::Jpeg if filters.len() == 1 => stream.content.clone(),
        _ if filters.is_empty() => stream.content.clone(),
        _ => stream.decompressed_content().map_err(|e| e.to_string())?,
    };

    Ok(Some(PdfImage {
        data,
        format,
        page,
        width,
        height,
    }))
}

/// Resolve an indirect reference, returning the object as-is when it is
/// not a reference or cannot be resolved.
fn resolve_ref<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Look up a key on a page dictionary, walking up the page tree via
/// `/Parent` when the page itself does not carry it.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current_id = page_id;
    loop {
        let dict = doc.get_object(current_id).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
}

/// The page's `/Resources` dictionary, handling inheritance. Pages with no
/// resources anywhere in the tree get an empty dictionary.
fn page_resources(doc: &Document, page_id: ObjectId) -> &Dictionary {
    static EMPTY_DICT: Lazy<Dictionary> = Lazy::new(Dictionary::new);
    inherited(doc, page_id, b"Resources")
        .map(|obj| resolve_ref(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .unwrap_or(&EMPTY_DICT)
}

fn info_dict(doc: &Document) -> Option<&Dictionary> {
    let obj = doc.trailer.get(b"Info").ok()?;
    resolve_ref(doc, obj).as_dict().ok()
}

/// Extract a string value from a dictionary, handling both String and Name
/// objects. PDF text strings with a UTF-16BE BOM (0xFE 0xFF) are decoded as
/// UTF-16; everything else is tried as UTF-8 and falls back to Latin-1.
fn string_from_dict(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let obj = dict.get(key).ok()?;
    match resolve_ref(doc, obj) {
        Object::String(bytes, _) => {
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let chars: Vec<u16> = bytes[2..]
                    .chunks(2)
                    .filter_map(|c| {
                        if c.len() == 2 {
                            Some(u16::from_be_bytes([c[0], c[1]]))
                        } else {
                            None
                        }
                    })
                    .collect();
                String::from_utf16(&chars).ok()
            } else {
                match std::str::from_utf8(bytes) {
                    Ok(s) => Some(s.to_string()),
                    Err(_) => Some(bytes.iter().map(|&b| b as char).collect()),
                }
            }
        }
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}
