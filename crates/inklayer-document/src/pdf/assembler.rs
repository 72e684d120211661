// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembler: collects single-page fragments, appends them to one
// `lopdf` page tree strictly in source page order, and persists the result.
//
// Fragments may arrive in any order; anything ahead of the next expected index
// waits in a buffer until the gap is filled. The document is serialised once,
// after every page is present, and written via a temporary file in the
// destination directory that is renamed into place.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use inklayer_core::error::{InklayerError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use super::reader::inherited_attribute;
use super::writer::PageFragment;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Totals for a finished document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    pub pages: usize,
    pub text_runs: usize,
    pub skipped_words: usize,
}

/// Orders page fragments into one multi-page document.
pub struct DocumentAssembler {
    document: Document,
    pages_id: ObjectId,
    expected_pages: usize,
    /// Index of the next fragment to append.
    next_index: usize,
    pending: BTreeMap<usize, PageFragment>,
    report: AssemblyReport,
}

impl DocumentAssembler {
    /// Start an empty document that will hold exactly `expected_pages` pages.
    pub fn new(expected_pages: usize) -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => Object::Integer(0),
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        Self {
            document,
            pages_id,
            expected_pages,
            next_index: 0,
            pending: BTreeMap::new(),
            report: AssemblyReport::default(),
        }
    }

    pub fn expected_pages(&self) -> usize {
        self.expected_pages
    }

    /// Pages already appended to the page tree.
    pub fn appended_pages(&self) -> usize {
        self.next_index
    }

    /// Fragments received out of order and still waiting for a predecessor.
    pub fn pending_pages(&self) -> usize {
        self.pending.len()
    }

    pub fn is_complete(&self) -> bool {
        self.next_index == self.expected_pages
    }

    /// Accept one fragment. Appends it, and any buffered successors, as soon
    /// as every earlier page is in place.
    #[instrument(skip(self, fragment), fields(index = fragment.index))]
    pub fn push(&mut self, fragment: PageFragment) -> Result<()> {
        let index = fragment.index;
        if index >= self.expected_pages {
            return Err(InklayerError::PdfError(format!(
                "page fragment {index} is out of range for a {}-page document",
                self.expected_pages
            )));
        }
        if index < self.next_index || self.pending.contains_key(&index) {
            return Err(InklayerError::PdfError(format!(
                "page fragment {index} was already received"
            )));
        }

        self.pending.insert(index, fragment);
        while let Some(next) = self.pending.remove(&self.next_index) {
            self.append(next)?;
            self.next_index += 1;
        }

        debug!(
            appended = self.next_index,
            pending = self.pending.len(),
            "Fragment accepted"
        );
        Ok(())
    }

    fn append(&mut self, fragment: PageFragment) -> Result<()> {
        let source = Document::load_mem(&fragment.bytes).map_err(|err| {
            InklayerError::PdfError(format!(
                "page fragment {} is not a readable PDF: {}",
                fragment.index, err
            ))
        })?;

        let pages = source.get_pages();
        let page_id = match (pages.len(), pages.values().next()) {
            (1, Some(id)) => *id,
            (count, _) => {
                return Err(InklayerError::PdfError(format!(
                    "page fragment {} holds {} pages, expected 1",
                    fragment.index, count
                )));
            }
        };

        clone_page_into(&source, &mut self.document, self.pages_id, page_id)?;
        self.report.pages += 1;
        self.report.text_runs += fragment.text_runs;
        self.report.skipped_words += fragment.skipped_words;
        Ok(())
    }

    /// Serialise the finished document. Fails unless every page is present.
    pub fn into_bytes(mut self) -> Result<(Vec<u8>, AssemblyReport)> {
        if !self.is_complete() {
            return Err(InklayerError::PdfError(format!(
                "document incomplete: {} of {} pages assembled, {} waiting",
                self.next_index,
                self.expected_pages,
                self.pending.len()
            )));
        }

        self.document.compress();
        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            InklayerError::PdfError(format!("failed to serialise document: {}", err))
        })?;

        debug!(output_bytes = output.len(), pages = self.report.pages, "Document serialised");
        Ok((output, self.report))
    }

    /// Serialise and write the document to `path` in one step.
    ///
    /// The bytes go to a temporary file beside `path` first; the destination
    /// only ever holds a complete document.
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn write_to_path(self, path: impl AsRef<Path>) -> Result<AssemblyReport> {
        let path = path.as_ref();
        let (bytes, report) = self.into_bytes()?;

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staging = NamedTempFile::new_in(directory)?;
        staging.write_all(&bytes)?;
        staging.as_file().sync_all()?;
        staging.persist(path).map_err(|err| InklayerError::Io(err.error))?;

        info!(
            pages = report.pages,
            text_runs = report.text_runs,
            bytes = bytes.len(),
            "Wrote searchable PDF to {}",
            path.display()
        );
        Ok(report)
    }
}

/// Copy one page and everything it references from `source` into `target`,
/// appending it as the last kid of `pages_id`.
fn clone_page_into(
    source: &Document,
    target: &mut Document,
    pages_id: ObjectId,
    page_id: ObjectId,
) -> Result<ObjectId> {
    let page = source.get_dictionary(page_id).map_err(|err| {
        InklayerError::PdfError(format!("cannot read page object {:?}: {}", page_id, err))
    })?;

    let mut copied = BTreeMap::new();
    let mut page_dict = clone_dictionary(source, target, page, &mut copied)?;

    // The target tree has no inheritable attributes of its own.
    for key in INHERITABLE {
        if page_dict.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(source, page_id, key) {
            let value = deep_clone_object(source, target, value, &mut copied)?;
            page_dict.set(key.to_vec(), value);
        }
    }
    page_dict.set("Parent", Object::Reference(pages_id));
    let cloned_id = target.add_object(page_dict);

    let pages_dict = target
        .get_object_mut(pages_id)
        .and_then(Object::as_dict_mut)
        .map_err(|err| InklayerError::PdfError(format!("target page tree: {}", err)))?;
    if let Ok(Object::Array(kids)) = pages_dict.get_mut(b"Kids") {
        kids.push(Object::Reference(cloned_id));
    }
    if let Ok(Object::Integer(count)) = pages_dict.get_mut(b"Count") {
        *count += 1;
    }

    Ok(cloned_id)
}

fn clone_dictionary(
    source: &Document,
    target: &mut Document,
    dict: &Dictionary,
    copied: &mut BTreeMap<ObjectId, ObjectId>,
) -> Result<Dictionary> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        // /Parent points back into the source page tree; the caller re-links it.
        if key == b"Parent" {
            continue;
        }
        new_dict.set(key.clone(), deep_clone_object(source, target, value, copied)?);
    }
    Ok(new_dict)
}

/// Deep-copy an object into `target`, following references.
///
/// `copied` maps source ids to target ids, so an object shared by several
/// references (fonts, the scan XObject) is copied once.
fn deep_clone_object(
    source: &Document,
    target: &mut Document,
    object: &Object,
    copied: &mut BTreeMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match object {
        Object::Dictionary(dict) => Ok(Object::Dictionary(clone_dictionary(
            source, target, dict, copied,
        )?)),
        Object::Array(items) => {
            let mut new_items = Vec::with_capacity(items.len());
            for item in items {
                new_items.push(deep_clone_object(source, target, item, copied)?);
            }
            Ok(Object::Array(new_items))
        }
        Object::Reference(ref_id) => {
            if let Some(existing) = copied.get(ref_id) {
                return Ok(Object::Reference(*existing));
            }
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    let new_id = target.new_object_id();
                    copied.insert(*ref_id, new_id);
                    let cloned = deep_clone_object(source, target, referenced, copied)?;
                    target.objects.insert(new_id, cloned);
                    Ok(Object::Reference(new_id))
                }
                Err(err) => {
                    warn!(?ref_id, %err, "Cannot resolve reference, using Null");
                    Ok(Object::Null)
                }
            }
        }
        Object::Stream(stream) => {
            let dict = clone_dictionary(source, target, &stream.dict, copied)?;
            Ok(Object::Stream(lopdf::Stream::new(dict, stream.content.clone())))
        }
        other => Ok(other.clone()),
    }
}
