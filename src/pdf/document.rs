use crate::error::{ProcessError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A parsed input PDF. Read-only; pages are copied out of it, never moved.
pub struct SourceDocument {
    doc: Document,
    page_ids: Vec<ObjectId>,
    name: String,
}

impl SourceDocument {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        let doc = Document::load_mem(bytes)
            .map_err(|e| ProcessError::Format(format!("{}: {}", name, e)))?;

        // get_pages is keyed by 1-based page number, so values come out in page order
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        debug!(name = %name, pages = page_ids.len(), "PDF loaded");

        Ok(SourceDocument {
            doc,
            page_ids,
            name,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("document.pdf");
        Self::from_bytes(name, &bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File stem used to name derived outputs
    pub fn stem(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_id(&self, index: usize) -> Option<ObjectId> {
        self.page_ids.get(index).copied()
    }
}

/// A freshly built document that owns every object it contains.
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    page_count: usize,
}

impl OutputDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");

        let pages_id = doc.new_object_id();
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(Vec::new()));
        pages.set("Count", Object::Integer(0));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        OutputDocument {
            doc,
            pages_id,
            page_count: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Append copies of the given 0-based pages of `source`, in order.
    pub fn append_pages(&mut self, source: &SourceDocument, indices: &[usize]) -> Result<()> {
        let mut copier = PageCopier::new(&source.doc);

        for &index in indices {
            let page_id = source.page_id(index).ok_or_else(|| {
                ProcessError::Document(format!(
                    "page index {} out of range for {} ({} pages)",
                    index,
                    source.name(),
                    source.page_count()
                ))
            })?;
            let new_id = copier.copy_page(&mut self.doc, page_id, self.pages_id)?;
            self.push_kid(new_id)?;
        }

        Ok(())
    }

    /// Append copies of every page of `source`.
    pub fn append_document(&mut self, source: &SourceDocument) -> Result<()> {
        let all: Vec<usize> = (0..source.page_count()).collect();
        self.append_pages(source, &all)
    }

    fn push_kid(&mut self, page_id: ObjectId) -> Result<()> {
        let pages = self
            .doc
            .get_object_mut(self.pages_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| ProcessError::Document(format!("page tree missing: {}", e)))?;

        pages
            .get_mut(b"Kids")
            .and_then(Object::as_array_mut)
            .map_err(|e| ProcessError::Document(format!("page tree has no /Kids: {}", e)))?
            .push(Object::Reference(page_id));

        self.page_count += 1;
        pages.set("Count", Object::Integer(self.page_count as i64));
        Ok(())
    }

    /// Page object IDs in page order.
    pub(crate) fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| ProcessError::Document(format!("failed to serialise PDF: {}", e)))?;
        debug!(pages = self.page_count, bytes = output.len(), "PDF serialised");
        Ok(output)
    }
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-copies pages from one source document into a target document.
///
/// Every source object is copied at most once per copier, so resources shared
/// between pages stay shared in the target and reference cycles terminate.
struct PageCopier<'a> {
    source: &'a Document,
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'a> PageCopier<'a> {
    fn new(source: &'a Document) -> Self {
        PageCopier {
            source,
            copied: HashMap::new(),
        }
    }

    fn copy_page(
        &mut self,
        target: &mut Document,
        page_id: ObjectId,
        parent_id: ObjectId,
    ) -> Result<ObjectId> {
        let mut page = self
            .source
            .get_dictionary(page_id)
            .map_err(|e| {
                ProcessError::Document(format!("cannot read page object {:?}: {}", page_id, e))
            })?
            .clone();

        for (key, value) in inherited_attributes(self.source, &page) {
            page.set(key, value);
        }
        page.remove(b"Parent");

        let new_id = target.new_object_id();
        self.copied.insert(page_id, new_id);

        let mut copy = self.copy_dictionary(target, &page)?;
        copy.set("Parent", Object::Reference(parent_id));
        target.objects.insert(new_id, Object::Dictionary(copy));

        Ok(new_id)
    }

    fn copy_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Result<Dictionary> {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.copy_object(target, value)?);
        }
        Ok(copy)
    }

    fn copy_object(&mut self, target: &mut Document, object: &Object) -> Result<Object> {
        match object {
            Object::Reference(id) => self.copy_reference(target, *id),
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.copy_dictionary(target, dict)?)),
            Object::Array(items) => {
                let mut copy = Vec::with_capacity(items.len());
                for item in items {
                    copy.push(self.copy_object(target, item)?);
                }
                Ok(Object::Array(copy))
            }
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(target, &stream.dict)?;
                Ok(Object::Stream(copy))
            }
            other => Ok(other.clone()),
        }
    }

    fn copy_reference(&mut self, target: &mut Document, id: ObjectId) -> Result<Object> {
        if let Some(&new_id) = self.copied.get(&id) {
            return Ok(Object::Reference(new_id));
        }

        let source = self.source;
        let referenced = match source.get_object(id) {
            Ok(object) => object,
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using null");
                return Ok(Object::Null);
            }
        };

        // Pages that were not selected (link targets, outline entries) stay behind
        if is_page_tree_node(referenced) {
            return Ok(Object::Null);
        }

        let new_id = target.new_object_id();
        self.copied.insert(id, new_id);
        let copy = self.copy_object(target, referenced)?;
        target.objects.insert(new_id, copy);

        Ok(Object::Reference(new_id))
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => match dict.get(b"Type").and_then(Object::as_name) {
            Ok(name) => name == b"Page" || name == b"Pages",
            Err(_) => false,
        },
        _ => false,
    }
}

/// Collect inheritable attributes the page does not set itself, nearest
/// ancestor first.
fn inherited_attributes(doc: &Document, page: &Dictionary) -> Vec<(&'static [u8], Object)> {
    let mut found: Vec<(&'static [u8], Object)> = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(id) = parent {
        // Guard against malformed trees whose /Parent links loop
        if depth > 64 {
            warn!(?id, "Page tree too deep, ignoring remaining ancestors");
            break;
        }
        let Ok(node) = doc.get_dictionary(id) else {
            break;
        };

        for key in INHERITABLE {
            if page.has(key) || found.iter().any(|(k, _)| *k == key) {
                continue;
            }
            if let Ok(value) = node.get(key) {
                found.push((key, value.clone()));
            }
        }

        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    found
}
