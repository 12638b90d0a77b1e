use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, instrument};

use crate::sheaf::tools::error::{MergeError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

const OUTPUT_VERSION: &str = "1.5";

/// Collects the pages of several PDF documents, in the order they are
/// appended, and serialises them as one document.
///
/// Object ids of every appended document are shifted past the ids already
/// held so documents never collide. Page tree roots and catalogs of the inputs
/// are discarded; [`PdfAccumulator::finish`] builds fresh ones.
#[derive(Debug, Default)]
pub struct PdfAccumulator {
    max_id: u32,
    pages: Vec<ObjectId>,
    objects: BTreeMap<ObjectId, Object>,
    documents: usize,
    compress: bool,
}

impl PdfAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compress content streams when serialising.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn document_count(&self) -> usize {
        self.documents
    }

    /// Reads `bytes` as a PDF and appends its pages in their internal order.
    ///
    /// Returns the number of pages appended. On failure the accumulator is left
    /// untouched, so a caller may skip the input and continue.
    #[instrument(level = "debug", skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub fn append(&mut self, name: &str, bytes: &[u8]) -> Result<usize> {
        let mut document = Document::load_mem(bytes).map_err(|source| MergeError::DocumentRead {
            name: name.to_string(),
            source,
        })?;

        document.renumber_objects_with(self.max_id + 1);

        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        let mut pages = Vec::with_capacity(page_ids.len());
        for page_id in &page_ids {
            let page = flatten_inherited(&document, *page_id).map_err(|source| {
                MergeError::DocumentRead {
                    name: name.to_string(),
                    source,
                }
            })?;
            pages.push((*page_id, page));
        }

        self.max_id = self.max_id.max(document.max_id);
        self.objects.extend(document.objects);
        for (page_id, page) in pages {
            self.objects.insert(page_id, Object::Dictionary(page));
            self.pages.push(page_id);
        }
        self.documents += 1;

        debug!(pages = page_ids.len(), total_pages = self.pages.len(), "document appended");
        Ok(page_ids.len())
    }

    /// Serialises every appended page into one PDF.
    ///
    /// Fails before writing anything when no page has been appended.
    #[instrument(level = "debug", skip(self), fields(pages = self.pages.len(), documents = self.documents))]
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            return Err(MergeError::Serialization(
                "no pages to write: the document set is empty".to_string(),
            ));
        }

        let mut document = Document::with_version(OUTPUT_VERSION);
        document.objects = self
            .objects
            .into_iter()
            .filter(|(_, object)| !is_tree_root(object))
            .collect();
        document.max_id = self.max_id;

        let pages_id = document.new_object_id();
        for page_id in &self.pages {
            if let Ok(Object::Dictionary(page)) = document.get_object_mut(*page_id) {
                page.set("Parent", pages_id);
            }
        }

        let kids: Vec<Object> = self.pages.iter().copied().map(Object::Reference).collect();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(self.pages.len() as i64),
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        document.prune_objects();
        document.renumber_objects();
        if self.compress {
            document.compress();
        }

        let mut output = Vec::new();
        document
            .save_to(&mut output)
            .map_err(|err| MergeError::Serialization(format!("failed to write merged PDF: {err}")))?;

        debug!(bytes_len = output.len(), "merged document serialized");
        Ok(output)
    }
}

/// Copies the page dictionary and fills in attributes it inherits from its
/// ancestors, so the page keeps rendering the same once re-parented.
fn flatten_inherited(document: &Document, page_id: ObjectId) -> lopdf::Result<Dictionary> {
    let mut page = document.get_dictionary(page_id)?.clone();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut visited = 0;

    while let Some(parent_id) = parent {
        // Guards against cyclic /Parent chains in damaged files.
        visited += 1;
        if visited > 64 {
            break;
        }
        let Ok(node) = document.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE_KEYS {
            if !page.has(key)
                && let Ok(value) = node.get(key)
            {
                page.set(key.to_vec(), value.clone());
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}

fn is_tree_root(object: &Object) -> bool {
    let Ok(dictionary) = object.as_dict() else {
        return false;
    };
    matches!(
        dictionary.get(b"Type").and_then(Object::as_name),
        Ok(b"Catalog") | Ok(b"Pages")
    )
}
