//! PDF Merge
//!
//! Concatenates the pages of several documents in input order.

use crate::document::{load_document, save_document};
use crate::error::PdfToolError;
use lopdf::{Document, Object, ObjectId};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guards against cyclic `Parent` chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// Merge multiple PDFs into one
///
/// 1. Load every input; the first one that fails aborts the merge
/// 2. Copy inherited attributes onto each page so it renders the same under a new parent
/// 3. Import the objects of each later input with offset IDs
/// 4. Point the first document's page tree root at every page, in order
pub fn merge_documents(inputs: &[Vec<u8>]) -> Result<Vec<u8>, PdfToolError> {
    if inputs.is_empty() {
        return Err(PdfToolError::OperationError("No documents to merge".into()));
    }

    let mut loaded = Vec::with_capacity(inputs.len());
    for (index, bytes) in inputs.iter().enumerate() {
        let doc = load_document(bytes).map_err(|e| PdfToolError::MergeFailure {
            index,
            reason: e.to_string(),
        })?;
        loaded.push(doc);
    }

    let mut sources = loaded.into_iter();
    let Some(mut dest) = sources.next() else {
        return Err(PdfToolError::OperationError("No documents to merge".into()));
    };

    materialize_inherited_attributes(&mut dest);
    let mut page_refs: Vec<ObjectId> = dest.get_pages().into_values().collect();
    let mut dest_max_id = highest_object_id(&dest);

    for mut source in sources {
        materialize_inherited_attributes(&mut source);
        let id_offset = dest_max_id;
        let source_max_id = highest_object_id(&source);

        page_refs.extend(
            source
                .get_pages()
                .into_values()
                .map(|(num, gen)| (num + id_offset, gen)),
        );

        for ((num, gen), mut object) in source.objects {
            remap_object_refs(&mut object, id_offset);
            dest.objects.insert((num + id_offset, gen), object);
        }

        dest_max_id += source_max_id;
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, &page_refs)?;

    // Drops the imported catalogs and intermediate page tree nodes
    dest.prune_objects();
    dest.compress();

    tracing::debug!(
        inputs = inputs.len(),
        pages = page_refs.len(),
        "merged documents"
    );

    save_document(&mut dest)
}

fn highest_object_id(doc: &Document) -> u32 {
    doc.objects
        .keys()
        .map(|&(num, _)| num)
        .max()
        .unwrap_or(0)
        .max(doc.max_id)
}

/// Shift every indirect reference inside `obj` by `offset`
fn remap_object_refs(obj: &mut Object, offset: u32) {
    match obj {
        Object::Reference(id) => id.0 += offset,
        Object::Array(items) => {
            for item in items.iter_mut() {
                remap_object_refs(item, offset);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                remap_object_refs(value, offset);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                remap_object_refs(value, offset);
            }
        }
        _ => {}
    }
}

fn materialize_inherited_attributes(doc: &mut Document) {
    for page_id in doc.get_pages().into_values() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };

        let inherited: Vec<(&[u8], Object)> = INHERITABLE_ATTRIBUTES
            .iter()
            .filter(|key| !page.has(key))
            .filter_map(|&key| inherited_value(doc, page_id, key).map(|value| (key, value)))
            .collect();

        if inherited.is_empty() {
            continue;
        }
        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            for (key, value) in inherited {
                page.set(key.to_vec(), value);
            }
        }
    }
}

fn inherited_value(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut parent = parent_of(doc, page_id);

    for _ in 0..MAX_TREE_DEPTH {
        let node_id = parent?;
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = parent_of(doc, node_id);
    }

    None
}

fn parent_of(doc: &Document, id: ObjectId) -> Option<ObjectId> {
    doc.get_dictionary(id)
        .ok()?
        .get(b"Parent")
        .and_then(Object::as_reference)
        .ok()
}

/// Make the root page tree node the direct parent of every page in `page_refs`
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<(), PdfToolError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfToolError::OperationError("No Root in trailer".into()))?;

    let pages_id = doc
        .get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PdfToolError::OperationError("No Pages in catalog".into()))?;

    let pages_dict = doc
        .get_dictionary_mut(pages_id)
        .map_err(|_| PdfToolError::OperationError("Invalid pages dictionary".into()))?;
    pages_dict.set(
        "Kids",
        Object::Array(page_refs.iter().map(|&id| Object::Reference(id)).collect()),
    );
    pages_dict.set("Count", Object::Integer(page_refs.len() as i64));

    for &page_id in page_refs {
        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}
