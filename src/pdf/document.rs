//! Parsed PDF document with a page lookup table
//!
//! Widgets refer to their page through `/P` or by appearing in a page's
//! `/Annots` array. Both are resolved through tables built once at load so
//! that no lookup scans the page tree.

use crate::error::{Error, Result};
use crate::pdf::geometry::PageSize;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

/// Fallback when a page has no resolvable `/MediaBox` (US Letter)
const DEFAULT_PAGE_SIZE: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

/// Maximum `/Parent` hops when resolving inherited page attributes
const MAX_INHERITANCE_DEPTH: usize = 32;

/// An in-memory PDF document owned by a single request
pub struct FormDocument {
    inner: Document,
    pages: PageIndex,
}

/// Page arena: ids in page order plus reverse lookups
#[derive(Debug, Default)]
struct PageIndex {
    ids: Vec<ObjectId>,
    sizes: Vec<PageSize>,
    by_id: HashMap<ObjectId, usize>,
    annots: HashMap<ObjectId, usize>,
}

impl FormDocument {
    /// Parse PDF bytes and build the page lookup table
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::Parse {
                reason: "Not a valid PDF file".to_string(),
            });
        }

        let inner = Document::load_mem(data).map_err(|e| Error::Parse {
            reason: e.to_string(),
        })?;

        Ok(Self::from_document(inner))
    }

    /// Wrap an already parsed document
    pub fn from_document(inner: Document) -> Self {
        let pages = PageIndex::build(&inner);
        Self { inner, pages }
    }

    /// Serialize the document back to bytes
    pub fn save(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.inner.save_to(&mut buf)?;
        Ok(buf)
    }

    /// Number of pages
    pub fn page_count(&self) -> usize {
        self.pages.ids.len()
    }

    /// Size of the page at a 0-based index
    pub fn page_size(&self, index: usize) -> Option<PageSize> {
        self.pages.sizes.get(index).copied()
    }

    /// Borrow the underlying object graph
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    pub(crate) fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    pub(crate) fn page_id(&self, index: usize) -> Option<ObjectId> {
        self.pages.ids.get(index).copied()
    }

    /// Resolve the page a widget annotation sits on.
    ///
    /// `/P` wins when it names a known page; otherwise the `/Annots` table is
    /// consulted.
    pub(crate) fn page_of_widget(&self, widget_id: ObjectId, widget: &Dictionary) -> Option<usize> {
        if let Ok(Object::Reference(page_id)) = widget.get(b"P") {
            if let Some(&index) = self.pages.by_id.get(page_id) {
                return Some(index);
            }
        }
        self.pages.annots.get(&widget_id).copied()
    }

    /// Follow a single indirect reference
    pub(crate) fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.inner.get_object(*id).ok(),
            other => Some(other),
        }
    }

    pub(crate) fn dict(&self, id: ObjectId) -> Option<&Dictionary> {
        self.inner.get_object(id).ok()?.as_dict().ok()
    }

    fn catalog_id(&self) -> Result<ObjectId> {
        match self.inner.trailer.get(b"Root") {
            Ok(Object::Reference(id)) => Ok(*id),
            _ => Err(Error::Parse {
                reason: "Document has no catalog".to_string(),
            }),
        }
    }

    /// The `/AcroForm` dictionary, if the document has one
    pub(crate) fn acroform(&self) -> Option<&Dictionary> {
        let catalog = self.dict(self.catalog_id().ok()?)?;
        self.resolve(catalog.get(b"AcroForm").ok()?)?.as_dict().ok()
    }

    /// Top-level field references in `/AcroForm /Fields` order
    pub(crate) fn root_fields(&self) -> Vec<ObjectId> {
        let Some(acroform) = self.acroform() else {
            return Vec::new();
        };
        let Some(fields) = acroform
            .get(b"Fields")
            .ok()
            .and_then(|f| self.resolve(f))
            .and_then(|f| f.as_array().ok())
        else {
            return Vec::new();
        };

        fields
            .iter()
            .filter_map(|f| match f {
                Object::Reference(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Make sure the catalog holds `/AcroForm` as an indirect object with a
    /// `/Fields` array and default resources, returning its id.
    pub(crate) fn ensure_acroform(&mut self) -> Result<ObjectId> {
        let catalog_id = self.catalog_id()?;
        let existing = self
            .inner
            .get_dictionary(catalog_id)?
            .get(b"AcroForm")
            .ok()
            .cloned();

        let acroform_id = match existing {
            Some(Object::Reference(id)) => id,
            Some(Object::Dictionary(inline)) => {
                let id = self.inner.add_object(inline);
                self.inner
                    .get_dictionary_mut(catalog_id)?
                    .set("AcroForm", id);
                id
            }
            _ => {
                let id = self.inner.add_object(dictionary! {
                    "Fields" => Vec::<Object>::new(),
                });
                self.inner
                    .get_dictionary_mut(catalog_id)?
                    .set("AcroForm", id);
                id
            }
        };

        let acroform = self.inner.get_dictionary_mut(acroform_id)?;
        if !acroform.has(b"Fields") {
            acroform.set("Fields", Vec::<Object>::new());
        }
        if !acroform.has(b"DA") {
            acroform.set("DA", Object::string_literal("/Helv 0 Tf 0 g"));
        }
        if !acroform.has(b"DR") {
            acroform.set(
                "DR",
                dictionary! {
                    "Font" => dictionary! {
                        "Helv" => dictionary! {
                            "Type" => "Font",
                            "Subtype" => "Type1",
                            "BaseFont" => "Helvetica",
                            "Encoding" => "WinAnsiEncoding",
                        },
                    },
                },
            );
        }

        Ok(acroform_id)
    }

    /// Ask viewers to regenerate widget appearances from field values
    pub(crate) fn set_need_appearances(&mut self) -> Result<()> {
        let acroform_id = self.ensure_acroform()?;
        self.inner
            .get_dictionary_mut(acroform_id)?
            .set("NeedAppearances", true);
        Ok(())
    }

    /// Mutable `/Fields` array of the AcroForm, following an indirect array
    pub(crate) fn root_fields_mut(&mut self) -> Result<&mut Vec<Object>> {
        let acroform_id = self.ensure_acroform()?;
        let fields_ref = match self.inner.get_dictionary(acroform_id)?.get(b"Fields") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
        match fields_ref {
            Some(id) => Ok(self.inner.get_object_mut(id)?.as_array_mut()?),
            None => Ok(self
                .inner
                .get_dictionary_mut(acroform_id)?
                .get_mut(b"Fields")?
                .as_array_mut()?),
        }
    }

    /// Mutable `/Annots` array of a page, creating it when absent
    pub(crate) fn page_annots_mut(&mut self, page_index: usize) -> Result<&mut Vec<Object>> {
        let page_id = self.page_id(page_index).ok_or_else(|| Error::Parse {
            reason: format!("Page {} does not exist", page_index + 1),
        })?;

        let (annots_ref, has_inline) = {
            let page = self.inner.get_dictionary(page_id)?;
            match page.get(b"Annots") {
                Ok(Object::Reference(id)) => (Some(*id), false),
                Ok(Object::Array(_)) => (None, true),
                _ => (None, false),
            }
        };
        if annots_ref.is_none() && !has_inline {
            self.inner
                .get_dictionary_mut(page_id)?
                .set("Annots", Vec::<Object>::new());
        }

        match annots_ref {
            Some(id) => Ok(self.inner.get_object_mut(id)?.as_array_mut()?),
            None => Ok(self
                .inner
                .get_dictionary_mut(page_id)?
                .get_mut(b"Annots")?
                .as_array_mut()?),
        }
    }

    pub(crate) fn register_annotation(&mut self, annot_id: ObjectId, page_index: usize) {
        self.pages.annots.insert(annot_id, page_index);
    }

    pub(crate) fn forget_annotation(&mut self, annot_id: ObjectId) {
        self.pages.annots.remove(&annot_id);
    }
}

impl PageIndex {
    fn build(doc: &Document) -> Self {
        let mut index = PageIndex::default();

        // get_pages() is keyed by 1-based page number, already in order
        for (position, (_, page_id)) in doc.get_pages().into_iter().enumerate() {
            index.ids.push(page_id);
            index.by_id.insert(page_id, position);
            index
                .sizes
                .push(media_box_size(doc, page_id).unwrap_or(DEFAULT_PAGE_SIZE));

            let annots = doc
                .get_dictionary(page_id)
                .ok()
                .and_then(|page| page.get(b"Annots").ok())
                .and_then(|a| match a {
                    Object::Reference(id) => doc.get_object(*id).ok(),
                    other => Some(other),
                })
                .and_then(|a| a.as_array().ok());

            for annot in annots.into_iter().flatten() {
                if let Object::Reference(annot_id) = annot {
                    index.annots.entry(*annot_id).or_insert(position);
                }
            }
        }

        index
    }
}

/// Read `/MediaBox`, inheriting through `/Parent`
fn media_box_size(doc: &Document, page_id: ObjectId) -> Option<PageSize> {
    let mut current = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(media_box) = current.get(b"MediaBox") {
            let media_box = match media_box {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            let values: Vec<f64> = media_box
                .as_array()
                .ok()?
                .iter()
                .filter_map(number)
                .collect();
            if values.len() != 4 {
                return None;
            }
            return Some(PageSize {
                width: (values[2] - values[0]).abs(),
                height: (values[3] - values[1]).abs(),
            });
        }

        current = match current.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => doc.get_dictionary(*parent_id).ok()?,
            _ => return None,
        };
    }

    None
}

/// Numeric value of an Integer or Real object
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}
