//! Copy-on-write attribute layering for arbitrary mutable records.
//!
//! An [`Overlay`] wraps a base record and exposes the same attribute
//! surface. Reads fall through to the base unless overridden locally;
//! writes always land in the local layer and never touch the base. Stacking
//! layers builds a singly linked chain from newest to oldest, which makes
//! duplicating a large record at a branch point cheap: only a new empty
//! layer is created, the wrapped record is shared.
//!
//! Key invariants:
//! - A layer never observes writes made to a later (child) layer.
//! - A parent layer is immutable from the perspective of its children.
//! - [`Overlay::fixate`] collapses the chain oldest-first onto the root
//!   record; the chain must not be reused afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::OverlayError;
use crate::value::Value;

/// Attribute access surface the overlay requires of a wrapped record.
///
/// This is the seam between the generic engine and domain state: any type
/// that can read and write named attributes can be overlay-wrapped and
/// branched cheaply.
pub trait Attributes {
    /// Reads an attribute by name, or `None` if the record has no such
    /// attribute.
    fn read_attribute(&self, name: &str) -> Option<Value>;

    /// Writes an attribute by name.
    fn write_attribute(&mut self, name: &str, value: Value);
}

/// A dynamic record of named attribute values.
///
/// The canonical computational-unit record for callers that do not bring
/// their own domain struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets an attribute value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Attributes for Record {
    fn read_attribute(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn write_attribute(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug)]
enum OverlayBase<T> {
    Root(Arc<T>),
    Layer(Arc<Overlay<T>>),
}

impl<T> Clone for OverlayBase<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Root(root) => Self::Root(Arc::clone(root)),
            Self::Layer(layer) => Self::Layer(Arc::clone(layer)),
        }
    }
}

/// A copy-on-write layer over a base record.
///
/// # Examples
///
/// ```
/// use silvasim::{Overlay, Record, Value};
///
/// let stand = Record::new().with("area", 2.0).with("site_type", 1i64);
/// let mut layer = Overlay::new(stand);
/// layer.set("area", Value::Float(1.5));
///
/// let branch = layer.new_layer();
/// assert_eq!(branch.get("area").unwrap(), Value::Float(1.5));
/// assert_eq!(branch.get("site_type").unwrap(), Value::Int(1));
/// ```
#[derive(Debug)]
pub struct Overlay<T> {
    overrides: BTreeMap<String, Value>,
    base: OverlayBase<T>,
}

impl<T> Clone for Overlay<T> {
    fn clone(&self) -> Self {
        Self {
            overrides: self.overrides.clone(),
            base: self.base.clone(),
        }
    }
}

impl<T: Attributes> Overlay<T> {
    /// Wraps a record in a fresh overlay with no local overrides.
    #[must_use]
    pub fn new(base: T) -> Self {
        Self {
            overrides: BTreeMap::new(),
            base: OverlayBase::Root(Arc::new(base)),
        }
    }

    /// Reads an attribute, falling through the layer chain to the root.
    ///
    /// # Errors
    ///
    /// Returns `OverlayError::AttributeNotFound` when no layer and not even
    /// the root record knows the attribute. This is a programming error and
    /// is not meant to be caught.
    pub fn get(&self, attribute: &str) -> Result<Value, OverlayError> {
        if let Some(value) = self.overrides.get(attribute) {
            return Ok(value.clone());
        }
        match &self.base {
            OverlayBase::Root(root) => {
                root.read_attribute(attribute)
                    .ok_or_else(|| OverlayError::AttributeNotFound {
                        attribute: attribute.to_string(),
                    })
            }
            OverlayBase::Layer(parent) => parent.get(attribute),
        }
    }

    /// Returns true if the attribute resolves somewhere in the chain.
    #[must_use]
    pub fn has(&self, attribute: &str) -> bool {
        self.get(attribute).is_ok()
    }

    /// Writes an attribute into this layer's local override set.
    ///
    /// The base is never mutated; earlier layers and sibling branches keep
    /// observing their own values.
    pub fn set(&mut self, attribute: impl Into<String>, value: Value) {
        self.overrides.insert(attribute.into(), value);
    }

    /// Creates a fresh layer whose base is the current state of this one.
    ///
    /// Cost is proportional to this layer's local override count, never to
    /// the size of the wrapped record. The frozen state is shared, so any
    /// number of branches can be layered on top of the same parent.
    #[must_use]
    pub fn new_layer(&self) -> Self {
        Self {
            overrides: BTreeMap::new(),
            base: OverlayBase::Layer(Arc::new(self.clone())),
        }
    }

    /// Number of local overrides in this layer.
    #[must_use]
    pub fn local_overrides(&self) -> usize {
        self.overrides.len()
    }

    /// Collapses the layer chain into a concrete record.
    ///
    /// The oldest layer is applied first, so the root record receives every
    /// override in chronological order and the newest write wins. The root
    /// is cloned only when another branch still shares it; a single-layer
    /// overlay with no overrides hands back the wrapped record unchanged.
    #[must_use]
    pub fn fixate(self) -> T
    where
        T: Clone,
    {
        let mut root = match self.base {
            OverlayBase::Root(root) => {
                Arc::try_unwrap(root).unwrap_or_else(|shared| (*shared).clone())
            }
            OverlayBase::Layer(parent) => Arc::try_unwrap(parent)
                .unwrap_or_else(|shared| (*shared).clone())
                .fixate(),
        };
        for (attribute, value) in self.overrides {
            root.write_attribute(&attribute, value);
        }
        root
    }
}

/// A collection of independently overlay-wrapped child records.
///
/// Composite units (a stand holding its tree records, say) keep their
/// children in a `LayeredList` so that duplicating the composite at a
/// branch point re-layers each child instead of deep-copying it.
pub struct LayeredList<T> {
    items: Vec<Overlay<T>>,
}

impl<T> Clone for LayeredList<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T> Default for LayeredList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Attributes> LayeredList<T> {
    /// Wraps each record in its own overlay.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter().map(Overlay::new).collect(),
        }
    }

    /// Number of child records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no child records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the child overlays.
    pub fn iter(&self) -> std::slice::Iter<'_, Overlay<T>> {
        self.items.iter()
    }

    /// Iterates mutably over the child overlays.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Overlay<T>> {
        self.items.iter_mut()
    }

    /// Child overlay at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Overlay<T>> {
        self.items.get(index)
    }

    /// Mutable child overlay at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Overlay<T>> {
        self.items.get_mut(index)
    }

    /// Appends a child overlay.
    pub fn push(&mut self, item: Overlay<T>) {
        self.items.push(item);
    }

    /// Re-layers every child, one new layer per child record.
    #[must_use]
    pub fn new_layer(&self) -> Self {
        Self {
            items: self.items.iter().map(Overlay::new_layer).collect(),
        }
    }

    /// Collapses every child chain into concrete records.
    #[must_use]
    pub fn fixate(self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.into_iter().map(Overlay::fixate).collect()
    }
}

impl<T> FromIterator<Overlay<T>> for LayeredList<T> {
    fn from_iter<I: IntoIterator<Item = Overlay<T>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
