//! Minimal document capability used for script injection and page metadata.
//!
//! The initializer never touches the DOM directly; it goes through [`Document`], which is
//! implemented by [`InMemoryDocument`] (server rendering, tests) and, with the `wasm-web`
//! feature on `wasm32`, by [`WebDocument`].

use std::collections::BTreeMap;

use crate::tracker::error::MatomoResult;

mod memory;
#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
mod web;

pub use memory::{InMemoryDocument, NodeId};
#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
pub use web::WebDocument;

pub trait Document {
    type Node: Clone;

    /// First `<script>` element in document order.
    fn first_script(&self) -> Option<Self::Node>;

    fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Materializes `script` and inserts it into `parent` right before `reference`.
    fn insert_before(
        &self,
        parent: &Self::Node,
        script: &ScriptElement,
        reference: &Self::Node,
    ) -> MatomoResult<()>;

    /// Current document title, read at call time.
    fn title(&self) -> Option<String>;

    /// Value of `<base href>`, if any.
    fn base_href(&self) -> Option<String>;
}

/// Description of a `<script>` element to be created by a [`Document`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptElement {
    pub src: String,
    pub script_type: Option<String>,
    pub async_load: bool,
    pub defer: bool,
    pub nonce: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl ScriptElement {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, script_type: impl Into<String>) -> Self {
        self.script_type = Some(script_type.into());
        self
    }

    pub fn with_async(mut self, value: bool) -> Self {
        self.async_load = value;
        self
    }

    pub fn with_defer(mut self, value: bool) -> Self {
        self.defer = value;
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Flattened HTML attributes, in the form a DOM element would carry them.
    pub fn html_attributes(&self) -> BTreeMap<String, String> {
        let mut attributes = self.attributes.clone();
        attributes.insert("src".to_string(), self.src.clone());
        if let Some(script_type) = &self.script_type {
            attributes.insert("type".to_string(), script_type.clone());
        }
        if self.async_load {
            attributes.insert("async".to_string(), String::new());
        }
        if self.defer {
            attributes.insert("defer".to_string(), String::new());
        }
        if let Some(nonce) = &self.nonce {
            attributes.insert("nonce".to_string(), nonce.clone());
        }
        attributes
    }
}
