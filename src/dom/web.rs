use wasm_bindgen::JsCast;

use crate::dom::{Document, ScriptElement};
use crate::tracker::error::{environment_error, MatomoResult};

/// Browser document accessed through `web-sys`.
#[derive(Clone, Debug)]
pub struct WebDocument {
    document: web_sys::Document,
}

impl WebDocument {
    pub fn new(document: web_sys::Document) -> Self {
        Self { document }
    }

    /// Document of the current window, if any.
    pub fn current() -> Option<Self> {
        web_sys::window()
            .and_then(|window| window.document())
            .map(Self::new)
    }

    fn create_script(&self, script: &ScriptElement) -> MatomoResult<web_sys::HtmlScriptElement> {
        let element = self
            .document
            .create_element("script")
            .map_err(|err| environment_error(format!("Failed to create script: {err:?}")))?
            .dyn_into::<web_sys::HtmlScriptElement>()
            .map_err(|_| environment_error("Script element has wrong type"))?;

        for (name, value) in &script.attributes {
            element
                .set_attribute(name, value)
                .map_err(|err| environment_error(format!("Failed to set `{name}`: {err:?}")))?;
        }
        if let Some(script_type) = &script.script_type {
            element.set_type(script_type);
        }
        if let Some(nonce) = &script.nonce {
            element
                .set_attribute("nonce", nonce)
                .map_err(|err| environment_error(format!("Failed to set nonce: {err:?}")))?;
        }
        element.set_async(script.async_load);
        element.set_defer(script.defer);
        element.set_src(&script.src);
        Ok(element)
    }
}

impl Document for WebDocument {
    type Node = web_sys::Node;

    fn first_script(&self) -> Option<web_sys::Node> {
        self.document
            .get_elements_by_tag_name("script")
            .item(0)
            .map(Into::into)
    }

    fn parent_node(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
        node.parent_node()
    }

    fn insert_before(
        &self,
        parent: &web_sys::Node,
        script: &ScriptElement,
        reference: &web_sys::Node,
    ) -> MatomoResult<()> {
        let element = self.create_script(script)?;
        parent
            .insert_before(&element, Some(reference))
            .map_err(|err| environment_error(format!("Failed to insert script: {err:?}")))?;
        Ok(())
    }

    fn title(&self) -> Option<String> {
        Some(self.document.title())
    }

    fn base_href(&self) -> Option<String> {
        self.document
            .query_selector("base")
            .ok()
            .flatten()
            .and_then(|base| base.get_attribute("href"))
    }
}
