use std::sync::Arc;

use crate::dom::ScriptElement;

/// Builds the `<script>` element used to load Matomo. Replace it to control attributes such as
/// `nonce`, `async` or `defer`.
pub type ScriptFactory<D> = Arc<dyn Fn(&str, &D) -> ScriptElement + Send + Sync>;

/// `type="text/javascript"`, loaded `async` and `defer`.
pub fn create_default_script_element<D>(url: &str, _document: &D) -> ScriptElement {
    ScriptElement::new(url)
        .with_type("text/javascript")
        .with_async(true)
        .with_defer(true)
}

pub fn default_script_factory<D: 'static>() -> ScriptFactory<D> {
    Arc::new(|url: &str, document: &D| create_default_script_element(url, document))
}
