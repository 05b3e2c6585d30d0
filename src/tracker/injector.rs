use std::sync::Arc;

use crate::dom::Document;
use crate::tracker::error::{environment_error, MatomoResult};
use crate::tracker::script::ScriptFactory;
use crate::tracker::LOGGER;

/// Inserts the Matomo script right before the first script of the document.
pub struct ScriptInjector<D: Document> {
    document: Arc<D>,
    factory: ScriptFactory<D>,
}

impl<D: Document> ScriptInjector<D> {
    pub fn new(document: Arc<D>, factory: ScriptFactory<D>) -> Self {
        Self { document, factory }
    }

    pub fn document(&self) -> &Arc<D> {
        &self.document
    }

    /// Fails without touching the document when no anchor script, or no parent for it, exists.
    pub fn inject(&self, script_url: &str) -> MatomoResult<()> {
        let anchor = self.locate_anchor()?;
        self.insert_at(&anchor, script_url)
    }

    /// Resolves the insertion point so callers can fail before issuing any other side effect.
    pub(crate) fn locate_anchor(&self) -> MatomoResult<InsertionPoint<D::Node>> {
        let anchor = self
            .document
            .first_script()
            .ok_or_else(|| environment_error("no existing script found"))?;
        let parent = self
            .document
            .parent_node(&anchor)
            .ok_or_else(|| environment_error("no script's parent node found"))?;
        Ok(InsertionPoint { parent, anchor })
    }

    pub(crate) fn insert_at(
        &self,
        point: &InsertionPoint<D::Node>,
        script_url: &str,
    ) -> MatomoResult<()> {
        let script = (self.factory)(script_url, self.document.as_ref());
        LOGGER.debug(format!("injecting Matomo script {script_url}"));
        self.document
            .insert_before(&point.parent, &script, &point.anchor)
    }
}

pub(crate) struct InsertionPoint<N> {
    parent: N,
    anchor: N,
}
