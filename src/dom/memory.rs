use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::dom::{Document, ScriptElement};
use crate::tracker::error::{environment_error, MatomoResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
struct NodeData {
    tag: String,
    attributes: BTreeMap<String, String>,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Debug)]
struct Tree {
    nodes: Vec<NodeData>,
    title: Option<String>,
    base_href: Option<String>,
}

/// Arena backed document for non-browser targets.
///
/// `new()` builds `<html><head></head><body></body></html>`; scripts and other elements can be
/// appended to shape the document a test or a server renderer needs.
#[derive(Debug)]
pub struct InMemoryDocument {
    tree: Mutex<Tree>,
}

const ROOT: usize = 0;
const HEAD: usize = 1;
const BODY: usize = 2;

impl InMemoryDocument {
    pub fn new() -> Self {
        let element = |tag: &str, parent: Option<usize>, children: Vec<usize>| NodeData {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            parent,
            children,
        };
        let nodes = vec![
            element("html", None, vec![HEAD, BODY]),
            element("head", Some(ROOT), Vec::new()),
            element("body", Some(ROOT), Vec::new()),
        ];
        Self {
            tree: Mutex::new(Tree {
                nodes,
                title: None,
                base_href: None,
            }),
        }
    }

    pub fn head(&self) -> NodeId {
        NodeId(HEAD)
    }

    pub fn body(&self) -> NodeId {
        NodeId(BODY)
    }

    pub fn append_element(
        &self,
        parent: NodeId,
        tag: &str,
        attributes: BTreeMap<String, String>,
    ) -> NodeId {
        let mut tree = self.tree.lock().unwrap();
        let id = tree.nodes.len();
        tree.nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            attributes,
            parent: Some(parent.0),
            children: Vec::new(),
        });
        tree.nodes[parent.0].children.push(id);
        NodeId(id)
    }

    pub fn append_script(&self, parent: NodeId, src: &str) -> NodeId {
        let attributes = BTreeMap::from([("src".to_string(), src.to_string())]);
        self.append_element(parent, "script", attributes)
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.tree.lock().unwrap().title = Some(title.into());
    }

    pub fn set_base_href(&self, href: impl Into<String>) {
        self.tree.lock().unwrap().base_href = Some(href.into());
    }

    /// Attributes of every `<script>` element, in document order.
    pub fn scripts(&self) -> Vec<BTreeMap<String, String>> {
        let tree = self.tree.lock().unwrap();
        document_order(&tree)
            .into_iter()
            .filter(|id| tree.nodes[*id].tag == "script")
            .map(|id| tree.nodes[id].attributes.clone())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.tree.lock().unwrap().nodes.len()
    }
}

impl Default for InMemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn document_order(tree: &Tree) -> Vec<usize> {
    let mut order = Vec::with_capacity(tree.nodes.len());
    let mut stack = vec![ROOT];
    while let Some(id) = stack.pop() {
        order.push(id);
        stack.extend(tree.nodes[id].children.iter().rev());
    }
    order
}

impl Document for InMemoryDocument {
    type Node = NodeId;

    fn first_script(&self) -> Option<NodeId> {
        let tree = self.tree.lock().unwrap();
        document_order(&tree)
            .into_iter()
            .find(|id| tree.nodes[*id].tag == "script")
            .map(NodeId)
    }

    fn parent_node(&self, node: &NodeId) -> Option<NodeId> {
        let tree = self.tree.lock().unwrap();
        tree.nodes.get(node.0)?.parent.map(NodeId)
    }

    fn insert_before(
        &self,
        parent: &NodeId,
        script: &ScriptElement,
        reference: &NodeId,
    ) -> MatomoResult<()> {
        let mut tree = self.tree.lock().unwrap();
        let position = tree
            .nodes
            .get(parent.0)
            .and_then(|node| node.children.iter().position(|child| child == &reference.0))
            .ok_or_else(|| environment_error("reference node is not a child of the parent node"))?;

        let id = tree.nodes.len();
        tree.nodes.push(NodeData {
            tag: "script".to_string(),
            attributes: script.html_attributes(),
            parent: Some(parent.0),
            children: Vec::new(),
        });
        tree.nodes[parent.0].children.insert(position, id);
        Ok(())
    }

    fn title(&self) -> Option<String> {
        self.tree.lock().unwrap().title.clone()
    }

    fn base_href(&self) -> Option<String> {
        self.tree.lock().unwrap().base_href.clone()
    }
}
