use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::trace;

use crate::identity::Identity;
use crate::mount::Capabilities;
use crate::mount::DocumentMount;
use crate::mount::Node;
use crate::mount::NodeId;
use crate::mount::Query;
use crate::mount::Region;

/// Snapshot of an in-memory document,
///
#[derive(Debug, Default, Clone)]
pub struct Document {
    /// Every node created by the mount, attached or not,
    ///
    nodes: BTreeMap<NodeId, Node>,
    /// Attached head nodes in document order,
    ///
    head: Vec<NodeId>,
    /// Attached body nodes in document order,
    ///
    body: Vec<NodeId>,
    /// Documents an import link resolves to, by href,
    ///
    imports: BTreeMap<String, String>,
    /// Environment capabilities,
    ///
    capabilities: Capabilities,
    /// Last assigned node id,
    ///
    last_id: u64,
    /// Incremented on every successful mutation,
    ///
    revision: u64,
}

impl Document {
    /// Returns the number of mutations applied so far,
    ///
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns attached nodes in document order, head first,
    ///
    pub fn attached(&self) -> impl Iterator<Item = (Region, NodeId, &Node)> + '_ {
        let head = self.head.iter().map(|id| (Region::Head, *id));
        let body = self.body.iter().map(|id| (Region::Body, *id));

        head.chain(body)
            .filter_map(move |(region, id)| self.nodes.get(&id).map(|n| (region, id, n)))
    }

    /// Renders the attached nodes, one per line,
    ///
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (region, _, node) in self.attached() {
            let region = match region {
                Region::Head => "head",
                Region::Body => "body",
            };
            out.push_str(&format!("{region}: {node}\n"));
        }
        out
    }

    fn region_mut(&mut self, region: Region) -> &mut Vec<NodeId> {
        match region {
            Region::Head => &mut self.head,
            Region::Body => &mut self.body,
        }
    }

    /// Returns the region and position of an attached node,
    ///
    fn position(&self, id: NodeId) -> Option<(Region, usize)> {
        self.head
            .iter()
            .position(|n| *n == id)
            .map(|p| (Region::Head, p))
            .or_else(|| {
                self.body
                    .iter()
                    .position(|n| *n == id)
                    .map(|p| (Region::Body, p))
            })
    }

    fn insert_node(&mut self, node: Node) -> NodeId {
        self.last_id += 1;
        let id = NodeId(self.last_id);
        self.nodes.insert(id, node);
        id
    }

    fn node_mut(&mut self, id: NodeId) -> anyhow::Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| anyhow!("Node does not exist {:?}", id))
    }
}

/// In-memory document mount,
///
/// Clones share the same document. Every successful mutation is published through a
/// watch channel, so hosts and tests can observe the document as it changes.
///
#[derive(Clone)]
pub struct MemoryMount {
    inner: Arc<tokio::sync::watch::Sender<Document>>,
}

impl MemoryMount {
    /// Creates an empty document w/ no capabilities,
    ///
    pub fn new() -> Self {
        let (tx, _) = tokio::sync::watch::channel(Document::default());

        Self {
            inner: Arc::new(tx),
        }
    }

    /// Adds an empty content container to the body,
    ///
    pub fn with_container(self, id: impl Into<String>) -> Self {
        let container = Node::content(Identity::new(id), "");
        self.inner.send_modify(|doc| {
            let id = doc.insert_node(container);
            doc.body.push(id);
        });
        self
    }

    /// Sets the environment capabilities,
    ///
    pub fn with_capabilities(self, capabilities: Capabilities) -> Self {
        self.inner
            .send_modify(|doc| doc.capabilities = capabilities);
        self
    }

    /// Sets the document an import of href resolves to,
    ///
    pub fn with_import(self, href: impl Into<String>, markup: impl Into<String>) -> Self {
        let (href, markup) = (href.into(), markup.into());
        self.inner.send_modify(|doc| {
            doc.imports.insert(href, markup);
        });
        self
    }

    /// Returns a receiver that observes every change to the document,
    ///
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Document> {
        self.inner.subscribe()
    }

    /// Returns a copy of the current document,
    ///
    pub fn snapshot(&self) -> Document {
        self.inner.borrow().clone()
    }

    /// Returns a copy of a node,
    ///
    pub fn get(&self, id: NodeId) -> Option<Node> {
        self.inner.borrow().nodes.get(&id).cloned()
    }

    /// Returns the number of attached nodes matching query,
    ///
    pub fn count(&self, query: &Query) -> usize {
        self.inner
            .borrow()
            .attached()
            .filter(|(_, _, n)| n.matches(query))
            .count()
    }

    /// Returns the current revision,
    ///
    pub fn revision(&self) -> u64 {
        self.inner.borrow().revision
    }

    /// Applies a fallible mutation, only successful mutations are published,
    ///
    fn modify<R>(&self, f: impl FnOnce(&mut Document) -> anyhow::Result<R>) -> anyhow::Result<R> {
        let mut result = None;
        self.inner.send_if_modified(|doc| match f(doc) {
            Ok(r) => {
                doc.revision += 1;
                result = Some(Ok(r));
                true
            }
            Err(err) => {
                result = Some(Err(err));
                false
            }
        });

        result.unwrap_or_else(|| Err(anyhow!("Mutation was not applied")))
    }
}

impl Default for MemoryMount {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentMount for MemoryMount {
    fn capabilities(&self) -> Capabilities {
        self.inner.borrow().capabilities
    }

    fn create(&self, node: Node) -> anyhow::Result<NodeId> {
        self.modify(|doc| Ok(doc.insert_node(node)))
    }

    fn attach(&self, region: Region, id: NodeId) -> anyhow::Result<()> {
        self.modify(|doc| {
            if !doc.nodes.contains_key(&id) {
                Err(anyhow!("Node does not exist {:?}", id))?;
            }

            if doc.position(id).is_some() {
                Err(anyhow!("Node is already attached {:?}", id))?;
            }

            trace!("Attaching {:?} to {:?}", id, region);
            doc.region_mut(region).push(id);
            Ok(())
        })
    }

    fn find(&self, query: &Query) -> Option<NodeId> {
        self.inner
            .borrow()
            .attached()
            .find(|(_, _, n)| n.matches(query))
            .map(|(_, id, _)| id)
    }

    fn remove(&self, id: NodeId) -> anyhow::Result<()> {
        self.modify(|doc| {
            if let Some((region, position)) = doc.position(id) {
                doc.region_mut(region).remove(position);
            }

            doc.nodes
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| anyhow!("Node does not exist {:?}", id))
        })
    }

    fn replace(&self, old: NodeId, new: NodeId) -> anyhow::Result<()> {
        self.modify(|doc| {
            if !doc.nodes.contains_key(&new) {
                Err(anyhow!("Node does not exist {:?}", new))?;
            }

            if doc.position(new).is_some() {
                Err(anyhow!("Replacement is already attached {:?}", new))?;
            }

            let (region, position) = doc
                .position(old)
                .ok_or_else(|| anyhow!("Node is not attached {:?}", old))?;

            doc.region_mut(region)[position] = new;
            doc.nodes.remove(&old);
            Ok(())
        })
    }

    fn clone_shallow(&self, id: NodeId) -> anyhow::Result<Node> {
        self.inner
            .borrow()
            .nodes
            .get(&id)
            .map(Node::shallow)
            .ok_or_else(|| anyhow!("Node does not exist {:?}", id))
    }

    fn set_identity(&self, id: NodeId, identity: Identity) -> anyhow::Result<()> {
        self.modify(|doc| match doc.node_mut(id)? {
            Node::Content { id, .. } => {
                *id = Some(identity);
                Ok(())
            }
            other => Err(anyhow!("Cannot tag a non-content node {other}")),
        })
    }

    fn identity(&self, id: NodeId) -> Option<Identity> {
        self.inner
            .borrow()
            .nodes
            .get(&id)
            .and_then(Node::identity)
            .cloned()
    }

    fn append_markup(&self, id: NodeId, markup: &str) -> anyhow::Result<()> {
        self.modify(|doc| match doc.node_mut(id)? {
            Node::Content { markup: existing, .. } => {
                existing.push_str(markup);
                Ok(())
            }
            other => Err(anyhow!("Cannot append markup to {other}")),
        })
    }

    fn imported_content(&self, id: NodeId) -> Option<String> {
        let doc = self.inner.borrow();

        doc.position(id)?;

        match doc.nodes.get(&id) {
            Some(Node::Import { href }) => doc.imports.get(href).cloned(),
            _ => None,
        }
    }
}

#[allow(unused)]
mod tests {
    use super::*;

    #[test]
    fn test_create_attach_find() {
        let mount = MemoryMount::new();

        let id = mount
            .create(Node::Script {
                src: "a.js".to_string(),
            })
            .unwrap();

        // Detached nodes cannot be found
        assert_eq!(None, mount.find(&Query::Script("a.js".to_string())));

        mount.attach(Region::Body, id).unwrap();
        assert_eq!(Some(id), mount.find(&Query::Script("a.js".to_string())));
        mount
            .attach(Region::Head, id)
            .expect_err("should not attach twice");

        mount.remove(id).unwrap();
        assert_eq!(None, mount.find(&Query::Script("a.js".to_string())));
        assert_eq!(None, mount.get(id));
    }

    #[test]
    fn test_replace_keeps_position() {
        let mount = MemoryMount::new().with_container("content");
        let tail = mount
            .create(Node::Script {
                src: "tail.js".to_string(),
            })
            .unwrap();
        mount.attach(Region::Body, tail).unwrap();

        let container = mount
            .find(&Query::Identity(Identity::new("content")))
            .unwrap();
        let next = mount
            .create(Node::content(Identity::new("next"), "<p>next</p>"))
            .unwrap();
        mount.replace(container, next).unwrap();

        let order = mount
            .snapshot()
            .attached()
            .map(|(_, id, _)| id)
            .collect::<Vec<_>>();
        assert_eq!(vec![next, tail], order);
        assert_eq!(None, mount.get(container));
    }

    #[test]
    fn test_failed_mutation_is_not_published() {
        let mount = MemoryMount::new();
        let rx = mount.subscribe();
        let before = mount.revision();

        mount
            .append_markup(NodeId(42), "<p></p>")
            .expect_err("should be an error");
        assert_eq!(before, mount.revision());
        assert!(!rx.has_changed().unwrap());

        let id = mount.create(Node::content(Identity::new("c"), "")).unwrap();
        mount.append_markup(id, "<p>a</p>").unwrap();
        mount.append_markup(id, "<p>b</p>").unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(before + 3, mount.revision());
        assert_eq!(
            Some(Node::content(Identity::new("c"), "<p>a</p><p>b</p>")),
            mount.get(id)
        );
    }

    #[test]
    fn test_imported_content() {
        let mount = MemoryMount::new()
            .with_capabilities(Capabilities::HTML_IMPORTS)
            .with_import("a.html", "<p>a</p>");

        let link = mount
            .create(Node::Import {
                href: "a.html".to_string(),
            })
            .unwrap();
        assert_eq!(None, mount.imported_content(link));

        mount.attach(Region::Head, link).unwrap();
        assert_eq!(Some("<p>a</p>".to_string()), mount.imported_content(link));
        assert!(mount.capabilities().contains(Capabilities::HTML_IMPORTS));
    }

    #[test]
    fn test_render() {
        let mount = MemoryMount::new().with_container("content");
        let style = mount
            .create(Node::Stylesheet {
                href: "a.css".to_string(),
            })
            .unwrap();
        mount.attach(Region::Head, style).unwrap();

        assert_eq!(
            "head: <link type=\"text/css\" rel=\"stylesheet\" href=\"a.css\">\nbody: <div id=\"content\"></div>\n",
            mount.snapshot().render()
        );
    }
}
