pub(crate) mod memory;

use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

use crate::identity::Identity;

/// Handle to a node owned by a document mount,
///
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Region of the document a node can be attached to,
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    Head,
    Body,
}

/// Node that can be mounted into a document,
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// Script element, identified by its src attribute,
    ///
    Script { src: String },
    /// Stylesheet link element, identified by its href attribute,
    ///
    Stylesheet { href: String },
    /// Html import link element, identified by its href attribute,
    ///
    Import { href: String },
    /// Content element holding fragment markup,
    ///
    /// The id attribute is the only thing that identifies it.
    ///
    Content {
        id: Option<Identity>,
        markup: String,
    },
}

impl Node {
    /// Returns a content node w/ an identity,
    ///
    #[inline]
    pub fn content(id: Identity, markup: impl Into<String>) -> Self {
        Node::Content {
            id: Some(id),
            markup: markup.into(),
        }
    }

    /// Returns true if this node is what query is looking for,
    ///
    pub fn matches(&self, query: &Query) -> bool {
        match (self, query) {
            (Node::Script { src }, Query::Script(url)) => src == url,
            (Node::Stylesheet { href }, Query::Stylesheet(url)) => href == url,
            (Node::Import { href }, Query::Import(url)) => href == url,
            (Node::Content { id: Some(id), .. }, Query::Identity(identity)) => id == identity,
            _ => false,
        }
    }

    /// Returns the identity attribute of this node,
    ///
    #[inline]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Node::Content { id, .. } => id.as_ref(),
            _ => None,
        }
    }

    /// Returns a copy of this node w/o any children,
    ///
    pub fn shallow(&self) -> Self {
        match self {
            Node::Content { id, .. } => Node::Content {
                id: id.clone(),
                markup: String::new(),
            },
            other => other.clone(),
        }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Script { src } => {
                write!(f, r#"<script type="text/javascript" src="{src}"></script>"#)
            }
            Node::Stylesheet { href } => {
                write!(f, r#"<link type="text/css" rel="stylesheet" href="{href}">"#)
            }
            Node::Import { href } => write!(f, r#"<link rel="import" href="{href}">"#),
            Node::Content { id: Some(id), markup } => {
                write!(f, r#"<div id="{id}">{markup}</div>"#)
            }
            Node::Content { id: None, markup } => write!(f, "<div>{markup}</div>"),
        }
    }
}

/// Lookup for an attached node,
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    /// Script w/ a src attribute equal to the url,
    ///
    Script(String),
    /// Stylesheet w/ an href attribute equal to the url,
    ///
    Stylesheet(String),
    /// Import link w/ an href attribute equal to the url,
    ///
    Import(String),
    /// Content node tagged w/ the identity,
    ///
    Identity(Identity),
}

bitflags::bitflags! {
    /// Capabilities of the environment hosting a document,
    ///
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Capabilities : u8 {
        /// Environment can resolve `<link rel="import">` natively,
        ///
        const HTML_IMPORTS = 0x01;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::empty()
    }
}

/// Live document that resources are attached to and detached from,
///
/// Nodes are created detached so observers can be registered before the node is
/// attached. Attaching is what starts the fetch for scripts, stylesheets and imports.
///
/// Lookups only consider attached nodes.
///
pub trait DocumentMount: Send + Sync {
    /// Returns the capabilities of the hosting environment,
    ///
    fn capabilities(&self) -> Capabilities;

    /// Creates a detached node,
    ///
    fn create(&self, node: Node) -> anyhow::Result<NodeId>;

    /// Attaches a detached node to the end of a region,
    ///
    fn attach(&self, region: Region, id: NodeId) -> anyhow::Result<()>;

    /// Finds the first attached node matching query,
    ///
    fn find(&self, query: &Query) -> Option<NodeId>;

    /// Removes a node from the document,
    ///
    fn remove(&self, id: NodeId) -> anyhow::Result<()>;

    /// Puts a detached node in place of an attached one, the old node is removed,
    ///
    fn replace(&self, old: NodeId, new: NodeId) -> anyhow::Result<()>;

    /// Returns a copy of a node w/o its children,
    ///
    fn clone_shallow(&self, id: NodeId) -> anyhow::Result<Node>;

    /// Sets the identity attribute of a content node,
    ///
    fn set_identity(&self, id: NodeId, identity: Identity) -> anyhow::Result<()>;

    /// Returns the identity attribute of a node,
    ///
    fn identity(&self, id: NodeId) -> Option<Identity>;

    /// Appends fragment markup to a content node,
    ///
    fn append_markup(&self, id: NodeId, markup: &str) -> anyhow::Result<()>;

    /// Returns the content resolved by an attached import link,
    ///
    fn imported_content(&self, id: NodeId) -> Option<String>;
}

#[allow(unused)]
mod tests {
    use super::*;

    #[test]
    fn test_node_matches() {
        let script = Node::Script {
            src: "a.js".to_string(),
        };
        assert!(script.matches(&Query::Script("a.js".to_string())));
        assert!(!script.matches(&Query::Stylesheet("a.js".to_string())));

        let import = Node::Import {
            href: "a.html".to_string(),
        };
        assert!(!import.matches(&Query::Stylesheet("a.html".to_string())));

        let content = Node::content(Identity::new("content"), "<p>hi</p>");
        assert!(content.matches(&Query::Identity(Identity::new("content"))));
        assert_eq!(
            Node::Content {
                id: Some(Identity::new("content")),
                markup: String::new()
            },
            content.shallow()
        );
    }

    #[test]
    fn test_node_display() {
        let style = Node::Stylesheet {
            href: "a.css".to_string(),
        };
        assert_eq!(
            r#"<link type="text/css" rel="stylesheet" href="a.css">"#,
            style.to_string()
        );

        let content = Node::content(Identity::new("content"), "<p>hi</p>");
        assert_eq!(r#"<div id="content"><p>hi</p></div>"#, content.to_string());
    }
}
