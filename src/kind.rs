use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

/// Kind of resource a url refers to,
///
/// Derived from the trailing extension of the url and never changes afterwards.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// `.js`, mounted as a script node in the body,
    ///
    Script,
    /// `.css`, mounted as a stylesheet link in the head,
    ///
    Style,
    /// `.html`, mounted as markup inside the content container,
    ///
    Fragment,
    /// Anything else, there is no strategy for mounting these,
    ///
    Unknown,
}

/// Classifies a url by the substring after its last `.`,
///
/// Matching is exact, `A.JS` is `Unknown`.
///
pub fn classify(url: &str) -> Kind {
    match url.rsplit('.').next() {
        Some("js") => Kind::Script,
        Some("css") => Kind::Style,
        Some("html") => Kind::Fragment,
        _ => Kind::Unknown,
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Script => write!(f, "script"),
            Kind::Style => write!(f, "style"),
            Kind::Fragment => write!(f, "fragment"),
            Kind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Url plus the kind derived from it,
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    url: String,
    kind: Kind,
}

impl ResourceRef {
    /// Returns a resource reference, or None if the url is empty,
    ///
    /// **Note**: A url made only of whitespace is treated as not defined.
    ///
    pub fn parse(url: &str) -> Option<Self> {
        if url.trim().is_empty() {
            return None;
        }

        Some(Self {
            url: url.to_string(),
            kind: classify(url),
        })
    }

    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        self.kind
    }
}

impl Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.url, self.kind)
    }
}

#[allow(unused)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(Kind::Script, classify("a.js"));
        assert_eq!(Kind::Style, classify("/static/theme.min.css"));
        assert_eq!(Kind::Fragment, classify("https://example.com/views/home.html"));
        assert_eq!(Kind::Unknown, classify("a.xyz"));
        assert_eq!(Kind::Unknown, classify("noextension"));
        assert_eq!(Kind::Unknown, classify("A.JS"));
        assert_eq!(Kind::Unknown, classify("a.js?v=2"));
    }

    #[test]
    fn test_parse() {
        assert!(ResourceRef::parse("").is_none());
        assert!(ResourceRef::parse("   ").is_none());

        let r = ResourceRef::parse("lib/app.js").unwrap();
        assert_eq!("lib/app.js", r.url());
        assert_eq!(Kind::Script, r.kind());
        assert_eq!("lib/app.js (script)", r.to_string());
    }
}
