use std::cell::RefCell;
use std::fmt::Display;
use std::hash::Hasher;
use std::sync::OnceLock;

use crc::Crc;
use serde::Deserialize;
use serde::Serialize;
use tracing::trace;

/// Identity attribute value used to find a mounted fragment again,
///
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    /// Wraps an existing identity value, such as the container id,
    ///
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derives a stable identity from a url,
///
/// Implementations must be deterministic, the same url must always produce the same
/// identity, and the value must be usable as a node id attribute.
///
pub trait IdentityDeriver: Send + Sync {
    /// Derives the identity for url,
    ///
    fn derive(&self, url: &str) -> Identity;
}

/// CRC for the upper half of the identity,
///
static IDENTITY_CRC_64: OnceLock<Crc<u64>> = OnceLock::new();

/// CRC for the lower half of the identity,
///
static IDENTITY_CRC_32: OnceLock<Crc<u32>> = OnceLock::new();

fn crc_64() -> &'static Crc<u64> {
    IDENTITY_CRC_64.get_or_init(|| Crc::<u64>::new(&crc::CRC_64_ECMA_182))
}

fn crc_32() -> &'static Crc<u32> {
    IDENTITY_CRC_32.get_or_init(|| Crc::<u32>::new(&crc::CRC_32_ISCSI))
}

/// Running digest over the bytes of a url,
///
struct UrlDigest {
    /// Wide digest,
    ///
    wide: RefCell<crc::Digest<'static, u64>>,
    /// Narrow digest,
    ///
    narrow: RefCell<crc::Digest<'static, u32>>,
}

impl UrlDigest {
    fn new() -> Self {
        Self {
            wide: RefCell::new(crc_64().digest()),
            narrow: RefCell::new(crc_32().digest()),
        }
    }

    /// Folds both digests into a uuid and resets them,
    ///
    fn uuid(&self) -> uuid::Uuid {
        let wide = self.finish();
        let narrow = self.narrow.replace(crc_32().digest()).finalize();

        uuid::Uuid::from_u64_pair(wide, u64::from(narrow))
    }
}

impl Hasher for UrlDigest {
    fn finish(&self) -> u64 {
        self.wide.replace(crc_64().digest()).finalize()
    }

    fn write(&mut self, bytes: &[u8]) {
        self.wide.borrow_mut().update(bytes);
        self.narrow.borrow_mut().update(bytes);
    }
}

/// Identity deriver that checksums the url,
///
/// Produces `<prefix>-<32 hex digits>`, which only contains characters valid in an id attribute.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrcIdentity {
    prefix: String,
}

impl CrcIdentity {
    /// Returns a new deriver w/ a custom prefix,
    ///
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for CrcIdentity {
    fn default() -> Self {
        Self::with_prefix("frag")
    }
}

impl IdentityDeriver for CrcIdentity {
    fn derive(&self, url: &str) -> Identity {
        let mut digest = UrlDigest::new();
        digest.write(url.as_bytes());

        let identity = Identity(format!("{}-{}", self.prefix, digest.uuid().simple()));
        trace!("Derived {identity} for {url}");
        identity
    }
}

#[allow(unused)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_stable() {
        let deriver = CrcIdentity::default();

        let a = deriver.derive("views/home.html");
        let b = deriver.derive("views/home.html");
        assert_eq!(a, b);

        let c = deriver.derive("views/about.html");
        assert_ne!(a, c);

        // A fresh deriver must agree, nothing is carried between calls
        assert_eq!(a, CrcIdentity::default().derive("views/home.html"));
    }

    #[test]
    fn test_derive_is_dom_safe() {
        let identity = CrcIdentity::with_prefix("ld").derive("https://example.com/a b/\"x\".html");

        let value = identity.as_str();
        assert!(value.starts_with("ld-"));
        assert_eq!("ld-".len() + 32, value.len());
        assert!(value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }
}
