use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

/// Result reported to the caller of load/unload,
///
/// Every load or unload resolves with exactly one of these. Errors are never raised
/// across the async boundary, they are reported here instead.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Resource was mounted and reported completion,
    ///
    LoadOk,
    /// Resource was removed from the document,
    ///
    UnloadOk,
    /// Mounting failed, or completion reported an error,
    ///
    LoadError,
    /// No url was given,
    ///
    UrlNotDefined,
    /// Url is already mounted (or currently being mounted),
    ///
    FileLoaded,
    /// Url is not mounted,
    ///
    FileNotLoaded,
    /// The content container needed for fragments is missing,
    ///
    MissingContentDiv,
    /// Scripts cannot be unloaded once executed,
    ///
    CantUnload,
    /// Url extension has no mounting strategy,
    ///
    UnsupportedKind,
    /// Fragment fetch failed w/ an http status in 400..=599,
    ///
    Http(u16),
}

impl Status {
    /// Returns the numeric status code,
    ///
    /// **Note**: `0` and `-1` match what existing callers expect for "loaded" and
    /// "already loaded". Http failures are reported as the negated http status.
    ///
    pub fn code(&self) -> i32 {
        match self {
            Status::LoadOk => 0,
            Status::FileLoaded => -1,
            Status::UnloadOk => 1,
            Status::UrlNotDefined => -2,
            Status::FileNotLoaded => -3,
            Status::MissingContentDiv => -4,
            Status::CantUnload => -5,
            Status::LoadError => -6,
            Status::UnsupportedKind => -7,
            Status::Http(status) => -i32::from(*status),
        }
    }

    /// Returns true for LoadOk and UnloadOk,
    ///
    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::LoadOk | Status::UnloadOk)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::LoadOk => write!(f, "LOAD_OK"),
            Status::UnloadOk => write!(f, "UNLOAD_OK"),
            Status::LoadError => write!(f, "LOAD_ERROR"),
            Status::UrlNotDefined => write!(f, "URL_NOT_DEFINED"),
            Status::FileLoaded => write!(f, "FILE_LOADED"),
            Status::FileNotLoaded => write!(f, "FILE_NOT_LOADED"),
            Status::MissingContentDiv => write!(f, "MISSING_CONTENT_DIV"),
            Status::CantUnload => write!(f, "CANT_UNLOAD"),
            Status::UnsupportedKind => write!(f, "UNSUPPORTED_KIND"),
            Status::Http(status) => write!(f, "HTTP_{status}"),
        }
    }
}

#[allow(unused)]
mod tests {
    use super::Status;
    use std::collections::BTreeSet;

    #[test]
    fn test_codes_are_distinct() {
        let all = [
            Status::LoadOk,
            Status::UnloadOk,
            Status::LoadError,
            Status::UrlNotDefined,
            Status::FileLoaded,
            Status::FileNotLoaded,
            Status::MissingContentDiv,
            Status::CantUnload,
            Status::UnsupportedKind,
            Status::Http(400),
            Status::Http(404),
            Status::Http(599),
        ];

        let codes = all.iter().map(Status::code).collect::<BTreeSet<_>>();
        assert_eq!(all.len(), codes.len());

        assert_eq!(0, Status::LoadOk.code());
        assert_eq!(-1, Status::FileLoaded.code());
        assert_eq!(-404, Status::Http(404).code());
    }

    #[test]
    fn test_display() {
        assert_eq!("CANT_UNLOAD", Status::CantUnload.to_string());
        assert_eq!("HTTP_503", Status::Http(503).to_string());
        assert!(Status::UnloadOk.is_ok());
        assert!(!Status::FileLoaded.is_ok());
    }
}
