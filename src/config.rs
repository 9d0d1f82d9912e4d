use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Identity of the container fragments are mounted into,
///
pub const DEFAULT_CONTAINER_ID: &str = "content";

/// Prefix of identities derived for fragments,
///
pub const DEFAULT_IDENTITY_PREFIX: &str = "frag";

/// Loader settings,
///
/// **Note**: With the `util-clap` feature this can be flattened into a host's cli args.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "util-clap", derive(clap::Args))]
#[serde(default)]
pub struct LoaderConfig {
    /// Id of the node fragments are mounted into,
    ///
    #[cfg_attr(feature = "util-clap", arg(long, default_value = DEFAULT_CONTAINER_ID))]
    pub container_id: String,
    /// Prefix of identities derived for fragment urls,
    ///
    #[cfg_attr(feature = "util-clap", arg(long, default_value = DEFAULT_IDENTITY_PREFIX))]
    pub identity_prefix: String,
    /// Always fetch fragments, even if the environment supports html imports,
    ///
    #[cfg_attr(feature = "util-clap", arg(long))]
    pub disable_html_imports: bool,
    /// Milliseconds to wait for a load to complete before reporting an error,
    ///
    /// Unset waits forever.
    ///
    #[cfg_attr(feature = "util-clap", arg(long))]
    pub completion_timeout_ms: Option<u64>,
}

impl LoaderConfig {
    /// Returns the completion timeout,
    ///
    #[inline]
    pub fn completion_timeout(&self) -> Option<Duration> {
        self.completion_timeout_ms.map(Duration::from_millis)
    }

    /// Sets the completion timeout,
    ///
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        // Saturates, anything past u64::MAX millis waits forever anyway
        self.completion_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the container id,
    ///
    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = id.into();
        self
    }

    /// Disables the html import strategy,
    ///
    pub fn without_html_imports(mut self) -> Self {
        self.disable_html_imports = true;
        self
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            container_id: DEFAULT_CONTAINER_ID.to_string(),
            identity_prefix: DEFAULT_IDENTITY_PREFIX.to_string(),
            disable_html_imports: false,
            completion_timeout_ms: None,
        }
    }
}

#[allow(unused)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!("content", config.container_id);
        assert_eq!("frag", config.identity_prefix);
        assert!(!config.disable_html_imports);
        assert_eq!(None, config.completion_timeout());

        let config = config
            .with_completion_timeout(Duration::from_secs(2))
            .without_html_imports();
        assert_eq!(Some(Duration::from_millis(2000)), config.completion_timeout());
        assert!(config.disable_html_imports);
    }

    #[test]
    fn test_completion_timeout_saturates() {
        let config = LoaderConfig::default().with_completion_timeout(Duration::MAX);
        assert_eq!(Some(u64::MAX), config.completion_timeout_ms);

        // Still a long wait, not a wrapped around short one
        let timeout = config.completion_timeout().unwrap();
        assert!(timeout > Duration::from_secs(365 * 24 * 60 * 60));
    }

    #[cfg(feature = "util-clap")]
    #[test]
    fn test_clap_args() {
        use clap::Parser;

        #[derive(Parser)]
        struct Cli {
            #[command(flatten)]
            loader: LoaderConfig,
        }

        let cli = Cli::parse_from([
            "host",
            "--container-id",
            "main",
            "--completion-timeout-ms",
            "500",
        ]);
        assert_eq!("main", cli.loader.container_id);
        assert_eq!("frag", cli.loader.identity_prefix);
        assert_eq!(Some(500), cli.loader.completion_timeout_ms);
    }
}
