mod config;
mod identity;
mod kind;
mod loader;
mod mount;
mod notifier;
mod runtime;
mod status;
mod transport;

pub mod prelude {
    pub use super::config::LoaderConfig;
    pub use super::config::DEFAULT_CONTAINER_ID;
    pub use super::config::DEFAULT_IDENTITY_PREFIX;

    pub use super::kind::classify;
    pub use super::kind::Kind;
    pub use super::kind::ResourceRef;

    pub use super::status::Status;

    pub use super::identity::CrcIdentity;
    pub use super::identity::Identity;
    pub use super::identity::IdentityDeriver;

    pub use super::mount::memory::Document;
    pub use super::mount::memory::MemoryMount;
    pub use super::mount::Capabilities;
    pub use super::mount::DocumentMount;
    pub use super::mount::Node;
    pub use super::mount::NodeId;
    pub use super::mount::Query;
    pub use super::mount::Region;

    pub use super::notifier::Completion;
    pub use super::notifier::CompletionHandle;
    pub use super::notifier::CompletionNotifier;
    pub use super::notifier::MemoryNotifier;
    pub use super::notifier::Outcome;

    pub use super::transport::MemoryTransport;
    pub use super::transport::Transport;
    pub use super::transport::TransportError;

    pub use super::loader::Loader;

    pub use super::runtime::new_runtime;
}

#[allow(dead_code)]
#[allow(unused)]
mod tests {
    use super::prelude::*;

    /// Document w/ a content container that supports html imports,
    ///
    fn import_mount() -> MemoryMount {
        MemoryMount::new()
            .with_container(DEFAULT_CONTAINER_ID)
            .with_capabilities(Capabilities::HTML_IMPORTS)
            .with_import("views/home.html", "<h1>home</h1>")
    }

    fn transport() -> MemoryTransport {
        MemoryTransport::new()
            .with_body("views/home.html", "<h1>home</h1>")
            .with_status("views/missing.html", 404)
            .with_status("views/down.html", 503)
            .with_status("views/moved.html", 302)
            .with_network_error("views/aborted.html", "aborted")
    }

    fn loader(
        mount: MemoryMount,
    ) -> Loader<MemoryMount, MemoryNotifier, MemoryTransport> {
        Loader::new(mount, MemoryNotifier::settling(Outcome::Loaded), transport())
    }

    #[tokio::test]
    async fn test_load_then_is_loaded() {
        let fetch = loader(MemoryMount::new().with_container(DEFAULT_CONTAINER_ID));
        let import = loader(import_mount());

        for loader in [&fetch, &import] {
            for url in ["lib/app.js", "theme/site.css", "views/home.html"] {
                assert!(!loader.is_loaded(url));
                assert_eq!(Status::LoadOk, loader.load(url).await);
                assert!(loader.is_loaded(url), "{url}");
            }
        }
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let mount = import_mount();
        let loader = loader(mount.clone());

        for url in ["lib/app.js", "theme/site.css", "views/home.html"] {
            assert_eq!(Status::LoadOk, loader.load(url).await);
            let revision = mount.revision();

            assert_eq!(Status::FileLoaded, loader.load(url).await);
            assert_eq!(revision, mount.revision(), "{url} mutated the document");
        }

        assert_eq!(1, mount.count(&Query::Script("lib/app.js".to_string())));
        assert_eq!(1, mount.count(&Query::Stylesheet("theme/site.css".to_string())));
        assert_eq!(1, mount.count(&Query::Import("views/home.html".to_string())));
    }

    #[tokio::test]
    async fn test_unload_round_trip() {
        for mount in [
            MemoryMount::new().with_container(DEFAULT_CONTAINER_ID),
            import_mount(),
        ] {
            let loader = loader(mount.clone());
            let initial = mount.snapshot().render();

            for url in ["theme/site.css", "views/home.html"] {
                assert_eq!(Status::LoadOk, loader.load(url).await);
                assert_eq!(Status::UnloadOk, loader.unload(url));
                assert!(!loader.is_loaded(url));

                // Can be mounted again afterwards
                assert_eq!(Status::LoadOk, loader.load(url).await);
                assert_eq!(Status::UnloadOk, loader.unload(url));
            }

            assert_eq!(initial, mount.snapshot().render());
        }
    }

    #[tokio::test]
    async fn test_scripts_cannot_unload() {
        let loader = loader(MemoryMount::new());

        assert_eq!(Status::LoadOk, loader.load("a.js").await);
        assert_eq!(Status::CantUnload, loader.unload("a.js"));
        assert_eq!(Status::CantUnload, loader.unload("a.js"));
        assert!(loader.is_loaded("a.js"));
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let mount = import_mount();
        let loader = loader(mount.clone());
        let revision = mount.revision();

        assert_eq!(Status::UnsupportedKind, loader.load("a.xyz").await);
        assert!(!loader.load("a.xyz").await.is_ok());
        assert!(!loader.is_loaded("a.xyz"));
        assert_eq!(Status::FileNotLoaded, loader.unload("a.xyz"));
        assert_eq!(revision, mount.revision());
    }

    #[tokio::test]
    async fn test_url_not_defined() {
        let mount = MemoryMount::new();
        let loader = loader(mount.clone());

        assert_eq!(Status::UrlNotDefined, loader.load("").await);
        assert_eq!(Status::UrlNotDefined, loader.unload(""));
        assert!(!loader.is_loaded(""));
        assert_eq!(0, mount.revision());
    }

    #[tokio::test]
    async fn test_fragment_without_container() {
        for mount in [
            MemoryMount::new(),
            MemoryMount::new()
                .with_capabilities(Capabilities::HTML_IMPORTS)
                .with_import("views/home.html", "<h1>home</h1>"),
        ] {
            let loader = loader(mount.clone());
            let revision = mount.revision();

            assert_eq!(Status::MissingContentDiv, loader.load("views/home.html").await);
            assert_eq!(revision, mount.revision());
            assert!(!loader.is_loaded("views/home.html"));
        }
    }

    #[tokio::test]
    async fn test_fragment_fetch_failures() {
        let mount = MemoryMount::new().with_container(DEFAULT_CONTAINER_ID);
        let loader = loader(mount.clone());
        let revision = mount.revision();

        let missing = loader.load("views/missing.html").await;
        assert_eq!(Status::Http(404), missing);
        assert_eq!(-404, missing.code());

        assert_eq!(Status::Http(503), loader.load("views/down.html").await);
        assert_eq!(Status::LoadError, loader.load("views/moved.html").await);
        assert_eq!(Status::LoadError, loader.load("views/aborted.html").await);
        assert_eq!(Status::LoadError, loader.load("views/unrouted.html").await);

        assert_eq!(revision, mount.revision());
    }

    #[tokio::test]
    async fn test_unload_before_load() {
        let mount = import_mount();
        let loader = loader(mount.clone());
        let revision = mount.revision();

        for url in ["a.js", "a.css", "views/home.html"] {
            assert_eq!(Status::FileNotLoaded, loader.unload(url));
        }
        assert_eq!(revision, mount.revision());
    }

    #[tokio::test]
    async fn test_style_and_fragment_import_do_not_alias() {
        let mount = import_mount();
        let loader = loader(mount.clone());

        // An import link has an href too, it must not count as a stylesheet
        assert_eq!(Status::LoadOk, loader.load("views/home.html").await);
        assert!(!loader.is_loaded("views/home.css"));
        assert_eq!(0, mount.count(&Query::Stylesheet("views/home.html".to_string())));
    }

    #[tokio::test]
    async fn test_custom_identity() {
        struct Plain;

        impl IdentityDeriver for Plain {
            fn derive(&self, url: &str) -> Identity {
                Identity::new(url.replace(['/', '.'], "-"))
            }
        }

        let mount = MemoryMount::new().with_container(DEFAULT_CONTAINER_ID);
        let loader = loader(mount.clone()).with_identity(Plain);

        assert_eq!(Status::LoadOk, loader.load("views/home.html").await);
        assert!(mount
            .find(&Query::Identity(Identity::new("views-home-html")))
            .is_some());
        assert_eq!(Status::UnloadOk, loader.unload("views/home.html"));
    }

    #[test]
    fn test_loads_on_local_runtime() {
        let runtime = new_runtime().build().unwrap();
        let loader = loader(MemoryMount::new());

        let status = runtime.block_on(loader.load("a.css"));
        assert_eq!(Status::LoadOk, status);
        assert!(loader.is_loaded("a.css"));
    }
}
