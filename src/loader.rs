use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Mutex;
use std::sync::PoisonError;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::config::LoaderConfig;
use crate::identity::CrcIdentity;
use crate::identity::Identity;
use crate::identity::IdentityDeriver;
use crate::kind::Kind;
use crate::kind::ResourceRef;
use crate::mount::Capabilities;
use crate::mount::DocumentMount;
use crate::mount::Node;
use crate::mount::NodeId;
use crate::mount::Query;
use crate::mount::Region;
use crate::notifier::CompletionNotifier;
use crate::notifier::Outcome;
use crate::status::Status;
use crate::transport::Transport;
use crate::transport::TransportError;

/// Loads and unloads scripts, stylesheets and html fragments into a document,
///
/// A url is loaded when the document contains its mount record, a script or stylesheet
/// node w/ the url as its src/href, or a content node tagged w/ the identity derived
/// from the url. `is_loaded`, `load` and `unload` all look at the document, nothing else
/// is tracked besides loads that are in flight.
///
pub struct Loader<M, N, T, I = CrcIdentity> {
    /// Document resources are mounted into,
    ///
    mount: M,
    /// Reports when an attached node finished loading,
    ///
    notifier: N,
    /// Fetches fragments when imports are not available,
    ///
    transport: T,
    /// Derives fragment identities,
    ///
    identity: I,
    /// Loader settings,
    ///
    config: LoaderConfig,
    /// Urls w/ a load in progress,
    ///
    in_flight: Mutex<BTreeSet<String>>,
}

impl<M, N, T> Loader<M, N, T>
where
    M: DocumentMount,
    N: CompletionNotifier,
    T: Transport,
{
    /// Returns a new loader w/ the default config,
    ///
    pub fn new(mount: M, notifier: N, transport: T) -> Self {
        Self {
            mount,
            notifier,
            transport,
            identity: CrcIdentity::default(),
            config: LoaderConfig::default(),
            in_flight: Mutex::new(BTreeSet::new()),
        }
    }

    /// Replaces the config, the identity prefix is applied to the crc identity,
    ///
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.identity = CrcIdentity::with_prefix(config.identity_prefix.clone());
        self.config = config;
        self
    }
}

impl<M, N, T, I> Loader<M, N, T, I>
where
    M: DocumentMount,
    N: CompletionNotifier,
    T: Transport,
    I: IdentityDeriver,
{
    /// Replaces the identity deriver,
    ///
    pub fn with_identity<J: IdentityDeriver>(self, identity: J) -> Loader<M, N, T, J> {
        Loader {
            mount: self.mount,
            notifier: self.notifier,
            transport: self.transport,
            identity,
            config: self.config,
            in_flight: self.in_flight,
        }
    }

    #[inline]
    pub fn mount(&self) -> &M {
        &self.mount
    }

    #[inline]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Returns true if url is mounted,
    ///
    /// Empty urls and urls of an unknown kind are never loaded.
    ///
    pub fn is_loaded(&self, url: &str) -> bool {
        ResourceRef::parse(url)
            .and_then(|r| self.find_record(&r))
            .is_some()
    }

    /// Loads url,
    ///
    /// Script and stylesheet nodes count as loaded as soon as they are attached, before
    /// the returned status is known. Fragments count as loaded once the identity tag is
    /// applied, which happens right before `LoadOk` is returned.
    ///
    pub async fn load(&self, url: &str) -> Status {
        let Some(resource) = ResourceRef::parse(url) else {
            debug!("Cannot load, url is not defined");
            return Status::UrlNotDefined;
        };

        if resource.kind() == Kind::Unknown {
            warn!("Cannot load {resource}, unsupported kind");
            return Status::UnsupportedKind;
        }

        // Reserve before checking presence, a caller that gets past both is the only
        // one that can insert
        let Some(reservation) = self.reserve(resource.url()) else {
            debug!("Skipping {resource}, load already in progress");
            return Status::FileLoaded;
        };

        if self.find_record(&resource).is_some() {
            debug!("Skipping {resource}, already loaded");
            return Status::FileLoaded;
        }

        let url = resource.url().to_string();
        let result = match resource.kind() {
            Kind::Script => {
                self.load_element(Node::Script { src: url }, Region::Body, reservation)
                    .await
            }
            Kind::Style => {
                self.load_element(Node::Stylesheet { href: url }, Region::Head, reservation)
                    .await
            }
            Kind::Fragment => self.load_fragment(&resource, reservation).await,
            Kind::Unknown => Ok(Status::UnsupportedKind),
        };

        let status = result.unwrap_or_else(|err| {
            warn!("Could not load {resource}, {err}");
            Status::LoadError
        });
        debug!("Load {resource} -> {status}");
        status
    }

    /// Loads url and passes the status to callback,
    ///
    pub async fn load_with(&self, url: &str, callback: impl FnOnce(Status)) {
        callback(self.load(url).await)
    }

    /// Unloads url,
    ///
    /// Scripts cannot be unloaded, their side effects on the environment are permanent.
    ///
    pub fn unload(&self, url: &str) -> Status {
        let Some(resource) = ResourceRef::parse(url) else {
            debug!("Cannot unload, url is not defined");
            return Status::UrlNotDefined;
        };

        let Some(record) = self.find_record(&resource) else {
            debug!("Cannot unload {resource}, not loaded");
            return Status::FileNotLoaded;
        };

        let result = match resource.kind() {
            Kind::Script => Ok(Status::CantUnload),
            Kind::Style => self.mount.remove(record).map(|_| Status::UnloadOk),
            Kind::Fragment => self.unload_fragment(&resource, record),
            Kind::Unknown => Ok(Status::FileNotLoaded),
        };

        let status = result.unwrap_or_else(|err| {
            warn!("Could not unload {resource}, {err}");
            Status::LoadError
        });
        debug!("Unload {resource} -> {status}");
        status
    }

    /// Unloads url and passes the status to callback,
    ///
    pub fn unload_with(&self, url: &str, callback: impl FnOnce(Status)) {
        callback(self.unload(url))
    }

    /// Returns the node holding the mount record of a resource,
    ///
    fn find_record(&self, resource: &ResourceRef) -> Option<NodeId> {
        let query = match resource.kind() {
            Kind::Script => Query::Script(resource.url().to_string()),
            Kind::Style => Query::Stylesheet(resource.url().to_string()),
            Kind::Fragment => Query::Identity(self.identity.derive(resource.url())),
            Kind::Unknown => return None,
        };

        self.mount.find(&query)
    }

    /// Returns the container fragments are mounted into,
    ///
    fn container(&self) -> Option<NodeId> {
        self.mount
            .find(&Query::Identity(self.container_identity()))
    }

    #[inline]
    fn container_identity(&self) -> Identity {
        Identity::new(self.config.container_id.as_str())
    }

    /// Returns true if fragments should be mounted w/ html imports,
    ///
    fn imports_enabled(&self) -> bool {
        !self.config.disable_html_imports
            && self
                .mount
                .capabilities()
                .contains(Capabilities::HTML_IMPORTS)
    }

    /// Marks url as in flight, returns None if it already is,
    ///
    fn reserve(&self, url: &str) -> Option<Reservation<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if in_flight.insert(url.to_string()) {
            trace!("Reserved {url}");
            Some(Reservation {
                in_flight: &self.in_flight,
                url: url.to_string(),
            })
        } else {
            None
        }
    }

    /// Waits on a future, bounded by the completion timeout,
    ///
    async fn wait<F: Future>(&self, fut: F) -> Option<F::Output> {
        match self.config.completion_timeout() {
            Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                Ok(output) => Some(output),
                Err(_) => {
                    warn!("Gave up waiting after {:?}", timeout);
                    None
                }
            },
            None => Some(fut.await),
        }
    }

    /// Creates and attaches a node, then waits for it to finish loading,
    ///
    async fn load_element(
        &self,
        node: Node,
        region: Region,
        reservation: Reservation<'_>,
    ) -> anyhow::Result<Status> {
        let id = self.mount.create(node)?;
        let guard = NodeGuard::new(&self.mount, id);

        let completion = self.notifier.observe(id);
        self.mount.attach(region, id)?;

        // Presence is insertion-based for elements, the record is visible from here on
        guard.keep();
        drop(reservation);

        match self.wait(completion).await {
            Some(Outcome::Loaded) => Ok(Status::LoadOk),
            Some(Outcome::Failed) | None => Ok(Status::LoadError),
        }
    }

    async fn load_fragment(
        &self,
        resource: &ResourceRef,
        _reservation: Reservation<'_>,
    ) -> anyhow::Result<Status> {
        if self.container().is_none() {
            debug!("Cannot load {resource}, container `{}` is missing", self.config.container_id);
            return Ok(Status::MissingContentDiv);
        }

        let identity = self.identity.derive(resource.url());

        if self.imports_enabled() {
            self.import_fragment(resource.url(), identity).await
        } else {
            self.fetch_fragment(resource.url(), identity).await
        }
    }

    /// Mounts a fragment w/ an import link,
    ///
    /// The imported content replaces the container and carries the fragment identity.
    ///
    async fn import_fragment(&self, url: &str, identity: Identity) -> anyhow::Result<Status> {
        let link = self.mount.create(Node::Import {
            href: url.to_string(),
        })?;
        let guard = NodeGuard::new(&self.mount, link);

        let completion = self.notifier.observe(link);
        self.mount.attach(Region::Head, link)?;

        let markup = match self.wait(completion).await {
            Some(Outcome::Loaded) => self.mount.imported_content(link),
            Some(Outcome::Failed) | None => return Ok(Status::LoadError),
        };

        let Some(markup) = markup else {
            warn!("Import of {url} completed w/o content");
            return Ok(Status::LoadError);
        };

        // The container could have been taken by another fragment while waiting
        let Some(container) = self.container() else {
            return Ok(Status::MissingContentDiv);
        };

        let content = self.mount.create(Node::content(identity, markup))?;
        self.mount.replace(container, content)?;

        guard.keep();
        Ok(Status::LoadOk)
    }

    /// Mounts a fragment by fetching it and appending it to the container,
    ///
    async fn fetch_fragment(&self, url: &str, identity: Identity) -> anyhow::Result<Status> {
        let body = match self.wait(self.transport.fetch(url)).await {
            Some(Ok(body)) => body,
            Some(Err(TransportError::Status(status))) if (400..=599).contains(&status) => {
                warn!("Fetching {url} failed w/ http status {status}");
                return Ok(Status::Http(status));
            }
            Some(Err(err)) => {
                warn!("Fetching {url} failed, {err}");
                return Ok(Status::LoadError);
            }
            None => return Ok(Status::LoadError),
        };

        let markup = String::from_utf8(body.to_vec())?;

        // The container could have been taken by another fragment while fetching
        let Some(container) = self.container() else {
            return Ok(Status::MissingContentDiv);
        };

        self.mount.append_markup(container, &markup)?;
        self.mount.set_identity(container, identity)?;
        Ok(Status::LoadOk)
    }

    /// Restores the container in place of a mounted fragment,
    ///
    fn unload_fragment(&self, resource: &ResourceRef, content: NodeId) -> anyhow::Result<Status> {
        let container = self.mount.create(self.mount.clone_shallow(content)?)?;
        let guard = NodeGuard::new(&self.mount, container);

        self.mount
            .set_identity(container, self.container_identity())?;
        self.mount.replace(content, container)?;
        guard.keep();

        // Only after the fragment is gone, so a failure above leaves it fully mounted
        if let Some(link) = self.mount.find(&Query::Import(resource.url().to_string())) {
            self.mount.remove(link)?;
        }

        Ok(Status::UnloadOk)
    }
}

/// Marks a url as in flight until dropped,
///
struct Reservation<'a> {
    in_flight: &'a Mutex<BTreeSet<String>>,
    url: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        trace!("Releasing {}", self.url);
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.url);
    }
}

/// Removes a node from the document when dropped, unless kept,
///
/// Covers every way a load can stop before the node is accounted for, errors,
/// failed completions, timeouts, or the load future being dropped.
///
struct NodeGuard<'a, M: DocumentMount> {
    mount: &'a M,
    id: Option<NodeId>,
}

impl<'a, M: DocumentMount> NodeGuard<'a, M> {
    fn new(mount: &'a M, id: NodeId) -> Self {
        Self {
            mount,
            id: Some(id),
        }
    }

    /// Leaves the node in the document,
    ///
    fn keep(mut self) {
        self.id.take();
    }
}

impl<M: DocumentMount> Drop for NodeGuard<'_, M> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            trace!("Discarding {:?}", id);
            if let Err(err) = self.mount.remove(id) {
                warn!("Could not discard {:?}, {err}", id);
            }
        }
    }
}

#[allow(unused)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mount::memory::MemoryMount;
    use crate::notifier::MemoryNotifier;
    use crate::transport::MemoryTransport;

    type TestLoader = Loader<MemoryMount, MemoryNotifier, MemoryTransport>;

    fn loader(mount: MemoryMount, notifier: MemoryNotifier) -> TestLoader {
        Loader::new(mount, notifier, MemoryTransport::new())
    }

    async fn settle_when_pending(notifier: &MemoryNotifier, outcome: Outcome) {
        while notifier.pending().is_empty() {
            tokio::task::yield_now().await;
        }
        notifier.settle_all(outcome);
    }

    /// Mount whose first lookup stalls, widening the gap between checking and inserting,
    ///
    struct SlowFind {
        inner: MemoryMount,
        stalled: std::sync::atomic::AtomicBool,
    }

    impl DocumentMount for SlowFind {
        fn capabilities(&self) -> Capabilities {
            self.inner.capabilities()
        }

        fn create(&self, node: Node) -> anyhow::Result<NodeId> {
            self.inner.create(node)
        }

        fn attach(&self, region: Region, id: NodeId) -> anyhow::Result<()> {
            self.inner.attach(region, id)
        }

        fn find(&self, query: &Query) -> Option<NodeId> {
            if !self
                .stalled
                .swap(true, std::sync::atomic::Ordering::SeqCst)
            {
                std::thread::sleep(Duration::from_millis(200));
            }
            self.inner.find(query)
        }

        fn remove(&self, id: NodeId) -> anyhow::Result<()> {
            self.inner.remove(id)
        }

        fn replace(&self, old: NodeId, new: NodeId) -> anyhow::Result<()> {
            self.inner.replace(old, new)
        }

        fn clone_shallow(&self, id: NodeId) -> anyhow::Result<Node> {
            self.inner.clone_shallow(id)
        }

        fn set_identity(&self, id: NodeId, identity: Identity) -> anyhow::Result<()> {
            self.inner.set_identity(id, identity)
        }

        fn identity(&self, id: NodeId) -> Option<Identity> {
            self.inner.identity(id)
        }

        fn append_markup(&self, id: NodeId, markup: &str) -> anyhow::Result<()> {
            self.inner.append_markup(id, markup)
        }

        fn imported_content(&self, id: NodeId) -> Option<String> {
            self.inner.imported_content(id)
        }
    }

    #[test]
    fn test_concurrent_element_loads_from_threads() {
        for (url, query) in [
            ("lib/app.js", Query::Script("lib/app.js".to_string())),
            ("theme/site.css", Query::Stylesheet("theme/site.css".to_string())),
        ] {
            let mount = MemoryMount::new();
            let loader = Loader::new(
                SlowFind {
                    inner: mount.clone(),
                    stalled: std::sync::atomic::AtomicBool::new(false),
                },
                MemoryNotifier::settling(Outcome::Loaded),
                MemoryTransport::new(),
            );

            let (a, b) = std::thread::scope(|scope| {
                let a = scope.spawn(|| futures::executor::block_on(loader.load(url)));
                std::thread::sleep(Duration::from_millis(50));
                let b = scope.spawn(|| futures::executor::block_on(loader.load(url)));
                (a.join().unwrap(), b.join().unwrap())
            });

            assert_eq!(Status::LoadOk, a, "{url}");
            assert_eq!(Status::FileLoaded, b, "{url}");
            assert_eq!(1, mount.count(&query), "{url}");
        }
    }

    #[tokio::test]
    async fn test_concurrent_element_loads_insert_once() {
        let mount = MemoryMount::new();
        let notifier = MemoryNotifier::new();
        let loader = loader(mount.clone(), notifier.clone());

        let (script_a, script_b, style_a, style_b, _) = tokio::join!(
            loader.load("lib/app.js"),
            loader.load("lib/app.js"),
            loader.load("theme/site.css"),
            loader.load("theme/site.css"),
            async {
                while notifier.pending().len() < 2 {
                    tokio::task::yield_now().await;
                }
                notifier.settle_all(Outcome::Loaded);
            }
        );

        for (a, b) in [(script_a, script_b), (style_a, style_b)] {
            let mut statuses = vec![a, b];
            statuses.sort_by_key(Status::code);
            assert_eq!(vec![Status::FileLoaded, Status::LoadOk], statuses);
        }
        assert_eq!(1, mount.count(&Query::Script("lib/app.js".to_string())));
        assert_eq!(1, mount.count(&Query::Stylesheet("theme/site.css".to_string())));
    }

    #[tokio::test]
    async fn test_failed_fragment_unload_keeps_import() {
        let mount = MemoryMount::new()
            .with_container("content")
            .with_capabilities(Capabilities::HTML_IMPORTS)
            .with_import("home.html", "<p>home</p>");
        let loader = loader(mount.clone(), MemoryNotifier::settling(Outcome::Loaded));
        assert_eq!(Status::LoadOk, loader.load("home.html").await);

        // Restoring the container fails when the content node is not attached
        let identity = CrcIdentity::default().derive("home.html");
        let resource = ResourceRef::parse("home.html").unwrap();
        let detached = mount.create(Node::content(Identity::new("detached"), "")).unwrap();

        loader
            .unload_fragment(&resource, detached)
            .expect_err("should be an error");
        assert_eq!(1, mount.count(&Query::Import("home.html".to_string())));
        assert_eq!(1, mount.count(&Query::Identity(identity)));
        assert!(loader.is_loaded("home.html"));

        assert_eq!(Status::UnloadOk, loader.unload("home.html"));
        assert_eq!(0, mount.count(&Query::Import("home.html".to_string())));
    }

    #[tokio::test]
    async fn test_load_style_waits_for_completion() {
        let mount = MemoryMount::new();
        let notifier = MemoryNotifier::new();
        let loader = loader(mount.clone(), notifier.clone());

        let (status, _) = tokio::join!(
            loader.load("theme.css"),
            settle_when_pending(&notifier, Outcome::Loaded)
        );
        assert_eq!(Status::LoadOk, status);
        assert_eq!(1, mount.count(&Query::Stylesheet("theme.css".to_string())));

        let head = mount
            .snapshot()
            .attached()
            .filter(|(r, _, _)| *r == Region::Head)
            .count();
        assert_eq!(1, head);
    }

    #[tokio::test]
    async fn test_failed_script_stays_mounted() {
        let mount = MemoryMount::new();
        let notifier = MemoryNotifier::new();
        let loader = loader(mount.clone(), notifier.clone());

        let (status, _) = tokio::join!(
            loader.load("app.js"),
            settle_when_pending(&notifier, Outcome::Failed)
        );
        assert_eq!(Status::LoadError, status);
        assert!(loader.is_loaded("app.js"));
        assert_eq!(Status::FileLoaded, loader.load("app.js").await);
    }

    #[tokio::test]
    async fn test_element_visible_before_completion() {
        let mount = MemoryMount::new();
        let notifier = MemoryNotifier::new();
        let loader = loader(mount.clone(), notifier.clone());

        let check = async {
            while notifier.pending().is_empty() {
                tokio::task::yield_now().await;
            }
            let visible = loader.is_loaded("theme.css");
            notifier.settle_all(Outcome::Loaded);
            visible
        };

        let (status, visible) = tokio::join!(loader.load("theme.css"), check);
        assert!(visible);
        assert_eq!(Status::LoadOk, status);
    }

    #[tokio::test]
    async fn test_completion_timeout() {
        let mount = MemoryMount::new();
        let notifier = MemoryNotifier::new();
        let loader = loader(mount.clone(), notifier.clone()).with_config(
            LoaderConfig::default().with_completion_timeout(Duration::from_millis(20)),
        );

        assert_eq!(Status::LoadError, loader.load("slow.css").await);
        // Insertion already happened, the record stays
        assert!(loader.is_loaded("slow.css"));
        // The abandoned observer is not kept around
        assert!(notifier.pending().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_fragment_loads_reserve_url() {
        let mount = MemoryMount::new()
            .with_container("content")
            .with_capabilities(Capabilities::HTML_IMPORTS)
            .with_import("home.html", "<p>home</p>");
        let notifier = MemoryNotifier::new();
        let loader = loader(mount.clone(), notifier.clone());

        let (first, second, _) = tokio::join!(
            loader.load("home.html"),
            loader.load("home.html"),
            settle_when_pending(&notifier, Outcome::Loaded)
        );

        let mut statuses = vec![first, second];
        statuses.sort_by_key(Status::code);
        assert_eq!(vec![Status::FileLoaded, Status::LoadOk], statuses);
        assert_eq!(1, mount.count(&Query::Import("home.html".to_string())));
        assert!(loader.is_loaded("home.html"));
    }

    #[tokio::test]
    async fn test_dropped_load_releases_url() {
        let mount = MemoryMount::new()
            .with_container("content")
            .with_capabilities(Capabilities::HTML_IMPORTS)
            .with_import("home.html", "<p>home</p>");
        let notifier = MemoryNotifier::new();
        let loader = loader(mount.clone(), notifier.clone());

        tokio::time::timeout(Duration::from_millis(10), loader.load("home.html"))
            .await
            .expect_err("should not complete");

        // Nothing from the dropped load is left behind
        assert_eq!(0, mount.count(&Query::Import("home.html".to_string())));
        assert!(!loader.is_loaded("home.html"));
        notifier.settle_all(Outcome::Loaded);

        let (status, _) = tokio::join!(
            loader.load("home.html"),
            settle_when_pending(&notifier, Outcome::Loaded)
        );
        assert_eq!(Status::LoadOk, status);
        assert_eq!(1, mount.count(&Query::Import("home.html".to_string())));
    }

    #[tokio::test]
    async fn test_failed_import_leaves_no_link() {
        let mount = MemoryMount::new()
            .with_container("content")
            .with_capabilities(Capabilities::HTML_IMPORTS);
        let notifier = MemoryNotifier::new();
        let loader = loader(mount.clone(), notifier.clone());
        let before = mount.snapshot().render();

        let (status, _) = tokio::join!(
            loader.load("broken.html"),
            settle_when_pending(&notifier, Outcome::Failed)
        );
        assert_eq!(Status::LoadError, status);
        assert_eq!(before, mount.snapshot().render());

        // Completed, but the environment resolved no document
        let (status, _) = tokio::join!(
            loader.load("broken.html"),
            settle_when_pending(&notifier, Outcome::Loaded)
        );
        assert_eq!(Status::LoadError, status);
        assert_eq!(before, mount.snapshot().render());
    }

    #[tokio::test]
    async fn test_import_fragment_round_trip() {
        let mount = MemoryMount::new()
            .with_container("content")
            .with_capabilities(Capabilities::HTML_IMPORTS)
            .with_import("home.html", "<p>home</p>");
        let loader = loader(mount.clone(), MemoryNotifier::settling(Outcome::Loaded));

        assert_eq!(Status::LoadOk, loader.load("home.html").await);
        let identity = CrcIdentity::default().derive("home.html");
        let content = mount.find(&Query::Identity(identity.clone())).unwrap();
        assert_eq!(
            Some(Node::content(identity, "<p>home</p>")),
            mount.get(content)
        );
        assert!(loader.container().is_none());

        assert_eq!(Status::UnloadOk, loader.unload("home.html"));
        assert_eq!(0, mount.count(&Query::Import("home.html".to_string())));
        let container = loader.container().unwrap();
        assert_eq!(
            Some(Node::content(Identity::new("content"), "")),
            mount.get(container)
        );
    }

    #[tokio::test]
    async fn test_fragment_fallback_when_imports_disabled() {
        let mount = MemoryMount::new()
            .with_container("main")
            .with_capabilities(Capabilities::HTML_IMPORTS);
        let transport = MemoryTransport::new().with_body("home.html", "<p>home</p>");
        let loader = Loader::new(mount.clone(), MemoryNotifier::new(), transport).with_config(
            LoaderConfig::default()
                .with_container_id("main")
                .without_html_imports(),
        );

        assert_eq!(Status::LoadOk, loader.load("home.html").await);
        assert_eq!(0, mount.count(&Query::Import("home.html".to_string())));
        assert!(loader.is_loaded("home.html"));
    }

    #[tokio::test]
    async fn test_fragment_body_must_be_utf8() {
        let mount = MemoryMount::new().with_container("content");
        let transport = MemoryTransport::new().with_body("bin.html", vec![0xff, 0xfe, 0x00]);
        let loader = Loader::new(mount.clone(), MemoryNotifier::new(), transport);
        let before = mount.snapshot().render();

        assert_eq!(Status::LoadError, loader.load("bin.html").await);
        assert_eq!(before, mount.snapshot().render());
    }

    #[tokio::test]
    async fn test_second_fragment_needs_container() {
        let mount = MemoryMount::new().with_container("content");
        let transport = MemoryTransport::new()
            .with_body("a.html", "<p>a</p>")
            .with_body("b.html", "<p>b</p>");
        let loader = Loader::new(mount.clone(), MemoryNotifier::new(), transport);

        assert_eq!(Status::LoadOk, loader.load("a.html").await);
        assert_eq!(Status::MissingContentDiv, loader.load("b.html").await);

        assert_eq!(Status::UnloadOk, loader.unload("a.html"));
        assert_eq!(Status::LoadOk, loader.load("b.html").await);
    }

    #[tokio::test]
    async fn test_callbacks_receive_status() {
        let loader = loader(MemoryMount::new(), MemoryNotifier::settling(Outcome::Loaded));

        let mut seen = vec![];
        loader.load_with("a.css", |s| seen.push(s)).await;
        loader.load_with("a.css", |s| seen.push(s)).await;
        loader.unload_with("a.css", |s| seen.push(s));
        loader.unload_with("", |s| seen.push(s));

        assert_eq!(
            vec![
                Status::LoadOk,
                Status::FileLoaded,
                Status::UnloadOk,
                Status::UrlNotDefined
            ],
            seen
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_load_logs_transitions() {
        let loader = loader(MemoryMount::new(), MemoryNotifier::settling(Outcome::Loaded));

        loader.load("a.css").await;
        loader.load("a.css").await;
        loader.load("a.xyz").await;

        assert!(logs_contain("Load a.css (style) -> LOAD_OK"));
        assert!(logs_contain("already loaded"));
        assert!(logs_contain("unsupported kind"));
    }
}
