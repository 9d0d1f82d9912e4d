/// Creates a runtime builder for driving a loader,
///
/// **Note**: Loads are single-threaded and cooperative, a document mount is not meant to
/// be shared between worker threads. The returned builder is a current-thread runtime w/
/// the io and time drivers enabled, time is needed for completion timeouts.
///
pub fn new_runtime() -> tokio::runtime::Builder {
    let mut runtime = tokio::runtime::Builder::new_current_thread();
    runtime
        .enable_all()
        .on_thread_start(|| tracing::trace!("Loader runtime started"));
    runtime
}
