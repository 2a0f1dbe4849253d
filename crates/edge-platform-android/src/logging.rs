//! Tracing setup for the native library

use std::sync::OnceLock;

use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER: OnceLock<FilterHandle> = OnceLock::new();

/// Install the global subscriber on the first call. Later calls swap in
/// `filter` through the reload handle.
///
/// An unparsable `filter` falls back to `info`.
pub fn init(filter: &str) {
    if let Some(handle) = FILTER.get() {
        if reload_filter(handle, filter) {
            tracing::info!(filter, "EdgeDetection log filter updated");
        }
        return;
    }

    let (filter_layer, handle) = reload::Layer::new(parse_filter(filter));
    if FILTER.set(handle).is_err() {
        // Another thread installed first; apply ours on top of it
        return init(filter);
    }

    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_target(true))
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(filter, "EdgeDetection native logging ready");
    }
}

fn parse_filter(filter: &str) -> EnvFilter {
    EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn reload_filter(handle: &FilterHandle, filter: &str) -> bool {
    match handle.reload(parse_filter(filter)) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(filter, "could not update log filter: {}", e);
            false
        }
    }
}
