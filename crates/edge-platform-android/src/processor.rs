//! Process-wide processor instance behind the JNI exports
//!
//! JNI static methods carry no handle, so the bridge has to live in a
//! static. Everything else in the call path takes it by reference.

use edge_core::{EdgeBridge, ProcessorConfig};

use crate::error::AndroidError;
use crate::logging;

static BRIDGE: EdgeBridge = EdgeBridge::new();

/// The bridge shared by every JNI call in this process
pub fn bridge() -> &'static EdgeBridge {
    &BRIDGE
}

/// (Re)create the processor with default settings
pub fn init_processor() {
    let config = ProcessorConfig::default();
    logging::init(&config.log_filter);
    BRIDGE.init_with_config(config);
}

/// (Re)create the processor from a JSON config.
///
/// A malformed config leaves the current processor untouched.
pub fn init_processor_with_config(config_json: &str) -> Result<(), AndroidError> {
    let config = ProcessorConfig::from_json(config_json)?;
    logging::init(&config.log_filter);
    BRIDGE.init_with_config(config);
    Ok(())
}
