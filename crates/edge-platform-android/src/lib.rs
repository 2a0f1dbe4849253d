//! Edge-detect native library for Android
//!
//! This crate provides the JNI exports loaded by the Kotlin
//! `ImageProcessingJNI` object and forwards every call into the shared
//! [`edge_core::EdgeBridge`].

mod error;
mod logging;
mod processor;

// Re-export main types
pub use error::AndroidError;
pub use processor::{bridge, init_processor, init_processor_with_config};

// JNI bindings - only compile on Android targets
#[cfg(target_os = "android")]
mod jni_bindings;
