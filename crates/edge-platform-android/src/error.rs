//! Error types for the Android platform layer

use edge_core::EdgeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AndroidError {
    #[error("JNI error: {0}")]
    Jni(String),

    #[error(transparent)]
    Edge(#[from] EdgeError),
}

impl From<jni::errors::Error> for AndroidError {
    fn from(e: jni::errors::Error) -> Self {
        AndroidError::Jni(e.to_string())
    }
}
