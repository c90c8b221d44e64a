use std::path::PathBuf;
use std::sync::Arc;

use ndarray::{Array4, ArrayD};
use thiserror::Error;

use crate::models::domain::model_descriptor::ModelSource;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("model weights not found at {0}")]
    Missing(PathBuf),
    #[error("failed to load model {path}: {message}")]
    Session { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("inference run failed: {0}")]
    Run(String),
    #[error("failed to extract output tensor: {0}")]
    Extract(String),
    #[error("model produced no outputs")]
    NoOutputs,
    #[error("unexpected model output shape: {0:?}")]
    UnexpectedOutputShape(Vec<usize>),
}

/// A loaded model ready to execute.
///
/// Implementations must be shareable across threads; how many calls run at
/// once is bounded by the caller's [`ThreadGate`](crate::inference::thread_gate::ThreadGate).
pub trait InferenceSession: Send + Sync {
    /// Run one forward pass binding `tensor` to the input named `input_name`,
    /// returning the first output.
    fn run(&self, input_name: &str, tensor: Array4<f32>) -> Result<ArrayD<f32>, InferenceError>;
}

/// Creates sessions for the [`InferencePool`](crate::inference::inference_pool::InferencePool).
pub trait SessionLoader: Send + Sync {
    fn load(
        &self,
        model_name: &str,
        source: &ModelSource,
    ) -> Result<Arc<dyn InferenceSession>, ModelLoadError>;
}
