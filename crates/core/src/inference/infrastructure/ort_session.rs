//! ONNX Runtime backed sessions via `ort`.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use ndarray::{Array4, ArrayD};

use crate::inference::domain::inference_session::{
    InferenceError, InferenceSession, ModelLoadError, SessionLoader,
};
use crate::models::domain::model_descriptor::ModelSource;

/// One loaded ONNX model.
///
/// `ort` requires exclusive access to run a session, so calls on the same
/// session are serialized here; the thread gate bounds calls across sessions.
pub struct OrtSession {
    session: Mutex<ort::session::Session>,
}

impl OrtSession {
    pub fn from_file(model_path: &Path) -> Result<Self, ModelLoadError> {
        if !model_path.is_file() {
            return Err(ModelLoadError::Missing(model_path.to_path_buf()));
        }
        let load_err = |message: String| ModelLoadError::Session {
            path: model_path.to_path_buf(),
            message,
        };

        let session = ort::session::Session::builder()
            .map_err(|e| load_err(e.to_string()))?
            .with_execution_providers(preferred_execution_providers())
            .map_err(|e| load_err(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| load_err(e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl InferenceSession for OrtSession {
    fn run(&self, input_name: &str, tensor: Array4<f32>) -> Result<ArrayD<f32>, InferenceError> {
        let input_value =
            ort::value::Tensor::from_array(tensor).map_err(|e| InferenceError::Run(e.to_string()))?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![input_name => input_value])
            .map_err(|e| InferenceError::Run(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(InferenceError::NoOutputs);
        }

        let detection = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| InferenceError::Extract(e.to_string()))?;
        Ok(detection.to_owned())
    }
}

/// Loads sessions from the local weight file of a model source.
#[derive(Default)]
pub struct OrtSessionLoader;

impl SessionLoader for OrtSessionLoader {
    fn load(
        &self,
        model_name: &str,
        source: &ModelSource,
    ) -> Result<Arc<dyn InferenceSession>, ModelLoadError> {
        log::info!("Loading {model_name} from {}", source.path.display());
        Ok(Arc::new(OrtSession::from_file(&source.path)?))
    }
}

/// Platform accelerator first; ONNX Runtime falls back to CPU when it is
/// unavailable.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
