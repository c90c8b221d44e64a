use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::inference::domain::inference_session::{InferenceSession, ModelLoadError, SessionLoader};
use crate::models::domain::model_descriptor::ModelSource;

/// Loaded sessions keyed by model name.
pub type SessionSet = HashMap<String, Arc<dyn InferenceSession>>;

/// Process-wide registry of loaded inference sessions.
///
/// Owned by the composition root and shared through `Arc`. A model is loaded
/// on first request and reused by every later caller until [`clear`](Self::clear)
/// evicts it. Evicting never pulls a session out from under an in-flight
/// call: the caller holds its own `Arc` until it is done.
pub struct InferencePool {
    loader: Box<dyn SessionLoader>,
    sessions: Mutex<SessionSet>,
}

impl InferencePool {
    pub fn new(loader: Box<dyn SessionLoader>) -> Self {
        Self {
            loader,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Session for `model_name`, loading it from `source` on first use.
    ///
    /// Loading happens under the pool lock, so concurrent first requests
    /// load the model once.
    pub fn get(
        &self,
        model_name: &str,
        source: &ModelSource,
    ) -> Result<Arc<dyn InferenceSession>, ModelLoadError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get(model_name) {
            return Ok(Arc::clone(session));
        }

        let session = self.loader.load(model_name, source)?;
        sessions.insert(model_name.to_string(), Arc::clone(&session));
        Ok(session)
    }

    /// Sessions for several models at once. Fails on the first model that
    /// cannot be loaded; models loaded before it stay pooled.
    pub fn get_all(&self, models: &[(&str, &ModelSource)]) -> Result<SessionSet, ModelLoadError> {
        let mut set = SessionSet::new();
        for &(name, source) in models {
            set.insert(name.to_string(), self.get(name, source)?);
        }
        Ok(set)
    }

    /// Evict the named models. Names that were never loaded are ignored.
    pub fn clear(&self, model_names: &[&str]) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        for name in model_names {
            if sessions.remove(*name).is_some() {
                log::info!("Released inference session for {name}");
            }
        }
    }

    pub fn contains(&self, model_name: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(model_name)
    }
}
