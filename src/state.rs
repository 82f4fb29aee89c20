use std::sync::Arc;

use teloxide::types::ChatId;

use crate::headshot::SessionStore;
use crate::llm::ImageTransformer;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore<ChatId>,
    pub transformer: Arc<dyn ImageTransformer>,
    pub model_name: String,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        transformer: Arc<dyn ImageTransformer>,
        model_name: impl Into<String>,
        max_upload_bytes: usize,
    ) -> Self {
        AppState {
            sessions: SessionStore::new(),
            transformer,
            model_name: model_name.into(),
            max_upload_bytes,
        }
    }
}
