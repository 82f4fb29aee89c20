use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::headshot::payload::ImagePayload;
use crate::headshot::prompt::build_headshot_prompt;
use crate::headshot::styles::{BackgroundStyle, SuitStyle};
use crate::llm::gemini::{ImageTransformer, TransformError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("A headshot is already being generated, please wait.")]
    Busy,
}

/// Screen the shell should show, derived from the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Empty,
    Configuring,
    Processing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    original_image: Option<ImagePayload>,
    result_image: Option<ImagePayload>,
    is_processing: bool,
    error_message: Option<String>,
    suit_style: SuitStyle,
    background_style: BackgroundStyle,
}

impl SessionState {
    pub fn original_image(&self) -> Option<&ImagePayload> {
        self.original_image.as_ref()
    }

    pub fn result_image(&self) -> Option<&ImagePayload> {
        self.result_image.as_ref()
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn suit_style(&self) -> SuitStyle {
        self.suit_style
    }

    pub fn background_style(&self) -> BackgroundStyle {
        self.background_style
    }
}

/// Snapshot handed to the transform client while the session is processing.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub original: ImagePayload,
    pub prompt: String,
    pub suit_style: SuitStyle,
    pub background_style: BackgroundStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    Skipped,
    Completed(ImagePayload),
    Failed(String),
}

/// Owns one user's session state; intents are the only way to mutate it.
#[derive(Debug, Clone, Default)]
pub struct HeadshotSession {
    state: SessionState,
}

impl HeadshotSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn screen(&self) -> Screen {
        if self.state.is_processing {
            Screen::Processing
        } else if self.state.original_image.is_some() {
            Screen::Configuring
        } else {
            Screen::Empty
        }
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.state.is_processing {
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    pub fn upload(&mut self, image: ImagePayload) -> Result<(), SessionError> {
        self.ensure_idle()?;
        debug!(mime_type = %image.mime_type, bytes = image.approx_len(), "Original image uploaded");
        self.state.original_image = Some(image);
        self.state.result_image = None;
        self.state.error_message = None;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.state.original_image = None;
        self.state.result_image = None;
        self.state.error_message = None;
        Ok(())
    }

    pub fn set_suit_style(&mut self, style: SuitStyle) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.state.suit_style = style;
        Ok(())
    }

    pub fn set_background_style(&mut self, style: BackgroundStyle) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.state.background_style = style;
        Ok(())
    }

    /// Marks the session as processing and returns what the client needs.
    /// `Ok(None)` means there is no photo to transform.
    pub fn begin_transform(&mut self) -> Result<Option<TransformRequest>, SessionError> {
        self.ensure_idle()?;
        let Some(original) = self.state.original_image.clone() else {
            return Ok(None);
        };

        self.state.is_processing = true;
        self.state.error_message = None;
        self.state.result_image = None;

        Ok(Some(TransformRequest {
            prompt: build_headshot_prompt(self.state.suit_style, self.state.background_style),
            original,
            suit_style: self.state.suit_style,
            background_style: self.state.background_style,
        }))
    }

    pub fn finish_transform(
        &mut self,
        result: Result<ImagePayload, TransformError>,
    ) -> TransformOutcome {
        self.state.is_processing = false;
        match result {
            Ok(image) => {
                info!(mime_type = %image.mime_type, bytes = image.approx_len(), "Headshot transform succeeded");
                self.state.result_image = Some(image.clone());
                TransformOutcome::Completed(image)
            }
            Err(err) => {
                let message = err.user_message();
                warn!("Headshot transform failed: {}", err);
                self.state.error_message = Some(message.clone());
                TransformOutcome::Failed(message)
            }
        }
    }

    pub async fn transform(
        &mut self,
        client: &dyn ImageTransformer,
    ) -> Result<TransformOutcome, SessionError> {
        let Some(request) = self.begin_transform()? else {
            return Ok(TransformOutcome::Skipped);
        };
        let result = client.transform(&request.original, &request.prompt).await;
        Ok(self.finish_transform(result))
    }
}

/// Sessions keyed by conversation; each key gets defaults on first use.
#[derive(Debug)]
pub struct SessionStore<K> {
    sessions: Arc<Mutex<HashMap<K, HeadshotSession>>>,
}

impl<K> Clone for SessionStore<K> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<K> Default for SessionStore<K> {
    fn default() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> SessionStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `apply` against the session for `key` under the store lock.
    pub fn with_session<R>(&self, key: &K, apply: impl FnOnce(&mut HeadshotSession) -> R) -> R {
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(key.clone()).or_default();
        apply(session)
    }

    pub fn snapshot(&self, key: &K) -> HeadshotSession {
        self.sessions.lock().get(key).cloned().unwrap_or_default()
    }

    pub fn remove(&self, key: &K) -> Option<HeadshotSession> {
        self.sessions.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Reset intent under a single lock; a session left with default styles
    /// is dropped from the store.
    pub fn reset_and_prune(&self, key: &K) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.get_mut(key) else {
            return Ok(());
        };
        session.reset()?;
        let current = session.state();
        if current.suit_style() == SuitStyle::default()
            && current.background_style() == BackgroundStyle::default()
        {
            sessions.remove(key);
        }
        Ok(())
    }

    /// Transforms without holding the lock across the remote call.
    pub async fn transform(
        &self,
        key: &K,
        client: &dyn ImageTransformer,
    ) -> Result<TransformOutcome, SessionError> {
        let Some(request) = self.with_session(key, |session| session.begin_transform())? else {
            return Ok(TransformOutcome::Skipped);
        };
        Ok(self.run_transform(key, &request, client).await)
    }

    /// Completes a transform started with `begin_transform`. The session leaves
    /// the processing state even if this future is dropped or the client panics.
    pub async fn run_transform(
        &self,
        key: &K,
        request: &TransformRequest,
        client: &dyn ImageTransformer,
    ) -> TransformOutcome {
        let mut in_flight = InFlight {
            store: self,
            key,
            finished: false,
        };
        let result = client.transform(&request.original, &request.prompt).await;
        in_flight.finished = true;
        self.with_session(key, |session| session.finish_transform(result))
    }
}

struct InFlight<'a, K: Eq + Hash + Clone> {
    store: &'a SessionStore<K>,
    key: &'a K,
    finished: bool,
}

impl<K: Eq + Hash + Clone> Drop for InFlight<'_, K> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Headshot transform abandoned before completion");
        self.store.with_session(self.key, |session| {
            session.finish_transform(Err(TransformError::Request(String::new())))
        });
    }
}
