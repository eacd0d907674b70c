// Scripted completion backend for tests

use super::{CompletionError, CompletionRequest, TextCompletion};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Responder = dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync;

struct Scripted {
    delay: Duration,
    outcome: Result<String, CompletionError>,
}

/// Replays queued outcomes in order, then falls back to a responder.
///
/// Delays use `tokio::time::sleep`, so tests can run under paused time.
pub(crate) struct ScriptedCompletion {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Box<Responder>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    /// Fails every call once the script runs out
    pub fn new() -> Self {
        Self::with_responder(|_| Err(CompletionError::Backend("script exhausted".to_string())))
    }

    pub fn with_responder(
        responder: impl Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Box::new(responder),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call with the same error
    pub fn always_failing(err: CompletionError) -> Self {
        Self::with_responder(move |_| Err(err.clone()))
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Duration::ZERO, Ok(text.to_string()))
    }

    pub fn reply_after(self, delay: Duration, text: &str) -> Self {
        self.push(delay, Ok(text.to_string()))
    }

    pub fn fail(self, err: CompletionError) -> Self {
        self.push(Duration::ZERO, Err(err))
    }

    fn push(self, delay: Duration, outcome: Result<String, CompletionError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted { delay, outcome });
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(scripted) => {
                if !scripted.delay.is_zero() {
                    tokio::time::sleep(scripted.delay).await;
                }
                scripted.outcome
            }
            None => (self.fallback)(request),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
