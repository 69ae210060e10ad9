use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{InferenceClient, InferenceError, InferenceRequest};

/// Mock inference client for testing. Replays scripted completions or errors.
///
/// Scripted replies are consumed in order; once only one remains it is
/// repeated for every further call. Every request is recorded.
pub struct MockInferenceClient {
    replies: Mutex<VecDeque<Result<String, InferenceError>>>,
    requests: Mutex<Vec<InferenceRequest>>,
    calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockInferenceClient {
    pub fn new(response: &str) -> Self {
        Self::with_replies(vec![Ok(response.to_string())])
    }

    pub fn failing(error: InferenceError) -> Self {
        Self::with_replies(vec![Err(error)])
    }

    pub fn with_responses(responses: &[&str]) -> Self {
        Self::with_replies(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_replies(replies: Vec<Result<String, InferenceError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<InferenceRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_request(&self) -> Option<InferenceRequest> {
        lock(&self.requests).last().cloned()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn infer(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(request.clone());

        let mut replies = lock(&self.replies);
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply.unwrap_or_else(|| Ok(String::new()))
    }
}
