//! Scripted text service for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use harvest_core::{HarvestError, Result};

use crate::service::{GenerateOptions, TextService};

/// One canned answer.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Answer with this text.
    Text(String),
    /// Fail with an external service error.
    Fail(String),
    /// Never answer (until the caller's timeout fires).
    Hang,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedReply::Text(text.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ScriptedReply::Fail(message.into())
    }
}

/// A call the service received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub options: GenerateOptions,
}

/// Replays queued replies in order and records every call.
/// Once the queue is empty every call fails.
#[derive(Debug, Default)]
pub struct ScriptedTextService {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTextService {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue another reply.
    pub fn push(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .expect("scripted replies poisoned")
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("scripted calls poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("scripted calls poisoned").len()
    }
}

#[async_trait]
impl TextService for ScriptedTextService {
    async fn generate(&self, system: &str, user: &str, options: &GenerateOptions) -> Result<String> {
        self.calls
            .lock()
            .expect("scripted calls poisoned")
            .push(RecordedCall {
                system: system.to_string(),
                user: user.to_string(),
                options: options.clone(),
            });

        let reply = self
            .replies
            .lock()
            .expect("scripted replies poisoned")
            .pop_front();

        match reply {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(message)) => Err(HarvestError::ExternalService(message)),
            Some(ScriptedReply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(HarvestError::ExternalService("hung call resumed".to_string()))
            }
            None => Err(HarvestError::ExternalService("script exhausted".to_string())),
        }
    }
}
