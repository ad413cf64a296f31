//! Shared test utilities

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use voxchat::{Error, GenerateRequest, Generation, Result, TextGenerator};

/// Scripted backend: pops one canned outcome per call and records every
/// request it sees.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    script: Arc<Mutex<VecDeque<Option<Generation>>>>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl ScriptedGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful generation
    pub fn push_text(&self, text: &str, context: Option<Vec<i64>>) {
        self.script.lock().unwrap().push_back(Some(Generation {
            text: text.to_string(),
            context,
        }));
    }

    /// Queue a transport failure
    pub fn push_failure(&self) {
        self.script.lock().unwrap().push_back(None);
    }

    /// Every request seen so far, in order
    #[must_use]
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls made
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, req: GenerateRequest) -> Result<Generation> {
        self.requests.lock().unwrap().push(req);
        match self.script.lock().unwrap().pop_front() {
            Some(Some(generation)) => Ok(generation),
            Some(None) => Err(Error::Backend("scripted failure".to_string())),
            None => Ok(Generation {
                text: "Fine.".to_string(),
                context: None,
            }),
        }
    }
}
