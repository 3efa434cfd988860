#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use charachat::Config;
use charachat::app::AppContext;
use charachat::chat::{ChatClient, ChatFuture, CompletionRequest};
use charachat::config::DisplayConfig;
use charachat::error::{ChatError, StorageError};
use charachat::persona::{Character, VoiceStyle};
use charachat::storage::{KeyValueStore, MemoryStore, StoreFuture};
use tokio_util::sync::CancellationToken;

/// Replays canned completions in order and keeps every request it saw.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, ChatError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::default();
        for reply in replies {
            client.push(Ok(reply.into()));
        }
        client
    }

    pub fn push(&self, reply: Result<String, ChatError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_system_prompt(&self) -> String {
        let requests = self.requests.lock().unwrap();
        let request = requests.last().expect("at least one request");
        request.messages[0].content.clone()
    }
}

impl ChatClient for ScriptedClient {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
        cancel: &'a CancellationToken,
    ) -> ChatFuture<'a> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            if cancel.is_cancelled() {
                return Err(ChatError::Cancelled);
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ChatError::EmptyResponse))
        })
    }
}

/// Reads find nothing and every write fails, like a full disk.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<serde_json::Value>> {
        Box::pin(async { Ok(None) })
    }

    fn set<'a>(&'a self, _key: &'a str, _value: serde_json::Value) -> StoreFuture<'a, ()> {
        Box::pin(async { Err(StorageError::Io(std::io::Error::other("disk full"))) })
    }
}

/// Defaults with no delays and no random decoration.
pub fn quiet_config() -> Config {
    let mut config = Config::default();
    config.response.enhance = false;
    config.display = DisplayConfig::instant();
    config
}

pub fn character() -> Character {
    Character {
        description: "街角咖啡店的店员".into(),
        personality: "温柔，有点害羞".into(),
        greeting: "欢迎光临～".into(),
        voice_style: VoiceStyle::Gentle,
        ..Character::new("小雪")
    }
}

pub async fn context_with(client: Arc<ScriptedClient>) -> AppContext {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    AppContext::with_parts(quiet_config(), store, client).await
}

pub async fn context_over(store: Arc<dyn KeyValueStore>, client: Arc<ScriptedClient>) -> AppContext {
    AppContext::with_parts(quiet_config(), store, client).await
}
