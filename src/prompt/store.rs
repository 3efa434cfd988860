use crate::error::StorageError;
use crate::storage::{KeyValueStore, load_json, save_json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const PROMPTS_KEY: &str = "system_prompts";
pub const STRICT_LENGTH_CONTROL_ID: &str = "strict_length_control";
pub const INLINE_FORMAT_GUIDE_ID: &str = "inline_format_guide";

const STRICT_LENGTH_CONTROL: &str = "回复要像真人聊天一样简短自然：每条消息不超过50个字，最多两句话。\
不要使用“首先”“其次”“然后”“最后”这类列举用语，不要换行，不要使用冒号。";

const INLINE_FORMAT_GUIDE: &str = "\
需要分成多条消息或表达特殊效果时，使用以下格式：
[名字|内容] 普通消息
<名字|表情> 表情
[名字|语音|时长|内容] 语音消息
{名字|内容} 发出后撤回的消息
[名字|引用|被引用者|被引用内容|回复内容] 引用回复
【心声|名字|内心想法】 心声
「随笔|名字|随笔内容」 随笔
<系统>内容</系统> 系统提示
<旁白>内容</旁白> 旁白";

/// A named block of instructions appended to every character's system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPrompt {
    pub id: String,
    pub name: String,
    pub content: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

pub fn default_prompts() -> Vec<SystemPrompt> {
    vec![
        SystemPrompt {
            id: STRICT_LENGTH_CONTROL_ID.to_string(),
            name: "严格长度控制".to_string(),
            content: STRICT_LENGTH_CONTROL.to_string(),
            enabled: true,
        },
        SystemPrompt {
            id: INLINE_FORMAT_GUIDE_ID.to_string(),
            name: "消息格式说明".to_string(),
            content: INLINE_FORMAT_GUIDE.to_string(),
            enabled: true,
        },
    ]
}

/// System prompts persisted as one JSON list in the key-value store.
///
/// Reads never fail: a missing or unreadable list yields the defaults.
pub struct PromptStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl PromptStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn list(&self) -> Vec<SystemPrompt> {
        match load_json::<Vec<SystemPrompt>>(self.store.as_ref(), PROMPTS_KEY).await {
            Ok(Some(prompts)) => prompts,
            Ok(None) => default_prompts(),
            Err(e) => {
                tracing::warn!("failed to load system prompts, using defaults: {e}");
                default_prompts()
            }
        }
    }

    pub async fn get(&self, id: &str) -> Option<SystemPrompt> {
        self.list().await.into_iter().find(|prompt| prompt.id == id)
    }

    pub async fn enabled(&self) -> Vec<SystemPrompt> {
        self.list()
            .await
            .into_iter()
            .filter(|prompt| prompt.enabled)
            .collect()
    }

    /// Replace the prompt with the same id, or append it.
    pub async fn upsert(&self, prompt: SystemPrompt) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut prompts = self.list().await;
        match prompts.iter_mut().find(|existing| existing.id == prompt.id) {
            Some(existing) => *existing = prompt,
            None => prompts.push(prompt),
        }
        save_json(self.store.as_ref(), PROMPTS_KEY, &prompts).await
    }

    pub async fn reset_defaults(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        save_json(self.store.as_ref(), PROMPTS_KEY, &default_prompts()).await
    }
}
