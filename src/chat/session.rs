use super::client::{ChatClient, ChatTurn, CompletionRequest};
use crate::config::ApiConfig;
use crate::error::ChatError;
use crate::persona::Character;
use crate::pipeline::{FormatParser, MessageSegment, RandomSource, ResponseProcessor, ThreadRandom};
use crate::prompt::{PromptStore, TeraEngine, build_system_prompt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// User and assistant turns kept for context; the system prompt is extra.
pub const MAX_HISTORY_TURNS: usize = 20;

/// One conversation with one character.
pub struct ChatSession {
    character: Character,
    client: Arc<dyn ChatClient>,
    prompts: Arc<PromptStore>,
    processor: ResponseProcessor,
    parser: FormatParser,
    api: ApiConfig,
    engine: TeraEngine,
    turns: VecDeque<ChatTurn>,
    rng: Box<dyn RandomSource>,
}

impl ChatSession {
    pub fn new(
        character: Character,
        client: Arc<dyn ChatClient>,
        prompts: Arc<PromptStore>,
        processor: ResponseProcessor,
        parser: FormatParser,
        api: ApiConfig,
    ) -> Self {
        Self {
            character,
            client,
            prompts,
            processor,
            parser,
            api,
            engine: TeraEngine::new(),
            turns: VecDeque::with_capacity(MAX_HISTORY_TURNS),
            rng: Box::new(ThreadRandom),
        }
    }

    /// Random source for segment timing.
    #[must_use]
    pub fn with_rng(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn turns(&self) -> impl Iterator<Item = &ChatTurn> {
        self.turns.iter()
    }

    pub fn processor(&self) -> &ResponseProcessor {
        &self.processor
    }

    /// The character's greeting as an opening message, if it has one.
    pub fn greeting(&mut self) -> Option<MessageSegment> {
        let greeting = self.character.greeting.trim().to_string();
        if greeting.is_empty() {
            return None;
        }
        let segment =
            MessageSegment::plain(greeting.clone(), &self.character.name, &self.character.id);
        self.record(ChatTurn::assistant(greeting));
        Some(segment)
    }

    /// Run one turn: ask the model, post-process the reply and split it into
    /// display segments. Conversation turns only change when the turn
    /// succeeds; a blank completion leaves the processor untouched too.
    pub async fn send(
        &mut self,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<MessageSegment>, ChatError> {
        let request = self.build_request(user_text).await;
        let raw = self.client.complete(&request, cancel).await?;
        if raw.trim().is_empty() {
            return Err(ChatError::EmptyResponse);
        }

        let text = self.processor.process(&raw, &self.character);
        if text.trim().is_empty() {
            return Err(ChatError::EmptyResponse);
        }

        let mut segments = self
            .parser
            .parse(&text, &self.character.id, self.rng.as_mut());
        if segments.is_empty() {
            segments.push(MessageSegment::plain(
                text.clone(),
                &self.character.name,
                &self.character.id,
            ));
        }

        self.record(ChatTurn::user(user_text));
        self.record(ChatTurn::assistant(text));
        Ok(segments)
    }

    pub async fn build_request(&mut self, user_text: &str) -> CompletionRequest {
        let mut messages = Vec::with_capacity(self.turns.len() + 2);
        messages.push(ChatTurn::system(self.system_prompt().await));
        messages.extend(self.turns.iter().cloned());
        messages.push(ChatTurn::user(user_text));

        CompletionRequest {
            model: self.api.model.clone(),
            messages,
            temperature: self.api.temperature,
            max_tokens: self.api.max_tokens,
        }
    }

    async fn system_prompt(&mut self) -> String {
        let prompts = self.prompts.enabled().await;
        match build_system_prompt(&mut self.engine, &self.character, &prompts) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!("failed to render system prompt, using a minimal one: {e}");
                format!("你是{}。", self.character.name)
            }
        }
    }

    fn record(&mut self, turn: ChatTurn) {
        while self.turns.len() >= MAX_HISTORY_TURNS {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }
}
