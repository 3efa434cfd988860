use crate::pipeline::{DisplaySink, MessageSegment, MessageType, SinkFuture};
use crate::ui::style as ui;
use console::Term;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Terminal rendering of chat segments.
#[derive(Default)]
pub struct ConsoleSink {
    /// Speaker of each shown message, for retraction notices.
    shown: Mutex<HashMap<String, String>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySink for ConsoleSink {
    fn add_message<'a>(&'a self, segment: &'a MessageSegment) -> SinkFuture<'a> {
        Box::pin(async move {
            self.shown
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(segment.id.clone(), segment.original_sender.clone());
            println!("{}", render_segment(segment));
        })
    }

    fn retract_message<'a>(&'a self, id: &'a str) -> SinkFuture<'a> {
        Box::pin(async move {
            let speaker = self
                .shown
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(id);
            if let Some(speaker) = speaker {
                println!("{}", ui::retracted(format!("{speaker} 撤回了一条消息")));
            }
        })
    }

    fn typing_started(&self, speaker: &str) {
        let _ = Term::stdout().write_str(&ui::dim(format!("{speaker} 正在输入…")));
    }

    fn typing_ended(&self) {
        let _ = Term::stdout().clear_line();
    }
}

pub fn render_segment(segment: &MessageSegment) -> String {
    let speaker = &segment.original_sender;
    let content = &segment.content;
    match segment.message_type {
        MessageType::Text => format!("{}: {content}", ui::speaker(speaker)),
        MessageType::Emoji => format!("{}: [{content}]", ui::speaker(speaker)),
        MessageType::Voice => {
            let duration = segment.voice_duration.as_deref().unwrap_or("?");
            format!("{}: 🎤 {duration} {content}", ui::speaker(speaker))
        }
        MessageType::Quote => match &segment.quote {
            Some(quote) => format!(
                "{}: {}\n  {content}",
                ui::speaker(speaker),
                ui::dim(format!("「{}: {}」", quote.sender, quote.text))
            ),
            None => format!("{}: {content}", ui::speaker(speaker)),
        },
        MessageType::InnerVoice => ui::inner(format!("（{speaker}的心声）{content}")),
        MessageType::Essay => ui::inner(format!("《{speaker}的随笔》\n{content}")),
        MessageType::System => ui::notice(format!("[系统] {content}")),
        MessageType::Narrator => ui::notice(format!("（{content}）")),
    }
}
