use std::sync::{Arc, Mutex};
use std::time::Duration;

use charachat::config::{DisplayConfig, ResponseConfig, RewriterConfig, SimilarityConfig};
use charachat::pipeline::{
    DisplaySink, FixedRandom, FormatParser, MessageDisplaySequencer, MessageSegment, MessageType,
    ResponseProcessor, SinkFuture, ViolationType,
};
use charachat::utils::text::{char_count, sentence_count};

use crate::chat_harness::character;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl DisplaySink for RecordingSink {
    fn add_message<'a>(&'a self, segment: &'a MessageSegment) -> SinkFuture<'a> {
        Box::pin(async move {
            self.events
                .lock()
                .unwrap()
                .push(format!("add:{}", segment.content));
        })
    }

    fn retract_message<'a>(&'a self, id: &'a str) -> SinkFuture<'a> {
        Box::pin(async move {
            self.events.lock().unwrap().push(format!("retract:{id}"));
        })
    }

    fn typing_started(&self, speaker: &str) {
        self.events.lock().unwrap().push(format!("typing:{speaker}"));
    }

    fn typing_ended(&self) {
        self.events.lock().unwrap().push("typed".to_string());
    }
}

fn processor() -> ResponseProcessor {
    ResponseProcessor::new(
        ResponseConfig::default(),
        SimilarityConfig::default(),
        RewriterConfig::default(),
    )
    .with_rng(Box::new(FixedRandom(0.99)))
}

#[tokio::test(start_paused = true)]
async fn structured_reply_is_shown_in_order_then_retracted() {
    let display = DisplayConfig::default();
    let raw = "[小雪|今天好冷]\n\n\n\n{小雪|其实我有点想你}\n<旁白>窗外开始下雪</旁白>";

    let outcome = processor().process_detailed(raw, &character());
    assert!(outcome.structured);
    assert!(outcome.violations.is_empty());

    let segments =
        FormatParser::new(display.clone()).parse(&outcome.text, "xue", &mut FixedRandom(0.0));
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[2].message_type, MessageType::Narrator);
    let retracted_id = segments[1].id.clone();
    assert!(segments[1].should_retract());

    let sink = Arc::new(RecordingSink::default());
    let sequencer = MessageDisplaySequencer::new(sink.clone(), display.typing_duration());
    assert!(sequencer.display_messages(segments).await);
    assert!(!sequencer.is_displaying());

    assert_eq!(
        sink.events(),
        [
            "typing:小雪",
            "typed",
            "add:今天好冷",
            "add:其实我有点想你",
            "add:窗外开始下雪",
        ]
    );

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(
        sink.events().last().map(String::as_str),
        Some(format!("retract:{retracted_id}").as_str())
    );
}

#[tokio::test(start_paused = true)]
async fn rambling_plain_reply_is_trimmed_into_one_bubble() {
    let raw = "首先，我想说今天的天气真的很不错。其次：我们可以一起去公园散步！\n然后去吃好吃的冰淇淋吧？最后我们一起回家。";

    let outcome = processor().process_detailed(raw, &character());
    assert!(!outcome.structured);
    assert!(char_count(&outcome.text) <= 50, "{}", outcome.text);
    assert!(sentence_count(&outcome.text) <= 2, "{}", outcome.text);
    assert!(!outcome.text.contains('\n'));
    assert!(!outcome.text.contains("首先"));
    for kind in [
        ViolationType::LengthViolation,
        ViolationType::SentenceViolation,
        ViolationType::FormatViolation,
        ViolationType::KeywordViolation,
    ] {
        assert!(outcome.violations.contains(&kind), "{kind}");
    }

    let segments = FormatParser::new(DisplayConfig::instant()).parse(
        &outcome.text,
        "xue",
        &mut FixedRandom(0.0),
    );
    assert!(segments.is_empty());

    let sink = Arc::new(RecordingSink::default());
    let sequencer = MessageDisplaySequencer::new(sink.clone(), Duration::ZERO);
    let bubble = MessageSegment::plain(outcome.text.clone(), "小雪", "xue");
    assert!(sequencer.display_messages(vec![bubble]).await);
    assert_eq!(sink.events()[2], format!("add:{}", outcome.text));
}

#[test]
fn repeated_replies_do_not_repeat_verbatim() {
    let mut processor = processor();
    let first = processor.process("你好呀，很高兴认识你呢！", &character());
    let second = processor.process("你好呀，很高兴认识你呢！", &character());

    assert_eq!(first, "你好呀，很高兴认识你呢！");
    assert_ne!(second, first);
    assert!(char_count(&second) <= 50);
}
