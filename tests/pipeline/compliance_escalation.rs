use std::sync::Arc;

use charachat::app::AppContext;
use charachat::pipeline::{ComplianceStats, ViolationType};
use charachat::pipeline::compliance::{ESCALATION_MARKER, STATS_KEY};
use charachat::prompt::STRICT_LENGTH_CONTROL_ID;
use charachat::storage::load_json;
use tokio_util::sync::CancellationToken;

use crate::chat_harness::{
    FailingStore, ScriptedClient, character, context_over, context_with, quiet_config,
};

/// Each reply breaks the single-line rule and nothing else.
const MULTILINE_REPLIES: [&str; 5] = [
    "好的\n明天见。",
    "嗯\n我知道了。",
    "可以\n等我一下。",
    "行\n马上来。",
    "好\n晚安。",
];

#[tokio::test]
async fn repeated_violations_escalate_the_next_prompt() {
    let client = Arc::new(ScriptedClient::replying(MULTILINE_REPLIES));
    client.push(Ok("好的。".into()));
    let ctx = context_with(client.clone()).await;
    let mut session = ctx.session(character());
    let cancel = CancellationToken::new();

    for i in 0..MULTILINE_REPLIES.len() {
        let segments = session.send(&format!("第{i}句"), &cancel).await.unwrap();
        assert!(!segments[0].content.contains('\n'));
    }
    ctx.flush().await;

    let stats = ctx.compliance().stats().await;
    assert_eq!(stats.format_violations, 5);
    assert_eq!(stats.total_violations, 5);
    assert_eq!(stats.prompt_strength_level, 2);

    let strict = ctx.prompts().get(STRICT_LENGTH_CONTROL_ID).await.unwrap();
    assert_eq!(strict.content.matches(ESCALATION_MARKER).count(), 1);
    assert!(strict.content.contains("回复必须控制在50字以内"));
    assert!(strict.content.ends_with("不要换行，也不要使用冒号。"));

    session.send("晚安", &cancel).await.unwrap();
    assert!(client.last_system_prompt().contains(ESCALATION_MARKER));
}

#[tokio::test]
async fn sessions_share_one_ledger() {
    let client = Arc::new(ScriptedClient::replying(MULTILINE_REPLIES));
    let ctx = context_with(client).await;
    let cancel = CancellationToken::new();

    let mut first = ctx.session(character());
    let mut second = ctx.session(character());
    for i in 0..3 {
        first.send(&format!("a{i}"), &cancel).await.unwrap();
    }
    for i in 0..2 {
        second.send(&format!("b{i}"), &cancel).await.unwrap();
    }
    ctx.flush().await;

    let stats = ctx.compliance().stats().await;
    assert_eq!(stats.format_violations, 5);
    assert_eq!(stats.prompt_strength_level, 2);
}

#[tokio::test]
async fn ledger_survives_a_restart() {
    let client = Arc::new(ScriptedClient::replying(MULTILINE_REPLIES[..2].iter().copied()));
    let ctx = context_with(client).await;
    let cancel = CancellationToken::new();

    let mut session = ctx.session(character());
    session.send("一", &cancel).await.unwrap();
    session.send("二", &cancel).await.unwrap();
    ctx.flush().await;

    let kv = Arc::clone(ctx.store());
    let persisted: ComplianceStats = load_json(kv.as_ref(), STATS_KEY).await.unwrap().unwrap();
    assert_eq!(persisted.format_violations, 2);

    let restarted =
        AppContext::with_parts(quiet_config(), kv, Arc::new(ScriptedClient::default())).await;
    let stats = restarted.compliance().stats().await;
    assert_eq!(stats.format_violations, 2);
    assert!(stats.last_violation_time.is_some());

    restarted.compliance().reset_stats().await.unwrap();
    assert_eq!(restarted.compliance().stats().await, ComplianceStats::default());
}

#[tokio::test]
async fn clean_replies_leave_the_ledger_alone() {
    let client = Arc::new(ScriptedClient::replying(["好呀。", "那就这么定了。"]));
    let ctx = context_with(client).await;
    let cancel = CancellationToken::new();

    let mut session = ctx.session(character());
    session.send("明天见面吗", &cancel).await.unwrap();
    session.send("下午三点", &cancel).await.unwrap();
    ctx.flush().await;

    assert_eq!(ctx.compliance().stats().await, ComplianceStats::default());
}

#[tokio::test]
async fn unwritable_store_still_counts_every_violation() {
    let ctx = context_over(Arc::new(FailingStore), Arc::new(ScriptedClient::default())).await;
    let mut processor = ctx.processor();

    let outcome = processor.process_detailed(
        "首先，我想说今天的天气真的很不错。其次：我们可以一起去公园散步！\n然后去吃好吃的冰淇淋吧？最后我们一起回家。",
        &character(),
    );
    assert_eq!(
        outcome.violations,
        [
            ViolationType::LengthViolation,
            ViolationType::SentenceViolation,
            ViolationType::FormatViolation,
            ViolationType::KeywordViolation,
        ]
    );
    ctx.flush().await;

    let stats = ctx.compliance().stats().await;
    for kind in &outcome.violations {
        assert_eq!(stats.count(*kind), 1, "{kind}");
    }
    assert_eq!(stats.total_violations, 4);
}
