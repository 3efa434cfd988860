use std::sync::Arc;

use charachat::chat::{MAX_HISTORY_TURNS, Role};
use charachat::error::ChatError;
use charachat::pipeline::{ComplianceStats, MessageType};
use tokio_util::sync::CancellationToken;

use crate::chat_harness::{ScriptedClient, character, context_with};

#[tokio::test]
async fn plain_reply_becomes_one_text_segment() {
    let client = Arc::new(ScriptedClient::replying(["在呀，今天店里不忙。"]));
    let ctx = context_with(client.clone()).await;
    let mut session = ctx.session(character());

    let segments = session.send("在吗", &CancellationToken::new()).await.unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].message_type, MessageType::Text);
    assert_eq!(segments[0].content, "在呀，今天店里不忙。");
    assert_eq!(segments[0].original_sender, "小雪");

    let roles: Vec<Role> = session.turns().map(|turn| turn.role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant]);
}

#[tokio::test]
async fn structured_reply_is_split_into_segments() {
    let client = Arc::new(ScriptedClient::replying([
        "[小雪|欢迎回来]\n<小雪|开心>\n【心声|小雪|他终于来了】",
    ]));
    let ctx = context_with(client).await;
    let mut session = ctx.session(character());

    let segments = session.send("我来啦", &CancellationToken::new()).await.unwrap();
    let kinds: Vec<MessageType> = segments.iter().map(|s| s.message_type).collect();
    assert_eq!(
        kinds,
        [MessageType::Text, MessageType::Emoji, MessageType::InnerVoice]
    );
    assert_eq!(segments[0].content, "欢迎回来");
}

#[tokio::test]
async fn request_carries_prompt_history_and_user_text() {
    let client = Arc::new(ScriptedClient::replying(["你好呀。", "我叫小雪。"]));
    let ctx = context_with(client.clone()).await;
    let mut session = ctx.session(character());
    let cancel = CancellationToken::new();

    session.send("你好", &cancel).await.unwrap();
    session.send("你叫什么", &cancel).await.unwrap();

    let requests = client.requests();
    let second = &requests[1];
    let roles: Vec<Role> = second.messages.iter().map(|turn| turn.role).collect();
    assert_eq!(
        roles,
        [Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(second.messages[2].content, "你好呀。");
    assert_eq!(second.messages[3].content, "你叫什么");

    let system = client.last_system_prompt();
    assert!(system.starts_with("你是小雪。"), "{system}");
    assert!(system.contains("街角咖啡店的店员"));
    assert!(system.contains("每条消息不超过50个字"));
}

#[tokio::test]
async fn failed_turn_leaves_history_untouched() {
    let client = Arc::new(ScriptedClient::default());
    client.push(Err(ChatError::Timeout { secs: 30 }));
    let ctx = context_with(client).await;
    let mut session = ctx.session(character());

    let err = session.send("在吗", &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ChatError::Timeout { .. }));
    assert_eq!(session.turns().count(), 0);
    assert_eq!(session.processor().history().count(), 0);
}

#[tokio::test]
async fn blank_completion_is_rejected_before_processing() {
    let client = Arc::new(ScriptedClient::replying([" \n  "]));
    let ctx = context_with(client).await;
    let mut session = ctx.session(character());

    let err = session.send("在吗", &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyResponse));
    assert_eq!(session.turns().count(), 0);
    assert_eq!(session.processor().history().count(), 0);

    ctx.flush().await;
    assert_eq!(ctx.compliance().stats().await, ComplianceStats::default());
}

#[tokio::test]
async fn cancelled_turn_reports_cancellation() {
    let client = Arc::new(ScriptedClient::replying(["不会用到"]));
    let ctx = context_with(client).await;
    let mut session = ctx.session(character());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = session.send("在吗", &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(session.turns().count(), 0);
}

#[tokio::test]
async fn greeting_opens_the_history() {
    let client = Arc::new(ScriptedClient::replying(["好呀。"]));
    let ctx = context_with(client.clone()).await;
    let mut session = ctx.session(character());

    let greeting = session.greeting().unwrap();
    assert_eq!(greeting.content, "欢迎光临～");

    session.send("来杯拿铁", &CancellationToken::new()).await.unwrap();
    let request = &client.requests()[0];
    assert_eq!(request.messages[1].role, Role::Assistant);
    assert_eq!(request.messages[1].content, "欢迎光临～");
}

#[tokio::test]
async fn history_keeps_only_recent_turns() {
    let replies: Vec<String> = (0..MAX_HISTORY_TURNS).map(|i| format!("第{i}杯。")).collect();
    let client = Arc::new(ScriptedClient::replying(replies));
    let ctx = context_with(client).await;
    let mut session = ctx.session(character());
    let cancel = CancellationToken::new();

    for i in 0..MAX_HISTORY_TURNS {
        session.send(&format!("再来一杯{i}"), &cancel).await.unwrap();
    }
    assert_eq!(session.turns().count(), MAX_HISTORY_TURNS);
    let first = session.turns().next().unwrap();
    assert_eq!(first.content, format!("再来一杯{}", MAX_HISTORY_TURNS / 2));
}
