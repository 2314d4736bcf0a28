//! Outbound pacing across concurrent senders.

use std::sync::Arc;
use std::time::Duration;

use offlinechatbot::config::RateLimitConfig;
use offlinechatbot::sender::{MessageSender, Outbound};
use tokio::sync::mpsc;
use tokio::time::Instant;

fn sender(limits: RateLimitConfig) -> (Arc<MessageSender>, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(64);
    let outbound = Outbound::new();
    outbound.attach(tx);
    (Arc::new(MessageSender::new(outbound, "testbot", limits)), rx)
}

/// Collect `n` lines with the time each arrived.
async fn arrivals(rx: &mut mpsc::Receiver<String>, n: usize) -> Vec<(String, Instant)> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let line = rx.recv().await.expect("line");
        out.push((line, Instant::now()));
    }
    out
}

#[tokio::test(start_paused = true)]
async fn test_same_channel_sends_spaced_by_delay() {
    let (sender, mut rx) = sender(RateLimitConfig::default());
    sender.open("chan");

    let a = tokio::spawn({
        let sender = Arc::clone(&sender);
        async move { sender.send("chan", "first").await }
    });
    let b = tokio::spawn({
        let sender = Arc::clone(&sender);
        async move { sender.send("chan", "second").await }
    });

    let got = arrivals(&mut rx, 2).await;
    assert!(got[1].1 - got[0].1 >= Duration::from_millis(1500));
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_privileged_channel_uses_short_delay() {
    let (sender, mut rx) = sender(RateLimitConfig::default());
    sender.open("chan");
    sender.set_privileged("chan", true);

    let start = Instant::now();
    sender.send("chan", "one").await.unwrap();
    sender.send("chan", "two").await.unwrap();
    let got = arrivals(&mut rx, 2).await;

    let gap = got[1].1.duration_since(got[0].1);
    assert!(gap >= Duration::from_millis(300));
    assert!(gap < Duration::from_millis(1500));
    assert!(start.elapsed() >= Duration::from_millis(600));
}

#[tokio::test(start_paused = true)]
async fn test_channels_do_not_block_each_other() {
    let (sender, mut rx) = sender(RateLimitConfig::default());
    sender.open("one");
    sender.open("two");

    let start = Instant::now();
    let a = tokio::spawn({
        let sender = Arc::clone(&sender);
        async move { sender.send("one", "hello").await }
    });
    let b = tokio::spawn({
        let sender = Arc::clone(&sender);
        async move { sender.send("two", "hello").await }
    });

    let got = arrivals(&mut rx, 2).await;
    assert!(got.iter().all(|(_, at)| at.duration_since(start) < Duration::from_millis(1500)));
    // the marker is per channel, so neither line carries it
    assert!(got.iter().all(|(line, _)| line.ends_with(":/me hello")));
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();
}
