use std::sync::{Arc, Weak};

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use offlinechatbot::bots::CommandRouter;
use offlinechatbot::commands::{CallableCommand, CommandSpec, CommandTable};
use offlinechatbot::runtime::Component;
use tmi_proto::{Context, parse_line};

// Measures the per-message routing path: parse, normalize, table lookup and
// argument split. Network and storage are left out.

struct Silent;

impl Component for Silent {
    fn name(&self) -> &'static str {
        "Silent"
    }
}

fn table() -> (Arc<dyn Component>, CommandTable) {
    let owner: Arc<dyn Component> = Arc::new(Silent);
    let table = CommandTable::new();
    for name in ["bal", "leaderboard", "remind", "afk", "rps", "guess", "scramble", "hint"] {
        let weak: Weak<dyn Component> = Arc::downgrade(&owner);
        table
            .register(CallableCommand::new(
                CommandSpec::new(name, "bench").aliases(&[&name[..2]]),
                weak,
                "Silent",
            ))
            .unwrap();
    }
    (owner, table)
}

fn routing_benchmark(c: &mut Criterion) {
    let (_owner, table) = table();
    let raw = "@badges=;color=#FF0000;display-name=Alice;mod=0;room-id=22484632;\
               user-id=1234;id=abc :alice!alice@alice.tmi.twitch.tv PRIVMSG #chan :!remind 20m stretch";

    let mut group = c.benchmark_group("routing");
    group.throughput(Throughput::Elements(1));
    group.bench_function("privmsg_to_command", |b| {
        b.iter(|| {
            let Some(Context::Message(msg)) = parse_line(raw) else {
                unreachable!()
            };
            let text = CommandRouter::command_text(&msg);
            let token = text.split_whitespace().next().unwrap().trim_start_matches('!');
            let command = table.lookup(token).unwrap();
            (command, text.split_whitespace().count())
        })
    });
    group.finish();
}

criterion_group!(benches, routing_benchmark);
criterion_main!(benches);
