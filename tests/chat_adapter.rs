//! Scripted console session through the chat adapter.
mod common;

use std::sync::Arc;

use common::{settings, FakeValidator};
use wordchain::game::server::ChatServer;
use wordchain::game::{ChannelSink, GameCoordinator};
use wordchain::storage::SledStore;

const SCRIPT: &str = "\
1 Alice: ^wc create
2 Bob: ^wc join
2 Bob: ^wc start
1 Alice: ^wc start
1 Alice: apple
2 Bob: nice one alice
2 Bob: egg
garbage without a user id
2 Bob: ^wc status
1 Alice: ^wc check zzq
1 Alice: ^wc ff
2 Bob: ^wc stats
";

#[tokio::test]
async fn scripted_game_through_the_console() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SledStore::open(dir.path().join("db")).unwrap());
    let validator = Arc::new(FakeValidator::new(&["zzq"], &[]));
    let (sink, events) = ChannelSink::channel();
    let coordinator = GameCoordinator::new(settings(), store, validator.clone(), Arc::new(sink));

    let mut server = ChatServer::new(coordinator, "^", 100, 7, Vec::new());
    server.run(SCRIPT.as_bytes(), events).await.unwrap();
    let output = String::from_utf8(server.output().clone()).unwrap();

    assert!(output.contains("[#7] Alice opened a word-chain party"));
    assert!(output.contains("[#7] Bob joined the party (2/10)"));
    assert!(output.contains("[#7] @Bob: only the party creator can do that"));
    assert!(output.contains("OK Alice played 'apple'"));
    assert!(output.contains("OK Bob played 'egg'"));
    assert!(output.contains("Last word: egg"));
    assert!(output.contains("'zzq' is not accepted"));
    assert!(output.contains("Alice forfeited"));
    assert!(output.contains("Bob wins!"));
    assert!(output.contains("@Bob: Bob: 1 games, 1 wins (100%)"));
    // Chatter and the malformed line never reached the validator: apple, egg, zzq.
    assert_eq!(validator.calls(), 3);
}
