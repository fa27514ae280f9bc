//! Integration tests for the Kitty War server, handler, and full
//! connection flow.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kittywar::prelude::*;
use kittywar_match::{Ability, Cat};
use kittywar_protocol::{Message, Token, raw};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message as WsMessage;

// =========================================================================
// Helpers
// =========================================================================

const ALICE_TOKEN: &str = "alice-token-000000000001";
const BOB_TOKEN: &str = "bob-token-00000000000002";
const CAROL_TOKEN: &str = "carol-token-000000000003";

fn account(user_id: u64, username: &str, token: &str, cats: Vec<u8>) -> Account {
    Account {
        user_id: UserId(user_id),
        username: username.into(),
        token: token.into(),
        profile: Profile {
            wins: 3,
            loss: 1,
            draw: 0,
            matches: 4,
            cats,
        },
    }
}

fn accounts() -> MemoryProfileStore {
    MemoryProfileStore::with_accounts([
        account(1, "alice", ALICE_TOKEN, vec![0, 1]),
        account(2, "bob", BOB_TOKEN, vec![1, 2]),
        account(3, "carol", CAROL_TOKEN, vec![3]),
    ])
}

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let store = accounts();
    let server = KittyWarServerBuilder::new()
        .bind("127.0.0.1:0")
        .handshake_timeout(Duration::from_secs(2))
        .build(store)
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

/// A raw-TCP test client.
struct Client {
    stream: TcpStream,
    token: Token,
}

impl Client {
    async fn connect(addr: &str, token: &str) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.expect("should connect"),
            token: Token::from_str_padded(token).unwrap(),
        }
    }

    async fn send(&mut self, flag: Flag, body: Option<&str>) {
        let msg = Message::new(flag, self.token.clone(), body);
        self.stream
            .write_all(&raw::encode_message(&msg).unwrap())
            .await
            .expect("send");
    }

    /// Reads one response: `(flag, body)`.
    async fn recv(&mut self) -> (u8, Vec<u8>) {
        tokio::time::timeout(Duration::from_secs(2), async {
            let mut header = [0u8; 4];
            self.stream.read_exact(&mut header).await.expect("header");
            let len = u32::from_be_bytes([0, header[1], header[2], header[3]]) as usize;
            let mut body = vec![0u8; len];
            self.stream.read_exact(&mut body).await.expect("body");
            (header[0], body)
        })
        .await
        .expect("response should arrive")
    }

    async fn expect(&mut self, flag: Flag, body: &[u8]) {
        let (got, got_body) = self.recv().await;
        assert_eq!(
            (got, got_body.as_slice()),
            (u8::from(flag), body),
            "expected {flag}"
        );
    }

    async fn login(&mut self, username: &str) {
        self.send(Flag::Login, Some(username)).await;
        self.expect(Flag::Login, &[1]).await;
    }

    /// Reads until the server closes the stream.
    async fn read_to_close(&mut self) -> Vec<u8> {
        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), self.stream.read_to_end(&mut rest))
            .await
            .expect("server should close")
            .expect("read");
        rest
    }

    /// Asserts the server closed the stream with nothing left to read.
    async fn expect_closed(&mut self) {
        let rest = self.read_to_close().await;
        assert!(rest.is_empty(), "unexpected trailing bytes: {rest:?}");
    }
}

/// Logs both players in and pairs them.
async fn paired(addr: &str) -> (Client, Client) {
    let mut alice = Client::connect(addr, ALICE_TOKEN).await;
    let mut bob = Client::connect(addr, BOB_TOKEN).await;
    alice.login("alice").await;
    bob.login("bob").await;

    alice.send(Flag::FindMatch, None).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    bob.send(Flag::FindMatch, None).await;

    alice.expect(Flag::FindMatch, &[1]).await;
    bob.expect(Flag::FindMatch, &[1]).await;
    (alice, bob)
}

// =========================================================================
// Session requests
// =========================================================================

#[tokio::test]
async fn test_login_success() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, ALICE_TOKEN).await;
    client.login("alice").await;
}

#[tokio::test]
async fn test_login_bad_token_fails_and_closes() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, "not-the-right-token").await;

    client.send(Flag::Login, Some("alice")).await;
    client.expect(Flag::Login, &[0]).await;
    client.expect_closed().await;
}

#[tokio::test]
async fn test_login_unknown_user_fails_and_closes() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, ALICE_TOKEN).await;

    client.send(Flag::Login, Some("mallory")).await;
    client.expect(Flag::Login, &[0]).await;
    client.expect_closed().await;
}

#[tokio::test]
async fn test_logout_clears_token() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, ALICE_TOKEN).await;
    client.login("alice").await;
    client.send(Flag::Logout, None).await;
    client.expect_closed().await;

    let mut again = Client::connect(&addr, ALICE_TOKEN).await;
    again.send(Flag::Login, Some("alice")).await;
    again.expect(Flag::Login, &[0]).await;
}

#[tokio::test]
async fn test_disconnect_also_logs_out() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, BOB_TOKEN).await;
    client.login("bob").await;
    drop(client);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut again = Client::connect(&addr, BOB_TOKEN).await;
    again.send(Flag::Login, Some("bob")).await;
    again.expect(Flag::Login, &[0]).await;
}

#[tokio::test]
async fn test_user_profile_returns_json() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, ALICE_TOKEN).await;
    client.login("alice").await;

    client.send(Flag::UserProfile, None).await;
    let (flag, body) = client.recv().await;
    assert_eq!(flag, u8::from(Flag::UserProfile));
    let profile: serde_json::Value = serde_json::from_slice(&body).expect("profile JSON");
    assert_eq!(profile["wins"], 3);
    assert_eq!(profile["matches"], 4);
    assert_eq!(profile["cats"], serde_json::json!([0, 1]));
}

#[tokio::test]
async fn test_user_profile_requires_login() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, ALICE_TOKEN).await;

    client.send(Flag::UserProfile, None).await;
    client.expect(Flag::UserProfile, &[0]).await;

    // The connection stays usable.
    client.login("alice").await;
}

#[tokio::test]
async fn test_catalog_sections() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, "").await;

    client.send(Flag::CatCards, None).await;
    let (flag, body) = client.recv().await;
    assert_eq!(flag, u8::from(Flag::CatCards));
    let cats: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(cats.as_array().map(Vec::len), Some(6));

    client.send(Flag::AllCards, None).await;
    let (flag, body) = client.recv().await;
    assert_eq!(flag, u8::from(Flag::AllCards));
    let all: serde_json::Value = serde_json::from_slice(&body).unwrap();
    for key in ["cats", "moves", "chances", "abilities"] {
        assert!(all[key].is_array(), "missing {key}");
    }

    client.send(Flag::ChanceCards, None).await;
    let (_, body) = client.recv().await;
    let chances: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(chances.as_array().map(Vec::len), Some(9));
}

#[tokio::test]
async fn test_unknown_flag_closes_connection() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, ALICE_TOKEN).await;
    client.login("alice").await;

    let mut frame = vec![42u8];
    frame.extend_from_slice(&[0u8; 24]);
    frame.extend_from_slice(&[0, 0, 0]);
    client.stream.write_all(&frame).await.unwrap();
    client.expect_closed().await;
}

#[tokio::test]
async fn test_find_match_requires_login() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, ALICE_TOKEN).await;

    client.send(Flag::FindMatch, None).await;
    client.expect(Flag::FindMatch, &[0]).await;
}

#[tokio::test]
async fn test_match_flags_without_match_are_ignored() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, ALICE_TOKEN).await;
    client.login("alice").await;

    client.send(Flag::SelectCat, Some("0")).await;
    client.send(Flag::Ready, None).await;
    // Nothing came back for those; the next reply is the profile.
    client.send(Flag::UserProfile, None).await;
    let (flag, _) = client.recv().await;
    assert_eq!(flag, u8::from(Flag::UserProfile));
}

// =========================================================================
// Matches
// =========================================================================

#[tokio::test]
async fn test_find_match_twice_while_playing_fails() {
    let addr = start_server().await;
    let (mut alice, _bob) = paired(&addr).await;

    alice.send(Flag::FindMatch, None).await;
    alice.expect(Flag::FindMatch, &[0]).await;
}

#[tokio::test]
async fn test_full_round_through_show_cards() {
    let addr = start_server().await;
    let (mut alice, mut bob) = paired(&addr).await;

    // Setup
    alice.send(Flag::SelectCat, Some("0")).await;
    alice.expect(Flag::SelectCat, &[1]).await;
    bob.send(Flag::SelectCat, Some("0")).await;
    bob.expect(Flag::SelectCat, &[0]).await;
    bob.send(Flag::SelectCat, Some("2")).await;
    bob.expect(Flag::SelectCat, &[1]).await;

    alice.send(Flag::Ready, None).await;
    bob.send(Flag::Ready, None).await;

    for (client, op_cat) in [(&mut alice, 2u8), (&mut bob, 0u8)] {
        client.expect(Flag::NextPhase, &[]).await;
        client.expect(Flag::OpCat, &[op_cat]).await;

        let (flag, bonus) = client.recv().await;
        assert_eq!(flag, u8::from(Flag::GainAbility));
        let bonus = Ability::from_id(i64::from(bonus[0])).expect("known ability");
        assert!(Ability::BONUS.contains(&bonus));

        let (flag, chances) = client.recv().await;
        assert_eq!(flag, u8::from(Flag::GainChances));
        assert_eq!(chances.len(), 2);
    }

    // Prelude
    alice.send(Flag::Ready, None).await;
    bob.send(Flag::Ready, None).await;
    alice.expect(Flag::NextPhase, &[]).await;
    bob.expect(Flag::NextPhase, &[]).await;

    // Enact strategies: PURR must be accepted even though its id is 0.
    alice.send(Flag::SelectMove, Some("0")).await;
    alice.expect(Flag::SelectMove, &[1]).await;
    bob.send(Flag::SelectMove, Some("1")).await;
    bob.expect(Flag::SelectMove, &[1]).await;

    alice.send(Flag::Ready, None).await;
    bob.send(Flag::Ready, None).await;

    // Show cards
    alice.expect(Flag::NextPhase, &[]).await;
    alice.expect(Flag::RevealMove, &[1]).await;
    alice.expect(Flag::RevealChance, &[]).await;
    bob.expect(Flag::NextPhase, &[]).await;
    bob.expect(Flag::RevealMove, &[0]).await;
    bob.expect(Flag::RevealChance, &[]).await;

    // Settle: alice purred unopposed, 8 -> 9; bob guarded nothing.
    alice.send(Flag::Ready, None).await;
    bob.send(Flag::Ready, None).await;
    alice.expect(Flag::NextPhase, &[]).await;
    alice.expect(Flag::GainHp, &[9]).await;
    alice.expect(Flag::OpGainHp, &[10]).await;
}

#[tokio::test]
async fn test_wrong_phase_action_is_refused() {
    let addr = start_server().await;
    let (mut alice, _bob) = paired(&addr).await;

    alice.send(Flag::SelectMove, Some("2")).await;
    alice.expect(Flag::SelectMove, &[0]).await;
}

#[tokio::test]
async fn test_disconnect_mid_match_awards_opponent() {
    let addr = start_server().await;
    let (mut alice, bob) = paired(&addr).await;

    alice.send(Flag::SelectCat, Some("1")).await;
    alice.expect(Flag::SelectCat, &[1]).await;

    drop(bob);
    alice.expect(Flag::EndMatch, &[1]).await;

    // Free to queue again.
    alice.send(Flag::FindMatch, None).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut carol = Client::connect(&addr, BOB_TOKEN).await;
    carol.send(Flag::Login, Some("bob")).await;
    // Bob's token was cleared on disconnect.
    carol.expect(Flag::Login, &[0]).await;
}

#[tokio::test]
async fn test_disconnect_while_queued_withdraws() {
    let addr = start_server().await;
    let mut alice = Client::connect(&addr, ALICE_TOKEN).await;
    alice.login("alice").await;
    alice.send(Flag::FindMatch, None).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(alice);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Bob must not be paired with the departed player.
    let mut bob = Client::connect(&addr, BOB_TOKEN).await;
    bob.login("bob").await;
    bob.send(Flag::FindMatch, None).await;
    let nothing = tokio::time::timeout(Duration::from_millis(200), bob.recv()).await;
    assert!(nothing.is_err(), "bob should still be waiting");
}

#[tokio::test]
async fn test_ready_without_cat_kills_match() {
    let addr = start_server().await;
    let (mut alice, mut bob) = paired(&addr).await;

    alice.send(Flag::Ready, None).await;
    bob.send(Flag::Ready, None).await;
    alice.expect(Flag::EndMatch, &[3]).await;
    bob.expect(Flag::EndMatch, &[3]).await;
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_shutdown_logs_out_every_session_and_closes_sockets() {
    let store = Arc::new(accounts());
    let server = KittyWarServerBuilder::new()
        .bind("127.0.0.1:0")
        .shutdown_timeout(Duration::from_secs(2))
        .build(Arc::clone(&store))
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();
    let (stop, stopped) = oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async {
        let _ = stopped.await;
    }));
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Two players in a match, one waiting in the queue, one anonymous.
    let (mut alice, mut bob) = paired(&addr).await;
    let mut carol = Client::connect(&addr, CAROL_TOKEN).await;
    carol.login("carol").await;
    carol.send(Flag::FindMatch, None).await;
    let mut browser = Client::connect(&addr, "").await;
    browser.send(Flag::CatCards, None).await;
    browser.recv().await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("server should stop")
        .unwrap()
        .expect("server should stop cleanly");

    // Whichever player went first forfeited; the other may have heard
    // about it before its own socket closed.
    let forfeit = [u8::from(Flag::EndMatch), 0, 0, 1, 1];
    for client in [&mut alice, &mut bob] {
        let rest = client.read_to_close().await;
        assert!(rest.is_empty() || rest == forfeit, "unexpected bytes: {rest:?}");
    }
    carol.expect_closed().await;
    browser.expect_closed().await;

    for user in [1, 2, 3] {
        assert_eq!(
            store.lookup_token(UserId(user)).await.unwrap(),
            None,
            "token of user {user} should be cleared"
        );
    }

    // The listener is gone too.
    assert!(TcpStream::connect(&addr).await.is_err());
}

// =========================================================================
// WebSocket clients
// =========================================================================

#[tokio::test]
async fn test_websocket_client_logs_in_and_reads_catalog() {
    let addr = start_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");

    let mut login = vec![u8::from(Flag::Login)];
    login.extend_from_slice(ALICE_TOKEN.as_bytes());
    login.extend_from_slice(b"alice");
    ws.send(WsMessage::Binary(login.into())).await.unwrap();

    let reply = ws.next().await.unwrap().unwrap();
    assert_eq!(reply.into_data().as_ref(), &[u8::from(Flag::Login), 1]);

    let mut request = vec![u8::from(Flag::AbilityCards)];
    request.extend_from_slice(&[0u8; 24]);
    ws.send(WsMessage::Binary(request.into())).await.unwrap();

    let reply = ws.next().await.unwrap().unwrap().into_data();
    assert_eq!(reply[0], u8::from(Flag::AbilityCards));
    let abilities: serde_json::Value = serde_json::from_slice(&reply[1..]).unwrap();
    assert_eq!(abilities.as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn test_websocket_and_raw_clients_play_together() {
    let addr = start_server().await;

    let mut alice = Client::connect(&addr, ALICE_TOKEN).await;
    alice.login("alice").await;
    alice.send(Flag::FindMatch, None).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .unwrap();
    let frame = |flag: Flag, body: &[u8]| {
        let mut payload = vec![u8::from(flag)];
        payload.extend_from_slice(BOB_TOKEN.as_bytes());
        payload.extend_from_slice(body);
        WsMessage::Binary(payload.into())
    };
    ws.send(frame(Flag::Login, b"bob")).await.unwrap();
    assert_eq!(ws.next().await.unwrap().unwrap().into_data().as_ref(), &[0, 1]);
    ws.send(frame(Flag::FindMatch, b"")).await.unwrap();
    assert_eq!(ws.next().await.unwrap().unwrap().into_data().as_ref(), &[2, 1]);
    alice.expect(Flag::FindMatch, &[1]).await;

    ws.send(WsMessage::Close(None)).await.unwrap();
    alice.expect(Flag::EndMatch, &[1]).await;
}

// =========================================================================
// Catalog consistency
// =========================================================================

#[test]
fn test_default_catalog_matches_engine_cards() {
    let catalog = CardCatalog::default();
    assert_eq!(catalog.cats.len(), Cat::ALL.len());
    for card in &catalog.cats {
        let cat = Cat::from_id(i64::from(card.id)).expect("cat exists in engine");
        assert_eq!(card.health, cat.base_hp(), "{}", card.name);
        assert_eq!(card.ability_id, cat.ability_id(), "{}", card.name);
    }
    for card in &catalog.abilities {
        let ability = Ability::from_id(i64::from(card.id)).expect("ability exists in engine");
        assert_eq!(card.passive, ability.is_passive(), "{}", card.name);
        assert_eq!(card.cooldown, ability.cooldown(), "{}", card.name);
    }
}
