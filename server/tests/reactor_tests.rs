//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! End-to-end reactor tests over real localhost sockets.

use mudlark_server::{
    BuiltinDispatcher, MemoryAccounts, PlainCredentials, Reactor, ServerConfig, SessionContext,
    states,
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn test_context(accounts: MemoryAccounts) -> SessionContext {
    SessionContext::new(
        states::standard_registry().expect("registry"),
        Box::new(accounts),
        Box::new(PlainCredentials),
        Box::new(BuiltinDispatcher),
    )
}

async fn test_reactor(config: ServerConfig, accounts: MemoryAccounts) -> Reactor {
    let config = config.with_bind_address("127.0.0.1:0".parse().unwrap());
    Reactor::bind(config, test_context(accounts))
        .await
        .expect("bind")
}

/// Drive a handful of short reactor cycles.
async fn pump(reactor: &mut Reactor, cycles: usize) {
    for _ in 0..cycles {
        reactor
            .run_once(Some(Duration::from_millis(20)))
            .await
            .expect("cycle");
    }
}

/// Read whatever the server has sent so far.
async fn drain(client: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match tokio::time::timeout(Duration::from_millis(100), client.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => out.extend_from_slice(&buf[..n]),
            _ => break,
        }
    }
    out
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

const IAC: u8 = 255;
const WILL: u8 = 251;
const WONT: u8 = 252;
const DO: u8 = 253;
const ECHO: u8 = 1;
const NAWS: u8 = 31;

#[tokio::test]
async fn accept_assigns_initial_state_and_greets() {
    let mut reactor = test_reactor(ServerConfig::default(), MemoryAccounts::new()).await;
    let mut client = TcpStream::connect(reactor.local_addr()).await.expect("connect");

    pump(&mut reactor, 4).await;
    assert_eq!(reactor.connection_count(), 1);

    let greeting = drain(&mut client).await;
    assert!(contains(&greeting, &[IAC, WONT, ECHO]));
    assert!(contains(&greeting, &[IAC, DO, NAWS]));
    assert!(contains(&greeting, b"By what name do you wish to be known?"));
}

#[tokio::test]
async fn full_login_and_quit_over_the_wire() {
    let accounts = MemoryAccounts::new().with_account("alice", "swordfish");
    let mut reactor = test_reactor(ServerConfig::default(), accounts).await;
    let mut client = TcpStream::connect(reactor.local_addr()).await.expect("connect");

    pump(&mut reactor, 4).await;
    drain(&mut client).await;

    client.write_all(b"alice\r\n").await.expect("write name");
    pump(&mut reactor, 4).await;
    let challenge = drain(&mut client).await;
    assert!(contains(&challenge, b"Password:"));
    // Entering a quiet state suppresses client-side echo
    assert!(contains(&challenge, &[IAC, WILL, ECHO]));

    client
        .write_all(b"swordfish\r\n")
        .await
        .expect("write password");
    pump(&mut reactor, 4).await;
    let welcome = drain(&mut client).await;
    assert!(contains(&welcome, b"Welcome back, alice."));
    // Leaving the quiet state restores client-side echo
    assert!(contains(&welcome, &[IAC, WONT, ECHO]));
    assert!(contains(&welcome, b"> "));

    client.write_all(b"say hail\r\n").await.expect("write say");
    pump(&mut reactor, 4).await;
    let said = drain(&mut client).await;
    assert!(contains(&said, b"You say, 'hail'"));

    client.write_all(b"quit\r\n").await.expect("write quit");
    pump(&mut reactor, 4).await;
    assert_eq!(reactor.connection_count(), 0);
}

#[tokio::test]
async fn peer_close_removes_connection_from_live_set() {
    let mut reactor = test_reactor(ServerConfig::default(), MemoryAccounts::new()).await;
    let client = TcpStream::connect(reactor.local_addr()).await.expect("connect");

    pump(&mut reactor, 4).await;
    assert_eq!(reactor.connection_count(), 1);

    drop(client);
    pump(&mut reactor, 4).await;
    assert_eq!(reactor.connection_count(), 0);
}

#[tokio::test]
async fn connection_limit_drops_excess_accepts() {
    let config = ServerConfig::default().with_max_connections(1);
    let mut reactor = test_reactor(config, MemoryAccounts::new()).await;
    let _first = TcpStream::connect(reactor.local_addr()).await.expect("connect");
    pump(&mut reactor, 4).await;
    let _second = TcpStream::connect(reactor.local_addr()).await.expect("connect");
    pump(&mut reactor, 4).await;
    assert_eq!(reactor.connection_count(), 1);
}

#[tokio::test]
async fn output_overflow_destroys_connection() {
    // A 32-byte output buffer cannot hold the greeting; the connection
    // must be closed rather than the buffer growing past its bound.
    let config = ServerConfig::default().with_output_capacity(32);
    let mut reactor = test_reactor(config, MemoryAccounts::new()).await;
    let _client = TcpStream::connect(reactor.local_addr()).await.expect("connect");
    pump(&mut reactor, 4).await;
    assert_eq!(reactor.connection_count(), 0);
}

#[tokio::test]
async fn naws_negotiation_applies_window_size() {
    let mut reactor = test_reactor(ServerConfig::default(), MemoryAccounts::new()).await;
    let mut client = TcpStream::connect(reactor.local_addr()).await.expect("connect");
    pump(&mut reactor, 4).await;
    drain(&mut client).await;

    const SB: u8 = 250;
    const SE: u8 = 240;
    client
        .write_all(&[IAC, SB, NAWS, 0x00, 0x78, 0x00, 0x32, IAC, SE])
        .await
        .expect("write naws");
    pump(&mut reactor, 4).await;

    let conn = reactor.find_by_name("conn-1").expect("live connection");
    assert_eq!(conn.window().cols, 120);
    assert_eq!(conn.window().rows, 50);
}

#[tokio::test]
async fn timeout_is_honored_when_idle() {
    let mut reactor = test_reactor(ServerConfig::default(), MemoryAccounts::new()).await;
    let started = std::time::Instant::now();
    reactor
        .run_once(Some(Duration::from_millis(30)))
        .await
        .expect("cycle");
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(25), "returned too early: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "blocked too long: {:?}", elapsed);
}
