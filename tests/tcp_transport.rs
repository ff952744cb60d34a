//! TCP transport against a real loopback socket
//! Run with: cargo test --test tcp_transport

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use chatroom::application::services::{LifecycleCoordinator, SessionRegistry};
use chatroom::infrastructure::adapters::TcpTransport;
use chatroom::infrastructure::audit::AuditLog;
use chatroom::infrastructure::config::Config;

const WAIT: Duration = Duration::from_secs(5);

async fn start(config: Config) -> (std::net::SocketAddr, Arc<SessionRegistry>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = Arc::new(SessionRegistry::new());
    let coordinator = Arc::new(LifecycleCoordinator::new(
        registry.clone(),
        Arc::new(AuditLog::disabled()),
    ));
    let transport = TcpTransport::new(Arc::new(config), coordinator);
    tokio::spawn(async move {
        let _ = transport.serve(listener).await;
    });
    (addr, registry)
}

/// Read until `needle` shows up, returning everything read
async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut seen = String::new();
    let mut buf = [0u8; 1024];
    let finished = timeout(WAIT, async {
        while !seen.contains(needle) {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before {:?}, got {:?}", needle, seen);
            seen.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
    })
    .await;
    assert!(finished.is_ok(), "timed out waiting for {:?}, got {:?}", needle, seen);
    seen
}

async fn login(addr: std::net::SocketAddr, name: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    read_until(&mut stream, "login: ").await;
    stream.write_all(format!("{}\r\n", name).as_bytes()).await.unwrap();
    read_until(&mut stream, "Commands: clear echo help quit send\r\n$ ").await;
    stream
}

async fn wait_for_user(registry: &SessionRegistry, name: &str, present: bool) {
    timeout(WAIT, async {
        while registry.contains(name).await != present {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_login_send_and_quit() {
    let (addr, registry) = start(Config::default()).await;
    let mut alice = login(addr, "alice").await;
    let mut bob = login(addr, "bob").await;
    wait_for_user(&registry, "bob", true).await;

    alice.write_all(b"send bob hi bob\r\n").await.unwrap();
    read_until(&mut bob, "Message from Client[alice]: hi bob\r\n").await;

    bob.write_all(b"quit\n").await.unwrap();
    read_until(&mut bob, "Goodbye!\r\n").await;
    read_until(&mut alice, "Client[bob] disconnected!\r\n$ ").await;
    wait_for_user(&registry, "bob", false).await;
    assert_eq!(registry.usernames().await, vec!["alice"]);
}

#[tokio::test]
async fn test_peer_hangup_counts_as_disconnect() {
    let (addr, registry) = start(Config::default()).await;
    let mut alice = login(addr, "alice").await;
    let bob = login(addr, "bob").await;
    wait_for_user(&registry, "bob", true).await;

    drop(bob);

    read_until(&mut alice, "Client[bob] disconnected!").await;
    wait_for_user(&registry, "bob", false).await;
}

#[tokio::test]
async fn test_duplicate_login_rejected() {
    let (addr, registry) = start(Config::default()).await;
    let _alice = login(addr, "alice").await;
    wait_for_user(&registry, "alice", true).await;

    let mut imposter = TcpStream::connect(addr).await.unwrap();
    read_until(&mut imposter, "login: ").await;
    imposter.write_all(b"alice\n").await.unwrap();
    read_until(&mut imposter, "Error: User alice is already connected").await;

    assert_eq!(registry.usernames().await, vec!["alice"]);
}

#[tokio::test]
async fn test_credentials_enforced() {
    let mut config = Config::default();
    config.credentials.enabled = true;
    config.credentials.users.insert("roham".to_string(), "123".to_string());
    let (addr, registry) = start(config).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    read_until(&mut stream, "login: ").await;
    stream.write_all(b"roham\n").await.unwrap();
    read_until(&mut stream, "password: ").await;
    stream.write_all(b"wrong\n").await.unwrap();
    read_until(&mut stream, "Access denied").await;
    assert!(registry.is_empty().await);

    let mut stream = TcpStream::connect(addr).await.unwrap();
    read_until(&mut stream, "login: ").await;
    stream.write_all(b"roham\n").await.unwrap();
    read_until(&mut stream, "password: ").await;
    stream.write_all(b"123\n").await.unwrap();
    read_until(&mut stream, "Welcome to the SSH Chatroom!").await;
    wait_for_user(&registry, "roham", true).await;
}
