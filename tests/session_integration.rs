//! Whole-session round trips driving the session core over an in-memory
//! duplex pipe instead of a real socket, with a hand-scripted fake server on
//! the other end. Exercises the connect handshake, the bare LOGIN command and
//! the PLAIN continuation exchange, and the MOVE-without-MOVE-capability
//! fallback the session API falls back to when a server lacks the extension.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

use merlo_imap::command::SequenceSet;
use merlo_imap::types::Status;
use merlo_imap::{connect_with_stream, AuthMethod, SessionConfig, Stream, TlsConfig, TlsMode};

fn config() -> SessionConfig {
    SessionConfig::new("imap.test.invalid", 143)
        .with_tls(TlsConfig { mode: TlsMode::None, require_starttls: false })
}

/// Fake server side of the duplex pipe: a line reader plus the raw write half.
struct FakeServer {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

impl FakeServer {
    fn new(stream: DuplexStream) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self { reader: BufReader::new(read_half), writer: write_half }
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.expect("write to client");
        self.writer.flush().await.expect("flush to client");
    }

    /// Reads one CRLF-terminated line and asserts it matches `expected` exactly.
    async fn expect(&mut self, expected: &str) {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.expect("read from client");
        assert_eq!(line.trim_end_matches("\r\n"), expected, "unexpected command from client");
    }

    /// Reads one line and base64-decodes it as a SASL continuation reply.
    async fn expect_sasl_reply(&mut self) -> Vec<u8> {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.expect("read SASL reply");
        STANDARD.decode(line.trim_end_matches("\r\n")).expect("reply is valid base64")
    }

    async fn challenge(&mut self, plaintext: &str) {
        self.send(&format!("+ {}\r\n", STANDARD.encode(plaintext))).await;
    }
}

#[tokio::test]
async fn connect_capability_noop_logout_round_trip() {
    let (client_stream, server_stream) = tokio::io::duplex(8192);
    let mut server = FakeServer::new(server_stream);

    let server_task = tokio::spawn(async move {
        server.send("* OK test server ready\r\n").await;
        server.expect("A0000 CAPABILITY").await;
        server.send("* CAPABILITY IMAP4rev1\r\n").await;
        server.send("A0000 OK CAPABILITY completed\r\n").await;

        server.expect("A0001 NOOP").await;
        server.send("A0001 OK NOOP completed\r\n").await;

        server.expect("A0002 LOGOUT").await;
        server.send("* BYE logging out\r\n").await;
        server.send("A0002 OK LOGOUT completed\r\n").await;
        server
    });

    let connect = connect_with_stream(Stream::Duplex(client_stream), config(), None);
    let handle = tokio::time::timeout(Duration::from_secs(5), connect)
        .await
        .expect("connect timed out")
        .expect("connect failed");

    let noop = handle.noop().await.expect("NOOP should succeed");
    assert_eq!(noop.status, Status::Ok);

    let logout = handle.logout().await.expect("LOGOUT should succeed despite the preceding BYE");
    assert_eq!(logout.status, Status::Ok);

    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server script timed out")
        .expect("server task panicked");
}

#[tokio::test]
async fn login_sends_the_bare_login_command_not_authenticate() {
    let (client_stream, server_stream) = tokio::io::duplex(8192);
    let mut server = FakeServer::new(server_stream);

    let server_task = tokio::spawn(async move {
        server.send("* OK test server ready\r\n").await;
        server.expect("A0000 CAPABILITY").await;
        server.send("* CAPABILITY IMAP4rev1\r\n").await;
        server.send("A0000 OK CAPABILITY completed\r\n").await;

        // LOGIN is the classic bare command, not a SASL mechanism exchange —
        // a single line, no continuations.
        server.expect("A0001 LOGIN \"alice\" \"secret\"").await;
        server.send("A0001 OK LOGIN completed\r\n").await;
        server
    });

    let mut cfg = config();
    cfg.auth = Some(AuthMethod::Login { user: "alice".into(), pass: "secret".into() });

    let connect = connect_with_stream(Stream::Duplex(client_stream), cfg, None);
    let _handle = tokio::time::timeout(Duration::from_secs(5), connect)
        .await
        .expect("connect timed out")
        .expect("connect with LOGIN should succeed");

    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server script timed out")
        .expect("server task panicked");
}

#[tokio::test]
async fn authenticate_plain_without_sasl_ir_uses_a_continuation() {
    let (client_stream, server_stream) = tokio::io::duplex(8192);
    let mut server = FakeServer::new(server_stream);

    let server_task = tokio::spawn(async move {
        server.send("* OK test server ready\r\n").await;
        server.expect("A0000 CAPABILITY").await;
        // No SASL-IR advertised, so the client cannot inline its initial
        // response and must wait for an empty challenge first.
        server.send("* CAPABILITY IMAP4rev1\r\n").await;
        server.send("A0000 OK CAPABILITY completed\r\n").await;

        server.expect("A0001 AUTHENTICATE PLAIN").await;

        server.challenge("").await;
        let reply = server.expect_sasl_reply().await;
        assert_eq!(reply, b"\0bob\0pw");

        server.send("A0001 OK AUTHENTICATE completed\r\n").await;
        server
    });

    let mut cfg = config();
    cfg.auth = Some(AuthMethod::Plain { authzid: String::new(), user: "bob".into(), pass: "pw".into() });

    let connect = connect_with_stream(Stream::Duplex(client_stream), cfg, None);
    let _handle = tokio::time::timeout(Duration::from_secs(5), connect)
        .await
        .expect("connect timed out")
        .expect("connect with SASL PLAIN should succeed");

    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server script timed out")
        .expect("server task panicked");
}

#[tokio::test]
async fn move_without_move_capability_falls_back_to_copy_and_store() {
    let (client_stream, server_stream) = tokio::io::duplex(8192);
    let mut server = FakeServer::new(server_stream);

    let server_task = tokio::spawn(async move {
        // PREAUTH skips authentication entirely; the session starts out
        // already in the Authenticated state.
        server.send("* PREAUTH server ready\r\n").await;
        server.expect("A0000 CAPABILITY").await;
        server.send("* CAPABILITY IMAP4rev1\r\n").await;
        server.send("A0000 OK CAPABILITY completed\r\n").await;

        server.expect("A0001 SELECT \"INBOX\"").await;
        server.send("* 1 EXISTS\r\n").await;
        server.send("* FLAGS (\\Seen \\Deleted)\r\n").await;
        server.send("A0001 OK [READ-WRITE] SELECT completed\r\n").await;

        // No MOVE capability, so move_messages must fall back to COPY then
        // non-silent STORE +FLAGS (\Deleted), never issuing MOVE on the wire.
        server.expect("A0002 COPY 1 \"Archive\"").await;
        server.send("A0002 OK COPY completed\r\n").await;

        server.expect("A0003 STORE 1 +FLAGS (\\Deleted)").await;
        server.send("A0003 OK STORE completed\r\n").await;

        server
    });

    let cfg = config();
    let connect = connect_with_stream(Stream::Duplex(client_stream), cfg, None);
    let handle = tokio::time::timeout(Duration::from_secs(5), connect)
        .await
        .expect("connect timed out")
        .expect("connect failed");

    handle.select("INBOX").await.expect("SELECT should succeed");

    let moved = handle
        .move_messages(SequenceSet::single(1), false, "Archive")
        .await
        .expect("fallback move should succeed");
    assert_eq!(moved.status, Status::Ok);

    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server script timed out")
        .expect("server task panicked");
}
