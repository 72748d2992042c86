//! Session core: the actor that owns the socket, the tag allocator, the
//! capability cache, and the single in-flight pending-command record
//! (spec.md §4.5, §5).
//!
//! Grounded on the teacher's `protocol/imap/client.rs` pipeline
//! (`ImapConnection`/`pipeline_loop`): a `tokio::spawn`ed task owns the
//! socket and a channel handle lets callers reach it. This generalizes that
//! pattern to carry exactly one pending command at a time rather than a FIFO
//! of many, since this engine never pipelines overlapping tagged commands —
//! concurrent callers queue inside the actor and are served one at a time.

mod api;

pub use api::IdleGuard;

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::capability::CapabilitySet;
use crate::command::{AuthCommand, Command, CommandKind};
use crate::config::{AuthMethod, SessionConfig, TlsMode};
use crate::encode;
use crate::error::ImapError;
use crate::net::{self, Stream};
use crate::parser::ResponseParser;
use crate::sasl;
use crate::state::{self, SessionState};
use crate::types::{Response, ResponseCode, Status, Untagged};

/// Answers a SASL server challenge with the client's response, or `None` to
/// abort the exchange (the session then sends `*\r\n` and fails the command).
/// Only consulted for `AuthCommand::Generic`; the engine drives LOGIN, PLAIN,
/// XOAUTH2, and EXTERNAL itself.
pub trait SaslChallengeHandler: Send {
    fn respond<'a>(
        &'a mut self,
        challenge: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + 'a>>;
}

/// The collected result of one command: its terminal tagged status plus
/// every untagged response attributed to it while it was in flight.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub status: Status,
    pub code: Option<ResponseCode>,
    pub text: Option<String>,
    pub untagged: Vec<Untagged>,
}

type ResultSender = oneshot::Sender<Result<CommandOutcome, ImapError>>;

struct IdleSetup {
    events_tx: mpsc::UnboundedSender<Untagged>,
    ack_tx: oneshot::Sender<()>,
    done_rx: oneshot::Receiver<()>,
}

struct ActorRequest {
    command: Command,
    sasl: Option<Box<dyn SaslChallengeHandler>>,
    respond_to: ResultSender,
    idle: Option<IdleSetup>,
}

enum ActorMessage {
    Command(ActorRequest),
    QueryCapabilities(oneshot::Sender<CapabilitySet>),
}

/// Cheaply cloneable handle to a running session actor. All interaction
/// goes through an unbounded channel; the actor itself owns the socket.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<ActorMessage>,
}

impl SessionHandle {
    /// Send `command`, waiting for its terminal tagged response.
    pub async fn call(&self, command: Command) -> Result<CommandOutcome, ImapError> {
        self.call_with_sasl(command, None).await
    }

    /// Like `call`, but supplies a challenge handler for `AuthCommand::Generic`.
    pub async fn call_with_sasl(
        &self,
        command: Command,
        sasl: Option<Box<dyn SaslChallengeHandler>>,
    ) -> Result<CommandOutcome, ImapError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(ActorMessage::Command(ActorRequest { command, sasl, respond_to: tx, idle: None }))
            .map_err(|_| ImapError::Disconnected)?;
        rx.await.map_err(|_| ImapError::Disconnected)?
    }

    /// Starts IDLE (RFC 2177). Blocks until the server's continuation
    /// acknowledges, then returns a guard streaming untagged pushes until
    /// `IdleGuard::done` sends DONE and awaits the tagged completion.
    pub async fn idle(&self) -> Result<IdleGuard, ImapError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (ack_tx, ack_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        self.tx
            .send(ActorMessage::Command(ActorRequest {
                command: Command::Idle,
                sasl: None,
                respond_to: result_tx,
                idle: Some(IdleSetup { events_tx, ack_tx, done_rx }),
            }))
            .map_err(|_| ImapError::Disconnected)?;
        ack_rx.await.map_err(|_| ImapError::Disconnected)?;
        Ok(IdleGuard::new(events_rx, done_tx, result_rx))
    }

    /// Snapshot of the session's current capability cache, refreshed on every
    /// CAPABILITY data/response code the actor has seen so far. Doesn't touch
    /// the wire.
    pub async fn capabilities(&self) -> Result<CapabilitySet, ImapError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(ActorMessage::QueryCapabilities(tx))
            .map_err(|_| ImapError::Disconnected)?;
        rx.await.map_err(|_| ImapError::Disconnected)
    }
}

struct PendingAuth {
    command: AuthCommand,
    sent_initial: bool,
    handler: Option<Box<dyn SaslChallengeHandler>>,
}

struct PendingCommand {
    tag: String,
    command: Command,
    kind: CommandKind,
    continuations: VecDeque<Vec<u8>>,
    auth: Option<PendingAuth>,
    idle_events: Option<mpsc::UnboundedSender<Untagged>>,
    idle_started: Option<oneshot::Sender<()>>,
    idle_done: Option<oneshot::Receiver<()>>,
    collected: Vec<Untagged>,
    respond_to: ResultSender,
    deadline: Instant,
}

/// Buffers inbound bytes through the incremental parser and hands back one
/// complete `Response` at a time.
struct FramedReader {
    parser: ResponseParser,
    queue: VecDeque<Response>,
}

impl FramedReader {
    fn new() -> Self {
        Self { parser: ResponseParser::new(), queue: VecDeque::new() }
    }

    async fn next(&mut self, stream: &mut Stream) -> Result<Response, ImapError> {
        loop {
            if let Some(response) = self.queue.pop_front() {
                return Ok(response);
            }
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).await.map_err(ImapError::from)?;
            if n == 0 {
                return Err(ImapError::ConnectionClosed);
            }
            self.parser.append(&buf[..n]);
            let responses = self.parser.parse_responses()?;
            self.queue.extend(responses);
        }
    }
}

fn next_tag(counter: &mut u32) -> String {
    let tag = format!("A{:04}", *counter);
    *counter += 1;
    tag
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};
    STANDARD.encode(bytes)
}

fn base64_decode_lenient(s: &str) -> Vec<u8> {
    use base64::{engine::general_purpose::STANDARD, Engine};
    STANDARD.decode(s.trim()).unwrap_or_default()
}

/// Answers one SASL continuation challenge for the mechanism driving `auth`.
async fn sasl_reply(auth: &mut PendingAuth, challenge_b64: &str) -> Option<Vec<u8>> {
    match &auth.command {
        AuthCommand::Plain { authzid, user, pass } => {
            if auth.sent_initial {
                Some(Vec::new())
            } else {
                auth.sent_initial = true;
                Some(sasl::encode_plain(authzid, user, pass))
            }
        }
        AuthCommand::XOAuth2 { user, token } => {
            if auth.sent_initial {
                Some(Vec::new())
            } else {
                auth.sent_initial = true;
                Some(encode::sasl_xoauth2_response(user, token))
            }
        }
        AuthCommand::External => Some(Vec::new()),
        AuthCommand::Generic { .. } => {
            let raw = base64_decode_lenient(challenge_b64);
            match auth.handler.as_mut() {
                Some(handler) => handler.respond(raw).await,
                None => None,
            }
        }
    }
}

/// Which untagged verbs a command's kind may absorb while in flight
/// (spec.md §4.5 dispatch step 4). Verbs outside this set, or arriving with
/// nothing pending, are not attributed anywhere — this engine keeps no
/// standing mailbox-state cache.
fn verb_permitted(kind: CommandKind, u: &Untagged) -> bool {
    match kind {
        CommandKind::Capability => matches!(u, Untagged::Capability(_)),
        CommandKind::List => matches!(u, Untagged::List(_)),
        CommandKind::Lsub => matches!(u, Untagged::Lsub(_)),
        CommandKind::Search => matches!(u, Untagged::Search(_)),
        CommandKind::Fetch => matches!(u, Untagged::Fetch(..)),
        CommandKind::Status => matches!(u, Untagged::MailboxStatus(..)),
        CommandKind::SelectOrExamine => matches!(
            u,
            Untagged::Flags(_) | Untagged::Exists(_) | Untagged::Recent(_) | Untagged::Status { .. }
        ),
        CommandKind::Generic => false,
    }
}

/// Maps every `AuthMethod` except `Login` (handled separately — see
/// `connect_with_stream`, it never becomes an `AuthCommand`) onto the
/// `AUTHENTICATE` mechanism it drives.
fn auth_command_from_config(method: AuthMethod) -> AuthCommand {
    match method {
        AuthMethod::Login { .. } => unreachable!("AuthMethod::Login is handled before this call"),
        AuthMethod::Plain { authzid, user, pass } => AuthCommand::Plain { authzid, user, pass },
        AuthMethod::XOAuth2 { user, token } => AuthCommand::XOAuth2 { user, token },
        AuthMethod::External => AuthCommand::External,
        AuthMethod::Generic { mechanism } => AuthCommand::Generic { mechanism, initial: None },
    }
}

fn merge_capability_code(caps: &mut CapabilitySet, code: &Option<ResponseCode>) {
    if let Some(ResponseCode::Capability(tokens)) = code {
        caps.replace(tokens.clone());
    }
}

fn merge_capability_untagged(caps: &mut CapabilitySet, untagged: &[Untagged]) {
    for u in untagged {
        if let Untagged::Capability(tokens) = u {
            caps.replace(tokens.clone());
        }
    }
}

/// Runs one non-authenticating command to completion against a not-yet-actor
/// socket, used only during the connect handshake (CAPABILITY, STARTTLS).
async fn run_command_raw(
    stream: &mut Stream,
    reader: &mut FramedReader,
    tag_counter: &mut u32,
    caps: &CapabilitySet,
    command: &Command,
) -> Result<CommandOutcome, ImapError> {
    let tag = next_tag(tag_counter);
    let encoded = encode::encode(&tag, command, caps);
    stream.write_all(&encoded.initial).await?;
    stream.flush().await?;
    let mut continuations = VecDeque::from(encoded.continuations);
    let mut collected = Vec::new();
    loop {
        match reader.next(stream).await? {
            Response::Continuation(_) => match continuations.pop_front() {
                Some(segment) => {
                    stream.write_all(&segment).await?;
                    stream.flush().await?;
                }
                None => return Err(ImapError::ProtocolError("unexpected continuation".into())),
            },
            Response::Untagged(u) => collected.push(u),
            Response::Tagged { tag: t, status, code, text } => {
                if t != tag {
                    return Err(ImapError::ProtocolError(format!(
                        "tag mismatch: expected {tag}, got {t}"
                    )));
                }
                return Ok(CommandOutcome { status, code, text, untagged: collected });
            }
        }
    }
}

async fn run_authenticate(
    stream: &mut Stream,
    reader: &mut FramedReader,
    tag_counter: &mut u32,
    caps: &CapabilitySet,
    auth: &AuthCommand,
    handler: Option<Box<dyn SaslChallengeHandler>>,
) -> Result<CommandOutcome, ImapError> {
    let tag = next_tag(tag_counter);
    let command = Command::Authenticate(auth.clone());
    let encoded = encode::encode(&tag, &command, caps);
    stream.write_all(&encoded.initial).await?;
    stream.flush().await?;

    let mut progress =
        PendingAuth { command: auth.clone(), sent_initial: caps.supports_sasl_ir(), handler };
    let mut collected = Vec::new();

    loop {
        match reader.next(stream).await? {
            Response::Continuation(text) => match sasl_reply(&mut progress, &text).await {
                Some(bytes) => {
                    let mut line = base64_encode(&bytes);
                    line.push_str("\r\n");
                    stream.write_all(line.as_bytes()).await?;
                    stream.flush().await?;
                }
                None => {
                    stream.write_all(b"*\r\n").await?;
                    stream.flush().await?;
                    return Err(ImapError::AuthenticationFailed(
                        "client aborted SASL exchange".into(),
                    ));
                }
            },
            Response::Untagged(u) => collected.push(u),
            Response::Tagged { tag: t, status, code, text } => {
                if t != tag {
                    return Err(ImapError::ProtocolError(format!(
                        "tag mismatch: expected {tag}, got {t}"
                    )));
                }
                return Ok(CommandOutcome { status, code, text, untagged: collected });
            }
        }
    }
}

async fn read_greeting(stream: &mut Stream, reader: &mut FramedReader) -> Result<Response, ImapError> {
    tokio::time::timeout(Duration::from_secs(5), reader.next(stream))
        .await
        .map_err(|_| ImapError::Timeout)?
}

/// Opens a session: connects the transport, performs STARTTLS if requested,
/// negotiates capabilities, authenticates unless the server greets with
/// PREAUTH, and spawns the actor. See spec.md §4.5 "Connect sequence".
pub async fn connect(config: SessionConfig) -> Result<SessionHandle, ImapError> {
    connect_with_sasl(config, None).await
}

/// Like `connect`, but supplies a challenge handler for `AuthMethod::Generic`.
pub async fn connect_with_sasl(
    config: SessionConfig,
    sasl_handler: Option<Box<dyn SaslChallengeHandler>>,
) -> Result<SessionHandle, ImapError> {
    let stream = net::connect(&config).await?;
    connect_with_stream(stream, config, sasl_handler).await
}

/// Runs the connect handshake over an already-open transport. Used by
/// `connect`/`connect_with_sasl` for real sockets, and directly by
/// whole-session tests driving the actor over an in-memory duplex pipe
/// (`net::Stream::Duplex`).
pub async fn connect_with_stream(
    mut stream: Stream,
    config: SessionConfig,
    sasl_handler: Option<Box<dyn SaslChallengeHandler>>,
) -> Result<SessionHandle, ImapError> {
    let mut reader = FramedReader::new();
    let mut tag_counter: u32 = 0;

    let greeting = read_greeting(&mut stream, &mut reader).await?;
    let mut state = match greeting {
        Response::Untagged(Untagged::Status { status: Status::Bye, text, .. }) => {
            return Err(ImapError::ConnectionFailed(text.unwrap_or_else(|| "server sent BYE".into())));
        }
        Response::Untagged(Untagged::Status { status: Status::PreAuth, .. }) => SessionState::Authenticated,
        Response::Untagged(Untagged::Status { status: Status::Ok, .. }) => SessionState::Connected,
        other => return Err(ImapError::ProtocolError(format!("unexpected greeting: {other:?}"))),
    };

    let mut caps = fetch_capabilities(&mut stream, &mut reader, &mut tag_counter).await?;

    if config.tls.mode == TlsMode::StartTls {
        if state == SessionState::Authenticated {
            return Err(ImapError::ProtocolError(
                "STARTTLS is forbidden after PREAUTH".into(),
            ));
        }
        if !caps.supports_starttls() {
            if config.tls.require_starttls {
                return Err(ImapError::UnsupportedCapability("STARTTLS".into()));
            }
        } else {
            let outcome =
                run_command_raw(&mut stream, &mut reader, &mut tag_counter, &caps, &Command::StartTls)
                    .await?;
            if outcome.status != Status::Ok {
                return Err(ImapError::CommandFailed {
                    command: "STARTTLS".into(),
                    text: outcome.text.unwrap_or_default(),
                });
            }
            stream = stream
                .upgrade_to_tls(&config.host)
                .await
                .map_err(|e| ImapError::TlsError(e.to_string()))?;
            reader = FramedReader::new();
            caps = fetch_capabilities(&mut stream, &mut reader, &mut tag_counter).await?;
        }
    }

    if state != SessionState::Authenticated {
        if let Some(auth_method) = config.auth.clone() {
            // `LOGIN` (RFC 3501 §6.2.3) is the bare command, not a SASL
            // mechanism, and is the one thing LOGINDISABLED actually
            // disables — every other auth method runs through AUTHENTICATE.
            let outcome = match auth_method {
                AuthMethod::Login { user, pass } => {
                    if caps.supports_login_disabled() {
                        return Err(ImapError::AuthenticationFailed(
                            "server advertises LOGINDISABLED".into(),
                        ));
                    }
                    run_command_raw(
                        &mut stream,
                        &mut reader,
                        &mut tag_counter,
                        &caps,
                        &Command::Login { user, pass },
                    )
                    .await?
                }
                other => {
                    let auth_command = auth_command_from_config(other);
                    run_authenticate(
                        &mut stream,
                        &mut reader,
                        &mut tag_counter,
                        &caps,
                        &auth_command,
                        sasl_handler,
                    )
                    .await?
                }
            };
            merge_capability_code(&mut caps, &outcome.code);
            merge_capability_untagged(&mut caps, &outcome.untagged);
            if outcome.status != Status::Ok {
                return Err(ImapError::AuthenticationFailed(outcome.text.unwrap_or_default()));
            }
            state = SessionState::Authenticated;
        }
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let actor =
        Actor { stream, reader, state, caps, tag_counter, config, pending: None, queue: VecDeque::new() };
    tokio::spawn(actor.run(rx));
    Ok(SessionHandle { tx })
}

async fn fetch_capabilities(
    stream: &mut Stream,
    reader: &mut FramedReader,
    tag_counter: &mut u32,
) -> Result<CapabilitySet, ImapError> {
    let outcome =
        run_command_raw(stream, reader, tag_counter, &CapabilitySet::new(), &Command::Capability).await?;
    if outcome.status != Status::Ok {
        return Err(ImapError::CommandFailed {
            command: "CAPABILITY".into(),
            text: outcome.text.unwrap_or_default(),
        });
    }
    let mut caps = CapabilitySet::new();
    merge_capability_untagged(&mut caps, &outcome.untagged);
    merge_capability_code(&mut caps, &outcome.code);
    Ok(caps)
}

/// Owns the live socket after the connect handshake completes. One instance
/// per session, driven by `run` as a spawned task.
struct Actor {
    stream: Stream,
    reader: FramedReader,
    state: SessionState,
    caps: CapabilitySet,
    tag_counter: u32,
    config: SessionConfig,
    pending: Option<PendingCommand>,
    queue: VecDeque<ActorRequest>,
}

async fn wait_for_idle_done(pending: &mut Option<PendingCommand>) {
    match pending.as_mut().and_then(|p| p.idle_done.as_mut()) {
        Some(rx) => {
            let _ = rx.await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ActorMessage>) {
        loop {
            if self.pending.is_none() {
                if let Some(req) = self.queue.pop_front() {
                    self.start(req).await;
                }
            }
            let deadline = self
                .pending
                .as_ref()
                .map(|p| p.deadline)
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                maybe_msg = rx.recv() => {
                    match maybe_msg {
                        Some(ActorMessage::Command(req)) => {
                            if self.pending.is_none() {
                                self.start(req).await;
                            } else {
                                self.queue.push_back(req);
                            }
                        }
                        Some(ActorMessage::QueryCapabilities(reply)) => {
                            let _ = reply.send(self.caps.clone());
                        }
                        None => {
                            self.shutdown().await;
                            return;
                        }
                    }
                }
                result = self.reader.next(&mut self.stream), if self.pending.is_some() => {
                    match result {
                        Ok(response) => self.dispatch(response).await,
                        Err(e) => {
                            self.state = SessionState::Disconnected;
                            self.fail_all(e);
                            return;
                        }
                    }
                }
                () = wait_for_idle_done(&mut self.pending), if self.pending.is_some() => {
                    if let Some(p) = self.pending.as_mut() {
                        p.idle_done = None;
                    }
                    let _ = self.stream.write_all(b"DONE\r\n").await;
                    let _ = self.stream.flush().await;
                }
                () = tokio::time::sleep_until(deadline), if self.pending.is_some() => {
                    if let Some(p) = self.pending.take() {
                        let _ = p.respond_to.send(Err(ImapError::Timeout));
                    }
                }
            }
        }
    }

    async fn start(&mut self, req: ActorRequest) {
        if let Err(e) = state::validate(&req.command, &self.state) {
            let _ = req.respond_to.send(Err(e));
            return;
        }
        let tag = next_tag(&mut self.tag_counter);
        let encoded = encode::encode(&tag, &req.command, &self.caps);
        if let Err(e) = self.write_segment(&encoded.initial).await {
            let _ = req.respond_to.send(Err(e));
            return;
        }
        let kind = req.command.kind();
        let auth = match &req.command {
            Command::Authenticate(auth_command) => Some(PendingAuth {
                command: auth_command.clone(),
                sent_initial: self.caps.supports_sasl_ir(),
                handler: req.sasl,
            }),
            _ => None,
        };
        let (idle_events, idle_started, idle_done) = match req.idle {
            Some(setup) => (Some(setup.events_tx), Some(setup.ack_tx), Some(setup.done_rx)),
            None => (None, None, None),
        };
        self.pending = Some(PendingCommand {
            tag,
            command: req.command,
            kind,
            continuations: VecDeque::from(encoded.continuations),
            auth,
            idle_events,
            idle_started,
            idle_done,
            collected: Vec::new(),
            respond_to: req.respond_to,
            deadline: Instant::now() + self.config.command_timeout,
        });
    }

    async fn write_segment(&mut self, bytes: &[u8]) -> Result<(), ImapError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn dispatch(&mut self, response: Response) {
        match response {
            Response::Continuation(text) => self.handle_continuation(text).await,
            Response::Untagged(u) => self.handle_untagged(u),
            Response::Tagged { tag, status, code, text } => self.handle_tagged(tag, status, code, text),
        }
    }

    async fn handle_continuation(&mut self, text: String) {
        let Some(mut pending) = self.pending.take() else { return };

        if matches!(pending.command, Command::Idle) {
            if let Some(ack) = pending.idle_started.take() {
                let _ = ack.send(());
            }
            self.pending = Some(pending);
            return;
        }

        if let Some(auth) = pending.auth.as_mut() {
            match sasl_reply(auth, &text).await {
                Some(bytes) => {
                    let mut line = base64_encode(&bytes);
                    line.push_str("\r\n");
                    match self.write_segment(line.as_bytes()).await {
                        Ok(()) => self.pending = Some(pending),
                        Err(e) => {
                            let _ = pending.respond_to.send(Err(e));
                        }
                    }
                }
                None => {
                    let _ = self.write_segment(b"*\r\n").await;
                    let _ = pending.respond_to.send(Err(ImapError::AuthenticationFailed(
                        "client aborted SASL exchange".into(),
                    )));
                }
            }
            return;
        }

        match pending.continuations.pop_front() {
            Some(segment) => match self.write_segment(&segment).await {
                Ok(()) => self.pending = Some(pending),
                Err(e) => {
                    let _ = pending.respond_to.send(Err(e));
                }
            },
            None => {
                let _ = pending
                    .respond_to
                    .send(Err(ImapError::ProtocolError("unexpected continuation".into())));
            }
        }
    }

    fn handle_untagged(&mut self, u: Untagged) {
        merge_capability_untagged(&mut self.caps, std::slice::from_ref(&u));
        if let Untagged::Status { code, .. } = &u {
            merge_capability_code(&mut self.caps, code);
        }
        if let Untagged::Status { status: Status::Bye, .. } = &u {
            // LOGOUT always provokes an untagged BYE immediately before its
            // tagged OK (RFC 3501 §6.1.3) — that one is expected, and the
            // pending command's own tagged response still carries the
            // outcome. Any other BYE is the server closing the connection
            // unprompted.
            let pending_is_logout = matches!(
                self.pending.as_ref().map(|p| &p.command),
                Some(Command::Logout)
            );
            if pending_is_logout {
                if let Some(pending) = self.pending.as_mut() {
                    pending.collected.push(u);
                }
                return;
            }
            self.state = SessionState::Disconnected;
            if let Untagged::Status { text, .. } = u {
                if let Some(p) = self.pending.take() {
                    let _ = p
                        .respond_to
                        .send(Err(ImapError::ServerError(text.unwrap_or_else(|| "BYE".into()))));
                }
            }
            return;
        }
        if let Some(pending) = self.pending.as_mut() {
            if let Some(tx) = pending.idle_events.as_ref() {
                let _ = tx.send(u);
                return;
            }
            if verb_permitted(pending.kind, &u) {
                pending.collected.push(u);
            }
        }
    }

    fn handle_tagged(&mut self, tag: String, status: Status, code: Option<ResponseCode>, text: Option<String>) {
        merge_capability_code(&mut self.caps, &code);
        let matches_pending = self.pending.as_ref().map(|p| p.tag == tag).unwrap_or(false);
        if !matches_pending {
            return;
        }
        let pending = self.pending.take().unwrap();
        let command = pending.command.clone();
        match status {
            Status::Ok => {
                self.state = state::transition_on_ok(&command, &self.state);
                let _ = pending.respond_to.send(Ok(CommandOutcome {
                    status,
                    code,
                    text,
                    untagged: pending.collected,
                }));
            }
            Status::No | Status::Bad => {
                let _ = pending.respond_to.send(Err(ImapError::CommandFailed {
                    command: command.label().to_string(),
                    text: text.unwrap_or_default(),
                }));
            }
            Status::Bye => {
                self.state = SessionState::Disconnected;
                let _ = pending
                    .respond_to
                    .send(Err(ImapError::ServerError(text.unwrap_or_else(|| "BYE".into()))));
            }
            Status::PreAuth => {
                let _ = pending.respond_to.send(Err(ImapError::ProtocolError(
                    "unexpected PREAUTH on a tagged response".into(),
                )));
            }
        }
    }

    fn fail_all(&mut self, e: ImapError) {
        if let Some(p) = self.pending.take() {
            let _ = p.respond_to.send(Err(e.clone()));
        }
        for queued in self.queue.drain(..) {
            let _ = queued.respond_to.send(Err(e.clone()));
        }
    }

    async fn shutdown(&mut self) {
        let tag = next_tag(&mut self.tag_counter);
        let encoded = encode::encode(&tag, &Command::Logout, &self.caps);
        let _ = self.stream.write_all(&encoded.initial).await;
        let _ = self.stream.flush().await;
        self.state = SessionState::Disconnected;
        self.fail_all(ImapError::Disconnected);
    }
}
