//! TLS connection helpers: wrap TcpStream with rustls (implicit TLS, STARTTLS).
//!
//! Connection can be plain or secure; implicit TLS handshakes immediately on
//! connect; STARTTLS upgrades a plain stream once the server accepts the
//! command.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio_rustls::rustls::client::ClientConfig;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::RootCertStore;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream as TokioTlsStream;
use tokio_rustls::TlsConnector;

use crate::config::{SessionConfig, TlsMode};
use crate::error::ImapError;

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

fn default_client_config() -> Arc<ClientConfig> {
    let config = ClientConfig::builder()
        .with_root_certificates(build_root_store())
        .with_no_client_auth();
    Arc::new(config)
}

static DEFAULT_CONNECTOR: std::sync::OnceLock<TlsConnector> = std::sync::OnceLock::new();

fn default_connector() -> &'static TlsConnector {
    DEFAULT_CONNECTOR.get_or_init(|| TlsConnector::from(default_client_config()))
}

/// Async TLS stream (wraps tokio-rustls client TlsStream over TcpStream).
pub struct TlsStreamWrapper {
    inner: TokioTlsStream<TcpStream>,
}

impl TlsStreamWrapper {
    /// Connect with implicit TLS (e.g. IMAPS 993).
    pub async fn connect_implicit_tls(host: &str, port: u16) -> io::Result<Self> {
        let tcp = TcpStream::connect((host, port)).await?;
        Self::handshake(tcp, host).await
    }

    async fn handshake(tcp: TcpStream, host: &str) -> io::Result<Self> {
        let host_static: &'static str = Box::leak(host.to_string().into_boxed_str());
        let server_name: ServerName<'_> = host_static
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?;
        let tls = default_connector()
            .connect(server_name, tcp)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
        Ok(Self { inner: tls })
    }

    pub fn inner(&self) -> &TokioTlsStream<TcpStream> {
        &self.inner
    }

    pub fn into_inner(self) -> TokioTlsStream<TcpStream> {
        self.inner
    }
}

impl AsyncRead for TlsStreamWrapper {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TlsStreamWrapper {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Plain TCP stream, used until a STARTTLS upgrade (or never, for `TlsMode::None`).
pub struct PlainStream {
    inner: TcpStream,
}

impl PlainStream {
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        let tcp = TcpStream::connect((host, port)).await?;
        Ok(Self { inner: tcp })
    }

    /// Upgrade this plain stream to TLS in place, after the server accepts STARTTLS.
    pub async fn upgrade_to_tls(self, host: &str) -> io::Result<TlsStreamWrapper> {
        TlsStreamWrapper::handshake(self.inner, host).await
    }

    pub fn inner(&self) -> &TcpStream {
        &self.inner
    }
}

impl AsyncRead for PlainStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for PlainStream {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Either side of a STARTTLS upgrade, so the session core can hold one value
/// across the transition instead of juggling two stream types. `Duplex`
/// carries an in-memory pipe, used by whole-session tests to drive the
/// session core without a real socket.
pub enum Stream {
    Plain(PlainStream),
    Tls(TlsStreamWrapper),
    Duplex(DuplexStream),
}

impl Stream {
    /// True once the transport itself is encrypted (irrespective of whether
    /// that happened via implicit TLS or STARTTLS).
    pub fn is_secure(&self) -> bool {
        matches!(self, Stream::Tls(_))
    }

    /// Upgrades a `Plain` stream to TLS after STARTTLS is accepted. No-op
    /// (returns self unchanged) if already secure.
    pub async fn upgrade_to_tls(self, host: &str) -> io::Result<Self> {
        match self {
            Stream::Plain(p) => Ok(Stream::Tls(p.upgrade_to_tls(host).await?)),
            already_tls => Ok(already_tls),
        }
    }
}

impl AsyncRead for Stream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(p) => Pin::new(p).poll_read(cx, buf),
            Stream::Tls(t) => Pin::new(t).poll_read(cx, buf),
            Stream::Duplex(d) => Pin::new(d).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Plain(p) => Pin::new(p).poll_write(cx, buf),
            Stream::Tls(t) => Pin::new(t).poll_write(cx, buf),
            Stream::Duplex(d) => Pin::new(d).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(p) => Pin::new(p).poll_flush(cx),
            Stream::Tls(t) => Pin::new(t).poll_flush(cx),
            Stream::Duplex(d) => Pin::new(d).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(p) => Pin::new(p).poll_shutdown(cx),
            Stream::Tls(t) => Pin::new(t).poll_shutdown(cx),
            Stream::Duplex(d) => Pin::new(d).poll_shutdown(cx),
        }
    }
}

/// Opens the transport named by `config.tls.mode`. `TlsMode::StartTls`
/// returns a plain stream; the caller upgrades it with `Stream::upgrade_to_tls`
/// once the server's STARTTLS response arrives.
pub async fn connect(config: &SessionConfig) -> Result<Stream, ImapError> {
    match config.tls.mode {
        TlsMode::Implicit => {
            let tls = TlsStreamWrapper::connect_implicit_tls(&config.host, config.port)
                .await
                .map_err(|e| ImapError::TlsError(e.to_string()))?;
            Ok(Stream::Tls(tls))
        }
        TlsMode::StartTls | TlsMode::None => {
            let plain = PlainStream::connect(&config.host, config.port)
                .await
                .map_err(|e| ImapError::ConnectionFailed(e.to_string()))?;
            Ok(Stream::Plain(plain))
        }
    }
}
