use async_trait::async_trait;
use log::*;

use native_tls::TlsConnector;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::client::ClientConfig;
use crate::serializer::SerializerType;
use crate::transport::{Transport, TransportError};

/// Opens a plain TCP connection to `host_ip:host_port`.
///
/// Shared by the websocket transport for both the `ws` and `wss` schemes
/// (the latter wraps the returned stream in [`connect_tls`]).
pub async fn connect_raw(host_ip: &str, host_port: u16) -> Result<TcpStream, TransportError> {
    let host_addr = format!("{}:{}", host_ip, host_port);

    match TcpStream::connect(&host_addr).await {
        Ok(s) => Ok(s),
        Err(e) => {
            error!("Failed to connect to server using raw tcp: {:?}", e);
            Err(TransportError::ConnectionFailed)
        }
    }
}

/// Opens a TCP connection wrapped in TLS, honoring [`ClientConfig::get_ssl_verify`].
pub async fn connect_tls(
    host_url: &str,
    host_port: u16,
    cfg: &ClientConfig,
) -> Result<tokio_native_tls::TlsStream<TcpStream>, TransportError> {
    let stream = connect_raw(host_url, host_port).await?;
    let mut tls_cfg = TlsConnector::builder();

    if !cfg.get_ssl_verify() {
        tls_cfg.danger_accept_invalid_certs(true);
    }

    let cx = match tls_cfg.build() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create TLS context : {:?}", e);
            return Err(TransportError::ConnectionFailed);
        }
    };
    let cx = tokio_native_tls::TlsConnector::from(cx);
    match cx.connect(host_url, stream).await {
        Ok(s) => Ok(s),
        Err(e) => {
            error!("Failed to establish TLS handshake : {:?}", e);
            Err(TransportError::ConnectionFailed)
        }
    }
}

/// Maximum wamp rawsocket payload the handshake can negotiate (2^24 bytes).
pub const MAX_MSG_SZ: u32 = 1 << 24;
/// Minimum wamp rawsocket payload the handshake can negotiate (2^9 bytes).
pub const MIN_MSG_SZ: u32 = 1 << 9;

/// The type of a rawsocket frame, carried in the high byte of its 4 byte prefix.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TcpMsg {
    Regular = 0,
    Ping = 1,
    Pong = 2,
}

impl TcpMsg {
    fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(TcpMsg::Regular),
            1 => Some(TcpMsg::Ping),
            2 => Some(TcpMsg::Pong),
            _ => None,
        }
    }

    fn to_id(self) -> u8 {
        self as u8
    }
}

/// The 4 byte handshake exchanged before any framed message flows.
///
/// Layout: `[0x7F, (msg_size_log2 << 4) | serializer_id, 0, 0]`. The server
/// echoes the same shape back, or flips the high nibble of byte 1 to `0xF`
/// and uses its low nibble as an error code when it rejects the handshake.
struct HandshakeCtx {
    msg_size: u32,
    serializer: SerializerType,
    client: [u8; 4],
    server: [u8; 4],
}

impl std::fmt::Debug for HandshakeCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeCtx")
            .field("msg_size", &self.msg_size)
            .field("serializer", &self.serializer)
            .field("client", &self.client)
            .field("server", &self.server)
            .finish()
    }
}

impl AsRef<[u8]> for HandshakeCtx {
    fn as_ref(&self) -> &[u8] {
        &self.client
    }
}

impl HandshakeCtx {
    fn new() -> Self {
        HandshakeCtx {
            msg_size: 0,
            serializer: SerializerType::Invalid,
            client: [0x7F, 0, 0, 0],
            server: [0; 4],
        }
    }

    /// Clamps `msg_size` to the nearest power of two the protocol allows and
    /// stores its log2 (minus [`MIN_MSG_SZ`]'s) in the upper nibble of byte 1.
    fn set_msg_size(&mut self, msg_size: u32) {
        let clamped = msg_size.clamp(MIN_MSG_SZ, MAX_MSG_SZ).next_power_of_two();
        self.msg_size = clamped;
        let exponent = clamped.trailing_zeros() as u8 - MIN_MSG_SZ.trailing_zeros() as u8;
        self.client[1] = (self.client[1] & 0x0F) | (exponent << 4);
    }

    fn set_serializer(&mut self, serializer: SerializerType) {
        self.serializer = serializer;
        self.client[1] = (self.client[1] & 0xF0) | (serializer as u8 & 0x0F);
    }

    fn srv_resp_bytes(&mut self) -> &mut [u8; 4] {
        &mut self.server
    }

    fn validate(&self) -> Result<(), TransportError> {
        if self.server[0] != 0x7F {
            error!("Server sent an invalid rawsocket handshake magic byte");
            return Err(TransportError::UnexpectedResponse);
        }
        if self.server[2] != 0 || self.server[3] != 0 {
            error!("Server sent non-zero reserved bytes in the rawsocket handshake");
            return Err(TransportError::UnexpectedResponse);
        }

        if self.server[1] & 0xF0 == 0xF0 {
            return Err(match self.server[1] & 0x0F {
                0 => TransportError::SerializerNotSupported(self.serializer.to_str().to_owned()),
                1 => TransportError::InvalidMaximumMsgSize(self.msg_size),
                2 => TransportError::MaximumServerConn,
                _ => TransportError::UnexpectedResponse,
            });
        }

        Ok(())
    }
}

/// The 4 byte header prefixing every rawsocket frame after the handshake:
/// 1 byte message type, 3 bytes big-endian payload length.
struct MsgPrefix {
    bytes: [u8; 4],
}

impl std::fmt::Debug for MsgPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsgPrefix")
            .field("msg_type", &self.msg_type())
            .field("payload_len", &self.payload_len())
            .finish()
    }
}

impl MsgPrefix {
    fn new() -> Self {
        MsgPrefix { bytes: [0; 4] }
    }

    fn new_from(msg_type: TcpMsg, len: Option<u32>) -> Self {
        let mut prefix = MsgPrefix { bytes: [msg_type.to_id(), 0, 0, 0] };
        if let Some(len) = len {
            prefix.set_msg_len(len);
        }
        prefix
    }

    fn set_msg_len(&mut self, len: u32) {
        let len_bytes = len.to_be_bytes();
        self.bytes[1..4].copy_from_slice(&len_bytes[1..4]);
    }

    fn msg_type(&self) -> Option<TcpMsg> {
        TcpMsg::from_id(self.bytes[0])
    }

    fn payload_len(&self) -> u32 {
        u32::from_be_bytes([0, self.bytes[1], self.bytes[2], self.bytes[3]])
    }
}

enum SockWrapper {
    Plain(TcpStream),
    Tls(Box<tokio_native_tls::TlsStream<TcpStream>>),
}

impl SockWrapper {
    async fn close(&mut self) {
        let res = match self {
            SockWrapper::Plain(s) => s.shutdown().await,
            SockWrapper::Tls(s) => s.shutdown().await,
        };
        if let Err(e) = res {
            warn!("Error while closing rawsocket transport : {:?}", e);
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self {
            SockWrapper::Plain(s) => s.write_all(data).await,
            SockWrapper::Tls(s) => s.write_all(data).await,
        }
    }

    async fn read_exact(&mut self, data: &mut [u8]) -> std::io::Result<()> {
        match self {
            SockWrapper::Plain(s) => s.read_exact(data).await.map(|_| ()),
            SockWrapper::Tls(s) => s.read_exact(data).await.map(|_| ()),
        }
    }
}

/// Rawsocket `Transport`: plain-TCP or TLS byte stream framed with
/// [`MsgPrefix`] headers, negotiated by a one-time [`HandshakeCtx`] exchange.
struct TcpTransport {
    sock: SockWrapper,
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        // `close()` is async; best-effort only, the peer will notice the
        // socket going away regardless.
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let header = MsgPrefix::new_from(TcpMsg::Regular, Some(data.len() as u32));
        if self.sock.write_all(&header.bytes).await.is_err() {
            error!("Failed to send rawsocket frame header");
            return Err(TransportError::SendFailed);
        }
        if self.sock.write_all(data).await.is_err() {
            error!("Failed to send rawsocket frame payload");
            return Err(TransportError::SendFailed);
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            let mut header = MsgPrefix::new();
            if self.sock.read_exact(&mut header.bytes).await.is_err() {
                error!("Failed to receive rawsocket frame header");
                return Err(TransportError::ReceiveFailed);
            }

            let mut payload = vec![0u8; header.payload_len() as usize];
            if self.sock.read_exact(&mut payload).await.is_err() {
                error!("Failed to receive rawsocket frame payload");
                return Err(TransportError::ReceiveFailed);
            }

            match header.msg_type() {
                Some(TcpMsg::Regular) => return Ok(payload),
                Some(TcpMsg::Ping) | Some(TcpMsg::Pong) => {
                    trace!("Ignoring rawsocket {:?} frame", header.msg_type());
                    continue;
                }
                None => {
                    error!("Unknown rawsocket message type {:?}", header.bytes[0]);
                    return Err(TransportError::UnexpectedResponse);
                }
            }
        }
    }

    async fn close(&mut self) {
        self.sock.close().await;
    }
}

/// Connects a WAMP rawsocket session to `host_ip:host_port`, performing the
/// magic-byte handshake and falling back through `config`'s serializer
/// preference list if the server rejects one.
pub async fn connect(
    host_ip: &str,
    host_port: u16,
    is_tls: bool,
    config: &ClientConfig,
) -> Result<(Box<dyn Transport + Send>, SerializerType), TransportError> {
    for serializer in config.get_serializers() {
        let mut sock = if is_tls {
            SockWrapper::Tls(Box::new(connect_tls(host_ip, host_port, config).await?))
        } else {
            SockWrapper::Plain(connect_raw(host_ip, host_port).await?)
        };

        let mut handshake = HandshakeCtx::new();
        handshake.set_serializer(*serializer);
        handshake.set_msg_size(config.get_max_msg_size().unwrap_or(MAX_MSG_SZ));

        if sock.write_all(handshake.as_ref()).await.is_err() {
            error!("Failed to send rawsocket handshake");
            return Err(TransportError::ConnectionFailed);
        }
        if sock.read_exact(handshake.srv_resp_bytes()).await.is_err() {
            error!("Failed to receive rawsocket handshake response");
            return Err(TransportError::ConnectionFailed);
        }

        match handshake.validate() {
            Ok(()) => return Ok((Box::new(TcpTransport { sock }), *serializer)),
            Err(TransportError::SerializerNotSupported(e)) => {
                warn!("Server rejected serializer {}, trying next", e);
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    Err(TransportError::ConnectionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_encodes_serializer_and_msg_size() {
        let mut hs = HandshakeCtx::new();
        hs.set_serializer(SerializerType::MsgPack);
        hs.set_msg_size(1 << 20);

        assert_eq!(hs.client[0], 0x7F);
        assert_eq!(hs.client[1] & 0x0F, SerializerType::MsgPack as u8);
        // 2^20 / 2^9 = 2^11, so the exponent nibble should be 11.
        assert_eq!(hs.client[1] >> 4, 11);
    }

    #[test]
    fn handshake_clamps_msg_size_to_protocol_bounds() {
        let mut hs = HandshakeCtx::new();
        hs.set_msg_size(1); // below MIN_MSG_SZ
        assert_eq!(hs.msg_size, MIN_MSG_SZ);

        hs.set_msg_size(u32::MAX);
        assert_eq!(hs.msg_size, MAX_MSG_SZ);
    }

    #[test]
    fn handshake_validate_accepts_matching_magic_byte() {
        let mut hs = HandshakeCtx::new();
        hs.set_serializer(SerializerType::Json);
        hs.server = [0x7F, hs.client[1], 0, 0];
        assert!(hs.validate().is_ok());
    }

    #[test]
    fn handshake_validate_maps_server_error_codes() {
        let mut hs = HandshakeCtx::new();
        hs.set_serializer(SerializerType::Cbor);
        hs.msg_size = MAX_MSG_SZ;

        hs.server = [0x7F, 0xF0, 0, 0];
        assert!(matches!(
            hs.validate(),
            Err(TransportError::SerializerNotSupported(_))
        ));

        hs.server = [0x7F, 0xF1, 0, 0];
        assert!(matches!(
            hs.validate(),
            Err(TransportError::InvalidMaximumMsgSize(_))
        ));

        hs.server = [0x7F, 0xF2, 0, 0];
        assert!(matches!(hs.validate(), Err(TransportError::MaximumServerConn)));

        hs.server = [0x00, 0xF0, 0, 0];
        assert!(matches!(
            hs.validate(),
            Err(TransportError::UnexpectedResponse)
        ));
    }

    #[test]
    fn msg_prefix_round_trips_type_and_length() {
        let prefix = MsgPrefix::new_from(TcpMsg::Regular, Some(0x01_02_03));
        assert_eq!(prefix.msg_type(), Some(TcpMsg::Regular));
        assert_eq!(prefix.payload_len(), 0x01_02_03);

        let ping = MsgPrefix::new_from(TcpMsg::Ping, None);
        assert_eq!(ping.msg_type(), Some(TcpMsg::Ping));
        assert_eq!(ping.payload_len(), 0);
    }
}
