use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use futures::FutureExt;
use log::*;
use tokio::sync::oneshot;
use tokio::sync::{mpsc, mpsc::UnboundedReceiver, mpsc::UnboundedSender};
use url::*;

pub use crate::common::*;
use crate::auth::Authenticator;
use crate::core::*;
use crate::error::*;
use crate::options::IntoWampDict;
use crate::serializer::SerializerType;

const DEFAULT_AGENT_STR: &str = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

/// Future driving the session's event loop. __Must__ be spawned by the
/// caller (e.g. with `tokio::spawn()`) immediately after [`Client::connect`].
pub type EventLoopFuture = Pin<Box<dyn Future<Output = Result<(), WampError>> + Send>>;

/// Options one can set when connecting to a WAMP server
pub struct ClientConfig {
    /// Replaces the default user agent string
    agent: String,
    /// A Set of all the roles the client will support
    roles: HashSet<ClientRole>,
    /// A priority list of which serializer to use when talking to the server
    serializers: Vec<SerializerType>,
    /// `HELLO.Details.authextra` sent along with every join attempt
    authextra: WampDict,
    /// Sets the maximum message to be sent over the transport
    max_msg_size: u32,
    /// When using a secure transport, this option disables certificate validation
    ssl_verify: bool,
    /// Additional WebSocket headers on establish connection
    websocket_headers: HashMap<String, String>,
}

impl Default for ClientConfig {
    /// Creates a client config with reasonable defaults
    ///
    /// Roles :
    /// - [ClientRole::Caller]
    /// - [ClientRole::Callee]
    /// - [ClientRole::Publisher]
    /// - [ClientRole::Subscriber]
    ///
    /// Serializers, in order of preference :
    /// 1. [SerializerType::Json]
    /// 2. [SerializerType::MsgPack]
    /// 3. [SerializerType::Cbor]
    fn default() -> Self {
        ClientConfig {
            agent: String::from(DEFAULT_AGENT_STR),
            roles: [
                ClientRole::Caller,
                ClientRole::Callee,
                ClientRole::Publisher,
                ClientRole::Subscriber,
            ]
            .iter()
            .cloned()
            .collect(),
            serializers: vec![
                SerializerType::Json,
                SerializerType::MsgPack,
                SerializerType::Cbor,
            ],
            authextra: WampDict::new(),
            max_msg_size: 0,
            ssl_verify: true,
            websocket_headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Replaces the default user agent string. Set to a zero length string to disable
    pub fn set_agent<T: AsRef<str>>(mut self, agent: T) -> Self {
        self.agent = String::from(agent.as_ref());
        self
    }
    /// Returns the currently set agent string
    pub fn get_agent(&self) -> &str {
        &self.agent
    }

    /// Sets the `authextra` dict sent in `HELLO.Details` on every join attempt
    pub fn set_authextra(mut self, authextra: WampDict) -> Self {
        self.authextra = authextra;
        self
    }
    pub fn get_authextra(&self) -> &WampDict {
        &self.authextra
    }

    /// Sets the maximum payload size which can be sent over the transport.
    /// Set to 0 to use the default.
    pub fn set_max_msg_size(mut self, msg_size: u32) -> Self {
        self.max_msg_size = msg_size;
        self
    }
    /// Returns the maximum message size for the transport
    pub fn get_max_msg_size(&self) -> Option<u32> {
        if self.max_msg_size == 0 {
            None
        } else {
            Some(self.max_msg_size)
        }
    }

    /// Sets the serializers that will be used in order of preference (serializers[0] will be attempted first)
    pub fn set_serializers(mut self, serializers: Vec<SerializerType>) -> Self {
        self.serializers = serializers;
        self
    }
    /// Returns the priority list of serializers
    pub fn get_serializers(&self) -> &Vec<SerializerType> {
        &self.serializers
    }

    /// Sets the roles that are intended to be used by the client
    pub fn set_roles(mut self, roles: Vec<ClientRole>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }
    pub fn get_roles(&self) -> &HashSet<ClientRole> {
        &self.roles
    }

    /// Enables (default) or disables TLS certificate validation
    pub fn set_ssl_verify(mut self, val: bool) -> Self {
        self.ssl_verify = val;
        self
    }
    /// Returns whether certificate validation is enabled
    pub fn get_ssl_verify(&self) -> bool {
        self.ssl_verify
    }

    pub fn add_websocket_header<T: Into<String>>(mut self, key: T, val: T) -> Self {
        self.websocket_headers.insert(key.into(), val.into());
        self
    }
    pub fn get_websocket_headers(&self) -> &HashMap<String, String> {
        &self.websocket_headers
    }
}

/// Handle to an in-flight or streaming RPC call.
///
/// Progressive `RESULT`s (and the final one) arrive on the inner queue;
/// `cancel()` requests the router interrupt the call.
pub struct CallHandle {
    request: WampId,
    queue: CallQueue,
    ctl_channel: UnboundedSender<Request>,
}

impl CallHandle {
    /// The CALL's request id, useful for correlating logs.
    pub fn request_id(&self) -> WampId {
        self.request
    }

    /// Waits for the next progressive or final result. Returns `None` once
    /// the call has completed and no more results will arrive.
    pub async fn recv(&mut self) -> Option<Result<(Option<WampArgs>, Option<WampKwArgs>), WampError>> {
        self.queue.recv().await
    }

    /// Sends a CANCEL for this call. Does not wait for any acknowledgement;
    /// the final outcome (if any) still arrives through `recv()`.
    pub fn cancel(&self, mode: Option<CancelMode>) {
        let _ = self.ctl_channel.send(Request::Cancel {
            request: self.request,
            mode,
        });
    }
}

/// Allows interaction as a client with a WAMP server
pub struct Client {
    config: ClientConfig,
    core_res: UnboundedReceiver<Result<(), WampError>>,
    state: SessionState,
    /// Roles supported by the server, from WELCOME.Details.roles
    server_roles: HashSet<String>,
    /// Current Session ID
    session_id: Option<WampId>,
    /// `WELCOME.Details.authid`, the authentication id the server assigned
    auth_id: Option<String>,
    /// `WELCOME.Details.authrole`, the authorization role granted to the session
    auth_role: Option<String>,
    /// `WELCOME.Details.authmethod`, the authmethod the join actually used
    auth_method: Option<String>,
    /// `WELCOME.Details.authprovider`, the source of the auth information
    auth_provider: Option<String>,
    /// Channel to send requests to the event loop
    ctl_channel: UnboundedSender<Request>,
}

impl Client {
    /// Connects to a WAMP server using the specified protocol.
    ///
    /// On success, this returns the `Client` plus the event loop future,
    /// which __MUST__ be spawned by the caller (e.g. with `tokio::spawn()`).
    ///
    /// To customize connection parameters, see [`ClientConfig`].
    pub async fn connect<T: AsRef<str>>(
        uri: T,
        cfg: Option<ClientConfig>,
    ) -> Result<(Client, EventLoopFuture), WampError> {
        let uri = match Url::parse(uri.as_ref()) {
            Ok(u) => u,
            Err(e) => return Err(WampError::InvalidUri(e)),
        };

        let config = cfg.unwrap_or_default();

        let (ctl_channel, ctl_receiver) = mpsc::unbounded_channel();
        let (core_res_w, core_res) = mpsc::unbounded_channel();

        let ctl_sender = ctl_channel.clone();
        let core = Core::connect(&uri, &config, (ctl_sender, ctl_receiver), core_res_w).await?;

        Ok((
            Client {
                config,
                server_roles: HashSet::new(),
                session_id: None,
                auth_id: None,
                auth_role: None,
                auth_method: None,
                auth_provider: None,
                ctl_channel,
                core_res,
                state: SessionState::Connecting,
            },
            Box::pin(core.event_loop()),
        ))
    }

    /// Joins a realm anonymously (no authentication).
    pub async fn join_realm<T: Into<String>>(&mut self, realm: T) -> Result<(), WampError> {
        self.join_realm_with_authentication(realm, None::<String>, Vec::new())
            .await
    }

    /// Joins a realm, offering `authenticators` to answer any `CHALLENGE` the
    /// server sends. The authenticator whose [`Authenticator::name`] matches
    /// the challenge's `authmethod` is used; if none match the join fails.
    pub async fn join_realm_with_authentication<Realm, AuthId>(
        &mut self,
        realm: Realm,
        authid: Option<AuthId>,
        authenticators: Vec<Box<dyn Authenticator>>,
    ) -> Result<(), WampError>
    where
        Realm: Into<String>,
        AuthId: Into<String>,
    {
        if self.session_id.is_some() {
            return Err(WampError::AlreadyConnected);
        }

        let realm = realm.into();
        if !is_valid_strict_uri(&realm) {
            return Err(WampError::InvalidRealmUri(realm));
        }

        let (res_sender, res) = oneshot::channel();
        if self
            .ctl_channel
            .send(Request::Join {
                uri: realm,
                roles: self.config.roles.clone(),
                agent_str: if self.config.agent.is_empty() {
                    None
                } else {
                    Some(self.config.agent.clone())
                },
                authid: authid.map(Into::into),
                authextra: self.config.authextra.clone(),
                authenticators,
                res: res_sender,
            })
            .is_err()
        {
            return Err(WampError::ClientDied);
        }

        let (session_id, welcome_details) = match res.await {
            Ok(r) => r?,
            Err(_) => return Err(WampError::ClientDied),
        };

        if let Some(Arg::Dict(roles)) = welcome_details.get("roles") {
            self.server_roles = roles.keys().cloned().collect();
        }
        if let Some(Arg::String(authid)) = welcome_details.get("authid") {
            self.auth_id = Some(authid.clone());
        }
        if let Some(Arg::String(authrole)) = welcome_details.get("authrole") {
            self.auth_role = Some(authrole.clone());
        }
        if let Some(Arg::String(authmethod)) = welcome_details.get("authmethod") {
            self.auth_method = Some(authmethod.clone());
        }
        if let Some(Arg::String(authprovider)) = welcome_details.get("authprovider") {
            self.auth_provider = Some(authprovider.clone());
        }

        self.session_id = Some(session_id);
        self.state = SessionState::Established;
        debug!("Joined realm, session_id {}", session_id);

        Ok(())
    }

    /// Leaves the current realm and terminates the session with the server
    pub async fn leave_realm(&mut self) -> Result<(), WampError> {
        if self.session_id.take().is_none() {
            return Ok(());
        }

        let (res, result) = oneshot::channel();
        if self.ctl_channel.send(Request::Leave { res }).is_err() {
            return Err(WampError::ClientDied);
        }

        match result.await {
            Ok(r) => r?,
            Err(_) => return Err(WampError::ClientDied),
        };

        self.state = SessionState::Closing;

        Ok(())
    }

    /// Subscribes to events on the given topic.
    ///
    /// `options` accepts a raw [`WampDict`] or any of the typed builders in
    /// [`crate::options`] (e.g. `SubscribeOptions::new().with_match("prefix")`).
    ///
    /// Returns a subscription id (needed to unsubscribe) and the receive end
    /// of a channel fed by every `EVENT` published on the topic.
    pub async fn subscribe<T: AsRef<str>, O: IntoWampDict>(
        &self,
        topic: T,
        options: O,
    ) -> Result<(WampId, EventQueue), WampError> {
        self.require_established()?;

        let (res, result) = oneshot::channel();
        if self
            .ctl_channel
            .send(Request::Subscribe {
                uri: topic.as_ref().to_string(),
                options: options.into_wamp_dict(),
                res,
            })
            .is_err()
        {
            return Err(WampError::ClientDied);
        }

        match result.await {
            Ok(r) => r,
            Err(_) => Err(WampError::ClientDied),
        }
    }

    /// Unsubscribes a previously subscribed topic
    pub async fn unsubscribe(&self, sub_id: WampId) -> Result<(), WampError> {
        let (res, result) = oneshot::channel();
        if self
            .ctl_channel
            .send(Request::Unsubscribe { sub_id, res })
            .is_err()
        {
            return Err(WampError::ClientDied);
        }

        match result.await {
            Ok(r) => r,
            Err(_) => Err(WampError::ClientDied),
        }
    }

    /// Publishes an event on a topic.
    ///
    /// Set `acknowledge: true` in `options` to wait for the router's
    /// `PUBLISHED` reply and receive the publication id; otherwise this
    /// resolves as soon as the `PUBLISH` has been sent.
    pub async fn publish<T: AsRef<str>, O: IntoWampDict>(
        &self,
        topic: T,
        options: O,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    ) -> Result<Option<WampId>, WampError> {
        self.require_established()?;

        let (res, result) = oneshot::channel();
        if self
            .ctl_channel
            .send(Request::Publish {
                uri: topic.as_ref().to_string(),
                options: options.into_wamp_dict(),
                arguments,
                arguments_kw,
                res,
            })
            .is_err()
        {
            return Err(WampError::ClientDied);
        }

        match result.await {
            Ok(r) => r,
            Err(_) => Err(WampError::ClientDied),
        }
    }

    /// Registers a procedure. Incoming `INVOCATION`s arrive on the returned
    /// queue; each [`Invocation`] carries a `reply()` hook used to answer it.
    pub async fn register<T: AsRef<str>, O: IntoWampDict>(
        &self,
        uri: T,
        options: O,
    ) -> Result<(WampId, RegistrationQueue), WampError> {
        self.require_established()?;

        let (res, result) = oneshot::channel();
        if self
            .ctl_channel
            .send(Request::Register {
                uri: uri.as_ref().to_string(),
                options: options.into_wamp_dict(),
                res,
            })
            .is_err()
        {
            return Err(WampError::ClientDied);
        }

        match result.await {
            Ok(r) => r,
            Err(_) => Err(WampError::ClientDied),
        }
    }

    /// Unregisters a procedure
    pub async fn unregister(&self, registration_id: WampId) -> Result<(), WampError> {
        let (res, result) = oneshot::channel();
        if self
            .ctl_channel
            .send(Request::Unregister {
                registration_id,
                res,
            })
            .is_err()
        {
            return Err(WampError::ClientDied);
        }

        match result.await {
            Ok(r) => r,
            Err(_) => Err(WampError::ClientDied),
        }
    }

    /// Calls a registered procedure. Unlike subscribe/register, this does not
    /// wait for any acknowledgement message — WAMP's CALL flow has none — the
    /// handle is returned as soon as the `CALL` is sent, then fed by
    /// `RESULT`/`ERROR` as they arrive.
    pub async fn call<T: AsRef<str>, O: IntoWampDict>(
        &self,
        uri: T,
        options: O,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    ) -> Result<CallHandle, WampError> {
        self.require_established()?;

        let (res, result) = oneshot::channel();
        if self
            .ctl_channel
            .send(Request::Call {
                uri: uri.as_ref().to_string(),
                options: options.into_wamp_dict(),
                arguments,
                arguments_kw,
                res,
            })
            .is_err()
        {
            return Err(WampError::ClientDied);
        }

        let (request, queue) = match result.await {
            Ok(r) => r?,
            Err(_) => return Err(WampError::ClientDied),
        };

        Ok(CallHandle {
            request,
            queue,
            ctl_channel: self.ctl_channel.clone(),
        })
    }

    fn require_established(&self) -> Result<(), WampError> {
        if self.session_id.is_none() {
            return Err(WampError::NotConnected);
        }
        Ok(())
    }

    /// Returns the current session id, if joined to a realm
    pub fn session_id(&self) -> Option<WampId> {
        self.session_id
    }

    /// Returns the roles the server advertised in `WELCOME.Details.roles`
    pub fn server_roles(&self) -> &HashSet<String> {
        &self.server_roles
    }

    /// Returns the `authid` the server assigned in `WELCOME.Details.authid`
    pub fn auth_id(&self) -> Option<&str> {
        self.auth_id.as_deref()
    }

    /// Returns the authorization role granted in `WELCOME.Details.authrole`
    pub fn auth_role(&self) -> Option<&str> {
        self.auth_role.as_deref()
    }

    /// Returns the authmethod the join used, from `WELCOME.Details.authmethod`
    pub fn auth_method(&self) -> Option<&str> {
        self.auth_method.as_deref()
    }

    /// Returns the auth provider from `WELCOME.Details.authprovider`
    pub fn auth_provider(&self) -> Option<&str> {
        self.auth_provider.as_deref()
    }

    /// Returns whether the session is established (joined to a realm)
    pub fn is_connected(&mut self) -> bool {
        self.poll_state();
        self.state == SessionState::Established
    }

    /// Returns the current state of the session
    pub fn state(&mut self) -> SessionState {
        self.poll_state();
        self.state
    }

    /// Drains any pending status update from the event loop without blocking
    fn poll_state(&mut self) {
        while let Some(Some(res)) = self.core_res.recv().now_or_never() {
            if res.is_err() {
                self.state = SessionState::Closed;
            }
        }
    }

    /// Blocks the caller until the event loop reports the connection closed
    pub async fn block_until_disconnect(&mut self) -> Result<(), WampError> {
        loop {
            match self.core_res.recv().await {
                Some(Ok(())) => continue,
                Some(Err(e)) => {
                    self.state = SessionState::Closed;
                    return Err(e);
                }
                None => {
                    self.state = SessionState::Closed;
                    return Ok(());
                }
            }
        }
    }

    /// Cleanly closes the connection with the server
    pub async fn disconnect(mut self) {
        if self.session_id.is_some() {
            let _ = self.leave_realm().await;
        }

        let _ = self.ctl_channel.send(Request::Shutdown);

        match self.core_res.recv().await {
            Some(Err(e)) => error!("Error while shutting down : {:?}", e),
            None => warn!("Core never sent a status after shutting down"),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a `Client` directly, bypassing `Client::connect` (and therefore
    /// any real transport), with a task standing in for the event loop that
    /// answers exactly one `Request::Join` the way `Core` would on a
    /// successful WELCOME.
    fn client_with_stub_join(welcome_details: WampDict) -> Client {
        let (ctl_channel, mut ctl_receiver) = mpsc::unbounded_channel();
        let (_core_res_w, core_res) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            if let Some(Request::Join { res, .. }) = ctl_receiver.recv().await {
                let _ = res.send(Ok((42, welcome_details)));
            }
        });

        Client {
            config: ClientConfig::default(),
            core_res,
            state: SessionState::Connecting,
            server_roles: HashSet::new(),
            session_id: None,
            auth_id: None,
            auth_role: None,
            auth_method: None,
            auth_provider: None,
            ctl_channel,
        }
    }

    // S1 — anonymous welcome, checked through the public `Client` surface.
    #[tokio::test]
    async fn anonymous_join_adopts_session_and_auth_role() {
        let mut details = WampDict::new();
        details.insert("authrole".to_owned(), Arg::String("anonymous".to_owned()));
        let mut client = client_with_stub_join(details);

        client
            .join_realm("realm1")
            .await
            .expect("join should succeed");

        assert_eq!(client.session_id(), Some(42));
        assert_eq!(client.auth_role(), Some("anonymous"));
        assert_eq!(client.auth_id(), None);
    }

    #[tokio::test]
    async fn join_adopts_full_identity_from_welcome_details() {
        let mut details = WampDict::new();
        details.insert("authid".to_owned(), Arg::String("alice".to_owned()));
        details.insert("authrole".to_owned(), Arg::String("user".to_owned()));
        details.insert("authmethod".to_owned(), Arg::String("ticket".to_owned()));
        details.insert(
            "authprovider".to_owned(),
            Arg::String("static".to_owned()),
        );
        let mut client = client_with_stub_join(details);

        client
            .join_realm_with_authentication(
                "realm1",
                Some("alice"),
                vec![Box::new(crate::auth::TicketAuthenticator::new("secret"))],
            )
            .await
            .expect("join should succeed");

        assert_eq!(client.auth_id(), Some("alice"));
        assert_eq!(client.auth_role(), Some("user"));
        assert_eq!(client.auth_method(), Some("ticket"));
        assert_eq!(client.auth_provider(), Some("static"));
    }

    #[tokio::test]
    async fn join_realm_rejects_invalid_uri_without_contacting_the_event_loop() {
        let mut client = client_with_stub_join(WampDict::new());

        let err = client
            .join_realm(".leading.dot")
            .await
            .expect_err("strict URI validation should reject a leading dot");

        assert!(matches!(err, WampError::InvalidRealmUri(_)));
        assert_eq!(client.session_id(), None);
    }
}
