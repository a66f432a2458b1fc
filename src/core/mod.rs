use std::collections::HashMap;

use log::*;
use tokio::select;
use tokio::sync::oneshot::Sender;
use tokio::sync::{mpsc, mpsc::UnboundedReceiver, mpsc::UnboundedSender};

use crate::common::*;
use crate::error::*;
use crate::serializer::*;
use crate::transport::*;

mod recv;
mod send;

use crate::client;
use crate::message::*;
pub use send::{Invocation, Request};

pub enum Status {
    /// Returned when the event loop should shutdown
    Shutdown,
    Ok,
}

/// The states a session moves through over its lifetime.
///
/// `Challenging` may be re-entered if the authentication method requires
/// multiple round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Challenging,
    Established,
    Closing,
    Closed,
}

pub type EventQueue = UnboundedReceiver<(
    WampId,           // Publication ID
    Option<WampArgs>, // Publish args
    Option<WampKwArgs>,
)>;
pub type PendingSubResult = Sender<
    Result<
        (
            WampId,     // Subscription ID
            EventQueue, // Queue for incoming events
        ),
        WampError,
    >,
>;
pub type RegistrationQueue = UnboundedReceiver<Invocation>;
pub type PendingRegisterResult = Sender<
    Result<
        (
            WampId,            // Registration ID
            RegistrationQueue, // Queue for incoming invocations
        ),
        WampError,
    >,
>;
pub type CallQueue = UnboundedReceiver<Result<(Option<WampArgs>, Option<WampKwArgs>), WampError>>;
pub type PendingCallResult = Sender<
    Result<
        (
            WampId,    // Call request ID, needed to cancel
            CallQueue, // Stream of progressive/final results
        ),
        WampError,
    >,
>;
pub type JoinResult = Sender<
    Result<
        (
            WampId,   // Session ID
            WampDict, // WELCOME.Details
        ),
        WampError,
    >,
>;

pub struct Core {
    /// Generic transport
    sock: Box<dyn Transport + Send>,
    state: SessionState,
    core_res: UnboundedSender<Result<(), WampError>>,
    /// Generic serializer
    serializer: Box<dyn SerializerImpl + Send>,
    ctl_sender: UnboundedSender<Request>,
    /// Channel for receiving client requests, wrapped in `Option` so ownership
    /// can be handed to the event loop without moving out of `&mut self`
    ctl_channel: Option<UnboundedReceiver<Request>>,

    next_call_id: WampId,
    next_publish_id: WampId,
    next_subscribe_id: WampId,
    next_unsubscribe_id: WampId,
    next_register_id: WampId,
    next_unregister_id: WampId,

    pending_call:
        HashMap<WampId, UnboundedSender<Result<(Option<WampArgs>, Option<WampKwArgs>), WampError>>>,
    pending_publish: HashMap<WampId, Sender<Result<Option<WampId>, WampError>>>,
    pending_sub: HashMap<WampId, PendingSubResult>,
    pending_unsub: HashMap<WampId, Sender<Result<(), WampError>>>,
    pending_register: HashMap<WampId, PendingRegisterResult>,
    pending_unregister: HashMap<WampId, Sender<Result<(), WampError>>>,

    /// Current subscriptions: subscription ID -> event sink
    subscriptions: HashMap<WampId, UnboundedSender<(WampId, Option<WampArgs>, Option<WampKwArgs>)>>,
    /// Current RPC registrations: registration ID -> invocation sink
    registrations: HashMap<WampId, UnboundedSender<Invocation>>,
}

impl Core {
    /// Establishes a connection with a WAMP server
    pub async fn connect(
        uri: &url::Url,
        cfg: &client::ClientConfig,
        ctl_channel: (UnboundedSender<Request>, UnboundedReceiver<Request>),
        core_res: UnboundedSender<Result<(), WampError>>,
    ) -> Result<Core, WampError> {
        // Connect to the router using the requested transport
        let (sock, serializer_type) = match uri.scheme() {
            "ws" | "wss" => ws::connect(uri, cfg).await?,
            "tcp" | "tcps" => {
                let host = match uri.host_str() {
                    Some(h) => h,
                    None => return Err(WampError::NoHostInUri),
                };
                let port = match uri.port() {
                    Some(p) => p,
                    None => {
                        return Err(From::from(
                            "No port specified for tcp rawsocket host".to_string(),
                        ))
                    }
                };
                tcp::connect(host, port, uri.scheme() == "tcps", cfg).await?
            }
            s => return Err(From::from(format!("Unsupported uri scheme : {}", s))),
        };

        debug!("Connected with serializer : {:?}", serializer_type);

        let serializer: Box<dyn SerializerImpl + Send> = match serializer_type {
            SerializerType::Json => Box::new(json::JsonSerializer {}),
            SerializerType::MsgPack => Box::new(msgpack::MsgPackSerializer {}),
            SerializerType::Cbor => Box::new(cbor::CborSerializer {}),
            SerializerType::Invalid => {
                return Err(From::from("Server picked no usable serializer".to_string()))
            }
        };

        Ok(Core {
            sock,
            core_res,
            state: SessionState::Connecting,
            serializer,
            ctl_sender: ctl_channel.0,
            ctl_channel: Some(ctl_channel.1),

            next_call_id: 0,
            next_publish_id: 0,
            next_subscribe_id: 0,
            next_unsubscribe_id: 0,
            next_register_id: 0,
            next_unregister_id: 0,

            pending_call: HashMap::new(),
            pending_publish: HashMap::new(),
            pending_sub: HashMap::new(),
            pending_unsub: HashMap::new(),
            pending_register: HashMap::new(),
            pending_unregister: HashMap::new(),

            subscriptions: HashMap::new(),
            registrations: HashMap::new(),
        })
    }

    /// Event loop that handles outbound/inbound events
    pub async fn event_loop(mut self) -> Result<(), WampError> {
        let mut ctl_channel = self.ctl_channel.take().unwrap();

        // Notify the client that we are now running the event loop
        let _ = self.core_res.send(Ok(()));
        loop {
            match select! {
                // Peer sent us a message
                msg = self.recv() => {
                    match msg {
                        Err(e) => {
                            /* The WAMP spec leaves it up to the server implementation
                            to decide whether to close a connection or not after a
                            GOODBYE message (leaving the realm). If we have left the realm,
                            treat a recv() error as expected */
                            if self.state == SessionState::Established {
                                error!("Failed to recv : {:?}", e);
                                let _ = self.core_res.send(Err(e));
                            }

                            break;
                        },
                        Ok(m) => self.handle_peer_msg(m).await,
                    }
                },
                // client wants to send a message
                req = ctl_channel.recv() => {
                    let req = match req {
                        Some(r) => r,
                        None => {
                            let _ = self.core_res.send(Err(WampError::ClientDied));
                            break;
                        }
                    };
                    self.handle_local_request(req).await
                }
            } {
                Status::Shutdown => {
                    let _ = self.core_res.send(Ok(()));
                    break;
                }
                Status::Ok => {}
            }
        }
        debug!("Event loop shutting down !");

        self.shutdown().await;

        Ok(())
    }

    /// Handles unsolicited messages from the peer (events, rpc calls, etc...)
    async fn handle_peer_msg(&mut self, msg: Msg) -> Status {
        match msg {
            Msg::Subscribed {
                request,
                subscription,
            } => recv::subscribed(self, request, subscription).await,
            Msg::Unsubscribed { request } => recv::unsubscribed(self, request).await,
            Msg::Published {
                request,
                publication,
            } => recv::published(self, request, publication).await,
            Msg::Event {
                subscription,
                publication,
                details: _,
                arguments,
                arguments_kw,
            } => recv::event(self, subscription, publication, arguments, arguments_kw).await,
            Msg::Registered {
                request,
                registration,
            } => recv::registered(self, request, registration).await,
            Msg::Unregistered { request } => recv::unregistered(self, request).await,
            Msg::Invocation {
                request,
                registration,
                details,
                arguments,
                arguments_kw,
            } => {
                recv::invocation(
                    self,
                    request,
                    registration,
                    details,
                    arguments,
                    arguments_kw,
                )
                .await
            }
            Msg::Result {
                request,
                details,
                arguments,
                arguments_kw,
            } => recv::call_result(self, request, details, arguments, arguments_kw).await,
            Msg::Goodbye { details, reason } => recv::goodbye(self, details, reason).await,
            Msg::Abort { details, reason } => recv::abort(self, details, reason).await,
            Msg::Error {
                typ,
                request,
                details,
                error,
                arguments,
                arguments_kw,
            } => recv::error(self, typ, request, details, error, arguments, arguments_kw).await,
            _ => {
                warn!("Received unhandled message {:?}", msg);
                Status::Ok
            }
        }
    }

    /// Handles the basic ways one can interact with the peer
    async fn handle_local_request(&mut self, req: Request) -> Status {
        match req {
            Request::Shutdown => Status::Shutdown,
            Request::Join {
                uri,
                roles,
                agent_str,
                authid,
                authextra,
                authenticators,
                res,
            } => {
                send::join_realm(
                    self,
                    uri,
                    roles,
                    agent_str,
                    authid,
                    authextra,
                    authenticators,
                    res,
                )
                .await
            }
            Request::Leave { res } => send::leave_realm(self, res).await,
            Request::Subscribe { uri, options, res } => {
                send::subscribe(self, uri, options, res).await
            }
            Request::Unsubscribe { sub_id, res } => send::unsubscribe(self, sub_id, res).await,
            Request::Publish {
                uri,
                options,
                arguments,
                arguments_kw,
                res,
            } => send::publish(self, uri, options, arguments, arguments_kw, res).await,
            Request::Register { uri, options, res } => {
                send::register(self, uri, options, res).await
            }
            Request::Unregister {
                registration_id,
                res,
            } => send::unregister(self, registration_id, res).await,
            Request::InvocationResult { request, res } => {
                send::invoke_yield(self, request, res).await
            }
            Request::Call {
                uri,
                options,
                arguments,
                arguments_kw,
                res,
            } => send::call(self, uri, options, arguments, arguments_kw, res).await,
            Request::Cancel { request, mode } => send::cancel(self, request, mode).await,
        }
    }

    /// Serializes a message and sends it on the transport
    pub async fn send(&mut self, msg: &Msg) -> Result<(), WampError> {
        let payload = self.serializer.pack(msg)?;

        match std::str::from_utf8(&payload) {
            Ok(v) => debug!("Send : {}", v),
            Err(_) => debug!("Send : {:?}", msg),
        };

        self.sock.send(&payload).await?;

        Ok(())
    }

    /// Receives a message and deserializes it
    pub async fn recv(&mut self) -> Result<Msg, WampError> {
        let payload = self.sock.recv().await?;

        let msg = self.serializer.unpack(&payload);

        match std::str::from_utf8(&payload) {
            Ok(v) => debug!("Recv : {}", v),
            Err(_) => debug!("Recv : {:?}", msg),
        };

        Ok(msg?)
    }

    /// Closes the transport and fails every outstanding waiter/sink, so
    /// nothing is left dangling on a dead session (§4.2/§5 teardown contract)
    pub async fn shutdown(mut self) {
        self.state = SessionState::Closed;

        for (_, res) in self.pending_publish.drain() {
            let _ = res.send(Err(WampError::SessionClosed));
        }
        for (_, res) in self.pending_sub.drain() {
            let _ = res.send(Err(WampError::SessionClosed));
        }
        for (_, res) in self.pending_unsub.drain() {
            let _ = res.send(Err(WampError::SessionClosed));
        }
        for (_, res) in self.pending_register.drain() {
            let _ = res.send(Err(WampError::SessionClosed));
        }
        for (_, res) in self.pending_unregister.drain() {
            let _ = res.send(Err(WampError::SessionClosed));
        }
        for (_, tx) in self.pending_call.drain() {
            let _ = tx.send(Err(WampError::SessionClosed));
        }
        // Dropping these closes every live event/invocation stream
        self.subscriptions.clear();
        self.registrations.clear();

        self.sock.close().await;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::collections::HashSet;
    use tokio::sync::oneshot;

    use super::*;
    use crate::auth::{Authenticator, TicketAuthenticator};
    use crate::serializer::json::JsonSerializer;
    use crate::transport::{Transport, TransportError};

    /// In-memory stand-in for a real transport: "server" bytes are fed in
    /// through `inbound`, bytes the session writes are observable on `outbound`.
    struct MockTransport {
        inbound: UnboundedReceiver<Vec<u8>>,
        outbound: UnboundedSender<Vec<u8>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
            self.outbound
                .send(data.to_vec())
                .map_err(|_| TransportError::SendFailed)
        }

        async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
            self.inbound.recv().await.ok_or(TransportError::ReceiveFailed)
        }

        async fn close(&mut self) {}
    }

    /// Spins up a `Core` wired to a `MockTransport`, handing back the
    /// server-side ends of both channels plus the control channel used to
    /// drive the interaction surface, matching what `client::Client` would do.
    fn harness() -> (
        UnboundedSender<Vec<u8>>,
        UnboundedReceiver<Vec<u8>>,
        UnboundedSender<Request>,
    ) {
        let (server_to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, client_to_server) = mpsc::unbounded_channel();
        let (ctl_sender, ctl_receiver) = mpsc::unbounded_channel();
        let (core_res, _core_res_rx) = mpsc::unbounded_channel();

        let core = Core {
            sock: Box::new(MockTransport { inbound, outbound }),
            state: SessionState::Connecting,
            core_res,
            serializer: Box::new(JsonSerializer {}),
            ctl_sender: ctl_sender.clone(),
            ctl_channel: Some(ctl_receiver),

            next_call_id: 0,
            next_publish_id: 0,
            next_subscribe_id: 0,
            next_unsubscribe_id: 0,
            next_register_id: 0,
            next_unregister_id: 0,

            pending_call: HashMap::new(),
            pending_publish: HashMap::new(),
            pending_sub: HashMap::new(),
            pending_unsub: HashMap::new(),
            pending_register: HashMap::new(),
            pending_unregister: HashMap::new(),

            subscriptions: HashMap::new(),
            registrations: HashMap::new(),
        };

        tokio::spawn(core.event_loop());

        (server_to_client, client_to_server, ctl_sender)
    }

    async fn push_server_msg(server_to_client: &UnboundedSender<Vec<u8>>, msg: Msg) {
        let serializer = JsonSerializer {};
        server_to_client
            .send(serializer.pack(&msg).unwrap())
            .unwrap();
    }

    async fn next_client_msg(client_to_server: &mut UnboundedReceiver<Vec<u8>>) -> Msg {
        let serializer = JsonSerializer {};
        let bytes = client_to_server
            .recv()
            .await
            .expect("event loop did not send anything");
        serializer.unpack(&bytes).unwrap()
    }

    async fn join(
        ctl: &UnboundedSender<Request>,
        authenticators: Vec<Box<dyn Authenticator>>,
    ) -> oneshot::Receiver<Result<(WampId, WampDict), WampError>> {
        let (res, rx) = oneshot::channel();
        ctl.send(Request::Join {
            uri: "realm1".to_owned(),
            roles: HashSet::new(),
            agent_str: None,
            authid: None,
            authextra: WampDict::new(),
            authenticators,
            res,
        })
        .unwrap();
        rx
    }

    // S1 — anonymous welcome
    #[tokio::test]
    async fn anonymous_welcome_adopts_session_id() {
        let (server_to_client, mut client_to_server, ctl) = harness();

        let join_result = join(&ctl, Vec::new()).await;

        match next_client_msg(&mut client_to_server).await {
            Msg::Hello { realm, .. } => assert_eq!(realm, "realm1"),
            m => panic!("expected HELLO, got {:?}", m),
        }

        let mut details = WampDict::new();
        details.insert("authrole".to_owned(), Arg::String("anonymous".to_owned()));
        push_server_msg(
            &server_to_client,
            Msg::Welcome {
                session: 42,
                details,
            },
        )
        .await;

        let (session_id, details) = join_result.await.unwrap().unwrap();
        assert_eq!(session_id, 42);
        assert_eq!(details.get("authrole"), Some(&Arg::String("anonymous".to_owned())));
    }

    // S2 — challenge then welcome
    #[tokio::test]
    async fn ticket_challenge_then_welcome() {
        let (server_to_client, mut client_to_server, ctl) = harness();

        let authenticators: Vec<Box<dyn Authenticator>> =
            vec![Box::new(TicketAuthenticator::new("secret"))];
        let join_result = join(&ctl, authenticators).await;

        match next_client_msg(&mut client_to_server).await {
            Msg::Hello { .. } => {}
            m => panic!("expected HELLO, got {:?}", m),
        }

        push_server_msg(
            &server_to_client,
            Msg::Challenge {
                authmethod: "ticket".to_owned(),
                extra: WampDict::new(),
            },
        )
        .await;

        match next_client_msg(&mut client_to_server).await {
            Msg::Authenticate { signature, .. } => assert_eq!(signature, "secret"),
            m => panic!("expected AUTHENTICATE, got {:?}", m),
        }

        push_server_msg(
            &server_to_client,
            Msg::Welcome {
                session: 7,
                details: WampDict::new(),
            },
        )
        .await;

        let (session_id, _) = join_result.await.unwrap().unwrap();
        assert_eq!(session_id, 7);
    }

    // S3 — unsupported challenge method
    #[tokio::test]
    async fn challenge_with_no_matching_authenticator_goodbyes_and_fails() {
        let (server_to_client, mut client_to_server, ctl) = harness();

        let authenticators: Vec<Box<dyn Authenticator>> =
            vec![Box::new(TicketAuthenticator::new("secret"))];
        let join_result = join(&ctl, authenticators).await;

        let _ = next_client_msg(&mut client_to_server).await; // HELLO

        push_server_msg(
            &server_to_client,
            Msg::Challenge {
                authmethod: "wampcra".to_owned(),
                extra: WampDict::new(),
            },
        )
        .await;

        match next_client_msg(&mut client_to_server).await {
            Msg::Goodbye { reason, .. } => assert_eq!(reason, "wamp.close.goodbye_and_out"),
            m => panic!("expected GOODBYE, got {:?}", m),
        }

        assert!(join_result.await.unwrap().is_err());
    }

    // S4 — progressive call results
    #[tokio::test]
    async fn call_yields_progressive_results_in_order_then_closes() {
        let (server_to_client, mut client_to_server, ctl) = harness();

        let (res, result) = oneshot::channel();
        ctl.send(Request::Call {
            uri: "p".to_owned(),
            options: WampDict::new(),
            arguments: None,
            arguments_kw: None,
            res,
        })
        .unwrap();

        let request_id = match next_client_msg(&mut client_to_server).await {
            Msg::Call { request, .. } => request,
            m => panic!("expected CALL, got {:?}", m),
        };
        assert_eq!(request_id, 1);

        let (returned_id, mut queue) = result.await.unwrap().unwrap();
        assert_eq!(returned_id, request_id);

        let mut progress_details = WampDict::new();
        progress_details.insert("progress".to_owned(), Arg::Bool(true));
        push_server_msg(
            &server_to_client,
            Msg::Result {
                request: request_id,
                details: progress_details.clone(),
                arguments: Some(vec![Arg::Integer(1)]),
                arguments_kw: None,
            },
        )
        .await;
        push_server_msg(
            &server_to_client,
            Msg::Result {
                request: request_id,
                details: progress_details,
                arguments: Some(vec![Arg::Integer(2)]),
                arguments_kw: None,
            },
        )
        .await;
        push_server_msg(
            &server_to_client,
            Msg::Result {
                request: request_id,
                details: WampDict::new(),
                arguments: Some(vec![Arg::Integer(3)]),
                arguments_kw: None,
            },
        )
        .await;

        for expect in [1i64, 2, 3] {
            let (args, _) = queue.recv().await.unwrap().unwrap();
            assert_eq!(args, Some(vec![Arg::Integer(expect)]));
        }
        assert!(queue.recv().await.is_none(), "stream should close after final RESULT");
    }

    // S5 — call cancel
    #[tokio::test]
    async fn cancel_sends_cancel_with_mode() {
        let (_server_to_client, mut client_to_server, ctl) = harness();

        let (res, result) = oneshot::channel();
        ctl.send(Request::Call {
            uri: "p".to_owned(),
            options: WampDict::new(),
            arguments: None,
            arguments_kw: None,
            res,
        })
        .unwrap();

        let request_id = match next_client_msg(&mut client_to_server).await {
            Msg::Call { request, .. } => request,
            m => panic!("expected CALL, got {:?}", m),
        };
        let (_request_id, _queue) = result.await.unwrap().unwrap();

        ctl.send(Request::Cancel {
            request: request_id,
            mode: Some(CancelMode::Kill),
        })
        .unwrap();

        match next_client_msg(&mut client_to_server).await {
            Msg::Cancel { request, options } => {
                assert_eq!(request, request_id);
                assert_eq!(options.get("mode"), Some(&Arg::String("kill".to_owned())));
            }
            m => panic!("expected CANCEL, got {:?}", m),
        }
    }

    // S6 — subscribe / event / unsubscribe
    #[tokio::test]
    async fn unsubscribe_stops_further_event_delivery() {
        let (server_to_client, mut client_to_server, ctl) = harness();

        let (res, result) = oneshot::channel();
        ctl.send(Request::Subscribe {
            uri: "t".to_owned(),
            options: WampDict::new(),
            res,
        })
        .unwrap();

        let sub_request = match next_client_msg(&mut client_to_server).await {
            Msg::Subscribe { request, .. } => request,
            m => panic!("expected SUBSCRIBE, got {:?}", m),
        };

        push_server_msg(
            &server_to_client,
            Msg::Subscribed {
                request: sub_request,
                subscription: 9,
            },
        )
        .await;

        let (sub_id, mut events) = result.await.unwrap().unwrap();
        assert_eq!(sub_id, 9);

        push_server_msg(
            &server_to_client,
            Msg::Event {
                subscription: 9,
                publication: 100,
                details: WampDict::new(),
                arguments: Some(vec![Arg::String("hi".to_owned())]),
                arguments_kw: None,
            },
        )
        .await;

        let (pub_id, args, _) = events.recv().await.unwrap();
        assert_eq!(pub_id, 100);
        assert_eq!(args, Some(vec![Arg::String("hi".to_owned())]));

        let (res, result) = oneshot::channel();
        ctl.send(Request::Unsubscribe { sub_id, res }).unwrap();

        let unsub_request = match next_client_msg(&mut client_to_server).await {
            Msg::Unsubscribe { request, .. } => request,
            m => panic!("expected UNSUBSCRIBE, got {:?}", m),
        };
        push_server_msg(
            &server_to_client,
            Msg::Unsubscribed {
                request: unsub_request,
            },
        )
        .await;
        result.await.unwrap().unwrap();

        push_server_msg(
            &server_to_client,
            Msg::Event {
                subscription: 9,
                publication: 101,
                details: WampDict::new(),
                arguments: None,
                arguments_kw: None,
            },
        )
        .await;

        // Give the dropped sink a chance to actually close before asserting.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(
            events.recv().await.is_none(),
            "no EVENT should be delivered for a completed unsubscribe"
        );
    }

    // Invariant #6 — INVOCATION with no matching registration is rejected
    #[tokio::test]
    async fn invocation_for_unknown_registration_yields_error() {
        let (server_to_client, mut client_to_server, _ctl) = harness();

        push_server_msg(
            &server_to_client,
            Msg::Invocation {
                request: 55,
                registration: 999,
                details: WampDict::new(),
                arguments: None,
                arguments_kw: None,
            },
        )
        .await;

        match next_client_msg(&mut client_to_server).await {
            Msg::Error {
                typ,
                request,
                error,
                ..
            } => {
                assert_eq!(typ, INVOCATION_ID);
                assert_eq!(request, 55);
                assert_eq!(error, "wamp.error.no_such_registration");
            }
            m => panic!("expected ERROR, got {:?}", m),
        }
    }

    // Invariant #1 — per-class request ids are strictly increasing
    #[tokio::test]
    async fn subscribe_request_ids_are_monotonic() {
        let (server_to_client, mut client_to_server, ctl) = harness();

        for expected in [1u64, 2] {
            let (res, result) = oneshot::channel();
            ctl.send(Request::Subscribe {
                uri: "t".to_owned(),
                options: WampDict::new(),
                res,
            })
            .unwrap();

            let request = match next_client_msg(&mut client_to_server).await {
                Msg::Subscribe { request, .. } => request,
                m => panic!("expected SUBSCRIBE, got {:?}", m),
            };
            assert_eq!(request, expected);

            push_server_msg(
                &server_to_client,
                Msg::Subscribed {
                    request,
                    subscription: expected + 100,
                },
            )
            .await;
            result.await.unwrap().unwrap();
        }
    }

    // publish without acknowledge resolves without waiting on PUBLISHED
    #[tokio::test]
    async fn publish_without_ack_does_not_wait_for_published() {
        let (_server_to_client, mut client_to_server, ctl) = harness();

        let (res, result) = oneshot::channel();
        ctl.send(Request::Publish {
            uri: "t".to_owned(),
            options: WampDict::new(),
            arguments: None,
            arguments_kw: None,
            res,
        })
        .unwrap();

        match next_client_msg(&mut client_to_server).await {
            Msg::Publish { .. } => {}
            m => panic!("expected PUBLISH, got {:?}", m),
        }

        assert_eq!(result.await.unwrap().unwrap(), None);
    }
}
