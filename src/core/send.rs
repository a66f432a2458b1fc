use std::collections::HashSet;

use log::*;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot::Sender;

use crate::auth::Authenticator;
use crate::common::*;
use crate::core::*;
use crate::message::*;

/// A single invocation of a registered procedure, handed to the registration's
/// invocation stream. The response hook funnels the eventual `YIELD`/`ERROR`
/// back through the same control channel the interaction surface uses.
pub struct Invocation {
    pub request: WampId,
    pub registration: WampId,
    pub details: WampDict,
    pub arguments: Option<WampArgs>,
    pub arguments_kw: Option<WampKwArgs>,
    ctl_channel: UnboundedSender<Request>,
}

impl Invocation {
    pub(crate) fn new(
        request: WampId,
        registration: WampId,
        details: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        ctl_channel: UnboundedSender<Request>,
    ) -> Self {
        Invocation {
            request,
            registration,
            details,
            arguments,
            arguments_kw,
            ctl_channel,
        }
    }

    /// Sends back the result of processing this invocation as a `YIELD`, or
    /// an `ERROR` if `result` is `Err`.
    pub fn reply(self, result: Result<(Option<WampArgs>, Option<WampKwArgs>), WampError>) {
        let _ = self.ctl_channel.send(Request::InvocationResult {
            request: self.request,
            res: result,
        });
    }
}

pub enum Request {
    Shutdown,
    Join {
        uri: WampString,
        roles: HashSet<ClientRole>,
        agent_str: Option<WampString>,
        authid: Option<WampString>,
        authextra: WampDict,
        authenticators: Vec<Box<dyn Authenticator>>,
        res: JoinResult,
    },
    Leave {
        res: Sender<Result<(), WampError>>,
    },
    Subscribe {
        uri: WampString,
        options: WampDict,
        res: PendingSubResult,
    },
    Unsubscribe {
        sub_id: WampId,
        res: Sender<Result<(), WampError>>,
    },
    Publish {
        uri: WampString,
        options: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        res: Sender<Result<Option<WampId>, WampError>>,
    },
    Register {
        uri: WampString,
        options: WampDict,
        res: PendingRegisterResult,
    },
    Unregister {
        registration_id: WampId,
        res: Sender<Result<(), WampError>>,
    },
    InvocationResult {
        request: WampId,
        res: Result<(Option<WampArgs>, Option<WampKwArgs>), WampError>,
    },
    Call {
        uri: WampString,
        options: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        res: PendingCallResult,
    },
    Cancel {
        request: WampId,
        mode: Option<CancelMode>,
    },
}

/// Handler for a join realm request: sends `HELLO` and drives the handshake
/// (`CHALLENGE`* then `WELCOME`/`ABORT`) inline, before the event loop's
/// steady-state `select!` ever sees another peer message.
pub async fn join_realm(
    core: &mut Core,
    uri: WampString,
    roles: HashSet<ClientRole>,
    agent_str: Option<WampString>,
    authid: Option<WampString>,
    authextra: WampDict,
    authenticators: Vec<Box<dyn Authenticator>>,
    res: JoinResult,
) -> Status {
    let mut details: WampDict = WampDict::new();
    let mut client_roles: WampDict = WampDict::new();
    for role in &roles {
        client_roles.insert(String::from(role.to_str()), Arg::Dict(WampDict::new()));
    }
    details.insert("roles".to_owned(), Arg::Dict(client_roles));

    if let Some(agent) = agent_str {
        details.insert("agent".to_owned(), Arg::String(agent));
    }

    if !authenticators.is_empty() {
        details.insert(
            "authmethods".to_owned(),
            Arg::List(
                authenticators
                    .iter()
                    .map(|a| Arg::String(a.name().to_owned()))
                    .collect::<Vec<_>>(),
            ),
        );
    }

    if let Some(authid) = authid {
        details.insert("authid".to_owned(), Arg::String(authid));
    }

    if !authextra.is_empty() {
        details.insert("authextra".to_owned(), Arg::Dict(authextra));
    }

    if let Err(e) = core
        .send(&Msg::Hello {
            realm: uri,
            details,
        })
        .await
    {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    let (session_id, welcome_details) = loop {
        let resp = match core.recv().await {
            Ok(r) => r,
            Err(e) => {
                let _ = res.send(Err(e));
                return Status::Shutdown;
            }
        };

        match resp {
            Msg::Welcome { session, details } => break (session, details),
            Msg::Challenge { authmethod, extra } => {
                core.state = SessionState::Challenging;

                // Tie-break per the contract: the method named in CHALLENGE wins,
                // not offer order
                let authenticator = authenticators.iter().find(|a| a.name() == authmethod);

                let authenticator = match authenticator {
                    Some(a) => a,
                    None => {
                        let _ = core
                            .send(&Msg::Goodbye {
                                details: WampDict::new(),
                                reason: "wamp.close.goodbye_and_out".to_owned(),
                            })
                            .await;
                        let _ = res.send(Err(WampError::AuthenticationError(format!(
                            "Server challenged with '{}' but no matching authenticator was offered",
                            authmethod
                        ))));
                        return Status::Shutdown;
                    }
                };

                match authenticator.challenge(extra).await {
                    Ok(resp) => {
                        if let Err(e) = core
                            .send(&Msg::Authenticate {
                                signature: resp.signature,
                                extra: resp.extra,
                            })
                            .await
                        {
                            let _ = res.send(Err(e));
                            return Status::Shutdown;
                        }
                    }
                    Err(e) => {
                        let _ = res.send(Err(e));
                        return Status::Shutdown;
                    }
                }
            }
            Msg::Abort { details, reason } => {
                let _ = res.send(Err(WampError::JoinError(reason, details)));
                return Status::Shutdown;
            }
            m => {
                let _ = res.send(Err(WampError::ProtocolError(format!(
                    "Server did not respond with WELCOME : {:?}",
                    m
                ))));
                return Status::Shutdown;
            }
        }
    };

    core.state = SessionState::Established;
    let _ = res.send(Ok((session_id, welcome_details)));

    Status::Ok
}

/// Handler for a leave realm request: sends `GOODBYE` and marks the session
/// as closing.
pub async fn leave_realm(core: &mut Core, res: Sender<Result<(), WampError>>) -> Status {
    core.state = SessionState::Closing;

    if let Err(e) = core
        .send(&Msg::Goodbye {
            reason: "wamp.close.close_realm".to_string(),
            details: WampDict::new(),
        })
        .await
    {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    let _ = res.send(Ok(()));

    Status::Ok
}

pub async fn subscribe(
    core: &mut Core,
    topic: WampString,
    options: WampDict,
    res: PendingSubResult,
) -> Status {
    core.next_subscribe_id += 1;
    let request = core.next_subscribe_id;

    if let Err(e) = core
        .send(&Msg::Subscribe {
            request,
            topic,
            options,
        })
        .await
    {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    core.pending_sub.insert(request, res);

    Status::Ok
}

pub async fn unsubscribe(
    core: &mut Core,
    sub_id: WampId,
    res: Sender<Result<(), WampError>>,
) -> Status {
    if core.subscriptions.remove(&sub_id).is_none() {
        warn!("Tried to unsubscribe using invalid sub_id : {}", sub_id);
        let _ = res.send(Err(WampError::UnknownHandle("subscription", sub_id)));
        return Status::Ok;
    }

    core.next_unsubscribe_id += 1;
    let request = core.next_unsubscribe_id;

    if let Err(e) = core
        .send(&Msg::Unsubscribe {
            request,
            subscription: sub_id,
        })
        .await
    {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    core.pending_unsub.insert(request, res);

    Status::Ok
}

pub async fn publish(
    core: &mut Core,
    uri: WampString,
    options: WampDict,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
    res: Sender<Result<Option<WampId>, WampError>>,
) -> Status {
    let acknowledge = matches!(options.get("acknowledge"), Some(Arg::Bool(true)));

    core.next_publish_id += 1;
    let request = core.next_publish_id;

    if let Err(e) = core
        .send(&Msg::Publish {
            request,
            topic: uri,
            options,
            arguments,
            arguments_kw,
        })
        .await
    {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    if acknowledge {
        core.pending_publish.insert(request, res);
    } else {
        // publish without acknowledge resolves as soon as the send succeeds,
        // without waiting for PUBLISHED
        let _ = res.send(Ok(None));
    }

    Status::Ok
}

pub async fn register(
    core: &mut Core,
    uri: WampString,
    options: WampDict,
    res: PendingRegisterResult,
) -> Status {
    core.next_register_id += 1;
    let request = core.next_register_id;

    if let Err(e) = core
        .send(&Msg::Register {
            request,
            procedure: uri,
            options,
        })
        .await
    {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    core.pending_register.insert(request, res);
    Status::Ok
}

pub async fn unregister(
    core: &mut Core,
    registration_id: WampId,
    res: Sender<Result<(), WampError>>,
) -> Status {
    if core.registrations.remove(&registration_id).is_none() {
        warn!(
            "Tried to unregister RPC using invalid ID : {}",
            registration_id
        );
        let _ = res.send(Err(WampError::UnknownHandle(
            "registration",
            registration_id,
        )));
        return Status::Ok;
    }

    core.next_unregister_id += 1;
    let request = core.next_unregister_id;

    if let Err(e) = core
        .send(&Msg::Unregister {
            request,
            registration: registration_id,
        })
        .await
    {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    core.pending_unregister.insert(request, res);

    Status::Ok
}

pub async fn invoke_yield(
    core: &mut Core,
    request: WampId,
    res: Result<(Option<WampArgs>, Option<WampKwArgs>), WampError>,
) -> Status {
    let msg: Msg = match res {
        Ok((arguments, arguments_kw)) => Msg::Yield {
            request,
            options: WampDict::new(),
            arguments,
            arguments_kw,
        },
        Err(e) => Msg::Error {
            typ: INVOCATION_ID as WampInteger,
            request,
            details: WampDict::new(),
            error: "wamp.error.runtime_error".to_string(),
            arguments: Some(vec![format!("{}", e).into()]),
            arguments_kw: None,
        },
    };
    if core.send(&msg).await.is_err() {
        return Status::Shutdown;
    }

    Status::Ok
}

pub async fn call(
    core: &mut Core,
    uri: WampString,
    options: WampDict,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
    res: PendingCallResult,
) -> Status {
    core.next_call_id += 1;
    let request = core.next_call_id;

    if let Err(e) = core
        .send(&Msg::Call {
            request,
            procedure: uri,
            options,
            arguments,
            arguments_kw,
        })
        .await
    {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    // CALL has no acknowledgement message of its own; the stream is handed
    // back to the caller immediately and fed by RESULT/ERROR as they arrive
    let (tx, rx) = mpsc::unbounded_channel();
    core.pending_call.insert(request, tx);
    let _ = res.send(Ok((request, rx)));

    Status::Ok
}

pub async fn cancel(core: &mut Core, request: WampId, mode: Option<CancelMode>) -> Status {
    let mut options = WampDict::new();
    if let Some(mode) = mode {
        options.insert("mode".to_owned(), Arg::String(mode.as_str().to_owned()));
    }

    if core
        .send(&Msg::Cancel { request, options })
        .await
        .is_err()
    {
        return Status::Shutdown;
    }

    Status::Ok
}
