use log::*;
use tokio::sync::mpsc;

use crate::common::*;
use crate::core::*;
use crate::message::*;

pub async fn subscribed(core: &mut Core, request: WampId, sub_id: WampId) -> Status {
    let res = match core.pending_sub.remove(&request) {
        Some(v) => v,
        None => {
            warn!(
                "Server sent SUBSCRIBED for a request we never asked for : {}",
                request
            );
            return Status::Ok;
        }
    };

    let (evt_queue_w, evt_queue_r) = mpsc::unbounded_channel();
    core.subscriptions.insert(sub_id, evt_queue_w);

    let _ = res.send(Ok((sub_id, evt_queue_r)));

    Status::Ok
}

pub async fn unsubscribed(core: &mut Core, request: WampId) -> Status {
    let res = match core.pending_unsub.remove(&request) {
        Some(v) => v,
        None => {
            warn!(
                "Server sent UNSUBSCRIBED for a request we never asked for : {}",
                request
            );
            return Status::Ok;
        }
    };

    let _ = res.send(Ok(()));

    Status::Ok
}

pub async fn published(core: &mut Core, request: WampId, pub_id: WampId) -> Status {
    let res = match core.pending_publish.remove(&request) {
        Some(v) => v,
        None => {
            warn!(
                "Server sent PUBLISHED for a request we never asked for : {}",
                request
            );
            return Status::Ok;
        }
    };

    let _ = res.send(Ok(Some(pub_id)));

    Status::Ok
}

pub async fn event(
    core: &mut Core,
    subscription: WampId,
    publication: WampId,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) -> Status {
    let evt_queue = match core.subscriptions.get(&subscription) {
        Some(e) => e,
        None => {
            warn!(
                "Server sent EVENT for subscription we are not subscribed to : {}",
                subscription
            );
            return Status::Ok;
        }
    };

    if evt_queue
        .send((publication, arguments, arguments_kw))
        .is_err()
    {
        warn!(
            "Client dropped subscription {} without unsubscribing",
            subscription
        );
    }

    Status::Ok
}

pub async fn registered(core: &mut Core, request: WampId, registration_id: WampId) -> Status {
    let res = match core.pending_register.remove(&request) {
        Some(v) => v,
        None => {
            warn!(
                "Server sent REGISTERED for a request we never asked for : {}",
                request
            );
            return Status::Ok;
        }
    };

    let (inv_queue_w, inv_queue_r) = mpsc::unbounded_channel();
    core.registrations.insert(registration_id, inv_queue_w);

    let _ = res.send(Ok((registration_id, inv_queue_r)));

    Status::Ok
}

pub async fn unregistered(core: &mut Core, request: WampId) -> Status {
    let res = match core.pending_unregister.remove(&request) {
        Some(v) => v,
        None => {
            warn!(
                "Server sent UNREGISTERED for a request we never asked for : {}",
                request
            );
            return Status::Ok;
        }
    };

    let _ = res.send(Ok(()));

    Status::Ok
}

pub async fn invocation(
    core: &mut Core,
    request: WampId,
    registration: WampId,
    details: WampDict,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) -> Status {
    let inv_queue = match core.registrations.get(&registration) {
        Some(q) => q,
        None => {
            warn!(
                "Server sent INVOCATION for a registration we don't have : {}",
                registration
            );
            if core
                .send(&Msg::Error {
                    typ: INVOCATION_ID,
                    request,
                    details: WampDict::new(),
                    error: "wamp.error.no_such_registration".to_string(),
                    arguments: None,
                    arguments_kw: None,
                })
                .await
                .is_err()
            {
                return Status::Shutdown;
            }
            return Status::Ok;
        }
    };

    let invocation = Invocation::new(
        request,
        registration,
        details,
        arguments,
        arguments_kw,
        core.ctl_sender.clone(),
    );

    if inv_queue.send(invocation).is_err() {
        warn!(
            "Client dropped registration {} without unregistering",
            registration
        );
    }

    Status::Ok
}

pub async fn call_result(
    core: &mut Core,
    request: WampId,
    details: WampDict,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) -> Status {
    let progressive = matches!(details.get("progress"), Some(Arg::Bool(true)));

    let sender = match core.pending_call.get(&request) {
        Some(s) => s,
        None => {
            warn!(
                "Server sent RESULT for a call we never made : {}",
                request
            );
            return Status::Ok;
        }
    };

    let _ = sender.send(Ok((arguments, arguments_kw)));

    if !progressive {
        core.pending_call.remove(&request);
    }

    Status::Ok
}

pub async fn goodbye(core: &mut Core, _details: WampDict, reason: WampUri) -> Status {
    debug!("Server said goodbye : {}", reason);
    core.state = SessionState::Closing;

    let _ = core
        .send(&Msg::Goodbye {
            details: WampDict::new(),
            reason: "wamp.close.goodbye_and_out".to_string(),
        })
        .await;

    Status::Shutdown
}

pub async fn abort(core: &mut Core, details: WampDict, reason: WampUri) -> Status {
    error!("Server aborted the session : {} {:?}", reason, details);
    core.state = SessionState::Closing;

    Status::Shutdown
}

/// Handles an error sent by the peer in reply to one of our own requests.
pub async fn error(
    core: &mut Core,
    typ: WampInteger,
    request: WampId,
    details: WampDict,
    error: WampUri,
    _arguments: Option<WampArgs>,
    _arguments_kw: Option<WampKwArgs>,
) -> Status {
    let wamp_error = WampError::ServerError(error, details);

    match typ {
        SUBSCRIBE_ID => {
            if let Some(res) = core.pending_sub.remove(&request) {
                let _ = res.send(Err(wamp_error));
            } else {
                warn!("Received error for a SUBSCRIBE we never sent");
            }
        }
        UNSUBSCRIBE_ID => {
            if let Some(res) = core.pending_unsub.remove(&request) {
                let _ = res.send(Err(wamp_error));
            } else {
                warn!("Received error for an UNSUBSCRIBE we never sent");
            }
        }
        PUBLISH_ID => {
            if let Some(res) = core.pending_publish.remove(&request) {
                let _ = res.send(Err(wamp_error));
            } else {
                warn!("Received error for a PUBLISH we never sent");
            }
        }
        REGISTER_ID => {
            if let Some(res) = core.pending_register.remove(&request) {
                let _ = res.send(Err(wamp_error));
            } else {
                warn!("Received error for a REGISTER we never sent");
            }
        }
        UNREGISTER_ID => {
            if let Some(res) = core.pending_unregister.remove(&request) {
                let _ = res.send(Err(wamp_error));
            } else {
                warn!("Received error for an UNREGISTER we never sent");
            }
        }
        CALL_ID => {
            if let Some(sender) = core.pending_call.remove(&request) {
                let _ = sender.send(Err(wamp_error));
            } else {
                warn!("Received error for a CALL we never sent");
            }
        }
        _ => {
            warn!(
                "Received ERROR for an unsupported request type {} : {}",
                typ, wamp_error
            );
        }
    };

    Status::Ok
}
