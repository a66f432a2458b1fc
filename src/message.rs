//! Typed WAMP message variants, with the standard wire codes (§6.4) and
//! hand-rolled `[code, field, field, ...]` array (de)serialization — this is
//! the format every WAMP serializer (JSON, MsgPack, CBOR) shares, so it is
//! written once here instead of per-codec.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub use crate::common::{WampDict, WampId, WampInteger, WampList, WampString, WampUri};

pub const HELLO_ID: WampInteger = 1;
pub const WELCOME_ID: WampInteger = 2;
pub const ABORT_ID: WampInteger = 3;
pub const CHALLENGE_ID: WampInteger = 4;
pub const AUTHENTICATE_ID: WampInteger = 5;
pub const GOODBYE_ID: WampInteger = 6;
pub const ERROR_ID: WampInteger = 8;
pub const PUBLISH_ID: WampInteger = 16;
pub const PUBLISHED_ID: WampInteger = 17;
pub const SUBSCRIBE_ID: WampInteger = 32;
pub const SUBSCRIBED_ID: WampInteger = 33;
pub const UNSUBSCRIBE_ID: WampInteger = 34;
pub const UNSUBSCRIBED_ID: WampInteger = 35;
pub const EVENT_ID: WampInteger = 36;
pub const CALL_ID: WampInteger = 48;
pub const CANCEL_ID: WampInteger = 49;
pub const RESULT_ID: WampInteger = 50;
pub const REGISTER_ID: WampInteger = 64;
pub const REGISTERED_ID: WampInteger = 65;
pub const UNREGISTER_ID: WampInteger = 66;
pub const UNREGISTERED_ID: WampInteger = 67;
pub const INVOCATION_ID: WampInteger = 68;
pub const YIELD_ID: WampInteger = 70;

/// A single parsed WAMP protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Hello {
        realm: WampUri,
        details: WampDict,
    },
    Welcome {
        session: WampId,
        details: WampDict,
    },
    Abort {
        details: WampDict,
        reason: WampUri,
    },
    Challenge {
        authmethod: WampString,
        extra: WampDict,
    },
    Authenticate {
        signature: WampString,
        extra: WampDict,
    },
    Goodbye {
        details: WampDict,
        reason: WampUri,
    },
    Error {
        typ: WampInteger,
        request: WampId,
        details: WampDict,
        error: WampUri,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Publish {
        request: WampId,
        options: WampDict,
        topic: WampUri,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Published {
        request: WampId,
        publication: WampId,
    },
    Subscribe {
        request: WampId,
        options: WampDict,
        topic: WampUri,
    },
    Subscribed {
        request: WampId,
        subscription: WampId,
    },
    Unsubscribe {
        request: WampId,
        subscription: WampId,
    },
    Unsubscribed {
        request: WampId,
    },
    Event {
        subscription: WampId,
        publication: WampId,
        details: WampDict,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Call {
        request: WampId,
        options: WampDict,
        procedure: WampUri,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Cancel {
        request: WampId,
        options: WampDict,
    },
    Result {
        request: WampId,
        details: WampDict,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Register {
        request: WampId,
        options: WampDict,
        procedure: WampUri,
    },
    Registered {
        request: WampId,
        registration: WampId,
    },
    Unregister {
        request: WampId,
        registration: WampId,
    },
    Unregistered {
        request: WampId,
    },
    Invocation {
        request: WampId,
        registration: WampId,
        details: WampDict,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Yield {
        request: WampId,
        options: WampDict,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
}

impl Msg {
    /// A short label for logging; avoids `{:?}` dumping full argument payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Hello { .. } => "HELLO",
            Msg::Welcome { .. } => "WELCOME",
            Msg::Abort { .. } => "ABORT",
            Msg::Challenge { .. } => "CHALLENGE",
            Msg::Authenticate { .. } => "AUTHENTICATE",
            Msg::Goodbye { .. } => "GOODBYE",
            Msg::Error { .. } => "ERROR",
            Msg::Publish { .. } => "PUBLISH",
            Msg::Published { .. } => "PUBLISHED",
            Msg::Subscribe { .. } => "SUBSCRIBE",
            Msg::Subscribed { .. } => "SUBSCRIBED",
            Msg::Unsubscribe { .. } => "UNSUBSCRIBE",
            Msg::Unsubscribed { .. } => "UNSUBSCRIBED",
            Msg::Event { .. } => "EVENT",
            Msg::Call { .. } => "CALL",
            Msg::Cancel { .. } => "CANCEL",
            Msg::Result { .. } => "RESULT",
            Msg::Register { .. } => "REGISTER",
            Msg::Registered { .. } => "REGISTERED",
            Msg::Unregister { .. } => "UNREGISTER",
            Msg::Unregistered { .. } => "UNREGISTERED",
            Msg::Invocation { .. } => "INVOCATION",
            Msg::Yield { .. } => "YIELD",
        }
    }
}

impl Serialize for Msg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Msg::Hello { realm, details } => ser_tuple(serializer, HELLO_ID, (realm, details)),
            Msg::Welcome { session, details } => {
                ser_tuple(serializer, WELCOME_ID, (session, details))
            }
            Msg::Abort { details, reason } => ser_tuple(serializer, ABORT_ID, (details, reason)),
            Msg::Challenge { authmethod, extra } => {
                ser_tuple(serializer, CHALLENGE_ID, (authmethod, extra))
            }
            Msg::Authenticate { signature, extra } => {
                ser_tuple(serializer, AUTHENTICATE_ID, (signature, extra))
            }
            Msg::Goodbye { details, reason } => {
                ser_tuple(serializer, GOODBYE_ID, (details, reason))
            }
            Msg::Error {
                typ,
                request,
                details,
                error,
                arguments,
                arguments_kw,
            } => ser_err_like(
                serializer,
                ERROR_ID,
                Some(typ),
                *request,
                details,
                error,
                arguments,
                arguments_kw,
            ),
            Msg::Publish {
                request,
                options,
                topic,
                arguments,
                arguments_kw,
            } => ser_request_like(
                serializer,
                PUBLISH_ID,
                *request,
                options,
                topic,
                arguments,
                arguments_kw,
            ),
            Msg::Published {
                request,
                publication,
            } => ser_tuple(serializer, PUBLISHED_ID, (request, publication)),
            Msg::Subscribe {
                request,
                options,
                topic,
            } => ser_tuple(serializer, SUBSCRIBE_ID, (request, options, topic)),
            Msg::Subscribed {
                request,
                subscription,
            } => ser_tuple(serializer, SUBSCRIBED_ID, (request, subscription)),
            Msg::Unsubscribe {
                request,
                subscription,
            } => ser_tuple(serializer, UNSUBSCRIBE_ID, (request, subscription)),
            Msg::Unsubscribed { request } => ser_tuple(serializer, UNSUBSCRIBED_ID, (request,)),
            Msg::Event {
                subscription,
                publication,
                details,
                arguments,
                arguments_kw,
            } => ser_request_like(
                serializer,
                EVENT_ID,
                *subscription,
                publication,
                details,
                arguments,
                arguments_kw,
            ),
            Msg::Call {
                request,
                options,
                procedure,
                arguments,
                arguments_kw,
            } => ser_request_like(
                serializer,
                CALL_ID,
                *request,
                options,
                procedure,
                arguments,
                arguments_kw,
            ),
            Msg::Cancel { request, options } => {
                ser_tuple(serializer, CANCEL_ID, (request, options))
            }
            Msg::Result {
                request,
                details,
                arguments,
                arguments_kw,
            } => ser_result_like(serializer, RESULT_ID, *request, details, arguments, arguments_kw),
            Msg::Register {
                request,
                options,
                procedure,
            } => ser_tuple(serializer, REGISTER_ID, (request, options, procedure)),
            Msg::Registered {
                request,
                registration,
            } => ser_tuple(serializer, REGISTERED_ID, (request, registration)),
            Msg::Unregister {
                request,
                registration,
            } => ser_tuple(serializer, UNREGISTER_ID, (request, registration)),
            Msg::Unregistered { request } => ser_tuple(serializer, UNREGISTERED_ID, (request,)),
            Msg::Invocation {
                request,
                registration,
                details,
                arguments,
                arguments_kw,
            } => ser_request_like(
                serializer,
                INVOCATION_ID,
                *request,
                registration,
                details,
                arguments,
                arguments_kw,
            ),
            Msg::Yield {
                request,
                options,
                arguments,
                arguments_kw,
            } => ser_result_like(serializer, YIELD_ID, *request, options, arguments, arguments_kw),
        }
    }
}

/// `[code, a, b]`
fn ser_tuple<S, T>(serializer: S, code: WampInteger, fields: T) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: TupleFields,
{
    let mut seq = serializer.serialize_seq(Some(1 + fields.len()))?;
    seq.serialize_element(&code)?;
    fields.serialize_into(&mut seq)?;
    seq.end()
}

trait TupleFields {
    fn len(&self) -> usize;
    fn serialize_into<S: SerializeSeq>(&self, seq: &mut S) -> Result<(), S::Error>;
}

macro_rules! impl_tuple_fields {
    ($n:expr; $($idx:tt : $name:ident),+) => {
        impl<$($name: Serialize),+> TupleFields for ($($name,)+) {
            fn len(&self) -> usize { $n }
            fn serialize_into<S: SerializeSeq>(&self, seq: &mut S) -> Result<(), S::Error> {
                $(seq.serialize_element(&self.$idx)?;)+
                Ok(())
            }
        }
    };
}

impl_tuple_fields!(1; 0: A);
impl_tuple_fields!(2; 0: A, 1: B);
impl_tuple_fields!(3; 0: A, 1: B, 2: C);

/// `[code, id_or_request, middle, uri_or_dict, arguments?, arguments_kw?]` — the shape shared
/// by PUBLISH/CALL/EVENT/INVOCATION, which all trail optional args/kwargs.
fn ser_request_like<S, Id, Mid, Uri>(
    serializer: S,
    code: WampInteger,
    id: Id,
    mid: Mid,
    uri: Uri,
    arguments: &Option<WampList>,
    arguments_kw: &Option<WampDict>,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    Id: Serialize,
    Mid: Serialize,
    Uri: Serialize,
{
    let len = 4 + if arguments_kw.is_some() {
        2
    } else if arguments.is_some() {
        1
    } else {
        0
    };
    let mut seq = serializer.serialize_seq(Some(len))?;
    seq.serialize_element(&code)?;
    seq.serialize_element(&id)?;
    seq.serialize_element(&mid)?;
    seq.serialize_element(&uri)?;
    if let Some(kw) = arguments_kw {
        seq.serialize_element(arguments.as_ref().unwrap_or(&WampList::new()))?;
        seq.serialize_element(kw)?;
    } else if let Some(args) = arguments {
        seq.serialize_element(args)?;
    }
    seq.end()
}

/// `[code, request, details_or_options, arguments?, arguments_kw?]` — RESULT/YIELD shape.
fn ser_result_like<S>(
    serializer: S,
    code: WampInteger,
    request: WampId,
    details: &WampDict,
    arguments: &Option<WampList>,
    arguments_kw: &Option<WampDict>,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let len = 3 + if arguments_kw.is_some() {
        2
    } else if arguments.is_some() {
        1
    } else {
        0
    };
    let mut seq = serializer.serialize_seq(Some(len))?;
    seq.serialize_element(&code)?;
    seq.serialize_element(&request)?;
    seq.serialize_element(details)?;
    if let Some(kw) = arguments_kw {
        seq.serialize_element(arguments.as_ref().unwrap_or(&WampList::new()))?;
        seq.serialize_element(kw)?;
    } else if let Some(args) = arguments {
        seq.serialize_element(args)?;
    }
    seq.end()
}

/// `[code, typ, request, details, error, arguments?, arguments_kw?]` — ERROR shape.
#[allow(clippy::too_many_arguments)]
fn ser_err_like<S>(
    serializer: S,
    code: WampInteger,
    typ: Option<&WampInteger>,
    request: WampId,
    details: &WampDict,
    error: &WampUri,
    arguments: &Option<WampList>,
    arguments_kw: &Option<WampDict>,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let len = 5 + if arguments_kw.is_some() {
        2
    } else if arguments.is_some() {
        1
    } else {
        0
    };
    let mut seq = serializer.serialize_seq(Some(len))?;
    seq.serialize_element(&code)?;
    seq.serialize_element(&typ.copied().unwrap_or_default())?;
    seq.serialize_element(&request)?;
    seq.serialize_element(details)?;
    seq.serialize_element(error)?;
    if let Some(kw) = arguments_kw {
        seq.serialize_element(arguments.as_ref().unwrap_or(&WampList::new()))?;
        seq.serialize_element(kw)?;
    } else if let Some(args) = arguments {
        seq.serialize_element(args)?;
    }
    seq.end()
}

impl<'de> Deserialize<'de> for Msg {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(MsgVisitor)
    }
}

struct MsgVisitor;

fn missing<'de, A: SeqAccess<'de>>(field: &'static str) -> A::Error {
    de::Error::custom(format_args!("WAMP message missing field '{}'", field))
}

impl<'de> Visitor<'de> for MsgVisitor {
    type Value = Msg;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a WAMP message array `[code, ...fields]`")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let code: WampInteger = seq
            .next_element()?
            .ok_or_else(|| missing::<A>("code"))?;

        macro_rules! req {
            ($field:expr) => {
                seq.next_element()?.ok_or_else(|| missing::<A>($field))?
            };
        }

        Ok(match code {
            HELLO_ID => Msg::Hello {
                realm: req!("realm"),
                details: req!("details"),
            },
            WELCOME_ID => Msg::Welcome {
                session: req!("session"),
                details: req!("details"),
            },
            ABORT_ID => Msg::Abort {
                details: req!("details"),
                reason: req!("reason"),
            },
            CHALLENGE_ID => Msg::Challenge {
                authmethod: req!("authmethod"),
                extra: req!("extra"),
            },
            AUTHENTICATE_ID => Msg::Authenticate {
                signature: req!("signature"),
                extra: req!("extra"),
            },
            GOODBYE_ID => Msg::Goodbye {
                details: req!("details"),
                reason: req!("reason"),
            },
            ERROR_ID => Msg::Error {
                typ: req!("typ"),
                request: req!("request"),
                details: req!("details"),
                error: req!("error"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            PUBLISH_ID => Msg::Publish {
                request: req!("request"),
                options: req!("options"),
                topic: req!("topic"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            PUBLISHED_ID => Msg::Published {
                request: req!("request"),
                publication: req!("publication"),
            },
            SUBSCRIBE_ID => Msg::Subscribe {
                request: req!("request"),
                options: req!("options"),
                topic: req!("topic"),
            },
            SUBSCRIBED_ID => Msg::Subscribed {
                request: req!("request"),
                subscription: req!("subscription"),
            },
            UNSUBSCRIBE_ID => Msg::Unsubscribe {
                request: req!("request"),
                subscription: req!("subscription"),
            },
            UNSUBSCRIBED_ID => Msg::Unsubscribed {
                request: req!("request"),
            },
            EVENT_ID => Msg::Event {
                subscription: req!("subscription"),
                publication: req!("publication"),
                details: req!("details"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            CALL_ID => Msg::Call {
                request: req!("request"),
                options: req!("options"),
                procedure: req!("procedure"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            CANCEL_ID => Msg::Cancel {
                request: req!("request"),
                options: req!("options"),
            },
            RESULT_ID => Msg::Result {
                request: req!("request"),
                details: req!("details"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            REGISTER_ID => Msg::Register {
                request: req!("request"),
                options: req!("options"),
                procedure: req!("procedure"),
            },
            REGISTERED_ID => Msg::Registered {
                request: req!("request"),
                registration: req!("registration"),
            },
            UNREGISTER_ID => Msg::Unregister {
                request: req!("request"),
                registration: req!("registration"),
            },
            UNREGISTERED_ID => Msg::Unregistered {
                request: req!("request"),
            },
            INVOCATION_ID => Msg::Invocation {
                request: req!("request"),
                registration: req!("registration"),
                details: req!("details"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            YIELD_ID => Msg::Yield {
                request: req!("request"),
                options: req!("options"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            other => {
                return Err(de::Error::custom(format_args!(
                    "unknown WAMP message code {}",
                    other
                )))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_round_trips_through_json() {
        let mut details = WampDict::new();
        details.insert("roles".to_owned(), empty_dict_arg());
        let msg = Msg::Hello {
            realm: "realm1".to_owned(),
            details,
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let back: Msg = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, back);
    }

    fn empty_dict_arg() -> crate::common::Arg {
        crate::common::Arg::Dict(WampDict::new())
    }

    #[test]
    fn publish_without_kwargs_serializes_as_four_or_five_elements() {
        let msg = Msg::Publish {
            request: 1,
            options: WampDict::new(),
            topic: "a.b".to_owned(),
            arguments: None,
            arguments_kw: None,
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v.as_array().unwrap().len(), 4);
    }

    #[test]
    fn error_round_trips() {
        let msg = Msg::Error {
            typ: CALL_ID,
            request: 7,
            details: WampDict::new(),
            error: "wamp.error.no_such_procedure".to_owned(),
            arguments: None,
            arguments_kw: None,
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let back: Msg = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, back);
    }
}
