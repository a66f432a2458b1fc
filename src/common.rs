use std::collections::HashMap;

use log::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

pub type WampUri = String;
pub type WampId = u64;
pub type WampInteger = u64;
pub type WampString = String;
pub type WampBool = bool;
pub type WampDict = HashMap<String, Arg>;
pub type WampList = Vec<Arg>;
pub type WampArgs = WampList;
pub type WampKwArgs = WampDict;

/// A single positional or keyword argument value.
///
/// Untagged so it (de)serializes as the bare value on the wire, not as a
/// Rust-style tagged enum : a `Bool(true)` round-trips to/from plain `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
    Bool(WampBool),
    Integer(i64),
    UInt(u64),
    Float(f64),
    String(WampString),
    List(WampList),
    Dict(WampDict),
}

macro_rules! arg_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Arg {
            fn from(v: $ty) -> Self {
                Arg::$variant(v.into())
            }
        }
    };
}

arg_from!(Bool, bool);
arg_from!(Integer, i64);
arg_from!(Integer, i32);
arg_from!(UInt, u64);
arg_from!(UInt, u32);
arg_from!(Float, f64);
arg_from!(String, String);

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::String(v.to_owned())
    }
}

impl From<WampDict> for Arg {
    fn from(v: WampDict) -> Self {
        Arg::Dict(v)
    }
}

impl<T: Into<Arg>> From<Vec<T>> for Arg {
    fn from(v: Vec<T>) -> Self {
        Arg::List(v.into_iter().map(Into::into).collect())
    }
}

/// Serializes any `serde::Serialize` value into an [`Arg`], for embedding
/// arbitrary structures as call/publish arguments.
pub fn try_into_any_value<T: Serialize>(value: &T) -> Result<Arg, serde_json::Error> {
    let as_json = serde_json::to_value(value)?;
    Ok(json_value_to_arg(as_json))
}

fn json_value_to_arg(v: serde_json::Value) -> Arg {
    match v {
        serde_json::Value::Null => Arg::Dict(WampDict::new()),
        serde_json::Value::Bool(b) => Arg::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Arg::Integer(i)
            } else if let Some(u) = n.as_u64() {
                Arg::UInt(u)
            } else {
                Arg::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Arg::String(s),
        serde_json::Value::Array(items) => {
            Arg::List(items.into_iter().map(json_value_to_arg).collect())
        }
        serde_json::Value::Object(map) => {
            let mut dict = WampDict::new();
            for (k, v) in map {
                dict.insert(k, json_value_to_arg(v));
            }
            Arg::Dict(dict)
        }
    }
}

/// Roles a client may advertise to the router in `HELLO.Details.roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ClientRole {
    Caller,
    Callee,
    Publisher,
    Subscriber,
}

impl ClientRole {
    pub fn to_str(&self) -> &'static str {
        match self {
            ClientRole::Caller => "caller",
            ClientRole::Callee => "callee",
            ClientRole::Publisher => "publisher",
            ClientRole::Subscriber => "subscriber",
        }
    }
}

/// The interrupt mode sent along with a CANCEL message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelMode {
    /// Router waits for the callee's response before propagating an error.
    Kill,
    /// Router cancels the call immediately, without waiting on the callee.
    KillNoWait,
    /// Router skips sending further results to the caller but lets the
    /// callee run to completion.
    Skip,
}

impl CancelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelMode::Kill => "kill",
            CancelMode::KillNoWait => "killnowait",
            CancelMode::Skip => "skip",
        }
    }
}

/// Returns whether a uri is valid or not (using strict rules, no wildcards)
pub fn is_valid_strict_uri<T: AsRef<str>>(in_uri: T) -> bool {
    let uri: &str = in_uri.as_ref();
    if uri.is_empty() {
        warn!("URI cannot be empty");
        return false;
    }
    if uri.starts_with("wamp.") {
        warn!("URI '{}' cannot start with 'wamp'", uri);
        return false;
    }
    if uri.starts_with('.') || uri.ends_with('.') {
        warn!("URI '{}' cannot start or end with '.'", uri);
        return false;
    }

    let mut num_chars_token: usize = 0;
    for (i, c) in uri.chars().enumerate() {
        if c == '.' {
            if num_chars_token == 0 {
                warn!(
                    "URI '{}' contains a zero length token ending @ index {}",
                    uri, i
                );
                return false;
            }
            num_chars_token = 0;
            continue;
        }

        num_chars_token += 1;

        if c == '_' {
            continue;
        }

        if !c.is_ascii_alphanumeric() {
            warn!(
                "URI '{}' contains an invalid character @ index {}",
                uri, i
            );
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dotted_segments() {
        assert!(is_valid_strict_uri("com.example.thing"));
        assert!(is_valid_strict_uri("realm1"));
        assert!(is_valid_strict_uri("com.example.my_thing_2"));
        assert!(is_valid_strict_uri("Has.Upper"));
    }

    #[test]
    fn rejects_reserved_and_malformed() {
        assert!(!is_valid_strict_uri("wamp.session.count"));
        assert!(!is_valid_strict_uri(""));
        assert!(!is_valid_strict_uri(".leading"));
        assert!(!is_valid_strict_uri("trailing."));
        assert!(!is_valid_strict_uri("double..dot"));
        assert!(!is_valid_strict_uri("has space"));
        assert!(!is_valid_strict_uri("has-dash"));
    }

    #[test]
    fn arg_numeric_conversions_round_trip() {
        let v: Arg = 12i64.into();
        assert_eq!(v, Arg::Integer(12));
        let v: Arg = 13.3f64.into();
        assert_eq!(v, Arg::Float(13.3));
        let v: Arg = "str".into();
        assert_eq!(v, Arg::String("str".to_owned()));
    }
}
