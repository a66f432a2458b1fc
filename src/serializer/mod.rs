use std::str::FromStr;

use quick_error::*;

use crate::message::Msg;

pub mod cbor;
pub mod json;
pub mod msgpack;

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Message serialization algorithms
pub enum SerializerType {
    Invalid = 0,
    Json = 1,
    MsgPack = 2,
    Cbor = 3,
    // 4 - 15 reserved
}

impl SerializerType {
    /// Returns the WAMP string representation of the serializer
    pub fn to_str(&self) -> &'static str {
        match self {
            SerializerType::Json => "wamp.2.json",
            SerializerType::MsgPack => "wamp.2.msgpack",
            SerializerType::Cbor => "wamp.2.cbor",
            SerializerType::Invalid => "wamp.2.invalid",
        }
    }
}

impl FromStr for SerializerType {
    type Err = String;

    /// Converts the WAMP serializer string to its enum variant
    fn from_str(in_str: &str) -> Result<Self, Self::Err> {
        if in_str == SerializerType::Json.to_str() {
            Ok(SerializerType::Json)
        } else if in_str == SerializerType::MsgPack.to_str() {
            Ok(SerializerType::MsgPack)
        } else if in_str == SerializerType::Cbor.to_str() {
            Ok(SerializerType::Cbor)
        } else {
            Err(format!("Unsupported serializer : {}", in_str))
        }
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum SerializerError {
        Serialization(e: String) {
            display("Failed to serialize message : {}", e)
        }
        Deserialization(e: String) {
            display("Failed to deserialize message : {}", e)
        }
    }
}

pub trait SerializerImpl {
    fn pack(&self, value: &Msg) -> Result<Vec<u8>, SerializerError>;
    fn unpack<'a>(&self, v: &'a [u8]) -> Result<Msg, SerializerError>;
}
