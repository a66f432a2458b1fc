mod auth;
mod client;
mod common;
mod core;
mod error;
mod message;
pub mod options;
mod serializer;
mod transport;

pub use auth::{
    AuthenticationChallengeResponse, Authenticator, FnAuthenticator, TicketAuthenticator,
};
pub use client::{CallHandle, Client, ClientConfig, EventLoopFuture};
pub use common::*;
pub use core::{CallQueue, EventQueue, Invocation, RegistrationQueue, SessionState};
pub use error::*;
pub use serializer::SerializerType;
