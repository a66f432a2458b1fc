//! Pluggable authentication contract.
//!
//! The core session layer never hardcodes a signing scheme. Instead the
//! caller supplies an ordered list of [`Authenticator`] implementations; the
//! session advertises their names in `HELLO.Details.authmethods` and, if the
//! server challenges with a name matching one of them, hands the challenge's
//! `extra` dict to that authenticator and sends back whatever it returns in
//! `AUTHENTICATE`.

use async_trait::async_trait;

use crate::common::{WampDict, WampString};
use crate::error::WampError;

/// The result of answering a CHALLENGE: a signature/response string plus an
/// optional extra dict to attach to the AUTHENTICATE message.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationChallengeResponse {
    pub signature: WampString,
    pub extra: WampDict,
}

impl AuthenticationChallengeResponse {
    pub fn with_signature<T: Into<WampString>>(signature: T) -> Self {
        AuthenticationChallengeResponse {
            signature: signature.into(),
            extra: WampDict::new(),
        }
    }

    pub fn with_extra(mut self, extra: WampDict) -> Self {
        self.extra = extra;
        self
    }
}

/// A single supported authentication method.
///
/// Implementors advertise themselves under [`Authenticator::name`] (one of
/// the WAMP `authmethod` strings, e.g. `"ticket"`, `"wampcra"`,
/// `"cryptosign"`) and answer challenges for that method only. Concrete
/// signing schemes are not provided by this crate; callers bring their own.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// The `authmethod` string this authenticator answers for.
    fn name(&self) -> &str;

    /// Computes the response to a CHALLENGE whose `AuthMethod` equals
    /// [`Authenticator::name`].
    async fn challenge(
        &self,
        extra: WampDict,
    ) -> Result<AuthenticationChallengeResponse, WampError>;
}

/// Adapts a boxed async closure to the [`Authenticator`] trait.
///
/// Mirrors the ergonomics of passing a closure directly, without requiring
/// callers to define a new type for one-off authentication methods.
pub struct FnAuthenticator<F> {
    name: WampString,
    func: F,
}

impl<F> FnAuthenticator<F> {
    pub fn new<T: Into<WampString>>(name: T, func: F) -> Self {
        FnAuthenticator {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> Authenticator for FnAuthenticator<F>
where
    F: Fn(WampDict) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<AuthenticationChallengeResponse, WampError>>
        + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn challenge(
        &self,
        extra: WampDict,
    ) -> Result<AuthenticationChallengeResponse, WampError> {
        (self.func)(extra).await
    }
}

/// A reference `"ticket"` authenticator: the response is simply the
/// pre-shared ticket string, unmodified by the challenge `extra` dict.
///
/// This is provided so the crate is usable out of the box against routers
/// configured for ticket-based auth; it is not a cryptographic scheme.
pub struct TicketAuthenticator {
    secret: WampString,
}

impl TicketAuthenticator {
    pub fn new<T: Into<WampString>>(secret: T) -> Self {
        TicketAuthenticator {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl Authenticator for TicketAuthenticator {
    fn name(&self) -> &str {
        "ticket"
    }

    async fn challenge(
        &self,
        _extra: WampDict,
    ) -> Result<AuthenticationChallengeResponse, WampError> {
        Ok(AuthenticationChallengeResponse::with_signature(
            self.secret.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ticket_authenticator_echoes_secret() {
        let auth = TicketAuthenticator::new("s3cr3t");
        assert_eq!(auth.name(), "ticket");
        let resp = auth.challenge(WampDict::new()).await.unwrap();
        assert_eq!(resp.signature, "s3cr3t");
    }

    #[tokio::test]
    async fn fn_authenticator_delegates_to_closure() {
        let auth = FnAuthenticator::new("custom", |extra: WampDict| async move {
            let echoed = extra.len();
            Ok(AuthenticationChallengeResponse::with_signature(format!(
                "saw-{}-keys",
                echoed
            )))
        });
        let mut extra = WampDict::new();
        extra.insert("challenge".to_owned(), crate::common::Arg::String("x".into()));
        let resp = auth.challenge(extra).await.unwrap();
        assert_eq!(resp.signature, "saw-1-keys");
    }
}
