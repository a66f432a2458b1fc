use quick_error::*;
use url::ParseError;

use crate::common::WampDict;
use crate::serializer::SerializerError;
use crate::transport::TransportError;

quick_error! {
    /// Types of errors a WAMP session can encounter.
    #[derive(Debug)]
    pub enum WampError {
        /// Error with the connection
        ConnectionError(e: TransportError) {
            from()
            source(e)
            display("An error occured with the connection: ({})", e)
        }
        /// Error with serialization
        SerializationError(e: SerializerError) {
            from()
            source(e)
            display("An error occured while [de]serializing a message: ({})", e)
        }
        /// WAMP uri is invalid
        InvalidUri(e: ParseError) {
            source(e)
            display("The uri provided could not be parsed: {}", e)
        }
        /// Server uri is invalid
        NoHostInUri {
            display("The uri provided did not contain a host address")
        }
        /// join_realm was called with a realm that fails strict WAMP URI validation
        InvalidRealmUri(uri: String) {
            display("'{}' is not a valid strict WAMP uri", uri)
        }
        /// The WAMP protocol was not respected by the peer
        ProtocolError(e: String) {
            display("An unexpected WAMP message was received: {}", e)
        }
        /// A method that requires an established session was called before
        /// join completed, or after the session started closing
        NotConnected {
            display("The session is not established")
        }
        /// join_realm was called on a session that is already established
        AlreadyConnected {
            display("The session is already established")
        }
        /// The server rejected the realm join with an ABORT message
        JoinError(reason: String, details: WampDict) {
            context(reason: String, details: WampDict) -> (reason, details)
            display("The server aborted the session: {} {:?}", reason, details)
        }
        /// None of the client's offered authmethods matched what the server challenged with
        AuthenticationError(e: String) {
            display("Authentication failed: {}", e)
        }
        /// The client has been dropped while the event loop was running
        ClientDied {
            display("The session event loop is no longer running")
        }
        /// The session was closed locally or remotely before a pending request completed
        SessionClosed {
            display("The session was closed before the request completed")
        }
        /// An invocation, call, or subscription id the peer referenced is unknown to us
        UnknownHandle(kind: &'static str, id: u64) {
            display("No local {} is registered for id {}", kind, id)
        }
        /// The caller attempted to register a procedure that is already registered locally
        AlreadyRegistered(uri: String) {
            display("Procedure '{}' is already registered on this session", uri)
        }
        /// The server sent us an ERROR in reply to one of our requests
        ServerError(uri: String, details: WampDict) {
            context(uri: String, details: WampDict) -> (uri, details)
            display("The server returned an error: {} {:?}", uri, details)
        }
        UnknownError(e: String) {
            from()
            display("Unhandled error: {}", e)
        }
    }
}
