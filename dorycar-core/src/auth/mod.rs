//! Credential checks for the real-time channel and the HTTP actions.
//!
//! Tokens are HS256 JWTs issued by the account service; this crate only
//! verifies them. Every failure is fatal to the connection or request.

mod connection;
mod token;

pub use connection::{AuthError, AuthenticatedUser, Authenticator, Connection, Handshake};
pub use token::{Claims, TokenError, TokenValidator};
