// Authentication module
// SSO login flow, token exchange and credential types

pub(crate) mod exchange;
pub(crate) mod login;
pub(crate) mod signer;
mod token;

pub use exchange::OAuthConsumer;
pub use token::{AccessToken, OAuth1Token};
