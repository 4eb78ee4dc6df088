//! Password credentials and signed identity tokens.

pub mod credentials;
pub mod token;
