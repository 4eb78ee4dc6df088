pub mod auth;
pub mod error;
pub mod query;
pub mod storage;

pub use auth::credentials::CredentialStore;
pub use auth::token::{Claims, Hs256TokenService, TokenVerifier};
pub use error::{CredentialError, QueryError, StoreError, TokenError};
pub use query::DocumentQuery;
pub use storage::Database;
