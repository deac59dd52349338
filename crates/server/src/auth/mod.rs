pub mod api_key;
pub mod middleware;

pub use api_key::{ApiKeyAuthenticator, SECRET_ENV};
pub use middleware::{AuthLayer, extract_token};
