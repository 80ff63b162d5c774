//! Trait definitions for `RestKit`.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::models::Request;

/// A credential strategy that attaches transport-level credentials.
///
/// Implementors:
/// - Return an authenticated copy of the request (extra headers or query
///   items), or an [`AuthError`] if credentials are missing or unusable
/// - May perform network I/O, e.g. exchanging an API key for a token
/// - Must be safe to share across concurrent requests
///
/// ## Implementing a Strategy
///
/// ```ignore
/// struct SessionCookie(String);
///
/// #[async_trait]
/// impl Authenticator for SessionCookie {
///     fn name(&self) -> &str {
///         "cookie"
///     }
///
///     async fn authenticate(&self, request: Request) -> Result<Request, AuthError> {
///         Ok(request.with_header("Cookie", &self.0))
///     }
/// }
/// ```
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Short name of the scheme, used in logs.
    fn name(&self) -> &str;

    /// Produces the authenticated variant of `request`.
    async fn authenticate(&self, request: Request) -> Result<Request, AuthError>;
}
