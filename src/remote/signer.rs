//! Request signing stubs

use super::traits::RequestSigner;
use reqwest::header::HeaderMap;

/// Signer that adds no headers
///
/// Listing endpoints that demand signatures will answer with an error status,
/// which surfaces as a failed walk. Plug in a real [`RequestSigner`] to talk to
/// them.
///
/// ```
/// use xhs_dl::remote::{RequestSigner, UnsignedRequests};
///
/// let headers = UnsignedRequests.sign("https://example.com/api", &[], None).unwrap();
/// assert!(headers.is_empty());
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsignedRequests;

impl RequestSigner for UnsignedRequests {
    fn sign(
        &self,
        _url: &str,
        _query: &[(&str, String)],
        _cookie: Option<&str>,
    ) -> crate::Result<HeaderMap> {
        Ok(HeaderMap::new())
    }
}
