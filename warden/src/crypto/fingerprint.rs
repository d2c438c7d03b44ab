use sha2::Digest;
use sha2::Sha256;

use crate::context::RequestContext;

/// Derives a client fingerprint from request properties.
pub trait FingerprintGenerator: Send + Sync + 'static {
    fn generate(&self, request: &dyn RequestContext) -> String;
}

/// SHA-256 over `User-Agent`, `Accept-Language` and `Accept-Charset`.
///
/// Including the remote address binds authenticators to one network location,
/// which breaks clients whose address changes between requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFingerprintGenerator {
    include_remote_address: bool,
}

impl DefaultFingerprintGenerator {
    pub fn new(include_remote_address: bool) -> Self {
        Self {
            include_remote_address,
        }
    }
}

impl FingerprintGenerator for DefaultFingerprintGenerator {
    fn generate(&self, request: &dyn RequestContext) -> String {
        let mut parts = vec![
            request.header("User-Agent").unwrap_or_default(),
            request.header("Accept-Language").unwrap_or_default(),
            request.header("Accept-Charset").unwrap_or_default(),
        ];
        if self.include_remote_address {
            parts.push(request.remote_address().unwrap_or_default());
        }

        hex::encode(Sha256::digest(parts.join(":").as_bytes()))
    }
}
