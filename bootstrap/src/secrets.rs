//! The headplane cookie secret: generated once, reused forever.

use std::io;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use tracing::{debug, info};

use crate::paths::AddonPaths;

/// Headplane requires exactly 32 characters.
pub const COOKIE_SECRET_LEN: usize = 32;

/// Reuse the persisted cookie secret, generating it on first run.
///
/// Regenerating would invalidate every existing UI session, so an existing
/// file always wins. An empty file is treated as absent.
pub async fn ensure_cookie_secret(paths: &AddonPaths) -> io::Result<String> {
    let path = paths.cookie_secret();

    match tokio::fs::read_to_string(&path).await {
        Ok(existing) => {
            let existing = existing.trim().to_string();
            if !existing.is_empty() {
                debug!(path = %path.display(), "Reusing existing cookie secret");
                return Ok(existing);
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    let secret = generate_cookie_secret();
    tokio::fs::write(&path, &secret).await?;
    info!(path = %path.display(), "Generated new cookie secret");
    Ok(secret)
}

/// 32 CSPRNG bytes, base64, truncated to the 32-character width headplane
/// expects. The truncation is a fixed-width contract, not a knob.
pub(crate) fn generate_cookie_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let mut encoded = STANDARD.encode(bytes);
    encoded.truncate(COOKIE_SECRET_LEN);
    encoded
}
