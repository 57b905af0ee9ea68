// ABOUTME: Secure random token generation and PKCE S256 verification
// ABOUTME: Uses ring's system RNG and constant-time comparison of challenges
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::constants::oauth::{PKCE_METHOD_S256, TOKEN_BYTES};
use crate::errors::{AppError, AppResult};

/// Generate a URL-safe, unpadded token from 256 bits of system randomness
///
/// # Errors
///
/// Returns an internal error if the system random source fails
pub fn generate_token() -> AppResult<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes).map_err(|_| {
        tracing::error!("System RNG failure - cannot generate secure token");
        AppError::internal("System RNG failure")
    })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Compute the S256 challenge for a verifier: `base64url(sha256(verifier))`
#[must_use]
pub fn s256_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Verify a PKCE verifier against a stored challenge
///
/// Only `S256` is accepted. The comparison is constant-time.
#[must_use]
pub fn verify_pkce(verifier: &str, challenge: &str, method: &str) -> bool {
    if method != PKCE_METHOD_S256 || verifier.is_empty() || challenge.is_empty() {
        return false;
    }
    let computed = s256_challenge(verifier);
    computed.as_bytes().ct_eq(challenge.as_bytes()).into()
}

/// Constant-time string equality for shared secrets and PINs
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
