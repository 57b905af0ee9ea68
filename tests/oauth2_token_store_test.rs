// ABOUTME: Integration tests for the access and refresh token store
// ABOUTME: Covers expiry, cascade revocation, sweeping and concurrent refresh rotation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::sync::Arc;

use momentum_mcp_server::oauth2_server::models::TokenKind;
use momentum_mcp_server::oauth2_server::{RefreshRejection, TokenStore};

#[tokio::test]
async fn test_issued_tokens_validate_only_as_their_kind() {
    let store = TokenStore::new(3600, 7200);
    let (refresh, refresh_expiry) = store.issue_refresh("client-a").await.unwrap();
    let (access, access_expiry) = store.issue_access("client-a", Some(&refresh)).await.unwrap();

    assert_eq!(access.len(), 43);
    assert!(refresh_expiry > access_expiry);

    let record = store.validate(&access, TokenKind::Access).await.unwrap();
    assert_eq!(record.client_id, "client-a");
    assert_eq!(record.linked_refresh.as_deref(), Some(refresh.as_str()));

    assert!(store.validate(&access, TokenKind::Refresh).await.is_none());
    assert!(store.validate(&refresh, TokenKind::Access).await.is_none());
    assert!(store.validate("not-a-token", TokenKind::Access).await.is_none());
}

#[tokio::test]
async fn test_expired_token_is_rejected_and_removed() {
    let store = TokenStore::new(0, 0);
    let (access, _) = store.issue_access("client-a", None).await.unwrap();
    assert_eq!(store.len().await, 1);

    assert!(store.validate(&access, TokenKind::Access).await.is_none());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_cascade_revokes_only_linked_access_tokens() {
    let store = TokenStore::new(3600, 3600);
    let (refresh_a, _) = store.issue_refresh("client-a").await.unwrap();
    let (refresh_b, _) = store.issue_refresh("client-a").await.unwrap();
    let (linked_1, _) = store.issue_access("client-a", Some(&refresh_a)).await.unwrap();
    let (linked_2, _) = store.issue_access("client-a", Some(&refresh_a)).await.unwrap();
    let (other, _) = store.issue_access("client-a", Some(&refresh_b)).await.unwrap();
    let (unlinked, _) = store.issue_access("client-a", None).await.unwrap();

    assert_eq!(store.revoke_refresh_cascade(&refresh_a).await, 2);

    assert!(store.validate(&refresh_a, TokenKind::Refresh).await.is_none());
    assert!(store.validate(&linked_1, TokenKind::Access).await.is_none());
    assert!(store.validate(&linked_2, TokenKind::Access).await.is_none());
    assert!(store.validate(&other, TokenKind::Access).await.is_some());
    assert!(store.validate(&unlinked, TokenKind::Access).await.is_some());
    assert!(store.validate(&refresh_b, TokenKind::Refresh).await.is_some());

    // Unknown refresh tokens are a no-op
    assert_eq!(store.revoke_refresh_cascade("missing").await, 0);
}

#[tokio::test]
async fn test_redeem_refresh_checks_client_without_consuming() {
    let store = TokenStore::new(3600, 3600);
    let (refresh, _) = store.issue_refresh("client-a").await.unwrap();
    let (access, _) = store.issue_access("client-a", Some(&refresh)).await.unwrap();

    assert_eq!(
        store.redeem_refresh(&refresh, Some("client-b")).await.unwrap_err(),
        RefreshRejection::ClientMismatch
    );
    assert!(store.validate(&refresh, TokenKind::Refresh).await.is_some());

    let record = store.redeem_refresh(&refresh, Some("client-a")).await.unwrap();
    assert_eq!(record.client_id, "client-a");
    assert!(store.validate(&access, TokenKind::Access).await.is_none());

    assert_eq!(
        store.redeem_refresh(&refresh, None).await.unwrap_err(),
        RefreshRejection::Invalid
    );
    // An access token is never redeemable as a refresh token
    let (plain, _) = store.issue_access("client-a", None).await.unwrap();
    assert_eq!(
        store.redeem_refresh(&plain, None).await.unwrap_err(),
        RefreshRejection::Invalid
    );
}

#[tokio::test]
async fn test_concurrent_rotation_has_single_winner() {
    let store = Arc::new(TokenStore::new(3600, 3600));
    let (refresh, _) = store.issue_refresh("client-a").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        let refresh = refresh.clone();
        handles.push(tokio::spawn(async move {
            store.redeem_refresh(&refresh, Some("client-a")).await.is_ok()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_sweep_and_restore_skip_expired() {
    let expiring = TokenStore::new(0, 0);
    let (stale, _) = expiring.issue_refresh("client-a").await.unwrap();
    let snapshot = expiring.live_records().await;
    assert!(snapshot.is_empty());
    assert_eq!(expiring.sweep_expired().await, 1);
    assert!(expiring.validate(&stale, TokenKind::Refresh).await.is_none());

    let source = TokenStore::new(3600, 3600);
    let (live, _) = source.issue_refresh("client-a").await.unwrap();
    let records = source.live_records().await;

    let target = TokenStore::new(3600, 3600);
    for record in records.into_values() {
        assert!(target.restore(record).await);
    }
    assert!(target.validate(&live, TokenKind::Refresh).await.is_some());
}
