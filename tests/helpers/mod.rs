// ABOUTME: Shared helper modules for integration tests
// ABOUTME: Re-exports the axum request helper

pub mod axum_test;
