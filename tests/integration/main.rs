// Integration test suite for the wallet messenger gateway.
//
// Organized by scenario area; each module shares `common::TestClient`
// for per-test temp-DB lifecycle management.

mod common;

mod auth;
mod profile;
mod messaging;
mod sync_blob;
mod calls;
mod rate_limits;
