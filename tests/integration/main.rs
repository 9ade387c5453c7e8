//! Integration tests for the data catalog.
//!
//! Scenarios run against the in-memory backend; the PostgreSQL tests are
//! ignored unless `CATALOG_TEST_DATABASE_URL` points at a scratch database.

mod helpers;

mod cascade_test;
mod changelog_test;
mod concurrency_test;
mod inheritance_test;
mod postgres_test;
mod version_test;
