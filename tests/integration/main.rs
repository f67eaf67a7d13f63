//! Integration tests for coub-backup
//!
//! These tests use wiremock to stand in for the platform API and its media
//! CDN, and run whole backups against a temporary database and blob directory.

mod backup_tests;
