//! Integration test crate for the mesh relay.
//!
//! This crate exists solely to run tests that drive several relay nodes at
//! once. It has no public API - all functionality is in the test modules.

#![forbid(unsafe_code)]
