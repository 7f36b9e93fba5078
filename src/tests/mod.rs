//! Unit and scenario tests (no network required)
//!
//! These tests exercise the pipeline against scripted in-process backends.

pub mod support;
