//! Unit tests for the fragment wire format and the outbound splitter.
//!
//! Tests are split into focused submodules to keep each file short and easy
//! to navigate.
