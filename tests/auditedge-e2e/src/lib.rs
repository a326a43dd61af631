//! End-to-end tests for the audit pipeline live in `tests/`.
