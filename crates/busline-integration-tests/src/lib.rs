//! Test-only package; the scenarios live under `tests/`.
