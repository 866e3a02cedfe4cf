//! End-to-end host tests.

mod helpers;

mod config_test;
mod event_test;
mod lifecycle_test;
