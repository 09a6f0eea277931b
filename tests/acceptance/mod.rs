//! Integration tests for clock control unit acceptance testing.
//!
//! Each test builds a `ClockUnit` on a simulated register bank and checks
//! the control word and reported rates end to end.

mod common;
mod concurrency_test;
mod scenario_test;
