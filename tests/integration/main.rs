//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives whole wake cycles through
//! the simulation adapters.  All tests run on the host (x86_64) with no
//! real hardware required.

#![cfg(not(target_os = "espidf"))]

mod mock_hw;
mod reliable_send_tests;
mod wake_cycle_tests;
