//! End-to-end runs of the factory binary against a stand-in toolchain.

#![cfg(unix)]

mod common;
mod run_tests;
mod upload_tests;
