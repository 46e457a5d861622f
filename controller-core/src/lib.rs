#![no_std]

// Shared logic for the mode/countdown intensity controller.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Hardware is reached only through the traits exposed by
// `actuation`, `display` and `coordinator`, so the whole coordinator can be
// exercised on the host with hand-written mock drivers.

pub mod actuation;
pub mod clock;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod debounce;
pub mod display;
pub mod mode;
pub mod state;
pub mod telemetry;
