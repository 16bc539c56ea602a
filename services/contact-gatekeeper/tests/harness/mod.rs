// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for the contact gatekeeper.
//!
//! Builds the real router around a recording notifier, and provides
//! generators and metrics for simulating abusive traffic.

#![allow(dead_code)]

pub mod app;
pub mod metrics;
