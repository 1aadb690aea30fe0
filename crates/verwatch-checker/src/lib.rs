/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Verwatch Checker
//!
//! Finds the running version of every tracked service, looks up the newest
//! upstream release, classifies the pair and records the outcome in a tabular
//! record store. Checks run concurrently with a bounded number of workers.
//!
//! The crate is layered bottom-up:
//!
//! - [`transport`] wraps HTTP, SSH, the cluster API and MQTT behind traits
//! - [`extract`] and [`compare`] turn raw output into versions and statuses
//! - [`strategies`] and [`registry`] decide how each record is resolved
//! - [`orchestrator`] runs the jobs and writes results into the [`store`]
//! - [`ceph_matrix`] keeps the hypervisor/Ceph release table current
//! - [`reporting`] and [`cli`] present the store to the user

pub mod ceph_matrix;
pub mod cli;
pub mod compare;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod output;
pub mod registry;
pub mod reporting;
pub mod store;
pub mod strategies;
pub mod transport;
