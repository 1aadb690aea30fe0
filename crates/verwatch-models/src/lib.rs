/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Shared data types for the version checker: service records read from the
//! record store, check discriminators, statuses and per-job check results.

pub mod models;

pub use models::check_methods::{CurrentMethod, LatestMethod};
pub use models::check_results::{CheckResult, SideEffects};
pub use models::check_status::Status;
pub use models::service_records::ServiceRecord;
