/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

pub mod check_methods;
pub mod check_results;
pub mod check_status;
pub mod service_records;
