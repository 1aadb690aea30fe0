/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Strategy Registry
//!
//! Maps discriminators to strategies:
//!
//! - current: `(CurrentMethod, service)`, then a method-wide fallback
//! - latest: `(LatestMethod, service)`, then a method-wide strategy
//!
//! Service names compare case-insensitively. A record whose discriminator has
//! no registered strategy resolves that side to `None` with a "not configured"
//! diagnostic.

use crate::compare::CompareMode;
use crate::strategies::{catalog, CheckContext, CurrentStrategy, LatestStrategy, Reading};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use verwatch_models::{CheckResult, CurrentMethod, LatestMethod, ServiceRecord};

fn service_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Default)]
pub struct Registry {
    current: HashMap<(CurrentMethod, String), Arc<dyn CurrentStrategy>>,
    current_any: HashMap<CurrentMethod, Arc<dyn CurrentStrategy>>,
    latest: HashMap<(LatestMethod, String), Arc<dyn LatestStrategy>>,
    latest_any: HashMap<LatestMethod, Arc<dyn LatestStrategy>>,
}

impl Registry {
    /// Registry without any strategy.
    pub fn empty() -> Self {
        Registry::default()
    }

    /// Registry populated with every known service.
    pub fn standard() -> Self {
        let mut registry = Registry::empty();
        catalog::register_current(&mut registry);
        catalog::register_latest(&mut registry);
        registry
    }

    pub fn current(
        &mut self,
        method: CurrentMethod,
        service: &str,
        strategy: impl CurrentStrategy + 'static,
    ) -> &mut Self {
        self.current
            .insert((method, service_key(service)), Arc::new(strategy));
        self
    }

    /// Strategy used for any service of `method` without its own entry.
    pub fn current_fallback(
        &mut self,
        method: CurrentMethod,
        strategy: impl CurrentStrategy + 'static,
    ) -> &mut Self {
        self.current_any.insert(method, Arc::new(strategy));
        self
    }

    pub fn latest(
        &mut self,
        method: LatestMethod,
        service: &str,
        strategy: impl LatestStrategy + 'static,
    ) -> &mut Self {
        self.latest
            .insert((method, service_key(service)), Arc::new(strategy));
        self
    }

    pub fn latest_fallback(
        &mut self,
        method: LatestMethod,
        strategy: impl LatestStrategy + 'static,
    ) -> &mut Self {
        self.latest_any.insert(method, Arc::new(strategy));
        self
    }

    fn current_strategy(
        &self,
        method: CurrentMethod,
        service: &str,
    ) -> Option<&Arc<dyn CurrentStrategy>> {
        self.current
            .get(&(method, service_key(service)))
            .or_else(|| self.current_any.get(&method))
    }

    fn latest_strategy(&self, method: LatestMethod, service: &str) -> Option<&Arc<dyn LatestStrategy>> {
        self.latest
            .get(&(method, service_key(service)))
            .or_else(|| self.latest_any.get(&method))
    }

    pub fn has_current(&self, method: CurrentMethod, service: &str) -> bool {
        self.current_strategy(method, service).is_some()
    }

    pub fn has_latest(&self, method: LatestMethod, service: &str) -> bool {
        self.latest_strategy(method, service).is_some()
    }

    /// Resolves both sides of `ctx.record` and picks how the pair is compared.
    ///
    /// The current side always runs first. Its reading may already carry a
    /// latest version, in which case the latest strategy is not consulted.
    /// Otherwise the latest strategy runs and receives the current value when
    /// it declares that it needs it.
    pub async fn resolve(&self, ctx: &CheckContext<'_>) -> (CheckResult, CompareMode) {
        let record = ctx.record;
        let mut mode = CompareMode::Version;

        let reading = match record.check_current {
            Some(method) => match self.current_strategy(method, &record.name) {
                Some(strategy) => {
                    if let Some(requested) = strategy.compare_mode() {
                        mode = requested;
                    }
                    strategy.current(ctx).await
                }
                None => ctx
                    .not_configured::<Reading>(format!(
                        "no {} check for {}",
                        method, record.name
                    ))
                    .unwrap_or_default(),
            },
            None => match record.check_current_raw.as_deref() {
                Some(raw) => ctx
                    .not_configured::<Reading>(format!(
                        "unrecognized current-version method {}",
                        raw
                    ))
                    .unwrap_or_default(),
                None => {
                    debug!("{} has no current-version method", record.identity());
                    Reading::default()
                }
            },
        };

        let latest = match reading.latest.clone() {
            Some(latest) => Some(latest),
            None => self.resolve_latest(ctx, record, reading.current.as_deref()).await,
        };

        if mode == CompareMode::Version
            && record
                .check_latest
                .map_or(false, |m| m.reports_status_token())
        {
            mode = CompareMode::StatusToken;
        }

        let result = CheckResult::new(reading.current, latest).with_side_effects(reading.side_effects);
        (result, mode)
    }

    async fn resolve_latest(
        &self,
        ctx: &CheckContext<'_>,
        record: &ServiceRecord,
        current: Option<&str>,
    ) -> Option<String> {
        let method = match record.check_latest {
            Some(LatestMethod::None) => return None,
            Some(method) => method,
            None => return ctx.not_configured("unrecognized latest-version method"),
        };
        let Some(strategy) = self.latest_strategy(method, &record.name) else {
            return ctx.not_configured(format!("no {} lookup for {}", method, record.name));
        };
        let current = if strategy.requires_current() {
            current
        } else {
            None
        };
        strategy.latest(ctx, current).await
    }
}
