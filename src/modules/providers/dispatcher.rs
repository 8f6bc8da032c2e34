use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Provider, ProviderResult};

/// Which provider produced a dispatch result.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched<K, Out> {
    /// `None` when the local placeholder answered (or nothing did).
    pub provider: Option<K>,
    pub result: ProviderResult<Out>,
    /// Providers that were actually called, in call order.
    pub attempted: Vec<K>,
}

/// Tries a preferred provider, then every other available one in priority
/// order, then a local placeholder. One attempt per provider, sequentially.
pub struct FallbackDispatcher<K, Req: Sync, Out: Send> {
    service: &'static str,
    providers: Vec<(K, Arc<dyn Provider<Req, Out>>)>,
    placeholder: Option<Arc<dyn Provider<Req, Out>>>,
}

impl<K, Req, Out> FallbackDispatcher<K, Req, Out>
where
    K: Copy + Eq + Display,
    Req: Sync,
    Out: Send,
{
    pub fn new(service: &'static str) -> Self {
        Self {
            service,
            providers: Vec::new(),
            placeholder: None,
        }
    }

    /// Registers a provider; registration order is the fallback priority.
    pub fn with(mut self, kind: K, provider: Arc<dyn Provider<Req, Out>>) -> Self {
        self.providers.push((kind, provider));
        self
    }

    /// Last resort used when every provider is unavailable or failed. It
    /// must always succeed.
    pub fn with_placeholder(mut self, provider: Arc<dyn Provider<Req, Out>>) -> Self {
        self.placeholder = Some(provider);
        self
    }

    pub fn get(&self, kind: K) -> Option<&Arc<dyn Provider<Req, Out>>> {
        self.providers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p)
    }

    /// Registered providers that currently have credentials, in priority order.
    pub fn available(&self) -> Vec<K> {
        self.providers
            .iter()
            .filter(|(_, p)| p.is_available())
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn kinds(&self) -> Vec<K> {
        self.providers.iter().map(|(k, _)| *k).collect()
    }

    pub async fn dispatch(&self, preferred: Option<K>, request: &Req) -> Dispatched<K, Out> {
        let mut attempted = Vec::new();
        let mut failures: Vec<String> = Vec::new();

        let preferred_entry = preferred.and_then(|kind| self.get(kind).map(|p| (kind, p)));
        let ordered = preferred_entry.into_iter().chain(
            self.providers
                .iter()
                .filter(|(k, _)| Some(*k) != preferred)
                .map(|(k, p)| (*k, p)),
        );

        for (kind, provider) in ordered {
            if !provider.is_available() {
                debug!("{} provider {} skipped: not configured", self.service, kind);
                continue;
            }

            attempted.push(kind);
            let result = provider.generate(request).await;
            if let Some(error) = result.error_message() {
                warn!("{} provider {} failed: {}", self.service, kind, error);
                failures.push(format!("{kind}: {error}"));
                continue;
            }

            if preferred.is_some_and(|p| p != kind) {
                info!("🔁 {} fell back to {}", self.service, kind);
            }
            return Dispatched {
                provider: Some(kind),
                result,
                attempted,
            };
        }

        if let Some(placeholder) = &self.placeholder {
            info!("🧩 {} using local placeholder ({})", self.service, placeholder.name());
            let result = placeholder.generate(request).await;
            if let Some(error) = result.error_message() {
                failures.push(format!("placeholder: {error}"));
            } else {
                return Dispatched {
                    provider: None,
                    result,
                    attempted,
                };
            }
        }

        let error = if failures.is_empty() {
            format!("no {} provider is configured", self.service)
        } else {
            format!("all {} providers failed: {}", self.service, failures.join("; "))
        };

        Dispatched {
            provider: None,
            result: ProviderResult::error(error),
            attempted,
        }
    }
}
