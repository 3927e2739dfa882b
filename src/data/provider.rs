use std::collections::HashMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::domain::MarketData;

/// Source of multi-timeframe market data for a symbol.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    // Either return the symbol's data OR an anyhow::Error
    async fn fetch(&self, symbol: &str) -> Result<MarketData>;

    /// A unique identifier for this implementation (so that afterwards we know which one we used).
    fn signature(&self) -> &'static str;
}

/// Data already held in memory, keyed by symbol.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    data: HashMap<String, MarketData>,
}

impl InMemoryProvider {
    pub fn new(items: impl IntoIterator<Item = MarketData>) -> Self {
        Self {
            data: items
                .into_iter()
                .map(|md| (md.symbol.clone(), md))
                .collect(),
        }
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryProvider {
    async fn fetch(&self, symbol: &str) -> Result<MarketData> {
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| anyhow!("{} not found in memory", symbol))
    }

    fn signature(&self) -> &'static str {
        "In Memory"
    }
}

/// Tries each provider in order and returns the first success.
pub struct FallbackProvider {
    providers: Vec<Box<dyn MarketDataProvider>>,
}

impl FallbackProvider {
    pub fn new(providers: Vec<Box<dyn MarketDataProvider>>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl MarketDataProvider for FallbackProvider {
    async fn fetch(&self, symbol: &str) -> Result<MarketData> {
        for provider in &self.providers {
            match provider.fetch(symbol).await {
                Ok(data) => {
                    log::debug!("{} loaded via {}", symbol, provider.signature());
                    return Ok(data);
                }
                Err(e) => {
                    log::debug!("{} unavailable from {}: {:#}", symbol, provider.signature(), e);
                    // Continue to the next provider
                }
            }
        }
        Err(anyhow!("All providers failed to supply {}", symbol))
    }

    fn signature(&self) -> &'static str {
        "Fallback Chain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl MarketDataProvider for Failing {
        async fn fetch(&self, symbol: &str) -> Result<MarketData> {
            Err(anyhow!("{} always fails", symbol))
        }

        fn signature(&self) -> &'static str {
            "Failing"
        }
    }

    #[tokio::test]
    async fn fallback_uses_first_successful_provider() {
        let memory = InMemoryProvider::new([MarketData::new("ACME")]);
        let chain = FallbackProvider::new(vec![Box::new(Failing), Box::new(memory)]);

        let data = chain.fetch("ACME").await.unwrap();
        assert_eq!(data.symbol, "ACME");
        assert!(chain.fetch("MISSING").await.is_err());
    }

    #[tokio::test]
    async fn empty_chain_fails() {
        let chain = FallbackProvider::new(Vec::new());
        assert!(chain.is_empty());
        assert!(chain.fetch("ACME").await.is_err());
    }
}
