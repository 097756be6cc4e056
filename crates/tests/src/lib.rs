//! Cross-module integration tests for Filteroid

#[cfg(test)]
mod chain_integration;

#[cfg(test)]
mod processor_integration;
