// src/core/namespace.rs

//! Namespaces partition the keyspace between tenants. Connections hold a shared handle
//! to the namespace they were authenticated into.

use std::sync::Arc;

pub const DEFAULT_NAMESPACE: &str = "";

#[derive(Debug, PartialEq, Eq)]
pub struct Namespace {
    name: String,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { name: name.into() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_NAMESPACE
    }
}
