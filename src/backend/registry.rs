use std::collections::BTreeMap;

use crate::backend::ippanel::{self, IpPanel};
use crate::backend::melipayamak::{self, MeliPayamak};
use crate::backend::{Backend, BackendError};
use crate::domain::{ConfigError, RawConfig};

/// Builds a backend from raw settings, validating them first.
pub type Constructor = fn(&RawConfig) -> Result<Box<dyn Backend>, BackendError>;

/// Maps backend identifiers to their constructors.
///
/// ```rust,no_run
/// use smsgate::{BackendRegistry, parse_raw_config};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = BackendRegistry::with_defaults();
/// let config = parse_raw_config(r#"{"token": "...", "number": "50004001"}"#)?;
/// let backend = registry.create("melipayamak", &config)?;
/// assert_eq!(backend.label(), "MeliPayamak");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    constructors: BTreeMap<&'static str, Constructor>,
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing every provider shipped with this crate.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ippanel::IDENTIFIER, create_ippanel);
        registry.register(melipayamak::IDENTIFIER, create_melipayamak);
        registry
    }

    /// Add or replace the constructor for `identifier`.
    pub fn register(&mut self, identifier: &'static str, constructor: Constructor) {
        if self.constructors.insert(identifier, constructor).is_some() {
            log::warn!("backend {identifier} registered twice; keeping the latest");
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.constructors.contains_key(identifier)
    }

    /// Registered identifiers in sorted order.
    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.constructors.keys().copied()
    }

    /// Construct the backend registered under `identifier`.
    pub fn create(
        &self,
        identifier: &str,
        raw: &RawConfig,
    ) -> Result<Box<dyn Backend>, BackendError> {
        let constructor =
            self.constructors
                .get(identifier)
                .ok_or_else(|| ConfigError::UnknownBackend {
                    identifier: identifier.to_owned(),
                })?;
        constructor(raw)
    }
}

fn create_ippanel(raw: &RawConfig) -> Result<Box<dyn Backend>, BackendError> {
    Ok(Box::new(IpPanel::new(raw)?))
}

fn create_melipayamak(raw: &RawConfig) -> Result<Box<dyn Backend>, BackendError> {
    Ok(Box::new(MeliPayamak::new(raw)?))
}
