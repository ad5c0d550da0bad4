//! The CDE registry: the catalog of data element and form definitions a
//! registry operates over.
//!
//! Definitions are loaded once and treated as immutable per load
//! generation. Reload swaps in a whole new generation atomically;
//! concurrent readers either see the old generation or the new one,
//! never a mix.

pub mod importer;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{CdeFormsError, Result};
use crate::types::{CdeSpec, FormSpec};

/// Everything a registry definition file supplies: the registry code,
/// its data elements, and its form structures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryDefinition {
    pub code: String,
    pub cdes: Vec<CdeSpec>,
    pub forms: Vec<FormSpec>,
}

impl RegistryDefinition {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            cdes: Vec::new(),
            forms: Vec::new(),
        }
    }

    pub fn with_cde(mut self, cde: CdeSpec) -> Self {
        self.cdes.push(cde);
        self
    }

    pub fn with_form(mut self, form: FormSpec) -> Self {
        self.forms.push(form);
        self
    }
}

/// One immutable load generation of the registry.
#[derive(Debug)]
pub struct RegistrySnapshot {
    generation: u64,
    code: String,
    cdes: HashMap<String, Arc<CdeSpec>>,
    forms: HashMap<String, Arc<FormSpec>>,
}

impl RegistrySnapshot {
    fn from_definition(definition: RegistryDefinition, generation: u64) -> Result<Self> {
        let mut cdes = HashMap::with_capacity(definition.cdes.len());
        for cde in definition.cdes {
            let code = cde.code.clone();
            if cdes.insert(code.clone(), Arc::new(cde)).is_some() {
                return Err(CdeFormsError::configuration(format!(
                    "duplicate CDE code `{code}` in registry `{}`",
                    definition.code
                )));
            }
        }

        let mut forms = HashMap::with_capacity(definition.forms.len());
        for form in definition.forms {
            let name = form.name.clone();
            if forms.insert(name.clone(), Arc::new(form)).is_some() {
                return Err(CdeFormsError::configuration(format!(
                    "duplicate form `{name}` in registry `{}`",
                    definition.code
                )));
            }
        }

        Ok(Self {
            generation,
            code: definition.code,
            cdes,
            forms,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn registry_code(&self) -> &str {
        &self.code
    }

    /// Look up one CDE definition. A missing code is a configuration
    /// error, not a per-request condition.
    pub fn lookup(&self, code: &str) -> Result<&Arc<CdeSpec>> {
        self.cdes
            .get(code)
            .ok_or_else(|| CdeFormsError::unknown_cde(code))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.cdes.contains_key(code)
    }

    pub fn form_spec(&self, name: &str) -> Result<&Arc<FormSpec>> {
        self.forms
            .get(name)
            .ok_or_else(|| CdeFormsError::unknown_form(name))
    }

    pub fn cde_codes(&self) -> impl Iterator<Item = &str> {
        self.cdes.keys().map(String::as_str)
    }

    pub fn form_names(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }

    pub fn cde_count(&self) -> usize {
        self.cdes.len()
    }
}

/// Read-mostly catalog of CDE and form definitions. Cheap to share:
/// readers take an `Arc` snapshot and need no further locking.
#[derive(Debug)]
pub struct CdeRegistry {
    snapshot: RwLock<Arc<RegistrySnapshot>>,
}

impl CdeRegistry {
    pub fn new(definition: RegistryDefinition) -> Result<Self> {
        let snapshot = RegistrySnapshot::from_definition(definition, 1)?;
        tracing::info!(
            registry = %snapshot.code,
            generation = snapshot.generation,
            cdes = snapshot.cdes.len(),
            forms = snapshot.forms.len(),
            "loaded registry definition"
        );
        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Current load generation, shared without copying.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.snapshot.read().expect("registry lock poisoned"))
    }

    /// Replace the whole catalog. The swap is atomic: in-flight form
    /// builds keep the generation they started with. The write lock is
    /// held from generation allocation through the swap, so concurrent
    /// reloads serialize and every installed catalog gets a unique
    /// generation.
    pub fn reload(&self, definition: RegistryDefinition) -> Result<u64> {
        let mut slot = self.snapshot.write().expect("registry lock poisoned");
        let next_generation = slot.generation + 1;
        let snapshot = RegistrySnapshot::from_definition(definition, next_generation)?;
        tracing::info!(
            registry = %snapshot.code,
            generation = snapshot.generation,
            cdes = snapshot.cdes.len(),
            "reloaded registry definition"
        );
        *slot = Arc::new(snapshot);
        Ok(next_generation)
    }
}
