//! Operation registry.
//!
//! An [`Operation`] pairs a declarative [`Action`] with its failure policy and
//! an optional applicability predicate. The registry holds operations in the
//! exact order the executor runs them.

pub mod catalog;

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::action::Action;
use crate::execute::actions::run_action;
use crate::execute::types::{ActionCtx, ActionError};
use crate::facts::HostFacts;
use crate::profile::Profile;
use crate::retry::FailurePolicy;

/// Decides from the session's facts whether an operation applies.
pub type Predicate = Box<dyn Fn(&HostFacts) -> bool>;

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("duplicate operation id: {0}")]
  DuplicateId(String),
}

/// A single unit of provisioning work.
pub struct Operation {
  pub id: String,
  pub description: String,
  pub action: Action,
  pub policy: FailurePolicy,
  /// Informational ordering tags; they never reorder execution.
  pub tags: Vec<String>,
  /// Binaries that must be present for the operation to apply.
  pub requires: Vec<String>,
  predicate: Option<Predicate>,
}

impl Operation {
  pub fn new(id: impl Into<String>, description: impl Into<String>, action: Action) -> Self {
    Self {
      id: id.into(),
      description: description.into(),
      action,
      policy: FailurePolicy::default(),
      tags: Vec::new(),
      requires: Vec::new(),
      predicate: None,
    }
  }

  pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Only run when `predicate` holds for the session's facts.
  pub fn when(mut self, predicate: impl Fn(&HostFacts) -> bool + 'static) -> Self {
    self.predicate = Some(Box::new(predicate));
    self
  }

  pub fn tagged(mut self, tag: impl Into<String>) -> Self {
    self.tags.push(tag.into());
    self
  }

  /// Only run when `binary` was found on the host.
  pub fn requires_binary(mut self, binary: impl Into<String>) -> Self {
    self.requires.push(binary.into());
    self
  }

  /// Whether the operation applies to a host.
  pub fn is_applicable(&self, facts: &HostFacts) -> bool {
    let missing = self.requires.iter().find(|bin| !facts.has_binary(bin));
    if let Some(bin) = missing {
      debug!(operation = %self.id, binary = %bin, "required binary missing");
      return false;
    }
    self.predicate.as_ref().is_none_or(|predicate| predicate(facts))
  }

  /// Run the operation's action once.
  pub(crate) fn invoke(&self, ctx: &ActionCtx<'_>) -> Result<Option<String>, ActionError> {
    run_action(&self.action, ctx)
  }
}

impl fmt::Debug for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Operation")
      .field("id", &self.id)
      .field("description", &self.description)
      .field("action", &self.action)
      .field("policy", &self.policy)
      .field("tags", &self.tags)
      .field("requires", &self.requires)
      .field("predicate", &self.predicate.is_some())
      .finish()
  }
}

/// Ordered operations with unique ids.
#[derive(Debug, Default)]
pub struct OperationRegistry {
  operations: Vec<Operation>,
  ids: HashSet<String>,
}

impl OperationRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build the registry for a profile and the host's facts.
  pub fn build(profile: &Profile, facts: &HostFacts) -> Result<Self, RegistryError> {
    let mut registry = Self::new();
    for operation in catalog::operations(profile, facts) {
      registry.register(operation)?;
    }
    debug!(operations = registry.len(), "registry built");
    Ok(registry)
  }

  /// Append an operation. Ids must be unique.
  pub fn register(&mut self, operation: Operation) -> Result<(), RegistryError> {
    if !self.ids.insert(operation.id.clone()) {
      return Err(RegistryError::DuplicateId(operation.id));
    }
    self.operations.push(operation);
    Ok(())
  }

  pub fn operations(&self) -> &[Operation] {
    &self.operations
  }

  pub fn ids(&self) -> Vec<&str> {
    self.operations.iter().map(|op| op.id.as_str()).collect()
  }

  pub fn len(&self) -> usize {
    self.operations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }
}
