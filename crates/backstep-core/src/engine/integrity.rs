//! Post-run integrity verification.

use std::sync::Arc;

use super::error::EngineError;
use crate::error::Error;
use crate::relation::RelationDef;
use crate::selector::Selector;
use crate::storage::Store;
use crate::value::{Value, ID_FIELD};

/// Page size used when scanning child rows.
const SCAN_PAGE: usize = 1000;

type Predicate = dyn Fn(&dyn Store) -> Result<bool, Error> + Send + Sync;

/// A caller-supplied check that must hold after a migration body.
#[derive(Clone)]
pub struct IntegrityCheck {
    name: String,
    message: String,
    predicate: Arc<Predicate>,
}

impl IntegrityCheck {
    /// Create a check. `predicate` returns `true` when the data is valid.
    pub fn new<F>(name: impl Into<String>, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&dyn Store) -> Result<bool, Error> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            message: message.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Evaluate the check.
    pub fn evaluate(&self, store: &dyn Store) -> Result<(), EngineError> {
        if (self.predicate)(store)? {
            Ok(())
        } else {
            Err(EngineError::IntegrityViolation {
                check: self.name.clone(),
                message: self.message.clone(),
            })
        }
    }
}

impl std::fmt::Debug for IntegrityCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityCheck")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish()
    }
}

/// Verify that every child row with a non-null foreign key resolves to a
/// parent.
pub fn verify_relation(store: &dyn Store, relation: &RelationDef) -> Result<(), EngineError> {
    let mut after = None;
    loop {
        let page = store.select(&relation.to_entity, &Selector::All, after, SCAN_PAGE)?;
        let Some((last, _)) = page.last() else {
            return Ok(());
        };
        after = Some(*last);

        for (child_id, child) in &page {
            let Some(parent) = relation.parent_of(*child_id, child) else {
                continue;
            };
            if !parent_exists(store, relation, &parent)? {
                let key = child
                    .get(&relation.to_field)
                    .map(Value::to_string)
                    .unwrap_or_default();
                return Err(EngineError::IntegrityViolation {
                    check: relation.name.clone(),
                    message: format!(
                        "{}#{} references missing {} ({} = {})",
                        relation.to_entity, child_id, relation.from_entity, relation.from_field, key
                    ),
                });
            }
        }

        if page.len() < SCAN_PAGE {
            return Ok(());
        }
    }
}

fn parent_exists(store: &dyn Store, relation: &RelationDef, parent: &Selector) -> Result<bool, Error> {
    if relation.from_field == ID_FIELD {
        if let Selector::Eq { value, .. } = parent {
            return match value.as_record_id() {
                Some(id) => Ok(store.get(&relation.from_entity, id)?.is_some()),
                None => Ok(false),
            };
        }
    }
    Ok(!store.select(&relation.from_entity, parent, None, 1)?.is_empty())
}
