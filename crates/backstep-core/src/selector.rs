//! Record selectors used by bulk update and delete.

use crate::value::{Attributes, RecordId, Value, ID_FIELD};

/// Predicate selecting the records a bulk operation applies to.
///
/// The virtual field `id` resolves to the record identifier, so relations
/// keyed on the primary key can be expressed the same way as any other
/// attribute comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Every record of the entity type.
    All,
    /// Records with one of the given identifiers.
    Ids(Vec<RecordId>),
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field not equals value.
    Ne { field: String, value: Value },
    /// Field is in a set of values.
    In { field: String, values: Vec<Value> },
    /// Field is null or absent.
    IsNull { field: String },
    /// Field is present and not null.
    IsNotNull { field: String },
    /// All conditions must hold.
    And(Vec<Selector>),
    /// At least one condition must hold.
    Or(Vec<Selector>),
}

impl Selector {
    /// Create an equality selector.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Selector::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a not-equal selector.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Selector::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a set-membership selector.
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Selector::In {
            field: field.into(),
            values,
        }
    }

    /// Create an IS NULL selector.
    pub fn is_null(field: impl Into<String>) -> Self {
        Selector::IsNull {
            field: field.into(),
        }
    }

    /// Create an IS NOT NULL selector.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Selector::IsNotNull {
            field: field.into(),
        }
    }

    /// Select records by identifier.
    pub fn ids(ids: impl IntoIterator<Item = RecordId>) -> Self {
        let mut ids: Vec<RecordId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Selector::Ids(ids)
    }

    /// Evaluate the selector against a record.
    pub fn matches(&self, id: RecordId, attributes: &Attributes) -> bool {
        match self {
            Selector::All => true,
            Selector::Ids(ids) => ids.contains(&id),
            Selector::Eq { field, value } => {
                field_value(id, attributes, field).is_some_and(|v| v == *value)
            }
            Selector::Ne { field, value } => {
                field_value(id, attributes, field).map_or(true, |v| v != *value)
            }
            Selector::In { field, values } => {
                field_value(id, attributes, field).is_some_and(|v| values.contains(&v))
            }
            Selector::IsNull { field } => {
                field_value(id, attributes, field).map_or(true, |v| v.is_null())
            }
            Selector::IsNotNull { field } => {
                field_value(id, attributes, field).is_some_and(|v| !v.is_null())
            }
            Selector::And(all) => all.iter().all(|s| s.matches(id, attributes)),
            Selector::Or(any) => any.iter().any(|s| s.matches(id, attributes)),
        }
    }

    /// Identifiers this selector is restricted to, if it names them directly.
    pub fn explicit_ids(&self) -> Option<&[RecordId]> {
        match self {
            Selector::Ids(ids) => Some(ids),
            _ => None,
        }
    }
}

/// Resolve a field of a record, treating `id` as the record identifier.
pub fn field_value(id: RecordId, attributes: &Attributes, field: &str) -> Option<Value> {
    if field == ID_FIELD {
        return Some(Value::Int(id as i64));
    }
    attributes.get(field).cloned()
}
