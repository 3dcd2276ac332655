//! Relation definitions between entity types.
//!
//! Relations drive two things: referential-integrity verification after a
//! migration body completes, and the optional capture of related rows when
//! parents are deleted.

use crate::selector::{field_value, Selector};
use crate::value::{Attributes, RecordId};

/// Cardinality of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// One-to-one relation (unique foreign key).
    OneToOne,
    /// One-to-many relation (foreign key on many side).
    OneToMany,
}

/// A relation definition between two entity types.
///
/// `to_entity.to_field` references `from_entity.from_field`; the referencing
/// side is the child.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDef {
    /// Relation name (unique within the engine).
    pub name: String,
    /// Parent entity type.
    pub from_entity: String,
    /// Referenced field on the parent (usually `id`).
    pub from_field: String,
    /// Child entity type.
    pub to_entity: String,
    /// Foreign key field on the child.
    pub to_field: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
}

impl RelationDef {
    /// Create a one-to-one relation.
    pub fn one_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            from_field: from_field.into(),
            to_entity: to_entity.into(),
            to_field: to_field.into(),
            cardinality: Cardinality::OneToOne,
        }
    }

    /// Create a one-to-many relation.
    pub fn one_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            from_field: from_field.into(),
            to_entity: to_entity.into(),
            to_field: to_field.into(),
            cardinality: Cardinality::OneToMany,
        }
    }

    /// Selector matching the children of a parent record.
    ///
    /// Returns `None` when the parent has no value for the referenced field,
    /// in which case nothing can reference it.
    pub fn children_of(&self, parent_id: RecordId, parent: &Attributes) -> Option<Selector> {
        let key = field_value(parent_id, parent, &self.from_field)?;
        if key.is_null() {
            return None;
        }
        Some(Selector::Eq {
            field: self.to_field.clone(),
            value: key,
        })
    }

    /// Selector matching the parent a child record points at.
    ///
    /// Returns `None` when the child's foreign key is null or absent.
    pub fn parent_of(&self, child_id: RecordId, child: &Attributes) -> Option<Selector> {
        let key = field_value(child_id, child, &self.to_field)?;
        if key.is_null() {
            return None;
        }
        Some(Selector::Eq {
            field: self.from_field.clone(),
            value: key,
        })
    }
}
