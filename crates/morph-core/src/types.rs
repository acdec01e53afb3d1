//! Domain types for morph schema migrations.
//!
//! These types describe the physical schema model (models, scalar fields,
//! relations), the schema-change primitives produced by the diff stage
//! (mutactions), and the step/report types produced when a migration plan
//! is applied. All types are JSON-serializable so they can travel over the
//! deploy wire and into the local state mirror.

use serde::{Deserialize, Serialize};

/// Name of a service as registered upstream.
pub type ServiceName = String;

/// Name of a deployment stage (e.g. "dev", "prod").
pub type StageName = String;

// ── Schema model ───────────────────────────────────────────────────

/// A model (entity type) and the physical collection backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub name: String,
    /// Physical collection name.
    pub storage_name: String,
}

impl ModelRef {
    pub fn new(name: &str, storage_name: &str) -> Self {
        Self {
            name: name.to_string(),
            storage_name: storage_name.to_string(),
        }
    }
}

/// A field reference: logical name plus the storage identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub name: String,
    pub storage_name: String,
}

impl FieldRef {
    pub fn new(name: &str, storage_name: &str) -> Self {
        Self {
            name: name.to_string(),
            storage_name: storage_name.to_string(),
        }
    }
}

/// A scalar field on a model.
///
/// Unique fields own a single-field index on their collection; non-unique
/// fields have no physical footprint in schemaless storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarField {
    pub name: String,
    pub storage_name: String,
    pub is_unique: bool,
}

/// How a relation is physically stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationLink {
    /// Foreign-key-like field on one side's record.
    Inline,
    /// Separate join collection.
    Table,
}

/// One side of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEndpoint {
    /// The model owning this side.
    pub model: ModelRef,
    /// The relation field on that model.
    pub field: FieldRef,
    /// True when this side's record carries the foreign key for an inline
    /// relation. Meaningless for table relations.
    pub relation_is_inlined_in_parent: bool,
}

/// A relation between two models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    /// Physical name of the join collection for table relations; a logical
    /// identifier only for inline relations.
    pub storage_name: String,
    pub field_a: RelationEndpoint,
    pub field_b: RelationEndpoint,
    pub link: RelationLink,
}

impl Relation {
    pub fn is_inline(&self) -> bool {
        self.link == RelationLink::Inline
    }

    /// The endpoint carrying the foreign key of an inline relation.
    ///
    /// Exactly one endpoint has `relation_is_inlined_in_parent` set for a
    /// well-formed inline relation; `field_a` is checked first.
    pub fn inlined_endpoint(&self) -> &RelationEndpoint {
        if self.field_a.relation_is_inlined_in_parent {
            &self.field_a
        } else {
            &self.field_b
        }
    }
}

// ── Mutactions ─────────────────────────────────────────────────────

/// One atomic, reversible schema-change primitive.
///
/// Produced by the diff stage, immutable once created, consumed exactly
/// once by the interpreter. The closed set of kinds keeps interpreter
/// dispatch to a single `match` per direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mutaction {
    CreateRelation {
        relation: Relation,
    },
    DeleteRelationTable {
        relation: Relation,
    },
    /// Renaming never touches indexes on either execute or rollback, so
    /// index names drift out of sync with the renamed storage identifier.
    /// Known limitation.
    RenameRelation {
        relation: Relation,
        new_storage_name: String,
    },
    CreateModelTable {
        model: ModelRef,
    },
    DeleteModelTable {
        model: ModelRef,
    },
    RenameModelTable {
        model: ModelRef,
        new_storage_name: String,
    },
    CreateField {
        model: ModelRef,
        field: ScalarField,
    },
    DeleteField {
        model: ModelRef,
        field: ScalarField,
    },
}

impl Mutaction {
    /// Stable kind tag used in step reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutaction::CreateRelation { .. } => "create_relation",
            Mutaction::DeleteRelationTable { .. } => "delete_relation_table",
            Mutaction::RenameRelation { .. } => "rename_relation",
            Mutaction::CreateModelTable { .. } => "create_model_table",
            Mutaction::DeleteModelTable { .. } => "delete_model_table",
            Mutaction::RenameModelTable { .. } => "rename_model_table",
            Mutaction::CreateField { .. } => "create_field",
            Mutaction::DeleteField { .. } => "delete_field",
        }
    }

    /// Human-readable target of the change.
    pub fn target(&self) -> String {
        match self {
            Mutaction::CreateRelation { relation }
            | Mutaction::DeleteRelationTable { relation }
            | Mutaction::RenameRelation { relation, .. } => relation.name.clone(),
            Mutaction::CreateModelTable { model }
            | Mutaction::DeleteModelTable { model }
            | Mutaction::RenameModelTable { model, .. } => model.name.clone(),
            Mutaction::CreateField { model, field } | Mutaction::DeleteField { model, field } => {
                format!("{}.{}", model.name, field.name)
            }
        }
    }
}

// ── Migration steps ────────────────────────────────────────────────

/// Direction a mutaction was driven in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDirection {
    Execute,
    Rollback,
}

/// Outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Applied,
    RolledBack,
    Failed,
}

/// Audit record for one mutaction application or rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationStep {
    pub kind: String,
    pub target: String,
    pub direction: StepDirection,
    pub status: StepStatus,
    /// Side-channel metadata, e.g. the name of an index that was created.
    pub detail: Option<String>,
}

/// Aggregate audit trail of applying one ordered mutaction plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub steps: Vec<MigrationStep>,
}

impl MigrationReport {
    pub fn applied_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Applied)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline_relation(a_inlined: bool) -> Relation {
        Relation {
            name: "AlbumOnArtist".to_string(),
            storage_name: "_AlbumOnArtist".to_string(),
            field_a: RelationEndpoint {
                model: ModelRef::new("Album", "albums"),
                field: FieldRef::new("artist", "artistId"),
                relation_is_inlined_in_parent: a_inlined,
            },
            field_b: RelationEndpoint {
                model: ModelRef::new("Artist", "artists"),
                field: FieldRef::new("albums", "albumIds"),
                relation_is_inlined_in_parent: !a_inlined,
            },
            link: RelationLink::Inline,
        }
    }

    #[test]
    fn inlined_endpoint_selects_flagged_side() {
        let rel = inline_relation(true);
        assert_eq!(rel.inlined_endpoint().model.name, "Album");

        let rel = inline_relation(false);
        assert_eq!(rel.inlined_endpoint().model.name, "Artist");
    }

    #[test]
    fn mutaction_serde_uses_snake_case_tags() {
        let m = Mutaction::CreateModelTable {
            model: ModelRef::new("User", "users"),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["type"], "create_model_table");

        let back: Mutaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn mutaction_target_names_field_with_model() {
        let m = Mutaction::CreateField {
            model: ModelRef::new("User", "users"),
            field: ScalarField {
                name: "email".to_string(),
                storage_name: "email".to_string(),
                is_unique: true,
            },
        };
        assert_eq!(m.target(), "User.email");
        assert_eq!(m.kind(), "create_field");
    }
}
