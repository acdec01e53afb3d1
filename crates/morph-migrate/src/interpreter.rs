//! Mutaction interpreter — execute/rollback per schema-change primitive.
//!
//! Each mutaction kind compiles to exactly one logical store operation per
//! direction, dispatched by a single `match` so the sequencer's rollback
//! cascade has one place to look. Collections materialize lazily on first
//! write in the backing store, so create-side relation steps only manage
//! indexes; only drops need an explicit collection step.

use tracing::debug;

use morph_core::Mutaction;
use morph_store::{MutationStore, StoreResult};

use crate::relation::{IndexAction, RelationIndexManager};

/// Interprets mutactions against a store.
pub struct MutactionInterpreter<'a> {
    store: &'a dyn MutationStore,
}

impl<'a> MutactionInterpreter<'a> {
    pub fn new(store: &'a dyn MutationStore) -> Self {
        Self { store }
    }

    /// Apply a mutaction. Returns side-channel detail such as the name of
    /// a created index.
    pub fn execute(&self, mutaction: &Mutaction) -> StoreResult<Option<String>> {
        match mutaction {
            Mutaction::CreateRelation { relation } => {
                self.run_index_action(RelationIndexManager::add(relation))
            }
            Mutaction::DeleteRelationTable { relation } => {
                // No explicit index drop: a table relation's index dies with
                // the join collection, an inline relation's with its owning
                // model collection.
                if !relation.is_inline() {
                    self.store.drop_collection(&relation.storage_name)?;
                }
                Ok(None)
            }
            Mutaction::RenameRelation { relation, new_storage_name } => {
                // Declared no-op: index names are not kept in sync with the
                // renamed storage identifier. Known limitation.
                debug!(
                    relation = %relation.name,
                    %new_storage_name,
                    "rename-relation leaves indexes untouched"
                );
                Ok(None)
            }
            Mutaction::CreateModelTable { model } => {
                self.store.create_collection(&model.storage_name)?;
                Ok(None)
            }
            Mutaction::DeleteModelTable { model } => {
                self.store.drop_collection(&model.storage_name)?;
                Ok(None)
            }
            Mutaction::RenameModelTable { model, new_storage_name } => {
                self.store
                    .rename_collection(&model.storage_name, new_storage_name)?;
                Ok(None)
            }
            Mutaction::CreateField { model, field } => {
                if field.is_unique {
                    let name = self
                        .store
                        .create_index(&model.storage_name, &field.storage_name)?;
                    return Ok(Some(name));
                }
                Ok(None)
            }
            Mutaction::DeleteField { model, field } => {
                if field.is_unique {
                    self.store
                        .drop_index(&model.storage_name, &field.storage_name)?;
                }
                Ok(None)
            }
        }
    }

    /// Compensate an executed mutaction.
    pub fn rollback(&self, mutaction: &Mutaction) -> StoreResult<Option<String>> {
        match mutaction {
            Mutaction::CreateRelation { relation } => {
                self.run_index_action(RelationIndexManager::remove(relation))
            }
            Mutaction::DeleteRelationTable { relation } => {
                // Nothing recreates the collection or index implicitly, so
                // the compensation is explicit for both storage strategies.
                if relation.is_inline() {
                    self.run_index_action(RelationIndexManager::add(relation))
                } else {
                    self.store.create_collection(&relation.storage_name)?;
                    Ok(None)
                }
            }
            Mutaction::RenameRelation { .. } => Ok(None),
            Mutaction::CreateModelTable { model } => {
                self.store.drop_collection(&model.storage_name)?;
                Ok(None)
            }
            Mutaction::DeleteModelTable { model } => {
                self.store.create_collection(&model.storage_name)?;
                Ok(None)
            }
            Mutaction::RenameModelTable { model, new_storage_name } => {
                self.store
                    .rename_collection(new_storage_name, &model.storage_name)?;
                Ok(None)
            }
            Mutaction::CreateField { model, field } => {
                if field.is_unique {
                    self.store
                        .drop_index(&model.storage_name, &field.storage_name)?;
                }
                Ok(None)
            }
            Mutaction::DeleteField { model, field } => {
                if field.is_unique {
                    let name = self
                        .store
                        .create_index(&model.storage_name, &field.storage_name)?;
                    return Ok(Some(name));
                }
                Ok(None)
            }
        }
    }

    fn run_index_action(&self, action: IndexAction) -> StoreResult<Option<String>> {
        match action {
            IndexAction::None => Ok(None),
            IndexAction::Create { collection, field } => {
                let name = self.store.create_index(&collection, &field)?;
                Ok(Some(name))
            }
            IndexAction::Drop { collection, field } => {
                self.store.drop_index(&collection, &field)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Op, RecordingStore};
    use morph_core::{FieldRef, ModelRef, Relation, RelationEndpoint, RelationLink, ScalarField};

    fn inline_relation() -> Relation {
        Relation {
            name: "PostsOnAuthor".to_string(),
            storage_name: "_PostsOnAuthor".to_string(),
            field_a: RelationEndpoint {
                model: ModelRef::new("Post", "posts"),
                field: FieldRef::new("author", "authorId"),
                relation_is_inlined_in_parent: true,
            },
            field_b: RelationEndpoint {
                model: ModelRef::new("Author", "authors"),
                field: FieldRef::new("posts", "postIds"),
                relation_is_inlined_in_parent: false,
            },
            link: RelationLink::Inline,
        }
    }

    fn table_relation() -> Relation {
        Relation {
            link: RelationLink::Table,
            ..inline_relation()
        }
    }

    #[test]
    fn create_relation_inline_round_trip_restores_index_state() {
        let store = RecordingStore::new();
        let interpreter = MutactionInterpreter::new(&store);
        let m = Mutaction::CreateRelation {
            relation: inline_relation(),
        };

        let detail = interpreter.execute(&m).unwrap();
        assert_eq!(detail.as_deref(), Some("authorId_1"));
        assert_eq!(store.inner().list_indexes("posts").unwrap().len(), 1);

        interpreter.rollback(&m).unwrap();
        assert!(store.inner().list_indexes("posts").unwrap().is_empty());

        assert_eq!(
            store.ops(),
            vec![
                Op::CreateIndex("posts".to_string(), "authorId".to_string()),
                Op::DropIndex("posts".to_string(), "authorId".to_string()),
            ]
        );
    }

    #[test]
    fn create_relation_table_touches_nothing() {
        let store = RecordingStore::new();
        let interpreter = MutactionInterpreter::new(&store);
        let m = Mutaction::CreateRelation {
            relation: table_relation(),
        };

        interpreter.execute(&m).unwrap();
        interpreter.rollback(&m).unwrap();
        assert!(store.ops().is_empty());
    }

    #[test]
    fn delete_relation_table_never_drops_the_index_explicitly() {
        let store = RecordingStore::new();
        let interpreter = MutactionInterpreter::new(&store);
        let m = Mutaction::DeleteRelationTable {
            relation: inline_relation(),
        };

        interpreter.execute(&m).unwrap();
        assert!(store.index_ops().is_empty());
    }

    #[test]
    fn delete_relation_table_rollback_recreates_the_index_explicitly() {
        let store = RecordingStore::new();
        let interpreter = MutactionInterpreter::new(&store);
        let m = Mutaction::DeleteRelationTable {
            relation: inline_relation(),
        };

        interpreter.execute(&m).unwrap();
        interpreter.rollback(&m).unwrap();

        assert_eq!(
            store.index_ops(),
            vec![Op::CreateIndex("posts".to_string(), "authorId".to_string())]
        );
    }

    #[test]
    fn delete_relation_table_for_join_collection_drops_and_recreates_it() {
        let store = RecordingStore::new();
        store.create_collection("_PostsOnAuthor").unwrap();
        let interpreter = MutactionInterpreter::new(&store);
        let m = Mutaction::DeleteRelationTable {
            relation: table_relation(),
        };

        interpreter.execute(&m).unwrap();
        assert!(store.inner().list_collections().unwrap().is_empty());

        interpreter.rollback(&m).unwrap();
        assert_eq!(store.inner().list_collections().unwrap().len(), 1);
        assert!(store.index_ops().is_empty());
    }

    #[test]
    fn rename_relation_is_a_no_op_in_both_directions() {
        let store = RecordingStore::new();
        let interpreter = MutactionInterpreter::new(&store);
        let m = Mutaction::RenameRelation {
            relation: inline_relation(),
            new_storage_name: "_AuthoredPosts".to_string(),
        };

        interpreter.execute(&m).unwrap();
        interpreter.rollback(&m).unwrap();
        assert!(store.ops().is_empty());
    }

    #[test]
    fn model_table_lifecycle_round_trips() {
        let store = RecordingStore::new();
        let interpreter = MutactionInterpreter::new(&store);
        let create = Mutaction::CreateModelTable {
            model: ModelRef::new("User", "users"),
        };
        let rename = Mutaction::RenameModelTable {
            model: ModelRef::new("User", "users"),
            new_storage_name: "accounts".to_string(),
        };

        interpreter.execute(&create).unwrap();
        interpreter.execute(&rename).unwrap();
        let names: Vec<String> = store
            .inner()
            .list_collections()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["accounts"]);

        interpreter.rollback(&rename).unwrap();
        interpreter.rollback(&create).unwrap();
        assert!(store.inner().list_collections().unwrap().is_empty());
    }

    #[test]
    fn unique_field_owns_an_index_non_unique_does_not() {
        let store = RecordingStore::new();
        let interpreter = MutactionInterpreter::new(&store);
        let unique = Mutaction::CreateField {
            model: ModelRef::new("User", "users"),
            field: ScalarField {
                name: "email".to_string(),
                storage_name: "email".to_string(),
                is_unique: true,
            },
        };
        let plain = Mutaction::CreateField {
            model: ModelRef::new("User", "users"),
            field: ScalarField {
                name: "bio".to_string(),
                storage_name: "bio".to_string(),
                is_unique: false,
            },
        };

        let detail = interpreter.execute(&unique).unwrap();
        assert_eq!(detail.as_deref(), Some("email_1"));
        interpreter.execute(&plain).unwrap();

        assert_eq!(store.index_ops().len(), 1);

        interpreter.rollback(&unique).unwrap();
        assert!(store.inner().list_indexes("users").unwrap().is_empty());
    }
}
