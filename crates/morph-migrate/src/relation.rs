//! Relation index management.
//!
//! Computes which physical index operation a relation-level schema change
//! requires, given the storage strategy. Table relations keep their link in
//! a separate join collection, so neither endpoint's model owns an index
//! and both directions are no-ops. Inline relations put a foreign-key-like
//! field on one side's record, and that side owns a single-field index.

use morph_core::Relation;

/// A physical index operation scoped to one (collection, field) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexAction {
    /// Nothing to do.
    None,
    Create { collection: String, field: String },
    Drop { collection: String, field: String },
}

pub struct RelationIndexManager;

impl RelationIndexManager {
    /// Index operation required when the relation is added.
    pub fn add(relation: &Relation) -> IndexAction {
        match Self::target(relation) {
            Some((collection, field)) => IndexAction::Create { collection, field },
            None => IndexAction::None,
        }
    }

    /// Index operation required when the relation is removed.
    ///
    /// Selects the same endpoint as [`add`](Self::add), so an add → remove
    /// round trip touches exactly one (collection, field) pair and leaves
    /// index state unchanged.
    pub fn remove(relation: &Relation) -> IndexAction {
        match Self::target(relation) {
            Some((collection, field)) => IndexAction::Drop { collection, field },
            None => IndexAction::None,
        }
    }

    /// The (collection, field) pair owning the index, if any.
    fn target(relation: &Relation) -> Option<(String, String)> {
        if !relation.is_inline() {
            return None;
        }
        let endpoint = relation.inlined_endpoint();
        Some((
            endpoint.model.storage_name.clone(),
            endpoint.field.storage_name.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_core::{FieldRef, ModelRef, RelationEndpoint, RelationLink};

    fn relation(link: RelationLink, inlined_in_a: bool) -> Relation {
        Relation {
            name: "PostsOnAuthor".to_string(),
            storage_name: "_PostsOnAuthor".to_string(),
            field_a: RelationEndpoint {
                model: ModelRef::new("Post", "posts"),
                field: FieldRef::new("author", "authorId"),
                relation_is_inlined_in_parent: inlined_in_a,
            },
            field_b: RelationEndpoint {
                model: ModelRef::new("Author", "authors"),
                field: FieldRef::new("posts", "postIds"),
                relation_is_inlined_in_parent: !inlined_in_a,
            },
            link,
        }
    }

    #[test]
    fn table_relation_is_a_no_op_in_both_directions() {
        let rel = relation(RelationLink::Table, true);
        assert_eq!(RelationIndexManager::add(&rel), IndexAction::None);
        assert_eq!(RelationIndexManager::remove(&rel), IndexAction::None);
    }

    #[test]
    fn inline_relation_targets_the_inlined_endpoint() {
        let rel = relation(RelationLink::Inline, true);
        assert_eq!(
            RelationIndexManager::add(&rel),
            IndexAction::Create {
                collection: "posts".to_string(),
                field: "authorId".to_string(),
            }
        );
    }

    #[test]
    fn inline_relation_flag_on_other_side_flips_the_target() {
        let rel = relation(RelationLink::Inline, false);
        assert_eq!(
            RelationIndexManager::add(&rel),
            IndexAction::Create {
                collection: "authors".to_string(),
                field: "postIds".to_string(),
            }
        );
    }

    #[test]
    fn add_and_remove_are_symmetric() {
        let rel = relation(RelationLink::Inline, true);
        let added = RelationIndexManager::add(&rel);
        let removed = RelationIndexManager::remove(&rel);
        match (added, removed) {
            (
                IndexAction::Create {
                    collection: c1,
                    field: f1,
                },
                IndexAction::Drop {
                    collection: c2,
                    field: f2,
                },
            ) => {
                assert_eq!(c1, c2);
                assert_eq!(f1, f2);
            }
            other => panic!("expected create/drop pair, got {other:?}"),
        }
    }
}
