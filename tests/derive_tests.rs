#[path = "fixtures.rs"]
mod fixtures;

use fixtures::*;
use chrono::{DateTime, Utc};
use graph_hydrate::{
    Entity, EntityHandle, EntityModel, EntityType, GraphError, KeyValue, Navigation,
    RelationshipKind, Result,
};
use serde::{Deserialize, Serialize};

/// Fields without a key conversion are mapped only when skipped.
#[derive(Debug, Serialize, Deserialize, Entity)]
struct Invoice {
    #[key]
    id: i64,
    customer_id: Option<i64>,
    #[entity(skip)]
    issued_at: DateTime<Utc>,
    #[entity(skip)]
    total: f64,
    #[entity(skip)]
    sequence: u64,
}

#[test]
fn test_metadata_follows_field_order() {
    let metadata = Blog::metadata();

    assert_eq!(metadata.entity_type, EntityType::of::<Blog>());
    assert_eq!(metadata.table_name, "blogs");
    assert_eq!(metadata.key_members, vec!["id"]);

    let relationships: Vec<_> = metadata
        .relationships
        .iter()
        .map(|r| (r.name, r.kind, r.target, r.foreign_key))
        .collect();
    assert_eq!(
        relationships,
        vec![
            (
                "owner",
                RelationshipKind::Reference,
                EntityType::of::<Author>(),
                "owner_id"
            ),
            (
                "posts",
                RelationshipKind::Collection,
                EntityType::of::<Post>(),
                "blog_id"
            ),
        ]
    );
}

#[test]
fn test_default_table_name_and_composite_key() {
    assert_eq!(Comment::metadata().table_name, "comment");
    assert!(Comment::metadata().relationships.is_empty());

    let line = OrderLine::metadata();
    assert_eq!(line.table_name, "order_lines");
    assert_eq!(line.key_members, vec!["order_id", "line_no"]);
}

#[test]
fn test_self_reference_targets_own_type() {
    let metadata = Employee::metadata();
    assert!(
        metadata
            .relationships
            .iter()
            .all(|r| r.target == Employee::model_type())
    );
    assert!(metadata.relationship("reports").is_some_and(|r| r.is_collection()));
}

#[test]
fn test_scalar_properties() -> Result<()> {
    let post = post(10, 1, Some(2), "Ownership");

    assert_eq!(post.property("id")?, KeyValue::Integer(10));
    assert_eq!(post.property("author_id")?, KeyValue::Integer(2));
    assert_eq!(post.property("title")?, KeyValue::from("Ownership"));
    Ok(())
}

#[test]
fn test_skipped_and_navigation_fields_are_not_properties() {
    let line = OrderLine {
        order_id: 1,
        line_no: 1,
        sku: "KB-01".to_string(),
        unit_price: 4.0,
    };
    assert!(matches!(
        line.property("unit_price"),
        Err(GraphError::PropertyNotFound { .. })
    ));

    let blog = blog(1, "Systems", None);
    match blog.property("posts") {
        Err(GraphError::PropertyNotFound { property, .. }) => assert_eq!(property, "posts"),
        other => panic!("Expected PropertyNotFound, got {:?}", other),
    }
}

#[test]
fn test_set_navigation_checks_shape() -> Result<()> {
    let mut blog = blog(1, "Systems", Some(1));
    let ada = EntityHandle::new(author(1, "Ada"));

    blog.set_navigation("owner", Navigation::Reference(Some(ada.clone())))?;
    let owner = blog.navigation("owner")?.into_reference().flatten();
    assert!(owner.is_some_and(|o| o.ptr_eq(&ada)));

    match blog.set_navigation("posts", Navigation::Reference(None)) {
        Err(GraphError::NavigationMismatch {
            relationship,
            expected,
            ..
        }) => {
            assert_eq!(relationship, "posts");
            assert_eq!(expected, "collection");
        }
        other => panic!("Expected NavigationMismatch, got {:?}", other),
    }
    assert!(matches!(
        blog.set_navigation("name", Navigation::Collection(Vec::new())),
        Err(GraphError::PropertyNotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_handle_downcasts_to_concrete_type() -> Result<()> {
    let handle = EntityHandle::new(comment(100, 10, "clear"));

    assert_eq!(handle.with(|c: &Comment| c.body.clone())?, "clear");
    assert!(matches!(
        handle.with(|p: &Post| p.id),
        Err(GraphError::TypeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_unconvertible_fields_can_be_skipped() -> Result<()> {
    let invoice = Invoice {
        id: 9,
        customer_id: None,
        issued_at: Utc::now(),
        total: 12.5,
        sequence: u64::MAX,
    };

    assert_eq!(invoice.property("id")?, KeyValue::Integer(9));
    assert_eq!(invoice.property("customer_id")?, KeyValue::Null);
    for skipped in ["issued_at", "total", "sequence"] {
        assert!(matches!(
            invoice.property(skipped),
            Err(GraphError::PropertyNotFound { .. })
        ));
    }
    assert_eq!(Invoice::metadata().key_members, vec!["id"]);
    assert!(Invoice::metadata().relationships.is_empty());
    Ok(())
}
