#[path = "fixtures.rs"]
mod fixtures;

use fixtures::*;
use graph_hydrate::{
    EntityHandle, GraphLoader, InMemoryContext, LoaderConfig, RelationshipCache, Result,
};
use std::sync::Arc;

/// Grace manages Alan, Alan manages Edsger; Barbara and John manage each other.
fn org_context() -> Result<InMemoryContext> {
    let mut ctx = InMemoryContext::new();
    ctx.register::<Employee>();
    ctx.insert_row(&employee(1, "Grace", None))?;
    ctx.insert_row(&employee(2, "Alan", Some(1)))?;
    ctx.insert_row(&employee(3, "Edsger", Some(2)))?;
    ctx.insert_row(&employee(4, "Barbara", Some(5)))?;
    ctx.insert_row(&employee(5, "John", Some(4)))?;
    Ok(ctx)
}

fn manager_of(employee: &EntityHandle) -> Result<Option<EntityHandle>> {
    employee.with(|e: &Employee| e.manager.clone())
}

fn reports_of(employee: &EntityHandle) -> Result<Vec<EntityHandle>> {
    employee.with(|e: &Employee| e.reports.clone())
}

#[test]
fn test_self_referencing_hierarchy() -> Result<()> {
    let mut ctx = org_context()?;
    let edsger = ctx.find::<Employee>(3)?.expect("employee 3 exists");

    let report = GraphLoader::new().load_with_report(&mut ctx, &[edsger.clone()])?;

    let alan = manager_of(&edsger)?.expect("Alan loaded");
    let grace = manager_of(&alan)?.expect("Grace loaded");
    assert!(manager_of(&grace)?.is_none());

    let grace_reports = reports_of(&grace)?;
    assert_eq!(grace_reports.len(), 1);
    assert!(grace_reports[0].ptr_eq(&alan));
    assert!(reports_of(&alan)?[0].ptr_eq(&edsger));
    assert!(reports_of(&edsger)?.is_empty());

    assert_eq!(report.entities_visited, 3);
    assert!(report.revisits_skipped > 0);
    Ok(())
}

#[test]
fn test_mutual_references_terminate() -> Result<()> {
    let mut ctx = org_context()?;
    let barbara = ctx.find::<Employee>(4)?.expect("employee 4 exists");

    let report = GraphLoader::new().load_with_report(&mut ctx, &[barbara.clone()])?;

    let john = manager_of(&barbara)?.expect("John loaded");
    assert!(manager_of(&john)?.expect("Barbara loaded").ptr_eq(&barbara));
    assert!(reports_of(&barbara)?[0].ptr_eq(&john));
    assert_eq!(report.entities_visited, 2);
    assert_eq!(report.total_loads(), 4);
    Ok(())
}

#[test]
fn test_loaded_flags_end_the_walk_without_cycle_guard() -> Result<()> {
    let mut ctx = org_context()?;
    let barbara = ctx.find::<Employee>(4)?.expect("employee 4 exists");
    let loader = GraphLoader::with_config(LoaderConfig::new().cycle_guard(false))
        .with_cache(Arc::new(RelationshipCache::new()));

    let report = loader.load_with_report(&mut ctx, &[barbara.clone()])?;

    assert_eq!(report.revisits_skipped, 0);
    assert_eq!(report.total_loads(), 4);
    assert!(report.entities_visited > 2);
    assert!(manager_of(&barbara)?.is_some());
    Ok(())
}

#[test]
fn test_depth_limit_applies_below_roots() {
    let mut ctx = org_context().expect("fixture");
    let edsger = ctx.find::<Employee>(3).expect("query").expect("employee 3 exists");
    let loader = GraphLoader::with_config(LoaderConfig::new().max_depth(1));

    let res = loader.load(&mut ctx, Some(edsger));

    assert!(matches!(
        res,
        Err(graph_hydrate::GraphError::DepthLimitExceeded(1))
    ));
}

#[test]
fn test_revisits_do_not_count_against_depth_limit() -> Result<()> {
    let mut ctx = org_context()?;
    let barbara = ctx.find::<Employee>(4)?.expect("employee 4 exists");
    let loader = GraphLoader::with_config(LoaderConfig::new().max_depth(1));

    let report = loader.load_with_report(&mut ctx, &[barbara.clone()])?;

    let john = manager_of(&barbara)?.expect("John loaded");
    assert!(manager_of(&john)?.is_some_and(|m| m.ptr_eq(&barbara)));
    assert_eq!(report.entities_visited, 2);
    assert!(report.revisits_skipped > 0);
    Ok(())
}
