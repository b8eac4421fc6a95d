//! Cascade delete tests: every dependent row goes with its owner, and a
//! failing step leaves the database exactly as it was.

use anyhow::Result;
use statuspage::cascade::{CascadeCoordinator, CascadeReport};
use statuspage::repositories::{IncidentRepository, RepositoryError, ServiceRepository};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{
    create_incident, create_update, fail_updates_on, live_count, live_counts,
    populated_organization, setup_test_db,
};

#[tokio::test]
async fn delete_service_removes_incidents_updates_and_maintenance() -> Result<()> {
    let db = setup_test_db().await?;
    let fx = populated_organization(&db, "org_acme", "acme").await?;
    let second = create_incident(&db, &fx.org, &fx.service, "Latency").await?;
    create_update(&db, &fx.org, &second, "Monitoring").await?;

    let report = CascadeCoordinator::new(&db)
        .delete_service(fx.org.id, fx.service.id)
        .await?;

    assert_eq!(
        report,
        CascadeReport {
            incident_updates: 2,
            incidents: 2,
            maintenances: 1,
            services: 1,
            members: 0,
        }
    );
    assert_eq!(live_count(&db, "services").await?, 0);
    assert_eq!(live_count(&db, "incidents").await?, 0);
    assert_eq!(live_count(&db, "incident_updates").await?, 0);
    assert_eq!(live_count(&db, "maintenances").await?, 0);
    assert_eq!(live_count(&db, "organization_members").await?, 1);
    assert_eq!(live_count(&db, "organizations").await?, 1);

    let incidents = IncidentRepository::new(&db).list(fx.org.id, None).await?;
    assert!(incidents.is_empty());
    Ok(())
}

#[tokio::test]
async fn delete_service_leaves_other_services_alone() -> Result<()> {
    let db = setup_test_db().await?;
    let fx = populated_organization(&db, "org_acme", "acme").await?;
    let other = test_utils::create_service(&db, &fx.org, "Web", "operational").await?;
    let kept = create_incident(&db, &fx.org, &other, "Unrelated").await?;

    CascadeCoordinator::new(&db)
        .delete_service(fx.org.id, fx.service.id)
        .await?;

    let services = ServiceRepository::new(&db).list(fx.org.id).await?;
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].id, other.id);

    let incidents = IncidentRepository::new(&db).list(fx.org.id, None).await?;
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].id, kept.id);
    Ok(())
}

#[tokio::test]
async fn delete_incident_removes_its_updates_only() -> Result<()> {
    let db = setup_test_db().await?;
    let fx = populated_organization(&db, "org_acme", "acme").await?;
    let other = create_incident(&db, &fx.org, &fx.service, "Latency").await?;
    create_update(&db, &fx.org, &other, "Monitoring").await?;

    let report = CascadeCoordinator::new(&db)
        .delete_incident(fx.org.id, fx.service.id, fx.incident.id)
        .await?;

    assert_eq!(report.incidents, 1);
    assert_eq!(report.incident_updates, 1);
    assert_eq!(live_count(&db, "incidents").await?, 1);
    assert_eq!(live_count(&db, "incident_updates").await?, 1);
    assert_eq!(live_count(&db, "services").await?, 1);
    Ok(())
}

#[tokio::test]
async fn delete_organization_removes_everything_it_owns() -> Result<()> {
    let db = setup_test_db().await?;
    let fx = populated_organization(&db, "org_acme", "acme").await?;
    populated_organization(&db, "org_globex", "globex").await?;

    let report = CascadeCoordinator::new(&db)
        .delete_organization(fx.org.id)
        .await?;

    assert_eq!(
        report,
        CascadeReport {
            incident_updates: 1,
            incidents: 1,
            maintenances: 1,
            services: 1,
            members: 1,
        }
    );
    // The other tenant still has one live row per table.
    assert_eq!(live_counts(&db).await?, vec![1, 1, 1, 1, 1, 1]);
    Ok(())
}

#[tokio::test]
async fn cascade_on_foreign_service_is_not_found() -> Result<()> {
    let db = setup_test_db().await?;
    let acme = populated_organization(&db, "org_acme", "acme").await?;
    let globex = populated_organization(&db, "org_globex", "globex").await?;
    let before = live_counts(&db).await?;

    let err = CascadeCoordinator::new(&db)
        .delete_service(globex.org.id, acme.service.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));

    let err = CascadeCoordinator::new(&db)
        .delete_incident(globex.org.id, globex.service.id, acme.incident.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));

    assert_eq!(live_counts(&db).await?, before);
    Ok(())
}

#[tokio::test]
async fn deleting_twice_is_not_found() -> Result<()> {
    let db = setup_test_db().await?;
    let fx = populated_organization(&db, "org_acme", "acme").await?;
    let cascade = CascadeCoordinator::new(&db);

    cascade.delete_organization(fx.org.id).await?;
    let err = cascade.delete_organization(fx.org.id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn failing_service_cascade_step_rolls_back_earlier_steps() -> Result<()> {
    for table in ["incident_updates", "incidents", "maintenances", "services"] {
        let db = setup_test_db().await?;
        let fx = populated_organization(&db, "org_acme", "acme").await?;
        let before = live_counts(&db).await?;
        fail_updates_on(&db, table).await?;

        let err = CascadeCoordinator::new(&db)
            .delete_service(fx.org.id, fx.service.id)
            .await
            .unwrap_err();

        assert!(
            matches!(err, RepositoryError::Transaction(_)),
            "failure on {table} should surface as a rolled back transaction, got {err:?}"
        );
        assert_eq!(live_counts(&db).await?, before, "failure on {table}");
    }
    Ok(())
}

#[tokio::test]
async fn failing_incident_cascade_step_rolls_back_earlier_steps() -> Result<()> {
    for table in ["incident_updates", "incidents"] {
        let db = setup_test_db().await?;
        let fx = populated_organization(&db, "org_acme", "acme").await?;
        let before = live_counts(&db).await?;
        fail_updates_on(&db, table).await?;

        let err = CascadeCoordinator::new(&db)
            .delete_incident(fx.org.id, fx.service.id, fx.incident.id)
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Transaction(_)), "{table}");
        assert_eq!(live_counts(&db).await?, before, "failure on {table}");
    }
    Ok(())
}

#[tokio::test]
async fn failing_organization_cascade_step_rolls_back_earlier_steps() -> Result<()> {
    for table in test_utils::SOFT_DELETE_TABLES {
        let db = setup_test_db().await?;
        let fx = populated_organization(&db, "org_acme", "acme").await?;
        let before = live_counts(&db).await?;
        fail_updates_on(&db, table).await?;

        let err = CascadeCoordinator::new(&db)
            .delete_organization(fx.org.id)
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Transaction(_)), "{table}");
        assert_eq!(live_counts(&db).await?, before, "failure on {table}");
    }
    Ok(())
}
