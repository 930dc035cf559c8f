/// End-to-end workflows against the in-memory store and local identity
/// provider: appointing leaders, signing in as them, and recovering a
/// forgotten password.
mod common;

use common::{ZoneScenario, JWT_SECRET};
use shepherd_shared::gateway::memory::MemoryEntityStore;
use shepherd_shared::gateway::{EntityKind, EntityStore, NewRecord};
use shepherd_shared::identity::local::LocalIdentityProvider;
use shepherd_shared::identity::{
    parse_recovery_fragment, IdentityProvider, ProvisionPath, ProvisionRequest,
};
use shepherd_shared::models::node::NodeRef;
use shepherd_shared::models::role::{Assignment, Role};
use shepherd_shared::models::user::CreateUser;
use shepherd_shared::session::{SessionContext, SessionError};
use std::sync::Arc;

const ADMIN_PASSWORD: &str = "Adm1n-passphrase";

struct World {
    scenario: ZoneScenario,
    store: Arc<MemoryEntityStore>,
    identity: Arc<LocalIdentityProvider>,
}

async fn world() -> World {
    let scenario = ZoneScenario::new();
    let store = Arc::new(MemoryEntityStore::with_snapshot(scenario.fixture.snapshot()));
    let identity =
        Arc::new(LocalIdentityProvider::new(JWT_SECRET).with_profile_store(store.clone()));

    let admin = identity
        .register("admin@example.org", ADMIN_PASSWORD, Role::SuperAdmin)
        .await
        .unwrap();
    store
        .create(NewRecord::User(CreateUser {
            id: admin,
            email: "admin@example.org".to_string(),
            name: "Admin".to_string(),
            phone: None,
            assignment: Assignment::SuperAdmin,
        }))
        .await
        .unwrap();

    World {
        scenario,
        store,
        identity,
    }
}

async fn sign_in(w: &World, email: &str, password: &str) -> Result<SessionContext, SessionError> {
    SessionContext::start(w.store.clone(), w.identity.clone(), email, password).await
}

fn leader(email: &str, assignment: Assignment) -> ProvisionRequest {
    ProvisionRequest {
        email: email.to_string(),
        name: email.split('@').next().unwrap_or_default().to_string(),
        phone: None,
        assignment,
    }
}

#[tokio::test]
async fn test_appointment_chain() {
    let w = world().await;
    let s = &w.scenario;

    // Super admin appoints a zone leader
    let mut admin = sign_in(&w, "admin@example.org", ADMIN_PASSWORD).await.unwrap();
    let zone_report = admin
        .provision(leader("zl@example.org", Assignment::ZoneLeader { zone_id: Some(s.zone) }))
        .await
        .unwrap();
    assert_eq!(zone_report.path, ProvisionPath::Privileged);
    assert!(zone_report.linking_succeeded);

    // The zone leader appoints an area leader in their zone
    let mut zone_leader = sign_in(&w, "zl@example.org", &zone_report.temporary_password)
        .await
        .unwrap();
    assert_eq!(zone_leader.summary(NodeRef::Zone(s.zone)).unwrap().member_count, 55);
    let area_report = zone_leader
        .provision(leader("al@example.org", Assignment::AreaLeader { area_id: Some(s.a1) }))
        .await
        .unwrap();
    assert!(area_report.linking_succeeded);

    // The area leader may only appoint cell leaders inside A1
    let mut area_leader = sign_in(&w, "al@example.org", &area_report.temporary_password)
        .await
        .unwrap();
    let outside = area_leader
        .provision(leader(
            "cl2@example.org",
            Assignment::CellLeader { cell_id: Some(s.a2_cells[0]) },
        ))
        .await;
    match outside {
        Err(SessionError::Provision(e)) => assert_eq!(
            e.to_string(),
            "Area leaders can only create cell leaders in their own area"
        ),
        other => panic!("expected a denial, got {:?}", other.map(|r| r.user_id)),
    }

    let cell_report = area_leader
        .provision(leader(
            "cl@example.org",
            Assignment::CellLeader { cell_id: Some(s.a1_cells[0]) },
        ))
        .await
        .unwrap();

    let cell_leader = sign_in(&w, "cl@example.org", &cell_report.temporary_password)
        .await
        .unwrap();
    assert!(cell_leader.can_view(NodeRef::Cell(s.a1_cells[0])));
    assert!(!cell_leader.can_view(NodeRef::Area(s.a1)));
    assert_eq!(
        cell_leader.summary(NodeRef::Cell(s.a1_cells[0])).unwrap().member_count,
        14
    );

    // Every node now names its leader
    admin.refresh().await.unwrap();
    let rows = admin.breakdown(NodeRef::Zone(s.zone)).unwrap();
    assert_eq!(rows[0].leader_name.as_deref(), Some("al"));
    assert_eq!(rows[1].leader_name, None);
}

#[tokio::test]
async fn test_client_fallback_and_partial_linking() {
    let w = world().await;
    let s = &w.scenario;
    w.identity.set_privileged_enabled(false);
    w.store.reject_writes_to(EntityKind::Area).await;

    let mut admin = sign_in(&w, "admin@example.org", ADMIN_PASSWORD).await.unwrap();
    let report = admin
        .provision(leader("al@example.org", Assignment::AreaLeader { area_id: Some(s.a2) }))
        .await
        .unwrap();

    assert_eq!(report.path, ProvisionPath::Client);
    assert!(report.primary_succeeded);
    assert!(!report.linking_succeeded);
    assert!(report.failure_reason.is_some());

    // The account works, but the unlinked leader sees nothing yet
    let area_leader = sign_in(&w, "al@example.org", &report.temporary_password)
        .await
        .unwrap();
    assert_eq!(
        *area_leader.assignment(),
        Assignment::AreaLeader { area_id: None }
    );
    assert!(!area_leader.can_view(NodeRef::Area(s.a2)));
}

#[tokio::test]
async fn test_password_recovery() {
    let w = world().await;

    w.identity
        .request_password_reset("admin@example.org")
        .await
        .unwrap();
    let mail = w.identity.recovery_outbox().await.pop().unwrap();
    let tokens = parse_recovery_fragment(&mail.link).unwrap();

    w.identity
        .complete_recovery(&tokens, "Fresh-passw0rd")
        .await
        .unwrap();

    assert!(sign_in(&w, "admin@example.org", ADMIN_PASSWORD).await.is_err());
    let session = sign_in(&w, "admin@example.org", "Fresh-passw0rd")
        .await
        .unwrap();
    session.end().await.unwrap();
}
