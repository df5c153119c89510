use std::sync::Arc;

use rolegate::*;
use tempfile::TempDir;

fn stored_session() -> StoredSession {
    let mut matrix = PermissionMatrix::new();
    matrix.insert(HrModule::Payroll, ActionSet::ALL);
    StoredSession {
        session: Some(Session {
            token: "abc".to_string(),
            user_id: UserId(42),
            is_client_admin: false,
            role_id: Some(3),
            role_name: Some("Payroll Clerk".to_string()),
        }),
        matrix,
    }
}

#[test]
fn missing_file_loads_nothing() {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::new(dir.path().join("session.json"));
    assert_eq!(backend.load().unwrap(), None);
    // clearing twice is fine
    backend.clear().unwrap();
    backend.clear().unwrap();
}

#[test]
fn state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let store = PermissionStore::new(Arc::new(FileBackend::new(&path)));
    store.update(stored_session()).unwrap();
    assert!(path.exists());

    let restarted = PermissionStore::new(Arc::new(FileBackend::new(&path)));
    let restored = restarted.init().unwrap();
    assert_eq!(*restored, stored_session());
    assert!(restored.matrix.allows("payroll", Action::Delete));

    restarted.clear().unwrap();
    assert!(!path.exists());
    assert!(!restarted.snapshot().is_authenticated());
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let backend = FileBackend::new(&path);
    assert!(matches!(backend.load(), Err(StoreError::Serialize(_))));
}

#[tokio::test]
async fn corrupt_file_starts_unauthenticated() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("session.json");
    std::fs::write(&state_path, b"[1, 2, 3]").unwrap();

    let config = GateConfig {
        api: ApiConfig::new("http://127.0.0.1:9"),
        state_path: state_path.clone(),
    };
    let lifecycle = SessionLifecycle::from_config(&config).unwrap();

    let outcome = lifecycle.init().await;
    assert!(!outcome.is_authenticated());
    assert!(!state_path.exists());
}

#[test]
fn config_loads_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rolegate.yaml");
    std::fs::write(
        &path,
        "api:\n  base_url: http://hr.internal\n  permissions_path: v2/permissions\nstate_path: state/session.json\n",
    )
    .unwrap();

    let config = load_config_from_path(&path).unwrap();
    assert_eq!(config.api.permissions_path, "v2/permissions");
    assert_eq!(config.api.logout_path, "auth/logout");
    assert!(matches!(
        load_config_from_path(dir.path().join("missing.yaml")),
        Err(ConfigError::Io(_))
    ));
}

#[tokio::test]
async fn state_file_stays_gone_after_logout() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("session.json");
    FileBackend::new(&state_path).save(&stored_session()).unwrap();

    let mut api = ApiConfig::new("http://127.0.0.1:9");
    api.connect_timeout = "1s".to_string();
    api.request_timeout = "1s".to_string();
    let lifecycle = SessionLifecycle::from_config(&GateConfig {
        api,
        state_path: state_path.clone(),
    })
    .unwrap();
    let gate = AuthorizationGate::new(&lifecycle);

    if let InitOutcome::Restored { hydration } = lifecycle.init().await {
        hydration.await.unwrap();
    }
    // nothing listens on the port: hydration failed, the persisted matrix stays
    assert!(lifecycle.state().can(HrModule::Payroll, Action::View));

    lifecycle.logout().await;
    assert!(!state_path.exists());

    let decision = gate.check(HrModule::Payroll, Action::View).await;
    assert!(!decision.is_allowed());
    assert!(!state_path.exists());
}
