use cardopt_core::db::{open_store, recreate_schema};
use cardopt_core::{
    DefaultSwitchService, OwnerService, SqliteCardOptionRepository, StoreConfig, StoreTarget,
};

#[test]
fn connection_string_opens_file_store_that_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cards.db");
    let config = StoreConfig::from_connection_string(&format!(
        "Data Source={};Verbose SQL=true",
        path.display()
    ))
    .unwrap();
    assert_eq!(config.target, StoreTarget::File(path.clone()));

    let user_id = {
        let conn = open_store(&config).unwrap();
        let service = OwnerService::new(SqliteCardOptionRepository::try_new(&conn).unwrap());
        let (user, _) = service.seed_owner(&[true, false]).unwrap();
        DefaultSwitchService::new(SqliteCardOptionRepository::try_new(&conn).unwrap())
            .switch_default(user.id)
            .unwrap();
        user.id
    };

    let conn = open_store(&StoreConfig::file(&path)).unwrap();
    let service = OwnerService::new(SqliteCardOptionRepository::try_new(&conn).unwrap());
    let flags = service
        .card_options(user_id)
        .unwrap()
        .iter()
        .map(|option| option.is_default)
        .collect::<Vec<_>>();
    assert_eq!(flags, vec![false, true]);
}

#[test]
fn in_memory_stores_are_private_per_connection() {
    let config = StoreConfig::in_memory();

    let first = open_store(&config).unwrap();
    OwnerService::new(SqliteCardOptionRepository::try_new(&first).unwrap())
        .seed_owner(&[true])
        .unwrap();

    let second = open_store(&config).unwrap();
    let audit_rows = second
        .query_row("SELECT COUNT(*) FROM CardOption;", [], |row| row.get::<_, i64>(0))
        .unwrap();
    assert_eq!(audit_rows, 0);
}

#[test]
fn json_config_drives_fixture_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.db");
    let json = serde_json::json!({
        "target": { "file": path },
        "verbose_sql": false,
    });
    let config: StoreConfig = serde_json::from_value(json).unwrap();

    let mut conn = open_store(&config).unwrap();
    OwnerService::new(SqliteCardOptionRepository::try_new(&conn).unwrap())
        .seed_owner(&[true, false])
        .unwrap();

    recreate_schema(&mut conn).unwrap();
    let users = conn
        .query_row("SELECT COUNT(*) FROM User;", [], |row| row.get::<_, i64>(0))
        .unwrap();
    assert_eq!(users, 0);
}
