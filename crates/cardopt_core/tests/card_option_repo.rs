use cardopt_core::db::open_db_in_memory;
use cardopt_core::{
    CardOptionListQuery, CardOptionRepository, FlagChange, OwnerService, RepoError,
    SqliteCardOptionRepository, SqliteUserRepository, UserRepository,
};

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn create_and_list_card_options_for_user() {
    let conn = setup();
    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let repo = SqliteCardOptionRepository::try_new(&conn).unwrap();

    let owner = users.create_user().unwrap();
    let other = users.create_user().unwrap();
    let first = repo.create_card_option(owner.id, true).unwrap();
    let second = repo.create_card_option(owner.id, false).unwrap();
    repo.create_card_option(other.id, true).unwrap();

    let rows = repo
        .list_card_options(&CardOptionListQuery::for_user(owner.id))
        .unwrap();
    assert_eq!(rows, vec![first, second]);

    let all = repo
        .list_card_options(&CardOptionListQuery::default())
        .unwrap();
    assert_eq!(all.len(), 3);

    let loaded = repo.get_card_option(second.id).unwrap().unwrap();
    assert_eq!(loaded, second);
    assert!(repo.get_card_option(9_999).unwrap().is_none());
}

#[test]
fn users_are_listed_in_id_order() {
    let conn = setup();
    let users = SqliteUserRepository::try_new(&conn).unwrap();

    let a = users.create_user().unwrap();
    let b = users.create_user().unwrap();

    assert_eq!(users.list_users().unwrap(), vec![a, b]);
    assert_eq!(users.get_user(b.id).unwrap(), Some(b));
    assert_eq!(users.get_user(b.id + 100).unwrap(), None);
}

#[test]
fn second_default_for_same_user_is_rejected_by_storage() {
    let conn = setup();
    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let repo = SqliteCardOptionRepository::try_new(&conn).unwrap();

    let owner = users.create_user().unwrap();
    repo.create_card_option(owner.id, true).unwrap();

    let err = repo.create_card_option(owner.id, true).unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(_)), "{err}");
    assert_eq!(repo.count_defaults(owner.id).unwrap(), 1);

    // Non-default rows are not covered by the filtered index.
    repo.create_card_option(owner.id, false).unwrap();
    repo.create_card_option(owner.id, false).unwrap();
}

#[test]
fn defaults_are_scoped_per_user() {
    let conn = setup();
    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let repo = SqliteCardOptionRepository::try_new(&conn).unwrap();

    let a = users.create_user().unwrap();
    let b = users.create_user().unwrap();
    repo.create_card_option(a.id, true).unwrap();
    repo.create_card_option(b.id, true).unwrap();

    assert_eq!(repo.count_defaults(a.id).unwrap(), 1);
    assert_eq!(repo.count_defaults(b.id).unwrap(), 1);
    assert!(repo.owners_with_multiple_defaults().unwrap().is_empty());
}

#[test]
fn card_option_for_missing_user_violates_foreign_key() {
    let conn = setup();
    let repo = SqliteCardOptionRepository::try_new(&conn).unwrap();

    let err = repo.create_card_option(42, false).unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(_)), "{err}");
}

#[test]
fn deleting_user_with_card_options_is_restricted() {
    let conn = setup();
    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let service = OwnerService::new(SqliteCardOptionRepository::try_new(&conn).unwrap());

    let (owner, _) = service.seed_owner(&[true]).unwrap();
    let err = users.delete_user(owner.id).unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(_)), "{err}");

    let empty = users.create_user().unwrap();
    users.delete_user(empty.id).unwrap();
    assert!(matches!(
        users.delete_user(empty.id).unwrap_err(),
        RepoError::UserNotFound(id) if id == empty.id
    ));
}

#[test]
fn seed_with_two_defaults_leaves_no_rows() {
    let conn = setup();
    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let service = OwnerService::new(SqliteCardOptionRepository::try_new(&conn).unwrap());

    let err = service.seed_owner(&[true, true]).unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(_)), "{err}");
    assert!(users.list_users().unwrap().is_empty());
}

#[test]
fn default_option_and_audit_reflect_storage() {
    let conn = setup();
    let service = OwnerService::new(SqliteCardOptionRepository::try_new(&conn).unwrap());

    let (owner, options) = service.seed_owner(&[false, true, false]).unwrap();
    assert_eq!(service.default_option(owner.id).unwrap(), Some(options[1]));
    assert_eq!(service.card_options(owner.id).unwrap(), options);
    assert!(service.audit_defaults().unwrap().is_empty());

    let (bare, _) = service.seed_owner(&[]).unwrap();
    assert_eq!(service.default_option(bare.id).unwrap(), None);
}

#[test]
fn flag_changes_apply_atomically() {
    let conn = setup();
    let service = OwnerService::new(SqliteCardOptionRepository::try_new(&conn).unwrap());
    let repo = SqliteCardOptionRepository::try_new(&conn).unwrap();
    let (owner, options) = service.seed_owner(&[true, false]).unwrap();

    let changes = [
        FlagChange::set(&options[0], false),
        FlagChange::set(&options[1], true),
    ];
    assert_eq!(repo.apply_flag_changes(&changes).unwrap(), 2);

    let rows = service.card_options(owner.id).unwrap();
    assert!(!rows[0].is_default);
    assert!(rows[1].is_default);
    assert_eq!(repo.apply_flag_changes(&[]).unwrap(), 0);
}

#[test]
fn setting_new_default_before_clearing_old_rolls_back() {
    let conn = setup();
    let service = OwnerService::new(SqliteCardOptionRepository::try_new(&conn).unwrap());
    let repo = SqliteCardOptionRepository::try_new(&conn).unwrap();
    let (owner, options) = service.seed_owner(&[true, false]).unwrap();

    let wrong_order = [
        FlagChange::set(&options[1], true),
        FlagChange::set(&options[0], false),
    ];
    let err = repo.apply_flag_changes(&wrong_order).unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(_)), "{err}");

    assert_eq!(service.card_options(owner.id).unwrap(), options);
}

#[test]
fn stale_expected_flag_aborts_whole_change_set() {
    let conn = setup();
    let service = OwnerService::new(SqliteCardOptionRepository::try_new(&conn).unwrap());
    let repo = SqliteCardOptionRepository::try_new(&conn).unwrap();
    let (owner, options) = service.seed_owner(&[true, false, false]).unwrap();

    let changes = [
        FlagChange::set(&options[0], false),
        // Row 2 is stored as non-default; claiming it was default is stale.
        FlagChange::set(&options[2].with_default(true), false),
    ];
    let err = repo.apply_flag_changes(&changes).unwrap_err();
    assert!(matches!(
        err,
        RepoError::StaleWrite {
            card_option_id,
            expected_default: true,
        } if card_option_id == options[2].id
    ));

    // The first write was rolled back with the rest.
    assert_eq!(service.card_options(owner.id).unwrap(), options);
}

#[test]
fn flag_change_for_missing_row_is_not_found() {
    let conn = setup();
    let service = OwnerService::new(SqliteCardOptionRepository::try_new(&conn).unwrap());
    let repo = SqliteCardOptionRepository::try_new(&conn).unwrap();
    let (_, options) = service.seed_owner(&[true]).unwrap();

    let mut ghost = options[0];
    ghost.id += 1_000;
    let err = repo
        .apply_flag_changes(&[FlagChange::set(&ghost, false)])
        .unwrap_err();
    assert!(matches!(err, RepoError::CardOptionNotFound(id) if id == ghost.id));
}
