mod common;

use common::{contact_db, Contact};
use tombstone_core::{
    DestroyOptions, RepoError, SoftDeleteConfig, SoftDeleteOptions, TombstoneRepository,
    UniquenessCheck,
};

#[test]
fn tombstoned_row_does_not_block_a_new_active_row() {
    let conn = contact_db();
    let config = SoftDeleteConfig::default();
    let repo = TombstoneRepository::<Contact>::try_new(&conn, config.clone()).unwrap();

    let mut old = Contact::new(&config, "shared@example.com", "old");
    repo.create(&old).unwrap();
    repo.soft_delete(&mut old, &DestroyOptions::default()).unwrap();

    let fresh = Contact::new(&config, "shared@example.com", "fresh");
    UniquenessCheck::new(["email"])
        .paranoid()
        .check(&repo, &fresh)
        .unwrap();
}

#[test]
fn active_duplicate_fails_the_paranoid_check() {
    let conn = contact_db();
    let config = SoftDeleteConfig::default();
    let repo = TombstoneRepository::<Contact>::try_new(&conn, config.clone()).unwrap();

    repo.create(&Contact::new(&config, "taken@example.com", "first"))
        .unwrap();

    let duplicate = Contact::new(&config, "taken@example.com", "second");
    let err = UniquenessCheck::new(["email"])
        .paranoid()
        .check(&repo, &duplicate)
        .unwrap_err();
    match err {
        RepoError::Validation(details) => {
            assert_eq!(details.table, "contacts");
            assert_eq!(details.columns, vec!["email".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn deleted_rows_with_different_stamps_do_not_conflict() {
    let conn = contact_db();
    let config = SoftDeleteConfig::default();
    let repo = TombstoneRepository::<Contact>::try_new(&conn, config.clone()).unwrap();

    let mut first = Contact::new(&config, "twice@example.com", "first");
    repo.create(&first).unwrap();
    first.deleted_at = Some(1_000);
    repo.save(&first).unwrap();

    let mut second = Contact::new(&config, "twice@example.com", "second");
    repo.create(&second).unwrap();
    second.deleted_at = Some(2_000);
    repo.save(&second).unwrap();

    UniquenessCheck::new(["email"])
        .paranoid()
        .check(&repo, &second)
        .unwrap();
}

#[test]
fn deleted_rows_with_the_same_stamp_conflict_naming_both_columns() {
    let conn = contact_db();
    let config = SoftDeleteConfig::default();
    let repo = TombstoneRepository::<Contact>::try_new(&conn, config.clone()).unwrap();

    let mut first = Contact::new(&config, "clash@example.com", "first");
    repo.create(&first).unwrap();
    first.deleted_at = Some(5_000);
    repo.save(&first).unwrap();

    let mut second = Contact::new(&config, "clash@example.com", "second");
    repo.create(&second).unwrap();
    second.deleted_at = Some(5_000);
    repo.save(&second).unwrap();

    let err = UniquenessCheck::new(["email"])
        .paranoid()
        .check(&repo, &second)
        .unwrap_err();
    match err {
        RepoError::Validation(details) => {
            assert_eq!(
                details.columns,
                vec!["email".to_string(), "deleted_at".to_string()]
            );
            let rendered = details.to_string();
            assert!(rendered.contains("email"));
            assert!(rendered.contains("deleted_at"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn ordinary_check_counts_tombstones_as_live_rows() {
    let conn = contact_db();
    let config = SoftDeleteConfig::default();
    let repo = TombstoneRepository::<Contact>::try_new(&conn, config.clone()).unwrap();

    let mut old = Contact::new(&config, "legacy@example.com", "old");
    repo.create(&old).unwrap();
    repo.soft_delete(&mut old, &DestroyOptions::default()).unwrap();

    let fresh = Contact::new(&config, "legacy@example.com", "fresh");
    let err = UniquenessCheck::new(["email"])
        .check(&repo, &fresh)
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn ordinary_check_follows_an_enabled_default_scope() {
    let conn = contact_db();
    let config = SoftDeleteConfig::resolve(SoftDeleteOptions {
        enable_default_scope: Some(true),
        ..SoftDeleteOptions::default()
    });
    let repo = TombstoneRepository::<Contact>::try_new(&conn, config.clone()).unwrap();

    let mut old = Contact::new(&config, "hidden@example.com", "old");
    repo.create(&old).unwrap();
    repo.soft_delete(&mut old, &DestroyOptions::default()).unwrap();

    let fresh = Contact::new(&config, "hidden@example.com", "fresh");
    UniquenessCheck::new(["email"]).check(&repo, &fresh).unwrap();
}

#[test]
fn a_record_never_conflicts_with_its_own_row() {
    let conn = contact_db();
    let config = SoftDeleteConfig::default();
    let repo = TombstoneRepository::<Contact>::try_new(&conn, config.clone()).unwrap();

    let contact = Contact::new(&config, "self@example.com", "self");
    repo.create(&contact).unwrap();

    UniquenessCheck::new(["email"])
        .paranoid()
        .check(&repo, &contact)
        .unwrap();
    UniquenessCheck::new(["email"]).check(&repo, &contact).unwrap();
}

#[test]
fn narrowing_limits_the_comparison_set() {
    let conn = contact_db();
    let config = SoftDeleteConfig::default();
    let repo = TombstoneRepository::<Contact>::try_new(&conn, config.clone()).unwrap();

    repo.create(&Contact::new(&config, "dup@example.com", "tenant-a"))
        .unwrap();

    let other_tenant = Contact::new(&config, "dup@example.com", "tenant-b");
    UniquenessCheck::new(["email"])
        .paranoid()
        .also_eq("display_name", "tenant-b".to_string())
        .check(&repo, &other_tenant)
        .unwrap();

    let same_tenant = Contact::new(&config, "dup@example.com", "tenant-a");
    let err = UniquenessCheck::new(["email"])
        .paranoid()
        .also_eq("display_name", "tenant-a".to_string())
        .check(&repo, &same_tenant)
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn unmapped_column_is_rejected() {
    let conn = contact_db();
    let config = SoftDeleteConfig::default();
    let repo = TombstoneRepository::<Contact>::try_new(&conn, config.clone()).unwrap();

    let contact = Contact::new(&config, "typo@example.com", "typo");
    let err = UniquenessCheck::new(["emial"])
        .check(&repo, &contact)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::UnknownColumn { column, .. } if column == "emial"
    ));
}
