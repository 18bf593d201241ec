//! Tests for the restore runner
//!

use std::{collections::BTreeMap, fs, path::PathBuf};

use cacti_backup::{
    Artifact, BackupKind, BackupRunner, Compression, PollerPolicy, RestoreError, RestoreRunner,
    ServiceAction, list_artifacts,
};
use common::{
    ArchiveLayout, Call, DATABASE, Fake, TestInstall, test_install, tree_contents, write,
};
use shared::test::init_test_logger;

mod common;

const STAGING: &str = "cacti-backup-full-20261019-080503";

/// Back up the populated install, optionally compressed with `layout`, and return the artifact.
fn backed_up(install: &TestInstall, kind: BackupKind, layout: Option<ArchiveLayout>) -> Artifact {
    let staging = install.backups().join(STAGING);

    let mut fake = Fake::default();
    let mut runner = BackupRunner::new(&install.config, &mut fake);
    runner.run(kind, &staging).unwrap();

    let path = match layout {
        Some(layout) => {
            drop(runner);
            fake.layout = layout;
            BackupRunner::new(&install.config, &mut fake)
                .compress(&staging)
                .unwrap()
        }
        None => staging,
    };

    Artifact::from_path(path).unwrap()
}

fn rrd_contents(install: &TestInstall) -> BTreeMap<PathBuf, String> {
    tree_contents(&install.rra())
        .into_iter()
        .filter(|(path, _)| path.extension().is_some_and(|e| e == "rrd"))
        .collect()
}

#[test]
fn restores_every_artifact_shape_identically() {
    init_test_logger();

    for layout in [None, Some(ArchiveLayout::Wrapped), Some(ArchiveLayout::Flat)] {
        let install = test_install();
        install.populate();
        let web = tree_contents(&install.web());
        let etc = tree_contents(&install.etc());
        let rra = rrd_contents(&install);

        let artifact = backed_up(&install, BackupKind::Full, layout);
        install.wipe_live();

        let mut fake = Fake {
            database: String::new(),
            ..Fake::default()
        };
        let summary = RestoreRunner::new(&install.config, &mut fake)
            .restore(&artifact)
            .unwrap();

        assert_eq!(tree_contents(&install.web()), web, "{layout:?}");
        assert_eq!(tree_contents(&install.etc()), etc, "{layout:?}");
        assert_eq!(rrd_contents(&install), rra, "{layout:?}");
        assert_eq!(fake.database, DATABASE, "{layout:?}");
        assert!(summary.database_restored);
        assert!(summary.skipped_areas.is_empty());
    }
}

#[test]
fn archive_is_extracted_into_temporary_directory_and_removed() {
    init_test_logger();
    let install = test_install();
    install.populate();

    let artifact = backed_up(&install, BackupKind::Full, Some(ArchiveLayout::Wrapped));
    assert_eq!(artifact.compression, Compression::Compressed);

    let mut fake = Fake::default();
    RestoreRunner::new(&install.config, &mut fake)
        .restore(&artifact)
        .unwrap();

    assert_eq!(fake.calls.first(), Some(&Call::Extract(artifact.path.clone())));
    let leftovers: Vec<_> = fs::read_dir(&install.config.temporary_directory)
        .unwrap()
        .collect();
    assert!(leftovers.is_empty());
    assert!(artifact.path.is_file());
}

#[test]
fn poller_wraps_the_restore() {
    init_test_logger();
    let install = test_install();
    install.populate();
    let artifact = backed_up(&install, BackupKind::Full, None);

    let mut fake = Fake::default();
    RestoreRunner::new(&install.config, &mut fake)
        .restore(&artifact)
        .unwrap();

    assert_eq!(
        fake.calls.first(),
        Some(&Call::Service("cron".into(), ServiceAction::Stop))
    );
    assert_eq!(
        fake.calls.last(),
        Some(&Call::Service("cron".into(), ServiceAction::Start))
    );
}

#[test]
fn rrd_only_backup_leaves_other_areas_untouched() {
    init_test_logger();
    let install = test_install();
    install.populate();
    let artifact = backed_up(&install, BackupKind::RrdOnly, None);

    fs::write(install.web().join("index.php"), "changed after backup").unwrap();
    fs::write(install.rra().join("load_1min_5.rrd"), "corrupted").unwrap();

    let mut fake = Fake::default();
    let summary = RestoreRunner::new(&install.config, &mut fake)
        .restore(&artifact)
        .unwrap();

    assert_eq!(
        fs::read_to_string(install.web().join("index.php")).unwrap(),
        "changed after backup"
    );
    assert_eq!(
        fs::read_to_string(install.rra().join("load_1min_5.rrd")).unwrap(),
        "load samples"
    );
    assert_eq!(summary.skipped_areas, ["Web files", "Config files"]);
    assert!(!summary.database_restored);
    assert!(!fake.calls.iter().any(|call| matches!(call, Call::CopyTree(..))));
    assert!(!fake.calls.contains(&Call::DatabaseRestore));
}

#[test]
fn restore_overwrites_but_keeps_extra_live_files() {
    init_test_logger();
    let install = test_install();
    install.populate();
    let artifact = backed_up(&install, BackupKind::Full, None);

    fs::write(install.etc().join("config.php"), "broken").unwrap();
    fs::write(install.etc().join("local.php"), "added later").unwrap();

    let mut fake = Fake::default();
    RestoreRunner::new(&install.config, &mut fake)
        .restore(&artifact)
        .unwrap();

    assert_eq!(
        fs::read_to_string(install.etc().join("config.php")).unwrap(),
        "<?php $database_default = 'cacti';"
    );
    assert!(install.etc().join("local.php").is_file());
}

#[test]
fn failed_copy_aborts_and_restarts_poller() {
    init_test_logger();
    let install = test_install();
    install.populate();
    let artifact = backed_up(&install, BackupKind::Full, Some(ArchiveLayout::Wrapped));

    let mut fake = Fake {
        fail_copy: true,
        ..Fake::default()
    };
    let result = RestoreRunner::new(&install.config, &mut fake).restore(&artifact);

    assert!(matches!(result, Err(RestoreError::Copy { .. })), "{result:#?}");
    assert!(!fake.calls.contains(&Call::DatabaseRestore));
    assert_eq!(
        fake.calls.last(),
        Some(&Call::Service("cron".into(), ServiceAction::Start))
    );
    let leftovers: Vec<_> = fs::read_dir(&install.config.temporary_directory)
        .unwrap()
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn failed_stop_aborts_and_restarts_poller_when_fail_fast() {
    init_test_logger();
    let mut install = test_install();
    install.populate();
    install.config.poller.policy = PollerPolicy::FailFast;
    let artifact = backed_up(&install, BackupKind::Full, None);

    let mut fake = Fake {
        fail_service: Some(ServiceAction::Stop),
        ..Fake::default()
    };
    let result = RestoreRunner::new(&install.config, &mut fake).restore(&artifact);

    assert!(matches!(result, Err(RestoreError::StopPoller(_))), "{result:#?}");
    assert_eq!(
        fake.service_calls(),
        [ServiceAction::Stop, ServiceAction::Start]
    );
    assert_eq!(fake.calls.len(), 2);
}

#[test]
fn conversion_failures_fail_the_restore_after_the_rest_is_applied() {
    init_test_logger();
    let install = test_install();
    install.populate();
    let artifact = backed_up(&install, BackupKind::Full, None);
    install.wipe_live();

    let mut fake = Fake {
        fail_rrd: vec!["load_1min".into()],
        ..Fake::default()
    };
    let result = RestoreRunner::new(&install.config, &mut fake).restore(&artifact);

    match result {
        Err(RestoreError::Conversion(failures)) => assert_eq!(failures.len(), 1),
        other => panic!("Expected conversion failure: {other:#?}"),
    }
    assert!(install.rra().join("router_1/traffic_in_7.rrd").is_file());
    assert!(fake.calls.contains(&Call::DatabaseRestore));
    assert_eq!(
        fake.calls.last(),
        Some(&Call::Service("cron".into(), ServiceAction::Start))
    );
}

#[test]
fn directory_without_backup_folders_is_refused() {
    init_test_logger();
    let install = test_install();
    install.populate();
    let stray = install.backups().join("lost+found");
    fs::create_dir_all(&stray).unwrap();
    let live = tree_contents(&install.root.path().join("live"));

    let artifact = Artifact::from_path(stray.clone()).unwrap();
    let mut fake = Fake::default();
    let result = RestoreRunner::new(&install.config, &mut fake).restore(&artifact);

    assert!(
        matches!(&result, Err(RestoreError::NothingToRestore(path)) if *path == stray),
        "{result:#?}"
    );
    assert!(fake.calls.is_empty());
    assert_eq!(tree_contents(&install.root.path().join("live")), live);
}

#[test]
fn archive_of_bare_snapshots_is_refused() {
    init_test_logger();
    let install = test_install();
    install.populate();
    let archive = install.backups().join("cacti-rra-backup-20260101.tar.gz");
    write(&archive, r#"{"host_1_traffic_in_7.rrd.xml":"<rrd>traffic</rrd>"}"#);

    let artifact = Artifact::from_path(archive.clone()).unwrap();
    let mut fake = Fake::default();
    let result = RestoreRunner::new(&install.config, &mut fake).restore(&artifact);

    assert!(
        matches!(result, Err(RestoreError::NothingToRestore(_))),
        "{result:#?}"
    );
    assert_eq!(fake.calls, [Call::Extract(archive)]);
    let leftovers: Vec<_> = fs::read_dir(&install.config.temporary_directory)
        .unwrap()
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn listing_is_sorted_and_ignores_other_files() {
    init_test_logger();
    let install = test_install();
    fs::create_dir_all(install.backups().join("cacti-backup-full-20261019-080503")).unwrap();
    fs::create_dir_all(install.backups().join("cacti-backup-full-20260101-000000")).unwrap();
    fs::write(
        install.backups().join("cacti-backup-rrd-20260501-120000.tar.gz"),
        "{}",
    )
    .unwrap();
    fs::write(install.backups().join("notes.txt"), "not a backup").unwrap();

    let artifacts = list_artifacts(&install.backups()).unwrap();
    let names: Vec<_> = artifacts.iter().map(Artifact::name).collect();

    assert_eq!(
        names,
        [
            "cacti-backup-full-20260101-000000",
            "cacti-backup-full-20261019-080503",
            "cacti-backup-rrd-20260501-120000.tar.gz",
        ]
    );
    assert_eq!(
        artifacts.last().map(|artifact| (artifact.kind, artifact.compression)),
        Some((Some(BackupKind::RrdOnly), Compression::Compressed))
    );
}

#[test]
fn missing_backup_root_lists_nothing() {
    let install = test_install();

    assert!(list_artifacts(&install.backups()).unwrap().is_empty());
}
