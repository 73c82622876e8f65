use chrono::Local;
use filetime::FileTime;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

use purgetools::error::TimeAttr;
use purgetools::purge::{self, PurgeOutcome, PurgeRules, PurgeTally, PurgeTarget};
use purgetools::{users, Error};

const DAY: u64 = 24 * 60 * 60;

/// Create `name` in `dir` with atime and mtime `days` ago.
fn aged_file(dir: &Path, name: &str, days: u64) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"payload").unwrap();
    let when = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(days * DAY));
    filetime::set_file_times(&path, when, when).unwrap();
    path
}

/// ctime can't be back-dated, so most rules skip it.
fn purge_rules(days: u32) -> PurgeRules {
    PurgeRules::new(Some(days), true, None)
        .unwrap()
        .with_ctime_check(false)
}

fn stage_rules(days: u32, stage: &Path) -> PurgeRules {
    PurgeRules::new(Some(days), false, Some(stage.to_path_buf()))
        .unwrap()
        .with_ctime_check(false)
}

#[test]
fn test_aged_file_is_purged() {
    let tmp = tempdir().unwrap();
    let path = aged_file(tmp.path(), "75day-file.txt", 75);

    let outcome = PurgeTarget::open(&path)
        .unwrap()
        .apply(&purge_rules(60), false)
        .unwrap();
    assert_eq!(outcome, PurgeOutcome::Purged { dry_run: false });
    assert!(!path.exists());
}

#[test]
fn test_under_age_file_is_untouched() {
    let tmp = tempdir().unwrap();
    let path = aged_file(tmp.path(), "75day-file.txt", 75);

    let err = PurgeTarget::open(&path)
        .unwrap()
        .apply(&purge_rules(80), false)
        .unwrap_err();
    assert!(err.is_under_age());
    match &err {
        Error::UnderAge {
            path: p,
            attribute,
            today,
            ..
        } => {
            assert_eq!(p, &path);
            assert_eq!(*attribute, TimeAttr::Atime);
            assert_eq!(*today, Local::now().date_naive());
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().starts_with("st_atime: "));
    assert!(path.is_file());
}

#[test]
fn test_fresh_ctime_blocks_when_checked() {
    let tmp = tempdir().unwrap();
    let path = aged_file(tmp.path(), "old.txt", 75);

    let rules = PurgeRules::new(Some(60), true, None).unwrap();
    let err = PurgeTarget::open(&path)
        .unwrap()
        .apply(&rules, false)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UnderAge {
            attribute: TimeAttr::Ctime,
            ..
        }
    ));
    assert!(path.is_file());
}

#[test]
fn test_recent_mtime_blocks() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("mtime.txt");
    fs::write(&path, b"x").unwrap();
    let old = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(90 * DAY));
    let new = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(DAY));
    filetime::set_file_times(&path, old, new).unwrap();

    let err = PurgeTarget::open(&path)
        .unwrap()
        .apply(&purge_rules(60), false)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UnderAge {
            attribute: TimeAttr::Mtime,
            ..
        }
    ));
}

#[test]
fn test_stage_mirrors_path() {
    let tmp = tempdir().unwrap();
    let stage = tempdir().unwrap();
    let nested = tmp.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();
    let path = aged_file(&nested, "c.txt", 75);

    let outcome = PurgeTarget::open(&path)
        .unwrap()
        .apply(&stage_rules(60, stage.path()), false)
        .unwrap();

    let expected = stage.path().join(path.strip_prefix("/").unwrap());
    assert_eq!(
        outcome,
        PurgeOutcome::Staged {
            destination: expected.clone(),
            dry_run: false
        }
    );
    assert!(!path.exists());
    assert_eq!(fs::read(&expected).unwrap(), b"payload");
}

#[test]
fn test_stage_is_not_idempotent() {
    let tmp = tempdir().unwrap();
    let stage = tempdir().unwrap();
    let path = aged_file(tmp.path(), "once.txt", 75);
    let rules = stage_rules(60, stage.path());

    PurgeTarget::open(&path).unwrap().apply(&rules, false).unwrap();

    let err = PurgeTarget::open(&path).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
    assert!(err.is_not_found());
}

#[test]
fn test_dry_run_changes_nothing() {
    let tmp = tempdir().unwrap();
    let stage = tempdir().unwrap();
    let path = aged_file(tmp.path(), "keep.txt", 75);
    let target = PurgeTarget::open(&path).unwrap();

    let staged = target.apply(&stage_rules(60, stage.path()), true).unwrap();
    assert!(matches!(staged, PurgeOutcome::Staged { dry_run: true, .. }));
    let purged = target.apply(&purge_rules(60), true).unwrap();
    assert_eq!(purged, PurgeOutcome::Purged { dry_run: true });

    assert_eq!(fs::read(&path).unwrap(), b"payload");
    assert_eq!(fs::read_dir(stage.path()).unwrap().count(), 0);
}

#[test]
fn test_exempt_owner_is_skipped() {
    let Some(me) = users::username_for_uid(users::current_uid()) else {
        return;
    };
    let tmp = tempdir().unwrap();
    let path = aged_file(tmp.path(), "mine.txt", 75);

    let rules = purge_rules(60).with_users_ignore(vec![me.clone()]);
    let outcome = PurgeTarget::open(&path).unwrap().apply(&rules, false).unwrap();
    assert_eq!(outcome, PurgeOutcome::Exempt { user: me });
    assert!(path.is_file());

    let rules = purge_rules(60).with_users_ignore(vec!["notarealuser".to_string()]);
    let outcome = PurgeTarget::open(&path).unwrap().apply(&rules, false).unwrap();
    assert_eq!(outcome, PurgeOutcome::Purged { dry_run: false });
    assert!(!path.exists());
}

#[test]
fn test_missing_or_non_regular_file() {
    let err = PurgeTarget::open("/garbage/path/file.txt").unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));

    let tmp = tempdir().unwrap();
    let err = PurgeTarget::open(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}

#[test]
fn test_purge_list_tallies_outcomes() {
    let tmp = tempdir().unwrap();
    let old = aged_file(tmp.path(), "old.txt", 75);
    let fresh = aged_file(tmp.path(), "fresh.txt", 1);
    let gone = tmp.path().join("gone.txt");

    let line = |p: &Path| {
        format!(
            "-rw-r--r-- amy grp 1.000 KB Jan 2 2020 10:00 {}\n",
            p.display()
        )
    };
    let list = tmp.path().join("s1-amy.purge.txt");
    fs::write(
        &list,
        line(&old) + &line(&fresh) + &line(&gone) + "-rw-r--r-- amy grp no path here\n",
    )
    .unwrap();

    let tally = purge::purge_list(&list, &purge_rules(60), false).unwrap();
    assert_eq!(
        tally,
        PurgeTally {
            purged: 1,
            under_age: 1,
            missing: 1,
            failed: 1,
            ..PurgeTally::default()
        }
    );
    assert_eq!(tally.total(), 4);
    assert!(!old.exists());
    assert!(fresh.exists());
}

#[test]
fn test_purge_list_non_utf8_path() {
    let tmp = tempdir().unwrap();
    let path = aged_file(tmp.path(), "placeholder", 75);
    let odd = tmp.path().join(OsStr::from_bytes(b"caf\xe9.dat"));
    fs::rename(&path, &odd).unwrap();

    let mut content = b"-rw-r--r-- amy grp 1.000 KB Jan 2 2020 10:00 ".to_vec();
    content.extend_from_slice(odd.as_os_str().as_bytes());
    content.push(b'\n');
    let list = tmp.path().join("s2-amy.purge.txt");
    fs::write(&list, &content).unwrap();

    let tally = purge::purge_list(&list, &purge_rules(60), false).unwrap();
    assert_eq!(tally.purged, 1);
    assert_eq!(tally.failed, 0);
    assert!(!odd.exists());
}
