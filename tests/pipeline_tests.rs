use filetime::FileTime;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

use purgetools::config::ScanConfig;
use purgetools::merge::{self, EvictionKind, UserSort};
use purgetools::notify::{self, Notifier};
use purgetools::purge::{self, PurgeRules};
use purgetools::scanner::{self, ScanOrchestrator, ScanParams};
use purgetools::{users, SilentReporter};

/// Indexing tool stand-in: one record per regular file under the unit, owned by
/// the first part of the file name ("amy_1.dat" belongs to amy).
const FAKE_DWALK: &str = r#"#!/bin/sh
out=""; input=""; txt=""; last=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift ;;
    --input) input="$2"; shift ;;
    --text-output) txt="$2"; shift ;;
    *) last="$1" ;;
  esac
  shift
done
if [ -n "$out" ]; then
  files=$(find "$last" -type f | sort)
  if [ -n "$files" ]; then
    for f in $files; do
      owner=$(basename "$f" | cut -d_ -f1)
      echo "-rw-r--r-- $owner grp 1.000 KB Jan 2 2020 10:00 $f"
    done > "$out"
  fi
fi
if [ -n "$txt" ]; then
  sort -k2,2 -k10 "$input" > "$txt"
fi
"#;

fn age(path: &Path, days: u64) {
    let when = FileTime::from_system_time(
        SystemTime::now() - Duration::from_secs(days * 24 * 60 * 60),
    );
    filetime::set_file_times(path, when, when).unwrap();
}

#[test]
fn test_scan_merge_stage() {
    let tmp = tempdir().unwrap();
    let tool = tmp.path().join("dwalk.sh");
    fs::write(&tool, FAKE_DWALK).unwrap();
    let config = ScanConfig {
        launcher: Some(PathBuf::from("/bin/sh")),
        launcher_args: vec![tool.to_string_lossy().into_owned()],
        output_dir: tmp.path().join("out"),
        ..ScanConfig::default()
    };
    fs::create_dir_all(&config.output_dir).unwrap();

    // root/{proj1: amy, bob; proj2: bob, cid; skip: amy}
    let root = tmp.path().join("root");
    let layout = [
        ("proj1", "amy_1.dat"),
        ("proj1", "bob_1.dat"),
        ("proj2", "bob_2.dat"),
        ("proj2", "cid_1.dat"),
        ("skip", "amy_2.dat"),
    ];
    for (dir, file) in layout {
        let unit = root.join(dir);
        fs::create_dir_all(&unit).unwrap();
        let path = unit.join(file);
        fs::write(&path, file).unwrap();
        age(&path, 90);
    }

    let units = scanner::build_scan_set(&root, &["skip".to_string()], false, false).unwrap();
    assert_eq!(units.len(), 2);

    let params = ScanParams {
        scanident: "p1".to_string(),
        np: 1,
        progress: 60,
        days: 60,
        dry_run: false,
    };
    let report = ScanOrchestrator::new(&config, params, 2)
        .run(&units, &SilentReporter)
        .unwrap();
    assert_eq!(report.failed_count(), 0);

    let inputs = merge::find_scan_results(&config.output_dir, "p1").unwrap();
    assert_eq!(inputs, report.candidate_files());

    let summary = UserSort::new(&config.output_dir, "p1", 1, EvictionKind::Insertion.policy())
        .sort(&inputs)
        .unwrap();
    assert_eq!(summary.records, 4);
    assert_eq!(summary.users, 3);

    let bob = merge::ledger_path(&config.output_dir, "p1", "bob");
    let bob_lines = fs::read_to_string(&bob).unwrap();
    assert_eq!(bob_lines.lines().count(), 2);
    assert!(bob_lines.lines().all(|l| l.contains("/bob_")));

    let stage = tmp.path().join("stage");
    let rules = PurgeRules::new(Some(60), false, Some(stage.clone()))
        .unwrap()
        .with_ctime_check(false);
    let tally = purge::purge_list(&bob, &rules, false).unwrap();
    assert_eq!(tally.staged, 2);

    let staged = root.join("proj1").join("bob_1.dat");
    assert!(!staged.exists());
    assert!(stage.join(staged.strip_prefix("/").unwrap()).is_file());
    assert!(root.join("proj1").join("amy_1.dat").is_file());

    // Running the same list again finds nothing left to do.
    let again = purge::purge_list(&bob, &rules, false).unwrap();
    assert_eq!(again.missing, 2);
    assert_eq!(again.failed, 0);
}

#[test]
fn test_notifier_publishes_ledgers() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("out");
    let public = tmp.path().join("public");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&public).unwrap();

    let me = users::username_for_uid(users::current_uid())
        .unwrap_or_else(|| "nobody-here".to_string());
    for user in [me.as_str(), "zz-no-such-user"] {
        fs::write(merge::ledger_path(&source, "n1", user), format!("x {} y\n", user)).unwrap();
    }
    fs::write(source.join("n1-a.txt"), "not a ledger").unwrap();

    let notifier = Notifier::new(Some(&public), 0o640).unwrap();

    let planned = notifier.publish(&source, "n1", true).unwrap();
    assert_eq!(planned.len(), 2);
    assert_eq!(fs::read_dir(&public).unwrap().count(), 0);

    let notices = notifier.publish(&source, "n1", false).unwrap();
    let mut names: Vec<&str> = notices.iter().map(|n| n.username.as_str()).collect();
    names.sort();
    let mut expected = vec![me.as_str(), "zz-no-such-user"];
    expected.sort();
    assert_eq!(names, expected);

    for notice in &notices {
        let mode = fs::metadata(&notice.path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
        assert!(notice.path.starts_with(&public));
    }

    let csv_path = tmp.path().join("n1-notices.csv");
    notify::write_notices(&csv_path, &notices).unwrap();
    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("username,path,date\n"));
    assert_eq!(csv.lines().count(), 3);
}
