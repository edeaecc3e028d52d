use predicates::prelude::*;
use serial_test::serial;

use crate::common::{BUILD_KEY, GRADLEW_NO_OUTPUT, TestEnv, archive_entries};

#[test]
#[serial]
fn run_without_bucket_produces_archive() {
  let env = TestEnv::new();

  env
    .run_cmd("alice")
    .assert()
    .success()
    .stdout(predicate::str::contains("[factory:inject]"))
    .stdout(predicate::str::contains("[factory:build]"))
    .stdout(predicate::str::contains("[factory:package]"))
    .stdout(predicate::str::contains("skipping upload"))
    .stdout(predicate::str::contains("Factory run complete"))
    .stdout(predicate::str::contains(BUILD_KEY).not())
    .stderr(predicate::str::contains(BUILD_KEY).not());

  let entries = archive_entries(&env.archive("alice"));
  assert_eq!(
    entries.into_iter().collect::<Vec<_>>(),
    vec!["packer.py".to_string(), "tensorseal.aar".to_string()]
  );

  let header = std::fs::read_to_string(env.root().join("app/src/main/cpp/SecretKey.h")).unwrap();
  assert!(header.contains(BUILD_KEY));
}

#[test]
#[serial]
fn json_report_describes_run() {
  let env = TestEnv::new();

  let output = env.run_cmd("alice").args(["--output", "json"]).output().unwrap();

  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["user_id"], "alice");
  assert_eq!(report["state"], "done");
  assert_eq!(report["archive"]["file_name"], "tensorseal-alice.zip");
  assert!(report["remote"].is_null());
}

#[test]
#[serial]
fn json_failure_names_the_stage() {
  let env = TestEnv::with_gradlew(GRADLEW_NO_OUTPUT);

  let output = env.run_cmd("alice").args(["--output", "json"]).output().unwrap();

  assert!(!output.status.success());
  let failure: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(failure["state"], "failed");
  assert_eq!(failure["stage"], "build");
}

#[test]
#[serial]
fn build_without_library_fails_distinctly() {
  let env = TestEnv::with_gradlew(GRADLEW_NO_OUTPUT);

  env
    .run_cmd("alice")
    .assert()
    .failure()
    .stdout(predicate::str::contains("[factory:build] ✗ build reported success"))
    .stdout(predicate::str::contains("com.android.library"));

  assert!(!env.root().join("dist").exists());
}

#[test]
#[serial]
fn seal_failure_masks_key() {
  let env = TestEnv::new();
  env.write_file("tools/tensorseal.py", "exit 1\n");

  env
    .run_cmd("alice")
    .assert()
    .failure()
    .stdout(predicate::str::contains("[factory:inject] ✗ sealing tool failed"))
    .stdout(predicate::str::contains("--key ***"))
    .stdout(predicate::str::contains(BUILD_KEY).not())
    .stderr(predicate::str::contains(BUILD_KEY).not());

  assert!(!env.root().join("app/build").exists());
}

#[test]
#[serial]
fn runs_for_different_users_share_output_directory() {
  let env = TestEnv::new();

  env.run_cmd("alice").assert().success();
  env.run_cmd("bob").assert().success();

  assert!(env.archive("alice").exists());
  assert!(env.archive("bob").exists());
  assert_eq!(archive_entries(&env.archive("bob")).len(), 2);
}

#[test]
#[serial]
fn rerun_overwrites_archive() {
  let env = TestEnv::new();

  env.run_cmd("alice").assert().success();
  let first = archive_entries(&env.archive("alice"));
  env.write_file("staging_temp/stale.txt", "left over");
  env.run_cmd("alice").assert().success();

  assert_eq!(archive_entries(&env.archive("alice")), first);
}
