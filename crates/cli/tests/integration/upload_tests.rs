use std::sync::{Arc, Mutex};

use mockito::Matcher;
use predicates::prelude::*;
use serial_test::serial;

use crate::common::TestEnv;

const UPLOAD_PATH: &str = "/upload/storage/v1/b/factory-builds/o";

#[test]
#[serial]
fn uploads_archive_to_emulator() {
  let mut server = mockito::Server::new();
  let mock = server
    .mock("POST", UPLOAD_PATH)
    .match_query(Matcher::AllOf(vec![
      Matcher::UrlEncoded("uploadType".into(), "media".into()),
      Matcher::UrlEncoded("name".into(), "builds/alice/tensorseal-alice.zip".into()),
    ]))
    .with_status(200)
    .with_body("{}")
    .create();

  let env = TestEnv::new();

  env
    .run_cmd("alice")
    .env("BUCKET_NAME", "factory-builds")
    .env("STORAGE_EMULATOR_HOST", server.url())
    .assert()
    .success()
    .stdout(predicate::str::contains(
      "gs://factory-builds/builds/alice/tensorseal-alice.zip",
    ));

  mock.assert();
}

#[test]
#[serial]
fn upload_failure_fails_run_and_keeps_archive() {
  let sent = Arc::new(Mutex::new(Vec::new()));
  let captured = Arc::clone(&sent);

  let mut server = mockito::Server::new();
  server
    .mock("POST", UPLOAD_PATH)
    .match_query(Matcher::Any)
    .with_status(503)
    .with_body_from_request(move |request| {
      *captured.lock().unwrap() = request.body().map(|b| b.to_vec()).unwrap_or_default();
      b"quota exceeded".to_vec()
    })
    .create();

  let env = TestEnv::new();

  env
    .run_cmd("alice")
    .env("BUCKET_NAME", "factory-builds")
    .env("STORAGE_EMULATOR_HOST", server.url())
    .assert()
    .failure()
    .stdout(predicate::str::contains("[factory:publish] ✗"))
    .stdout(predicate::str::contains("quota exceeded"));

  let sent = sent.lock().unwrap();
  assert!(!sent.is_empty());
  assert_eq!(std::fs::read(env.archive("alice")).unwrap(), *sent);
}
