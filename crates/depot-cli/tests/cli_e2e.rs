//! End-to-end tests for the depot CLI against loopback repository servers.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;
use tiny_http::{Response, Server, StatusCode};

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, content).expect("write");
}

fn create_project(root: &Path) {
    write_file(
        &root.join("composer.json"),
        r#"{"name": "acme/demo", "description": "demo package"}"#,
    );
    write_file(&root.join("src/main.php"), "<?php\n");
}

fn write_config(root: &Path, cache_dir: &Path, urls: &[&str]) {
    let mut content = format!("[cache]\ndir = \"{}\"\n\n[http]\ntimeout_secs = 5\n", cache_dir.display());
    for url in urls {
        content.push_str(&format!("\n[[repositories]]\nurl = \"{url}\"\n"));
    }
    write_file(&root.join(".depot.toml"), &content);
}

fn zip_files(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    fs::read_dir(dir)
        .expect("read cache dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".zip"))
        .collect()
}

/// Loopback server answering `/check` and the upload path with fixed
/// statuses until shut down, recording every request it sees.
struct FakeRepo {
    base_url: String,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeRepo {
    fn spawn(check_status: u16, upload_status: u16) -> Self {
        let server = Server::http("127.0.0.1:0").expect("server");
        let base_url = format!("http://{}", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let seen = Arc::clone(&requests);
        let stopped = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !stopped.load(Ordering::SeqCst) {
                match server.try_recv() {
                    Ok(Some(req)) => {
                        let status = if req.url() == "/check" {
                            check_status
                        } else {
                            upload_status
                        };
                        seen.lock()
                            .expect("lock")
                            .push((req.method().to_string(), req.url().to_string()));
                        let resp = Response::from_string("").with_status_code(StatusCode(status));
                        let _ = req.respond(resp);
                    }
                    Ok(None) => thread::sleep(Duration::from_millis(5)),
                    Err(_) => break,
                }
            }
        });

        Self {
            base_url,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    fn shutdown(mut self) -> Vec<(String, String)> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().expect("join server");
        }
        let requests = self.requests.lock().expect("lock");
        requests.clone()
    }
}

fn depot_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("depot"))
}

#[test]
fn publish_succeeds_end_to_end() {
    let td = tempdir().expect("tempdir");
    let cache = td.path().join("cache");
    let repo = FakeRepo::spawn(200, 200);
    create_project(td.path());
    write_config(td.path(), &cache, &[&repo.base_url]);

    depot_cmd()
        .current_dir(td.path())
        .args(["publish", "--bump", "1.2.3"])
        .assert()
        .success()
        .stderr(contains("Successfully upload package ver.1.2.3"));

    assert!(zip_files(&cache).is_empty(), "artifact must be cleaned up");

    let requests = repo.shutdown();
    assert!(requests.contains(&("HEAD".to_string(), "/check".to_string())));
    assert!(requests.contains(&("POST".to_string(), "/package/upload/composer".to_string())));
}

#[test]
fn publish_prompts_for_version_when_bump_is_omitted() {
    let td = tempdir().expect("tempdir");
    let cache = td.path().join("cache");
    let repo = FakeRepo::spawn(200, 200);
    create_project(td.path());
    write_config(td.path(), &cache, &[&repo.base_url]);

    depot_cmd()
        .current_dir(td.path())
        .arg("publish")
        .write_stdin("2.0.0\n")
        .assert()
        .success()
        .stderr(contains("Successfully upload package ver.2.0.0"));

    repo.shutdown();
}

#[test]
fn publish_fails_without_project_marker() {
    let td = tempdir().expect("tempdir");
    let cache = td.path().join("cache");
    let repo = FakeRepo::spawn(200, 200);
    write_config(td.path(), &cache, &[&repo.base_url]);

    depot_cmd()
        .current_dir(td.path())
        .args(["publish", "--bump", "1.0.0"])
        .assert()
        .failure()
        .stderr(contains("no composer.json found"));

    assert!(repo.shutdown().is_empty(), "no request may be issued");
}

#[test]
fn publish_fails_when_no_endpoint_is_reachable() {
    let td = tempdir().expect("tempdir");
    let cache = td.path().join("cache");
    let repo = FakeRepo::spawn(500, 200);
    create_project(td.path());
    write_config(td.path(), &cache, &[&repo.base_url]);

    depot_cmd()
        .current_dir(td.path())
        .args(["publish", "--bump", "1.0.0"])
        .assert()
        .failure()
        .stderr(contains("no usable remote repository server"));

    assert!(zip_files(&cache).is_empty(), "no archive may be built");

    let requests = repo.shutdown();
    assert_eq!(requests, vec![("HEAD".to_string(), "/check".to_string())]);
}

#[test]
fn publish_reports_rejected_upload_and_cleans_up() {
    let td = tempdir().expect("tempdir");
    let cache = td.path().join("cache");
    let repo = FakeRepo::spawn(200, 500);
    create_project(td.path());
    write_config(td.path(), &cache, &[&repo.base_url]);

    depot_cmd()
        .current_dir(td.path())
        .args(["publish", "--bump", "1.0.0"])
        .assert()
        .failure()
        .stderr(contains("Fail to upload package"));

    assert!(zip_files(&cache).is_empty(), "artifact must be cleaned up");
    repo.shutdown();
}

#[test]
fn publish_selects_first_reachable_of_several() {
    let td = tempdir().expect("tempdir");
    let cache = td.path().join("cache");
    let dead = FakeRepo::spawn(503, 200);
    let live = FakeRepo::spawn(200, 200);
    create_project(td.path());
    write_config(td.path(), &cache, &[&dead.base_url, &live.base_url]);

    depot_cmd()
        .current_dir(td.path())
        .args(["publish", "--bump", "3.1.4"])
        .assert()
        .success()
        .stderr(contains("Successfully upload package ver.3.1.4"));

    let dead_requests = dead.shutdown();
    assert_eq!(dead_requests, vec![("HEAD".to_string(), "/check".to_string())]);

    let live_requests = live.shutdown();
    assert!(live_requests.contains(&("POST".to_string(), "/package/upload/composer".to_string())));
}

#[test]
fn remote_flag_overrides_configured_repositories() {
    let td = tempdir().expect("tempdir");
    let cache = td.path().join("cache");
    let live = FakeRepo::spawn(200, 200);
    create_project(td.path());
    // Configured repository is never bound; --remote must win.
    write_config(td.path(), &cache, &["http://127.0.0.1:1"]);

    depot_cmd()
        .current_dir(td.path())
        .args(["publish", "--bump", "1.0.0", "--remote", &live.base_url])
        .assert()
        .success()
        .stderr(contains("Successfully upload package ver.1.0.0"));

    let requests = live.shutdown();
    assert!(requests.contains(&("POST".to_string(), "/package/upload/composer".to_string())));
}

#[test]
fn publish_without_repositories_is_an_error() {
    let td = tempdir().expect("tempdir");
    create_project(td.path());

    depot_cmd()
        .current_dir(td.path())
        .args(["publish", "--bump", "1.0.0"])
        .assert()
        .failure()
        .stderr(contains("no repositories configured"));
}

#[test]
fn check_reports_marker_and_selected_endpoint() {
    let td = tempdir().expect("tempdir");
    let cache = td.path().join("cache");
    let repo = FakeRepo::spawn(200, 200);
    create_project(td.path());
    write_config(td.path(), &cache, &[&repo.base_url]);

    depot_cmd()
        .current_dir(td.path())
        .arg("check")
        .assert()
        .success()
        .stdout(contains("marker_present: true"))
        .stdout(contains(format!("selected: {}", repo.base_url)));

    // Check never builds or uploads anything.
    let requests = repo.shutdown();
    assert_eq!(requests, vec![("HEAD".to_string(), "/check".to_string())]);
    assert!(zip_files(&cache).is_empty());
}

#[test]
fn check_fails_without_marker() {
    let td = tempdir().expect("tempdir");
    let cache = td.path().join("cache");
    let repo = FakeRepo::spawn(200, 200);
    write_config(td.path(), &cache, &[&repo.base_url]);

    depot_cmd()
        .current_dir(td.path())
        .arg("check")
        .assert()
        .failure()
        .stdout(contains("marker_present: false"));

    repo.shutdown();
}

#[test]
fn invalid_timeout_is_rejected() {
    let td = tempdir().expect("tempdir");
    create_project(td.path());

    depot_cmd()
        .current_dir(td.path())
        .args(["--timeout", "not-a-duration", "publish", "--bump", "1.0.0"])
        .assert()
        .failure()
        .stderr(contains("invalid duration"));
}
