//! End-to-end deploy scenarios against a simulated servlet container.
//!
//! The container is a thread that watches the auto-deploy and published
//! directories and appends the lifecycle lines a real server would log.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hotdrop_deploy::{
    Awaited, DependencyDiffer, DeployError, DeployLocationCache, DeployOrchestrator, DeploySignal,
    DeployState, DeployTargets, LibraryStatus, LogSignal, ReloadNotifier, ReloadScope, SignalAction, SignalKind,
};
use pretty_assertions::assert_eq;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[derive(Default)]
struct RecordingNotifier {
    scopes: Mutex<Vec<ReloadScope>>,
}

impl ReloadNotifier for RecordingNotifier {
    fn reload(&self, scope: ReloadScope) {
        self.scopes.lock().unwrap().push(scope);
    }
}

struct Server {
    _dir: tempfile::TempDir,
    drop_dir: PathBuf,
    staged: PathBuf,
    published: PathBuf,
    deploy_dir: PathBuf,
    log: PathBuf,
}

impl Server {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let server = Self {
            drop_dir: root.join("hotdrop"),
            staged: root.join("tomcat/temp"),
            published: root.join("tomcat/webapps"),
            deploy_dir: root.join("deploy"),
            log: root.join("tomcat/logs/catalina.out"),
            _dir: dir,
        };
        for dir in [&server.drop_dir, &server.staged, &server.published, &server.deploy_dir] {
            fs::create_dir_all(dir).unwrap();
        }
        fs::create_dir_all(server.log.parent().unwrap()).unwrap();
        fs::write(&server.log, "INFO: Server startup in 4242 ms\n").unwrap();
        server
    }

    fn artifact(&self, file_name: &str, libs: &[(&str, &[u8])]) -> PathBuf {
        let path = self.drop_dir.join(file_name);
        let mut zip = ZipWriter::new(fs::File::create(&path).unwrap());
        zip.start_file("WEB-INF/portlet.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<portlet-app><portlet><portlet-name>orders</portlet-name></portlet></portlet-app>")
            .unwrap();
        for (name, content) in libs {
            zip.start_file(format!("WEB-INF/lib/{name}"), SimpleFileOptions::default())
                .unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    fn publish(&self, name: &str, libs: &[(&str, &[u8])]) {
        let lib_dir = self.published.join(name).join("WEB-INF/lib");
        fs::create_dir_all(&lib_dir).unwrap();
        for (lib, content) in libs {
            fs::write(lib_dir.join(lib), content).unwrap();
        }
    }

    fn orchestrator(
        &self,
        signal: Arc<dyn DeploySignal>,
        notifier: Arc<RecordingNotifier>,
    ) -> (Arc<DeployOrchestrator>, Arc<DeployLocationCache>) {
        let locations = Arc::new(DeployLocationCache::new(
            self.staged.clone(),
            self.published.clone(),
        ));
        locations.rescan();
        let orchestrator = DeployOrchestrator::new(
            Arc::clone(&locations),
            DependencyDiffer::default(),
            signal,
            notifier,
            DeployTargets {
                published_dir: self.published.clone(),
                auto_deploy_dir: self.deploy_dir.clone(),
            },
        );
        (Arc::new(orchestrator), locations)
    }

    fn log_signal(&self, timeout: Duration) -> Arc<LogSignal> {
        Arc::new(LogSignal::new(
            self.log.clone(),
            r"for {name} \w+ unregistered",
            r"for {name} \w+ available for use",
            timeout,
            Duration::from_millis(10),
        ))
    }

    /// Simulate the container: log undeploys and pick up artifacts.
    fn simulate(&self, name: &str, logs_undeploy: bool) -> Simulation {
        let stop = Arc::new(AtomicBool::new(false));
        let published = self.published.join(name);
        let deploy_dir = self.deploy_dir.clone();
        let log = self.log.clone();
        let name = name.to_owned();
        let flag = Arc::clone(&stop);
        let was_published = published.exists();

        let handle = std::thread::spawn(move || {
            let mut unregistered = false;
            let deadline = Instant::now() + Duration::from_secs(10);
            while !flag.load(Ordering::SeqCst) && Instant::now() < deadline {
                if logs_undeploy && was_published && !unregistered && !published.exists() {
                    append(&log, &format!("INFO: 1 portlet for {name} was unregistered\n"));
                    unregistered = true;
                }
                let picked_up: Vec<PathBuf> = fs::read_dir(&deploy_dir)
                    .unwrap()
                    .flatten()
                    .map(|e| e.path())
                    .collect();
                for artifact in picked_up {
                    fs::remove_file(&artifact).unwrap();
                    append(&log, "INFO: Deploying from hot deploy directory\n");
                    append(&log, &format!("INFO: 1 portlet for {name} is available for use\n"));
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        });

        Simulation {
            stop,
            handle: Some(handle),
        }
    }
}

struct Simulation {
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

#[test]
fn first_deploy_publishes_without_undeploy() {
    let server = Server::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _) = server.orchestrator(server.log_signal(Duration::from_secs(5)), Arc::clone(&notifier));
    let artifact = server.artifact("orders-1.2.0.war", &[("shared.jar", b"v1")]);
    let _sim = server.simulate("orders", true);

    let outcome = orchestrator.run(&artifact);

    assert_eq!(
        outcome.transitions,
        vec![
            DeployState::Arrived,
            DeployState::DiffChecked,
            DeployState::Publishing,
            DeployState::Published,
            DeployState::Notified,
        ]
    );
    assert_eq!(outcome.task.logical_name, "orders");
    assert!(outcome.task.current_location.is_none());
    assert!(outcome.diff.is_none());
    assert!(!artifact.exists());
    assert_eq!(*notifier.scopes.lock().unwrap(), vec![ReloadScope::All]);
}

#[test]
fn outdated_library_undeploys_first() {
    let server = Server::new();
    server.publish("orders", &[("shared.jar", b"v1")]);
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _) = server.orchestrator(server.log_signal(Duration::from_secs(5)), Arc::clone(&notifier));
    let artifact = server.artifact("orders-1.3.0.war", &[("shared.jar", b"v2")]);
    let _sim = server.simulate("orders", true);

    let outcome = orchestrator.run(&artifact);

    assert_eq!(
        outcome.transitions,
        vec![
            DeployState::Arrived,
            DeployState::DiffChecked,
            DeployState::Undeploying,
            DeployState::Undeployed,
            DeployState::Publishing,
            DeployState::Published,
            DeployState::Notified,
        ]
    );
    let diff = outcome.diff.unwrap();
    assert!(diff.needs_redeploy);
    assert_eq!(diff.entries["WEB-INF/lib/shared.jar"], LibraryStatus::Outdated);
    assert!(!server.published.join("orders").exists());
    assert_eq!(*notifier.scopes.lock().unwrap(), vec![ReloadScope::All]);
}

#[test]
fn missing_library_alone_publishes_over_running_copy() {
    let server = Server::new();
    server.publish("orders", &[("shared.jar", b"v1")]);
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _) = server.orchestrator(server.log_signal(Duration::from_secs(5)), Arc::clone(&notifier));
    let artifact = server.artifact(
        "orders-1.3.0.war",
        &[("shared.jar", b"v1"), ("extra.jar", b"new")],
    );
    let _sim = server.simulate("orders", true);

    let outcome = orchestrator.run(&artifact);

    assert!(!outcome.transitions.contains(&DeployState::Undeploying));
    assert_eq!(outcome.final_state(), DeployState::Notified);
    assert!(server.published.join("orders").exists());
}

#[test]
fn undeploy_timeout_never_publishes() {
    let server = Server::new();
    server.publish("orders", &[("stale.jar", b"old")]);
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _) = server.orchestrator(
        server.log_signal(Duration::from_millis(200)),
        Arc::clone(&notifier),
    );
    let artifact = server.artifact("orders-1.3.0.war", &[]);
    let _sim = server.simulate("orders", false);

    let outcome = orchestrator.run(&artifact);

    assert_eq!(
        outcome.transitions,
        vec![
            DeployState::Arrived,
            DeployState::DiffChecked,
            DeployState::Undeploying,
            DeployState::TimedOut,
        ]
    );
    assert!(matches!(outcome.error, Some(DeployError::Timeout { .. })));
    assert!(artifact.exists(), "artifact must stay in the drop directory");
    assert!(notifier.scopes.lock().unwrap().is_empty());
}

#[test]
fn publish_timeout_never_notifies() {
    let server = Server::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _) = server.orchestrator(
        server.log_signal(Duration::from_millis(200)),
        Arc::clone(&notifier),
    );
    let artifact = server.artifact("orders-1.2.0.war", &[("shared.jar", b"v1")]);
    // No container running: nothing ever logs the application as available

    let outcome = orchestrator.run(&artifact);

    assert_eq!(
        outcome.transitions,
        vec![
            DeployState::Arrived,
            DeployState::DiffChecked,
            DeployState::Publishing,
            DeployState::TimedOut,
        ]
    );
    assert!(matches!(outcome.error, Some(DeployError::Timeout { .. })));
    assert!(server.deploy_dir.join("orders-1.2.0.war").exists());
    assert!(notifier.scopes.lock().unwrap().is_empty());
}

#[test]
fn unreadable_artifact_fails() {
    let server = Server::new();
    server.publish("orders", &[("shared.jar", b"v1")]);
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _) = server.orchestrator(server.log_signal(Duration::from_millis(200)), Arc::clone(&notifier));
    let artifact = server.drop_dir.join("orders-1.3.0.war");
    fs::write(&artifact, b"partial upload").unwrap();

    let outcome = orchestrator.run(&artifact);

    assert_eq!(
        outcome.transitions,
        vec![DeployState::Arrived, DeployState::Failed]
    );
    assert!(matches!(outcome.error, Some(DeployError::Archive { .. })));
}

#[test]
fn submitted_task_runs_on_named_thread() {
    let server = Server::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _) = server.orchestrator(server.log_signal(Duration::from_secs(5)), Arc::clone(&notifier));
    let artifact = server.artifact("orders-1.2.0.war", &[]);
    let _sim = server.simulate("orders", true);

    let handle = orchestrator.submit(artifact).unwrap();
    assert_eq!(handle.thread().name(), Some("deploy-orders"));

    let outcome = handle.join().unwrap();
    assert_eq!(outcome.final_state(), DeployState::Notified);
}

/// Signal that answers immediately and records overlapping waits per name.
#[derive(Default)]
struct OverlapSignal {
    active: Mutex<HashMap<String, usize>>,
    overlaps: Mutex<Vec<String>>,
}

impl DeploySignal for OverlapSignal {
    fn await_after(
        &self,
        name: &str,
        _kind: SignalKind,
        action: SignalAction<'_>,
    ) -> Result<Awaited, DeployError> {
        {
            let mut active = self.active.lock().unwrap();
            let count = active.entry(name.to_owned()).or_default();
            *count += 1;
            if *count > 1 {
                self.overlaps.lock().unwrap().push(name.to_owned());
            }
        }
        let acted = action()?;
        std::thread::sleep(Duration::from_millis(50));
        *self.active.lock().unwrap().get_mut(name).unwrap() -= 1;
        Ok(if acted { Awaited::Observed } else { Awaited::Skipped })
    }
}

#[test]
fn same_name_tasks_are_serialized() {
    let server = Server::new();
    let signal = Arc::new(OverlapSignal::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let (orchestrator, _) = server.orchestrator(
        Arc::clone(&signal) as Arc<dyn DeploySignal>,
        Arc::clone(&notifier),
    );

    let handles: Vec<_> = ["orders-1.2.0.war", "orders-1.3.0.war", "billing-1.0.0.war"]
        .into_iter()
        .map(|file| {
            let artifact = server.artifact(file, &[]);
            orchestrator.submit(artifact).unwrap()
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().final_state(), DeployState::Notified);
    }

    assert!(signal.overlaps.lock().unwrap().is_empty());
    assert_eq!(notifier.scopes.lock().unwrap().len(), 3);
    assert!(server.deploy_dir.join("orders-1.3.0.war").exists());
}
