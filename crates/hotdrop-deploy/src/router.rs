//! Propagation of individual source edits into the running application.
//!
//! Web resources below `<project>/src/main/webapp` are copied (or compiled
//! and copied) into the application's live directory; compiled classes
//! below `<project>/target/classes` go to its `WEB-INF/classes`. Browsers
//! are then told to reload, scoped to the resource for style sheets.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::compile::StyleCompiler;
use crate::error::RouteError;
use crate::locations::DeployLocationCache;
use crate::reload::{ReloadNotifier, ReloadScope};
use crate::workspace::{PROJECT_DESCRIPTOR, WorkspaceIndex};
use crate::xml;

/// Path segments separating a project root from its web resources.
pub const WEB_ROOT_MARKER: &[&str] = &["src", "main", "webapp"];

/// Path segments separating a project root from its compiled classes.
pub const CLASSES_MARKER: &[&str] = &["target", "classes"];

/// Path segments whose subtrees never propagate.
const IGNORED_SEGMENTS: &[&str] = &[".svn", ".git"];

/// Hook descriptor, relative to the web root.
const HOOK_DESCRIPTOR: &str = "WEB-INF/liferay-hook.xml";

/// What happened to the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// Created or modified.
    Written,
    /// Deleted.
    Removed,
}

/// Result of routing one change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Not a propagated file type or location.
    Ignored,
    /// No workspace project owns the file.
    UnknownApplication,
    /// The owning application has no runtime location.
    NotDeployed { name: String },
    /// A web resource was written into the runtime.
    Propagated {
        name: String,
        destination: PathBuf,
        scope: ReloadScope,
    },
    /// A class file was copied; a delayed reload is pending.
    ClassCopied { name: String, destination: PathBuf },
    /// A project descriptor changed and the workspace was rescanned.
    WorkspaceRescanned,
}

/// Router settings.
#[derive(Clone, Debug)]
pub struct RouterSettings {
    /// Extensions (without dot) that propagate.
    pub extensions: Vec<String>,
    /// Extensions compiled to CSS before copying.
    pub compiled_extensions: Vec<String>,
    /// Extensions reloaded in place by browsers.
    pub style_extensions: Vec<String>,
    /// Extensions needing a full page reload and mirrored to statics.
    pub script_extensions: Vec<String>,
    /// Published directory of the portal, target of hook overrides.
    pub portal_dir: PathBuf,
    /// Secondary directory receiving copies of styles and scripts.
    pub statics_dir: Option<PathBuf>,
    /// Quiet period before a class change triggers a reload.
    pub class_reload_delay: Duration,
    /// Suffix of the backup taken before a portal file is first overridden.
    pub backup_suffix: String,
}

impl RouterSettings {
    /// Default settings targeting the given portal directory.
    pub fn new(portal_dir: PathBuf) -> Self {
        let owned = |items: &[&str]| -> Vec<String> {
            items.iter().map(|s| (*s).to_owned()).collect()
        };
        Self {
            extensions: owned(&["jsp", "jspf", "js", "css", "scss", "tag", "vm"]),
            compiled_extensions: owned(&["scss"]),
            style_extensions: owned(&["css"]),
            script_extensions: owned(&["js"]),
            portal_dir,
            statics_dir: None,
            class_reload_delay: Duration::from_millis(1200),
            backup_suffix: ".hotdrop".to_owned(),
        }
    }
}

/// Routes workspace changes into running applications.
pub struct ChangeRouter {
    workspace: Arc<WorkspaceIndex>,
    locations: Arc<DeployLocationCache>,
    notifier: Arc<dyn ReloadNotifier>,
    compiler: Arc<dyn StyleCompiler>,
    settings: RouterSettings,
    class_reload: DelayedReload,
}

impl ChangeRouter {
    pub fn new(
        workspace: Arc<WorkspaceIndex>,
        locations: Arc<DeployLocationCache>,
        notifier: Arc<dyn ReloadNotifier>,
        compiler: Arc<dyn StyleCompiler>,
        settings: RouterSettings,
    ) -> Self {
        let class_reload = DelayedReload::new(settings.class_reload_delay, Arc::clone(&notifier));
        Self {
            workspace,
            locations,
            notifier,
            compiler,
            settings,
            class_reload,
        }
    }

    /// Route any workspace change.
    pub fn route(&self, path: &Path, change: ChangeKind) -> Result<RouteOutcome, RouteError> {
        // Segments above the workspace root say nothing about the change
        let below_root = path.strip_prefix(self.workspace.root()).unwrap_or(path);
        if has_ignored_segment(below_root) {
            return Ok(RouteOutcome::Ignored);
        }
        if is_workspace_descriptor(below_root) {
            tracing::debug!(path = %path.display(), "Project descriptor changed");
            self.workspace.rescan();
            return Ok(RouteOutcome::WorkspaceRescanned);
        }
        if change == ChangeKind::Removed {
            return Ok(RouteOutcome::Ignored);
        }
        if split_at_marker(below_root, CLASSES_MARKER).is_some() {
            return self.on_class_file_changed(path);
        }
        self.on_source_file_changed(path)
    }

    /// Propagate a web resource below `src/main/webapp`.
    pub fn on_source_file_changed(&self, path: &Path) -> Result<RouteOutcome, RouteError> {
        let Some(ext) = extension(path) else {
            return Ok(RouteOutcome::Ignored);
        };
        if !contains(&self.settings.extensions, ext) {
            return Ok(RouteOutcome::Ignored);
        }
        let Some((source_root, relative)) = split_at_marker(path, WEB_ROOT_MARKER) else {
            return Ok(RouteOutcome::Ignored);
        };
        let Some(name) = self.workspace.lookup(&source_root) else {
            tracing::debug!(path = %path.display(), "No project owns file");
            return Ok(RouteOutcome::UnknownApplication);
        };

        let hook_target = hook_override(&source_root, &relative);
        let is_hook = hook_target.is_some();
        let (target_root, relative) = match hook_target {
            Some(stripped) => (self.settings.portal_dir.clone(), stripped),
            None => match self.locations.locate(&name) {
                Some(location) => (location.path, relative),
                None => {
                    tracing::debug!(name = %name, file = %relative.display(), "Skipped, not deployed");
                    return Ok(RouteOutcome::NotDeployed { name });
                }
            },
        };

        let compiled = contains(&self.settings.compiled_extensions, ext);
        let (relative, css) = if compiled {
            let source = fs::read_to_string(path).map_err(|source| RouteError::Copy {
                from: path.to_path_buf(),
                to: target_root.join(&relative),
                source,
            })?;
            let css = self
                .compiler
                .compile(&source, path)
                .map_err(|source| RouteError::Compile {
                    path: path.to_path_buf(),
                    source,
                })?;
            (relative.with_extension("css"), Some(css))
        } else {
            (relative, None)
        };

        let destination = target_root.join(&relative);
        if is_hook {
            self.backup_once(&destination);
        }
        place(path, css.as_deref(), &destination)?;

        let is_style = compiled || contains(&self.settings.style_extensions, ext);
        let is_script = contains(&self.settings.script_extensions, ext);
        if (is_style || is_script)
            && let Some(statics_dir) = &self.settings.statics_dir
        {
            place(path, css.as_deref(), &statics_dir.join(&name).join(&relative))?;
        }

        let scope = if is_style {
            ReloadScope::Resource(format!("{name}/{}", slash_path(&relative)))
        } else {
            ReloadScope::All
        };
        tracing::info!(
            name = %name,
            file = %relative.display(),
            target = %target_root.display(),
            "Copied"
        );
        self.notifier.reload(scope.clone());

        Ok(RouteOutcome::Propagated {
            name,
            destination,
            scope,
        })
    }

    /// Copy a compiled class below `target/classes` and schedule a reload.
    pub fn on_class_file_changed(&self, path: &Path) -> Result<RouteOutcome, RouteError> {
        let Some((source_root, relative)) = split_at_marker(path, CLASSES_MARKER) else {
            return Ok(RouteOutcome::Ignored);
        };
        let Some(name) = self.workspace.lookup(&source_root) else {
            return Ok(RouteOutcome::UnknownApplication);
        };
        let Some(location) = self.locations.locate(&name) else {
            tracing::debug!(name = %name, file = %relative.display(), "Skipped, not deployed");
            return Ok(RouteOutcome::NotDeployed { name });
        };

        let destination = location.path.join("WEB-INF").join("classes").join(&relative);
        place(path, None, &destination)?;
        tracing::info!(name = %name, file = %relative.display(), "Copied class");
        self.class_reload.schedule();

        Ok(RouteOutcome::ClassCopied { name, destination })
    }

    /// Keep the portal's original next to an overridden file.
    fn backup_once(&self, destination: &Path) {
        let mut backup = destination.as_os_str().to_owned();
        backup.push(&self.settings.backup_suffix);
        let backup = PathBuf::from(backup);

        if destination.is_file() && !backup.exists() {
            match fs::copy(destination, &backup) {
                Ok(_) => tracing::info!(backup = %backup.display(), "Backed up portal file"),
                Err(e) => tracing::warn!(backup = %backup.display(), error = %e, "Backup failed"),
            }
        }
    }
}

/// Write compiled output, or copy `source`, to `destination`.
fn place(source: &Path, compiled: Option<&str>, destination: &Path) -> Result<(), RouteError> {
    let copy_error = |e| RouteError::Copy {
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
        source: e,
    };
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(copy_error)?;
    }
    match compiled {
        Some(text) => fs::write(destination, text).map_err(copy_error),
        None => fs::copy(source, destination).map(|_| ()).map_err(copy_error),
    }
}

/// Relative path inside the hook's custom JSP directory, if `relative` is one.
fn hook_override(source_root: &Path, relative: &Path) -> Option<PathBuf> {
    let descriptor = source_root.join(WEB_ROOT_MARKER.join("/")).join(HOOK_DESCRIPTOR);
    let text = fs::read_to_string(&descriptor).ok()?;
    let custom_dir = match xml::text_at(&text, &["hook", "custom-jsp-dir"]) {
        Ok(dir) => dir?,
        Err(e) => {
            tracing::warn!(path = %descriptor.display(), error = %e, "Unreadable hook descriptor");
            return None;
        }
    };
    let custom_dir = custom_dir.trim_start_matches('/');
    if custom_dir.is_empty() {
        return None;
    }
    relative
        .strip_prefix(custom_dir)
        .ok()
        .filter(|rest| !rest.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Split `path` around the first occurrence of the `marker` segments.
pub fn split_at_marker(path: &Path, marker: &[&str]) -> Option<(PathBuf, PathBuf)> {
    let components: Vec<Component<'_>> = path.components().collect();
    let start = components.windows(marker.len()).position(|window| {
        window
            .iter()
            .zip(marker)
            .all(|(component, segment)| component.as_os_str() == *segment)
    })?;

    let root: PathBuf = components[..start].iter().collect();
    let rest: PathBuf = components[start + marker.len()..].iter().collect();
    if rest.as_os_str().is_empty() {
        return None;
    }
    Some((root, rest))
}

fn has_ignored_segment(path: &Path) -> bool {
    path.components()
        .any(|c| IGNORED_SEGMENTS.iter().any(|segment| c.as_os_str() == *segment))
}

/// `pom.xml` outside build output, or XML in a web root's `WEB-INF`.
///
/// `path` is relative to the workspace root.
fn is_workspace_descriptor(path: &Path) -> bool {
    if split_at_marker(path, &["target"]).is_some() {
        return false;
    }
    if path.file_name().is_some_and(|name| name == PROJECT_DESCRIPTOR) {
        return true;
    }
    extension(path) == Some("xml")
        && split_at_marker(path, &["src", "main", "webapp", "WEB-INF"]).is_some()
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn contains(list: &[String], ext: &str) -> bool {
    list.iter().any(|item| item == ext)
}

/// Forward-slash form of a relative path.
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Reload fired once a burst of schedules has been quiet for `delay`.
struct DelayedReload {
    delay: Duration,
    notifier: Arc<dyn ReloadNotifier>,
    deadline: Arc<Mutex<Option<Instant>>>,
}

impl DelayedReload {
    fn new(delay: Duration, notifier: Arc<dyn ReloadNotifier>) -> Self {
        Self {
            delay,
            notifier,
            deadline: Arc::new(Mutex::new(None)),
        }
    }

    fn schedule(&self) {
        let already_pending = {
            let mut deadline = self.deadline.lock().unwrap();
            let pending = deadline.is_some();
            *deadline = Some(Instant::now() + self.delay);
            pending
        };
        if already_pending {
            return;
        }

        let deadline = Arc::clone(&self.deadline);
        let notifier = Arc::clone(&self.notifier);
        let spawned = std::thread::Builder::new()
            .name("class-reload".to_owned())
            .spawn(move || {
                loop {
                    let remaining = {
                        let mut deadline = deadline.lock().unwrap();
                        let remaining = deadline
                            .map_or(Duration::ZERO, |at| at.saturating_duration_since(Instant::now()));
                        if remaining.is_zero() {
                            *deadline = None;
                        }
                        remaining
                    };
                    if remaining.is_zero() {
                        break;
                    }
                    std::thread::sleep(remaining);
                }
                notifier.reload(ReloadScope::All);
            });

        if let Err(e) = spawned {
            tracing::warn!(error = %e, "Failed to schedule class reload");
            *self.deadline.lock().unwrap() = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingNotifier {
        scopes: Mutex<Vec<ReloadScope>>,
    }

    impl RecordingNotifier {
        fn scopes(&self) -> Vec<ReloadScope> {
            self.scopes.lock().unwrap().clone()
        }
    }

    impl ReloadNotifier for RecordingNotifier {
        fn reload(&self, scope: ReloadScope) {
            self.scopes.lock().unwrap().push(scope);
        }
    }

    /// Uppercases its input; fails on sources containing `error`.
    struct FakeCompiler;

    impl StyleCompiler for FakeCompiler {
        fn compile(&self, source: &str, _origin: &Path) -> Result<String, CompileError> {
            if source.contains("error") {
                return Err(CompileError::Failed {
                    command: "fake".to_owned(),
                    stderr: "undefined variable".to_owned(),
                });
            }
            Ok(source.to_uppercase())
        }
    }

    struct Env {
        _dir: tempfile::TempDir,
        project: PathBuf,
        runtime: PathBuf,
        portal: PathBuf,
        statics: PathBuf,
        notifier: Arc<RecordingNotifier>,
        router: ChangeRouter,
    }

    impl Env {
        fn new() -> Self {
            Self::with_workspace_at("workspace")
        }

        fn with_workspace_at(relative: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            let workspace_dir = root.join(relative);
            let project = workspace_dir.join("orders-portlet");
            fs::create_dir_all(project.join("src/main/webapp")).unwrap();
            fs::write(
                project.join("pom.xml"),
                "<project><artifactId>orders-portlet</artifactId><version>1.0</version></project>",
            )
            .unwrap();

            let staged = root.join("server/temp");
            let published = root.join("server/webapps");
            let runtime = published.join("orders-portlet");
            let portal = published.join("ROOT");
            fs::create_dir_all(&staged).unwrap();
            fs::create_dir_all(&runtime).unwrap();
            fs::create_dir_all(&portal).unwrap();

            let workspace = Arc::new(WorkspaceIndex::new(workspace_dir));
            workspace.rescan();
            let locations = Arc::new(DeployLocationCache::new(staged, published));
            locations.rescan();

            let statics = root.join("statics");
            let mut settings = RouterSettings::new(portal.clone());
            settings.statics_dir = Some(statics.clone());
            settings.class_reload_delay = Duration::from_millis(50);

            let notifier = Arc::new(RecordingNotifier::default());
            let router = ChangeRouter::new(
                workspace,
                locations,
                Arc::clone(&notifier) as Arc<dyn ReloadNotifier>,
                Arc::new(FakeCompiler),
                settings,
            );

            Self {
                _dir: dir,
                project,
                runtime,
                portal,
                statics,
                notifier,
                router,
            }
        }

        fn source(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.project.join("src/main/webapp").join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }
    }

    #[test]
    fn test_split_at_marker() {
        assert_eq!(
            split_at_marker(
                Path::new("/ws/orders-portlet/src/main/webapp/css/main.css"),
                WEB_ROOT_MARKER
            ),
            Some((
                PathBuf::from("/ws/orders-portlet"),
                PathBuf::from("css/main.css")
            ))
        );
        assert_eq!(
            split_at_marker(Path::new("/ws/orders-portlet/src/main/java/A.java"), WEB_ROOT_MARKER),
            None
        );
        assert_eq!(
            split_at_marker(Path::new("/ws/orders-portlet/src/main/webapp"), WEB_ROOT_MARKER),
            None
        );
    }

    #[test]
    fn test_ignores_unlisted_extension() {
        let env = Env::new();
        let path = env.source("notes.txt", "x");

        assert_eq!(env.router.route(&path, ChangeKind::Written).unwrap(), RouteOutcome::Ignored);
        assert!(env.notifier.scopes().is_empty());
    }

    #[test]
    fn test_ignores_path_without_web_root() {
        let env = Env::new();
        let path = env.project.join("docs/view.jsp");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "<p/>").unwrap();

        assert_eq!(env.router.route(&path, ChangeKind::Written).unwrap(), RouteOutcome::Ignored);
        assert!(env.notifier.scopes().is_empty());
    }

    #[test]
    fn test_ignores_version_control_segments() {
        let env = Env::new();
        let path = env.project.join("src/main/webapp/.svn/text-base/view.jsp");

        assert_eq!(env.router.route(&path, ChangeKind::Written).unwrap(), RouteOutcome::Ignored);
    }

    #[test]
    fn test_stylesheet_scoped_reload_and_mirror() {
        let env = Env::new();
        let path = env.source("css/main.css", "a { color: red; }");

        let outcome = env.router.route(&path, ChangeKind::Written).unwrap();

        let scope = ReloadScope::Resource("orders-portlet/css/main.css".to_owned());
        assert_eq!(
            outcome,
            RouteOutcome::Propagated {
                name: "orders-portlet".to_owned(),
                destination: env.runtime.join("css/main.css"),
                scope: scope.clone(),
            }
        );
        assert_eq!(
            fs::read_to_string(env.runtime.join("css/main.css")).unwrap(),
            "a { color: red; }"
        );
        assert!(env.statics.join("orders-portlet/css/main.css").is_file());
        assert_eq!(env.notifier.scopes(), vec![scope]);
    }

    #[test]
    fn test_script_unscoped_reload_and_mirror() {
        let env = Env::new();
        let path = env.source("js/main.js", "init();");

        env.router.route(&path, ChangeKind::Written).unwrap();

        assert!(env.runtime.join("js/main.js").is_file());
        assert!(env.statics.join("orders-portlet/js/main.js").is_file());
        assert_eq!(env.notifier.scopes(), vec![ReloadScope::All]);
    }

    #[test]
    fn test_template_copied_without_mirror() {
        let env = Env::new();
        let path = env.source("html/view.jsp", "<p/>");

        env.router.route(&path, ChangeKind::Written).unwrap();

        assert!(env.runtime.join("html/view.jsp").is_file());
        assert!(!env.statics.join("orders-portlet/html/view.jsp").exists());
        assert_eq!(env.notifier.scopes(), vec![ReloadScope::All]);
    }

    #[test]
    fn test_compiled_style_written_as_css() {
        let env = Env::new();
        let path = env.source("css/main.scss", "a { b: c; }");

        let outcome = env.router.route(&path, ChangeKind::Written).unwrap();

        assert_eq!(
            fs::read_to_string(env.runtime.join("css/main.css")).unwrap(),
            "A { B: C; }"
        );
        assert!(!env.runtime.join("css/main.scss").exists());
        assert!(env.statics.join("orders-portlet/css/main.css").is_file());
        assert!(matches!(
            outcome,
            RouteOutcome::Propagated { scope: ReloadScope::Resource(ref p), .. } if p == "orders-portlet/css/main.css"
        ));
    }

    #[test]
    fn test_compile_failure_skips_copy_and_reload() {
        let env = Env::new();
        let path = env.source("css/broken.scss", "error");

        let err = env.router.route(&path, ChangeKind::Written).unwrap_err();

        assert!(matches!(err, RouteError::Compile { .. }));
        assert!(!env.runtime.join("css/broken.css").exists());
        assert!(env.notifier.scopes().is_empty());
    }

    #[test]
    fn test_not_deployed_application() {
        let env = Env::new();
        fs::remove_dir_all(&env.runtime).unwrap();
        env.router.locations.rescan();
        let path = env.source("html/view.jsp", "<p/>");

        assert_eq!(
            env.router.route(&path, ChangeKind::Written).unwrap(),
            RouteOutcome::NotDeployed {
                name: "orders-portlet".to_owned()
            }
        );
        assert!(env.notifier.scopes().is_empty());
    }

    #[test]
    fn test_unknown_application() {
        let env = Env::new();
        let path = env.project.join("../stray/src/main/webapp/view.jsp");

        assert_eq!(
            env.router.route(&path, ChangeKind::Written).unwrap(),
            RouteOutcome::UnknownApplication
        );
    }

    #[test]
    fn test_hook_override_targets_portal_with_single_backup() {
        let env = Env::new();
        env.source(
            "WEB-INF/liferay-hook.xml",
            "<hook><custom-jsp-dir>/custom_jsps</custom-jsp-dir></hook>",
        );
        let original = env.portal.join("html/portlet/login/login.jsp");
        fs::create_dir_all(original.parent().unwrap()).unwrap();
        fs::write(&original, "portal original").unwrap();

        let path = env.source("custom_jsps/html/portlet/login/login.jsp", "override v1");
        let outcome = env.router.route(&path, ChangeKind::Written).unwrap();

        assert!(matches!(
            outcome,
            RouteOutcome::Propagated { ref destination, .. } if *destination == original
        ));
        assert_eq!(fs::read_to_string(&original).unwrap(), "override v1");
        let backup = env.portal.join("html/portlet/login/login.jsp.hotdrop");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "portal original");

        fs::write(&path, "override v2").unwrap();
        env.router.route(&path, ChangeKind::Written).unwrap();
        assert_eq!(fs::read_to_string(&original).unwrap(), "override v2");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "portal original");
    }

    #[test]
    fn test_class_files_copied_with_single_delayed_reload() {
        let env = Env::new();
        let classes = env.project.join("target/classes/com/example");
        fs::create_dir_all(&classes).unwrap();
        for name in ["A.class", "B.class", "C.class"] {
            fs::write(classes.join(name), b"\xCA\xFE").unwrap();
            let outcome = env
                .router
                .route(&classes.join(name), ChangeKind::Written)
                .unwrap();
            assert!(matches!(outcome, RouteOutcome::ClassCopied { .. }));
        }

        assert!(env.runtime.join("WEB-INF/classes/com/example/B.class").is_file());
        assert!(env.notifier.scopes().is_empty());

        std::thread::sleep(Duration::from_millis(400));
        assert_eq!(env.notifier.scopes(), vec![ReloadScope::All]);
    }

    #[test]
    fn test_descriptor_change_rescans_workspace() {
        let env = Env::new();
        let other = env.project.parent().unwrap().join("billing-portlet");
        fs::create_dir_all(other.join("src/main/webapp")).unwrap();
        fs::write(
            other.join("pom.xml"),
            "<project><artifactId>billing-portlet</artifactId></project>",
        )
        .unwrap();

        let outcome = env
            .router
            .route(&other.join("pom.xml"), ChangeKind::Written)
            .unwrap();

        assert_eq!(outcome, RouteOutcome::WorkspaceRescanned);
        assert_eq!(
            env.router.workspace.lookup(&other),
            Some("billing-portlet".to_owned())
        );
    }

    #[test]
    fn test_descriptor_change_rescans_workspace_below_target_dir() {
        let env = Env::with_workspace_at("target/workspace");
        let other = env.project.parent().unwrap().join("billing-portlet");
        fs::create_dir_all(&other).unwrap();
        fs::write(
            other.join("pom.xml"),
            "<project><artifactId>billing-portlet</artifactId></project>",
        )
        .unwrap();

        let outcome = env
            .router
            .route(&other.join("pom.xml"), ChangeKind::Written)
            .unwrap();

        assert_eq!(outcome, RouteOutcome::WorkspaceRescanned);
        assert_eq!(
            env.router.workspace.lookup(&other),
            Some("billing-portlet".to_owned())
        );
    }

    #[test]
    fn test_build_output_descriptor_is_not_rescanned() {
        let env = Env::new();
        let path = env.project.join("target/classes/pom.xml");

        assert_eq!(env.router.route(&path, ChangeKind::Removed).unwrap(), RouteOutcome::Ignored);
    }

    #[test]
    fn test_removed_source_is_ignored() {
        let env = Env::new();
        let path = env.project.join("src/main/webapp/view.jsp");

        assert_eq!(env.router.route(&path, ChangeKind::Removed).unwrap(), RouteOutcome::Ignored);
    }
}
