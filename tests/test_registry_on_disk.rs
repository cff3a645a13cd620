//! Registry scenarios against real files in a temporary directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use project_service::config::{CONFIG_FILE_NAME, load_config};
use project_service::{FileEvent, OsFileSystem, ProjectRegistry, RegistryEvent, TextEdit};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "project.toml",
        "include = [\"src\"]\nextensions = [\"txt\"]\n\n[settings]\nstrict = true\n",
    );
    write(dir.path(), "src/main.txt", "import \"../lib/util.txt\"\n");
    write(dir.path(), "src/notes.md", "not a root\n");
    write(dir.path(), "lib/util.txt", "helper\n");
    dir
}

fn registry(dir: &TempDir) -> ProjectRegistry {
    ProjectRegistry::builder(Arc::new(OsFileSystem::new()))
        .base_dir(dir.path())
        .build()
        .unwrap()
}

#[test]
fn test_referenced_file_joins_configured_project() {
    let dir = workspace();
    let mut registry = registry(&dir);

    let project = registry.open_file("lib/util.txt", None).unwrap().unwrap();

    let project = registry.project(project).unwrap();
    assert!(project.is_configured());
    assert_eq!(project.roots(), [dir.path().join("src/main.txt")]);
    assert!(project.contains(&dir.path().join("lib/util.txt")));
    assert_eq!(project.settings().get("strict"), Some(&toml::Value::Boolean(true)));
    assert_eq!(registry.open_referenced(), [dir.path().join("lib/util.txt")]);
}

#[test]
fn test_edits_are_visible_to_other_threads() {
    let dir = workspace();
    let mut registry = registry(&dir);
    registry.open_file("src/main.txt", None).unwrap();
    registry
        .change_file("src/main.txt", &[TextEdit::insert(0, "// edited\n")])
        .unwrap();

    let documents = registry.documents();
    let path = dir.path().join("src/main.txt");
    let text = std::thread::spawn(move || documents.snapshot(&path).map(|s| s.text()))
        .join()
        .unwrap();

    assert_eq!(
        text.as_deref(),
        Some("// edited\nimport \"../lib/util.txt\"\n")
    );
}

#[test]
fn test_close_discards_unsaved_edits() {
    let dir = workspace();
    let mut registry = registry(&dir);
    registry.open_file("src/main.txt", None).unwrap();
    registry
        .change_file("src/main.txt", &[TextEdit::delete(0, 24)])
        .unwrap();
    registry.close_file("src/main.txt").unwrap();

    registry.open_file("lib/util.txt", None).unwrap();
    assert_eq!(
        registry.get_text("src/main.txt", 0, 100).unwrap(),
        "import \"../lib/util.txt\"\n"
    );
}

#[test]
fn test_new_root_file_is_added_after_file_list_delay() {
    let dir = workspace();
    let mut registry = registry(&dir);
    let project = registry.open_file("src/main.txt", None).unwrap().unwrap();

    write(dir.path(), "src/extra.txt", "");
    registry.on_file_event(FileEvent::created(dir.path().join("src/extra.txt")));
    registry.flush_timers();

    assert!(
        registry
            .project(project)
            .unwrap()
            .is_root(&dir.path().join("src/extra.txt"))
    );
}

#[test]
fn test_broken_manifest_reports_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "project.toml", "files = [\n");
    write(dir.path(), "a.txt", "");
    let mut registry = registry(&dir);

    registry.open_file("a.txt", None).unwrap();

    assert!(registry.configured_projects().is_empty());
    assert_eq!(registry.inferred_projects().len(), 1);
    assert!(
        registry
            .take_events()
            .iter()
            .any(|event| matches!(event, RegistryEvent::ManifestDiagnostics { .. }))
    );
}

#[test]
fn test_custom_manifest_name_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        CONFIG_FILE_NAME,
        "manifest_names = [\"workspace.toml\"]\n",
    );
    write(dir.path(), "workspace.toml", "files = [\"a.txt\"]\n");
    write(dir.path(), "a.txt", "");

    let outcome = load_config(&dir.path().join(CONFIG_FILE_NAME));
    let mut registry = ProjectRegistry::builder(Arc::new(OsFileSystem::new()))
        .config(outcome.config)
        .base_dir(dir.path())
        .build()
        .unwrap();

    let project = registry.open_file("a.txt", None).unwrap().unwrap();
    assert_eq!(
        registry.project(project).unwrap().manifest(),
        Some(dir.path().join("workspace.toml").as_path())
    );
}
