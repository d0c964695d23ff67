//! Git hooks driving nbpair: `--pre-commit` stages what it writes,
//! `--pre-commit-mode` fails until the index matches the working copy.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{Duration, SystemTime};

use assert_cmd::prelude::*;
use filetime::FileTime;
use serde_json::{json, Value};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn nbpair_bin() -> &'static Path {
    assert_cmd::cargo::cargo_bin!("nbpair")
}

fn nbpair_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(nbpair_bin());
    cmd.current_dir(dir).env("XDG_CONFIG_HOME", dir.join(".no-user-config"));
    cmd
}

fn git(dir: &Path, args: &[&str]) -> Output {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git")
}

fn git_ok(dir: &Path, args: &[&str]) -> String {
    let out = git(dir, args);
    assert!(
        out.status.success(),
        "git {args:?} failed:\n{}{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn init_repo() -> TempDir {
    let repo = TempDir::new().expect("repo");
    git_ok(repo.path(), &["init", "-q"]);
    git_ok(repo.path(), &["config", "user.name", "nbpair-test"]);
    git_ok(repo.path(), &["config", "user.email", "nbpair@tests.invalid"]);
    git_ok(repo.path(), &["config", "commit.gpgsign", "false"]);
    repo
}

/// Install `.git/hooks/pre-commit` running nbpair once per line of `args`.
fn install_hook(repo: &Path, lines: &[&str]) {
    let mut script = String::from("#!/bin/sh\nset -e\n");
    for args in lines {
        script.push_str(&format!("\"{}\" {args}\n", nbpair_bin().display()));
    }
    let hook = repo.join(".git/hooks/pre-commit");
    fs::create_dir_all(hook.parent().expect("hooks dir")).expect("create hooks dir");
    fs::write(&hook, script).expect("write hook");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).expect("chmod hook");
    }
}

fn commit(repo: &Path, message: &str) -> bool {
    git(repo, &["commit", "-q", "-m", message]).status.success()
}

fn committed_files(repo: &Path) -> String {
    git_ok(repo, &["ls-tree", "-r", "HEAD", "--name-only"])
}

fn notebook(cells: Value) -> String {
    let nb = json!({
        "cells": cells,
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5,
    });
    serde_json::to_string_pretty(&nb).expect("serialize notebook")
}

fn markdown_cell(id: &str, source: &str) -> Value {
    json!({"cell_type": "markdown", "id": id, "metadata": {}, "source": source})
}

fn write_notebook(path: &Path, cells: Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create notebook dir");
    }
    fs::write(path, notebook(cells)).expect("write notebook");
}

fn cell_sources(path: &Path) -> Vec<String> {
    let text = fs::read_to_string(path).expect("read notebook");
    let nb: Value = serde_json::from_str(&text).expect("parse notebook");
    nb["cells"]
        .as_array()
        .expect("cells")
        .iter()
        .map(|cell| match &cell["source"] {
            Value::Array(lines) => lines.iter().filter_map(Value::as_str).collect(),
            other => other.as_str().unwrap_or_default().to_string(),
        })
        .collect()
}

/// Push the mtime of `path` into the future so it wins the freshness check.
fn touch_later(path: &Path) {
    let later = SystemTime::now() + Duration::from_secs(5);
    filetime::set_file_mtime(path, FileTime::from_system_time(later)).expect("set mtime");
}

// ---------------------------------------------------------------------------
// --pre-commit
// ---------------------------------------------------------------------------

#[test]
fn hook_converts_and_commits_the_text_version() {
    let repo = init_repo();
    install_hook(repo.path(), &["--to py:light --pre-commit"]);

    let ipynb = repo.path().join("nb with spaces.ipynb");
    let py = repo.path().join("nb with spaces.py");
    write_notebook(&ipynb, json!([]));

    git_ok(repo.path(), &["add", "nb with spaces.ipynb"]);
    assert!(commit(repo.path(), "created"));

    assert!(committed_files(repo.path()).contains("nb with spaces.py"));
    assert!(py.is_file());
}

#[test]
fn sync_hook_regenerates_and_propagates_edits() {
    let repo = init_repo();
    install_hook(repo.path(), &["--sync --pre-commit"]);

    let ipynb = repo.path().join("notebook.ipynb");
    let md = repo.path().join("notebook.md");
    write_notebook(&ipynb, json!([markdown_cell("intro", "A short notebook")]));

    // Not paired yet: nothing to generate.
    git_ok(repo.path(), &["add", "notebook.ipynb"]);
    assert!(commit(repo.path(), "created"));
    let files = committed_files(repo.path());
    assert!(files.contains("notebook.ipynb"));
    assert!(!files.contains("notebook.md"));
    assert!(!md.exists());

    nbpair_cmd(repo.path())
        .args(["--set-formats", "ipynb,md", "notebook.ipynb"])
        .assert()
        .success();
    assert!(md.is_file());

    // The hook brings the markdown file back and commits it.
    fs::remove_file(&md).expect("remove md");
    git_ok(repo.path(), &["add", "notebook.ipynb"]);
    assert!(commit(repo.path(), "paired"));
    assert!(committed_files(repo.path()).contains("notebook.md"));
    let md_text = fs::read_to_string(&md).expect("read md");
    assert!(md_text.contains("A short notebook"));

    // Editing the markdown file updates the notebook.
    fs::write(&md, md_text.replace("A short notebook", "Notebook was edited")).expect("edit md");
    touch_later(&md);
    git_ok(repo.path(), &["add", "notebook.md"]);
    assert!(commit(repo.path(), "edited md"));
    assert_eq!(cell_sources(&ipynb), vec!["Notebook was edited".to_string()]);
    let staged = git_ok(repo.path(), &["status", "--porcelain"]);
    assert!(staged.trim().is_empty(), "uncommitted changes: {staged}");

    // Files the hook does not know are left alone.
    fs::write(repo.path().join("image.jpg"), b"").expect("write image");
    git_ok(repo.path(), &["add", "image.jpg"]);
    assert!(commit(repo.path(), "added image"));
}

#[test]
fn hook_writes_into_a_prefix_folder() {
    let repo = init_repo();
    install_hook(repo.path(), &["--from ipynb --to python//py:light --pre-commit"]);

    write_notebook(&repo.path().join("nb with spaces.ipynb"), json!([]));
    git_ok(repo.path(), &["add", "nb with spaces.ipynb"]);
    assert!(commit(repo.path(), "created"));

    assert!(committed_files(repo.path()).contains("python/nb with spaces.py"));
    assert!(repo.path().join("python/nb with spaces.py").is_file());
}

#[test]
fn script_is_converted_to_notebook_and_markdown() {
    let repo = init_repo();
    install_hook(
        repo.path(),
        &[
            "--from py:light --to ipynb --pre-commit",
            "--from py:light --to md --pre-commit",
        ],
    );

    fs::write(repo.path().join("nb with spaces.py"), "1 + 1\n").expect("write script");
    git_ok(repo.path(), &["add", "nb with spaces.py"]);
    assert!(commit(repo.path(), "created"));

    let files = committed_files(repo.path());
    assert!(files.contains("nb with spaces.ipynb"));
    assert!(files.contains("nb with spaces.md"));
    assert_eq!(
        cell_sources(&repo.path().join("nb with spaces.ipynb")),
        vec!["1 + 1".to_string()]
    );
}

#[test]
fn manual_pre_commit_run_stages_outputs() {
    let repo = init_repo();
    write_notebook(&repo.path().join("notebook.ipynb"), json!([]));
    git_ok(repo.path(), &["add", "notebook.ipynb"]);

    nbpair_cmd(repo.path())
        .args(["--to", "py", "--pre-commit"])
        .assert()
        .success();
    assert!(commit(repo.path(), "created"));

    assert!(committed_files(repo.path()).contains("notebook.py"));
    assert!(repo.path().join("notebook.py").is_file());
}

#[test]
fn sync_hook_follows_folder_pairing_from_script() {
    let repo = init_repo();
    install_hook(repo.path(), &["--sync --pre-commit"]);

    let py = repo.path().join("py/test.py");
    fs::create_dir_all(py.parent().expect("py dir")).expect("create py dir");
    fs::write(
        &py,
        "# ---\n\
         # jupyter:\n\
         #   jupytext:\n\
         #     formats: py//py,nb//ipynb\n\
         # ---\n\
         \n\
         # A Markdown cell\n",
    )
    .expect("write script");

    let ipynb = repo.path().join("nb/test.ipynb");
    assert!(!ipynb.exists());

    git_ok(repo.path(), &["add", "py/test.py"]);
    assert!(commit(repo.path(), "notebook created"));

    assert!(ipynb.is_file());
    assert!(committed_files(repo.path()).contains("nb/test.ipynb"));
    assert_eq!(cell_sources(&ipynb), vec!["A Markdown cell".to_string()]);
}

#[test]
fn sync_hook_uses_configured_tree_pairing() {
    let repo = init_repo();
    fs::write(
        repo.path().join("jupytext.toml"),
        "default_jupytext_formats = \"notebooks///ipynb,scripts///py:percent\"\n",
    )
    .expect("write config");
    install_hook(repo.path(), &["--sync --pre-commit"]);

    let ipynb = repo.path().join("notebooks/subfolder/analysis.ipynb");
    write_notebook(&ipynb, json!([markdown_cell("intro", "Some analysis")]));
    git_ok(repo.path(), &["add", "notebooks/subfolder/analysis.ipynb"]);
    assert!(commit(repo.path(), "notebook in a tree"));

    let script: PathBuf = repo.path().join("scripts/subfolder/analysis.py");
    let text = fs::read_to_string(&script).expect("read script");
    assert!(text.contains("# %% [markdown]"));
    assert!(text.contains("# Some analysis"));
    assert!(committed_files(repo.path()).contains("scripts/subfolder/analysis.py"));
}

#[test]
fn failing_check_aborts_the_commit() {
    let repo = init_repo();
    install_hook(
        repo.path(),
        &["--pre-commit --from ipynb --set-formats ipynb,py --check false"],
    );

    write_notebook(
        &repo.path().join("notebook.ipynb"),
        json!([{"cell_type": "code", "id": "c1", "metadata": {}, "execution_count": null,
                "outputs": [], "source": "1 + 1"}]),
    );
    git_ok(repo.path(), &["add", "notebook.ipynb"]);

    assert!(!commit(repo.path(), "rejected"));
    assert!(!git(repo.path(), &["rev-parse", "--verify", "HEAD"]).status.success());
}

// ---------------------------------------------------------------------------
// --pre-commit-mode
// ---------------------------------------------------------------------------

#[test]
fn new_output_must_be_added_before_commit() {
    let repo = init_repo();
    install_hook(repo.path(), &["--sync --pre-commit-mode"]);

    write_notebook(
        &repo.path().join("test.ipynb"),
        json!([markdown_cell("intro", "A short notebook")]),
    );
    nbpair_cmd(repo.path())
        .args(["--set-formats", "ipynb,py:percent", "test.ipynb"])
        .assert()
        .success();

    git_ok(repo.path(), &["add", "test.ipynb"]);
    assert!(!commit(repo.path(), "failing"));
    assert!(!commit(repo.path(), "still failing"));

    git_ok(repo.path(), &["add", "test.py"]);
    assert!(commit(repo.path(), "passing"));
    let tracked = git_ok(repo.path(), &["ls-files"]);
    assert!(tracked.contains("test.ipynb"));
    assert!(tracked.contains("test.py"));
}

#[test]
fn changed_output_must_be_added_before_commit() {
    let repo = init_repo();
    install_hook(repo.path(), &["--from ipynb --to py:light --pre-commit-mode"]);

    let ipynb = repo.path().join("test.ipynb");
    write_notebook(&ipynb, json!([markdown_cell("intro", "A short notebook")]));
    fs::write(repo.path().join("test.py"), "# hello").expect("write script");
    git_ok(repo.path(), &["add", "."]);

    // The hook rewrites test.py, so the first attempt fails.
    assert!(!commit(repo.path(), "outdated output"));
    git_ok(repo.path(), &["add", "."]);
    assert!(commit(repo.path(), "test"));

    write_notebook(&ipynb, json!([markdown_cell("intro", "Some other text")]));
    git_ok(repo.path(), &["add", "test.ipynb"]);
    assert!(!commit(repo.path(), "fails"));
    assert!(!commit(repo.path(), "fails again"));

    git_ok(repo.path(), &["add", "test.py"]);
    assert!(commit(repo.path(), "succeeds"));
    let tracked = git_ok(repo.path(), &["ls-files"]);
    assert!(tracked.contains("test.ipynb"));
    assert!(tracked.contains("test.py"));
}

#[test]
fn published_hook_entry_checks_staged_outputs() {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("../.pre-commit-hooks.yaml");
    let text = fs::read_to_string(&manifest).expect("read hook manifest");
    let hooks: Value = serde_yaml::from_str(&text).expect("parse hook manifest");
    let hook = &hooks[0];
    assert_eq!(hook["id"], json!("nbpair"));
    let args = hook["entry"]
        .as_str()
        .and_then(|entry| entry.strip_prefix("nbpair "))
        .expect("entry runs nbpair");
    assert_eq!(args, "--pre-commit-mode");

    let repo = init_repo();
    install_hook(repo.path(), &[&format!("{args} --sync")]);
    write_notebook(
        &repo.path().join("test.ipynb"),
        json!([markdown_cell("intro", "A short notebook")]),
    );
    nbpair_cmd(repo.path())
        .args(["--set-formats", "ipynb,md", "test.ipynb"])
        .assert()
        .success();

    git_ok(repo.path(), &["add", "test.ipynb"]);
    assert!(!commit(repo.path(), "markdown twin not staged"));
    git_ok(repo.path(), &["add", "test.md"]);
    assert!(commit(repo.path(), "both staged"));
}

// ---------------------------------------------------------------------------
// --alert-untracked / --ignore-unmatched
// ---------------------------------------------------------------------------

#[test]
fn untracked_output_is_an_error() {
    let repo = init_repo();
    fs::write(repo.path().join("test.py"), "print('hello')\n").expect("write script");

    nbpair_cmd(repo.path())
        .args(["--from", ".py", "--to", "ipynb", "--alert-untracked", "test.py"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("not tracked"));
    assert!(repo.path().join("test.ipynb").is_file());
}

#[test]
fn tracked_output_is_accepted() {
    let repo = init_repo();
    write_notebook(
        &repo.path().join("test.ipynb"),
        json!([markdown_cell("intro", "A short notebook")]),
    );
    fs::write(repo.path().join("test.py"), "# Hello").expect("write script");
    git_ok(repo.path(), &["add", "test.py"]);

    nbpair_cmd(repo.path())
        .args(["--from", "ipynb", "--to", "py:light", "--alert-untracked", "test.ipynb"])
        .assert()
        .success();
}

#[test]
fn unmatched_input_is_ignored() {
    let dir = TempDir::new().expect("dir");
    fs::write(dir.path().join("test.txt"), "Hello\n").expect("write text");

    nbpair_cmd(dir.path())
        .args(["--from", "ipynb", "--to", "py:light", "--ignore-unmatched", "test.txt"])
        .assert()
        .success();
    assert!(!dir.path().join("test.py").exists());
}
