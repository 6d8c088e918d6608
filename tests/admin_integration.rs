//! Integration tests for the workspace and admin-repository layers.
//!
//! A bare `gitolite-admin` remote is seeded with a known configuration;
//! workspaces for individual users then materialize private clones of it
//! and exercise the load/patch/save flow end to end over the local
//! transport.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use gitwarden::config::Settings;
use gitwarden::git::Credentials;
use gitwarden::gitolite::{apply, AdminRepository, PatchOperation, Permission, RepoEntry, Rule};
use gitwarden::workspace::{LockError, Workspace, WorkspaceError};

const ADMIN_CONF: &str = "\
repo projects/my-first-project
\tR = alice
\tRW = bob
\tC = eve

repo projects/my-next-project
\tRW = alice bob eve

repo templates/my-first-template
\tRW = alice bob eve
";

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn git_output(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// A directory of bare remotes mirroring a Gitolite server, plus a
/// workspace root for per-user clones.
struct ServerFixture {
    dir: TempDir,
    remotes: PathBuf,
}

impl ServerFixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let remotes = dir.path().join("remotes");

        let fixture = Self { dir, remotes };
        fixture.create_remote("gitolite-admin", &[("conf/gitolite.conf", ADMIN_CONF)]);
        fixture
    }

    /// Create a bare remote seeded with the given files on `master`.
    fn create_remote(&self, name: &str, files: &[(&str, &str)]) {
        let bare = self.remotes.join(name);
        std::fs::create_dir_all(&bare).unwrap();
        run_git(&bare, &["init", "--bare"]);
        run_git(&bare, &["symbolic-ref", "HEAD", "refs/heads/master"]);

        let seed = self.dir.path().join("seeds").join(name);
        std::fs::create_dir_all(&seed).unwrap();
        run_git(&seed, &["init"]);
        run_git(&seed, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        run_git(&seed, &["config", "user.email", "seed@example.com"]);
        run_git(&seed, &["config", "user.name", "Seed User"]);

        for (path, content) in files {
            let file = seed.join(path);
            if let Some(parent) = file.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&file, content).unwrap();
            run_git(&seed, &["add", path]);
        }
        run_git(&seed, &["commit", "-m", "Seed"]);
        run_git(&seed, &["push", bare.to_str().unwrap(), "master"]);
    }

    /// Tip of `master` on the bare admin remote.
    fn admin_tip(&self) -> String {
        git_output(&self.remotes.join("gitolite-admin"), &["rev-parse", "master"])
    }

    fn workspace(&self) -> Workspace {
        Workspace::new(Settings::new(
            self.dir.path().join("workspaces"),
            self.remotes.to_str().unwrap(),
        ))
    }
}

fn credentials(user: &str) -> Credentials {
    Credentials::new(user, "secret")
}

/// Materialize the admin repository for a user, with a commit identity.
fn admin_for(workspace: &Workspace, user: &str) -> AdminRepository {
    let mut admin = workspace.admin(user, credentials(user)).unwrap();
    admin.git_mut().set_default_signature(user, "test@example.com");
    admin
}

#[test]
fn admin_materializes_and_loads_configuration() {
    let fixture = ServerFixture::new();
    let workspace = fixture.workspace();

    let admin = admin_for(&workspace, "alice");

    assert_eq!(
        admin.conf().list("projects/"),
        vec!["my-first-project", "my-next-project"]
    );
    assert_eq!(admin.conf().list("templates/"), vec!["my-first-template"]);

    let entry = admin.conf().get("projects/my-first-project").unwrap();
    assert_eq!(entry.rules.len(), 3);
    assert_eq!(entry.rules[0], Rule::new(Permission::Read, ["alice"]));
}

#[test]
fn repeated_materialization_is_idempotent() {
    let fixture = ServerFixture::new();
    let workspace = fixture.workspace();

    let first = admin_for(&workspace, "alice");
    let second = admin_for(&workspace, "alice");

    assert_eq!(first.conf(), second.conf());
    assert_eq!(
        second.git().head_oid().unwrap().unwrap().to_string(),
        fixture.admin_tip()
    );
}

#[test]
fn save_publishes_to_remote_and_other_users() {
    let fixture = ServerFixture::new();
    let workspace = fixture.workspace();
    let tip_before = fixture.admin_tip();

    let mut alice = admin_for(&workspace, "alice");
    let mut entry = RepoEntry::new("projects/new-project");
    entry.rules.push(Rule::new(Permission::ReadWrite, ["alice"]));
    alice.conf_mut().add(entry).unwrap();
    alice
        .save("Added project 'new-project'", "origin", "master")
        .unwrap();

    assert_ne!(fixture.admin_tip(), tip_before);
    assert_eq!(
        alice.git().head_oid().unwrap().unwrap().to_string(),
        fixture.admin_tip()
    );

    // A different user's clone reconciles to the published state.
    let bob = admin_for(&workspace, "bob");
    assert!(bob.conf().contains("projects/new-project"));
    assert_eq!(
        bob.conf().get("projects/new-project").unwrap().rules,
        vec![Rule::new(Permission::ReadWrite, ["alice"])]
    );
}

#[test]
fn stale_clone_fast_forwards_on_next_materialization() {
    let fixture = ServerFixture::new();
    let workspace = fixture.workspace();

    // alice clones, then bob publishes a change.
    let _alice = admin_for(&workspace, "alice");

    let mut bob = admin_for(&workspace, "bob");
    bob.conf_mut()
        .add(RepoEntry::new("projects/from-bob"))
        .unwrap();
    bob.save("Added project 'from-bob'", "origin", "master")
        .unwrap();

    // alice's next request sees bob's change.
    let alice = admin_for(&workspace, "alice");
    assert!(alice.conf().contains("projects/from-bob"));
}

#[test]
fn patched_entry_round_trips_through_save() {
    let fixture = ServerFixture::new();
    let workspace = fixture.workspace();

    let mut alice = admin_for(&workspace, "alice");
    let patches: Vec<PatchOperation> = serde_json::from_value(serde_json::json!([
        { "op": "add", "path": "/rules/0", "value": { "perm": "RW", "users": ["dave"] } },
        { "op": "remove", "path": "/rules/0" }
    ]))
    .unwrap();

    let entry = alice.conf_mut().get_mut("projects/my-first-project").unwrap();
    apply(entry, &patches).unwrap();
    alice
        .save("Updated project 'my-first-project'", "origin", "master")
        .unwrap();

    let bob = admin_for(&workspace, "bob");
    let entry = bob.conf().get("projects/my-first-project").unwrap();
    assert_eq!(
        entry.rules,
        vec![
            Rule::new(Permission::ReadWrite, ["bob"]),
            Rule::new(Permission::Create, ["eve"]),
            Rule::new(Permission::ReadWrite, ["dave"]),
        ]
    );
}

#[test]
fn removed_entry_disappears_for_everyone() {
    let fixture = ServerFixture::new();
    let workspace = fixture.workspace();

    let mut alice = admin_for(&workspace, "alice");
    alice.conf_mut().remove("projects/my-next-project").unwrap();
    alice
        .save("Removed project 'my-next-project'", "origin", "master")
        .unwrap();

    let bob = admin_for(&workspace, "bob");
    assert!(!bob.conf().contains("projects/my-next-project"));
    assert_eq!(bob.conf().list("projects/"), vec!["my-first-project"]);
}

#[test]
fn project_repository_materializes_under_prefix() {
    let fixture = ServerFixture::new();
    fixture.create_remote(
        "projects/my-first-project",
        &[("README.md", "# my-first-project\n")],
    );
    let workspace = fixture.workspace();

    let repo = workspace
        .project("alice", "my-first-project", credentials("alice"))
        .unwrap();

    let workdir = repo.workdir().unwrap();
    assert!(workdir.ends_with("alice/projects/my-first-project"));
    assert!(workdir.join("README.md").exists());
}

#[test]
fn hostile_names_never_escape_the_workspace() {
    let fixture = ServerFixture::new();
    let workspace = fixture.workspace();

    let result = workspace.admin("../../etc", credentials("x"));
    assert!(matches!(result, Err(WorkspaceError::UnsafePath { .. })));

    let result = workspace.project("alice", "../admin", credentials("alice"));
    assert!(matches!(result, Err(WorkspaceError::UnsafePath { .. })));
}

#[test]
fn resource_lock_is_exclusive_per_user_resource() {
    let fixture = ServerFixture::new();
    let workspace = fixture.workspace();

    let guard = workspace.lock("alice", "admin").unwrap();
    assert!(guard.is_held());

    // Same pair contends; other pairs do not.
    let contended = workspace.lock("alice", "admin");
    assert!(matches!(
        contended,
        Err(WorkspaceError::Lock(LockError::AlreadyLocked))
    ));
    let other_user = workspace.lock("bob", "admin").unwrap();
    let other_resource = workspace.lock("alice", "projects/my-first-project").unwrap();

    drop(guard);
    drop(other_user);
    drop(other_resource);

    // Released locks can be reacquired.
    let reacquired = workspace.lock("alice", "admin").unwrap();
    assert!(reacquired.is_held());
}
