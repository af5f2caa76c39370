//! Registry install, list, remove and repair against a mock registry

mod helper;

use std::fs;

use mockito::{Matcher, Mock, Server, ServerGuard};

use helper::{Workspace, zip_bytes};
use lspotato::Error;
use lspotato::error::ErrorKind;
use lspotato::link::error::LinkError;
use lspotato::link::store::LinkStore;
use lspotato::registry::credentials::Credential;

const POINTER: &str = "metadata:\n  user: acme\n  repository: pack-repo\n  branch: main\n  credentails: none\n";

const LINKED_OBJECTS: &str = "linked-objects-in-files:\n  trees.blend: Tree\n  missing.blend: Ghost\n";

fn creator_manifest(versions: &[&str]) -> String {
    creator_manifest_linking(versions, LINKED_OBJECTS)
}

fn creator_manifest_linking(versions: &[&str], linked_objects: &str) -> String {
    let mut yaml = String::from("versions:\n");
    for version in versions {
        yaml.push_str(&format!(
            "  {version}:\n    tag: v{version}\n    release-file: pack-{version}.zip\n"
        ));
    }
    yaml.push_str(linked_objects);
    yaml
}

async fn mock_pointer(server: &mut ServerGuard, body: &str, hits: usize) -> Mock {
    server
        .mock("GET", "/lvoxx/LSRegistry/main/io/github/acme/pack/registry.yaml")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

async fn mock_creator(server: &mut ServerGuard, versions: &[&str]) -> Mock {
    server
        .mock("GET", "/acme/pack-repo/main/registry.ls.yaml")
        .with_body(creator_manifest(versions))
        .expect_at_least(1)
        .create_async()
        .await
}

async fn mock_release(server: &mut ServerGuard, version: &str, hits: usize) -> Mock {
    let files = [
        ("pack/trees.blend", "trees"),
        ("pack/textures/bark.png", "png"),
    ];
    mock_release_of(server, version, &files, hits).await
}

async fn mock_release_of(
    server: &mut ServerGuard,
    version: &str,
    files: &[(&str, &str)],
    hits: usize,
) -> Mock {
    server
        .mock(
            "GET",
            format!("/acme/pack-repo/releases/download/v{version}/pack-{version}.zip").as_str(),
        )
        .with_body(zip_bytes(files))
        .expect(hits)
        .create_async()
        .await
}

#[tokio::test]
async fn install_extracts_under_document_and_links_listed_objects() {
    let mut server = Server::new_async().await;
    let _pointer = mock_pointer(&mut server, POINTER, 1).await;
    let _creator = mock_creator(&mut server, &["1.0.0"]).await;
    let release = mock_release(&mut server, "1.0.0", 1).await;
    let ws = Workspace::new();
    let installer = ws.registry_installer(&server, vec![]);

    let records = installer
        .install("io.github.acme.pack", "1.0.0")
        .await
        .unwrap();

    release.assert_async().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].owner, "lsregistry:io.github.acme.pack");
    assert_eq!(records[0].anchor_name, "trees.blend/Tree");
    assert_eq!(
        records[0].backing_path,
        "//registry/io.github.acme.pack_1.0.0/trees.blend"
    );

    let registry_dir = ws.document_dir.join("registry");
    assert!(registry_dir.join("io.github.acme.pack_1.0.0/textures/bark.png").is_file());
    assert!(registry_dir.join("metadata/io.github.acme.pack/registry.yaml").is_file());
    assert!(registry_dir.join("metadata/io.github.acme.pack/registry.ls.yaml").is_file());
    assert_eq!(installer.installed().unwrap(), vec!["io.github.acme.pack:1.0.0"]);
}

#[tokio::test]
async fn install_new_version_replaces_previous_links() {
    let mut server = Server::new_async().await;
    let _pointer = mock_pointer(&mut server, POINTER, 2).await;
    let _creator = mock_creator(&mut server, &["1.0.0", "1.1.0"]).await;
    let _v1 = mock_release(&mut server, "1.0.0", 1).await;
    let _v2 = mock_release(&mut server, "1.1.0", 1).await;
    let ws = Workspace::new();
    let installer = ws.registry_installer(&server, vec![]);
    installer
        .install("io.github.acme.pack", "1.0.0")
        .await
        .unwrap();

    installer
        .install("io.github.acme.pack", "1.1.0")
        .await
        .unwrap();

    assert_eq!(installer.installed().unwrap(), vec!["io.github.acme.pack:1.1.0"]);
}

#[tokio::test]
async fn install_of_release_without_listed_blend_files_keeps_previous_links() {
    let mut server = Server::new_async().await;
    let _pointer = mock_pointer(&mut server, POINTER, 2).await;
    let _creator = mock_creator(&mut server, &["1.0.0", "1.1.0"]).await;
    let _v1 = mock_release(&mut server, "1.0.0", 1).await;
    let _v2 = mock_release_of(&mut server, "1.1.0", &[("pack/readme.txt", "no blend")], 1).await;
    let ws = Workspace::new();
    let installer = ws.registry_installer(&server, vec![]);
    let before = installer
        .install("io.github.acme.pack", "1.0.0")
        .await
        .unwrap();

    let result = installer.install("io.github.acme.pack", "1.1.0").await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Link);
    assert!(matches!(err, Error::Link(LinkError::MissingSource(_))));
    assert_eq!(installer.installed().unwrap(), vec!["io.github.acme.pack:1.0.0"]);
    let after = ws.store.records("lsregistry:io.github.acme.pack").unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn install_all_reports_release_without_blend_files_as_failed() {
    let mut server = Server::new_async().await;
    let _pointer = mock_pointer(&mut server, POINTER, 1).await;
    let _creator = mock_creator(&mut server, &["1.0.0"]).await;
    let _release = mock_release_of(&mut server, "1.0.0", &[("pack/readme.txt", "x")], 1).await;
    let ws = Workspace::new();
    let installer = ws.registry_installer(&server, vec![]);

    let report = installer.install_all("io.github.acme.pack:1.0.0").await.unwrap();

    assert!(report.installed.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].entry, "io.github.acme.pack:1.0.0");
    assert!(installer.installed().unwrap().is_empty());
}

#[tokio::test]
async fn install_ignores_linked_files_outside_the_release() {
    let mut server = Server::new_async().await;
    let _pointer = mock_pointer(&mut server, POINTER, 1).await;
    let _creator = server
        .mock("GET", "/acme/pack-repo/main/registry.ls.yaml")
        .with_body(creator_manifest_linking(
            &["1.0.0"],
            "linked-objects-in-files:\n  ../../outside.blend: Intruder\n  trees.blend: Tree\n",
        ))
        .create_async()
        .await;
    let _release = mock_release(&mut server, "1.0.0", 1).await;
    let ws = Workspace::new();
    fs::write(ws.temp.path().join("outside.blend"), "not part of the package").unwrap();
    let installer = ws.registry_installer(&server, vec![]);

    let records = installer
        .install("io.github.acme.pack", "1.0.0")
        .await
        .unwrap();

    let anchors: Vec<&str> = records.iter().map(|r| r.anchor_name.as_str()).collect();
    assert_eq!(anchors, vec!["trees.blend/Tree"]);
    assert!(records.iter().all(|r| !r.backing_path.contains("outside")));
}

#[tokio::test]
async fn install_with_only_escaping_linked_files_fails_without_links() {
    let mut server = Server::new_async().await;
    let _pointer = mock_pointer(&mut server, POINTER, 1).await;
    let _creator = server
        .mock("GET", "/acme/pack-repo/main/registry.ls.yaml")
        .with_body(creator_manifest_linking(
            &["1.0.0"],
            "linked-objects-in-files:\n  ../../outside.blend: Intruder\n",
        ))
        .create_async()
        .await;
    let _release = mock_release(&mut server, "1.0.0", 1).await;
    let ws = Workspace::new();
    fs::write(ws.temp.path().join("outside.blend"), "not part of the package").unwrap();
    let installer = ws.registry_installer(&server, vec![]);

    let result = installer.install("io.github.acme.pack", "1.0.0").await;

    assert!(matches!(
        result,
        Err(Error::Link(LinkError::UnsafeSource(file))) if file == "../../outside.blend"
    ));
    assert!(installer.installed().unwrap().is_empty());
}

#[tokio::test]
async fn install_all_skips_invalid_and_installed_entries_and_continues_after_failure() {
    let mut server = Server::new_async().await;
    let _pointer = mock_pointer(&mut server, POINTER, 2).await;
    let _creator = mock_creator(&mut server, &["1.0.0"]).await;
    let _release = mock_release(&mut server, "1.0.0", 1).await;
    let _unknown = server
        .mock("GET", "/lvoxx/LSRegistry/main/io/github/nobody/registry.yaml")
        .with_status(404)
        .create_async()
        .await;
    let ws = Workspace::new();
    let installer = ws.registry_installer(&server, vec![]);

    let input = "io.github.nobody:1.0.0\nnot a request\nio.github.acme.pack:1.0.0\n\nio.github.acme.pack:1.0.0\nio.github.acme.pack:9.9.9\n";
    let report = installer.install_all(input).await.unwrap();

    assert_eq!(report.installed, vec!["io.github.acme.pack:1.0.0"]);
    let skipped: Vec<&str> = report.skipped.iter().map(|i| i.entry.as_str()).collect();
    assert_eq!(skipped, vec!["not a request", "io.github.acme.pack:1.0.0"]);
    let failed: Vec<&str> = report.failed.iter().map(|i| i.entry.as_str()).collect();
    assert_eq!(failed, vec!["io.github.nobody:1.0.0", "io.github.acme.pack:9.9.9"]);
}

#[tokio::test]
async fn private_registry_sends_token_to_creator_and_release() {
    let mut server = Server::new_async().await;
    let pointer_body = POINTER.replace("credentails: none", "credentails: private");
    let _pointer = mock_pointer(&mut server, &pointer_body, 1).await;
    let creator = server
        .mock("GET", "/acme/pack-repo/main/registry.ls.yaml")
        .match_header("authorization", "Bearer ghp_secret")
        .with_body(creator_manifest(&["1.0.0"]))
        .create_async()
        .await;
    let release = server
        .mock("GET", "/acme/pack-repo/releases/download/v1.0.0/pack-1.0.0.zip")
        .match_header("authorization", "Bearer ghp_secret")
        .with_body(zip_bytes(&[("trees.blend", "trees")]))
        .create_async()
        .await;
    let ws = Workspace::new();
    let installer = ws.registry_installer(
        &server,
        vec![Credential {
            namespace: "io.github.acme.pack".to_string(),
            token: "ghp_secret".to_string(),
        }],
    );

    installer
        .install("io.github.acme.pack", "1.0.0")
        .await
        .unwrap();

    creator.assert_async().await;
    release.assert_async().await;
}

#[tokio::test]
async fn remove_clears_namespace_links() {
    let mut server = Server::new_async().await;
    let _pointer = mock_pointer(&mut server, POINTER, 1).await;
    let _creator = mock_creator(&mut server, &["1.0.0"]).await;
    let _release = mock_release(&mut server, "1.0.0", 1).await;
    let ws = Workspace::new();
    let installer = ws.registry_installer(&server, vec![]);
    installer
        .install("io.github.acme.pack", "1.0.0")
        .await
        .unwrap();

    assert_eq!(installer.remove("io.github.acme.pack").unwrap(), 1);

    assert!(installer.installed().unwrap().is_empty());
}

#[tokio::test]
async fn repair_uses_saved_metadata_and_second_run_is_clean() {
    let mut server = Server::new_async().await;
    // Fetched by the install only; repair reads the saved copy
    let pointer = mock_pointer(&mut server, POINTER, 1).await;
    let _creator = mock_creator(&mut server, &["1.0.0"]).await;
    let release = mock_release(&mut server, "1.0.0", 2).await;
    let ws = Workspace::new();
    let installer = ws.registry_installer(&server, vec![]);
    installer
        .install("io.github.acme.pack", "1.0.0")
        .await
        .unwrap();
    fs::remove_dir_all(
        ws.document_dir
            .join("registry/io.github.acme.pack_1.0.0"),
    )
    .unwrap();

    let report = installer.repair().await.unwrap();

    assert_eq!(report.repaired, 1);
    assert!(report.failed.is_empty() && report.skipped.is_empty());
    assert!(
        ws.document_dir
            .join("registry/io.github.acme.pack_1.0.0/trees.blend")
            .is_file()
    );

    let second = installer.repair().await.unwrap();
    assert!(second.is_clean());
    pointer.assert_async().await;
    release.assert_async().await;
}

#[tokio::test]
async fn repair_without_installed_packages_is_clean() {
    let mut server = Server::new_async().await;
    let untouched = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let ws = Workspace::new();
    let installer = ws.registry_installer(&server, vec![]);

    let report = installer.repair().await.unwrap();

    assert!(report.is_clean());
    untouched.assert_async().await;
}
