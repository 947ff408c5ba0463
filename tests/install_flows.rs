//! End-to-end install flows against a local HTTP server, using the real
//! downloader, extractor, cache resolver, and process executor.

use std::fs;
use std::path::Path;

use node_provision::{
    Arch, CommandExecutor, DefaultArchiveExtractor, DirectoryCacheResolver, HttpFileDownloader,
    InstallRequest, NodeInstaller, NpmMode, Os, Platform,
};

/// Builds a node tar.gz whose binary is a shell script reporting `version`,
/// so the already-installed probe can actually execute it.
fn build_node_tar_gz(path: &Path, version: &str) {
    let folder = format!("node-{version}-linux-x64");
    let script = format!("#!/bin/sh\necho {version}\n");

    let file = fs::File::create(path).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_size(script.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
        .append_data(&mut header, format!("{folder}/bin/node"), script.as_bytes())
        .unwrap();

    let mut header = tar::Header::new_gnu();
    header.set_size(2);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(
            &mut header,
            format!("{folder}/lib/node_modules/npm/bin/npm"),
            &b"#!"[..],
        )
        .unwrap();

    builder.into_inner().unwrap().finish().unwrap();
}

fn installer(install_dir: &Path, cache_root: &Path) -> NodeInstaller {
    NodeInstaller::with_collaborators(
        install_dir,
        Platform::new(Os::Linux, Arch::X64),
        Box::new(DirectoryCacheResolver::new(cache_root)),
        Box::new(HttpFileDownloader),
        Box::new(DefaultArchiveExtractor),
        Box::new(CommandExecutor),
    )
}

#[test]
#[cfg(unix)]
fn install_is_idempotent_across_calls() {
    let mut server = mockito::Server::new();
    let workspace = tempfile::tempdir().unwrap();

    let archive = workspace.path().join("fixture.tar.gz");
    build_node_tar_gz(&archive, "v18.17.1");
    let body = fs::read(&archive).unwrap();

    // The download must happen exactly once: the second install is satisfied
    // by the version probe, the third by the download cache.
    let mock = server
        .mock("GET", "/v18.17.1/node-v18.17.1-linux-x64.tar.gz")
        .with_status(200)
        .with_body(&body)
        .expect(1)
        .create();

    let install_dir = workspace.path().join("project");
    let cache_root = workspace.path().join("cache");
    let installer = installer(&install_dir, &cache_root);

    let request = InstallRequest::new("v18.17.1", NpmMode::Default)
        .unwrap()
        .with_download_root(format!("{}/", server.url()));

    installer.install(&request).unwrap();
    let node = install_dir.join("node/node");
    assert!(node.is_file());

    // Second call: the freshly installed script answers the probe.
    installer.install(&request).unwrap();
    mock.assert();

    // Wipe the binary but keep the cache: reinstall without a download.
    fs::remove_file(&node).unwrap();
    installer.install(&request).unwrap();
    assert!(node.is_file());
    mock.assert();
}

#[test]
fn hash_verified_install_succeeds_and_mismatch_fails() {
    use sha2::{Digest, Sha256};

    let mut server = mockito::Server::new();
    let workspace = tempfile::tempdir().unwrap();

    let archive = workspace.path().join("fixture.tar.gz");
    build_node_tar_gz(&archive, "v20.5.0");
    let body = fs::read(&archive).unwrap();
    let good_hash = format!("{:x}", Sha256::digest(&body));

    server
        .mock("GET", "/v20.5.0/node-v20.5.0-linux-x64.tar.gz")
        .with_status(200)
        .with_body(&body)
        .create();

    let install_dir = workspace.path().join("project");
    let cache_root = workspace.path().join("cache");
    let installer = installer(&install_dir, &cache_root);
    let root = format!("{}/", server.url());

    // Uppercase digest: comparison is case-insensitive.
    let request = InstallRequest::new("v20.5.0", NpmMode::Default)
        .unwrap()
        .with_download_root(root.clone())
        .with_download_hash(good_hash.to_uppercase());
    installer.install(&request).unwrap();
    assert!(install_dir.join("node/node").is_file());

    // Same cached archive, wrong expectation: classified as an integrity
    // failure before extraction.
    fs::remove_file(install_dir.join("node/node")).unwrap();
    let request = InstallRequest::new("v20.5.0", NpmMode::Default)
        .unwrap()
        .with_download_root(root)
        .with_download_hash("0000000000000000000000000000000000000000000000000000000000000000");
    let result = installer.install(&request);
    assert!(matches!(
        result,
        Err(node_provision::InstallError::Integrity { .. })
    ));
    assert!(!install_dir.join("node/node").exists());
}

#[test]
fn truncated_download_recovers_on_the_next_call() {
    let mut server = mockito::Server::new();
    let workspace = tempfile::tempdir().unwrap();

    let archive = workspace.path().join("fixture.tar.gz");
    build_node_tar_gz(&archive, "v18.17.1");
    let body = fs::read(&archive).unwrap();

    // First response is cut off mid-archive, second is complete.
    let broken = server
        .mock("GET", "/v18.17.1/node-v18.17.1-linux-x64.tar.gz")
        .with_status(200)
        .with_body(&body[..body.len() / 2])
        .expect(1)
        .create();

    let install_dir = workspace.path().join("project");
    let cache_root = workspace.path().join("cache");
    let installer = installer(&install_dir, &cache_root);
    let request = InstallRequest::new("v18.17.1", NpmMode::Default)
        .unwrap()
        .with_download_root(format!("{}/", server.url()));

    let result = installer.install(&request);
    assert!(matches!(
        result,
        Err(node_provision::InstallError::Extract(
            node_provision::ExtractError::SourceIncomplete { .. }
        ))
    ));
    broken.assert();

    // The corrupt archive was deleted from the cache, so the retry
    // downloads afresh instead of failing on the same broken file.
    let cached = cache_root.join("node/v18.17.1/node-v18.17.1-linux-x64.tar.gz");
    assert!(!cached.exists());
    assert!(!install_dir.join("node/tmp").exists());

    let fixed = server
        .mock("GET", "/v18.17.1/node-v18.17.1-linux-x64.tar.gz")
        .with_status(200)
        .with_body(&body)
        .expect(1)
        .create();

    installer.install(&request).unwrap();
    fixed.assert();
    assert!(install_dir.join("node/node").is_file());
}

#[test]
fn failed_download_surfaces_as_a_download_error() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/v18.17.1/node-v18.17.1-linux-x64.tar.gz")
        .with_status(503)
        .create();

    let workspace = tempfile::tempdir().unwrap();
    let installer = installer(
        &workspace.path().join("project"),
        &workspace.path().join("cache"),
    );
    let request = InstallRequest::new("v18.17.1", NpmMode::Default)
        .unwrap()
        .with_download_root(format!("{}/", server.url()));

    let result = installer.install(&request);
    assert!(matches!(
        result,
        Err(node_provision::InstallError::Download { .. })
    ));
}

#[test]
#[cfg(unix)]
fn bundled_npm_lands_next_to_the_binary() {
    let mut server = mockito::Server::new();
    let workspace = tempfile::tempdir().unwrap();

    let archive = workspace.path().join("fixture.tar.gz");
    build_node_tar_gz(&archive, "v18.17.1");
    server
        .mock("GET", "/v18.17.1/node-v18.17.1-linux-x64.tar.gz")
        .with_status(200)
        .with_body(fs::read(&archive).unwrap())
        .create();

    let install_dir = workspace.path().join("project");
    let installer = installer(&install_dir, &workspace.path().join("cache"));
    let request = InstallRequest::new("v18.17.1", NpmMode::Provided)
        .unwrap()
        .with_download_root(format!("{}/", server.url()));

    installer.install(&request).unwrap();
    assert!(install_dir.join("node/node").is_file());
    assert!(install_dir.join("node/node_modules/npm/bin/npm").is_file());
}
