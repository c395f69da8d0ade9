use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

fn repo_file(name: &str) -> Result<String> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(name);
    std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
}

/// "1.88" or "1.88.0" -> (1, 88)
fn minor_version(version: &str) -> Result<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next().unwrap_or_default().parse()?;
    let minor = parts.next().unwrap_or_default().parse()?;
    Ok((major, minor))
}

fn builder_toolchain(dockerfile: &str) -> Result<(u32, u32)> {
    let image = dockerfile
        .lines()
        .find_map(|line| line.trim().strip_prefix("FROM rust:"))
        .ok_or_else(|| anyhow!("no rust builder stage"))?;
    let tag = image.split_whitespace().next().unwrap_or_default();
    minor_version(tag.split('-').next().unwrap_or_default())
}

#[test]
fn test_builder_image_meets_rust_version() -> Result<()> {
    let manifest: toml::Table = toml::from_str(&repo_file("Cargo.toml")?)?;
    let rust_version = manifest
        .get("package")
        .and_then(|package| package.get("rust-version"))
        .and_then(|version| version.as_str())
        .ok_or_else(|| anyhow!("package.rust-version missing"))?;

    let builder = builder_toolchain(&repo_file("Dockerfile")?)?;
    assert!(
        builder >= minor_version(rust_version)?,
        "builder {:?} is older than rust-version {}",
        builder,
        rust_version
    );
    Ok(())
}

#[test]
fn test_builder_tag_parsing() -> Result<()> {
    let dockerfile = "# build\nFROM rust:1.88-slim-bookworm AS builder\nFROM debian:bookworm-slim\n";
    assert_eq!(builder_toolchain(dockerfile)?, (1, 88));
    assert!(builder_toolchain("FROM debian:bookworm-slim\n").is_err());
    Ok(())
}

#[test]
fn test_secrets_stay_out_of_build_context() -> Result<()> {
    let ignored = repo_file(".dockerignore")?;
    let patterns: Vec<&str> = ignored.lines().map(str::trim).collect();
    assert!(patterns.contains(&".env"));
    assert!(patterns.contains(&"target/"));
    Ok(())
}
