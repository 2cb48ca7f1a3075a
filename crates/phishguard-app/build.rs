use std::fs;
use std::path::{Path, PathBuf};

fn workspace_version_file() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    Path::new(&manifest_dir).join("..").join("..").join("VERSION")
}

fn main() {
    let version_file = workspace_version_file();
    println!("cargo:rerun-if-changed={}", version_file.display());

    let contents = fs::read_to_string(&version_file)
        .unwrap_or_else(|error| panic!("cannot read {}: {error}", version_file.display()));
    let version = contents.trim();
    if version.is_empty() {
        panic!("{} is empty", version_file.display());
    }

    println!("cargo:rustc-env=PHISHGUARD_VERSION={version}");
}
