use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    // Version comes from the VERSION file at the workspace root
    let version_file = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
        .parent()
        .unwrap()
        .join("VERSION");
    let version = fs::read_to_string(&version_file)
        .expect("Failed to read VERSION file")
        .trim()
        .to_string();
    println!("cargo:rustc-env=DUALFLASH_VERSION={}", version);
    println!("cargo:rerun-if-changed={}", version_file.display());
}
