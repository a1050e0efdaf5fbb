use std::process::Command;

/// Run git in the package root; `None` when git is missing or the command fails.
fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-changed=.git/refs/");

    // Dev builds report `<short hash>` with `+dirty` for uncommitted changes
    let revision = match git(&["rev-parse", "--short=8", "HEAD"]) {
        Some(hash) if git(&["status", "--porcelain"]).is_some_and(|s| !s.is_empty()) => {
            format!("{hash}+dirty")
        }
        Some(hash) => hash,
        None => String::new(),
    };
    let release = git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some();

    println!("cargo:rustc-env=BUILD_GIT_HASH={revision}");
    println!("cargo:rustc-env=BUILD_ON_RELEASE_TAG={release}");
}
