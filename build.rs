use std::env;
use std::process::Command;

// Short commit hash of the working tree, None outside a git checkout
fn git_sha() -> Option<String> {
    let output = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

fn main() {
    println!("cargo:rerun-if-env-changed=CRISPRANK_GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");

    // Packaged builds (no .git) can pass the hash explicitly
    let sha = env::var("CRISPRANK_GIT_SHA")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(git_sha);

    if let Some(sha) = sha {
        println!("cargo:rustc-env=CRISPRANK_GIT_SHA={}", sha);
    }
}
