use std::process::Command;

fn main() {
    // Git commit hash shown by `classpoll version`
    let git_hash = command_output("git", &["rev-parse", "--short", "HEAD"]);
    println!("cargo:rustc-env=CLASSPOLL_GIT_HASH={}", git_hash);

    // Build date
    let build_date = command_output("date", &["+%Y-%m-%d"]);
    println!("cargo:rustc-env=CLASSPOLL_BUILD_DATE={}", build_date);

    // Cargo profile the binary was built with
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=CLASSPOLL_BUILD_PROFILE={}", profile);

    // Packagers may bake in a different default listen address
    let default_bind =
        std::env::var("CLASSPOLL_DEFAULT_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    println!("cargo:rustc-env=CLASSPOLL_DEFAULT_BIND={}", default_bind);
    println!("cargo:rerun-if-env-changed=CLASSPOLL_DEFAULT_BIND");

    // Re-run if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
}

/// Trimmed stdout of a command, or "unknown" when it is missing or fails.
fn command_output(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
