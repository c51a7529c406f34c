//! Git integration for frappe-diff.
//!
//! frappe-diff can run as an external diff driver. Git then invokes it with
//! seven arguments: `path old-file old-hex old-mode new-file new-hex new-mode`.

use std::env;
use std::process::Command;

const TOOL: &str = "frappe-diff";

pub type GitResult<T> = Result<T, GitError>;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Git is not installed or not in PATH")]
    GitNotFound,

    #[error("Failed to determine frappe-diff executable path")]
    ExecutableNotFound,

    #[error("Git command returned error: {0}")]
    GitError(String),
}

/// Files handed over by git's external diff protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverArgs {
    /// Repository-relative path of the file being diffed
    pub path: String,
    pub old_file: String,
    pub new_file: String,
}

/// Installs frappe-diff as a git difftool and diff driver.
pub fn install() -> GitResult<()> {
    let exe = get_executable_path()?;

    run_git_config(
        &format!("difftool.{}.cmd", TOOL),
        &format!("{} \"$LOCAL\" \"$REMOTE\"", exe),
    )?;
    run_git_config(&format!("difftool.{}.prompt", TOOL), "false")?;
    run_git_config(&format!("diff.{}.command", TOOL), &exe)?;

    println!("Successfully installed {} as git diff driver.", TOOL);
    println!();
    println!("To use it for Frappe metadata, add to .gitattributes:");
    println!("  *.json diff={}", TOOL);
    println!();
    println!("Or run it on demand:");
    println!("  git difftool -t {} HEAD~1 -- path/to/doctype.json", TOOL);

    Ok(())
}

/// Removes frappe-diff from git configuration.
pub fn uninstall() -> GitResult<()> {
    run_git_config_unset(&format!("difftool.{}.cmd", TOOL))?;
    run_git_config_unset(&format!("difftool.{}.prompt", TOOL))?;
    run_git_config_unset(&format!("diff.{}.command", TOOL))?;

    println!("Successfully uninstalled {} from git configuration.", TOOL);

    Ok(())
}

/// Shows the current git configuration for frappe-diff.
pub fn status() -> GitResult<()> {
    println!("Git {} configuration status:", TOOL);
    println!();

    let keys = [
        format!("difftool.{}.cmd", TOOL),
        format!("difftool.{}.prompt", TOOL),
        format!("diff.{}.command", TOOL),
    ];

    let mut configured = false;
    for key in &keys {
        match get_git_config(key) {
            Ok(value) => {
                configured = true;
                println!("  {}: {}", key, value);
            }
            Err(GitError::GitNotFound) => return Err(GitError::GitNotFound),
            Err(_) => println!("  {}: (not configured)", key),
        }
    }

    println!();
    if configured {
        println!("{} is configured.", TOOL);
    } else {
        println!("{} is not configured. Run '{} --git-install' to set up.", TOOL, TOOL);
    }

    Ok(())
}

/// Detects git's 7-argument diff driver protocol.
pub fn detect_git_diff_driver_args(args: &[String]) -> Option<DriverArgs> {
    if args.len() != 7 {
        return None;
    }

    if !is_git_hash(&args[2]) || !is_git_hash(&args[5]) {
        return None;
    }

    Some(DriverArgs {
        path: args[0].clone(),
        old_file: args[1].clone(),
        new_file: args[4].clone(),
    })
}

/// Checks if a file path represents a missing side (/dev/null).
pub fn is_null_file(path: &str) -> bool {
    path == "/dev/null" || path == "nul" || path == "NUL"
}

/// 40-hex object ids, or the `.` git passes for a missing side.
fn is_git_hash(s: &str) -> bool {
    s == "." || (s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit()))
}

fn get_executable_path() -> GitResult<String> {
    env::current_exe()
        .map_err(|_| GitError::ExecutableNotFound)
        .map(|p| p.to_string_lossy().into_owned())
}

fn run_git_config(key: &str, value: &str) -> GitResult<()> {
    let output = Command::new("git")
        .args(["config", "--global", key, value])
        .output()
        .map_err(|_| GitError::GitNotFound)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::GitError(stderr.into_owned()));
    }

    log::debug!("git config --global {} set", key);
    Ok(())
}

fn run_git_config_unset(key: &str) -> GitResult<()> {
    let output = Command::new("git")
        .args(["config", "--global", "--unset", key])
        .output()
        .map_err(|_| GitError::GitNotFound)?;

    // Exit code 5: the key was not set.
    if !output.status.success() && output.status.code() != Some(5) {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::GitError(stderr.into_owned()));
    }

    Ok(())
}

fn get_git_config(key: &str) -> GitResult<String> {
    let output = Command::new("git")
        .args(["config", "--global", "--get", key])
        .output()
        .map_err(|_| GitError::GitNotFound)?;

    if !output.status.success() {
        return Err(GitError::GitError(format!("Key {} not found", key)));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
