//! Path, shell and terminal helpers shared across modules.

use owo_colors::OwoColorize;
use std::path::{Component, Path, PathBuf};

/// `error:` prefix for stderr messages, red unless `NO_COLOR` is set.
pub fn error_prefix() -> String {
    colored_prefix("error:", std::env::var_os("NO_COLOR").is_none())
}

fn colored_prefix(label: &str, color: bool) -> String {
    if color {
        label.red().bold().to_string()
    } else {
        label.to_string()
    }
}

/// Lexically normalize a path, resolving `.` and `..` without touching the
/// filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make `path` absolute against the current directory, then normalize.
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize_path(&cwd.join(path)),
        Err(_) => normalize_path(path),
    }
}

/// Render a path relative to the working directory when it lives below it.
pub fn rel_to_wd(p: &Path) -> String {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(rel) = pathdiff::diff_paths(p, &cwd) {
            if !rel.starts_with("..") && !rel.as_os_str().is_empty() {
                return rel.to_string_lossy().to_string();
            }
        }
    }
    p.to_string_lossy().to_string()
}

/// Quote one argument for a POSIX shell when it needs it.
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
