//! Filesystem guards shared by the file and shell tools.
//!
//! [`PathPolicy`] blocks forbidden prefixes such as `~/.ssh`.
//! [`DeletionGuard`] refuses commands that would delete an installation or
//! data root (or any ancestor of one). Deleting files inside those roots
//! stays allowed. `~`, `$HOME` and `%USERPROFILE%` resolve to the home
//! directory; a delete target using any other variable is refused.

use ember_core::error::ToolError;
use std::path::{Component, Path, PathBuf};

/// Prefixes that stand for the user's home directory.
const HOME_PREFIXES: &[&str] = &["~", "$HOME", "${HOME}", "%USERPROFILE%", "%HOME%"];

/// Verbs that remove things from disk.
const DELETE_VERBS: &[&str] = &[
    "rm", "rmdir", "unlink", "shred", "del", "erase", "rd", "remove-item", "ri",
];

#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    forbidden: Vec<String>,
    base: Option<PathBuf>,
}

impl PathPolicy {
    pub fn new(forbidden: Vec<String>) -> Self {
        Self {
            forbidden,
            base: None,
        }
    }

    /// Resolve relative paths against `base` instead of the process cwd.
    pub fn with_base(mut self, base: PathBuf) -> Self {
        self.base = Some(base);
        self
    }

    /// Resolve `path` and reject it if it falls under a forbidden prefix.
    pub fn check(&self, tool: &str, path: &str) -> Result<PathBuf, ToolError> {
        let expanded = expand_home(path);
        let resolved = match &self.base {
            Some(base) if expanded.is_relative() => resolve(&base.join(expanded)),
            _ => resolve(&expanded),
        };
        let normalized = to_key(&resolved);

        for forbidden in &self.forbidden {
            let prefix = to_key(&normalize(&expand_home(forbidden)));
            if normalized == prefix || normalized.starts_with(&format!("{prefix}/")) {
                return Err(ToolError::PermissionDenied {
                    tool_name: tool.into(),
                    reason: format!("'{path}' is under forbidden path '{forbidden}'"),
                });
            }
        }
        Ok(resolved)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeletionGuard {
    protected: Vec<PathBuf>,
}

impl DeletionGuard {
    pub fn new(protected: Vec<PathBuf>) -> Self {
        Self {
            protected: protected.iter().map(|p| normalize(&absolute(p))).collect(),
        }
    }

    pub fn protected(&self) -> &[PathBuf] {
        &self.protected
    }

    /// Refuse `command` if any delete verb in it targets a protected root
    /// or one of its ancestors. `cwd` resolves relative targets.
    pub fn check_command(&self, tool: &str, command: &str, cwd: &Path) -> Result<(), ToolError> {
        for segment in command.split([';', '|', '&', '\n']) {
            let tokens: Vec<&str> = segment
                .split_whitespace()
                .map(|t| t.trim_matches(['"', '\'']))
                .filter(|t| !t.is_empty())
                .collect();

            for token in deletion_targets(&tokens) {
                let target = deletion_target(token, cwd);
                if has_unresolved_variable(&target) {
                    return Err(ToolError::PermissionDenied {
                        tool_name: tool.into(),
                        reason: format!(
                            "refusing to delete '{token}': the target depends on a variable that cannot be checked"
                        ),
                    });
                }
                if let Some(root) = self.protected.iter().find(|root| root.starts_with(&target)) {
                    return Err(ToolError::PermissionDenied {
                        tool_name: tool.into(),
                        reason: format!(
                            "refusing to delete '{token}': it would remove {}; delete specific files instead",
                            root.display()
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// True if `path` is one of the protected roots themselves.
    pub fn is_protected_root(&self, path: &Path) -> bool {
        let target = normalize(&absolute(path));
        self.protected.iter().any(|root| root.starts_with(&target))
    }
}

/// Arguments of the first delete verb in one command segment, plus the
/// search roots of a `find ... -delete`.
fn deletion_targets<'a>(tokens: &[&'a str]) -> Vec<&'a str> {
    let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
    let mut targets = Vec::new();

    if let Some(verb) = lowered.iter().position(|t| DELETE_VERBS.contains(&t.as_str())) {
        targets.extend(tokens[verb + 1..].iter().copied().filter(|t| !t.starts_with('-')));
    }
    if lowered.iter().any(|t| t == "-delete")
        && let Some(find) = lowered.iter().position(|t| t == "find")
    {
        targets.extend(tokens[find + 1..].iter().copied().take_while(|t| !t.starts_with('-')));
    }
    targets
}

/// A wildcard deletes the directory's contents, so treat it as the directory.
fn deletion_target(token: &str, cwd: &Path) -> PathBuf {
    let trimmed = token.trim_end_matches('*').trim_end_matches(['/', '\\']);
    let base = if trimmed.is_empty() && token.starts_with('/') {
        PathBuf::from("/")
    } else if trimmed.is_empty() || trimmed == "." {
        cwd.to_path_buf()
    } else {
        let expanded = expand_home(trimmed);
        if expanded.is_absolute() { expanded } else { cwd.join(expanded) }
    };
    normalize(&base)
}

fn resolve(expanded: &Path) -> PathBuf {
    // Canonicalize when possible so symlinks cannot dodge the prefix check
    if let Ok(canonical) = expanded.canonicalize() {
        return canonical;
    }
    if let (Some(parent), Some(name)) = (expanded.parent(), expanded.file_name())
        && let Ok(parent) = parent.canonicalize()
    {
        return parent.join(name);
    }
    normalize(&absolute(expanded))
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    }
}

/// Lexically fold `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn to_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn expand_home(path: &str) -> PathBuf {
    for prefix in HOME_PREFIXES {
        let Some(head) = path.get(..prefix.len()) else {
            continue;
        };
        // %VAR% is case-insensitive on Windows, $VAR is not
        let matches =
            head == *prefix || (prefix.starts_with('%') && head.eq_ignore_ascii_case(prefix));
        let rest = &path[prefix.len()..];
        if matches
            && (rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\'))
            && let Some(home) = home_dir()
        {
            return PathBuf::from(format!("{home}{rest}"));
        }
    }
    PathBuf::from(path)
}

/// A `$VAR` or `%VAR%` the shell would expand but we could not.
fn has_unresolved_variable(path: &Path) -> bool {
    let text = path.to_string_lossy();
    text.contains('$') || text.matches('%').count() >= 2
}

fn home_dir() -> Option<String> {
    std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")).ok()
}
