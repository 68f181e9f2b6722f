use std::env;
use std::path::{Path, PathBuf};

/// Expand `~` and make a configured path absolute against the working directory.
pub fn sanitize(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path.trim()).to_string();
    absolute(Path::new(&expanded))
}

/// Like [`sanitize`], but keeps a trailing `/`. rsync treats `dir/` and `dir`
/// differently, so sources must preserve it.
pub fn sanitize_keep_trailing_slash(path: &str) -> String {
    let trimmed = path.trim();
    let mut out = sanitize(trimmed).to_string_lossy().to_string();
    if trimmed.ends_with('/') && !out.ends_with('/') {
        out.push('/');
    }
    out
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
