use anyhow::{Result, anyhow};
use log::{debug, info, trace};
use std::{
    env,
    path::{Path, PathBuf},
};

pub fn find_git_root() -> Result<PathBuf> {
    find_git_root_from(&env::current_dir()?)
}

pub fn find_git_root_from(start: &Path) -> Result<PathBuf> {
    debug!("Searching for git root");
    let mut current_dir = start.to_path_buf();
    trace!("Starting search from: {:?}", current_dir);

    loop {
        let git_dir = current_dir.join(".git");
        trace!("Checking for .git at: {:?}", git_dir);
        if git_dir.exists() {
            debug!("Found git root at: {:?}", current_dir);
            return Ok(current_dir);
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => {
                debug!("Could not find .git directory in any parent folder");
                return Err(anyhow!("Could not find .git directory in any parent folder"));
            }
        }
    }
}

/// Resolve the project root: the given directory if any, else the enclosing git root.
pub fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    let root = if let Some(r) = root {
        debug!("Using provided root directory: {:?}", r);
        r.canonicalize().unwrap_or(r)
    } else {
        debug!("No root provided, searching for git root");
        find_git_root()?
    };
    info!("Using root directory: {}", root.display());
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_git_root_from_nested_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();

        let subdir = root.join("host").join("dist");
        fs::create_dir_all(&subdir).unwrap();

        let git_root = find_git_root_from(&subdir).unwrap();
        assert_eq!(git_root.canonicalize().unwrap(), root.canonicalize().unwrap());
    }

    #[test]
    fn test_find_git_root_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let subdir = temp_dir.path().join("nested").join("deep");
        fs::create_dir_all(&subdir).unwrap();

        // Only fails if no ancestor of the temp dir is a repository
        if find_git_root_from(temp_dir.path()).is_err() {
            assert!(find_git_root_from(&subdir).is_err());
        }
    }

    #[test]
    fn test_resolve_root_prefers_explicit_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = resolve_root(Some(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(root, temp_dir.path().canonicalize().unwrap());
    }
}
