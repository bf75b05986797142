// CssDeployer Service
// Writes the active theme stylesheet served by the host application

use std::fs;
use std::path::{Path, PathBuf};

const REVERTED_CSS: &str = "/* Theme reverted to host defaults */\n";
const FORBIDDEN_FRAGMENTS: [&str; 2] = ["</style>", "<script"];

#[derive(Debug, thiserror::Error)]
pub enum CssError {
    #[error("Stylesheet contains dangerous content")]
    DangerousContent,

    #[error("Failed to write stylesheet: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct CssDeployer {
    css_path: PathBuf,
}

impl CssDeployer {
    pub fn new(css_path: PathBuf) -> Self {
        log::info!("CssDeployer: stylesheet path={:?}", css_path);
        Self { css_path }
    }

    pub fn css_path(&self) -> &Path {
        &self.css_path
    }

    /// Replace the deployed stylesheet with `css`
    pub fn deploy(&self, css: &str) -> Result<PathBuf, CssError> {
        let lower = css.to_ascii_lowercase();
        if FORBIDDEN_FRAGMENTS.iter().any(|fragment| lower.contains(fragment)) {
            return Err(CssError::DangerousContent);
        }

        self.write(css)?;
        log::info!("Deployed theme stylesheet ({} bytes) to {:?}", css.len(), self.css_path);
        Ok(self.css_path.clone())
    }

    /// Blank out the deployed stylesheet so the host falls back to its defaults
    pub fn revert(&self) -> Result<(), CssError> {
        self.write(REVERTED_CSS)?;
        log::info!("Reverted theme stylesheet at {:?}", self.css_path);
        Ok(())
    }

    fn write(&self, content: &str) -> Result<(), CssError> {
        if let Some(parent) = self.css_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.css_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_deploy_creates_parent_dirs() {
        let temp = tempdir().unwrap();
        let deployer = CssDeployer::new(temp.path().join("public/css/theme.css"));

        let css = ":root { --primary-600: #1C80E3; }";
        let path = deployer.deploy(css).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), css);
    }

    #[test]
    fn test_revert_overwrites() {
        let temp = tempdir().unwrap();
        let deployer = CssDeployer::new(temp.path().join("theme.css"));
        deployer.deploy("body { color: red; }").unwrap();

        deployer.revert().unwrap();
        assert_eq!(fs::read_to_string(deployer.css_path()).unwrap(), REVERTED_CSS);
    }

    #[test]
    fn test_rejects_markup() {
        let temp = tempdir().unwrap();
        let deployer = CssDeployer::new(temp.path().join("theme.css"));

        assert!(matches!(
            deployer.deploy("a{}</STYLE><script>alert(1)</script>"),
            Err(CssError::DangerousContent)
        ));
        assert!(!deployer.css_path().exists());
    }
}
