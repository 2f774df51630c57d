//! Artifact output directory for a pipeline run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::pipeline::PipelineReport;

/// Directory holding one run's generated files.
pub struct Workspace {
    pub root: PathBuf,
    pub name: String,
}

impl Workspace {
    /// Create `base/<name>`, replacing unsafe characters in the name.
    pub async fn create(base: &Path, name: &str) -> Result<Self> {
        let safe_name: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        let root = base.join(&safe_name);
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create {}", root.display()))?;
        Ok(Self {
            root,
            name: safe_name,
        })
    }

    /// Write a file relative to the workspace root.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<String> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, content)
            .await
            .with_context(|| format!("Failed to write {path}"))?;
        Ok(format!("Wrote {} ({} bytes)", path, content.len()))
    }

    /// Write every artifact the report holds. Returns the files written.
    pub async fn save_report(&self, report: &PipelineReport) -> Result<Vec<String>> {
        let mut files: Vec<(&str, String)> = Vec::new();

        if let Some(reqs) = &report.requirements {
            files.push(("requirements.json", serde_json::to_string_pretty(reqs)?));
        }
        if let Some(code) = &report.code {
            files.push(("main.py", code.clone()));
        }
        if let Some(review) = &report.review {
            files.push(("review.md", review.clone()));
        }
        if let Some(docs) = &report.documentation {
            files.push(("README.md", docs.clone()));
        }
        if let Some(tests) = &report.tests {
            files.push(("test_main.py", tests.clone()));
        }
        if let Some(deploy) = &report.deployment {
            files.push(("requirements.txt", deploy.requirements.clone()));
            files.push(("SETUP.md", deploy.setup_instructions.clone()));
            files.push(("GITHUB.md", deploy.github_push.clone()));
            files.push(("HOSTING.md", deploy.hosting_platforms.clone()));
        }

        let mut written = Vec::with_capacity(files.len());
        for (path, content) in files {
            let msg = self.write_file(path, &content).await?;
            tracing::debug!(workspace = %self.name, "{msg}");
            written.push(path.to_string());
        }
        Ok(written)
    }
}
