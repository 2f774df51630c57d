//! Deployment configuration stage.

use serde::{Deserialize, Serialize};

use crate::error::StageError;
use crate::parser::{self, FieldSpec, ParseOutcome, Schema};

use super::{Parsed, RequirementSet, Runner, StageKind, format_requirements};

/// Deployment notes. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// requirements.txt content.
    pub requirements: String,
    pub setup_instructions: String,
    pub github_push: String,
    pub hosting_platforms: String,
}

pub const DEFAULT_REQUIREMENTS: &str = "python-dotenv>=1.0.0
requests>=2.31.0
pytest>=7.4.0";

pub const DEFAULT_SETUP: &str = "1. Install Python 3.10 or higher
2. Create a virtual environment: python -m venv venv
3. Activate the virtual environment:
   - Windows: venv\\Scripts\\activate
   - Linux/Mac: source venv/bin/activate
4. Install dependencies: pip install -r requirements.txt
5. Create a .env file with any required configuration
6. Run the application: python main.py";

pub const DEFAULT_GITHUB_PUSH: &str = "1. Initialize the repository:
   git init

2. Create a .gitignore containing:
   __pycache__/
   *.pyc
   venv/
   .env
   *.log

3. Stage and commit:
   git add .
   git commit -m \"Initial commit\"

4. Create a new repository on GitHub (web interface)

5. Add the remote:
   git remote add origin https://github.com/<user>/<repo>.git

6. Push:
   git branch -M main
   git push -u origin main";

pub const DEFAULT_HOSTING: &str = "Recommended hosting platforms:

1. Render: web services and APIs, free tier, deploys from GitHub on push.
2. Railway: apps with databases, automatic builds from GitHub.
3. Heroku: web apps and APIs via Procfile, CLI or GitHub integration.";

const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("requirements", "[REQUIREMENTS]", DEFAULT_REQUIREMENTS),
    FieldSpec::text("setup_instructions", "[SETUP_INSTRUCTIONS]", DEFAULT_SETUP),
    FieldSpec::text("github_push", "[GITHUB_PUSH]", DEFAULT_GITHUB_PUSH),
    FieldSpec::text("hosting_platforms", "[HOSTING_PLATFORMS]", DEFAULT_HOSTING),
];

pub const SCHEMA: Schema = Schema {
    name: "deployment",
    fields: FIELDS,
    fallback: None,
};

impl DeploymentConfig {
    pub fn from_outcome(out: &ParseOutcome) -> Self {
        Self {
            requirements: out.text("requirements"),
            setup_instructions: out.text("setup_instructions"),
            github_push: out.text("github_push"),
            hosting_platforms: out.text("hosting_platforms"),
        }
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            requirements: DEFAULT_REQUIREMENTS.to_string(),
            setup_instructions: DEFAULT_SETUP.to_string(),
            github_push: DEFAULT_GITHUB_PUSH.to_string(),
            hosting_platforms: DEFAULT_HOSTING.to_string(),
        }
    }
}

/// Parse a model reply into a [`DeploymentConfig`]. Never fails.
pub fn parse_response(raw: &str) -> Parsed<DeploymentConfig> {
    let out = parser::parse(raw, &SCHEMA);
    Parsed {
        value: DeploymentConfig::from_outcome(&out),
        degradation: out.degradation(),
    }
}

pub fn build_prompt(code: &str, reqs: &RequirementSet) -> String {
    format!(
        "Generate deployment configuration for the following Python project. \
         Focus on simplicity and reproducibility.\n\n\
         ORIGINAL REQUIREMENTS:\n{}\n\
         GENERATED CODE:\n```python\n{}\n```\n\n\
         Format your response with these section markers, each on its own line:\n\
         [REQUIREMENTS]\n[SETUP_INSTRUCTIONS]\n[GITHUB_PUSH]\n[HOSTING_PLATFORMS]",
        format_requirements(reqs),
        code
    )
}

/// Only an exhausted invocation fails this stage; parse gaps use defaults.
pub async fn configure(
    runner: &Runner<'_>,
    code: &str,
    reqs: &RequirementSet,
) -> Result<Parsed<DeploymentConfig>, StageError> {
    let raw = runner
        .complete(StageKind::Deployment, &build_prompt(code, reqs))
        .await?;
    Ok(parse_response(&raw))
}
