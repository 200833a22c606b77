//! Configuration read from the environment.

use anyhow::Result;
use log::debug;
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
};
use std::path::{Path, PathBuf};

use crate::binding::BindingNames;
use crate::runtime::Runtime;

/// Directory holding the local binding artifact.
pub const BINDING_DIR_ENV: &str = "PRO_TOOLS_BINDING_DIR";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const GITHUB_API_ENV: &str = "PRO_TOOLS_GITHUB_API";
pub const NPM_REGISTRY_ENV: &str = "PRO_TOOLS_NPM_REGISTRY";

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_NPM_REGISTRY: &str = "https://registry.npmjs.org";

const USER_AGENT: &str = "pro-tools";

/// Where the binding loader looks and which names it looks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub names: BindingNames,
    pub binding_dir: PathBuf,
}

impl LoaderConfig {
    /// `PRO_TOOLS_BINDING_DIR`, else the directory of the running executable,
    /// else the current directory.
    pub fn from_env<R: Runtime>(runtime: &R) -> Self {
        let binding_dir = runtime
            .env_var(BINDING_DIR_ENV)
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                runtime
                    .current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(Path::to_path_buf))
            })
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            names: BindingNames::default(),
            binding_dir,
        }
    }

    pub fn with_binding_dir(mut self, binding_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = binding_dir {
            self.binding_dir = dir;
        }
        self
    }
}

/// Endpoints and credentials used by the changelog and publish tools.
#[derive(Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub github_api: String,
    pub npm_registry: String,
    pub github_token: Option<String>,
}

impl std::fmt::Debug for ToolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolConfig")
            .field("github_api", &self.github_api)
            .field("npm_registry", &self.npm_registry)
            .field("github_token", &self.github_token.as_deref().map(mask_token))
            .finish()
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            github_api: DEFAULT_GITHUB_API.to_string(),
            npm_registry: DEFAULT_NPM_REGISTRY.to_string(),
            github_token: None,
        }
    }
}

impl ToolConfig {
    pub fn from_env<R: Runtime>(runtime: &R) -> Self {
        let var = |key: &str| runtime.env_var(key).ok().filter(|v| !v.is_empty());

        Self {
            github_api: var(GITHUB_API_ENV)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GITHUB_API.to_string()),
            npm_registry: var(NPM_REGISTRY_ENV)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_NPM_REGISTRY.to_string()),
            github_token: var(GITHUB_TOKEN_ENV),
        }
    }

    /// Client for the GitHub API, authenticated when a token is configured.
    pub fn github_client(&self) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        if let Some(token) = &self.github_token {
            let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            auth_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_value);
            debug!("Using GITHUB_TOKEN for authentication: {}", mask_token(token));
        }

        Ok(Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?)
    }

    /// Client for the npm registry. Never carries the GitHub token.
    pub fn registry_client(&self) -> Result<Client> {
        Ok(Client::builder().user_agent(USER_AGENT).build()?)
    }
}

fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*********".to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use mockito::{Matcher, Server};
    use std::env::VarError;

    fn runtime_with_env(vars: &'static [(&'static str, &'static str)]) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime.expect_env_var().returning(move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
                .ok_or(VarError::NotPresent)
        });
        runtime
    }

    #[test]
    fn test_loader_config_prefers_env() {
        let runtime = runtime_with_env(&[(BINDING_DIR_ENV, "/srv/bindings")]);
        let config = LoaderConfig::from_env(&runtime);
        assert_eq!(config.binding_dir, PathBuf::from("/srv/bindings"));
        assert_eq!(config.names, BindingNames::default());
    }

    #[test]
    fn test_loader_config_defaults_to_exe_dir() {
        let mut runtime = runtime_with_env(&[]);
        runtime
            .expect_current_exe()
            .returning(|| Ok(PathBuf::from("/usr/local/bin/pro-tools")));

        let config = LoaderConfig::from_env(&runtime);
        assert_eq!(config.binding_dir, PathBuf::from("/usr/local/bin"));
    }

    #[test]
    fn test_loader_config_cli_override() {
        let runtime = runtime_with_env(&[(BINDING_DIR_ENV, "/srv/bindings")]);
        let config = LoaderConfig::from_env(&runtime).with_binding_dir(Some("/tmp/b".into()));
        assert_eq!(config.binding_dir, PathBuf::from("/tmp/b"));

        let config = LoaderConfig::from_env(&runtime).with_binding_dir(None);
        assert_eq!(config.binding_dir, PathBuf::from("/srv/bindings"));
    }

    #[test]
    fn test_tool_config_defaults() {
        let runtime = runtime_with_env(&[]);
        assert_eq!(ToolConfig::from_env(&runtime), ToolConfig::default());
    }

    #[test]
    fn test_tool_config_overrides() {
        let runtime = runtime_with_env(&[
            (GITHUB_API_ENV, "http://localhost:9000/"),
            (NPM_REGISTRY_ENV, "http://localhost:9001"),
            (GITHUB_TOKEN_ENV, "ghp_0123456789abcdef"),
        ]);
        let config = ToolConfig::from_env(&runtime);
        assert_eq!(config.github_api, "http://localhost:9000");
        assert_eq!(config.npm_registry, "http://localhost:9001");
        assert_eq!(config.github_token.as_deref(), Some("ghp_0123456789abcdef"));
    }

    #[test]
    fn test_debug_masks_token() {
        let config = ToolConfig {
            github_token: Some("ghp_0123456789abcdef".into()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("0123456789abcdef"));
        assert!(debug.contains("ghp_0123*********cdef"));
    }

    #[test]
    fn test_mask_short_token() {
        assert_eq!(mask_token("abc"), "*********");
    }

    async fn verify_authorization_header(token: Option<&str>) {
        let mut runtime = MockRuntime::new();
        let token_clone = token.map(|t| t.to_string());
        runtime
            .expect_env_var()
            .with(eq(GITHUB_TOKEN_ENV))
            .returning(move |_| token_clone.clone().ok_or(VarError::NotPresent));
        runtime
            .expect_env_var()
            .returning(|_| Err(VarError::NotPresent));

        let mut server = Server::new_async().await;
        let expected_header = match token {
            Some(t) => Matcher::Exact(format!("Bearer {}", t)),
            None => Matcher::Missing,
        };
        let mock = server
            .mock("GET", "/")
            .match_header("Authorization", expected_header)
            .match_header("Accept", "application/vnd.github.v3+json")
            .create_async()
            .await;

        let client = ToolConfig::from_env(&runtime).github_client().unwrap();
        let _ = client.get(server.url()).send().await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_github_client_with_token() {
        verify_authorization_header(Some("test_token")).await;
    }

    #[tokio::test]
    async fn test_github_client_without_token() {
        verify_authorization_header(None).await;
    }

    #[tokio::test]
    async fn test_registry_client_never_sends_token() {
        let runtime = runtime_with_env(&[(GITHUB_TOKEN_ENV, "secret_token_value")]);
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("Authorization", Matcher::Missing)
            .create_async()
            .await;

        let client = ToolConfig::from_env(&runtime).registry_client().unwrap();
        let _ = client.get(server.url()).send().await;

        mock.assert_async().await;
    }
}
