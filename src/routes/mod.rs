//! Static checks for an umi-style route table (`config/routes.json`).

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

pub const DEFAULT_ROUTES_FILE: &str = "config/routes.json";

const SOURCE_DIR: &str = "src";
const PAGES_DIR: &str = "src/pages";
const EXTENSIONS: [&str; 4] = ["tsx", "ts", "jsx", "js"];

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub path: Option<String>,
    pub component: Option<String>,
    pub redirect: Option<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteIssue {
    DuplicatePath(String),
    MissingComponent {
        path: Option<String>,
        component: String,
    },
    DanglingRedirect {
        from: Option<String>,
        to: String,
    },
}

impl fmt::Display for RouteIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatePath(path) => write!(f, "Path {} is declared more than once", path),
            Self::MissingComponent { path, component } => write!(
                f,
                "Component {} of route {} does not exist",
                component,
                path.as_deref().unwrap_or("(layout)")
            ),
            Self::DanglingRedirect { from, to } => write!(
                f,
                "Route {} redirects to undeclared path {}",
                from.as_deref().unwrap_or("(layout)"),
                to
            ),
        }
    }
}

/// Reads and checks `routes_file` (relative to `repo`, default
/// [`DEFAULT_ROUTES_FILE`]). Every issue is printed.
#[tracing::instrument(skip(runtime))]
pub fn check_routers<R: Runtime + ?Sized>(
    runtime: &R,
    repo: &Path,
    routes_file: Option<&Path>,
) -> Result<Vec<RouteIssue>> {
    let file = repo.join(routes_file.unwrap_or(Path::new(DEFAULT_ROUTES_FILE)));
    let content = runtime
        .read_to_string(&file)
        .with_context(|| format!("Cannot read routes file {}", file.display()))?;
    let routes: Vec<Route> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid routes file {}", file.display()))?;

    let issues = check_routes(runtime, repo, &routes);
    for issue in &issues {
        println!("{}", issue);
    }
    info!("{} routes issues in {}", issues.len(), file.display());
    Ok(issues)
}

/// A route with its path made absolute.
struct FlatRoute<'a> {
    path: Option<String>,
    /// Absolute path of the enclosing route.
    parent: String,
    route: &'a Route,
}

pub fn check_routes<R: Runtime + ?Sized>(
    runtime: &R,
    repo: &Path,
    routes: &[Route],
) -> Vec<RouteIssue> {
    let mut flat = Vec::new();
    flatten(routes, "/", &mut flat);

    let mut issues = Vec::new();
    let declared: HashSet<String> = flat.iter().filter_map(|e| e.path.clone()).collect();
    let mut pages = HashSet::new();
    let mut reported = HashSet::new();

    for entry in &flat {
        let Some(path) = &entry.path else { continue };
        // Redirects and layouts share their path with the page they lead to.
        if !is_page(entry.route) {
            continue;
        }
        if !pages.insert(path.clone()) && reported.insert(path.clone()) {
            issues.push(RouteIssue::DuplicatePath(path.clone()));
        }
    }

    for entry in &flat {
        if let Some(component) = &entry.route.component {
            if resolve_component(runtime, repo, component).is_none() {
                issues.push(RouteIssue::MissingComponent {
                    path: entry.path.clone(),
                    component: component.clone(),
                });
            }
        }

        if let Some(redirect) = &entry.route.redirect {
            if is_external(redirect) {
                continue;
            }
            let target = join_path(&entry.parent, strip_query(redirect));
            if !declared.contains(&target) {
                issues.push(RouteIssue::DanglingRedirect {
                    from: entry.path.clone(),
                    to: redirect.clone(),
                });
            }
        }
    }

    issues
}

fn flatten<'a>(routes: &'a [Route], parent: &str, out: &mut Vec<FlatRoute<'a>>) {
    for route in routes {
        let path = route.path.as_deref().map(|p| join_path(parent, p));
        out.push(FlatRoute {
            path: path.clone(),
            parent: parent.to_string(),
            route,
        });
        flatten(&route.routes, path.as_deref().unwrap_or(parent), out);
    }
}

fn is_page(route: &Route) -> bool {
    route.routes.is_empty() && !(route.redirect.is_some() && route.component.is_none())
}

fn join_path(parent: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), path)
    };
    match joined.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn strip_query(target: &str) -> &str {
    target.split(['?', '#']).next().unwrap_or(target)
}

fn is_external(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

/// File a component reference points at: `@/x` lives under `src/`, anything
/// else under `src/pages/`. Extensions and `index` files are tried in order.
pub fn resolve_component<R: Runtime + ?Sized>(
    runtime: &R,
    repo: &Path,
    component: &str,
) -> Option<PathBuf> {
    let base = match component.strip_prefix("@/") {
        Some(rest) => repo.join(SOURCE_DIR).join(rest),
        None => {
            let rest = component.trim_start_matches("./").trim_start_matches('/');
            repo.join(PAGES_DIR).join(rest)
        }
    };

    if runtime.is_file(&base) {
        return Some(base);
    }

    let file_name = base.file_name()?.to_string_lossy().into_owned();
    let candidates = EXTENSIONS
        .iter()
        .map(|ext| base.with_file_name(format!("{}.{}", file_name, ext)))
        .chain(EXTENSIONS.iter().map(|ext| base.join(format!("index.{}", ext))));

    for candidate in candidates {
        if runtime.is_file(&candidate) {
            debug!("{} -> {}", component, candidate.display());
            return Some(candidate);
        }
    }
    None
}
