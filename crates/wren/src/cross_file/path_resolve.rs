//
// cross_file/path_resolve.rs
//
// Resolution of `@use`/`@forward`/`@import` targets to document identities.
//
// Lookup order for a target written as `foo/bar`:
//   1. relative to the importing file's directory
//   2. relative to each configured load path
//   3. as a package under `node_modules`, walking up from the importing file
// Within each base, `bar.scss`, `_bar.scss`, `bar.css`, `bar/index.scss`, and
// `bar/_index.scss` are tried in that order. `~pkg/...` goes straight to
// step 3. `sass:<module>` targets name built-in modules and never touch disk.
//

use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::Url;

use super::content_provider::FileSystemProvider;
use crate::builtins;
use crate::syntax::{LinkCandidate, LinkKind};

/// Context for resolving the links of one document
#[derive(Debug, Clone)]
pub struct PathContext {
    /// Path of the importing file
    pub file_path: PathBuf,
    /// Absolute load paths, in priority order
    pub load_paths: Vec<PathBuf>,
}

impl PathContext {
    /// Relative `load_paths` are taken relative to `workspace_root`.
    pub fn new(file_uri: &Url, workspace_root: Option<&Url>, load_paths: &[String]) -> Option<Self> {
        let file_path = file_uri.to_file_path().ok()?;
        let root = workspace_root.and_then(|u| u.to_file_path().ok());
        let load_paths = load_paths
            .iter()
            .filter(|p| !p.is_empty())
            .filter_map(|p| {
                let path = PathBuf::from(p);
                if path.is_absolute() {
                    Some(path)
                } else {
                    root.as_ref().map(|r| r.join(path))
                }
            })
            .filter_map(|p| normalize_path(&p))
            .collect();
        Some(Self {
            file_path,
            load_paths,
        })
    }

    fn file_dir(&self) -> PathBuf {
        self.file_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.file_path.clone())
    }
}

fn normalize_path(path: &Path) -> Option<PathBuf> {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                // Only pop a Normal segment; keep RootDir and Prefix
                if let Some(last) = components.last() {
                    if matches!(last, std::path::Component::Normal(_)) {
                        components.pop();
                    }
                }
            }
            std::path::Component::CurDir => {}
            c => components.push(c),
        }
    }

    if components.is_empty() {
        return None;
    }

    let mut result = PathBuf::new();
    for c in components {
        result.push(c);
    }
    Some(result)
}

/// File names a target may refer to, in lookup order.
pub fn candidate_paths(path: &Path) -> Vec<PathBuf> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    let dir = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();

    match path.extension().and_then(|e| e.to_str()) {
        Some("scss") => {
            let mut candidates = vec![path.to_path_buf()];
            if !name.starts_with('_') {
                candidates.push(dir.join(format!("_{}", name)));
            }
            candidates
        }
        Some("css") => vec![path.to_path_buf()],
        _ => vec![
            dir.join(format!("{}.scss", name)),
            dir.join(format!("_{}.scss", name)),
            dir.join(format!("{}.css", name)),
            path.join("index.scss"),
            path.join("_index.scss"),
        ],
    }
}

async fn first_existing(fs: &dyn FileSystemProvider, base: &Path, target: &str) -> Option<Url> {
    let joined = normalize_path(&base.join(target))?;
    for candidate in candidate_paths(&joined) {
        let Ok(uri) = Url::from_file_path(&candidate) else {
            continue;
        };
        if fs.exists(&uri).await {
            return Some(uri);
        }
    }
    None
}

async fn resolve_package(fs: &dyn FileSystemProvider, target: &str, ctx: &PathContext) -> Option<Url> {
    let start = ctx.file_dir();
    for dir in start.ancestors() {
        let modules = dir.join("node_modules");
        if let Some(uri) = first_existing(fs, &modules, target).await {
            return Some(uri);
        }
    }
    None
}

/// Resolve a raw target to a document URI or a `sass:<module>` identity.
pub async fn resolve_target(fs: &dyn FileSystemProvider, target: &str, ctx: &PathContext) -> Option<Url> {
    if target.is_empty() {
        log::trace!("Path resolution: empty target in {}", ctx.file_path.display());
        return None;
    }

    if let Some(module) = target.strip_prefix("sass:") {
        return builtins::module(module).and_then(|m| Url::parse(&m.identity()).ok());
    }
    if target.starts_with("http://") || target.starts_with("https://") || target.starts_with("//") {
        return None;
    }
    if let Some(package) = target.strip_prefix('~') {
        return resolve_package(fs, package.trim_start_matches('/'), ctx).await;
    }
    if target.starts_with("file://") {
        let path = Url::parse(target).ok()?.to_file_path().ok()?;
        return first_existing(fs, Path::new("/"), path.to_str()?).await;
    }

    if let Some(uri) = first_existing(fs, &ctx.file_dir(), target).await {
        return Some(uri);
    }
    for load_path in &ctx.load_paths {
        if let Some(uri) = first_existing(fs, load_path, target).await {
            return Some(uri);
        }
    }
    if !target.starts_with('.') && !Path::new(target).is_absolute() {
        if let Some(uri) = resolve_package(fs, target, ctx).await {
            return Some(uri);
        }
    }

    log::trace!(
        "Could not resolve '{}' from {}",
        target,
        ctx.file_path.display()
    );
    None
}

/// Resolve one link. Dynamic imports and remote or `url()` CSS imports have
/// no document identity.
pub async fn resolve_link(fs: &dyn FileSystemProvider, link: &LinkCandidate, ctx: &PathContext) -> Option<Url> {
    if link.kind == LinkKind::Import && (link.dynamic || (link.is_css && !link.raw_target.ends_with(".css"))) {
        return None;
    }
    resolve_target(fs, &link.raw_target, ctx).await
}

/// Resolve every link of a document, preserving order.
pub async fn resolve_links(
    fs: &dyn FileSystemProvider,
    links: &[LinkCandidate],
    ctx: Option<&PathContext>,
) -> Vec<Option<Url>> {
    let mut targets = Vec::with_capacity(links.len());
    for link in links {
        let target = match ctx {
            Some(ctx) => resolve_link(fs, link, ctx).await,
            // Without a file path only built-in modules can be resolved
            None => link
                .raw_target
                .strip_prefix("sass:")
                .and_then(builtins::module)
                .and_then(|m| Url::parse(&m.identity()).ok()),
        };
        targets.push(target);
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_file::content_provider::MemoryFileSystem;

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file://{}", path)).unwrap()
    }

    fn fs_with(paths: &[&str]) -> MemoryFileSystem {
        let fs = MemoryFileSystem::new();
        for path in paths {
            fs.insert(uri(path), "");
        }
        fs
    }

    fn context(file: &str, load_paths: &[&str]) -> PathContext {
        let load_paths: Vec<String> = load_paths.iter().map(|s| s.to_string()).collect();
        PathContext::new(&uri(file), Some(&uri("/project")), &load_paths).unwrap()
    }

    #[test]
    fn test_candidate_order() {
        let candidates = candidate_paths(Path::new("/p/theme"));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/p/theme.scss"),
                PathBuf::from("/p/_theme.scss"),
                PathBuf::from("/p/theme.css"),
                PathBuf::from("/p/theme/index.scss"),
                PathBuf::from("/p/theme/_index.scss"),
            ]
        );
        assert_eq!(
            candidate_paths(Path::new("/p/a.scss")),
            vec![PathBuf::from("/p/a.scss"), PathBuf::from("/p/_a.scss")]
        );
    }

    #[tokio::test]
    async fn test_relative_partial() {
        let fs = fs_with(&["/project/src/_colors.scss"]);
        let ctx = context("/project/src/main.scss", &[]);
        let resolved = resolve_target(&fs, "colors", &ctx).await;
        assert_eq!(resolved, Some(uri("/project/src/_colors.scss")));
        let resolved = resolve_target(&fs, "./colors.scss", &ctx).await;
        assert_eq!(resolved, Some(uri("/project/src/_colors.scss")));
    }

    #[tokio::test]
    async fn test_parent_directory_and_index() {
        let fs = fs_with(&["/project/lib/_index.scss"]);
        let ctx = context("/project/src/main.scss", &[]);
        let resolved = resolve_target(&fs, "../lib", &ctx).await;
        assert_eq!(resolved, Some(uri("/project/lib/_index.scss")));
    }

    #[tokio::test]
    async fn test_load_paths_after_relative() {
        let fs = fs_with(&["/project/shared/_mixins.scss", "/project/src/mixins.scss"]);
        let ctx = context("/project/src/main.scss", &["shared"]);
        assert_eq!(
            resolve_target(&fs, "mixins", &ctx).await,
            Some(uri("/project/src/mixins.scss"))
        );
        let ctx = context("/project/other/main.scss", &["shared"]);
        assert_eq!(
            resolve_target(&fs, "mixins", &ctx).await,
            Some(uri("/project/shared/_mixins.scss"))
        );
    }

    #[tokio::test]
    async fn test_node_modules_walks_up() {
        let fs = fs_with(&["/project/node_modules/bootstrap/scss/_variables.scss"]);
        let ctx = context("/project/src/deep/main.scss", &[]);
        assert_eq!(
            resolve_target(&fs, "~bootstrap/scss/variables", &ctx).await,
            Some(uri("/project/node_modules/bootstrap/scss/_variables.scss"))
        );
        assert_eq!(
            resolve_target(&fs, "bootstrap/scss/variables", &ctx).await,
            Some(uri("/project/node_modules/bootstrap/scss/_variables.scss"))
        );
    }

    #[tokio::test]
    async fn test_builtin_and_remote_targets() {
        let fs = MemoryFileSystem::new();
        let ctx = context("/project/main.scss", &[]);
        assert_eq!(
            resolve_target(&fs, "sass:math", &ctx).await,
            Some(Url::parse("sass:math").unwrap())
        );
        assert_eq!(resolve_target(&fs, "sass:unknown", &ctx).await, None);
        assert_eq!(resolve_target(&fs, "https://cdn/x.css", &ctx).await, None);
        assert_eq!(resolve_target(&fs, "missing", &ctx).await, None);
    }
}
