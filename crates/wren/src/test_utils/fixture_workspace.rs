//! Deterministic fixture workspace generator for benchmarks and tests.
//!
//! Generates synthetic SCSS workspaces with controlled characteristics:
//! partial count, declarations per partial, `@forward` chain depth, and
//! built-in module usage.
//!
//! Output is deterministic so benchmarks are reproducible.

use std::fmt::Write;
use std::path::Path;
use tempfile::TempDir;

/// Configuration for generating a fixture workspace.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub file_count: usize,
    pub declarations_per_file: usize,
    pub forward_chain_depth: usize,
    pub builtin_uses_per_file: usize,
    pub rules_per_file: usize,
}

const BUILTINS: &[&str] = &["math", "color", "string", "list", "map", "meta", "selector"];

impl FixtureConfig {
    /// Small workspace: 10 partials, 5 declarations each, forward chain depth 3.
    pub fn small() -> Self {
        Self {
            file_count: 10,
            declarations_per_file: 5,
            forward_chain_depth: 3,
            builtin_uses_per_file: 1,
            rules_per_file: 5,
        }
    }

    /// Medium workspace: 50 partials, 10 declarations each, forward chain depth 10.
    pub fn medium() -> Self {
        Self {
            file_count: 50,
            declarations_per_file: 10,
            forward_chain_depth: 10,
            builtin_uses_per_file: 2,
            rules_per_file: 10,
        }
    }

    /// Large workspace: 200 partials, 20 declarations each, forward chain depth 15.
    pub fn large() -> Self {
        Self {
            file_count: 200,
            declarations_per_file: 20,
            forward_chain_depth: 15,
            builtin_uses_per_file: 3,
            rules_per_file: 20,
        }
    }
}

/// File name of partial `index`.
pub fn partial_name(index: usize) -> String {
    format!("_module_{}.scss", index)
}

/// Content of partial `index`: `_module_i` forwards `_module_{i+1}` with an
/// `m{i+1}-` prefix while inside the chain.
fn generate_partial(index: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();

    for b in 0..config.builtin_uses_per_file {
        let module = BUILTINS[(index * config.builtin_uses_per_file + b) % BUILTINS.len()];
        writeln!(content, "@use 'sass:{}';", module).unwrap();
    }
    if index < config.forward_chain_depth && index + 1 < config.file_count {
        writeln!(content, "@forward 'module_{}' as m{}-*;", index + 1, index + 1).unwrap();
    }
    content.push('\n');

    for d in 0..config.declarations_per_file {
        writeln!(content, "/// Spacing step {} of module {}", d, index).unwrap();
        writeln!(content, "$space-{}-{}: {}px;", index, d, (d + 1) * 4).unwrap();
        writeln!(content, "@mixin pad-{}-{}($x, $y: {}) {{", index, d, d).unwrap();
        writeln!(content, "  padding: $x $y;").unwrap();
        writeln!(content, "}}").unwrap();
        writeln!(content, "@function scale-{}-{}($n) {{", index, d).unwrap();
        writeln!(content, "  @return $n * {};", d + 1).unwrap();
        writeln!(content, "}}").unwrap();
        writeln!(content, "%base-{}-{} {{ margin: 0; }}", index, d).unwrap();
        content.push('\n');
    }

    for r in 0..config.rules_per_file {
        let d = r % config.declarations_per_file.max(1);
        writeln!(content, ".rule-{}-{} {{", index, r).unwrap();
        writeln!(content, "  margin: $space-{}-{};", index, d).unwrap();
        writeln!(content, "  width: scale-{}-{}(2);", index, d).unwrap();
        writeln!(content, "  @include pad-{}-{}(1px);", index, d).unwrap();
        writeln!(content, "}}").unwrap();
    }

    content
}

/// Entry stylesheet using the head of the forward chain.
fn generate_main(config: &FixtureConfig) -> String {
    let mut content = String::new();
    writeln!(content, "@use 'module_0' as m0;").unwrap();
    writeln!(content, "@use 'sass:math';").unwrap();
    content.push('\n');
    let depth = config.forward_chain_depth.min(config.file_count.saturating_sub(1));
    writeln!(content, ".main {{").unwrap();
    writeln!(content, "  width: math.div(m0.$space-0-0, 2);").unwrap();
    if depth > 0 {
        // Prefixes accumulate from the outermost forward inwards
        let prefix: String = (1..=depth).map(|k| format!("m{}-", k)).collect();
        writeln!(content, "  margin: m0.${}space-{}-0;", prefix, depth).unwrap();
    }
    writeln!(content, "}}").unwrap();
    content
}

/// Create a temporary fixture workspace from the given configuration.
///
/// The directory is cleaned up when the `TempDir` is dropped.
pub fn create_fixture_workspace(config: &FixtureConfig) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory for fixture workspace");
    write_fixture_workspace(temp_dir.path(), config);
    temp_dir
}

/// Write fixture files into an existing directory.
pub fn write_fixture_workspace(dir: &Path, config: &FixtureConfig) {
    for i in 0..config.file_count {
        let filename = partial_name(i);
        std::fs::write(dir.join(&filename), generate_partial(i, config))
            .unwrap_or_else(|e| panic!("Failed to write fixture file {}: {}", filename, e));
    }
    std::fs::write(dir.join("main.scss"), generate_main(config))
        .unwrap_or_else(|e| panic!("Failed to write fixture main.scss: {}", e));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_preset_values() {
        let config = FixtureConfig::small();
        assert_eq!(config.file_count, 10);
        assert_eq!(config.declarations_per_file, 5);
        assert_eq!(config.forward_chain_depth, 3);
    }

    #[test]
    fn test_file_count_matches_config() {
        let config = FixtureConfig::small();
        let workspace = create_fixture_workspace(&config);
        let scss_files = std::fs::read_dir(workspace.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|ext| ext == "scss").unwrap_or(false))
            .count();
        assert_eq!(scss_files, config.file_count + 1);
    }

    #[test]
    fn test_deterministic_output() {
        let config = FixtureConfig::small();
        let ws1 = create_fixture_workspace(&config);
        let ws2 = create_fixture_workspace(&config);
        for i in 0..config.file_count {
            let name = partial_name(i);
            let a = std::fs::read_to_string(ws1.path().join(&name)).unwrap();
            let b = std::fs::read_to_string(ws2.path().join(&name)).unwrap();
            assert_eq!(a, b, "{} should be identical across runs", name);
        }
    }

    #[test]
    fn test_forward_chain_structure() {
        let config = FixtureConfig {
            file_count: 4,
            declarations_per_file: 1,
            forward_chain_depth: 2,
            builtin_uses_per_file: 0,
            rules_per_file: 0,
        };
        assert!(generate_partial(0, &config).contains("@forward 'module_1' as m1-*;"));
        assert!(generate_partial(1, &config).contains("@forward 'module_2' as m2-*;"));
        assert!(!generate_partial(2, &config).contains("@forward"));
        assert!(generate_main(&config).contains("m0.$m1-m2-space-2-0"));
    }
}
