//
// parser_pool.rs
//
// Thread-local tree-sitter parser pool
//

use std::cell::RefCell;
use tree_sitter::Parser;

thread_local! {
    static PARSER: RefCell<Parser> = RefCell::new({
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_css::LANGUAGE.into())
            .expect("Failed to set CSS language");
        parser
    });
}

/// Execute a function with a thread-local parser instance.
/// The parser is reused across calls on the same thread.
pub fn with_parser<F, R>(f: F) -> R
where
    F: FnOnce(&mut Parser) -> R,
{
    PARSER.with(|parser| f(&mut parser.borrow_mut()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_initialized_with_css_language() {
        let tree = with_parser(|parser| parser.parse("a { color: red; }", None)).unwrap();
        let root = tree.root_node();
        assert_eq!(root.kind(), "stylesheet");
        assert_eq!(root.child(0).map(|n| n.kind()), Some("rule_set"));
        assert!(!root.has_error());
    }

    #[test]
    fn test_parser_reuse_on_same_thread() {
        let first = with_parser(|parser| parser.parse("a { b: c; }", None).is_some());
        let second = with_parser(|parser| parser.parse("$x: 1;", None).is_some());
        let third = with_parser(|parser| parser.parse("", None).is_some());
        assert!(first && second && third);
    }

    #[test]
    fn test_scss_input_still_yields_a_tree() {
        // Sass-only syntax falls outside the grammar but parsing never fails
        let source = "@mixin m($a) { .x-#{$a} { @include n; } }";
        let tree = with_parser(|parser| parser.parse(source, None)).unwrap();
        assert!(tree.root_node().has_error());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn scss_snippet() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z][a-z0-9-]{0,5}".prop_map(|name| format!("${}: 1px;", name)),
            "[a-z][a-z0-9-]{0,5}".prop_map(|name| format!("@mixin {}($x) {{ a: $x; }}", name)),
            "[a-z][a-z0-9-]{0,5}".prop_map(|name| format!("%{} {{ b: c; }}", name)),
            "[a-z][a-z0-9-]{0,5}".prop_map(|name| format!("@use '{}' as *;", name)),
            Just("/// doc\n// line\n/* block */".to_string()),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_parser_instance_reuse(snippets in prop::collection::vec(scss_snippet(), 1..10)) {
            for snippet in &snippets {
                let tree = with_parser(|parser| parser.parse(snippet, None));
                prop_assert!(tree.is_some(), "Parser should produce a tree for: {}", snippet);
            }
        }
    }
}
