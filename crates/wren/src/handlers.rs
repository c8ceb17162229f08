//
// handlers.rs
//
// LSP request handlers: hover, definition, references, completion,
// diagnostics, and symbol/link listings. Each resolves against the shared
// document store and returns protocol types.
//

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionItemTag, CompletionResponse, Diagnostic,
    DiagnosticSeverity, DiagnosticTag, DocumentLink, DocumentSymbol, DocumentSymbolResponse,
    Documentation, GotoDefinitionResponse, Hover, HoverContents, Location, MarkupContent,
    MarkupKind, Position, Range, SymbolInformation, SymbolKind as LspSymbolKind, SymbolTag, Url,
};

use crate::builtins::BUILTIN_MODULES;
use crate::completion_context::{classify_context, CompletionContext};
use crate::cross_file::{
    identifier_at, is_builtin_target, Identifier, LinkFilter, ListOptions, ReachableSymbol,
    ResolvedSymbol, Resolver, Symbol, SymbolKind, SymbolOwner,
};
use crate::document::ScssDocument;
use crate::document_store::DocumentStore;
use crate::state::WorldState;

/// Longest `$a: $b` chain followed when showing a variable's value
const MAX_VALUE_CHAIN: usize = 10;

const SASSDOC_TAGS: &[&str] = &[
    "@param", "@return", "@type", "@deprecated", "@example", "@see", "@since", "@author",
];

fn document_at(state: &WorldState, uri: &Url, position: Position) -> Option<(Arc<ScssDocument>, usize)> {
    let doc = state.store.get(uri)?;
    let offset = doc.line_index.offset_at(&doc.text, position);
    Some((doc, offset))
}

fn lsp_symbol_kind(kind: SymbolKind) -> LspSymbolKind {
    match kind {
        SymbolKind::Variable => LspSymbolKind::VARIABLE,
        SymbolKind::Mixin => LspSymbolKind::METHOD,
        SymbolKind::Function => LspSymbolKind::FUNCTION,
        SymbolKind::Placeholder => LspSymbolKind::CLASS,
    }
}

fn completion_kind(kind: SymbolKind) -> CompletionItemKind {
    match kind {
        SymbolKind::Variable => CompletionItemKind::VARIABLE,
        SymbolKind::Mixin => CompletionItemKind::METHOD,
        SymbolKind::Function => CompletionItemKind::FUNCTION,
        SymbolKind::Placeholder => CompletionItemKind::CLASS,
    }
}

/// The symbol declared by the declaration node at `offset`, if any.
fn declared_at(doc: &ScssDocument, offset: usize) -> Option<&Symbol> {
    let node = doc.node_at(offset)?;
    if !node.kind.is_declaration() {
        return None;
    }
    let kind = SymbolKind::of_node(node.kind)?;
    doc.get_symbols()
        .into_iter()
        .find(|s| s.kind == kind && s.offset == node.name_start)
}

/// Declaration under the cursor, or what the reference under it resolves to.
fn target_at(store: &DocumentStore, doc: &Arc<ScssDocument>, offset: usize) -> Option<ResolvedSymbol> {
    if let Some(symbol) = declared_at(doc, offset) {
        return Some(ResolvedSymbol {
            symbol: symbol.clone(),
            owner: SymbolOwner::Document(Arc::clone(doc)),
            effective_name: symbol.name.clone(),
            builtin: None,
        });
    }
    let ident = identifier_at(doc, offset)?;
    Resolver::new(store).resolve(doc, &ident)
}

fn parameter_list(symbol: &Symbol) -> String {
    symbol
        .parameters
        .iter()
        .map(|p| match &p.default_value {
            Some(default) => format!("{}: {}", p.name, default),
            None => p.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn signature(resolved: &ResolvedSymbol) -> String {
    if let Some(export) = resolved.builtin {
        return match export.kind {
            SymbolKind::Mixin => format!("@mixin {}", export.signature),
            SymbolKind::Function => format!("@function {}", export.signature),
            _ => export.signature.to_string(),
        };
    }
    let symbol = &resolved.symbol;
    match symbol.kind {
        SymbolKind::Variable => match &symbol.value {
            Some(value) => format!("{}: {}", symbol.name, value),
            None => symbol.name.clone(),
        },
        SymbolKind::Mixin => format!("@mixin {}({})", symbol.name, parameter_list(symbol)),
        SymbolKind::Function => format!("@function {}({})", symbol.name, parameter_list(symbol)),
        SymbolKind::Placeholder => symbol.name.clone(),
    }
}

/// Follow `$a: $b` aliases to the first value that is not a bare variable.
fn resolved_value(store: &DocumentStore, resolved: &ResolvedSymbol) -> Option<String> {
    let mut value = resolved.symbol.value.clone()?;
    let mut owner = resolved.owner.document().cloned()?;
    let mut offset = resolved.symbol.offset;
    let mut changed = false;

    for _ in 0..MAX_VALUE_CHAIN {
        let trimmed = value.trim();
        let is_alias = trimmed.starts_with('$')
            && trimmed.len() > 1
            && trimmed[1..].chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_');
        if !is_alias {
            break;
        }
        let ident = Identifier::new(trimmed, SymbolKind::Variable).at(offset);
        let Some(next) = Resolver::new(store).resolve(&owner, &ident) else {
            break;
        };
        let (Some(next_value), Some(next_owner)) = (next.symbol.value.clone(), next.owner.document().cloned())
        else {
            break;
        };
        value = next_value;
        offset = next.symbol.offset;
        owner = next_owner;
        changed = true;
    }
    changed.then_some(value)
}

fn hover_markdown(store: &DocumentStore, resolved: &ResolvedSymbol) -> String {
    let mut sections = vec![format!("```scss\n{}\n```", signature(resolved))];

    if resolved.symbol.kind == SymbolKind::Variable {
        if let Some(value) = resolved_value(store, resolved) {
            sections.push(format!("Resolved value: `{}`", value));
        }
    }

    if let Some(doc) = &resolved.symbol.sassdoc {
        if let Some(reason) = &doc.deprecated {
            if reason.is_empty() {
                sections.push("**Deprecated**".to_string());
            } else {
                sections.push(format!("**Deprecated:** {}", reason));
            }
        }
        if let Some(description) = &doc.description {
            sections.push(description.clone());
        }
        if !doc.params.is_empty() {
            let params: Vec<String> = doc
                .params
                .iter()
                .map(|p| {
                    let mut line = format!("- `{}`", p.name);
                    if let Some(type_name) = &p.type_name {
                        line.push_str(&format!(" *{}*", type_name));
                    }
                    if let Some(description) = &p.description {
                        line.push_str(&format!(" {}", description));
                    }
                    line
                })
                .collect();
            sections.push(params.join("\n"));
        }
        if let Some(returns) = &doc.returns {
            sections.push(format!("**Returns:** {}", returns));
        }
    }

    match &resolved.owner {
        SymbolOwner::Document(doc) => sections.push(format!("Declared in `{}`", doc.file_name)),
        SymbolOwner::Builtin(module) => sections.push(format!("Built-in module `{}`", module.identity())),
    }
    sections.join("\n\n")
}

pub fn hover(state: &WorldState, uri: &Url, position: Position) -> Option<Hover> {
    let (doc, offset) = document_at(state, uri, position)?;
    let node = doc.node_at(offset)?;
    let resolved = target_at(&state.store, &doc, offset)?;
    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: hover_markdown(&state.store, &resolved),
        }),
        range: Some(doc.node_range(node)),
    })
}

pub fn goto_definition(state: &WorldState, uri: &Url, position: Position) -> Option<GotoDefinitionResponse> {
    let (doc, offset) = document_at(state, uri, position)?;

    // On a module target, jump to the linked document
    for link in doc.get_links(LinkFilter::ALL) {
        let range = link.range();
        if range.start <= position && position <= range.end {
            if is_builtin_target(link.target()) {
                return None;
            }
            return Some(GotoDefinitionResponse::Scalar(Location::new(
                link.target().clone(),
                Range::default(),
            )));
        }
    }

    let ident = identifier_at(&doc, offset)?;
    let resolved = Resolver::new(&state.store).resolve(&doc, &ident)?;
    let uri = resolved.owner.uri()?.clone();
    log::trace!("Definition of '{}' in {}", ident.name, uri);
    Some(GotoDefinitionResponse::Scalar(Location::new(uri, resolved.symbol.range)))
}

fn same_target(a: &ResolvedSymbol, b: &ResolvedSymbol) -> bool {
    if a.symbol.kind != b.symbol.kind {
        return false;
    }
    match (&a.owner, &b.owner) {
        (SymbolOwner::Document(x), SymbolOwner::Document(y)) => {
            x.uri == y.uri && a.symbol.offset == b.symbol.offset
        }
        (SymbolOwner::Builtin(x), SymbolOwner::Builtin(y)) => x.name == y.name && a.symbol.name == b.symbol.name,
        _ => false,
    }
}

/// Every reference in the store that resolves to the symbol at `position`.
pub fn references(
    state: &WorldState,
    uri: &Url,
    position: Position,
    include_declaration: bool,
) -> Option<Vec<Location>> {
    let (doc, offset) = document_at(state, uri, position)?;
    let target = target_at(&state.store, &doc, offset)?;
    let kind = target.symbol.kind;
    let resolver = Resolver::new(&state.store);

    let mut locations = Vec::new();
    if include_declaration {
        if let Some(owner) = target.owner.uri() {
            locations.push(Location::new(owner.clone(), target.symbol.range));
        }
    }

    // Parameters and locals are only referenced from their own document
    let candidates: Vec<Arc<ScssDocument>> = match target.owner.document() {
        Some(owner) if !target.symbol.is_module_level() => vec![Arc::clone(owner)],
        _ => {
            let mut docs = state.store.values();
            docs.sort_by(|a, b| a.uri.as_str().cmp(b.uri.as_str()));
            docs
        }
    };

    for candidate in candidates {
        for node in candidate.references(kind) {
            let mut ident = Identifier::new(node.name.clone(), kind).at(node.name_start);
            ident.namespace = node.namespace.clone();
            let Some(found) = resolver.resolve(&candidate, &ident) else {
                continue;
            };
            if same_target(&found, &target) {
                locations.push(Location::new(
                    candidate.uri.clone(),
                    candidate.range_of(node.name_start, node.end),
                ));
            }
        }
    }
    log::trace!("Found {} references to '{}'", locations.len(), target.symbol.name);
    Some(locations)
}

fn sassdoc_documentation(symbol: &Symbol) -> Option<Documentation> {
    let description = symbol.sassdoc.as_ref()?.description.clone()?;
    Some(Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value: description,
    }))
}

fn completion_item(item: &ReachableSymbol, qualify: bool) -> CompletionItem {
    let label = match (&item.namespace, qualify) {
        (Some(namespace), true) => format!("{}.{}", namespace, item.name),
        _ => item.name.clone(),
    };
    let detail = match (&item.symbol.value, item.builtin) {
        (_, Some(export)) => Some(export.signature.to_string()),
        (Some(value), None) => Some(format!("{} ({})", value, item.owner.label())),
        (None, None) => Some(item.owner.label()),
    };
    let deprecated = item.symbol.deprecation().is_some();
    CompletionItem {
        label,
        kind: Some(completion_kind(item.symbol.kind)),
        detail,
        documentation: sassdoc_documentation(&item.symbol),
        tags: deprecated.then(|| vec![CompletionItemTag::DEPRECATED]),
        ..Default::default()
    }
}

fn wanted_kinds(ctx: &CompletionContext, state: &WorldState) -> Vec<SymbolKind> {
    let config = &state.config;
    let mut kinds = Vec::new();
    if ctx.wants_variable && config.suggest_variables {
        kinds.push(SymbolKind::Variable);
    }
    if ctx.wants_mixin && config.suggest_mixins {
        kinds.push(SymbolKind::Mixin);
    }
    if ctx.wants_function && config.suggest_functions {
        kinds.push(SymbolKind::Function);
    }
    if ctx.wants_placeholder && config.suggest_placeholders {
        kinds.push(SymbolKind::Placeholder);
    }
    kinds
}

/// Placeholders extended somewhere in the store but declared nowhere.
fn undeclared_placeholders(store: &DocumentStore) -> Vec<CompletionItem> {
    let docs = store.values();
    let declared: HashSet<&str> = docs
        .iter()
        .flat_map(|doc| doc.placeholders.keys().map(String::as_str))
        .collect();
    let mut names: Vec<&str> = docs
        .iter()
        .flat_map(|doc| doc.references(SymbolKind::Placeholder).map(|node| node.name.as_str()))
        .filter(|name| !declared.contains(name))
        .collect();
    names.sort_unstable();
    names.dedup();
    names
        .into_iter()
        .map(|name| CompletionItem {
            label: name.to_string(),
            kind: Some(CompletionItemKind::CLASS),
            ..Default::default()
        })
        .collect()
}

pub fn completion(state: &WorldState, uri: &Url, position: Position) -> Option<CompletionResponse> {
    let (doc, offset) = document_at(state, uri, position)?;
    let extension = doc.file_name.rsplit_once('.').map(|(_, ext)| ext);
    let ctx = classify_context(&doc.text, offset, extension);
    log::trace!("Completion context at {}:{:?}: {:?}", uri, position, ctx);

    if ctx.in_sassdoc {
        let items = SASSDOC_TAGS
            .iter()
            .map(|tag| CompletionItem {
                label: tag.to_string(),
                kind: Some(CompletionItemKind::KEYWORD),
                ..Default::default()
            })
            .collect();
        return Some(CompletionResponse::Array(items));
    }
    if ctx.in_comment {
        return None;
    }
    if ctx.is_module_path {
        let items = BUILTIN_MODULES
            .iter()
            .map(|module| CompletionItem {
                label: module.identity(),
                kind: Some(CompletionItemKind::MODULE),
                documentation: Some(Documentation::String(module.description.to_string())),
                ..Default::default()
            })
            .collect();
        return Some(CompletionResponse::Array(items));
    }
    if ctx.wants_placeholder_declaration {
        return Some(CompletionResponse::Array(undeclared_placeholders(&state.store)));
    }

    let options = ListOptions {
        include_namespaced: ctx.namespace.is_none(),
        include_legacy: !state.config.suggest_from_use_only,
    };
    let resolver = Resolver::new(&state.store);
    let mut items = Vec::new();
    for kind in wanted_kinds(&ctx, state) {
        if kind == SymbolKind::Variable && ctx.namespace.is_none() {
            let mut seen = HashSet::new();
            for local in doc.locals.iter().filter(|s| s.kind == kind && s.visible_at(offset)) {
                if (local.owner.is_some() || local.offset <= offset) && seen.insert(local.name.as_str()) {
                    items.push(CompletionItem {
                        label: local.name.clone(),
                        kind: Some(CompletionItemKind::VARIABLE),
                        detail: local.value.clone(),
                        ..Default::default()
                    });
                }
            }
        }
        for reachable in resolver.list_reachable_symbols_with(&doc, kind, ctx.namespace.as_deref(), options) {
            items.push(completion_item(&reachable, ctx.namespace.is_none()));
        }
    }
    Some(CompletionResponse::Array(items))
}

/// One hint per reference whose declaration carries `@deprecated`.
pub fn deprecation_diagnostics(
    store: &DocumentStore,
    doc: &Arc<ScssDocument>,
    cancel: Option<&CancellationToken>,
) -> Vec<Diagnostic> {
    let mut resolver = Resolver::new(store);
    if let Some(token) = cancel {
        resolver = resolver.with_cancellation(token);
    }

    let mut diagnostics = Vec::new();
    for (_, node) in doc.tree.nodes() {
        if !node.kind.is_reference() {
            continue;
        }
        if cancel.map(|t| t.is_cancelled()).unwrap_or(false) {
            return Vec::new();
        }
        let Some(kind) = SymbolKind::of_node(node.kind) else {
            continue;
        };
        let mut ident = Identifier::new(node.name.clone(), kind).at(node.name_start);
        ident.namespace = node.namespace.clone();
        let Some(resolved) = resolver.resolve(doc, &ident) else {
            continue;
        };
        let Some(reason) = resolved.symbol.deprecation() else {
            continue;
        };
        let message = if reason.is_empty() {
            format!("{} is deprecated", resolved.effective_name)
        } else {
            reason.to_string()
        };
        diagnostics.push(Diagnostic {
            range: doc.node_range(node),
            severity: Some(DiagnosticSeverity::HINT),
            source: Some("wren".to_string()),
            message,
            tags: Some(vec![DiagnosticTag::DEPRECATED]),
            ..Default::default()
        });
    }
    diagnostics
}

pub fn diagnostics(state: &WorldState, uri: &Url, cancel: Option<&CancellationToken>) -> Vec<Diagnostic> {
    if !state.config.deprecation_diagnostics {
        return Vec::new();
    }
    let Some(doc) = state.store.get(uri) else {
        return Vec::new();
    };
    deprecation_diagnostics(&state.store, &doc, cancel)
}

#[allow(deprecated)]
fn symbol_information(doc: &ScssDocument, symbol: &Symbol) -> SymbolInformation {
    SymbolInformation {
        name: symbol.name.clone(),
        kind: lsp_symbol_kind(symbol.kind),
        tags: symbol.deprecation().map(|_| vec![SymbolTag::DEPRECATED]),
        deprecated: None,
        location: Location::new(doc.uri.clone(), symbol.range),
        container_name: Some(doc.file_name.clone()),
    }
}

/// Module-level symbols whose name contains `query`, case-insensitively.
pub fn workspace_symbol(state: &WorldState, query: &str) -> Vec<SymbolInformation> {
    let query = query.to_lowercase();
    let mut docs = state.store.values();
    docs.sort_by(|a, b| a.uri.as_str().cmp(b.uri.as_str()));

    let mut symbols = Vec::new();
    for doc in &docs {
        for kind in SymbolKind::ALL {
            for symbol in doc.table(kind).values() {
                if symbol.name.to_lowercase().contains(&query) {
                    symbols.push(symbol_information(doc, symbol));
                }
            }
        }
    }
    symbols
}

#[allow(deprecated)]
pub fn document_symbol(state: &WorldState, uri: &Url) -> Option<DocumentSymbolResponse> {
    let doc = state.store.get(uri)?;
    let mut symbols = Vec::new();
    for symbol in doc.get_symbols() {
        if !symbol.is_module_level() {
            continue;
        }
        let children: Vec<DocumentSymbol> = match symbol.kind {
            SymbolKind::Mixin | SymbolKind::Function => doc
                .locals
                .iter()
                .filter(|p| p.owner.as_deref() == Some(symbol.name.as_str()) && p.offset > symbol.offset)
                .take(symbol.parameters.len())
                .map(|p| DocumentSymbol {
                    name: p.name.clone(),
                    detail: p.value.clone(),
                    kind: LspSymbolKind::VARIABLE,
                    tags: None,
                    deprecated: None,
                    range: p.range,
                    selection_range: p.range,
                    children: None,
                })
                .collect(),
            _ => Vec::new(),
        };
        symbols.push(DocumentSymbol {
            name: symbol.name.clone(),
            detail: symbol.value.clone(),
            kind: lsp_symbol_kind(symbol.kind),
            tags: symbol.deprecation().map(|_| vec![SymbolTag::DEPRECATED]),
            deprecated: None,
            range: symbol.range,
            selection_range: symbol.range,
            children: (!children.is_empty()).then_some(children),
        });
    }
    symbols.sort_by_key(|s| (s.range.start.line, s.range.start.character));
    Some(DocumentSymbolResponse::Nested(symbols))
}

/// Links for module targets that resolved to documents.
pub fn document_links(state: &WorldState, uri: &Url) -> Option<Vec<DocumentLink>> {
    let doc = state.store.get(uri)?;
    let links = doc
        .get_links(LinkFilter::ALL)
        .into_iter()
        .filter(|link| !is_builtin_target(link.target()))
        .map(|link| DocumentLink {
            range: link.range(),
            target: Some(link.target().clone()),
            tooltip: None,
            data: None,
        })
        .collect();
    Some(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///ws/{}", name)).unwrap()
    }

    fn state_with(files: &[(&str, &str)]) -> WorldState {
        let state = WorldState::new();
        for (name, text) in files {
            let doc = ScssDocument::parse(uri(name), text.to_string(), |candidate| {
                if candidate.raw_target.starts_with("sass:") {
                    Url::parse(&candidate.raw_target).ok()
                } else {
                    Some(uri(&format!("{}.scss", candidate.raw_target)))
                }
            });
            state.store.set(uri(name), Arc::new(doc));
        }
        state
    }

    fn position_of(state: &WorldState, name: &str, needle: &str) -> Position {
        let doc = state.store.get(&uri(name)).unwrap();
        let offset = doc.text.find(needle).unwrap();
        doc.line_index.position_at(&doc.text, offset)
    }

    fn labels(response: Option<CompletionResponse>) -> Vec<String> {
        match response {
            Some(CompletionResponse::Array(items)) => items.into_iter().map(|i| i.label).collect(),
            _ => Vec::new(),
        }
    }

    fn hover_text(hover: Hover) -> String {
        match hover.contents {
            HoverContents::Markup(markup) => markup.value,
            _ => String::new(),
        }
    }

    #[test]
    fn test_hover_shows_signature_docs_and_owner() {
        let state = state_with(&[
            ("main.scss", "@use 'lib';\n.a { @include lib.pad(2px); }"),
            ("lib.scss", "/// Adds padding\n/// @param {Length} $x amount\n@mixin pad($x, $y: 0) {}"),
        ]);
        let hover = hover(&state, &uri("main.scss"), position_of(&state, "main.scss", "pad(")).unwrap();
        let text = hover_text(hover);
        assert!(text.contains("@mixin pad($x, $y: 0)"));
        assert!(text.contains("Adds padding"));
        assert!(text.contains("`$x` *Length* amount"));
        assert!(text.contains("Declared in `lib.scss`"));
    }

    #[test]
    fn test_hover_follows_variable_aliases() {
        let state = state_with(&[("main.scss", "$base: 4px;\n$gap: $base;\n.a { margin: $gap; }")]);
        let position = position_of(&state, "main.scss", "$gap; }");
        let text = hover_text(hover(&state, &uri("main.scss"), position).unwrap());
        assert!(text.contains("$gap: $base"));
        assert!(text.contains("Resolved value: `4px`"));
    }

    #[test]
    fn test_hover_on_builtin() {
        let state = state_with(&[("main.scss", "@use 'sass:math';\n.a { width: math.div(1, 2); }")]);
        let text = hover_text(hover(&state, &uri("main.scss"), position_of(&state, "main.scss", "div(")).unwrap());
        assert!(text.contains("@function div($number1, $number2)"));
        assert!(text.contains("Built-in module `sass:math`"));
    }

    #[test]
    fn test_definition_and_module_link() {
        let state = state_with(&[
            ("main.scss", "@use 'vars';\n.a { color: vars.$brand; }"),
            ("vars.scss", "$brand: red;"),
        ]);
        let position = position_of(&state, "main.scss", "$brand");
        let Some(GotoDefinitionResponse::Scalar(location)) = goto_definition(&state, &uri("main.scss"), position)
        else {
            panic!("expected a location");
        };
        assert_eq!(location.uri, uri("vars.scss"));
        assert_eq!(location.range.start, Position::new(0, 0));

        let position = position_of(&state, "main.scss", "vars'");
        let Some(GotoDefinitionResponse::Scalar(location)) = goto_definition(&state, &uri("main.scss"), position)
        else {
            panic!("expected a location");
        };
        assert_eq!(location.uri, uri("vars.scss"));
    }

    #[test]
    fn test_references_across_documents() {
        let state = state_with(&[
            ("a.scss", "@use 'vars';\n.a { color: vars.$brand; }"),
            ("b.scss", "@use 'vars' as v;\n.b { color: v.$brand; border-color: v.$brand; }"),
            ("vars.scss", "$brand: red;\n.c { color: $brand; }"),
        ]);
        let position = position_of(&state, "vars.scss", "$brand");
        let with_decl = references(&state, &uri("vars.scss"), position, true).unwrap();
        assert_eq!(with_decl.len(), 5);
        assert_eq!(with_decl[0].uri, uri("vars.scss"));
        let without = references(&state, &uri("vars.scss"), position, false).unwrap();
        assert_eq!(without.len(), 4);
    }

    #[test]
    fn test_parameter_references_stay_in_callable() {
        let state = state_with(&[(
            "main.scss",
            "$x: 1;\n@mixin m($x) { width: $x; }\n.a { width: $x; }",
        )]);
        let position = position_of(&state, "main.scss", "$x) {");
        let found = references(&state, &uri("main.scss"), position, false).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range.start.line, 1);
    }

    #[test]
    fn test_completion_namespace_members() {
        let state = state_with(&[
            ("main.scss", "@use 'vars';\n.a { color: vars.$"),
            ("vars.scss", "$brand: red;\n$_hidden: blue;\n@function tone() { @return 1; }"),
        ]);
        let doc = state.store.get(&uri("main.scss")).unwrap();
        let end = doc.line_index.position_at(&doc.text, doc.text.len());
        let found = labels(completion(&state, &uri("main.scss"), end));
        assert_eq!(found, vec!["$brand"]);
    }

    #[test]
    fn test_completion_unqualified_includes_locals_and_qualified_members() {
        let state = state_with(&[
            ("main.scss", "@use 'vars';\n$own: 1;\n@mixin m($p) { width: $"),
            ("vars.scss", "$brand: red;"),
        ]);
        let doc = state.store.get(&uri("main.scss")).unwrap();
        let end = doc.line_index.position_at(&doc.text, doc.text.len());
        let found = labels(completion(&state, &uri("main.scss"), end));
        assert!(found.contains(&"$p".to_string()));
        assert!(found.contains(&"$own".to_string()));
        assert!(found.contains(&"vars.$brand".to_string()));
    }

    #[test]
    fn test_completion_module_paths_and_sassdoc() {
        let state = state_with(&[("main.scss", "@use \"sass:\n/// @")]);
        let found = labels(completion(&state, &uri("main.scss"), Position::new(0, 10)));
        assert!(found.contains(&"sass:math".to_string()));
        let found = labels(completion(&state, &uri("main.scss"), Position::new(1, 5)));
        assert!(found.contains(&"@deprecated".to_string()));
    }

    #[test]
    fn test_deprecation_hint_spans_qualified_reference() {
        let state = state_with(&[
            ("a.scss", "@use 'b';\n.x { content: b.$old; }"),
            ("b.scss", "/// @deprecated gone\n$old: 1;"),
        ]);
        let found = diagnostics(&state, &uri("a.scss"), None);
        assert_eq!(found.len(), 1);
        let diagnostic = &found[0];
        assert_eq!(diagnostic.message, "gone");
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::HINT));
        assert_eq!(diagnostic.tags, Some(vec![DiagnosticTag::DEPRECATED]));
        assert_eq!(diagnostic.range.start, Position::new(1, 14));
        assert_eq!(diagnostic.range.end, Position::new(1, 20));
    }

    #[test]
    fn test_diagnostics_respect_setting() {
        let mut state = state_with(&[("a.scss", "/// @deprecated\n$old: 1;\n.x { a: $old; }")]);
        assert_eq!(diagnostics(&state, &uri("a.scss"), None)[0].message, "$old is deprecated");
        state.config.deprecation_diagnostics = false;
        assert!(diagnostics(&state, &uri("a.scss"), None).is_empty());
    }

    #[test]
    fn test_workspace_symbol_case_insensitive() {
        let state = state_with(&[
            ("a.scss", "$Brand-Color: red;\n@mixin brandify {}"),
            ("b.scss", "%brand-base { }"),
        ]);
        let found: Vec<String> = workspace_symbol(&state, "BRAND").into_iter().map(|s| s.name).collect();
        assert_eq!(found, vec!["$Brand-Color", "brandify", "%brand-base"]);
        assert_eq!(workspace_symbol(&state, "").len(), 3);
    }

    #[test]
    fn test_document_symbols_nest_parameters() {
        let state = state_with(&[("a.scss", "$a: 1;\n@mixin m($x, $y: 2) {}")]);
        let Some(DocumentSymbolResponse::Nested(symbols)) = document_symbol(&state, &uri("a.scss")) else {
            panic!("expected nested symbols");
        };
        assert_eq!(symbols.len(), 2);
        let children = symbols[1].children.as_ref().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].detail.as_deref(), Some("2"));
    }

    #[test]
    fn test_document_links_skip_builtins() {
        let state = state_with(&[("a.scss", "@use 'sass:math';\n@use 'b';"), ("b.scss", "")]);
        let links = document_links(&state, &uri("a.scss")).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, Some(uri("b.scss")));
    }
}
