//
// sassdoc.rs
//
// SassDoc (`///`) comment blocks above declarations: description,
// `@deprecated`, `@param`, `@return`, `@type`, and `@example`.
//

use anyhow::{bail, Result};

use crate::syntax::SyntaxTree;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamDoc {
    pub name: String,
    pub type_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SassDoc {
    pub description: Option<String>,
    /// Present when the block carries `@deprecated`; the text may be empty
    pub deprecated: Option<String>,
    pub params: Vec<ParamDoc>,
    pub returns: Option<String>,
    pub type_name: Option<String>,
    pub examples: Vec<String>,
}

impl SassDoc {
    pub fn param(&self, name: &str) -> Option<&ParamDoc> {
        let bare = name.trim_start_matches('$');
        self.params
            .iter()
            .find(|p| p.name.trim_start_matches('$') == bare)
    }
}

/// Extract the `///` block directly above the declaration at `offset`. A
/// block that fails to parse is logged and dropped.
pub fn extract_sassdoc(tree: &SyntaxTree, text: &str, offset: usize) -> Option<SassDoc> {
    let block = tree.doc_comment_lines(text, offset);
    if block.is_empty() {
        return None;
    }

    match parse_sassdoc_block(&block) {
        Ok(doc) => Some(doc),
        Err(e) => {
            log::trace!("Ignoring malformed sassdoc block above offset {}: {}", offset, e);
            None
        }
    }
}

/// Split `{type} rest` into the type and the remainder.
fn split_type(text: &str) -> Result<(Option<String>, &str)> {
    let text = text.trim_start();
    let Some(inner) = text.strip_prefix('{') else {
        return Ok((None, text));
    };
    let Some(close) = inner.find('}') else {
        bail!("unterminated type annotation");
    };
    Ok((
        Some(inner[..close].trim().to_string()),
        inner[close + 1..].trim_start(),
    ))
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

enum Section {
    Description,
    Param(usize),
    Return,
    Deprecated,
    Example,
    Other,
}

/// Parse the content lines of a block, prefixes already stripped.
pub fn parse_sassdoc_block(lines: &[&str]) -> Result<SassDoc> {
    let mut doc = SassDoc::default();
    let mut description = Vec::new();
    let mut section = Section::Description;

    for line in lines {
        let Some(tag_line) = line.trim_start().strip_prefix('@') else {
            match section {
                Section::Description => description.push(line.trim_end()),
                Section::Param(idx) => append(&mut doc.params[idx].description, line),
                Section::Return => append(&mut doc.returns, line),
                Section::Deprecated => append(&mut doc.deprecated, line),
                Section::Example => {
                    if let Some(example) = doc.examples.last_mut() {
                        if !example.is_empty() {
                            example.push('\n');
                        }
                        example.push_str(line.trim_end());
                    }
                }
                Section::Other => {}
            }
            continue;
        };

        let (tag, rest) = tag_line
            .split_once(char::is_whitespace)
            .unwrap_or((tag_line, ""));
        match tag {
            "param" | "arg" | "argument" | "parameter" => {
                let (type_name, rest) = split_type(rest)?;
                let rest = rest.trim_start();
                let (name, desc) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                if name.is_empty() {
                    bail!("@{} without a parameter name", tag);
                }
                let desc = desc.trim_start();
                let desc = desc.strip_prefix("- ").unwrap_or(desc);
                doc.params.push(ParamDoc {
                    name: name.to_string(),
                    type_name,
                    description: non_empty(desc),
                });
                section = Section::Param(doc.params.len() - 1);
            }
            "return" | "returns" => {
                let (type_name, rest) = split_type(rest)?;
                let text = match (type_name, non_empty(rest)) {
                    (Some(t), Some(d)) => format!("{} {}", t, d),
                    (Some(t), None) => t,
                    (None, d) => d.unwrap_or_default(),
                };
                doc.returns = Some(text);
                section = Section::Return;
            }
            "type" => {
                doc.type_name = non_empty(rest);
                section = Section::Other;
            }
            "deprecated" => {
                doc.deprecated = Some(rest.trim().to_string());
                section = Section::Deprecated;
            }
            "example" => {
                doc.examples.push(String::new());
                section = Section::Example;
            }
            _ => section = Section::Other,
        }
    }

    while description.last().is_some_and(|l| l.trim().is_empty()) {
        description.pop();
    }
    doc.description = non_empty(&description.join("\n"));
    Ok(doc)
}

fn append(target: &mut Option<String>, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match target {
        Some(existing) if !existing.is_empty() => {
            existing.push(' ');
            existing.push_str(line);
        }
        _ => *target = Some(line.to_string()),
    }
}
