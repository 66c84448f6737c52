//! Code structure provider: function boundaries and statement lists.
//!
//! The mining pipeline only depends on the [`StructureProvider`] trait; the
//! tree-sitter implementation below is the default provider. Providers fail
//! silently (empty list) on unparsable input so one malformed file never
//! aborts a history walk.

use parking_lot::Mutex;
use tree_sitter::{Language as TsLanguage, Node, Parser as TsParser};

/// A function extracted from one file snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSource {
    /// Stable signature within the file, e.g. `put(String key, V value)`.
    pub signature: String,
    /// Ordered top-level statements of the body, as text.
    pub statements: Vec<String>,
}

/// Extracts functions with stable identifiers and ordered statement bodies.
pub trait StructureProvider: Send + Sync {
    /// Extract all functions from the file text. Returns an empty list when
    /// the input cannot be parsed.
    fn extract_functions(&self, text: &str) -> Vec<FunctionSource>;
}

/// Source languages with a bundled grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Java,
    Rust,
    Python,
    Go,
}

impl Language {
    /// Detect the language from a file extension such as `.java`.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.') {
            "java" => Some(Language::Java),
            "rs" => Some(Language::Rust),
            "py" => Some(Language::Python),
            "go" => Some(Language::Go),
            _ => None,
        }
    }

    fn grammar(self) -> TsLanguage {
        match self {
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
        }
    }

    fn function_node_kinds(self) -> &'static [&'static str] {
        match self {
            Language::Java => &["method_declaration", "constructor_declaration"],
            Language::Rust => &["function_item"],
            Language::Python => &["function_definition"],
            Language::Go => &["function_declaration", "method_declaration"],
        }
    }
}

/// Tree-sitter backed structure provider for a single language.
pub struct TreeSitterProvider {
    language: Language,
    parser: Mutex<TsParser>,
}

impl TreeSitterProvider {
    /// Create a provider for one language.
    pub fn new(language: Language) -> Self {
        let mut parser = TsParser::new();
        parser
            .set_language(&language.grammar())
            .expect("bundled grammar is ABI-compatible");
        Self {
            language,
            parser: Mutex::new(parser),
        }
    }

    /// Create a provider for the language owning a file extension.
    pub fn for_extension(extension: &str) -> Option<Self> {
        Language::from_extension(extension).map(Self::new)
    }
}

impl StructureProvider for TreeSitterProvider {
    fn extract_functions(&self, text: &str) -> Vec<FunctionSource> {
        let tree = {
            let mut parser = self.parser.lock();
            match parser.parse(text, None) {
                Some(tree) => tree,
                None => return Vec::new(),
            }
        };

        let mut functions = Vec::new();
        collect_functions(
            tree.root_node(),
            text.as_bytes(),
            self.language.function_node_kinds(),
            &mut functions,
        );
        functions
    }
}

fn collect_functions(
    node: Node<'_>,
    source: &[u8],
    kinds: &[&str],
    out: &mut Vec<FunctionSource>,
) {
    if kinds.contains(&node.kind()) {
        if let Some(function) = extract_function(&node, source) {
            out.push(function);
        }
    }
    for child in node.children(&mut node.walk()) {
        collect_functions(child, source, kinds, out);
    }
}

fn extract_function(node: &Node<'_>, source: &[u8]) -> Option<FunctionSource> {
    let name = node
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source).ok())?;

    let parameters = node
        .child_by_field_name("parameters")
        .and_then(|n| n.utf8_text(source).ok())
        .map(normalize_whitespace)
        .unwrap_or_else(|| "()".to_string());

    let statements = node
        .child_by_field_name("body")
        .map(|body| {
            body.named_children(&mut body.walk())
                .filter(|child| !child.kind().ends_with("comment"))
                .filter_map(|child| child.utf8_text(source).ok())
                .map(|s| s.trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    Some(FunctionSource {
        signature: format!("{name}{parameters}"),
        statements,
    })
}

/// Collapse runs of whitespace so formatting changes do not alter identity.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_java_methods() {
        let provider = TreeSitterProvider::new(Language::Java);
        let source = r#"
            class Ledger {
                int balance;

                public void credit(int amount) {
                    balance += amount;
                    log(amount);
                }

                public int read() {
                    return balance;
                }
            }
        "#;
        let functions = provider.extract_functions(source);
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].signature, "credit(int amount)");
        assert_eq!(
            functions[0].statements,
            vec!["balance += amount;", "log(amount);"]
        );
        assert_eq!(functions[1].signature, "read()");
        assert_eq!(functions[1].statements, vec!["return balance;"]);
    }

    #[test]
    fn test_signature_ignores_formatting() {
        let provider = TreeSitterProvider::new(Language::Java);
        let compact = provider.extract_functions("class A { void f(int a, int b) {} }");
        let spread = provider.extract_functions("class A { void f(int a,\n        int b) {} }");
        assert_eq!(compact[0].signature, spread[0].signature);
    }

    #[test]
    fn test_unparsable_input_is_silent() {
        let provider = TreeSitterProvider::new(Language::Java);
        // tree-sitter is error-tolerant; completely alien input must simply
        // produce no functions rather than an error.
        let functions = provider.extract_functions("\u{0}\u{1}\u{2} not java at all");
        assert!(functions.is_empty());
    }

    #[test]
    fn test_extract_rust_functions() {
        let provider = TreeSitterProvider::new(Language::Rust);
        let functions = provider.extract_functions("fn main() {\n    println!(\"hi\");\n}\n");
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].signature, "main()");
        assert_eq!(functions[0].statements, vec!["println!(\"hi\");"]);
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension(".java"), Some(Language::Java));
        assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension(".kt"), None);
    }
}
