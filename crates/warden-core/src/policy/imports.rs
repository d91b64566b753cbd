//! Syntax-level import resolution for Python code
//!
//! Import checks must not rely on substring matching: `os` and `os.path` or
//! `json` and `jsonpickle` overlap textually but are different modules.

use rustpython_parser::{Parse, ParseError, ast};

/// One module reference found in an `import` or `from ... import` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    /// Dotted module path as written, prefixed with dots for relative imports
    pub module: String,
    /// `from . import x` / `from .mod import x`
    pub relative: bool,
}

/// Parse `code` and return every import, including ones nested in bodies
///
/// Fails with the parser's error when the code is not valid Python.
pub fn collect_imports(code: &str) -> Result<Vec<ImportRef>, ParseError> {
    let suite = ast::Suite::parse(code, "<sandbox>")?;
    let mut found = Vec::new();
    walk_body(&suite, &mut found);
    Ok(found)
}

fn walk_body(body: &[ast::Stmt], found: &mut Vec<ImportRef>) {
    for stmt in body {
        walk_stmt(stmt, found);
    }
}

fn walk_stmt(stmt: &ast::Stmt, found: &mut Vec<ImportRef>) {
    match stmt {
        ast::Stmt::Import(import) => {
            for alias in &import.names {
                found.push(ImportRef {
                    module: alias.name.as_str().to_string(),
                    relative: false,
                });
            }
        }
        ast::Stmt::ImportFrom(import) => {
            let level = import.level.as_ref().map(|l| l.to_u32()).unwrap_or(0);
            let module = import
                .module
                .as_ref()
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            found.push(ImportRef {
                module: format!("{}{}", ".".repeat(level as usize), module),
                relative: level > 0 || import.module.is_none(),
            });
        }
        ast::Stmt::FunctionDef(def) => walk_body(&def.body, found),
        ast::Stmt::AsyncFunctionDef(def) => walk_body(&def.body, found),
        ast::Stmt::ClassDef(def) => walk_body(&def.body, found),
        ast::Stmt::If(node) => {
            walk_body(&node.body, found);
            walk_body(&node.orelse, found);
        }
        ast::Stmt::For(node) => {
            walk_body(&node.body, found);
            walk_body(&node.orelse, found);
        }
        ast::Stmt::AsyncFor(node) => {
            walk_body(&node.body, found);
            walk_body(&node.orelse, found);
        }
        ast::Stmt::While(node) => {
            walk_body(&node.body, found);
            walk_body(&node.orelse, found);
        }
        ast::Stmt::With(node) => walk_body(&node.body, found),
        ast::Stmt::AsyncWith(node) => walk_body(&node.body, found),
        ast::Stmt::Try(node) => {
            walk_body(&node.body, found);
            for handler in &node.handlers {
                let ast::ExceptHandler::ExceptHandler(handler) = handler;
                walk_body(&handler.body, found);
            }
            walk_body(&node.orelse, found);
            walk_body(&node.finalbody, found);
        }
        ast::Stmt::TryStar(node) => {
            walk_body(&node.body, found);
            for handler in &node.handlers {
                let ast::ExceptHandler::ExceptHandler(handler) = handler;
                walk_body(&handler.body, found);
            }
            walk_body(&node.orelse, found);
            walk_body(&node.finalbody, found);
        }
        ast::Stmt::Match(node) => {
            for case in &node.cases {
                walk_body(&case.body, found);
            }
        }
        _ => {}
    }
}

/// Whether `module` is permitted by `allowed`
///
/// An entry allows its exact dotted path and anything below it: `json`
/// allows `json` and `json.decoder`, while `os.path` allows `os.path` but
/// not `os`. Relative imports are never allowed.
pub fn is_import_allowed(import: &ImportRef, allowed: &[String]) -> bool {
    if import.relative || import.module.is_empty() {
        return false;
    }
    allowed.iter().any(|entry| {
        import.module == *entry
            || import
                .module
                .strip_prefix(entry.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    fn absolute(module: &str) -> ImportRef {
        ImportRef {
            module: module.to_string(),
            relative: false,
        }
    }

    #[test]
    fn test_collects_nested_imports() {
        let code = r#"
import json
def f():
    import os
    if True:
        from collections import deque
class C:
    try:
        import socket
    except ImportError:
        import math
    finally:
        pass
"#;
        let modules: Vec<String> = collect_imports(code)
            .unwrap()
            .into_iter()
            .map(|i| i.module)
            .collect();
        assert_eq!(modules, vec!["json", "os", "collections", "socket", "math"]);
    }

    #[test]
    fn test_relative_imports_flagged() {
        let imports = collect_imports("from . import sibling\nfrom ..pkg import x\n").unwrap();
        assert!(imports.iter().all(|i| i.relative));
        assert_eq!(imports[0].module, ".");
        assert_eq!(imports[1].module, "..pkg");
    }

    #[test]
    fn test_syntax_error_reported() {
        assert!(collect_imports("def broken(:\n    pass").is_err());
    }

    #[test]
    fn test_dotted_entry_does_not_allow_parent() {
        let allowed = allow(&["os.path"]);
        assert!(!is_import_allowed(&absolute("os"), &allowed));
        assert!(is_import_allowed(&absolute("os.path"), &allowed));
        assert!(!is_import_allowed(&absolute("os.pathlib"), &allowed));
    }

    #[test]
    fn test_top_level_entry_allows_submodules() {
        let allowed = allow(&["json"]);
        assert!(is_import_allowed(&absolute("json.decoder"), &allowed));
        assert!(!is_import_allowed(&absolute("jsonpickle"), &allowed));
    }
}
