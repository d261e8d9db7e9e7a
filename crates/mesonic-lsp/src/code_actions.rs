//! Code-action synthesis over a parsed Meson build script.
//!
//! A single pre-order walk visits every node of the syntax tree, fires the
//! pattern recognizers on integer literals and function calls that overlap
//! the requested range, and normalizes each match into an LSP `CodeAction`
//! with a one-edit `WorkspaceEdit`. Recognizer non-applicability is silent;
//! the only caller-visible failure is an inverted range.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tower_lsp::lsp_types::*;

use mesonic_syntax::ast::{IntegerBase, NodeId, NodeKind, Span, SyntaxTree};

use crate::functions::{FunctionInfo, ProjectIndex};
use crate::utils::{offset_to_range, position_to_offset};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid range: end precedes start")]
    InvalidRange,
}

/// Collect every applicable code action for `range` in `tree`.
///
/// Actions come back in tree-discovery (pre-order) order. An empty result
/// means no pattern matched; it is not an error.
pub fn collect_code_actions(
    range: Range,
    uri: &Url,
    index: &ProjectIndex,
    tree: &SyntaxTree,
) -> Result<Vec<CodeAction>, RequestError> {
    let source = tree.source();
    let start = position_to_offset(source, range.start);
    let end = position_to_offset(source, range.end);
    if end < start {
        return Err(RequestError::InvalidRange);
    }
    debug_assert!(
        matches!(tree.kind(tree.root()), NodeKind::BuildDefinition { .. }),
        "tree root must be a build definition"
    );

    let mut visitor = CodeActionVisitor {
        tree,
        index,
        uri,
        start,
        end,
        matched: HashSet::new(),
        actions: Vec::new(),
    };
    visitor.visit(tree.root());
    Ok(visitor.actions)
}

fn creates_library(id: &str) -> bool {
    matches!(id, "static_library" | "shared_library" | "library")
}

fn render_integer(value: u64, base: IntegerBase) -> String {
    match base {
        IntegerBase::Decimal => format!("{value}"),
        IntegerBase::Hexadecimal => format!("0x{value:x}"),
        IntegerBase::Octal => format!("0o{value:o}"),
        IntegerBase::Binary => format!("0b{value:b}"),
    }
}

struct CodeActionVisitor<'a> {
    tree: &'a SyntaxTree,
    index: &'a ProjectIndex,
    uri: &'a Url,
    start: usize,
    end: usize,
    /// Pattern-root nodes already considered this request.
    matched: HashSet<NodeId>,
    actions: Vec<CodeAction>,
}

impl<'a> CodeActionVisitor<'a> {
    fn visit(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::IntegerLiteral { value, base } => {
                self.visit_integer_literal(id, *value, *base)
            }
            NodeKind::FunctionExpression { name, args } => {
                self.visit_function_expression(id, *name, *args)
            }
            _ => {}
        }
        for child in self.tree.children(id) {
            self.visit(child);
        }
    }

    /// Byte-offset overlap between the node and the request, half-open on
    /// both sides: a node starting exactly at the range end is out, a node
    /// whose span equals the range is in. With `record`, the node is
    /// considered at most once per request.
    fn in_range(&mut self, id: NodeId, record: bool) -> bool {
        let span = self.tree.span(id);
        if !(span.start < self.end && self.start < span.end) {
            return false;
        }
        if record && !self.matched.insert(id) {
            return false;
        }
        true
    }

    // ---------------------------------------------------------------
    // Integer base conversion
    // ---------------------------------------------------------------

    fn visit_integer_literal(&mut self, id: NodeId, value: u64, base: IntegerBase) {
        if !self.in_range(id, false) {
            return;
        }
        let span = self.tree.span(id);
        for target in [
            IntegerBase::Decimal,
            IntegerBase::Hexadecimal,
            IntegerBase::Octal,
            IntegerBase::Binary,
        ] {
            if target == base {
                continue;
            }
            self.push_replacement(
                span,
                render_integer(value, target),
                format!("Convert to {target} literal"),
                CodeActionKind::REFACTOR_REWRITE,
            );
        }
    }

    // ---------------------------------------------------------------
    // Function-call recognizers
    // ---------------------------------------------------------------

    fn visit_function_expression(&mut self, id: NodeId, name: NodeId, args: NodeId) {
        if !self.in_range(id, true) {
            return;
        }
        let Some(info) = self.index.resolve_function(self.tree.node_text(name)) else {
            // Unresolved calls match nothing; children are still walked.
            return;
        };
        self.copy_file_action(id, name, args, info);
        self.declare_dependency_action(id, info);
        self.library_to_generic_action(name, info);
        self.shared_library_to_module_action(id, name, args, info);
        self.module_to_shared_library_action(name, info);
    }

    /// Appends the index's defaulted keywords a `copy_file` call omits,
    /// keeping existing arguments verbatim.
    fn copy_file_action(&mut self, id: NodeId, name: NodeId, args: NodeId, info: &FunctionInfo) {
        if info.id != "copy_file" {
            return;
        }
        let present = self.keyword_names(args);
        let missing: Vec<&(&str, &str)> = info
            .defaulted_kwargs
            .iter()
            .filter(|(k, _)| !present.iter().any(|p| p == k))
            .collect();
        if missing.is_empty() {
            return;
        }
        let mut parts: Vec<String> = self
            .argument_ids(args)
            .iter()
            .map(|a| self.tree.node_text(*a).to_owned())
            .collect();
        for (k, v) in missing {
            parts.push(format!("{k} : {v}"));
        }
        let new_text = format!("{}({})", self.tree.node_text(name), parts.join(", "));
        self.push_replacement(
            self.tree.span(id),
            new_text,
            "Add missing copy_file arguments".to_owned(),
            CodeActionKind::QUICKFIX,
        );
    }

    /// Offers a `declare_dependency` companion for a library assigned to a
    /// bare identifier, unless the enclosing block already declares it.
    fn declare_dependency_action(&mut self, id: NodeId, info: &FunctionInfo) {
        if !creates_library(info.id) {
            return;
        }
        let Some((var_name, assign_id)) = self.extract_variable_name(id) else {
            return;
        };
        let dep_name = format!("{var_name}_dep");
        if self.dependency_already_declared(assign_id, &dep_name) {
            return;
        }
        let insert_at = self.tree.span(assign_id).end;
        self.push_insertion(
            insert_at,
            format!("\n{dep_name} = declare_dependency(link_with : {var_name})"),
            format!("Declare dependency '{dep_name}'"),
            CodeActionKind::REFACTOR,
        );
    }

    fn library_to_generic_action(&mut self, name: NodeId, info: &FunctionInfo) {
        if !matches!(info.id, "static_library" | "shared_library") {
            return;
        }
        self.push_replacement(
            self.tree.span(name),
            "library".to_owned(),
            "Convert to library()".to_owned(),
            CodeActionKind::REFACTOR_REWRITE,
        );
    }

    /// `shared_library` → `shared_module`. Keywords the module target does
    /// not accept (versioning) force a whole-call rewrite that drops them;
    /// otherwise only the callee identifier changes.
    fn shared_library_to_module_action(
        &mut self,
        id: NodeId,
        name: NodeId,
        args: NodeId,
        info: &FunctionInfo,
    ) {
        if info.id != "shared_library" {
            return;
        }
        let Some(target) = self.index.resolve_function("shared_module") else {
            return;
        };
        let title = "Convert to shared_module()".to_owned();
        let incompatible = self.argument_ids(args).iter().any(|a| {
            match self.tree.kind(*a) {
                NodeKind::KeywordItem { name, .. } => {
                    !target.kwargs.contains(&self.tree.node_text(*name))
                }
                _ => false,
            }
        });
        if !incompatible {
            self.push_replacement(
                self.tree.span(name),
                "shared_module".to_owned(),
                title,
                CodeActionKind::REFACTOR_REWRITE,
            );
            return;
        }
        let parts: Vec<String> = self
            .argument_ids(args)
            .iter()
            .filter(|a| match self.tree.kind(**a) {
                NodeKind::KeywordItem { name, .. } => {
                    target.kwargs.contains(&self.tree.node_text(*name))
                }
                _ => true,
            })
            .map(|a| self.tree.node_text(*a).to_owned())
            .collect();
        self.push_replacement(
            self.tree.span(id),
            format!("shared_module({})", parts.join(", ")),
            title,
            CodeActionKind::REFACTOR_REWRITE,
        );
    }

    /// `shared_module` → `shared_library`; the target accepts a superset of
    /// keywords, so the callee identifier is always enough.
    fn module_to_shared_library_action(&mut self, name: NodeId, info: &FunctionInfo) {
        if info.id != "shared_module" {
            return;
        }
        self.push_replacement(
            self.tree.span(name),
            "shared_library".to_owned(),
            "Convert to shared_library()".to_owned(),
            CodeActionKind::REFACTOR_REWRITE,
        );
    }

    // ---------------------------------------------------------------
    // Structural helpers
    // ---------------------------------------------------------------

    /// Variable a call is assigned to: the call's immediate parent must be
    /// an assignment whose left side is a bare identifier. Also returns the
    /// assignment node for sibling inspection.
    fn extract_variable_name(&self, call: NodeId) -> Option<(String, NodeId)> {
        let parent = self.tree.parent(call)?;
        let NodeKind::AssignmentStatement { lhs, .. } = self.tree.kind(parent) else {
            return None;
        };
        let NodeKind::IdExpression { name } = self.tree.kind(*lhs) else {
            return None;
        };
        Some((name.clone(), parent))
    }

    /// True when a sibling statement in the enclosing block already assigns
    /// `dep_name` from a `declare_dependency` call.
    fn dependency_already_declared(&self, assign_id: NodeId, dep_name: &str) -> bool {
        let Some(block) = self.tree.parent(assign_id) else {
            return false;
        };
        for stmt in self.tree.children(block) {
            let NodeKind::AssignmentStatement { lhs, rhs, .. } = self.tree.kind(stmt) else {
                continue;
            };
            let NodeKind::IdExpression { name } = self.tree.kind(*lhs) else {
                continue;
            };
            if name != dep_name {
                continue;
            }
            let NodeKind::FunctionExpression { name: callee, .. } = self.tree.kind(*rhs) else {
                continue;
            };
            let resolved = self.index.resolve_function(self.tree.node_text(*callee));
            if resolved.is_some_and(|info| info.id == "declare_dependency") {
                return true;
            }
        }
        false
    }

    fn argument_ids(&self, args: NodeId) -> Vec<NodeId> {
        match self.tree.kind(args) {
            NodeKind::ArgumentList { arguments } => arguments.clone(),
            _ => Vec::new(),
        }
    }

    fn keyword_names(&self, args: NodeId) -> Vec<&'a str> {
        self.argument_ids(args)
            .into_iter()
            .filter_map(|a| match self.tree.kind(a) {
                NodeKind::KeywordItem { name, .. } => Some(self.tree.node_text(*name)),
                _ => None,
            })
            .collect()
    }

    // ---------------------------------------------------------------
    // Action builder
    // ---------------------------------------------------------------

    fn push_replacement(&mut self, span: Span, new_text: String, title: String, kind: CodeActionKind) {
        let range = offset_to_range(self.tree.source(), span.start, span.end);
        self.push_action(title, kind, range, new_text);
    }

    fn push_insertion(&mut self, offset: usize, new_text: String, title: String, kind: CodeActionKind) {
        let range = offset_to_range(self.tree.source(), offset, offset);
        self.push_action(title, kind, range, new_text);
    }

    fn push_action(&mut self, title: String, kind: CodeActionKind, range: Range, new_text: String) {
        let mut changes = HashMap::new();
        changes.insert(self.uri.clone(), vec![TextEdit { range, new_text }]);
        self.actions.push(CodeAction {
            title,
            kind: Some(kind),
            edit: Some(WorkspaceEdit {
                changes: Some(changes),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
}
