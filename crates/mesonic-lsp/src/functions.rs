//! Builtin-function index for code-action recognizers.
//!
//! Reduces the project model to the one question the recognizers ask:
//! which builtin does a call name resolve to, and what keyword arguments
//! does that builtin accept. The index is read-only during a request.

use std::collections::HashMap;

/// Signature facts for one Meson builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionInfo {
    /// Canonical function name.
    pub id: &'static str,
    /// Keyword arguments the function accepts.
    pub kwargs: &'static [&'static str],
    /// Keyword arguments with a well-known default, as `(name, rendered
    /// default)` pairs. A call omitting one of these is not in canonical
    /// form.
    pub defaulted_kwargs: &'static [(&'static str, &'static str)],
}

const TARGET_COMMON_KWARGS: &[&str] = &[
    "build_by_default",
    "c_args",
    "cpp_args",
    "dependencies",
    "include_directories",
    "install",
    "install_dir",
    "link_args",
    "link_depends",
    "link_whole",
    "link_with",
    "name_prefix",
    "name_suffix",
    "objects",
    "override_options",
    "sources",
];

const SHARED_LIBRARY_KWARGS: &[&str] = &[
    "build_by_default",
    "c_args",
    "cpp_args",
    "darwin_versions",
    "dependencies",
    "include_directories",
    "install",
    "install_dir",
    "link_args",
    "link_depends",
    "link_whole",
    "link_with",
    "name_prefix",
    "name_suffix",
    "objects",
    "override_options",
    "sources",
    "soversion",
    "version",
    "vs_module_defs",
];

const SHARED_MODULE_KWARGS: &[&str] = &[
    "build_by_default",
    "c_args",
    "cpp_args",
    "dependencies",
    "include_directories",
    "install",
    "install_dir",
    "link_args",
    "link_depends",
    "link_whole",
    "link_with",
    "name_prefix",
    "name_suffix",
    "objects",
    "override_options",
    "sources",
    "vs_module_defs",
];

const STATIC_LIBRARY_KWARGS: &[&str] = &[
    "build_by_default",
    "c_args",
    "cpp_args",
    "dependencies",
    "include_directories",
    "install",
    "install_dir",
    "link_args",
    "link_depends",
    "link_whole",
    "link_with",
    "name_prefix",
    "name_suffix",
    "objects",
    "override_options",
    "pic",
    "prelink",
    "sources",
];

const LIBRARY_KWARGS: &[&str] = &[
    "build_by_default",
    "c_args",
    "cpp_args",
    "darwin_versions",
    "dependencies",
    "include_directories",
    "install",
    "install_dir",
    "link_args",
    "link_depends",
    "link_whole",
    "link_with",
    "name_prefix",
    "name_suffix",
    "objects",
    "override_options",
    "pic",
    "prelink",
    "sources",
    "soversion",
    "version",
    "vs_module_defs",
];

const BUILTINS: &[FunctionInfo] = &[
    FunctionInfo {
        id: "project",
        kwargs: &["default_options", "license", "meson_version", "subproject_dir", "version"],
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "executable",
        kwargs: TARGET_COMMON_KWARGS,
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "library",
        kwargs: LIBRARY_KWARGS,
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "static_library",
        kwargs: STATIC_LIBRARY_KWARGS,
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "shared_library",
        kwargs: SHARED_LIBRARY_KWARGS,
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "shared_module",
        kwargs: SHARED_MODULE_KWARGS,
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "declare_dependency",
        kwargs: &[
            "compile_args",
            "dependencies",
            "include_directories",
            "link_args",
            "link_whole",
            "link_with",
            "objects",
            "sources",
            "variables",
            "version",
        ],
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "copy_file",
        kwargs: &["install", "install_dir", "install_mode", "install_tag"],
        defaulted_kwargs: &[("install", "false")],
    },
    FunctionInfo {
        id: "dependency",
        kwargs: &["default_options", "fallback", "method", "required", "static", "version"],
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "files",
        kwargs: &[],
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "include_directories",
        kwargs: &["is_system"],
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "import",
        kwargs: &["disabler", "required"],
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "configure_file",
        kwargs: &[
            "capture",
            "command",
            "configuration",
            "copy",
            "input",
            "install",
            "install_dir",
            "output",
        ],
        defaulted_kwargs: &[],
    },
    FunctionInfo {
        id: "get_option",
        kwargs: &[],
        defaulted_kwargs: &[],
    },
];

/// Resolves call names to builtin signatures.
#[derive(Debug)]
pub struct ProjectIndex {
    functions: HashMap<&'static str, FunctionInfo>,
    aliases: HashMap<String, &'static str>,
}

impl ProjectIndex {
    /// Index over the Meson builtins the recognizers care about.
    pub fn builtin() -> Self {
        let functions = BUILTINS.iter().map(|f| (f.id, *f)).collect();
        Self {
            functions,
            aliases: HashMap::new(),
        }
    }

    /// Register an alternate name for a builtin. Returns `false` when the
    /// target is unknown.
    pub fn insert_alias(&mut self, alias: impl Into<String>, target: &str) -> bool {
        match self.functions.get(target) {
            Some(info) => {
                self.aliases.insert(alias.into(), info.id);
                true
            }
            None => false,
        }
    }

    /// Look up the builtin a call name refers to, following aliases.
    pub fn resolve_function(&self, name: &str) -> Option<&FunctionInfo> {
        if let Some(info) = self.functions.get(name) {
            return Some(info);
        }
        self.aliases
            .get(name)
            .and_then(|id| self.functions.get(id))
    }
}

impl Default for ProjectIndex {
    fn default() -> Self {
        Self::builtin()
    }
}
