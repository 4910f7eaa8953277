//! Per-language pattern tables.
//!
//! A table is plain data: the scan loop in [`super::detector`] never branches on a language
//! name. Declaration patterns must expose the declared identifier as the named group
//! `name` (a pattern without it yields an `anonymous` scope). Dependency and export
//! patterns report their first capture group; a capture holding a comma separated list
//! (`export { a, b as c }`, `__all__ = ["x", "y"]`) is split into individual names.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// Scopes end when their brace balance returns to zero.
    Braces,
    /// Scopes end before the next line indented at or left of the declaration.
    Indentation,
}

#[derive(Debug, Clone)]
pub struct LanguageSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub block_style: BlockStyle,
    pub declarations: Vec<String>,
    pub dependencies: Vec<String>,
    pub exports: Vec<String>,
    /// Identifiers a declaration pattern may capture that are really control flow
    /// (`if (x) {` looks like a method to a regex).
    pub ignored_names: Vec<String>,
}

/// Language used for tags that match no registered table.
pub const FALLBACK_LANGUAGE: &str = "generic";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const CONTROL_FLOW: &[&str] = &[
    "if", "else", "for", "foreach", "while", "do", "switch", "case", "catch", "try", "finally",
    "with", "return", "using", "lock", "synchronized", "new", "function", "match", "loop",
];

pub fn builtin_languages() -> Vec<LanguageSpec> {
    vec![
        typescript(),
        python(),
        rust(),
        go(),
        java(),
        csharp(),
        generic(),
    ]
}

pub fn typescript() -> LanguageSpec {
    LanguageSpec {
        name: "typescript".to_string(),
        aliases: strings(&["typescriptreact", "javascript", "javascriptreact", "ts", "tsx", "js", "jsx"]),
        block_style: BlockStyle::Braces,
        declarations: strings(&[
            r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)",
            r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)?\s*[(<]",
            r"^\s*(?:export\s+)?(?:declare\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)",
            r"^\s*(?:export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+(?P<name>[A-Za-z_$][\w$]*)",
            r"^\s*(?:export\s+)?(?:declare\s+)?(?:namespace|module)\s+(?P<name>[A-Za-z_$][\w$.]*)",
            r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=>",
            r"^\s*(?:(?:public|private|protected|static|async|readonly|override|get|set)\s+)*(?P<name>[A-Za-z_$][\w$]*)\s*\([^)]*\)\s*(?::\s*[^{;]+)?\{",
        ]),
        dependencies: strings(&[
            r#"^\s*import\s+(?:type\s+)?(?:[\w*{}\s,$]+\s+from\s+)?['"]([^'"]+)['"]"#,
            r#"^\s*export\s+(?:\*|\{[^}]*\})\s+from\s+['"]([^'"]+)['"]"#,
            r#"require\(\s*['"]([^'"]+)['"]\s*\)"#,
            r#"import\(\s*['"]([^'"]+)['"]\s*\)"#,
        ]),
        exports: strings(&[
            r"^\s*export\s+(?:default\s+)?(?:declare\s+)?(?:async\s+)?(?:abstract\s+)?(?:class|function\*?|const|let|var|interface|type|enum|namespace)\s+([A-Za-z_$][\w$]*)",
            r"^\s*export\s*\{([^}]*)\}",
            r"module\.exports\.([A-Za-z_$][\w$]*)\s*=",
            r"exports\.([A-Za-z_$][\w$]*)\s*=",
        ]),
        ignored_names: strings(CONTROL_FLOW),
    }
}

pub fn python() -> LanguageSpec {
    LanguageSpec {
        name: "python".to_string(),
        aliases: strings(&["py"]),
        block_style: BlockStyle::Indentation,
        declarations: strings(&[
            r"^\s*(?:async\s+)?def\s+(?P<name>\w+)",
            r"^\s*class\s+(?P<name>\w+)",
        ]),
        dependencies: strings(&[r"^\s*from\s+([\w.]+)\s+import\b", r"^\s*import\s+([\w.]+)"]),
        exports: strings(&[r"__all__\s*(?::[^=]+)?=\s*[\[(]([^\])]*)[\])]"]),
        ignored_names: Vec::new(),
    }
}

pub fn rust() -> LanguageSpec {
    LanguageSpec {
        name: "rust".to_string(),
        aliases: strings(&["rs"]),
        block_style: BlockStyle::Braces,
        declarations: strings(&[
            r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(?P<name>\w+)"#,
            r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|union|trait)\s+(?P<name>\w+)",
            r"^\s*(?:unsafe\s+)?impl(?:<[^>]*>)?\s+(?:[\w:<>, &']+\s+for\s+)?(?P<name>\w+)",
            r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(?P<name>\w+)\s*\{",
        ]),
        dependencies: strings(&[r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([\w:]+)", r"^\s*extern\s+crate\s+(\w+)"]),
        exports: strings(&[
            r"^\s*pub(?:\([^)]*\))?\s+(?:async\s+)?(?:unsafe\s+)?(?:fn|struct|enum|trait|const|static|type|mod|union)\s+(\w+)",
        ]),
        ignored_names: strings(CONTROL_FLOW),
    }
}

pub fn go() -> LanguageSpec {
    LanguageSpec {
        name: "go".to_string(),
        aliases: strings(&["golang"]),
        block_style: BlockStyle::Braces,
        declarations: strings(&[
            r"^\s*func\s+(?:\([^)]*\)\s*)?(?P<name>\w+)",
            r"^\s*type\s+(?P<name>\w+)\s+(?:struct|interface)\b",
        ]),
        dependencies: strings(&[r#"^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#, r#"^\s+(?:[\w.]+\s+)?"([^"]+)"\s*$"#]),
        exports: strings(&[r"^\s*func\s+(?:\([^)]*\)\s*)?([A-Z]\w*)", r"^\s*type\s+([A-Z]\w*)"]),
        ignored_names: strings(CONTROL_FLOW),
    }
}

pub fn java() -> LanguageSpec {
    LanguageSpec {
        name: "java".to_string(),
        aliases: strings(&["kotlin", "scala"]),
        block_style: BlockStyle::Braces,
        declarations: strings(&[
            r"^\s*(?:(?:public|protected|private|abstract|static|final|sealed|non-sealed)\s+)*(?:class|interface|enum|record)\s+(?P<name>\w+)",
            r"^\s*(?:(?:public|protected|private|static|final|abstract|synchronized|native|default)\s+)+[\w<>\[\],.?\s]+?\s+(?P<name>\w+)\s*\([^)]*\)",
        ]),
        dependencies: strings(&[r"^\s*import\s+(?:static\s+)?([\w.]+)"]),
        exports: strings(&[
            r"^\s*public\s+(?:(?:abstract|static|final|sealed)\s+)*(?:class|interface|enum|record)\s+(\w+)",
        ]),
        ignored_names: strings(CONTROL_FLOW),
    }
}

pub fn csharp() -> LanguageSpec {
    LanguageSpec {
        name: "csharp".to_string(),
        aliases: strings(&["cs", "c#"]),
        block_style: BlockStyle::Braces,
        declarations: strings(&[
            r"^\s*(?:(?:public|protected|private|internal|abstract|static|sealed|partial)\s+)*(?:class|interface|struct|enum|record)\s+(?P<name>\w+)",
            r"^\s*namespace\s+(?P<name>[\w.]+)",
            r"^\s*(?:(?:public|protected|private|internal|static|virtual|override|abstract|async|sealed)\s+)+[\w<>\[\],.?\s]+?\s+(?P<name>\w+)\s*\([^)]*\)",
        ]),
        dependencies: strings(&[r"^\s*using\s+(?:static\s+)?([\w.]+)\s*;"]),
        exports: strings(&[
            r"^\s*public\s+(?:(?:abstract|static|sealed|partial)\s+)*(?:class|interface|struct|enum|record)\s+(\w+)",
        ]),
        ignored_names: strings(CONTROL_FLOW),
    }
}

pub fn generic() -> LanguageSpec {
    LanguageSpec {
        name: FALLBACK_LANGUAGE.to_string(),
        aliases: Vec::new(),
        block_style: BlockStyle::Braces,
        declarations: strings(&[
            r"^\s*(?:\w+\s+)*(?:function|func|fn|def|class|struct|interface|trait|enum)\s+(?P<name>\w+)",
        ]),
        dependencies: strings(&[
            r#"^\s*(?:import|use|using|require|include)\s+['"<]?([\w./:-]+)"#,
            r#"^\s*#include\s+[<"]([^>"]+)[>"]"#,
        ]),
        exports: strings(&[r"^\s*export\s+(?:\w+\s+)*?(\w+)\s*[=({]"]),
        ignored_names: strings(CONTROL_FLOW),
    }
}
