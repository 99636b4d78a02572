//! Import scanning and import-block reconstruction.
//!
//! Scanning feeds the `dependencies_list` prompt input: every `.java`
//! file under a cartridge is read and its import statements collected,
//! deduplicated in first-seen order, minus excluded package prefixes.
//!
//! Reconstruction is the final rewrite stage: all import lines are
//! pulled out of the file body, sorted, re-bucketed (static, `java.`,
//! `jakarta.`, `org.`, `com.`, everything else) with one blank line
//! between non-empty groups, and re-inserted after the package
//! declaration. Duplicates are preserved, not collapsed.

use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use walkdir::WalkDir;

/// One `import x.y.Z;` statement, full line.
pub static IMPORT_STMT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^import\s+([^;]+);").unwrap());

/// Import line plus any trailing whitespace, for removal from the body.
static IMPORT_STMT_TRAILING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^import\s+[^;]+;\s*").unwrap());

/// Import statement on a trimmed single line, capturing the qualified
/// name (static keyword stripped).
static IMPORT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^import\s+(?:static\s+)?([\w.]+);").unwrap());

static PACKAGE_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(package\s+[^;]+;)\s*").unwrap());

/// Collect every `.java` file under `root`, as paths relative to `root`,
/// sorted for deterministic output.
pub fn list_source_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "java"))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|rel| rel.to_string_lossy().into_owned())
        })
        .collect();
    files.sort();
    files
}

/// Scan all `.java` files under `root` for import statements, keeping
/// first-seen order, deduplicated, minus any qualified name starting
/// with one of `exclusion_prefixes`. Unreadable files are skipped.
pub fn scan_imports(root: &Path, exclusion_prefixes: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut imports = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "java"))
    {
        let content = match std::fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), %err, "skipping unreadable file");
                continue;
            }
        };
        for line in content.lines() {
            if let Some(caps) = IMPORT_NAME.captures(line.trim()) {
                let name = caps[1].to_string();
                if exclusion_prefixes.iter().any(|p| name.starts_with(p)) {
                    continue;
                }
                if seen.insert(name.clone()) {
                    imports.push(name);
                }
            }
        }
    }
    imports
}

/// Rebuild the file's import block: extract, sort, group, and re-insert
/// after the package declaration (or prepend when there is none).
pub fn reorganize_imports(content: &str) -> String {
    let mut imports: Vec<String> = IMPORT_STMT
        .find_iter(content)
        .map(|m| m.as_str().to_string())
        .collect();
    if imports.is_empty() {
        return content.to_string();
    }

    let body = IMPORT_STMT_TRAILING.replace_all(content, "").into_owned();
    imports.sort();

    let mut static_imports = Vec::new();
    let mut java_imports = Vec::new();
    let mut jakarta_imports = Vec::new();
    let mut org_imports = Vec::new();
    let mut com_imports = Vec::new();
    let mut other_imports = Vec::new();

    for import in imports {
        if import.contains("static ") {
            static_imports.push(import);
        } else if import.starts_with("import java.") {
            java_imports.push(import);
        } else if import.starts_with("import jakarta.") {
            jakarta_imports.push(import);
        } else if import.starts_with("import org.") {
            org_imports.push(import);
        } else if import.starts_with("import com.") {
            com_imports.push(import);
        } else {
            other_imports.push(import);
        }
    }

    let block = [
        static_imports,
        java_imports,
        jakarta_imports,
        org_imports,
        com_imports,
        other_imports,
    ]
    .iter()
    .filter(|group| !group.is_empty())
    .map(|group| group.join("\n"))
    .collect::<Vec<_>>()
    .join("\n\n");

    match PACKAGE_DECL.captures(&body) {
        Some(caps) => {
            let full = caps.get(0).unwrap();
            let decl = caps.get(1).unwrap().as_str();
            format!(
                "{}{decl}\n\n{block}\n{}",
                &body[..full.start()],
                &body[full.end()..]
            )
        }
        None => format!("{block}\n{body}"),
    }
}
