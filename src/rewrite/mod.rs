//! Native rewrite engine.
//!
//! An ordered, idempotent pipeline of text-level transformations applied
//! to every `.java` file under a cartridge root. No parsing: each stage
//! is a pattern rewrite whose output feeds the next stage. Files are
//! written back only when their content actually changed; per-file I/O
//! failures are recorded and the walk continues.
//!
//! Progress goes to an explicit output sink (the per-phase log during a
//! native phase) rather than the process's own stdout.

pub mod imports;
pub mod tables;

use imports::{IMPORT_STMT, reorganize_imports};
use std::io::Write;
use std::path::{Path, PathBuf};
use tables::{
    ANNOTATION_MIGRATIONS, METHOD_MIGRATIONS, PACKAGE_MIGRATIONS, STATIC_IMPORT_MIGRATIONS,
    lookup_class_migration,
};
use walkdir::WalkDir;

/// Immutable statistics snapshot for one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStats {
    pub files_processed: usize,
    pub error_count: usize,
}

/// Applies the rewrite pipeline to one cartridge tree.
pub struct RewriteEngine {
    cartridge_path: PathBuf,
    errors: Vec<String>,
    files_processed: usize,
}

impl RewriteEngine {
    pub fn new(cartridge_path: PathBuf) -> Self {
        Self {
            cartridge_path,
            errors: Vec::new(),
            files_processed: 0,
        }
    }

    /// Walk the cartridge and migrate every `.java` file, reporting
    /// progress to `out`. Sink write failures are deliberately ignored;
    /// the sink is a log file, not part of the rewrite contract.
    pub fn run(&mut self, out: &mut dyn Write) -> MigrationStats {
        let _ = writeln!(
            out,
            "Starting code migration for: {}",
            self.cartridge_path.display()
        );

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(&self.cartridge_path).sort_by_file_name() {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file()
                        && entry.path().extension().is_some_and(|ext| ext == "java")
                    {
                        files.push(entry.into_path());
                    }
                }
                Err(err) => {
                    let error = format!("Failed to walk directory tree: {err}");
                    let _ = writeln!(out, "  ✗ {error}");
                    self.errors.push(error);
                }
            }
        }

        for file in files {
            self.migrate_file(&file, out);
        }

        let _ = writeln!(
            out,
            "Migration complete. Processed {} files.",
            self.files_processed
        );
        if !self.errors.is_empty() {
            let _ = writeln!(out, "Errors encountered: {}", self.errors.len());
            for error in &self.errors {
                let _ = writeln!(out, "{error}");
            }
        }

        self.stats()
    }

    pub fn stats(&self) -> MigrationStats {
        MigrationStats {
            files_processed: self.files_processed,
            error_count: self.errors.len(),
        }
    }

    fn migrate_file(&mut self, file: &Path, out: &mut dyn Write) {
        let relative = file
            .strip_prefix(&self.cartridge_path)
            .unwrap_or(file)
            .display()
            .to_string();

        let result = std::fs::read_to_string(file).and_then(|original| {
            let migrated = migrate_content(&original);
            if migrated != original {
                std::fs::write(file, &migrated)?;
                Ok(true)
            } else {
                Ok(false)
            }
        });

        match result {
            Ok(changed) => {
                if changed {
                    let _ = writeln!(out, "  ✓ Migrated: {relative}");
                } else {
                    let _ = writeln!(out, "  - No changes: {relative}");
                }
                self.files_processed += 1;
            }
            Err(err) => {
                let error = format!("Failed to migrate {}: {err}", file.display());
                let _ = writeln!(out, "  ✗ {error}");
                self.errors.push(error);
            }
        }
    }
}

/// All transformation stages, in order, each feeding the next.
pub fn migrate_content(content: &str) -> String {
    let result = migrate_packages(content);
    let result = migrate_static_imports(&result);
    let result = migrate_imported_classes(&result);
    let result = migrate_annotations(&result);
    let result = migrate_method_calls(&result);
    reorganize_imports(&result)
}

fn migrate_packages(content: &str) -> String {
    PACKAGE_MIGRATIONS
        .iter()
        .fold(content.to_string(), |acc, (regex, replacement)| {
            regex.replace_all(&acc, *replacement).into_owned()
        })
}

/// Static-import substitutions apply only to lines still in the modern
/// `org.junit.jupiter` namespace; legacy `org.junit` lines are already
/// migrated and must not be touched again.
fn migrate_static_imports(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            if !line.contains("org.junit.jupiter") {
                return line.to_string();
            }
            STATIC_IMPORT_MIGRATIONS
                .iter()
                .fold(line.to_string(), |acc, (regex, replacement)| {
                    regex.replace(&acc, *replacement).into_owned()
                })
        })
        .collect::<Vec<_>>()
        .join("\n")
        + if content.ends_with('\n') { "\n" } else { "" }
}

fn migrate_imported_classes(content: &str) -> String {
    IMPORT_STMT
        .replace_all(content, |caps: &regex::Captures<'_>| {
            let fq_name = caps[1].trim();
            // Already-legacy JUnit and already-migrated jakarta imports
            // pass through untouched.
            if (fq_name.starts_with("org.junit.") && !fq_name.starts_with("org.junit.jupiter"))
                || fq_name.starts_with("jakarta.")
            {
                return format!("import {fq_name};");
            }
            match lookup_class_migration(fq_name) {
                Some(migrated) => format!("import {migrated};"),
                None => format!("import {fq_name};"),
            }
        })
        .into_owned()
}

fn migrate_annotations(content: &str) -> String {
    ANNOTATION_MIGRATIONS
        .iter()
        .fold(content.to_string(), |acc, (regex, replacement)| {
            regex.replace_all(&acc, replacement.as_str()).into_owned()
        })
}

fn migrate_method_calls(content: &str) -> String {
    METHOD_MIGRATIONS
        .iter()
        .fold(content.to_string(), |acc, (regex, replacement)| {
            regex.replace_all(&acc, *replacement).into_owned()
        })
}
