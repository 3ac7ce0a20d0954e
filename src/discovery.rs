use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::{process_program, Diagnostic, IncludeProvider, PrepperError};

/// Result of scanning directories for shader programs.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Files which processed into valid programs, in directory walk order
    pub programs: Vec<PathBuf>,

    /// Why the remaining files (or whole roots) were rejected
    pub diagnostics: Vec<Diagnostic>,
}

/// Recursively finds files under `roots` whose extension contains `extension`,
/// and keeps the ones which process into valid programs.
///
/// A missing root is reported and does not stop the other roots from being scanned.
pub fn discover_programs<P: AsRef<Path>>(
    roots: &[P],
    extension: &str,
    include_provider: &mut dyn IncludeProvider,
) -> Discovery {
    let mut discovery = Discovery::default();

    for root in roots {
        let root = root.as_ref();
        let root_name = root.to_string_lossy().into_owned();

        if !root.exists() {
            discovery.diagnostics.push(Diagnostic::new(
                root_name.clone(),
                0,
                PrepperError::FileNotFound {
                    file: root_name,
                    cause: "directory does not exist".to_owned(),
                },
            ));
            continue;
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let file = err
                        .path()
                        .map_or_else(|| root_name.clone(), |p| p.to_string_lossy().into_owned());
                    discovery.diagnostics.push(Diagnostic::new(
                        file.clone(),
                        0,
                        PrepperError::FileNotFound {
                            file,
                            cause: err.to_string(),
                        },
                    ));
                    continue;
                }
            };

            let matches = entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| ext.contains(extension));
            if !matches {
                continue;
            }

            let path = entry.path().to_string_lossy().into_owned();
            let program = process_program(&path, include_provider);

            if program.is_valid() {
                debug!("Found program {}", path);
                discovery.programs.push(entry.into_path());
            } else {
                discovery.diagnostics.extend(program.diagnostics);
            }
        }
    }

    discovery
}
