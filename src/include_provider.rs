use std::path::{Path, PathBuf};

use crate::BoxedIncludeProviderError;

/// Include path after resolution against the include root; also used as the file's identity
/// for include-once and recursion checks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedIncludePath(pub String);

impl ResolvedIncludePath {
    /// File extension, which decides whether a file is a vertex or a fragment shader.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.0).extension().and_then(|ext| ext.to_str())
    }

    pub fn has_file_name_and_extension(&self) -> bool {
        let path = Path::new(&self.0);
        path.file_name().is_some() && path.extension().is_some()
    }

    pub fn is_vertex_shader(&self) -> bool {
        self.extension().map_or(false, |ext| ext.contains("vert"))
    }

    pub fn is_fragment_shader(&self) -> bool {
        self.extension().map_or(false, |ext| ext.contains("frag"))
    }
}

/// User-supplied include reader
pub trait IncludeProvider {
    /// Turn the path written in an `#include` or `#vertex_shader` directive into a loadable one.
    fn resolve_path(&self, path: &str) -> Result<ResolvedIncludePath, BoxedIncludeProviderError>;

    fn get_include(
        &mut self,
        path: &ResolvedIncludePath,
    ) -> Result<String, BoxedIncludeProviderError>;
}

/// Reads files from disk, resolving directive paths relative to an include root.
#[derive(Clone, Debug)]
pub struct FileIncludeProvider {
    include_root: PathBuf,
}

impl FileIncludeProvider {
    pub fn new(include_root: impl Into<PathBuf>) -> Self {
        Self {
            include_root: include_root.into(),
        }
    }
}

impl IncludeProvider for FileIncludeProvider {
    fn resolve_path(&self, path: &str) -> Result<ResolvedIncludePath, BoxedIncludeProviderError> {
        let resolved = self.include_root.join(path);
        resolved
            .to_str()
            .map(|s| ResolvedIncludePath(s.to_owned()))
            .ok_or_else(|| format!("{:?} is not valid UTF-8", resolved).into())
    }

    fn get_include(
        &mut self,
        path: &ResolvedIncludePath,
    ) -> Result<String, BoxedIncludeProviderError> {
        Ok(std::fs::read_to_string(&path.0)?)
    }
}
