//! Helpers for compiling emitted sources with OpenGL, and remapping the driver's
//! error locations back to the files they came from.
//!
//! # Example
//! ```ignore
//! use gl::types::*;
//! use shader_linker::gl_compiler::{compile_shader, ShaderCompilerOutput};
//! use std::ffi::CString;
//!
//! fn make_shader(
//!     gl: &gl::Gl,
//!     shader_type: GLenum,
//!     source: &shader_linker::EmittedSource,
//! ) -> anyhow::Result<u32> {
//!     unsafe {
//!         let compiled_shader = compile_shader(source, |source| {
//!             let handle = gl.CreateShader(shader_type);
//!             let source_len = source.len() as GLint;
//!             let source_ptr = source.as_ptr() as *const GLchar;
//!
//!             gl.ShaderSource(handle, 1, &source_ptr, &source_len);
//!             gl.CompileShader(handle);
//!
//!             let mut shader_ok: GLint = 1;
//!             gl.GetShaderiv(handle, gl::COMPILE_STATUS, &mut shader_ok);
//!
//!             if shader_ok != 1 {
//!                 let mut log_len: GLint = 0;
//!                 gl.GetShaderiv(handle, gl::INFO_LOG_LENGTH, &mut log_len);
//!
//!                 let log_str = CString::from_vec_unchecked(vec![b'\0'; (log_len + 1) as usize]);
//!                 gl.GetShaderInfoLog(
//!                     handle,
//!                     log_len,
//!                     std::ptr::null_mut(),
//!                     log_str.as_ptr() as *mut GLchar,
//!                 );
//!
//!                 gl.DeleteShader(handle);
//!
//!                 ShaderCompilerOutput {
//!                     artifact: None,
//!                     log: Some(log_str.to_string_lossy().into_owned()),
//!                 }
//!             } else {
//!                 ShaderCompilerOutput {
//!                     artifact: Some(handle),
//!                     log: None,
//!                 }
//!             }
//!         });
//!
//!         if let Some(shader) = compiled_shader.artifact {
//!             Ok(shader)
//!         } else {
//!             anyhow::bail!(
//!                 "Shader failed to compile: {}",
//!                 compiled_shader.log.as_deref().unwrap_or("Unknown error")
//!             );
//!         }
//!     }
//! }
//! ```

use crate::EmittedSource;

/// User-defined output of OpenGL's shader compiler, along with an info log.
pub struct ShaderCompilerOutput<Artifact> {
    pub artifact: Artifact,
    pub log: Option<String>,
}

/// Compile an emitted shader via a user-provided shader compiler callback.
///
/// `Artifact` is a user-defined output of the shader compiler, e.g. `Option<GLuint>`.
///
/// `compiler_fn` is given the emitted source text. Locations in the returned log are
/// rewritten as `file(line)` of the code they originate from.
pub fn compile_shader<Artifact, CompilerFn>(
    source: &EmittedSource,
    compiler_fn: CompilerFn,
) -> ShaderCompilerOutput<Artifact>
where
    CompilerFn: FnOnce(&str) -> ShaderCompilerOutput<Artifact>,
{
    let compiler_output = compiler_fn(source.as_str());

    ShaderCompilerOutput {
        artifact: compiler_output.artifact,
        log: compiler_output
            .log
            .map(|log_str| remap_compiler_log(&log_str, source)),
    }
}

/// Rewrites Intel/AMD (`ERROR: 0:12`) and NVIDIA (`0(12)`) error locations in `log`.
/// Locations outside of `source` are left untouched.
pub fn remap_compiler_log(log: &str, source: &EmittedSource) -> String {
    lazy_static::lazy_static! {
        static ref INTEL_AMD_ERROR_RE: regex::Regex = regex::Regex::new(r"(?m)^ERROR:\s*(\d+):(\d+)").unwrap();
    }

    lazy_static::lazy_static! {
        static ref NV_ERROR_RE: regex::Regex = regex::Regex::new(r"(?m)^(\d+)\((\d+)\)\s*").unwrap();
    }

    let error_replacement = |captures: &regex::Captures| -> String {
        let origin = captures[2]
            .parse::<usize>()
            .ok()
            .and_then(|line| source.origin_of_line(line));

        match origin {
            Some(origin) => format!("{}({})", origin.file, origin.line),
            None => captures[0].to_owned(),
        }
    };

    let log = INTEL_AMD_ERROR_RE.replace_all(log, error_replacement);
    NV_ERROR_RE
        .replace_all(&log, error_replacement)
        .into_owned()
}
