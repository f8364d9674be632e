//! Rendering and writing synthesized templates.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;
use tracing::info;

use crate::stack::Stack;
use crate::template::Template;

const TEMPLATE_SUFFIX: &str = ".template.json";

/// Errors raised while rendering or writing a template.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Raised when the template cannot be serialised.
    #[error("failed to render template: {0}")]
    Render(String),
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Renders the template as pretty JSON with a trailing newline.
///
/// # Errors
///
/// Returns [`SynthError::Render`] when serialisation fails.
pub fn render_template(template: &Template) -> Result<String, SynthError> {
    let mut rendered = template
        .to_json_pretty()
        .map_err(|err| SynthError::Render(err.to_string()))?;
    rendered.push('\n');
    Ok(rendered)
}

/// File name the template of `stack_name` is written under.
#[must_use]
pub fn template_file_name(stack_name: &str) -> String {
    format!("{stack_name}{TEMPLATE_SUFFIX}")
}

/// Writes `<dir>/<stack_name>.template.json`, creating `dir` when needed,
/// and returns the written path.
///
/// # Errors
///
/// Returns [`SynthError::Io`] when the directory or file cannot be written,
/// and [`SynthError::Render`] when serialisation fails.
pub fn write_template(
    dir: &Utf8Path,
    stack_name: &str,
    template: &Template,
) -> Result<Utf8PathBuf, SynthError> {
    Dir::create_ambient_dir_all(dir, ambient_authority()).map_err(|err| SynthError::Io {
        path: dir.to_path_buf(),
        message: err.to_string(),
    })?;
    let out = Dir::open_ambient_dir(dir, ambient_authority()).map_err(|err| SynthError::Io {
        path: dir.to_path_buf(),
        message: err.to_string(),
    })?;

    let file_name = template_file_name(stack_name);
    let path = dir.join(&file_name);
    let rendered = render_template(template)?;
    out.write(&file_name, rendered)
        .map_err(|err| SynthError::Io {
            path: path.clone(),
            message: err.to_string(),
        })?;

    info!(
        path = %path,
        resources = template.resources.len(),
        "wrote template"
    );
    Ok(path)
}

/// One `<logical id>\t<type>\t<path>` line per resource, in declaration
/// order.
#[must_use]
pub fn resource_listing(stack: &Stack) -> Vec<String> {
    stack
        .resources()
        .iter()
        .map(|declared| {
            format!(
                "{}\t{}\t{}",
                declared.logical_id,
                declared.resource.type_name,
                stack.node_path(&declared.path)
            )
        })
        .collect()
}
