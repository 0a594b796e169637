//! Rendering of the generated DelphiScript files.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::io;
use crate::log::debug;


pub const LOGGER_TEMPLATE: &str = "logger.pas";
pub const MAIN_TEMPLATE: &str = "main.pas";

/// Templates compiled into the library.
pub const BUILTIN_TEMPLATES: [(&str, &str); 2] = [
    (LOGGER_TEMPLATE, include_str!("../../templates/logger.pas")),
    (MAIN_TEMPLATE, include_str!("../../templates/main.pas")),
];

/// Renders templates, either the built-in ones or those found in a template directory.
///
/// Placeholders are written `{{ Name }}`. Every placeholder must have a value in the render
/// context; values are substituted verbatim.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ScriptRenderer {
    template_dir: Option<PathBuf>,
}

impl ScriptRenderer {
    /// Reads templates from `template_dir` instead of the built-in set.
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: Some(template_dir.into()),
        }
    }

    /// `None` when the built-in templates are used.
    pub fn template_dir(&self) -> Option<&Path> {
        self.template_dir.as_deref()
    }

    fn source(&self, name: &str) -> Result<String> {
        match &self.template_dir {
            Some(dir) => io::read_to_string(dir.join(name)),
            None => BUILTIN_TEMPLATES
                .iter()
                .find(|(builtin, _)| *builtin == name)
                .map(|(_, source)| source.to_string())
                .ok_or_else(|| {
                    ErrorSource::Template(tera::Error::template_not_found(name)).into()
                }),
        }
    }

    /// Renders the template `name` with `ctx` and writes the result to `dest`.
    pub fn render<C: Serialize>(&self, name: &str, ctx: &C, dest: impl AsRef<Path>) -> Result<()> {
        let dest = dest.as_ref();
        let source = with_err_context(self.source(name), || {
            ErrorContext::RenderTemplate(name.into())
        })?;
        let rendered = with_err_context(render_str(name, &source, ctx), || {
            ErrorContext::RenderTemplate(name.into())
        })?;
        io::write(dest, rendered)?;
        debug!("rendered {name} to {dest:?}");
        Ok(())
    }
}

fn render_str<C: Serialize>(name: &str, source: &str, ctx: &C) -> tera::Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template(name, source)?;
    tera.render(name, &Context::from_serialize(ctx)?)
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LoggerCtx<'a> {
    pub(crate) log_file_path: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct MainCtx<'a> {
    pub(crate) data_folder: &'a str,
    /// Empty if no project is opened.
    pub(crate) project_file_path: &'a str,
    pub(crate) function_name: &'a str,
    pub(crate) function_parameters: &'a str,
}
