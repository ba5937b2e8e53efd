//! Subject and body templating powered by minijinja.
//!
//! # Architecture
//!
//! ```text
//! TemplateRegistry::resolve(kind, custom path, content type)
//!     |-- no custom path --> built-in template (compiled once at startup)
//!     `-- custom path    --> compiled from file for this invocation
//! CompiledTemplate::render(data) --> String
//! ```
//!
//! Two engines exist. [`Engine::Html`] escapes interpolated values and is used
//! for HTML bodies. [`Engine::Plain`] does no escaping and is used for the
//! subject and for `text/plain` bodies. Both treat undefined values as errors.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

use crate::config::ContentType;
use crate::error::TemplateError;
use crate::paths::join_base;

const DEFAULT_SUBJECT: &str = include_str!("templates/subject.txt.j2");
const DEFAULT_BODY: &str = include_str!("templates/body.html.j2");

/// Which part of the email a template produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Subject,
    Body,
}

impl TemplateKind {
    pub fn name(&self) -> &'static str {
        match self {
            TemplateKind::Subject => "subject",
            TemplateKind::Body => "body",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rendering engine, selected by whether interpolated values are HTML-escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Plain,
    Html,
}

impl Engine {
    pub fn escapes_html(&self) -> bool {
        matches!(self, Engine::Html)
    }

    /// Fresh environment configured for this engine.
    fn environment(self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        match self {
            Engine::Plain => env.set_auto_escape_callback(|_| AutoEscape::None),
            Engine::Html => env.set_auto_escape_callback(|_| AutoEscape::Html),
        }
        env
    }
}

/// Where a compiled template came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    BuiltIn,
    File(PathBuf),
}

impl fmt::Display for TemplateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateOrigin::BuiltIn => f.write_str("built-in"),
            TemplateOrigin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A parsed template bound to its engine.
#[derive(Clone)]
pub struct CompiledTemplate {
    kind: TemplateKind,
    engine: Engine,
    origin: TemplateOrigin,
    env: Environment<'static>,
}

impl CompiledTemplate {
    fn builtin(
        kind: TemplateKind,
        engine: Engine,
        source: &'static str,
    ) -> Result<Self, TemplateError> {
        let mut env = engine.environment();
        env.add_template(kind.name(), source)
            .map_err(|e| TemplateError::Syntax {
                kind,
                origin: TemplateOrigin::BuiltIn.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            kind,
            engine,
            origin: TemplateOrigin::BuiltIn,
            env,
        })
    }

    /// Compile a template from a file on disk.
    ///
    /// # Errors
    ///
    /// * `TemplateError::Read` - file missing, unreadable or not UTF-8.
    /// * `TemplateError::Syntax` - the file is not a valid template.
    pub fn from_file(kind: TemplateKind, engine: Engine, path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            kind,
            path: path.to_path_buf(),
            source,
        })?;

        let origin = TemplateOrigin::File(path.to_path_buf());
        let mut env = engine.environment();
        env.add_template_owned(kind.name(), source)
            .map_err(|e| TemplateError::Syntax {
                kind,
                origin: origin.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            kind,
            engine,
            origin,
            env,
        })
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn origin(&self) -> &TemplateOrigin {
        &self.origin
    }

    /// Render the template against `data`.
    ///
    /// Undefined fields and runtime errors (unknown filters, bad operations)
    /// fail the render instead of producing empty output.
    pub fn render<S: Serialize>(&self, data: &S) -> Result<String, TemplateError> {
        let render_failed = |e: minijinja::Error| TemplateError::RenderFailed {
            kind: self.kind,
            origin: self.origin.to_string(),
            message: e.to_string(),
        };

        let tmpl = self.env.get_template(self.kind.name()).map_err(render_failed)?;
        let rendered = tmpl.render(data).map_err(render_failed)?;

        tracing::trace!(
            kind = %self.kind,
            origin = %self.origin,
            len = rendered.len(),
            "Template rendered"
        );
        Ok(rendered)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("kind", &self.kind)
            .field("engine", &self.engine)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Rendered subject and body, ready for the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// Built-in templates plus on-demand compilation of user template files.
///
/// Construct once at startup and share by reference; it is never mutated.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    subject: CompiledTemplate,
    body: CompiledTemplate,
}

impl TemplateRegistry {
    /// Compile the built-in templates.
    ///
    /// A failure here means the binary itself is broken; callers should treat
    /// it as fatal.
    pub fn new() -> Result<Self, TemplateError> {
        Ok(Self {
            subject: CompiledTemplate::builtin(TemplateKind::Subject, Engine::Plain, DEFAULT_SUBJECT)?,
            body: CompiledTemplate::builtin(TemplateKind::Body, Engine::Html, DEFAULT_BODY)?,
        })
    }

    pub fn builtin(&self, kind: TemplateKind) -> &CompiledTemplate {
        match kind {
            TemplateKind::Subject => &self.subject,
            TemplateKind::Body => &self.body,
        }
    }

    /// Pick the template for `kind`.
    ///
    /// Without a custom path the built-in template is borrowed. Otherwise the
    /// file at `custom_path` (joined onto `base_dir` when relative) is compiled.
    /// Subjects always use the plain engine; custom bodies follow `content_type`.
    pub fn resolve(
        &self,
        kind: TemplateKind,
        custom_path: Option<&Path>,
        content_type: ContentType,
        base_dir: &Path,
    ) -> Result<Cow<'_, CompiledTemplate>, TemplateError> {
        let Some(custom_path) = custom_path else {
            tracing::debug!(kind = %kind, "template source: built-in");
            return Ok(Cow::Borrowed(self.builtin(kind)));
        };

        let engine = match kind {
            TemplateKind::Subject => Engine::Plain,
            TemplateKind::Body => content_type.body_engine(),
        };
        let path = join_base(base_dir, custom_path);
        tracing::debug!(
            kind = %kind,
            path = %path.display(),
            escape_html = engine.escapes_html(),
            "template source: file"
        );

        CompiledTemplate::from_file(kind, engine, &path).map(Cow::Owned)
    }
}
