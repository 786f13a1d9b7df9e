//! Text templates rendered against a key-value data context
//!
//! Config files are templates in the Go `text/template` dialect, restricted to
//! what configuration needs:
//!
//! - `{{ .Get "key" }}`, `{{ .GetMap "key" }}`, `{{ .GetArray "key" }}` call the
//!   data context (`$.Get` reaches it from inside `range`/`with`)
//! - `{{ if }}` / `{{ else if }}` / `{{ else }}`, `{{ range }}`, `{{ with }}`,
//!   each closed by `{{ end }}`
//! - pipes (`{{ .Get "name" | quote }}`), parenthesised calls, string and
//!   integer literals
//! - functions: `index`, `default`, `len`, `quote`, `join`, `eq`, `ne`, `not`,
//!   `and`, `or`
//! - trim markers (`{{-`, `-}}`) and comments (`{{/* ... */}}`)
//!
//! ```
//! use std::sync::Arc;
//! use comfig_core::stores::{KvStoreGateway, MemoryStore};
//! use comfig_core::template::{GatewayContext, Template};
//!
//! let store = Arc::new(MemoryStore::new());
//! store.set("name", "bob");
//! let mut gateway = KvStoreGateway::new();
//! gateway.add_store(store);
//!
//! let template = Template::parse("app.yml", r#"name: {{ .Get "name" }}"#).unwrap();
//! let rendered = template.render(&GatewayContext::new(&gateway)).unwrap();
//! assert_eq!(rendered, "name: bob");
//! ```

mod lexer;
mod parser;
mod render;

use thiserror::Error;

use crate::stores::{KvStoreGateway, StringMap};

/// Errors raised while parsing or rendering a template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template source is malformed
    #[error("template: {name}:{line}: {message}")]
    Parse {
        name: String,
        line: usize,
        message: String,
    },

    /// The template is well-formed but failed while executing
    #[error("template: {name}:{line}: executing: {message}")]
    Render {
        name: String,
        line: usize,
        message: String,
    },
}

impl TemplateError {
    pub(crate) fn parse(name: &str, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            name: name.to_string(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn render(name: &str, line: usize, message: impl Into<String>) -> Self {
        Self::Render {
            name: name.to_string(),
            line,
            message: message.into(),
        }
    }
}

/// The read-only surface a template can see
///
/// Exactly three accessors, exposed to templates as `Get`, `GetMap` and
/// `GetArray`. Absent values render as an empty string, `map[]` and `[]`.
pub trait TemplateData {
    fn get(&self, key: &str) -> String;
    fn get_map(&self, key: &str) -> Option<StringMap>;
    fn get_array(&self, key: &str) -> Option<Vec<String>>;
}

/// Exposes a gateway's lookups, and nothing else, to templates
#[derive(Debug, Clone, Copy)]
pub struct GatewayContext<'a> {
    gateway: &'a KvStoreGateway,
}

impl<'a> GatewayContext<'a> {
    pub fn new(gateway: &'a KvStoreGateway) -> Self {
        Self { gateway }
    }
}

impl TemplateData for GatewayContext<'_> {
    fn get(&self, key: &str) -> String {
        self.gateway.get(key)
    }

    fn get_map(&self, key: &str) -> Option<StringMap> {
        self.gateway.get_map(key)
    }

    fn get_array(&self, key: &str) -> Option<Vec<String>> {
        self.gateway.get_array(key)
    }
}

/// A parsed template, ready to render any number of times
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<parser::Node>,
}

impl Template {
    /// Parse template source; `name` appears in error messages
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, TemplateError> {
        let name = name.into();
        let items = lexer::lex(&name, source)?;
        let nodes = parser::parse(&name, items)?;
        Ok(Self { name, nodes })
    }

    /// Template name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render against a data context
    pub fn render(&self, data: &dyn TemplateData) -> Result<String, TemplateError> {
        render::Renderer::new(&self.name, data).render(&self.nodes)
    }
}
