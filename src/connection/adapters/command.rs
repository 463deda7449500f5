//! Launch command rendering shared by launcher adapters.

use crate::connection::{
    domain::{AgentSequence, LaunchConfig},
    ports::{LaunchError, LaunchResult},
};
use crate::shell::quote_argument;
use minijinja::{Environment, UndefinedBehavior};
use serde_json::{Map, Value};

/// A launch command rendered for one agent sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    rendered: String,
    debug_port: Option<u16>,
}

impl CommandLine {
    /// Renders the configured template for `sequence`.
    ///
    /// Paths are shell quoted; the debug flag is substituted with a leading
    /// space when remote debugging is enabled and as an empty string
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::InvalidTemplate`] when the template does not
    /// render (including references to unknown substitutions) and
    /// [`LaunchError::Config`] when the debug port overflows.
    pub fn render(config: &LaunchConfig, sequence: AgentSequence) -> LaunchResult<Self> {
        let debug_port = config
            .debug()
            .map(|debug| debug.port_for(sequence))
            .transpose()?;
        let debug_argument = config
            .debug_flag(sequence)?
            .map(|flag| format!(" {flag}"))
            .unwrap_or_default();

        let mut context = Map::new();
        context.insert(
            "executable".to_owned(),
            Value::String(quote_argument(config.executable().as_str())),
        );
        context.insert("debug".to_owned(), Value::String(debug_argument));
        context.insert(
            "agent_binary".to_owned(),
            Value::String(quote_argument(config.agent_binary().as_str())),
        );

        let mut environment = Environment::new();
        environment.set_undefined_behavior(UndefinedBehavior::Strict);
        let rendered = environment
            .render_str(config.command_template(), context)
            .map_err(|error| LaunchError::InvalidTemplate(error.to_string()))?;

        Ok(Self {
            rendered: rendered.trim().to_owned(),
            debug_port,
        })
    }

    /// Returns the rendered command line.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Returns the debug port assigned to this launch.
    #[must_use]
    pub const fn debug_port(&self) -> Option<u16> {
        self.debug_port
    }
}
