//! Directive dispatch and `path { ... }` block handling

use super::tokenizer::tokenize;
use crate::config::schema::{ProtocolVersion, ProxyConfig, ServerProfile};
use crate::diagnostics::{DiagnosticSink, Severity};
use crate::error::{DirectiveError, NetSpecError};
use crate::netspec::NetworkSpec;
use std::fmt;

/// A rejected line, with its 1-based number and original text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub text: String,
    pub error: DirectiveError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on line {} in configuration file, \"{}\"",
            self.error, self.line, self.text
        )
    }
}

/// Result of one parse pass
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub config: ProxyConfig,
    pub diagnostics: Vec<Diagnostic>,
}

/// Which profile receives directives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Default,
    /// The open path, always at the head of `paths`
    Path { line: usize },
}

/// Mutable state for a single parse call
struct ParserState {
    config: ProxyConfig,
    cursor: Cursor,
}

impl ParserState {
    fn new() -> Self {
        Self {
            config: ProxyConfig::default(),
            cursor: Cursor::Default,
        }
    }

    fn current(&mut self) -> &mut ServerProfile {
        match self.cursor {
            Cursor::Default => &mut self.config.default_server,
            Cursor::Path { .. } => self
                .config
                .paths
                .first_mut()
                .unwrap_or(&mut self.config.default_server),
        }
    }

    fn duplicate(&self, directive: &'static str) -> DirectiveError {
        match self.cursor {
            Cursor::Default => DirectiveError::DuplicateDefault { directive },
            Cursor::Path { line } => DirectiveError::DuplicateInPath {
                directive,
                path_line: line,
            },
        }
    }

    /// Set a single-valued field, rejecting a second assignment
    fn set_once<T>(
        &mut self,
        directive: &'static str,
        field: impl FnOnce(&mut ServerProfile) -> &mut Option<T>,
        value: T,
    ) -> Result<(), DirectiveError> {
        let err = self.duplicate(directive);
        let slot = field(self.current());
        if slot.is_some() {
            return Err(err);
        }
        *slot = Some(value);
        Ok(())
    }
}

/// Line-oriented configuration parser
pub struct ConfigParser<'a> {
    sink: &'a dyn DiagnosticSink,
}

impl<'a> ConfigParser<'a> {
    pub fn new(sink: &'a dyn DiagnosticSink) -> Self {
        Self { sink }
    }

    /// Parse a whole configuration file.
    ///
    /// Rejected lines are reported to the sink and skipped. The returned
    /// tree already has the loopback network and server defaults applied.
    pub fn parse_str(&self, contents: &str) -> ParseOutcome {
        let mut state = ParserState::new();
        let mut diagnostics = Vec::new();

        for (idx, line) in contents.lines().enumerate() {
            let lineno = idx + 1;
            if let Err(error) = self.handle_line(&mut state, lineno, line) {
                let diagnostic = Diagnostic {
                    line: lineno,
                    text: line.to_string(),
                    error,
                };
                self.sink.report(Severity::Error, &diagnostic.to_string());
                diagnostics.push(diagnostic);
            }
        }

        if let Cursor::Path { line } = state.cursor {
            self.sink.report(
                Severity::Warning,
                &format!("Path block opened on line {} is never closed", line),
            );
        }

        let mut config = state.config;
        config.local_nets.push(NetworkSpec::loopback());
        config.apply_defaults();

        ParseOutcome {
            config,
            diagnostics,
        }
    }

    fn handle_line(
        &self,
        state: &mut ParserState,
        lineno: usize,
        line: &str,
    ) -> Result<(), DirectiveError> {
        let fields = tokenize(line);
        let Some(&first) = fields.first() else {
            return Ok(());
        };

        match first {
            "path" => self.open_path(state, lineno, &fields),
            "}" => close_path(state, &fields),
            _ => {
                let [name, "=", value] = fields.as_slice() else {
                    return Err(DirectiveError::MalformedPair);
                };
                match *name {
                    "reaches" => add_reach(state, value),
                    "server" => set_server(state, value),
                    "server_port" => set_port(state, value),
                    "server_type" => set_type(state, value),
                    "default_user" => {
                        state.set_once("default_user", |p| &mut p.default_user, value.to_string())
                    }
                    "default_pass" => {
                        state.set_once("default_pass", |p| &mut p.default_pass, value.to_string())
                    }
                    "local" => add_local(state, value),
                    other => Err(DirectiveError::UnknownDirective(other.to_string())),
                }
            }
        }
    }

    fn open_path(
        &self,
        state: &mut ParserState,
        lineno: usize,
        fields: &[&str],
    ) -> Result<(), DirectiveError> {
        if fields != ["path", "{"] {
            return Err(DirectiveError::BadPathOpen);
        }
        if let Cursor::Path { line } = state.cursor {
            return Err(DirectiveError::NestedPath { path_line: line });
        }

        self.sink.report(
            Severity::Debug,
            &format!("New path structure from line {} in configuration file", lineno),
        );
        state.config.push_path(ServerProfile::path(lineno));
        state.cursor = Cursor::Path { line: lineno };
        Ok(())
    }
}

fn close_path(state: &mut ParserState, fields: &[&str]) -> Result<(), DirectiveError> {
    if fields.len() != 1 {
        return Err(DirectiveError::BadPathClose);
    }
    state.cursor = Cursor::Default;
    Ok(())
}

fn set_server(state: &mut ParserState, value: &str) -> Result<(), DirectiveError> {
    // Hostnames are kept as written and resolved only when used
    let host = value.split(' ').next().unwrap_or(value);
    state.set_once("server", |p| &mut p.address, host.to_string())
}

fn set_port(state: &mut ParserState, value: &str) -> Result<(), DirectiveError> {
    if state.current().port.is_some() {
        return Err(state.duplicate("server_port"));
    }
    let port = value
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| DirectiveError::InvalidPort(value.to_string()))?;
    state.set_once("server_port", |p| &mut p.port, port)
}

fn set_type(state: &mut ParserState, value: &str) -> Result<(), DirectiveError> {
    if state.current().version.is_some() {
        return Err(state.duplicate("server_type"));
    }
    let version = ProtocolVersion::parse(value)
        .ok_or_else(|| DirectiveError::InvalidServerType(value.to_string()))?;
    state.set_once("server_type", |p| &mut p.version, version)
}

fn add_reach(state: &mut ParserState, value: &str) -> Result<(), DirectiveError> {
    let net = value
        .parse::<NetworkSpec>()
        .map_err(|source| DirectiveError::InvalidNetwork {
            directive: "reaches",
            value: value.to_string(),
            source,
        })?;
    state.current().push_reach(net);
    Ok(())
}

fn add_local(state: &mut ParserState, value: &str) -> Result<(), DirectiveError> {
    if let Cursor::Path { line } = state.cursor {
        return Err(DirectiveError::LocalInPath { path_line: line });
    }

    let net = value
        .parse::<NetworkSpec>()
        .map_err(|source: NetSpecError| {
            if source.is_port_error() {
                DirectiveError::PortInLocal(value.to_string())
            } else {
                DirectiveError::InvalidNetwork {
                    directive: "local",
                    value: value.to_string(),
                    source,
                }
            }
        })?;
    if net.ports().is_some() {
        return Err(DirectiveError::PortInLocal(value.to_string()));
    }

    state.config.push_local(net);
    Ok(())
}
