use thiserror::Error;

/// Errors that can occur while compiling a flow definition into a runnable graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Failed to parse flow JSON: {0}")]
    JsonParseError(String),

    #[error("Flow has no '{0}' node")]
    MissingTerminal(String),

    #[error("Node id '{0}' is declared more than once")]
    DuplicateNode(String),

    #[error("Node '{node_id}' has an unregistered or invalid action type: '{type_name}'")]
    InvalidActionType { node_id: String, type_name: String },

    #[error("Node '{node_id}' is missing required field '{field}' for action '{action}'")]
    MissingField {
        node_id: String,
        action: String,
        field: String,
    },

    #[error("Node '{node_id}' has an invalid key code '{value}'")]
    InvalidKeyCode { node_id: String, value: String },

    #[error("Malformed flow graph: {0}")]
    GraphMalformed(String),
}

/// Errors that can occur when converting a custom user format into a `FlowDefinition`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowConversionError {
    #[error("Invalid custom data: {0}")]
    ValidationError(String),

    #[error("Failed to parse flow document: {0}")]
    JsonParseError(String),
}

/// Errors raised by a page context while reading or mutating the DOM.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("Element '{0}' is detached from the document")]
    Detached(String),

    #[error("Event dispatch failed: {0}")]
    Dispatch(String),

    #[error("Clipboard access denied: {0}")]
    Clipboard(String),

    #[error("Path expression '{0}' could not be evaluated")]
    InvalidExpression(String),
}

/// Errors reported by the debugging transport behind the remote input driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Could not attach debugger to tab {tab}: {message}")]
    Attach { tab: i64, message: String },

    #[error("Could not detach debugger from tab {tab}: {message}")]
    Detach { tab: i64, message: String },

    #[error("Command '{method}' failed on tab {tab}: {message}")]
    Command {
        tab: i64,
        method: String,
        message: String,
    },
}

/// Errors on the message bus between the background process and page contexts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Tab {0} does not exist")]
    UnknownTab(i64),

    #[error("No active tab to bind the run to")]
    NoActiveTab,

    #[error("Could not open tab at '{url}': {message}")]
    TabCreation { url: String, message: String },

    #[error("Message delivery failed: {0}")]
    Delivery(String),

    #[error("Unexpected response to '{0}'")]
    UnexpectedResponse(String),
}

/// Errors from saving or restoring the run registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry serialization failed: {0}")]
    Serialization(String),
}

/// Errors from the bug-report template store.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template store I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Template store is corrupt: {0}")]
    Corrupt(String),

    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Template is missing a {0}")]
    Incomplete(&'static str),

    #[error("Template command could not be expanded into a flow: {0}")]
    Conversion(#[from] FlowConversionError),
}

/// Errors from loading the engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(String),
}

/// Errors from loading a simulated-browser fixture.
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Could not read fixture file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture: {0}")]
    Parse(String),
}

/// Errors that abort an interpreter run for reasons other than an action outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Malformed flow graph at node '{node_id}': {reason}")]
    GraphMalformed { node_id: String, reason: String },

    #[error("Resume target '{0}' is not part of the flow")]
    UnknownResumeNode(String),

    #[error("Relay failed: {0}")]
    Relay(#[from] RelayError),

    #[error("Flow compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error("Template could not be expanded: {0}")]
    Conversion(#[from] FlowConversionError),
}
