//! Signet CLI -- command-line interface for the Signet compliance manager.
//!
//! This crate provides the CLI entry point, argument parsing, exit code
//! definitions, and the glue that ties the engine's operations to terminal
//! commands.

use std::fmt;

use signet_engine::{ComplianceEngine, EngineError};

pub mod commands;

// ---------------------------------------------------------------------------
// Exit Codes
// ---------------------------------------------------------------------------

/// Signet process exit codes.
///
/// These let shell scripts and CI jobs distinguish termination reasons
/// without parsing output.
///
/// | Code | Meaning                                            |
/// |------|----------------------------------------------------|
/// | 0    | Operation completed                                |
/// | 1    | Precondition failed (ordering, mismatch, terminal) |
/// | 2    | Engine error (storage, audit, internal)            |
/// | 3    | Referenced entity not found                        |
/// | 4    | Configuration or catalog error                     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation completed.
    Ok = 0,
    /// A workflow or checklist precondition was violated.
    PreconditionFailed = 1,
    /// Storage, audit, or internal failure.
    EngineError = 2,
    /// A referenced entity does not exist.
    NotFound = 3,
    /// Configuration or catalog error (missing file, invalid YAML, gap).
    ConfigError = 4,
}

impl ExitCode {
    /// Returns the numeric exit code as a `u8`.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns all exit code variants.
    #[must_use]
    pub const fn all() -> &'static [ExitCode] {
        &[
            Self::Ok,
            Self::PreconditionFailed,
            Self::EngineError,
            Self::NotFound,
            Self::ConfigError,
        ]
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ok => "Ok",
            Self::PreconditionFailed => "PreconditionFailed",
            Self::EngineError => "EngineError",
            Self::NotFound => "NotFound",
            Self::ConfigError => "ConfigError",
        };
        f.write_str(label)
    }
}

/// Terminates the process with the given exit code.
pub fn terminate(code: ExitCode) -> std::process::ExitCode {
    std::process::ExitCode::from(code.as_u8())
}

/// Maps an engine error onto the exit-code taxonomy.
#[must_use]
pub fn classify(err: &EngineError) -> ExitCode {
    use signet_evidence::EvidenceError;

    match err {
        EngineError::NotFound { .. } => ExitCode::NotFound,
        EngineError::Workflow(_)
        | EngineError::ControlMismatch { .. }
        | EngineError::FormTypeNotApplicable { .. } => ExitCode::PreconditionFailed,
        EngineError::Evidence(EvidenceError::ConfigurationGap { .. })
        | EngineError::Evidence(EvidenceError::Catalog(_))
        | EngineError::Evidence(EvidenceError::Io(_))
        | EngineError::Core(_) => ExitCode::ConfigError,
        EngineError::Store(_) | EngineError::Audit(_) => ExitCode::EngineError,
    }
}

// ---------------------------------------------------------------------------
// Command context
// ---------------------------------------------------------------------------

/// Shared state passed to every command.
pub struct CliContext {
    /// The opened engine.
    pub engine: ComplianceEngine,
    /// Render machine-readable JSON instead of human-readable lines.
    pub json: bool,
}

impl CliContext {
    /// Runs one engine operation and renders its result.
    ///
    /// Successful results are printed with `render` (or as pretty JSON when
    /// `--json` is set); failures are printed to stderr and mapped onto the
    /// exit-code taxonomy.
    pub fn finish<T, F>(&self, result: Result<T, EngineError>, render: F) -> ExitCode
    where
        T: serde::Serialize,
        F: FnOnce(&T),
    {
        match result {
            Ok(value) => {
                if self.json {
                    match serde_json::to_string_pretty(&value) {
                        Ok(text) => println!("{text}"),
                        Err(e) => {
                            eprintln!("signet: error: {e}");
                            return ExitCode::EngineError;
                        }
                    }
                } else {
                    render(&value);
                }
                ExitCode::Ok
            }
            Err(err) => {
                eprintln!("signet: error: {err}");
                classify(&err)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
