// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Middle-end pipeline facade.
//!
//! Consolidates the verification, specialization and task-graph
//! lowering stages into a single API. The embedding driver owns retry
//! and reporting policy; this crate only sequences the stages and
//! converts stage errors into uniform diagnostics.

use std::fmt;

use tracing::info;

use fhec_ir::{verify, Module, OpId, VerifyError};
use fhec_rt::{Partition, RtError, TaskGraph};
use fhec_specialize::{ParameterResolver, SpecializeError};

/// A fully processed program: the concrete module and its task graph.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub module: Module,
    pub tasks: TaskGraph,
}

/// Severity level for diagnostics, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A unified diagnostic message from any stage of the middle-end.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Human-readable error message.
    pub message: String,
    /// Offending operation, if the stage could name one.
    pub op: Option<OpId>,
    /// Severity of the diagnostic.
    pub severity: Severity,
}

impl Diagnostic {
    fn with_severity(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            op: None,
            severity,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(message, Severity::Error)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(message, Severity::Warning)
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self::with_severity(message, Severity::Note)
    }

    pub fn with_op(mut self, op: OpId) -> Self {
        self.op = Some(op);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(op) = self.op {
            write!(f, " ({op})")?;
        }
        Ok(())
    }
}

impl From<SpecializeError> for Diagnostic {
    fn from(error: SpecializeError) -> Self {
        let diagnostic = Diagnostic::error(error.to_string());
        match error {
            SpecializeError::ParameterInconsistency { op, .. } => diagnostic.with_op(op),
            SpecializeError::UnresolvedParameter { .. }
            | SpecializeError::InternalInvariantViolation { .. } => diagnostic,
        }
    }
}

impl From<RtError> for Diagnostic {
    fn from(error: RtError) -> Self {
        let diagnostic = Diagnostic::error(error.to_string());
        match error {
            RtError::UnknownOperation { op }
            | RtError::DuplicateOperation { op }
            | RtError::UnpartitionedOperation { op } => diagnostic.with_op(op),
            _ => diagnostic,
        }
    }
}

impl From<VerifyError> for Diagnostic {
    fn from(error: VerifyError) -> Self {
        let op = match &error {
            VerifyError::UnknownValue { op, .. }
            | VerifyError::UseBeforeDef { op, .. }
            | VerifyError::OperandCount { op, .. }
            | VerifyError::ResultCount { op, .. }
            | VerifyError::OperandType { op, .. }
            | VerifyError::ResultType { op, .. }
            | VerifyError::MissingAttr { op, .. }
            | VerifyError::BadAttr { op, .. }
            | VerifyError::AttrSizingMismatch { op, .. }
            | VerifyError::MixedSpecialization { op, .. }
            | VerifyError::SizingMismatch { op, .. }
            | VerifyError::KeyMismatch { op, .. }
            | VerifyError::UnknownKey { op, .. } => *op,
        };
        Diagnostic::error(error.to_string()).with_op(op)
    }
}

/// Runs the full middle-end on one module.
///
/// 1. **Verify**: structural and dialect rules on the symbolic input.
/// 2. **Specialize**: resolve every symbolic parameter reference.
/// 3. **Re-verify**: the dialect rules again on the concrete module.
/// 4. **Lower**: build the dependency-tracked task graph.
///
/// Any stage failure aborts the pipeline; the input module is never
/// modified.
pub fn specialize_and_lower(
    module: &Module,
    resolver: &dyn ParameterResolver,
    partition: &Partition,
) -> Result<CompiledProgram, Vec<Diagnostic>> {
    verify(module).map_err(to_diagnostics)?;

    let concrete = fhec_specialize::run(module, resolver)
        .map_err(|error| vec![Diagnostic::from(error)])?;
    verify(&concrete).map_err(to_diagnostics)?;

    let tasks =
        fhec_rt::lower(&concrete, partition).map_err(|error| vec![Diagnostic::from(error)])?;

    info!(
        module = module.name(),
        ops = concrete.op_count(),
        tasks = tasks.task_count(),
        "middle-end pipeline complete"
    );
    Ok(CompiledProgram {
        module: concrete,
        tasks,
    })
}

fn to_diagnostics(errors: Vec<VerifyError>) -> Vec<Diagnostic> {
    errors.into_iter().map(Diagnostic::from).collect()
}

/// Initialize logging with a default filter.
///
/// Called by embedding binaries and test harnesses, never by the core
/// crates. `RUST_LOG` overrides the default; `verbose` raises the
/// `fhec` crates to `debug`.
pub fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "warn,fhec_ir=debug,fhec_specialize=debug,fhec_rt=debug,fhec_compiler=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}
