use auditflow_core::session::AuditStatus;

/// Operations rejected because they are not legal in the current session state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrchestratorError {
    #[error("an audit request is already in flight")]
    AuditInFlight,

    #[error("the session is waiting for input (status: {0})")]
    AwaitingInput(AuditStatus),

    #[error("no column mapping is pending (status: {0})")]
    NoPendingColumnDetection(AuditStatus),

    #[error("no workbook selection is pending (status: {0})")]
    NoPendingWorkbook(AuditStatus),

    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("sheet not found in workbook: {0}")]
    UnknownSheet(String),

    #[error("column mapping is incomplete: {0} is empty")]
    IncompleteMapping(&'static str),

    #[error("invalid materiality threshold: {0}")]
    InvalidThreshold(f64),
}
