use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CpuError {
    #[error("MSR {msr:#x} is not readable on CPU {cpu}")]
    MsrUnavailable { cpu: u32, msr: u32 },
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed register dump at line {line}: {reason}")]
    ToolOutput { line: usize, reason: String },
}
