use serde::Serialize;

/// Pressure stall information of one `some` or `full` line of a `*.pressure` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PsiStats {
    /// Share of wall time stalled over the last 10 seconds, in percent.
    pub avg10: Option<f64>,
    /// Share of wall time stalled over the last 60 seconds, in percent.
    pub avg60: Option<f64>,
    /// Share of wall time stalled over the last 300 seconds, in percent.
    pub avg300: Option<f64>,
    /// Total stall time in microseconds.
    pub total: Option<u64>,
}
