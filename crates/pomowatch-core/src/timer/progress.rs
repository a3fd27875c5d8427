use serde::{Deserialize, Serialize};

/// Coarse classification of how far a session has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressBand {
    Normal,
    Warning,
    Critical,
}

impl ProgressBand {
    pub fn from_progress(progress: f64) -> Self {
        if progress < 0.75 {
            ProgressBand::Normal
        } else if progress < 0.9 {
            ProgressBand::Warning
        } else {
            ProgressBand::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProgressBand::Normal => "normal",
            ProgressBand::Warning => "warning",
            ProgressBand::Critical => "critical",
        }
    }
}

/// Format whole remaining seconds as zero-padded `MM:SS`. Fractions truncate.
pub fn format_mm_ss(remaining_secs: f64) -> String {
    let secs = remaining_secs.max(0.0) as u64;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
