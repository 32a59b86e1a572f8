use serde::Serialize;
use std::fmt;

/// Maintenance priority derived from the operator's NDVI threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriorityLevel {
    Urgent,
    HighPriority,
    Monitoring,
}

impl PriorityLevel {
    /// `>= 0.7` urgent, `>= 0.6` high priority, anything lower is monitoring
    pub fn from_threshold(threshold: f64) -> Self {
        if threshold >= 0.7 {
            PriorityLevel::Urgent
        } else if threshold >= 0.6 {
            PriorityLevel::HighPriority
        } else {
            PriorityLevel::Monitoring
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriorityLevel::Urgent => "urgent",
            PriorityLevel::HighPriority => "high priority",
            PriorityLevel::Monitoring => "monitoring",
        }
    }

    /// Label used on the field crews' reports
    pub fn operator_label(&self) -> &'static str {
        match self {
            PriorityLevel::Urgent => "URGENT",
            PriorityLevel::HighPriority => "PRIORITAS TINGGI",
            PriorityLevel::Monitoring => "MONITORING",
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
