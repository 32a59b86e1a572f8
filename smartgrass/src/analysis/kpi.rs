use serde::Serialize;

/// Dashboard KPI widgets
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Kpis {
    /// SPM (minimum service standard) compliance, percent
    pub compliance_rate: f64,
    /// Points the crews have to visit
    pub workload_points: usize,
    pub affected_area_ha: f64,
}

impl Kpis {
    /// Each hundred priority points costs one percent of compliance
    pub fn compute(total_points: usize, affected_area_ha: f64) -> Self {
        Kpis {
            compliance_rate: (100.0 - total_points as f64 / 100.0).max(0.0),
            workload_points: total_points,
            affected_area_ha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compliance_rate() {
        assert_relative_eq!(Kpis::compute(0, 0.0).compliance_rate, 100.0);
        assert_relative_eq!(Kpis::compute(250, 2.5).compliance_rate, 97.5);
        assert_relative_eq!(Kpis::compute(20_000, 200.0).compliance_rate, 0.0);
    }
}
