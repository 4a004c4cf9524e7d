use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{Display, EnumIter, EnumString};

/// Letter grade summarizing overall efficiency improvement.
///
/// Grades order by [`rank`](PerformanceGrade::rank), so `A > B > C > D > F`
/// and the best of a set is simply its maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
pub enum PerformanceGrade {
    A,
    B,
    C,
    D,
    F,
}

impl PerformanceGrade {
    /// Inclusive lower bounds (percent), checked from the top down.
    const THRESHOLDS: [(f64, PerformanceGrade); 4] = [
        (25.0, PerformanceGrade::A),
        (15.0, PerformanceGrade::B),
        (10.0, PerformanceGrade::C),
        (5.0, PerformanceGrade::D),
    ];

    /// Grade an overall improvement percentage.
    pub fn from_improvement(overall_improvement_pct: f64) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(lower, _)| overall_improvement_pct >= *lower)
            .map(|(_, grade)| *grade)
            .unwrap_or(PerformanceGrade::F)
    }

    pub fn rank(&self) -> u8 {
        match self {
            PerformanceGrade::A => 5,
            PerformanceGrade::B => 4,
            PerformanceGrade::C => 3,
            PerformanceGrade::D => 2,
            PerformanceGrade::F => 1,
        }
    }

    /// Highest-ranked grade of the iterator, `None` when it is empty.
    pub fn best<I>(grades: I) -> Option<Self>
    where
        I: IntoIterator<Item = PerformanceGrade>,
    {
        grades.into_iter().max()
    }
}

impl PartialOrd for PerformanceGrade {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PerformanceGrade {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}
