use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while parsing a ramp plan
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("a load plan needs at least one stage")]
    Empty,

    #[error("invalid stage '{0}', expected <duration>:<target> such as 30s:10")]
    InvalidStage(String),

    #[error("invalid duration in stage '{stage}': {source}")]
    InvalidDuration {
        stage: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("invalid target in stage '{stage}': {source}")]
    InvalidTarget {
        stage: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("load plan is too long, total duration overflows")]
    TooLong,
}

/// One ramp stage: move linearly to `target` virtual users over `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

impl FromStr for Stage {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stage = s.trim();
        let (duration, target) = stage
            .rsplit_once(':')
            .ok_or_else(|| PlanError::InvalidStage(stage.to_string()))?;

        let duration = humantime::parse_duration(duration.trim()).map_err(|source| {
            PlanError::InvalidDuration {
                stage: stage.to_string(),
                source,
            }
        })?;
        let target = target.trim().parse().map_err(|source| PlanError::InvalidTarget {
            stage: stage.to_string(),
            source,
        })?;

        Ok(Stage { duration, target })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", humantime::format_duration(self.duration), self.target)
    }
}

/// Ordered ramp stages driving the number of active virtual users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    stages: Vec<Stage>,
}

impl LoadPlan {
    pub fn new(stages: Vec<Stage>) -> Result<Self, PlanError> {
        if stages.is_empty() {
            return Err(PlanError::Empty);
        }
        // total_duration and target_at add stage durations unchecked
        stages
            .iter()
            .try_fold(Duration::ZERO, |total, stage| total.checked_add(stage.duration))
            .ok_or(PlanError::TooLong)?;
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn peak_target(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Number of virtual users that should be active `elapsed` into the run.
    ///
    /// Each stage interpolates from the previous stage's target (0 before the
    /// first stage) to its own. Zero-length stages jump straight to their
    /// target. Past the end of the plan the answer is 0.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        let mut from = 0u32;
        let mut stage_start = Duration::ZERO;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                let progress = (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let from_f = from as f64;
                let to_f = stage.target as f64;
                return (from_f + (to_f - from_f) * progress).round() as u32;
            }
            from = stage.target;
            stage_start = stage_end;
        }

        0
    }
}

impl Default for LoadPlan {
    fn default() -> Self {
        Self {
            stages: vec![
                Stage::new(Duration::from_secs(30), 10),
                Stage::new(Duration::from_secs(60), 10),
                Stage::new(Duration::from_secs(30), 20),
                Stage::new(Duration::from_secs(60), 20),
                Stage::new(Duration::from_secs(30), 0),
            ],
        }
    }
}

impl FromStr for LoadPlan {
    type Err = PlanError;

    /// Parse a comma-separated list of stages, e.g. `30s:10,1m:20,30s:0`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stages = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Stage>, _>>()?;
        Self::new(stages)
    }
}

impl fmt::Display for LoadPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.stages.iter().map(Stage::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_parse_stage() {
        let stage: Stage = "1m30s:25".parse().unwrap();
        assert_eq!(stage, Stage::new(secs(90), 25));

        assert!(matches!("30s".parse::<Stage>(), Err(PlanError::InvalidStage(_))));
        assert!(matches!("abc:10".parse::<Stage>(), Err(PlanError::InvalidDuration { .. })));
        assert!(matches!("30s:-1".parse::<Stage>(), Err(PlanError::InvalidTarget { .. })));
    }

    #[test]
    fn test_parse_plan() {
        let plan: LoadPlan = "30s:10, 1m:20 ,30s:0".parse().unwrap();
        assert_eq!(plan.stages().len(), 3);
        assert_eq!(plan.total_duration(), secs(120));
        assert_eq!(plan.peak_target(), 20);

        assert!(matches!("".parse::<LoadPlan>(), Err(PlanError::Empty)));
    }

    #[test]
    fn test_plan_duration_overflow_is_rejected() {
        let result = "500000000000years:1,500000000000years:1".parse::<LoadPlan>();
        assert!(matches!(result, Err(PlanError::TooLong)));

        let single: LoadPlan = "500000000000years:1".parse().unwrap();
        assert_eq!(single.peak_target(), 1);
    }

    #[test]
    fn test_linear_ramp_up() {
        let plan = LoadPlan::new(vec![Stage::new(secs(10), 10)]).unwrap();

        assert_eq!(plan.target_at(secs(0)), 0);
        assert_eq!(plan.target_at(secs(5)), 5);
        assert_eq!(plan.target_at(Duration::from_millis(9_900)), 10);
        assert_eq!(plan.target_at(secs(10)), 0);
    }

    #[test]
    fn test_hold_and_ramp_down() {
        let plan: LoadPlan = "10s:10,10s:10,10s:0".parse().unwrap();

        assert_eq!(plan.target_at(secs(15)), 10);
        assert_eq!(plan.target_at(secs(25)), 5);
        assert_eq!(plan.target_at(secs(40)), 0);
    }

    #[test]
    fn test_zero_length_stage_jumps() {
        let plan: LoadPlan = "0s:5,10s:5".parse().unwrap();

        assert_eq!(plan.target_at(secs(0)), 5);
        assert_eq!(plan.target_at(secs(9)), 5);
    }

    #[test]
    fn test_default_plan_shape() {
        let plan = LoadPlan::default();
        assert_eq!(plan.total_duration(), secs(210));
        assert_eq!(plan.peak_target(), 20);
        assert_eq!(plan.to_string(), "30s:10,1m:10,30s:20,1m:20,30s:0");
    }
}
