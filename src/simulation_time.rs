use serde::Deserialize;

pub const HOURS_IN_DAY: u32 = 24;

/// Fixed-step simulation horizon, expressed in hours. A step of 1/60 gives
/// the one-minute resolution the VDI 6007 verification cases run at; a step
/// of 1 gives hourly resolution.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct SimulationTime {
    #[serde(rename(deserialize = "start"))]
    start_time: f64,
    #[serde(rename(deserialize = "end"))]
    end_time: f64,
    step: f64,
}

impl SimulationTime {
    pub fn new(start_time: f64, end_time: f64, step: f64) -> Self {
        Self {
            start_time,
            end_time,
            step,
        }
    }

    /// Number of timesteps in the horizon, covering any partial final step.
    /// All boundary and control arrays must have exactly this length.
    pub fn total_steps(&self) -> usize {
        let steps = (self.end_time - self.start_time) / self.step;
        // Snap near-integer quotients before ceiling: steps like 1/60 h are
        // not exactly representable and must not gain a spurious extra step.
        if (steps - steps.round()).abs() < 1e-6 * steps.round().max(1.0) {
            steps.round() as usize
        } else {
            steps.ceil() as usize
        }
    }

    /// Step length in hours.
    pub fn step(&self) -> f64 {
        self.step
    }

    pub(crate) fn iter(&self) -> SimulationTimeIterator {
        SimulationTimeIterator {
            current_index: 0,
            total_steps: self.total_steps(),
            simulation_time: *self,
        }
    }
}

#[derive(Clone)]
pub struct SimulationTimeIterator {
    current_index: usize,
    total_steps: usize,
    simulation_time: SimulationTime,
}

#[derive(Debug)]
pub struct SimulationTimeIteration {
    pub index: usize,
    pub time: f64,
    pub timestep: f64,
}

impl SimulationTimeIteration {
    pub fn current_hour(&self) -> u32 {
        self.time.floor() as u32
    }

    pub fn hour_of_day(&self) -> u32 {
        self.current_hour() % HOURS_IN_DAY
    }

    pub fn current_day(&self) -> u32 {
        self.time as u32 / HOURS_IN_DAY
    }
}

impl Iterator for SimulationTimeIterator {
    type Item = SimulationTimeIteration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_index >= self.total_steps {
            return None;
        }
        let index = self.current_index;
        self.current_index += 1;
        Some(SimulationTimeIteration {
            index,
            time: self.simulation_time.start_time + index as f64 * self.simulation_time.step,
            timestep: self.simulation_time.step,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[fixture]
    pub fn timestep() -> f64 {
        0.5
    }

    #[fixture]
    pub fn simtime() -> SimulationTime {
        SimulationTime {
            start_time: 22.0,
            end_time: 26.0,
            step: timestep(),
        }
    }

    #[rstest]
    fn should_have_correct_total_steps(simtime: SimulationTime) {
        assert_eq!(simtime.total_steps(), 8)
    }

    #[rstest]
    fn should_count_fractional_steps_without_rounding_surplus() {
        let one_minute = SimulationTime::new(0.0, 24.0, 1.0 / 60.0);
        assert_eq!(one_minute.total_steps(), 24 * 60);
        assert_eq!(one_minute.iter().count(), 24 * 60);
        let partial = SimulationTime::new(0.0, 3.3, 1.0);
        assert_eq!(partial.total_steps(), 4);
    }

    #[rstest]
    fn should_iterate_correctly(simtime: SimulationTime, timestep: f64) {
        let hours = [22, 22, 23, 23, 24, 24, 25, 25];
        let hours_of_day = [22, 22, 23, 23, 0, 0, 1, 1];
        let current_days = [0, 0, 0, 0, 1, 1, 1, 1];
        let mut i = 0;
        for item in simtime.iter() {
            assert_eq!(
                item.index, i,
                "current index is {0} with time {1}, but test iterator is {i}",
                item.index, item.time
            );
            assert_eq!(item.time, i as f64 * timestep + 22.0);
            assert_eq!(item.timestep, timestep);
            assert_eq!(item.current_hour(), hours[i]);
            assert_eq!(item.hour_of_day(), hours_of_day[i]);
            assert_eq!(item.current_day(), current_days[i]);
            i += 1;
        }
        assert_eq!(i, simtime.total_steps());
    }

    #[rstest]
    fn should_not_iterate_on_empty_horizon() {
        let simtime = SimulationTime::new(0.0, 0.0, 1.0);
        assert_eq!(simtime.total_steps(), 0);
        assert!(simtime.iter().next().is_none());
    }
}
