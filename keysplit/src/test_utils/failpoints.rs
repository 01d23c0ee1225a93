use fail::FailScenario;

/// Configures fail points for the lifetime of the scenario and turns them off again on drop.
///
/// Fail points are process global, so tests using a scenario must not run concurrently with
/// other tests touching the same fail points.
pub struct CustomFailScenario<'a> {
    _scenario: FailScenario<'a>,
    failpoints: Vec<String>,
}

impl<'a> CustomFailScenario<'a> {
    /// Sets up the scenario with `(fail point, action)` pairs, e.g. `("router.append_row", "return")`.
    pub fn setup(failpoints: &[(&str, &str)]) -> CustomFailScenario<'a> {
        let scenario = FailScenario::setup();

        for (failpoint, action) in failpoints {
            fail::cfg(*failpoint, action).unwrap();
        }

        Self {
            _scenario: scenario,
            failpoints: failpoints
                .iter()
                .map(|(failpoint, _)| failpoint.to_string())
                .collect(),
        }
    }

    pub fn teardown(self) {
        drop(self);
    }
}

impl Drop for CustomFailScenario<'_> {
    fn drop(&mut self) {
        for failpoint in &self.failpoints {
            fail::remove(failpoint);
        }
    }
}
