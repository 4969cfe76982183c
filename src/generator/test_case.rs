//! This module contains the serializable output of a generator run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    coverage::{CoverageSet, CoverageTracker},
    final_state::{ConcreteTestObject, FinalState},
    state::trail::Trail,
    strategy::Statistics,
};

/// A single generated test: the packet to send, the packet to expect and the
/// control-plane configuration under which to send it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TestCase {
    /// The position of the test in the order of emission.
    pub index: usize,

    /// The branch decisions of the path, which replay it when handed to the
    /// selected branches strategy.
    pub trail: Trail,

    /// The input packet as hex, most significant byte first.
    pub input_packet: String,

    /// The expected output packet as hex, or empty if nothing is emitted.
    pub output_packet: String,

    /// The concrete value of every model variable.
    pub model: BTreeMap<String, String>,

    /// The concrete value of every state variable at the end of the path.
    pub state: BTreeMap<String, String>,

    /// The concrete trace of the path.
    pub trace: Vec<String>,

    /// The concretized test objects.
    pub test_objects: Vec<ConcreteTestObject>,

    /// The program nodes the path executed.
    pub covered: CoverageSet,
}

impl TestCase {
    /// Renders `final_state` as the test at position `index`.
    #[must_use]
    pub fn new(index: usize, final_state: &FinalState) -> Self {
        Self {
            index,
            trail: final_state.trail().clone(),
            input_packet: final_state.input_packet().to_hex(),
            output_packet: final_state.output_packet().to_hex(),
            model: final_state
                .model()
                .iter()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect(),
            state: final_state
                .state_values()
                .iter()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect(),
            trace: final_state.trace().to_vec(),
            test_objects: final_state.test_objects().to_vec(),
            covered: final_state.state().visited().clone(),
        }
    }
}

/// The coverage reached by a run.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub covered:   usize,
    pub coverable: usize,
    pub ratio:     f64,
}

impl From<&CoverageTracker> for CoverageSummary {
    fn from(value: &CoverageTracker) -> Self {
        Self {
            covered:   value.covered().len(),
            coverable: value.coverable().len(),
            ratio:     value.ratio(),
        }
    }
}

/// The outcome of a generator run.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Report {
    /// The tests in the order they were emitted.
    pub tests: Vec<TestCase>,

    pub coverage: CoverageSummary,

    pub statistics: Statistics,

    /// The recoverable conditions encountered during the run, such as
    /// unimplemented constructs and unviable terminal states.
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod test {
    use crate::{
        continuation::Namespace,
        coverage::CoverageSet,
        expr::{fold, Sort},
        final_state::FinalState,
        generator::test_case::TestCase,
        program::ProgramInfo,
        solver::{EnumerativeSolver, SatResult, Solver},
        state::ExecutionState,
    };

    #[derive(Debug)]
    struct Empty;

    impl ProgramInfo for Empty {
        fn pipeline_sequence(&self) -> Vec<crate::continuation::Command> {
            vec![]
        }

        fn coverable_nodes(&self) -> CoverageSet {
            CoverageSet::new()
        }
    }

    #[test]
    fn renders_packets_as_hex() -> anyhow::Result<()> {
        let mut state = ExecutionState::new(vec![], Namespace::new());
        let byte = state.extract(8);
        state.add_constraint(fold::eq(byte.clone(), fold::bits(0xab, 8)));
        state.emit(fold::concat(byte, fold::bits(0x01, 8)));
        state.set("flag", fold::var("flag", Sort::Bool))?;

        let mut solver = EnumerativeSolver::new();
        assert_eq!(solver.check_sat(state.path_constraint()), SatResult::Sat);
        let final_state = FinalState::new(&solver, state, &Empty)?;
        let test = TestCase::new(3, &final_state);

        assert_eq!(test.index, 3);
        assert_eq!(test.input_packet, "ab");
        assert_eq!(test.output_packet, "ab01");
        assert_eq!(test.model.get("pkt_var_0").map(String::as_str), Some("8w0xab"));
        assert_eq!(test.state.get("flag").map(String::as_str), Some("false"));

        let json = serde_json::to_string(&test)?;
        let back: TestCase = serde_json::from_str(&json)?;
        assert_eq!(back, test);

        Ok(())
    }
}
