//! Property tests for state machines.
//!
//! Randomly generated machines are driven by random variable updates. Two
//! copies fed the same inputs must agree at every step, and a machine read
//! back from its text form must behave like the machine it was written from.

use minty_engine::prelude::*;
use proptest::prelude::*;

const VARIABLES: [&str; 3] = ["a", "b", "c"];

#[derive(Debug, Clone)]
struct EdgeSpec {
    from: usize,
    to: usize,
    conditions: Vec<(usize, Comparison, i32)>,
}

fn comparison() -> impl Strategy<Value = Comparison> {
    prop_oneof![
        Just(Comparison::Equal),
        Just(Comparison::NotEqual),
        Just(Comparison::Greater),
        Just(Comparison::GreaterOrEqual),
        Just(Comparison::Less),
        Just(Comparison::LessOrEqual),
    ]
}

fn edge(states: usize) -> impl Strategy<Value = EdgeSpec> {
    (
        0..states,
        0..states,
        prop::collection::vec((0..VARIABLES.len(), comparison(), -3..3i32), 0..3),
    )
        .prop_map(|(from, to, conditions)| EdgeSpec { from, to, conditions })
}

fn machine() -> impl Strategy<Value = (usize, Vec<EdgeSpec>)> {
    (1..6usize).prop_flat_map(|states| (Just(states), prop::collection::vec(edge(states), 0..12)))
}

fn build(states: usize, edges: &[EdgeSpec]) -> Fsm<i32> {
    let names: Vec<String> = (0..states).map(|i| format!("S{i}")).collect();
    let mut builder = Fsm::builder();
    for name in VARIABLES {
        builder = builder.variable(name, 0);
    }
    for (i, name) in names.iter().enumerate() {
        builder = builder.state(name, i as i32 * 10);
    }
    for e in edges {
        let conditions = e
            .conditions
            .iter()
            .map(|&(v, op, value)| Condition::new(VARIABLES[v], op, value))
            .collect();
        builder = builder.transition(&names[e.from], &names[e.to], conditions);
    }
    builder.build().unwrap()
}

/// One step: set a variable, evaluate, report what happened.
fn step(fsm: &mut Fsm<i32>, variable: usize, value: i32) -> (String, Option<bool>) {
    fsm.set_variable(VARIABLES[variable], value).unwrap();
    let outcome = fsm.evaluate().ok();
    (fsm.current_state().to_owned(), outcome)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn identical_inputs_give_identical_runs(
        (states, edges) in machine(),
        inputs in prop::collection::vec((0..VARIABLES.len(), -4..4i32), 1..30),
    ) {
        let mut first = build(states, &edges);
        let mut second = first.clone();
        for &(variable, value) in &inputs {
            let a = step(&mut first, variable, value);
            let b = step(&mut second, variable, value);
            prop_assert_eq!(a, b);
            prop_assert_eq!(first.current_value(), second.current_value());
        }
    }

    #[test]
    fn advance_visits_the_same_values_for_the_same_triggers(
        (states, edges) in machine(),
        triggers in prop::collection::vec((0..VARIABLES.len(), -4..4i32), 1..30),
    ) {
        let run = || {
            let mut fsm = build(states, &edges);
            let mut scope = Scope::new();
            for name in VARIABLES {
                scope.set(name, 0);
            }
            let mut values = Vec::new();
            for &(variable, value) in &triggers {
                scope.set(VARIABLES[variable], value);
                fsm.advance(&scope);
                values.push(*fsm.current_value());
            }
            values
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn evaluation_settles_or_reports_a_loop(
        (states, edges) in machine(),
        inputs in prop::collection::vec((0..VARIABLES.len(), -4..4i32), 1..30),
    ) {
        let mut fsm = build(states, &edges);
        for &(variable, value) in &inputs {
            let before = fsm.current_state().to_owned();
            fsm.set_variable(VARIABLES[variable], value).unwrap();
            match fsm.evaluate() {
                Ok(changed) => {
                    prop_assert_eq!(changed, before != fsm.current_state());
                    // Settled: no transition out of the new state applies.
                    let scope = fsm.scope().clone();
                    let mut settled = fsm.clone();
                    prop_assert!(!settled.advance(&scope));
                }
                Err(FsmError::Loop { .. }) => prop_assert_eq!(before.as_str(), fsm.current_state()),
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
    }

    #[test]
    fn text_form_behaves_like_the_written_machine(
        (states, edges) in machine(),
        inputs in prop::collection::vec((0..VARIABLES.len(), -4..4i32), 1..20),
    ) {
        let mut written = build(states, &edges);
        let text = to_node("Fsm", &written).to_text();
        let node = Node::parse_text(&text).unwrap();
        let mut restored = Fsm::<i32>::from_reader(&Reader::new(&node)).unwrap();

        for &(variable, value) in &inputs {
            prop_assert_eq!(step(&mut written, variable, value), step(&mut restored, variable, value));
        }
    }
}
