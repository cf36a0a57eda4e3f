//! Finite state machine over named integer variables.
//!
//! An [`Fsm`] holds named states, each carrying a value of type `T`, and
//! transitions guarded by [`Condition`]s such as `speed > 0`. The machine
//! owns its variables in a [`Scope`]; [`Fsm::evaluate`] follows transitions
//! until none applies.
//!
//! Machines are assembled with an [`FsmBuilder`], which checks that every
//! referenced state and variable exists. A machine always has at least one
//! state.

use std::fmt;
use std::str::FromStr;

use minty_serialize::prelude::*;

use crate::FsmError;

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Named integer variables, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    variables: Vec<(String, i32)>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Set `name` to `value`, declaring it if needed.
    pub fn set(&mut self, name: &str, value: i32) {
        match self.variables.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.variables.push((name.to_owned(), value)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.iter().any(|(n, _)| n == name)
    }

    /// Zero every variable.
    pub fn reset(&mut self) {
        for (_, value) in &mut self.variables {
            *value = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.variables.iter().map(|(n, v)| (n.as_str(), *v))
    }
}

impl Serializable for Scope {
    fn serialize(&self, writer: &mut Writer<'_>) {
        for (name, value) in &self.variables {
            writer.write(name, value);
        }
    }

    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        for child in reader.children() {
            let value = child.value::<i32>().ok_or_else(|| DeserializeError::Invalid {
                field: child.name().to_owned(),
                details: format!("'{}' is not an integer", child.node().data()),
            })?;
            self.set(child.name(), value);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparison {
    pub fn apply(self, left: i32, right: i32) -> bool {
        match self {
            Comparison::Equal => left == right,
            Comparison::NotEqual => left != right,
            Comparison::Greater => left > right,
            Comparison::GreaterOrEqual => left >= right,
            Comparison::Less => left < right,
            Comparison::LessOrEqual => left <= right,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" | "=" => Comparison::Equal,
            "!=" => Comparison::NotEqual,
            ">" => Comparison::Greater,
            ">=" => Comparison::GreaterOrEqual,
            "<" => Comparison::Less,
            "<=" => Comparison::LessOrEqual,
            _ => return None,
        })
    }
}

/// `variable op value`, e.g. `speed >= 2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub variable: String,
    pub comparison: Comparison,
    pub value: i32,
}

impl Condition {
    pub fn new(variable: impl Into<String>, comparison: Comparison, value: i32) -> Self {
        Self {
            variable: variable.into(),
            comparison,
            value,
        }
    }

    /// False when the variable is not declared in `scope`.
    pub fn evaluate(&self, scope: &Scope) -> bool {
        scope
            .get(&self.variable)
            .is_some_and(|current| self.comparison.apply(current, self.value))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.variable, self.comparison.symbol(), self.value)
    }
}

impl FromStr for Condition {
    type Err = FsmError;

    /// The variable name may itself contain spaces; the operator and value
    /// are the last two words.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bad = || FsmError::BadCondition {
            text: text.to_owned(),
        };
        let mut parts = text.trim().rsplitn(3, ' ');
        let value = parts.next().and_then(|v| v.parse().ok()).ok_or_else(bad)?;
        let comparison = parts
            .next()
            .and_then(Comparison::from_symbol)
            .ok_or_else(bad)?;
        let variable = parts.next().map(str::trim).filter(|v| !v.is_empty()).ok_or_else(bad)?;
        Ok(Self::new(variable, comparison, value))
    }
}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Index of the target state.
    pub target: usize,
    pub conditions: Vec<Condition>,
}

impl Transition {
    /// True when every condition holds. A transition with no conditions
    /// always passes.
    pub fn passes(&self, scope: &Scope) -> bool {
        self.conditions.iter().all(|c| c.evaluate(scope))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct State<T> {
    pub name: String,
    pub value: T,
    pub transitions: Vec<Transition>,
}

// ---------------------------------------------------------------------------
// Fsm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Fsm<T> {
    scope: Scope,
    states: Vec<State<T>>,
    start: usize,
    current: usize,
}

impl<T> Fsm<T> {
    pub fn builder() -> FsmBuilder<T> {
        FsmBuilder::new()
    }

    pub fn current_state(&self) -> &str {
        &self.states[self.current].name
    }

    pub fn current_value(&self) -> &T {
        &self.states[self.current].value
    }

    pub fn start_state(&self) -> &str {
        &self.states[self.start].name
    }

    pub fn states(&self) -> &[State<T>] {
        &self.states
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }

    /// Take the first transition out of the current state whose conditions
    /// all hold in `scope`. Returns whether the state changed.
    pub fn advance(&mut self, scope: &Scope) -> bool {
        let next = self.states[self.current]
            .transitions
            .iter()
            .find(|t| t.passes(scope))
            .map(|t| t.target);
        match next {
            Some(target) => {
                self.current = target;
                true
            }
            None => false,
        }
    }

    /// Follow transitions against the machine's own variables until none
    /// applies. Returns whether the state changed.
    ///
    /// Reaching a state twice in one evaluation is a [`FsmError::Loop`]; the
    /// current state is left as it was.
    pub fn evaluate(&mut self) -> Result<bool, FsmError> {
        let origin = self.current;
        let mut visited = vec![false; self.states.len()];
        visited[origin] = true;
        let mut state = origin;

        while let Some(transition) = self.states[state]
            .transitions
            .iter()
            .find(|t| t.passes(&self.scope))
        {
            state = transition.target;
            if std::mem::replace(&mut visited[state], true) {
                return Err(FsmError::Loop {
                    state: self.states[state].name.clone(),
                });
            }
        }

        self.current = state;
        Ok(state != origin)
    }

    pub fn variable(&self, name: &str) -> Option<i32> {
        self.scope.get(name)
    }

    /// Set a declared variable.
    pub fn set_variable(&mut self, name: &str, value: i32) -> Result<(), FsmError> {
        if !self.scope.contains(name) {
            return Err(FsmError::UnknownVariable {
                name: name.to_owned(),
            });
        }
        self.scope.set(name, value);
        Ok(())
    }

    /// Jump directly to `name` without checking transitions.
    pub fn set_state(&mut self, name: &str) -> Result<(), FsmError> {
        self.current = self.index_of(name).ok_or_else(|| FsmError::UnknownState {
            name: name.to_owned(),
        })?;
        Ok(())
    }

    /// Zero every variable and return to the start state.
    pub fn reset(&mut self) {
        self.scope.reset();
        self.current = self.start;
    }
}

impl<T: NodeValue> Fsm<T> {
    /// Build a machine from a node written by [`Serializable::serialize`].
    pub fn from_reader(reader: &Reader<'_>) -> Result<Self, DeserializeError> {
        let invalid = |details: String| DeserializeError::Invalid {
            field: "fsm".to_owned(),
            details,
        };

        let mut builder = FsmBuilder::new();
        if let Some(scope) = reader.unique_child("scope")? {
            let mut variables = Scope::new();
            variables.deserialize(&scope)?;
            for (name, value) in variables.iter() {
                builder = builder.variable(name, value);
            }
        }

        let mut transitions = Vec::new();
        if let Some(states) = reader.unique_child("states")? {
            for state in states.children() {
                let value = match state.child("value") {
                    Some(v) => v.value::<T>().ok_or_else(|| {
                        invalid(format!(
                            "state '{}' has unreadable value '{}'",
                            state.name(),
                            v.node().data()
                        ))
                    })?,
                    None => return Err(invalid(format!("state '{}' has no value", state.name()))),
                };
                builder = builder.state(state.name(), value);

                let Some(list) = state.child("transitions") else {
                    continue;
                };
                for transition in list.children() {
                    let target: String = transition.read("state").ok_or_else(|| {
                        invalid(format!("transition out of '{}' has no target", state.name()))
                    })?;
                    let mut conditions = Vec::new();
                    for text in transition.read_list::<String>("conditions") {
                        conditions.push(text.parse::<Condition>().map_err(|e| invalid(e.to_string()))?);
                    }
                    transitions.push((state.name().to_owned(), target, conditions));
                }
            }
        }
        for (from, to, conditions) in transitions {
            builder = builder.transition(&from, &to, conditions);
        }

        if let Some(start) = reader.read::<String>("start") {
            builder = builder.start(&start);
        }
        builder.build().map_err(|e| invalid(e.to_string()))
    }
}

impl<T: NodeValue> Serializable for Fsm<T> {
    fn serialize(&self, writer: &mut Writer<'_>) {
        writer.write_object("scope", &self.scope);

        let mut states = Node::new("states");
        for state in &self.states {
            let node = states.add_child(Node::new(state.name.as_str()));
            node.add_child(Node::leaf("value", state.value.to_node_string()));
            let list = node.add_child(Node::new("transitions"));
            for transition in &state.transitions {
                let entry = list.add_child(Node::new(""));
                entry.add_child(Node::leaf("state", self.states[transition.target].name.as_str()));
                let conditions = entry.add_child(Node::new("conditions"));
                for condition in &transition.conditions {
                    conditions.add_child(Node::leaf("", condition.to_string()));
                }
            }
        }
        writer.write_node(states);

        writer.write("start", &self.states[self.start].name);
    }

    /// Replaces the whole machine. On error `self` is unchanged.
    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        *self = Self::from_reader(reader)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FsmBuilder
// ---------------------------------------------------------------------------

/// Assembles an [`Fsm`], resolving state and variable names on `build`.
///
/// The first declared state is the start state unless [`start`](Self::start)
/// names another.
#[derive(Debug)]
pub struct FsmBuilder<T> {
    scope: Scope,
    states: Vec<(String, T)>,
    transitions: Vec<(String, String, Vec<Condition>)>,
    start: Option<String>,
}

impl<T> Default for FsmBuilder<T> {
    fn default() -> Self {
        Self {
            scope: Scope::new(),
            states: Vec::new(),
            transitions: Vec::new(),
            start: None,
        }
    }
}

impl<T> FsmBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, name: &str, initial: i32) -> Self {
        self.scope.set(name, initial);
        self
    }

    pub fn state(mut self, name: &str, value: T) -> Self {
        self.states.push((name.to_owned(), value));
        self
    }

    pub fn transition(mut self, from: &str, to: &str, conditions: Vec<Condition>) -> Self {
        self.transitions.push((from.to_owned(), to.to_owned(), conditions));
        self
    }

    pub fn start(mut self, name: &str) -> Self {
        self.start = Some(name.to_owned());
        self
    }

    pub fn build(self) -> Result<Fsm<T>, FsmError> {
        if self.states.is_empty() {
            return Err(FsmError::Empty);
        }
        let index_of = |name: &str| {
            self.states
                .iter()
                .position(|(n, _)| n == name)
                .ok_or_else(|| FsmError::UnknownState {
                    name: name.to_owned(),
                })
        };

        for (i, (name, _)) in self.states.iter().enumerate() {
            if self.states[..i].iter().any(|(other, _)| other == name) {
                return Err(FsmError::DuplicateState { name: name.clone() });
            }
        }

        let start = match &self.start {
            Some(name) => index_of(name)?,
            None => 0,
        };

        let mut resolved: Vec<Vec<Transition>> = self.states.iter().map(|_| Vec::new()).collect();
        for (from, to, conditions) in &self.transitions {
            let from = index_of(from)?;
            let target = index_of(to)?;
            if let Some(missing) = conditions.iter().find(|c| !self.scope.contains(&c.variable)) {
                return Err(FsmError::UnknownVariable {
                    name: missing.variable.clone(),
                });
            }
            resolved[from].push(Transition {
                target,
                conditions: conditions.clone(),
            });
        }

        let states = self
            .states
            .into_iter()
            .zip(resolved)
            .map(|((name, value), transitions)| State {
                name,
                value,
                transitions,
            })
            .collect();

        Ok(Fsm {
            scope: self.scope,
            states,
            start,
            current: start,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gt(var: &str, value: i32) -> Condition {
        Condition::new(var, Comparison::Greater, value)
    }

    fn eq(var: &str, value: i32) -> Condition {
        Condition::new(var, Comparison::Equal, value)
    }

    /// Idle -> Walk when speed > 0, Walk -> Run when speed > 5,
    /// Walk/Run -> Idle when speed == 0.
    fn locomotion() -> Fsm<i32> {
        Fsm::builder()
            .variable("speed", 0)
            .state("Idle", 1)
            .state("Walk", 2)
            .state("Run", 3)
            .transition("Idle", "Walk", vec![gt("speed", 0)])
            .transition("Walk", "Run", vec![gt("speed", 5)])
            .transition("Walk", "Idle", vec![eq("speed", 0)])
            .transition("Run", "Idle", vec![eq("speed", 0)])
            .build()
            .unwrap()
    }

    #[test]
    fn empty_machine_is_rejected() {
        assert!(matches!(FsmBuilder::<i32>::new().build(), Err(FsmError::Empty)));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = Fsm::builder().state("A", 0).transition("A", "B", vec![]).build();
        assert!(matches!(err, Err(FsmError::UnknownState { name }) if name == "B"));

        let err = Fsm::builder()
            .state("A", 0)
            .state("B", 0)
            .transition("A", "B", vec![gt("missing", 0)])
            .build();
        assert!(matches!(err, Err(FsmError::UnknownVariable { name }) if name == "missing"));

        let err = Fsm::builder().state("A", 0).start("Z").build();
        assert!(matches!(err, Err(FsmError::UnknownState { .. })));

        let err = Fsm::builder().state("A", 0).state("A", 1).build();
        assert!(matches!(err, Err(FsmError::DuplicateState { .. })));
    }

    #[test]
    fn condition_text_form() {
        let c: Condition = "move speed >= -3".parse().unwrap();
        assert_eq!(c, Condition::new("move speed", Comparison::GreaterOrEqual, -3));
        assert_eq!(c.to_string(), "move speed >= -3");

        assert!("speed >".parse::<Condition>().is_err());
        assert!("speed ~ 3".parse::<Condition>().is_err());
        assert!("> 3".parse::<Condition>().is_err());
    }

    #[test]
    fn missing_variable_never_passes() {
        let scope = Scope::new();
        assert!(!gt("speed", -100).evaluate(&scope));
    }

    #[test]
    fn evaluate_follows_chains() {
        let mut fsm = locomotion();
        assert_eq!(fsm.current_state(), "Idle");
        assert!(!fsm.evaluate().unwrap());

        fsm.set_variable("speed", 9).unwrap();
        assert!(fsm.evaluate().unwrap());
        assert_eq!(fsm.current_state(), "Run");
        assert_eq!(*fsm.current_value(), 3);

        fsm.set_variable("speed", 0).unwrap();
        assert!(fsm.evaluate().unwrap());
        assert_eq!(fsm.current_state(), "Idle");
    }

    #[test]
    fn advance_takes_first_matching_transition() {
        let mut fsm = Fsm::builder()
            .variable("x", 1)
            .state("A", 0)
            .state("B", 0)
            .state("C", 0)
            .transition("A", "B", vec![gt("x", 0)])
            .transition("A", "C", vec![gt("x", 0)])
            .build()
            .unwrap();
        let scope = fsm.scope().clone();
        assert!(fsm.advance(&scope));
        assert_eq!(fsm.current_state(), "B");
        assert!(!fsm.advance(&scope));
    }

    #[test]
    fn evaluate_detects_loops() {
        let mut fsm = Fsm::builder()
            .state("A", 0)
            .state("B", 0)
            .transition("A", "B", vec![])
            .transition("B", "A", vec![])
            .build()
            .unwrap();
        assert!(matches!(fsm.evaluate(), Err(FsmError::Loop { .. })));
        assert_eq!(fsm.current_state(), "A");
    }

    #[test]
    fn reset_zeroes_variables_and_returns_to_start() {
        let mut fsm = locomotion();
        fsm.set_variable("speed", 3).unwrap();
        fsm.evaluate().unwrap();
        assert_eq!(fsm.current_state(), "Walk");

        fsm.reset();
        assert_eq!(fsm.current_state(), "Idle");
        assert_eq!(fsm.variable("speed"), Some(0));
        assert!(fsm.set_variable("nope", 1).is_err());
    }

    #[test]
    fn serialized_machine_reads_back() {
        let mut fsm = locomotion();
        fsm.set_variable("speed", 4).unwrap();

        let text = to_node("Fsm", &fsm).to_text();
        let node = Node::parse_text(&text).unwrap();
        let restored = Fsm::<i32>::from_reader(&Reader::new(&node)).unwrap();

        assert_eq!(restored.variable("speed"), Some(4));
        assert_eq!(restored.start_state(), "Idle");
        assert_eq!(restored.states(), fsm.states());
    }

    #[test]
    fn punctuated_names_read_back() {
        let fsm = Fsm::builder()
            .variable("Jump: Up", 0)
            .variable("#hits", 0)
            .state("#1", 1)
            .state("Jump: Up", 2)
            .state("- air", 3)
            .transition("#1", "Jump: Up", vec![Condition::new("Jump: Up", Comparison::Greater, 0)])
            .transition("Jump: Up", "- air", vec![Condition::new("#hits", Comparison::Equal, 2)])
            .build()
            .unwrap();

        let text = to_node("Fsm", &fsm).to_text();
        let node = Node::parse_text(&text).unwrap();
        let mut restored = Fsm::<i32>::from_reader(&Reader::new(&node)).unwrap();
        assert_eq!(restored, fsm);

        restored.set_variable("Jump: Up", 1).unwrap();
        restored.set_variable("#hits", 2).unwrap();
        assert!(restored.evaluate().unwrap());
        assert_eq!(restored.current_state(), "- air");
    }

    #[test]
    fn deserialize_keeps_machine_on_error() {
        let mut fsm = locomotion();
        let node = Node::new("Fsm");
        assert!(fsm.deserialize(&Reader::new(&node)).is_err());
        assert_eq!(fsm.states().len(), 3);
    }
}
