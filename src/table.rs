//! Transition sources: the `lookup(state, symbol)` capability a `Machine` runs on.
//!
//! A missing entry is the halting signal, never an error. Two implementations are
//! provided: a hash-map backed `TransitionTable` (what the loader produces) and
//! `TransitionFn`, which wraps a plain function or closure.

use crate::types::{Direction, Transition};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;

/// Anything that can answer "what happens in `state` reading `symbol`?".
///
/// Sources are shared read-only between a machine's worker and its clones, so
/// they must be `Send + Sync` and must not mutate on lookup.
pub trait TransitionSource<S, T>: Send + Sync {
    /// Returns the transition for the pair, or `None` when the machine should halt.
    fn lookup(&self, state: &S, symbol: &T) -> Option<Transition<S, T>>;
}

/// A transition table keyed by `(state, symbol)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable<S = String, T = char>
where
    S: Eq + Hash,
    T: Eq + Hash,
{
    rules: HashMap<(S, T), Transition<S, T>>,
}

impl<S, T> Default for TransitionTable<S, T>
where
    S: Eq + Hash,
    T: Eq + Hash,
{
    fn default() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }
}

impl<S, T> TransitionTable<S, T>
where
    S: Eq + Hash,
    T: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule. A rule already present for the same pair is replaced and returned.
    pub fn insert(
        &mut self,
        state: S,
        read: T,
        transition: Transition<S, T>,
    ) -> Option<Transition<S, T>> {
        self.rules.insert((state, read), transition)
    }

    /// Convenience wrapper around [`insert`](Self::insert) for the common five-field rule.
    pub fn rule(mut self, state: S, read: T, write: T, direction: Direction, next: S) -> Self {
        self.insert(state, read, Transition::new(next, write, direction));
        self
    }

    /// Number of rules in the table.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(S, T), &Transition<S, T>)> {
        self.rules.iter()
    }
}

impl<S, T> TransitionTable<S, T>
where
    S: Eq + Hash + Ord + Clone,
    T: Eq + Hash,
{
    /// Every state label mentioned by the table, as a source or a target, in sorted order.
    pub fn states(&self) -> Vec<S> {
        self.rules
            .iter()
            .flat_map(|((state, _), t)| [state.clone(), t.next_state.clone()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl<S, T> FromIterator<(S, T, Transition<S, T>)> for TransitionTable<S, T>
where
    S: Eq + Hash,
    T: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (S, T, Transition<S, T>)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (state, read, transition) in iter {
            table.insert(state, read, transition);
        }
        table
    }
}

impl<S, T> TransitionSource<S, T> for TransitionTable<S, T>
where
    S: Eq + Hash + Clone + Send + Sync,
    T: Eq + Hash + Clone + Send + Sync,
{
    fn lookup(&self, state: &S, symbol: &T) -> Option<Transition<S, T>> {
        self.rules.get(&(state.clone(), symbol.clone())).cloned()
    }
}

/// A transition source backed by a function.
///
/// Useful for machines whose rules are easier to compute than to enumerate.
pub struct TransitionFn<F>(F);

impl<F> TransitionFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> fmt::Debug for TransitionFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TransitionFn(..)")
    }
}

impl<S, T, F> TransitionSource<S, T> for TransitionFn<F>
where
    F: Fn(&S, &T) -> Option<Transition<S, T>> + Send + Sync,
{
    fn lookup(&self, state: &S, symbol: &T) -> Option<Transition<S, T>> {
        (self.0)(state, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn increment_table() -> TransitionTable {
        TransitionTable::new()
            .rule("0".into(), '1', '0', Direction::Left, "0".into())
            .rule("0".into(), '0', '1', Direction::Left, "1".into())
    }

    #[test]
    fn test_lookup_present_rule() {
        let table = increment_table();

        let t = table.lookup(&"0".to_string(), &'1').unwrap();
        assert_eq!(t.next_state, "0");
        assert_eq!(t.write, '0');
        assert_eq!(t.direction, Direction::Left);
    }

    #[test]
    fn test_lookup_missing_rule_is_none() {
        let table = increment_table();

        assert!(table.lookup(&"1".to_string(), &'0').is_none());
        assert!(table.lookup(&"0".to_string(), &'x').is_none());
    }

    #[test]
    fn test_insert_replaces_existing_rule() {
        let mut table = increment_table();
        let previous = table.insert(
            "0".into(),
            '1',
            Transition::new("9".into(), '1', Direction::Right),
        );

        assert_eq!(previous.unwrap().next_state, "0");
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(&"0".to_string(), &'1').unwrap().next_state, "9");
    }

    #[test]
    fn test_states_include_targets() {
        let table = increment_table();
        assert_eq!(table.states(), vec!["0".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_from_iterator() {
        let table: TransitionTable<u8, bool> = [
            (0, false, Transition::new(1, true, Direction::Right)),
            (1, true, Transition::new(0, false, Direction::Left)),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(&1, &true).unwrap().next_state, 0);
    }

    #[test]
    fn test_function_source() {
        let source = TransitionFn::new(|state: &u32, symbol: &char| {
            (*symbol == 'a').then(|| Transition::new(state + 1, 'b', Direction::Right))
        });

        assert_eq!(source.lookup(&4, &'a').unwrap().next_state, 5);
        assert!(source.lookup(&4, &'b').is_none());
    }
}
