/// A speculative edit to local state that can be undone exactly.
///
/// `apply` runs before the server is asked; `revert` runs only if the server
/// refuses, and must restore `state` to what it was before `apply`.
pub trait Optimistic<S> {
    fn apply(&mut self, state: &mut S);
    fn revert(&mut self, state: &mut S);
}
