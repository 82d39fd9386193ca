//! Scope management for variable resolution

use lss_syntax::Expression;
use rustc_hash::FxHashMap;

/// What a name resolves to inside a subroutine
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    /// Real local slot
    Slot(u16),
    /// `foreach` element: reading it re-evaluates `collection[index]`
    Iteration {
        /// Iterated expression
        collection: Expression,
        /// Hidden slot holding the current index
        index_slot: u16,
        /// Frame whose names `collection` is resolved against
        frame: usize,
    },
}

/// A lexical frame
#[derive(Debug)]
pub struct Scope {
    /// Parent frame index (None for the subroutine frame)
    pub parent: Option<usize>,
    /// Bindings in this frame
    pub bindings: FxHashMap<String, Variable>,
}

impl Scope {
    /// Create a new frame
    pub fn new(parent: Option<usize>) -> Self {
        Self {
            parent,
            bindings: FxHashMap::default(),
        }
    }
}

/// Chain of frames for one subroutine
///
/// Frames are kept in a vector and refer to their parent by index; slots are
/// never reused, so the slot count only grows.
#[derive(Debug, Default)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
    current: Option<usize>,
    next_slot: u32,
    hidden: u32,
}

impl ScopeChain {
    /// Create a chain with a single subroutine frame
    pub fn new() -> Self {
        let mut chain = Self::default();
        chain.enter();
        chain
    }

    /// Enter a new frame
    pub fn enter(&mut self) {
        let idx = self.scopes.len();
        self.scopes.push(Scope::new(self.current));
        self.current = Some(idx);
    }

    /// Exit the current frame
    pub fn exit(&mut self) {
        if let Some(idx) = self.current {
            self.current = self.scopes[idx].parent;
        }
    }

    /// Declare a slot variable in the current frame
    ///
    /// Returns `None` if the name is already bound in this frame. Outer
    /// frames may hold the same name; the new binding shadows them.
    pub fn declare(&mut self, name: &str) -> Option<u16> {
        let current = self.current?;
        if self.scopes[current].bindings.contains_key(name) {
            return None;
        }
        let slot = self.allocate();
        self.scopes[current]
            .bindings
            .insert(name.to_string(), Variable::Slot(slot));
        Some(slot)
    }

    /// Bind a name to an arbitrary variable in the current frame
    pub fn bind(&mut self, name: &str, variable: Variable) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        let bindings = &mut self.scopes[current].bindings;
        if bindings.contains_key(name) {
            return false;
        }
        bindings.insert(name.to_string(), variable);
        true
    }

    /// Parent of the current frame
    pub fn enclosing(&self) -> Option<usize> {
        self.scopes[self.current?].parent
    }

    /// Make `frame` current, returning the frame that was current before
    ///
    /// Declarations made in frames entered after `frame` are invisible until
    /// the previous frame is restored.
    pub fn switch_to(&mut self, frame: Option<usize>) -> Option<usize> {
        std::mem::replace(&mut self.current, frame)
    }

    /// Allocate a slot under a name no source identifier can spell
    pub fn declare_hidden(&mut self, purpose: &str) -> u16 {
        self.hidden += 1;
        let name = format!("${purpose}{}", self.hidden);
        let slot = self.allocate();
        if let Some(current) = self.current {
            self.scopes[current].bindings.insert(name, Variable::Slot(slot));
        }
        slot
    }

    fn allocate(&mut self) -> u16 {
        let slot = self.next_slot;
        self.next_slot += 1;
        // overflow is reported through `slot_count`
        slot.min(u16::MAX as u32) as u16
    }

    /// Resolve a name, innermost frame first
    pub fn resolve(&self, name: &str) -> Option<&Variable> {
        let mut idx = self.current?;
        loop {
            let scope = &self.scopes[idx];
            if let Some(variable) = scope.bindings.get(name) {
                return Some(variable);
            }
            idx = scope.parent?;
        }
    }

    /// Number of slots allocated so far
    pub fn slot_count(&self) -> u32 {
        self.next_slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_resolve() {
        let mut chain = ScopeChain::new();
        assert_eq!(chain.declare("x"), Some(0));
        assert_eq!(chain.declare("y"), Some(1));
        assert_eq!(chain.resolve("x"), Some(&Variable::Slot(0)));
        assert_eq!(chain.resolve("y"), Some(&Variable::Slot(1)));
        assert_eq!(chain.resolve("z"), None);
    }

    #[test]
    fn test_duplicate_in_same_frame() {
        let mut chain = ScopeChain::new();
        chain.declare("x");
        assert_eq!(chain.declare("x"), None);
    }

    #[test]
    fn test_inner_frame_shadows() {
        let mut chain = ScopeChain::new();
        chain.declare("x");
        chain.enter();
        assert_eq!(chain.declare("x"), Some(1));
        assert_eq!(chain.resolve("x"), Some(&Variable::Slot(1)));
        chain.exit();
        assert_eq!(chain.resolve("x"), Some(&Variable::Slot(0)));
        assert_eq!(chain.slot_count(), 2);
    }

    #[test]
    fn test_switch_hides_inner_declarations() {
        let mut chain = ScopeChain::new();
        chain.declare("list");
        chain.enter();
        let outer = chain.enclosing();
        chain.enter();
        chain.declare("list");
        assert_eq!(chain.resolve("list"), Some(&Variable::Slot(1)));

        let previous = chain.switch_to(outer);
        assert_eq!(chain.resolve("list"), Some(&Variable::Slot(0)));
        chain.switch_to(previous);
        assert_eq!(chain.resolve("list"), Some(&Variable::Slot(1)));
    }

    #[test]
    fn test_hidden_names_never_collide() {
        let mut chain = ScopeChain::new();
        let index = chain.declare_hidden("index");
        assert_eq!(chain.declare("index"), Some(index + 1));
        assert_eq!(chain.declare("index1"), Some(index + 2));
    }
}
