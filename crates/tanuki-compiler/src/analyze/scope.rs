//! Scope tree and binding environment.
//!
//! Scopes form an arena with child→parent links; every IR node records the
//! scope it was matched in. Name *visibility* follows the source language:
//! bindings live in the nearest enclosing function/module/class scope (the
//! "home" scope), while the block that first introduced them is kept so the
//! generator can hoist bindings that escape their block.

use indexmap::IndexMap;

use super::types::Type;
use crate::span::Span;

pub type ScopeId = u32;
pub type BindingId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Class,
    Block,
    Comprehension,
    Lambda,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Bindings homed here, in declaration order.
    pub names: IndexMap<String, BindingId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Local,
    Param,
    Function,
    Class,
    Import,
    /// `self` receiver inside a method.
    SelfParam,
    /// `except ... as e` binding.
    Exception,
}

#[derive(Debug)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub ty: Type,
    /// Home scope (function/module/class).
    pub scope: ScopeId,
    /// Block that first introduced the binding.
    pub declared_in: ScopeId,
    pub span: Span,
    /// Reassigned or mutated after introduction.
    pub mutated: bool,
    /// Read or written outside `declared_in`'s subtree; the generator
    /// pre-declares it in the enclosing block.
    pub hoisted: bool,
    /// Hoisted with no zero-argument default: declared `Option`-wrapped,
    /// reads unwrap.
    pub hoisted_optional: bool,
}

#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut tree = ScopeTree::default();
        tree.scopes.push(Scope {
            kind: ScopeKind::Module,
            parent: None,
            names: IndexMap::new(),
        });
        tree
    }

    pub const MODULE: ScopeId = 0;

    pub fn push_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = self.scopes.len() as ScopeId;
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            names: IndexMap::new(),
        });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id as usize]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id as usize]
    }

    pub fn binding_mut(&mut self, id: BindingId) -> &mut Binding {
        &mut self.bindings[id as usize]
    }

    pub fn bindings(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(i, b)| (i as BindingId, b))
    }

    /// Nearest enclosing scope that homes bindings (function, module,
    /// class, comprehension, or lambda — anything but a block).
    pub fn home_scope(&self, from: ScopeId) -> ScopeId {
        let mut current = from;
        loop {
            let scope = self.scope(current);
            if scope.kind != ScopeKind::Block {
                return current;
            }
            match scope.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Declares `name` in the home scope of `at`, or returns the existing
    /// binding when the name is already visible there (a reassignment).
    pub fn declare(
        &mut self,
        name: &str,
        kind: BindingKind,
        ty: Type,
        at: ScopeId,
        span: Span,
    ) -> BindingId {
        let home = self.home_scope(at);
        if let Some(&existing) = self.scopes[home as usize].names.get(name) {
            self.bindings[existing as usize].mutated = true;
            return existing;
        }
        let id = self.bindings.len() as BindingId;
        self.bindings.push(Binding {
            name: name.to_string(),
            kind,
            ty,
            scope: home,
            declared_in: at,
            span,
            mutated: false,
            hoisted: false,
            hoisted_optional: false,
        });
        self.scopes[home as usize].names.insert(name.to_string(), id);
        id
    }

    /// Looks `name` up from `at`, walking home scopes outward.
    pub fn lookup(&self, name: &str, at: ScopeId) -> Option<BindingId> {
        let mut current = Some(self.home_scope(at));
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(&binding) = scope.names.get(name) {
                return Some(binding);
            }
            // Class scopes are not visible from nested functions.
            current = scope.parent.map(|p| self.home_scope(p));
        }
        None
    }

    /// Is `inner` inside `outer`'s subtree (inclusive)?
    pub fn is_within(&self, inner: ScopeId, outer: ScopeId) -> bool {
        let mut current = Some(inner);
        while let Some(id) = current {
            if id == outer {
                return true;
            }
            current = self.scope(id).parent;
        }
        false
    }

    /// Records a use of `binding` from `scope`; marks the binding hoisted
    /// when the use escapes the introducing block.
    pub fn record_use(&mut self, binding: BindingId, scope: ScopeId) {
        let declared_in = self.bindings[binding as usize].declared_in;
        if self.scope(declared_in).kind == ScopeKind::Block
            && !self.is_within(scope, declared_in)
        {
            let needs_option = !self.bindings[binding as usize].ty.has_default();
            let b = &mut self.bindings[binding as usize];
            b.hoisted = true;
            b.hoisted_optional = needs_option;
        }
    }

    /// Bindings homed in `home` that were hoisted out of inner blocks.
    pub fn hoisted_in(&self, home: ScopeId) -> Vec<BindingId> {
        self.bindings
            .iter()
            .enumerate()
            .filter(|(_, b)| b.scope == home && b.hoisted)
            .map(|(i, _)| i as BindingId)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_and_lookup_walks_parents() {
        let mut tree = ScopeTree::new();
        let func = tree.push_scope(ScopeKind::Function, ScopeTree::MODULE);
        let block = tree.push_scope(ScopeKind::Block, func);

        let outer = tree.declare(
            "x",
            BindingKind::Local,
            Type::Int,
            ScopeTree::MODULE,
            Span::empty(0),
        );
        let inner = tree.declare("y", BindingKind::Local, Type::Str, block, Span::empty(1));

        // y is homed in the function scope, not the block.
        assert_eq!(tree.binding(inner).scope, func);
        assert_eq!(tree.binding(inner).declared_in, block);

        assert_eq!(tree.lookup("x", block), Some(outer));
        assert_eq!(tree.lookup("y", func), Some(inner));
        assert_eq!(tree.lookup("z", block), None);
    }

    #[test]
    fn reassignment_returns_same_binding_and_marks_mutated() {
        let mut tree = ScopeTree::new();
        let func = tree.push_scope(ScopeKind::Function, ScopeTree::MODULE);
        let a = tree.declare("x", BindingKind::Local, Type::Int, func, Span::empty(0));
        let b = tree.declare("x", BindingKind::Local, Type::Int, func, Span::empty(5));
        assert_eq!(a, b);
        assert!(tree.binding(a).mutated);
    }

    #[test]
    fn use_outside_block_marks_hoisted() {
        let mut tree = ScopeTree::new();
        let func = tree.push_scope(ScopeKind::Function, ScopeTree::MODULE);
        let block = tree.push_scope(ScopeKind::Block, func);
        let b = tree.declare("result", BindingKind::Local, Type::Str, block, Span::empty(0));

        tree.record_use(b, block);
        assert!(!tree.binding(b).hoisted);

        tree.record_use(b, func);
        assert!(tree.binding(b).hoisted);
        assert!(!tree.binding(b).hoisted_optional);
        assert_eq!(tree.hoisted_in(func), vec![b]);
    }

    #[test]
    fn hoisted_struct_is_option_wrapped() {
        let mut tree = ScopeTree::new();
        let func = tree.push_scope(ScopeKind::Function, ScopeTree::MODULE);
        let block = tree.push_scope(ScopeKind::Block, func);
        let b = tree.declare(
            "obj",
            BindingKind::Local,
            Type::Struct("Point".into()),
            block,
            Span::empty(0),
        );
        tree.record_use(b, func);
        assert!(tree.binding(b).hoisted_optional);
    }
}
