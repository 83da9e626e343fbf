//! Semantic analysis passes.
//!
//! Three passes over the matched IR, in order:
//! 1. Declaration — class/function signature tables and import
//!    classification (external names go through the bridge).
//! 2. Inference + narrowing — expression types, call resolution,
//!    `bridge_required` marking, `is None` / `isinstance` / early-return
//!    narrowing, hoisting discovery.
//! 3. Effects — `may_raise` to a fixed point across the call graph,
//!    including methods.

pub mod scope;
pub mod types;

mod effects;
mod infer;

#[cfg(test)]
mod analyze_tests;

use indexmap::IndexMap;

use crate::diagnostics::Diagnostics;
use crate::ir::{IrClass, IrFunction, IrModule};
use scope::ScopeTree;
use types::Type;

/// A callable's signature, shared by free functions and methods.
#[derive(Debug, Clone)]
pub struct FnSig {
    /// Parameter names and types, `self` excluded.
    pub params: Vec<(String, Type)>,
    /// How many trailing parameters have defaults.
    pub defaults: usize,
    /// Rest parameter (`*args`) present.
    pub variadic: bool,
    pub ret: Type,
    pub mutates_self: bool,
}

impl FnSig {
    pub fn required(&self) -> usize {
        self.params.len().saturating_sub(self.defaults)
    }
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub base: Option<String>,
    pub fields: IndexMap<String, Type>,
    pub methods: IndexMap<String, FnSig>,
    pub properties: IndexMap<String, Type>,
    pub dataclass: bool,
    pub has_init: bool,
}

/// Analysis output consumed by the generator.
pub struct Analysis {
    pub scopes: ScopeTree,
    pub classes: IndexMap<String, ClassInfo>,
    pub functions: IndexMap<String, FnSig>,
    pub diags: Diagnostics,
}

impl Analysis {
    /// Field type, walking the inheritance chain.
    pub fn field_type(&self, class: &str, field: &str) -> Option<Type> {
        let mut current = Some(class);
        while let Some(name) = current {
            let info = self.classes.get(name)?;
            if let Some(ty) = info.fields.get(field) {
                return Some(ty.clone());
            }
            current = info.base.as_deref();
        }
        None
    }

    /// Method signature and the class that defines it, walking bases.
    pub fn method_sig(&self, class: &str, method: &str) -> Option<(String, FnSig)> {
        let mut current = Some(class);
        while let Some(name) = current {
            let info = self.classes.get(name)?;
            if let Some(sig) = info.methods.get(method) {
                return Some((name.to_string(), sig.clone()));
            }
            current = info.base.as_deref();
        }
        None
    }

    pub fn property_type(&self, class: &str, prop: &str) -> Option<Type> {
        let mut current = Some(class);
        while let Some(name) = current {
            let info = self.classes.get(name)?;
            if let Some(ty) = info.properties.get(prop) {
                return Some(ty.clone());
            }
            current = info.base.as_deref();
        }
        None
    }
}

/// Runs all passes. The IR is annotated in place.
pub fn analyze(module: &mut IrModule, scopes: ScopeTree, diags: Diagnostics) -> Analysis {
    let mut analysis = Analysis {
        scopes,
        classes: IndexMap::new(),
        functions: IndexMap::new(),
        diags,
    };

    classify_imports(module);
    declare(module, &mut analysis);
    infer::run(module, &mut analysis);
    effects::run(module, &mut analysis);

    analysis
}

/// Modules with a native lowering; everything else is external.
const NATIVE_MODULES: [&str; 2] = ["math", "typing"];

fn classify_imports(module: &mut IrModule) {
    for import in &mut module.imports {
        let root = import.module.split('.').next().unwrap_or("");
        import.external = !NATIVE_MODULES.contains(&root);
    }
}

fn declare(module: &IrModule, analysis: &mut Analysis) {
    for func in &module.functions {
        analysis
            .functions
            .insert(func.name.clone(), signature_of(func));
    }
    for class in &module.classes {
        analysis
            .classes
            .insert(class.name.clone(), class_info(class));
    }
}

fn signature_of(func: &IrFunction) -> FnSig {
    let params: Vec<(String, Type)> = func
        .params
        .iter()
        .filter(|p| !p.is_self && !p.starred)
        .map(|p| (p.name.clone(), p.ty.clone()))
        .collect();
    let defaults = func
        .params
        .iter()
        .filter(|p| !p.is_self && p.default.is_some())
        .count();
    FnSig {
        params,
        defaults,
        variadic: func.params.iter().any(|p| p.starred),
        ret: func.ret.clone(),
        mutates_self: false, // effect pass refines
    }
}

fn class_info(class: &IrClass) -> ClassInfo {
    let mut fields = IndexMap::new();
    for field in &class.fields {
        fields.insert(field.name.clone(), field.ty.clone());
    }
    let mut methods = IndexMap::new();
    let mut properties = IndexMap::new();
    let mut has_init = false;
    for method in &class.methods {
        if method.name == "__init__" {
            has_init = true;
        }
        if method.is_property() {
            properties.insert(method.name.clone(), method.ret.clone());
            continue;
        }
        if method.is_setter() {
            // Setter participates as a method for call checking.
        }
        methods.insert(method.name.clone(), signature_of(method));
    }
    ClassInfo {
        base: class.base.clone(),
        fields,
        methods,
        properties,
        dataclass: class.dataclass,
        has_init,
    }
}
