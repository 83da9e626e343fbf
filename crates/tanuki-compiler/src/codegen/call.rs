//! Call emission: built-ins, user functions, constructors, methods, and
//! bridge calls.

use super::types::{param_mode, rust_type, PassMode};
use super::{rust_name, CodeGen};
use crate::analyze::types::Type;
use crate::analyze::FnSig;
use crate::diagnostics::Code;
use crate::ir::*;

impl CodeGen<'_> {
    pub(crate) fn builtin(&mut self, e: &IrExpr, builtin: Builtin, args: &[IrExpr]) -> String {
        use Builtin::*;
        match builtin {
            Print => {
                let mut fmt = Vec::new();
                let mut texts = Vec::new();
                for arg in args {
                    let (slot, text) = self.format_arg(arg);
                    fmt.push(slot);
                    texts.push(text);
                }
                let fmt_string = fmt.join(" ");
                if texts.is_empty() {
                    format!("println!({:?})", fmt_string)
                } else {
                    format!("println!({:?}, {})", fmt_string, texts.join(", "))
                }
            }
            Len => {
                let arg = &args[0];
                match &arg.ty {
                    Type::Str => {
                        let t = self.expr_owned(arg);
                        format!("(({}).chars().count() as i64)", t)
                    }
                    Type::Any => {
                        self.uses_value = true;
                        let t = self.expr_owned(arg);
                        format!("({}).len_bridge()?", t)
                    }
                    _ => {
                        let t = self.place_or_owned(arg);
                        format!("({}.len() as i64)", t)
                    }
                }
            }
            ListCtor => {
                if args.is_empty() {
                    self.note_type_uses(&e.ty);
                    return format!("Vec::<{}>::new()", rust_type(&e.ty.element()));
                }
                let arg = &args[0];
                match &arg.ty {
                    Type::Any => {
                        self.uses_value = true;
                        let t = self.expr_owned(arg);
                        format!("({}).to_list()?", t)
                    }
                    Type::Dict(..) => {
                        self.uses_ops = true;
                        let t = self.place_or_owned(arg);
                        format!("ops::dict_keys(&{})", t)
                    }
                    Type::Set(_) => {
                        self.uses_ops = true;
                        let t = self.place_or_owned(arg);
                        format!("ops::set_items(&{})", t)
                    }
                    Type::Str => {
                        let t = self.expr_owned(arg);
                        format!(
                            "({}).chars().map(|__c| __c.to_string()).collect::<Vec<String>>()",
                            t
                        )
                    }
                    _ => self.expr_owned(arg),
                }
            }
            DictCtor => {
                self.uses_hashmap = true;
                if args.is_empty() {
                    let (k, v) = match &e.ty {
                        Type::Dict(k, v) => (rust_type(k), rust_type(v)),
                        _ => ("String".into(), "String".into()),
                    };
                    return format!("HashMap::<{}, {}>::new()", k, v);
                }
                let arg = &args[0];
                let t = self.expr_owned(arg);
                match &arg.ty {
                    // `dict(pairs)` from a list of key/value tuples.
                    Type::List(_) => {
                        format!("({}).into_iter().collect::<HashMap<_, _>>()", t)
                    }
                    _ => t,
                }
            }
            SetCtor => {
                self.uses_hashset = true;
                if args.is_empty() {
                    format!("HashSet::<{}>::new()", rust_type(&e.ty.element()))
                } else {
                    let t = self.expr_owned(&args[0]);
                    format!("({}).into_iter().collect::<HashSet<_>>()", t)
                }
            }
            TupleCtor => {
                // `tuple(iterable)` materializes; tuples of dynamic length
                // live as vectors.
                let t = self.expr_owned(&args[0]);
                t
            }
            Str => {
                let arg = &args[0];
                let (slot, text) = self.format_arg(arg);
                if slot == "{}" && matches!(arg.ty, Type::Str) {
                    text
                } else {
                    format!("format!(\"{}\", {})", slot, text)
                }
            }
            Int => {
                let arg = &args[0];
                let t = self.expr_owned(arg);
                match &arg.ty {
                    Type::Str => {
                        self.uses_ops = true;
                        format!("ops::parse_int(&{})?", t)
                    }
                    Type::Any => {
                        self.uses_value = true;
                        format!("({}).to_int()?", t)
                    }
                    Type::Float => format!("(({}) as i64)", t),
                    Type::Bool => format!("(({}) as i64)", t),
                    _ => t,
                }
            }
            Float => {
                let arg = &args[0];
                let t = self.expr_owned(arg);
                match &arg.ty {
                    Type::Str => {
                        self.uses_ops = true;
                        format!("ops::parse_float(&{})?", t)
                    }
                    Type::Any => {
                        self.uses_value = true;
                        format!("({}).to_float()?", t)
                    }
                    Type::Int => format!("(({}) as f64)", t),
                    Type::Bool => format!("(({}) as i64 as f64)", t),
                    _ => t,
                }
            }
            Bool => {
                let cond = self.truthy(&args[0]);
                format!("({})", cond)
            }
            Abs => {
                let t = self.expr_owned(&args[0]);
                format!("({}).abs()", t)
            }
            Min | Max => self.min_max(e, builtin == Min, args),
            Round => {
                let t = self.expr_owned(&args[0]);
                let t = self.coerce(t, &args[0].ty, &Type::Float);
                match args.get(1) {
                    None => format!("(({}).round() as i64)", t),
                    Some(digits) => {
                        self.uses_ops = true;
                        let d = self.expr_owned(digits);
                        format!("ops::round_to({}, {})", t, d)
                    }
                }
            }
            Chr => {
                self.uses_ops = true;
                let t = self.expr_owned(&args[0]);
                format!("ops::chr({})", t)
            }
            Ord => {
                self.uses_ops = true;
                let t = self.expr_owned(&args[0]);
                format!("ops::ord(&{})", t)
            }
            Bin => {
                self.uses_ops = true;
                let t = self.expr_owned(&args[0]);
                format!("ops::bin({})", t)
            }
            Hex => {
                self.uses_ops = true;
                let t = self.expr_owned(&args[0]);
                format!("ops::hex({})", t)
            }
            Oct => {
                self.uses_ops = true;
                let t = self.expr_owned(&args[0]);
                format!("ops::oct({})", t)
            }
            Sum => {
                let arg = &args[0];
                let t = self.expr_owned(arg);
                match arg.ty.element() {
                    Type::Float => format!("({}).into_iter().sum::<f64>()", t),
                    _ => format!("({}).into_iter().sum::<i64>()", t),
                }
            }
            Sorted => {
                let arg = &args[0];
                let t = self.expr_owned(arg);
                match arg.ty.element() {
                    Type::Float => format!(
                        "{{ let mut __v = {}; __v.sort_by(|a, b| a.partial_cmp(b).unwrap()); __v }}",
                        t
                    ),
                    _ => format!("{{ let mut __v = {}; __v.sort(); __v }}", t),
                }
            }
            Enumerate => {
                let t = self.expr_owned(&args[0]);
                format!(
                    "({}).into_iter().enumerate().map(|(__i, __v)| (__i as i64, __v)).collect::<Vec<_>>()",
                    t
                )
            }
            Zip => {
                let a = self.expr_owned(&args[0]);
                let b = self.expr_owned(&args[1]);
                format!(
                    "({}).into_iter().zip(({}).into_iter()).collect::<Vec<_>>()",
                    a, b
                )
            }
            Input => {
                self.uses_ops = true;
                match args.first() {
                    Some(prompt) => {
                        let t = self.expr_owned(prompt);
                        format!("ops::input(Some(&{}))", t)
                    }
                    None => "ops::input(None)".to_string(),
                }
            }
            IsInstance => self.isinstance(args),
        }
    }

    fn min_max(&mut self, e: &IrExpr, is_min: bool, args: &[IrExpr]) -> String {
        let name = if is_min { "min" } else { "max" };
        if args.len() == 2 {
            let l = self.expr_owned(&args[0]);
            let r = self.expr_owned(&args[1]);
            if matches!(e.ty, Type::Float) {
                let l = self.coerce(l, &args[0].ty, &Type::Float);
                let r = self.coerce(r, &args[1].ty, &Type::Float);
                return format!("({}).{}({})", l, name, r);
            }
            return format!("std::cmp::{}({}, {})", name, l, r);
        }
        let t = self.expr_owned(&args[0]);
        match args[0].ty.element() {
            Type::Float => {
                self.uses_ops = true;
                format!("ops::f{}_list(&{})", name, t)
            }
            _ => format!(
                "({}).into_iter().{}().expect(\"{} of empty sequence\")",
                t, name, name
            ),
        }
    }

    fn isinstance(&mut self, args: &[IrExpr]) -> String {
        let [value, class_expr] = args else {
            return "false".to_string();
        };
        let IrExprKind::Name { name: class_name, .. } = &class_expr.kind else {
            return "false".to_string();
        };
        match &value.ty {
            Type::Any => {
                let t = self.expr_owned(value);
                format!("({}).isinstance({:?})", t, class_name)
            }
            other => {
                // Statically decidable.
                let matches = match (other, class_name.as_str()) {
                    (Type::Int, "int")
                    | (Type::Float, "float")
                    | (Type::Str, "str")
                    | (Type::Bool, "bool") => true,
                    (Type::Struct(s), c) => s == c,
                    _ => false,
                };
                format!("{}", matches)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn call(
        &mut self,
        e: &IrExpr,
        name: &str,
        _binding: Option<u32>,
        args: &[IrExpr],
        kwargs: &[(String, IrExpr)],
        resolution: &CallResolution,
    ) -> String {
        match resolution {
            CallResolution::UserFunction => {
                let sig = self.analysis.functions.get(name).cloned();
                let callee = self.module.functions.iter().find(|f| f.name == name);
                let arg_texts = match (sig, callee) {
                    (Some(sig), Some(callee)) => {
                        let params: Vec<_> = callee.params.iter().collect();
                        self.ordered_args(&sig, &params, args, kwargs)
                    }
                    _ => args.iter().map(|a| self.expr_owned(a)).collect(),
                };
                let call = format!("{}({})", rust_name(name), arg_texts.join(", "));
                self.maybe_question(call, e)
            }
            CallResolution::Constructor => {
                let class = self.module.classes.iter().find(|c| c.name == *name);
                let arg_texts = match class {
                    Some(class) => self.constructor_args(class, args, kwargs),
                    None => args.iter().map(|a| self.expr_owned(a)).collect(),
                };
                let call = format!("{}::new({})", rust_name(name), arg_texts.join(", "));
                self.maybe_question(call, e)
            }
            CallResolution::External(path) => {
                self.uses_bridge = true;
                self.uses_value = true;
                let arg_texts: Vec<String> = args
                    .iter()
                    .map(|a| {
                        let t = self.expr_owned(a);
                        self.coerce(t, &a.ty, &Type::Any)
                    })
                    .collect();
                let kwarg_texts: Vec<String> = kwargs
                    .iter()
                    .map(|(k, v)| {
                        let t = self.expr_owned(v);
                        let t = self.coerce(t, &v.ty, &Type::Any);
                        format!("({:?}.to_string(), {})", k, t)
                    })
                    .collect();
                format!(
                    "bridge::call_function({:?}, vec![{}], vec![{}])?",
                    path,
                    arg_texts.join(", "),
                    kwarg_texts.join(", ")
                )
            }
            CallResolution::CallableValue => {
                let arg_texts: Vec<String> =
                    args.iter().map(|a| self.expr_owned(a)).collect();
                format!("{}({})", rust_name(name), arg_texts.join(", "))
            }
            CallResolution::Unresolved => {
                // Inference already reported it.
                "Default::default()".to_string()
            }
        }
    }

    /// Positional argument list for a signature: positional args, then
    /// keyword args matched by name, then defaults.
    fn ordered_args(
        &mut self,
        sig: &FnSig,
        params: &[&IrParam],
        args: &[IrExpr],
        kwargs: &[(String, IrExpr)],
    ) -> Vec<String> {
        let mut out = Vec::new();
        let mut positional = args.iter();
        let plain: Vec<&&IrParam> = params.iter().filter(|p| !p.is_self && !p.starred).collect();

        for param in &plain {
            let binding_mutated = param
                .binding
                .map(|b| self.analysis.scopes.binding(b).mutated)
                .unwrap_or(false);
            let mode = param_mode(&param.ty, binding_mutated);
            if let Some(arg) = positional.next() {
                out.push(self.arg_text(arg, &param.ty, mode));
                continue;
            }
            if let Some((_, value)) = kwargs.iter().find(|(k, _)| k == &param.name) {
                out.push(self.arg_text(value, &param.ty, mode));
                continue;
            }
            if let Some(default) = &param.default {
                self.check_infallible_default(default);
                let text = self.expr_owned(default);
                let text = self.coerce(text, &default.ty, &param.ty);
                out.push(wrap_mode(text, mode));
                continue;
            }
            // Arity was checked during analysis.
            out.push("Default::default()".to_string());
        }

        if sig.variadic {
            let rest: Vec<String> = positional.map(|a| self.expr_owned(a)).collect();
            out.push(format!("vec![{}]", rest.join(", ")));
        }
        out
    }

    fn constructor_args(
        &mut self,
        class: &IrClass,
        args: &[IrExpr],
        kwargs: &[(String, IrExpr)],
    ) -> Vec<String> {
        if let Some(init) = class.methods.iter().find(|m| m.name == "__init__") {
            let sig = self
                .analysis
                .method_sig(&class.name, "__init__")
                .map(|(_, s)| s)
                .unwrap_or(FnSig {
                    params: Vec::new(),
                    defaults: 0,
                    variadic: false,
                    ret: Type::Unit,
                    mutates_self: false,
                });
            let params: Vec<_> = init.params.iter().collect();
            return self.ordered_args(&sig, &params, args, kwargs);
        }
        // Dataclass: field order, kwargs allowed.
        let mut out = Vec::new();
        let mut positional = args.iter();
        for field in &class.fields {
            if let Some(arg) = positional.next() {
                let t = self.expr_owned(arg);
                out.push(self.coerce(t, &arg.ty, &field.ty));
                continue;
            }
            if let Some((_, value)) = kwargs.iter().find(|(k, _)| k == &field.name) {
                let t = self.expr_owned(value);
                out.push(self.coerce(t, &value.ty, &field.ty));
                continue;
            }
            if let Some(default) = &field.default {
                self.check_infallible_default(default);
                out.push(self.expr_owned(default));
                continue;
            }
            out.push("Default::default()".to_string());
        }
        out
    }

    /// Argument text adjusted to the parameter's passing mode.
    fn arg_text(&mut self, arg: &IrExpr, want: &Type, mode: PassMode) -> String {
        match mode {
            PassMode::RefStr => {
                if let IrExprKind::Literal(Lit::Str(s)) = &arg.kind {
                    return format!("{:?}", s);
                }
                let t = self.expr_owned(arg);
                let t = self.coerce(t, &arg.ty, want);
                format!("&({})", t)
            }
            PassMode::Ref => match &arg.kind {
                IrExprKind::Name { .. } | IrExprKind::Attribute { .. } => {
                    let place = self.place_text(arg);
                    format!("&{}", place)
                }
                _ => {
                    let t = self.expr_owned(arg);
                    let t = self.coerce(t, &arg.ty, want);
                    format!("&({})", t)
                }
            },
            PassMode::RefMut => {
                let place = self.place_text(arg);
                format!("&mut {}", place)
            }
            PassMode::ImplFn | PassMode::Value => {
                let t = self.expr_owned(arg);
                self.coerce(t, &arg.ty, want)
            }
        }
    }

    pub(crate) fn maybe_question(&mut self, call: String, e: &IrExpr) -> String {
        if e.may_raise {
            self.uses_error = true;
            format!("{}?", call)
        } else {
            call
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn method_call(
        &mut self,
        e: &IrExpr,
        recv: &IrExpr,
        method: &str,
        args: &[IrExpr],
        kwargs: &[(String, IrExpr)],
        resolution: &MethodResolution,
    ) -> String {
        match resolution {
            MethodResolution::MathModule => self.math_call(method, args),
            MethodResolution::StrMethod => self.str_method(recv, method, args),
            MethodResolution::ListMethod => self.list_method(e, recv, method, args),
            MethodResolution::DictMethod => self.dict_method(recv, method, args),
            MethodResolution::SetMethod => self.set_method(recv, method, args),
            MethodResolution::UserMethod(owner) => {
                let owner = owner.clone();
                let place = self.place_text(recv);
                let path = match &recv.ty {
                    Type::Struct(class) => self.base_path(class, &owner),
                    _ => String::new(),
                };
                let sig = self.analysis.method_sig(&owner, method).map(|(_, s)| s);
                let callee = self
                    .module
                    .classes
                    .iter()
                    .find(|c| c.name == owner)
                    .and_then(|c| c.methods.iter().find(|m| m.name == *method));
                let arg_texts = match (sig, callee) {
                    (Some(sig), Some(callee)) => {
                        let params: Vec<_> = callee.params.iter().collect();
                        self.ordered_args(&sig, &params, args, kwargs)
                    }
                    _ => args.iter().map(|a| self.expr_owned(a)).collect(),
                };
                let call = format!(
                    "{}{}.{}({})",
                    place,
                    path,
                    rust_name(method),
                    arg_texts.join(", ")
                );
                self.maybe_question(call, e)
            }
            MethodResolution::CallableField(owner) => {
                let owner = owner.clone();
                let place = self.place_text(recv);
                let path = match &recv.ty {
                    Type::Struct(class) => self.base_path(class, &owner),
                    _ => String::new(),
                };
                let arg_texts: Vec<String> =
                    args.iter().map(|a| self.expr_owned(a)).collect();
                format!(
                    "({}{}.{})({})",
                    place,
                    path,
                    rust_name(method),
                    arg_texts.join(", ")
                )
            }
            MethodResolution::Bridge => {
                self.uses_value = true;
                let r = self.expr_owned(recv);
                let r = self.coerce(r, &recv.ty, &Type::Any);
                let arg_texts: Vec<String> = args
                    .iter()
                    .map(|a| {
                        let t = self.expr_owned(a);
                        self.coerce(t, &a.ty, &Type::Any)
                    })
                    .collect();
                let kwarg_texts: Vec<String> = kwargs
                    .iter()
                    .map(|(k, v)| {
                        let t = self.expr_owned(v);
                        let t = self.coerce(t, &v.ty, &Type::Any);
                        format!("({:?}.to_string(), {})", k, t)
                    })
                    .collect();
                format!(
                    "({}).call_method({:?}, vec![{}], vec![{}])?",
                    r,
                    method,
                    arg_texts.join(", "),
                    kwarg_texts.join(", ")
                )
            }
            MethodResolution::Unresolved => "Default::default()".to_string(),
        }
    }

    fn math_call(&mut self, method: &str, args: &[IrExpr]) -> String {
        let arg = |cx: &mut Self, i: usize| -> String {
            let a = &args[i];
            let t = cx.expr_owned(a);
            cx.coerce(t, &a.ty, &Type::Float)
        };
        match method {
            "sqrt" => format!("({}).sqrt()", arg(self, 0)),
            "floor" => format!("(({}).floor() as i64)", arg(self, 0)),
            "ceil" => format!("(({}).ceil() as i64)", arg(self, 0)),
            "pow" => format!("({}).powf({})", arg(self, 0), arg(self, 1)),
            "log" => format!("({}).ln()", arg(self, 0)),
            "log2" => format!("({}).log2()", arg(self, 0)),
            "log10" => format!("({}).log10()", arg(self, 0)),
            "sin" => format!("({}).sin()", arg(self, 0)),
            "cos" => format!("({}).cos()", arg(self, 0)),
            "tan" => format!("({}).tan()", arg(self, 0)),
            "fabs" => format!("({}).abs()", arg(self, 0)),
            "exp" => format!("({}).exp()", arg(self, 0)),
            other => {
                self.gen_error(
                    Code::UnresolvedName,
                    format!("`math.{}` has no native lowering", other),
                    args.first().map(|a| a.span).unwrap_or_default(),
                );
                "0.0".to_string()
            }
        }
    }

    fn str_method(&mut self, recv: &IrExpr, method: &str, args: &[IrExpr]) -> String {
        let r = self.place_or_owned(recv);
        let arg = |cx: &mut Self, i: usize| cx.expr_owned(&args[i]);
        match method {
            "upper" => format!("{}.to_uppercase()", r),
            "lower" => format!("{}.to_lowercase()", r),
            "strip" => format!("{}.trim().to_string()", r),
            "lstrip" => format!("{}.trim_start().to_string()", r),
            "rstrip" => format!("{}.trim_end().to_string()", r),
            "replace" => {
                let a = arg(self, 0);
                let b = arg(self, 1);
                format!("{}.replace(({}).as_str(), ({}).as_str())", r, a, b)
            }
            "split" => match args.first() {
                Some(_) => {
                    let sep = arg(self, 0);
                    format!(
                        "{}.split(({}).as_str()).map(|__s| __s.to_string()).collect::<Vec<String>>()",
                        r, sep
                    )
                }
                None => format!(
                    "{}.split_whitespace().map(|__s| __s.to_string()).collect::<Vec<String>>()",
                    r
                ),
            },
            "join" => {
                let xs = arg(self, 0);
                format!("({}).join({}.as_str())", xs, r)
            }
            "startswith" => {
                let p = arg(self, 0);
                format!("{}.starts_with(({}).as_str())", r, p)
            }
            "endswith" => {
                let p = arg(self, 0);
                format!("{}.ends_with(({}).as_str())", r, p)
            }
            "find" => {
                self.uses_ops = true;
                let p = arg(self, 0);
                format!("ops::str_find(&{}, &{})", r, p)
            }
            "rfind" => {
                self.uses_ops = true;
                let p = arg(self, 0);
                format!("ops::str_rfind(&{}, &{})", r, p)
            }
            "count" => {
                self.uses_ops = true;
                let p = arg(self, 0);
                format!("ops::str_count(&{}, &{})", r, p)
            }
            "isdigit" => format!(
                "(!{}.is_empty() && {}.chars().all(|__c| __c.is_ascii_digit()))",
                r, r
            ),
            "isalpha" => format!(
                "(!{}.is_empty() && {}.chars().all(|__c| __c.is_alphabetic()))",
                r, r
            ),
            "isalnum" => format!(
                "(!{}.is_empty() && {}.chars().all(|__c| __c.is_alphanumeric()))",
                r, r
            ),
            "isupper" => format!(
                "({}.chars().any(|__c| __c.is_alphabetic()) && !{}.chars().any(|__c| __c.is_lowercase()))",
                r, r
            ),
            "islower" => format!(
                "({}.chars().any(|__c| __c.is_alphabetic()) && !{}.chars().any(|__c| __c.is_uppercase()))",
                r, r
            ),
            "zfill" => {
                self.uses_ops = true;
                let n = arg(self, 0);
                format!("ops::zfill(&{}, {})", r, n)
            }
            "ljust" => {
                self.uses_ops = true;
                let n = arg(self, 0);
                format!("ops::ljust(&{}, {})", r, n)
            }
            "rjust" => {
                self.uses_ops = true;
                let n = arg(self, 0);
                format!("ops::rjust(&{}, {})", r, n)
            }
            "center" => {
                self.uses_ops = true;
                let n = arg(self, 0);
                format!("ops::center(&{}, {})", r, n)
            }
            other => {
                self.gen_error(
                    Code::UnresolvedName,
                    format!("string method `{}` has no native lowering", other),
                    recv.span,
                );
                "String::new()".to_string()
            }
        }
    }

    fn list_method(&mut self, e: &IrExpr, recv: &IrExpr, method: &str, args: &[IrExpr]) -> String {
        let r = self.place_text(recv);
        let elem = recv.ty.element();
        match method {
            "append" => {
                let v = self.expr_owned(&args[0]);
                let v = self.coerce(v, &args[0].ty, &elem);
                format!("{}.push({})", r, v)
            }
            "pop" => match args.first() {
                None => {
                    self.uses_ops = true;
                    format!("ops::list_pop(&mut {})?", r)
                }
                Some(i) => {
                    self.uses_ops = true;
                    let idx = self.expr_owned(i);
                    format!("ops::list_pop_at(&mut {}, {})?", r, idx)
                }
            },
            "insert" => {
                let i = self.expr_owned(&args[0]);
                let v = self.expr_owned(&args[1]);
                format!("{}.insert(({}) as usize, {})", r, i, v)
            }
            "remove" => {
                self.uses_ops = true;
                let v = self.expr_owned(&args[0]);
                format!("ops::list_remove(&mut {}, &{})?", r, v)
            }
            "index" => {
                self.uses_ops = true;
                let v = self.expr_owned(&args[0]);
                format!("ops::list_index(&{}, &{})?", r, v)
            }
            "count" => {
                self.uses_ops = true;
                let v = self.expr_owned(&args[0]);
                format!("ops::list_count(&{}, &{})", r, v)
            }
            "extend" => {
                let v = self.expr_owned(&args[0]);
                format!("{}.extend({})", r, v)
            }
            "reverse" => format!("{}.reverse()", r),
            "sort" => match elem {
                Type::Float => format!(
                    "{}.sort_by(|__a, __b| __a.partial_cmp(__b).unwrap())",
                    r
                ),
                _ => format!("{}.sort()", r),
            },
            "clear" => format!("{}.clear()", r),
            "copy" => format!("{}.clone()", r),
            other => {
                self.gen_error(
                    Code::UnresolvedName,
                    format!("list method `{}` has no native lowering", other),
                    e.span,
                );
                "Default::default()".to_string()
            }
        }
    }

    fn dict_method(&mut self, recv: &IrExpr, method: &str, args: &[IrExpr]) -> String {
        let r = self.place_or_owned(recv);
        match method {
            "get" => {
                let k = self.expr_owned(&args[0]);
                match args.get(1) {
                    None => format!("{}.get(&{}).cloned()", r, k),
                    Some(default) => {
                        let d = self.expr_owned(default);
                        format!("{}.get(&{}).cloned().unwrap_or({})", r, k, d)
                    }
                }
            }
            "keys" => {
                self.uses_ops = true;
                format!("ops::dict_keys(&{})", r)
            }
            "values" => {
                self.uses_ops = true;
                format!("ops::dict_values(&{})", r)
            }
            "items" => {
                self.uses_ops = true;
                format!("ops::dict_items(&{})", r)
            }
            other => {
                self.gen_error(
                    Code::UnresolvedName,
                    format!("dict method `{}` has no native lowering", other),
                    recv.span,
                );
                "Default::default()".to_string()
            }
        }
    }

    fn set_method(&mut self, recv: &IrExpr, method: &str, args: &[IrExpr]) -> String {
        let r = self.place_text(recv);
        match method {
            "add" => {
                let v = self.expr_owned(&args[0]);
                format!("{}.insert({})", r, v)
            }
            "remove" => {
                self.uses_ops = true;
                let v = self.expr_owned(&args[0]);
                format!("ops::set_remove(&mut {}, &{})?", r, v)
            }
            "discard" => {
                let v = self.expr_owned(&args[0]);
                format!("{}.remove(&{})", r, v)
            }
            "clear" => format!("{}.clear()", r),
            other => {
                self.gen_error(
                    Code::UnresolvedName,
                    format!("set method `{}` has no native lowering", other),
                    recv.span,
                );
                "Default::default()".to_string()
            }
        }
    }

}

fn wrap_mode(text: String, mode: PassMode) -> String {
    match mode {
        PassMode::RefStr | PassMode::Ref => format!("&({})", text),
        PassMode::RefMut => format!("&mut ({})", text),
        _ => text,
    }
}
