//! Expression emission.
//!
//! Every emitter returns the text of an expression that evaluates to an
//! OWNED value of the expression's resolved type. Receivers and lvalues
//! go through [`CodeGen::place_text`] instead, which never clones.
//! Multi-step lowerings (comprehensions, chained comparisons) emit
//! single-line block expressions.

use super::types::{is_copy, rust_type};
use super::{rust_name, CodeGen};
use crate::analyze::scope::BindingKind;
use crate::analyze::types::Type;
use crate::ast::{BinOp, BoolOp, CmpOp, UnaryOp};
use crate::diagnostics::Code;
use crate::ir::*;

impl CodeGen<'_> {
    pub(crate) fn expr_owned(&mut self, e: &IrExpr) -> String {
        match &e.kind {
            IrExprKind::Literal(lit) => self.literal(lit, &e.ty),
            IrExprKind::FString(parts) => self.fstring(parts),
            IrExprKind::Name { name, binding } => self.name_read(name, *binding, &e.ty),
            IrExprKind::Tuple(items) => {
                let texts: Vec<String> =
                    items.iter().map(|i| self.expr_owned(i)).collect();
                format!("({})", texts.join(", "))
            }
            IrExprKind::List(items) => {
                let elem = e.ty.element();
                let texts: Vec<String> = items
                    .iter()
                    .map(|i| {
                        let t = self.expr_owned(i);
                        self.coerce(t, &i.ty, &elem)
                    })
                    .collect();
                if texts.is_empty() {
                    self.note_type_uses(&e.ty);
                    format!("Vec::<{}>::new()", rust_type(&elem))
                } else {
                    format!("vec![{}]", texts.join(", "))
                }
            }
            IrExprKind::Set(items) => {
                self.uses_hashset = true;
                let elem = e.ty.element();
                let texts: Vec<String> = items
                    .iter()
                    .map(|i| {
                        let t = self.expr_owned(i);
                        self.coerce(t, &i.ty, &elem)
                    })
                    .collect();
                format!(
                    "HashSet::from([{}])",
                    texts.join(", ")
                )
            }
            IrExprKind::Dict { keys, values } => {
                self.uses_hashmap = true;
                let (kt, vt) = match &e.ty {
                    Type::Dict(k, v) => ((**k).clone(), (**v).clone()),
                    _ => (Type::Any, Type::Any),
                };
                let mut pairs = Vec::new();
                for (k, v) in keys.iter().zip(values) {
                    let kx = self.expr_owned(k);
                    let kx = self.coerce(kx, &k.ty, &kt);
                    let vx = self.expr_owned(v);
                    let vx = self.coerce(vx, &v.ty, &vt);
                    pairs.push(format!("({}, {})", kx, vx));
                }
                if pairs.is_empty() {
                    format!(
                        "HashMap::<{}, {}>::new()",
                        rust_type(&kt),
                        rust_type(&vt)
                    )
                } else {
                    format!("HashMap::from([{}])", pairs.join(", "))
                }
            }
            IrExprKind::Binary { op, left, right } => self.binary(e, *op, left, right),
            IrExprKind::Unary { op, operand } => self.unary(*op, operand),
            IrExprKind::BoolChain { op, values } => self.bool_chain(*op, values),
            IrExprKind::Compare {
                left,
                ops,
                comparators,
            } => self.compare(left, ops, comparators),
            IrExprKind::Range { start, stop, step } => {
                // As a value (outside a `for` header) a range materializes.
                let header = self.range_iter_text(start.as_deref(), stop, step.as_deref());
                format!("({}).collect::<Vec<i64>>()", header)
            }
            IrExprKind::Builtin { builtin, args } => self.builtin(e, *builtin, args),
            IrExprKind::Call {
                name,
                binding,
                args,
                kwargs,
                resolution,
            } => self.call(e, name, *binding, args, kwargs, resolution),
            IrExprKind::MethodCall {
                recv,
                method,
                args,
                kwargs,
                resolution,
            } => self.method_call(e, recv, method, args, kwargs, resolution),
            IrExprKind::CallValue { callee, args } => {
                let callee_text = self.place_text(callee);
                let arg_texts: Vec<String> =
                    args.iter().map(|a| self.expr_owned(a)).collect();
                format!("({})({})", callee_text, arg_texts.join(", "))
            }
            IrExprKind::Super => "self.base".to_string(),
            IrExprKind::Attribute { value, attr } => self.attribute(e, value, attr),
            IrExprKind::Index { value, index } => self.index(e, value, index),
            IrExprKind::SliceExpr {
                value,
                lower,
                upper,
                step,
            } => self.slice(e, value, lower.as_deref(), upper.as_deref(), step.as_deref()),
            IrExprKind::IfExp { test, body, orelse } => {
                let cond = self.truthy(test);
                let then_text = self.expr_owned(body);
                let then_text = self.coerce(then_text, &body.ty, &e.ty);
                let else_text = self.expr_owned(orelse);
                let else_text = self.coerce(else_text, &orelse.ty, &e.ty);
                format!("if {} {{ {} }} else {{ {} }}", cond, then_text, else_text)
            }
            IrExprKind::Lambda { params, body, .. } => {
                // A closure has nowhere to propagate an error to.
                if expr_can_raise(body) {
                    self.gen_error(
                        Code::UnsupportedSyntax,
                        "lambda bodies cannot contain operations that raise",
                        body.span,
                    );
                }
                let names: Vec<String> = params
                    .iter()
                    .map(|p| rust_name(&p.name))
                    .collect();
                for p in params {
                    if let Some(b) = p.binding {
                        self.declared.insert(b);
                    }
                }
                let body_text = self.expr_owned(body);
                format!("move |{}| {}", names.join(", "), body_text)
            }
            IrExprKind::ListComp(comp) | IrExprKind::GeneratorExp(comp) => {
                self.comprehension(comp, CompKind::List, &e.ty)
            }
            IrExprKind::SetComp(comp) => self.comprehension(comp, CompKind::Set, &e.ty),
            IrExprKind::DictComp {
                key,
                value,
                generators,
                ..
            } => self.dict_comprehension(key, value, generators, &e.ty),
            IrExprKind::Elided => {
                // Already diagnosed; keep the output well-formed.
                "Default::default()".to_string()
            }
        }
    }

    fn literal(&mut self, lit: &Lit, ty: &Type) -> String {
        match lit {
            Lit::Int(v) => format!("{}", v),
            Lit::Float(v) => format!("{:?}", v),
            Lit::Str(s) => format!("{:?}.to_string()", s),
            Lit::Bool(b) => format!("{}", b),
            Lit::None => match ty {
                Type::Option(_) => "None".to_string(),
                Type::Any => {
                    self.uses_value = true;
                    "Value::None".to_string()
                }
                _ => "()".to_string(),
            },
        }
    }

    /// A name read, applying the unwrap/conversion rules:
    /// - hoisted-without-default bindings live as `Option` and unwrap;
    /// - `Optional` bindings narrowed to their inner type unwrap;
    /// - `Any` bindings narrowed to a primitive convert;
    /// - anything non-`Copy` clones.
    fn name_read(&mut self, name: &str, binding: Option<u32>, expr_ty: &Type) -> String {
        let Some(b) = binding else {
            return rust_name(name);
        };
        let info = self.analysis.scopes.binding(b);
        let text = if info.kind == BindingKind::SelfParam {
            "self".to_string()
        } else {
            rust_name(name)
        };
        if info.hoisted_optional {
            return format!("{}.clone().unwrap()", text);
        }
        if let Type::Option(inner) = &info.ty {
            if expr_ty == &**inner {
                return format!("{}.clone().unwrap()", text);
            }
        }
        if matches!(info.ty, Type::Any) && !matches!(expr_ty, Type::Any) {
            self.uses_value = true;
            return match expr_ty {
                Type::Int => format!("{}.as_int()", text),
                Type::Float => format!("{}.as_float()", text),
                Type::Bool => format!("{}.as_bool()", text),
                Type::Str => format!("{}.as_str_lossy()", text),
                _ => format!("{}.clone()", text),
            };
        }
        if matches!(info.ty, Type::Callable { .. })
            && matches!(info.kind, BindingKind::Function | BindingKind::Param)
        {
            // Function items and `impl Fn` parameters move as values.
            return text;
        }
        if is_copy(expr_ty) {
            text
        } else {
            format!("{}.clone()", text)
        }
    }

    /// Lvalue/receiver text: never clones.
    pub(crate) fn place_text(&mut self, e: &IrExpr) -> String {
        match &e.kind {
            IrExprKind::Name { name, binding } => {
                match binding.map(|b| self.analysis.scopes.binding(b)) {
                    Some(info) if info.kind == BindingKind::SelfParam => "self".to_string(),
                    _ => rust_name(name),
                }
            }
            IrExprKind::Super => "self.base".to_string(),
            IrExprKind::Attribute { value, attr } => {
                let base = self.place_text(value);
                if let Type::Struct(class) = &value.ty {
                    if let Some((owner, _)) = field_owner(self, class, attr) {
                        let path = self.base_path(class, &owner);
                        return format!("{}{}.{}", base, path, rust_name(attr));
                    }
                }
                format!("{}.{}", base, rust_name(attr))
            }
            IrExprKind::Index { value, index } => {
                let base = self.place_text(value);
                let idx = self.expr_owned(index);
                match &value.ty {
                    Type::List(_) => {
                        self.uses_ops = true;
                        format!("{}[ops::norm_index({}, {}.len())?]", base, idx, base)
                    }
                    _ => format!("{}[{}]", base, idx),
                }
            }
            _ => self.expr_owned(e),
        }
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    fn binary(&mut self, e: &IrExpr, op: BinOp, left: &IrExpr, right: &IrExpr) -> String {
        if e.bridge_required {
            self.uses_value = true;
            let l = self.expr_owned(left);
            let l = self.coerce(l, &left.ty, &Type::Any);
            let r = self.expr_owned(right);
            let r = self.coerce(r, &right.ty, &Type::Any);
            let method = match op {
                BinOp::Add => "add_value",
                BinOp::Sub => "sub_value",
                BinOp::Mul => "mul_value",
                BinOp::Div => "div_value",
                BinOp::FloorDiv => "floordiv_value",
                BinOp::Mod => "mod_value",
                BinOp::Pow => "pow_value",
                BinOp::MatMul => "matmul_value",
                BinOp::Shl | BinOp::Shr | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                    self.gen_error(
                        Code::UnsupportedSyntax,
                        "bit operations are not supported on bridge values",
                        e.span,
                    );
                    return "Value::None".to_string();
                }
            };
            return format!("({}).{}(&{})?", l, method, r);
        }

        let lt = &left.ty;
        let rt = &right.ty;
        let l = self.expr_owned(left);
        let r = self.expr_owned(right);

        match op {
            BinOp::Add => match (lt, rt) {
                (Type::Str, Type::Str) => format!("format!(\"{{}}{{}}\", {}, {})", l, r),
                (Type::List(_), Type::List(_)) => {
                    format!("{{ let mut __v = {}; __v.extend({}); __v }}", l, r)
                }
                _ => self.numeric_binary("+", left, right),
            },
            BinOp::Sub => self.numeric_binary("-", left, right),
            BinOp::Mul => match (lt, rt) {
                (Type::Str, Type::Int) => format!("({}).repeat(({}) as usize)", l, r),
                (Type::Int, Type::Str) => format!("({}).repeat(({}) as usize)", r, l),
                (Type::List(_), Type::Int) => {
                    self.uses_ops = true;
                    format!("ops::repeat_list(&{}, {})", l, r)
                }
                _ => self.numeric_binary("*", left, right),
            },
            BinOp::Div => {
                let l = self.coerce(l, lt, &Type::Float);
                let r = self.coerce(r, rt, &Type::Float);
                format!("({} / {})", l, r)
            }
            BinOp::FloorDiv => {
                if matches!(lt, Type::Float) || matches!(rt, Type::Float) {
                    let l = self.coerce(l, lt, &Type::Float);
                    let r = self.coerce(r, rt, &Type::Float);
                    format!("(({} / {}).floor())", l, r)
                } else {
                    format!("({}).div_euclid({})", l, r)
                }
            }
            BinOp::Mod => match lt {
                Type::Str => {
                    self.gen_error(
                        Code::UnsupportedSyntax,
                        "`%` string formatting is not supported; use an f-string",
                        e.span,
                    );
                    "String::new()".to_string()
                }
                _ => format!("({}).rem_euclid({})", l, r),
            },
            BinOp::Pow => {
                if matches!(lt, Type::Float) || matches!(rt, Type::Float) {
                    let l = self.coerce(l, lt, &Type::Float);
                    let r = self.coerce(r, rt, &Type::Float);
                    format!("({}).powf({})", l, r)
                } else {
                    self.uses_ops = true;
                    format!("ops::ipow({}, {})", l, r)
                }
            }
            BinOp::MatMul => {
                // Inference already rejected native matmul.
                "Value::None".to_string()
            }
            BinOp::Shl => format!("({} << {})", l, r),
            BinOp::Shr => format!("({} >> {})", l, r),
            BinOp::BitAnd => match lt {
                Type::Set(_) => {
                    self.uses_ops = true;
                    format!("ops::set_intersection(&{}, &{})", l, r)
                }
                _ => format!("({} & {})", l, r),
            },
            BinOp::BitOr => match lt {
                Type::Set(_) => {
                    self.uses_ops = true;
                    format!("ops::set_union(&{}, &{})", l, r)
                }
                _ => format!("({} | {})", l, r),
            },
            BinOp::BitXor => match lt {
                Type::Set(_) => {
                    self.uses_ops = true;
                    format!("ops::set_difference_sym(&{}, &{})", l, r)
                }
                _ => format!("({} ^ {})", l, r),
            },
        }
    }

    fn numeric_binary(&mut self, op: &str, left: &IrExpr, right: &IrExpr) -> String {
        let want = if matches!(left.ty, Type::Float) || matches!(right.ty, Type::Float) {
            Type::Float
        } else {
            Type::Int
        };
        let l = self.expr_owned(left);
        let l = self.coerce(l, &left.ty, &want);
        let r = self.expr_owned(right);
        let r = self.coerce(r, &right.ty, &want);
        format!("({} {} {})", l, op, r)
    }

    fn unary(&mut self, op: UnaryOp, operand: &IrExpr) -> String {
        match op {
            UnaryOp::Not => {
                let cond = self.truthy(operand);
                format!("!({})", cond)
            }
            UnaryOp::Neg => {
                let t = self.expr_owned(operand);
                format!("(-({}))", t)
            }
            UnaryOp::Pos => self.expr_owned(operand),
            UnaryOp::Invert => {
                let t = self.expr_owned(operand);
                format!("(!({}))", t)
            }
        }
    }

    fn bool_chain(&mut self, op: BoolOp, values: &[IrExpr]) -> String {
        let joiner = match op {
            BoolOp::And => " && ",
            BoolOp::Or => " || ",
        };
        let parts: Vec<String> = values
            .iter()
            .map(|v| {
                let cond = self.truthy(v);
                format!("({})", cond)
            })
            .collect();
        parts.join(joiner)
    }

    /// Chained comparisons: short-circuited pairs, middles evaluated once.
    fn compare(&mut self, left: &IrExpr, ops: &[CmpOp], comparators: &[IrExpr]) -> String {
        if ops.len() == 1 {
            return self.compare_pair(ops[0], left, &comparators[0]);
        }
        // `a < b < c` — bind each operand once, left to right.
        let mut names = Vec::new();
        let mut prelude = String::new();
        let all: Vec<&IrExpr> = std::iter::once(left).chain(comparators.iter()).collect();
        for operand in &all {
            let name = self.fresh("cmp");
            let text = self.expr_owned(operand);
            prelude.push_str(&format!("let {} = {}; ", name, text));
            names.push(name);
        }
        let mut pairs = Vec::new();
        for (i, op) in ops.iter().enumerate() {
            pairs.push(format!(
                "{} {} {}",
                names[i],
                native_cmp(*op),
                names[i + 1]
            ));
        }
        format!("{{ {}{} }}", prelude, pairs.join(" && "))
    }

    fn compare_pair(&mut self, op: CmpOp, left: &IrExpr, right: &IrExpr) -> String {
        // `x is None` / `x is not None` on optionals.
        if matches!(right.kind, IrExprKind::Literal(Lit::None)) {
            if let IrExprKind::Name { name, binding } = &left.kind {
                let place = match binding.map(|b| self.analysis.scopes.binding(b)) {
                    Some(info) if info.kind == BindingKind::SelfParam => "self".to_string(),
                    _ => rust_name(name),
                };
                return match op {
                    CmpOp::Is | CmpOp::Eq => format!("{}.is_none()", place),
                    CmpOp::IsNot | CmpOp::NotEq => format!("{}.is_some()", place),
                    _ => format!("{}.is_none()", place),
                };
            }
        }

        if matches!(left.ty, Type::Any) || matches!(right.ty, Type::Any) {
            self.uses_value = true;
            let l = self.expr_owned(left);
            let l = self.coerce(l, &left.ty, &Type::Any);
            let r = self.expr_owned(right);
            let r = self.coerce(r, &right.ty, &Type::Any);
            let method = match op {
                CmpOp::Eq | CmpOp::Is => "eq_value",
                CmpOp::NotEq | CmpOp::IsNot => "ne_value",
                CmpOp::Lt => "lt_value",
                CmpOp::LtE => "le_value",
                CmpOp::Gt => "gt_value",
                CmpOp::GtE => "ge_value",
                CmpOp::In => "in_value",
                CmpOp::NotIn => {
                    return format!("!(({}).in_value(&{})?)", l, r);
                }
            };
            return format!("({}).{}(&{})?", l, method, r);
        }

        match op {
            CmpOp::In | CmpOp::NotIn => {
                let l = self.expr_owned(left);
                let r = self.expr_owned(right);
                let test = match &right.ty {
                    Type::Dict(..) => format!("({}).contains_key(&{})", r, l),
                    Type::Str => format!("({}).contains(({}).as_str())", r, l),
                    _ => format!("({}).contains(&{})", r, l),
                };
                if op == CmpOp::NotIn {
                    format!("!({})", test)
                } else {
                    test
                }
            }
            _ => {
                let want = if matches!(left.ty, Type::Float) || matches!(right.ty, Type::Float)
                {
                    Some(Type::Float)
                } else {
                    None
                };
                let l = self.expr_owned(left);
                let r = self.expr_owned(right);
                let (l, r) = match want {
                    Some(f) => (
                        self.coerce(l, &left.ty, &f),
                        self.coerce(r, &right.ty, &f),
                    ),
                    None => (l, r),
                };
                format!("({} {} {})", l, native_cmp(op), r)
            }
        }
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    fn attribute(&mut self, e: &IrExpr, value: &IrExpr, attr: &str) -> String {
        // Native-module constants.
        if let IrExprKind::Name { name, .. } = &value.kind {
            if self
                .module
                .imports
                .iter()
                .any(|i| !i.external && i.alias == *name && i.module == "math")
            {
                return math_constant_text(attr).unwrap_or_else(|| {
                    self.gen_error(
                        Code::UnresolvedName,
                        format!("unknown math constant `{}`", attr),
                        e.span,
                    );
                    "0.0".to_string()
                });
            }
        }

        match &value.ty {
            Type::Struct(class) => {
                let class = class.clone();
                let place = self.place_text(value);
                if let Some((owner, field_ty)) = field_owner(self, &class, attr) {
                    let path = self.base_path(&class, &owner);
                    let text = format!("{}{}.{}", place, path, rust_name(attr));
                    if is_copy(&field_ty) {
                        return text;
                    }
                    return format!("{}.clone()", text);
                }
                if self.analysis.property_type(&class, attr).is_some() {
                    return format!("{}.{}()", place, rust_name(attr));
                }
                // Bound method as value.
                format!("{}.{}", place, rust_name(attr))
            }
            _ => {
                self.uses_value = true;
                let v = self.expr_owned(value);
                let v = self.coerce(v, &value.ty, &Type::Any);
                format!("({}).get_attr({:?})?", v, attr)
            }
        }
    }

    fn index(&mut self, e: &IrExpr, value: &IrExpr, index: &IrExpr) -> String {
        match &value.ty {
            Type::List(_) => {
                self.uses_ops = true;
                let v = self.place_or_owned(value);
                let i = self.expr_owned(index);
                format!("ops::list_get(&{}, {})?", v, i)
            }
            Type::Str => {
                self.uses_ops = true;
                let v = self.place_or_owned(value);
                let i = self.expr_owned(index);
                format!("ops::str_get(&{}, {})?", v, i)
            }
            Type::Dict(..) => {
                self.uses_ops = true;
                let v = self.place_or_owned(value);
                let k = self.expr_owned(index);
                format!("ops::dict_get(&{}, &{})?", v, k)
            }
            Type::Tuple(_) => {
                let v = self.place_or_owned(value);
                match &index.kind {
                    IrExprKind::Literal(Lit::Int(i)) if *i >= 0 => {
                        let text = format!("{}.{}", v, i);
                        if is_copy(&e.ty) {
                            text
                        } else {
                            format!("{}.clone()", text)
                        }
                    }
                    _ => {
                        self.gen_error(
                            Code::UnsupportedSyntax,
                            "tuple indices must be non-negative literals",
                            e.span,
                        );
                        "Default::default()".to_string()
                    }
                }
            }
            _ => {
                self.uses_value = true;
                let v = self.expr_owned(value);
                let v = self.coerce(v, &value.ty, &Type::Any);
                let k = self.expr_owned(index);
                let k = self.coerce(k, &index.ty, &Type::Any);
                format!("({}).get_item({})?", v, k)
            }
        }
    }

    fn slice(
        &mut self,
        _e: &IrExpr,
        value: &IrExpr,
        lower: Option<&IrExpr>,
        upper: Option<&IrExpr>,
        step: Option<&IrExpr>,
    ) -> String {
        let part = |cx: &mut Self, p: Option<&IrExpr>| -> String {
            match p {
                Some(expr) => {
                    let t = cx.expr_owned(expr);
                    format!("Some({})", t)
                }
                None => "None".to_string(),
            }
        };
        match &value.ty {
            Type::List(_) => {
                self.uses_ops = true;
                let v = self.place_or_owned(value);
                let (lo, hi, st) = (part(self, lower), part(self, upper), part(self, step));
                format!("ops::slice_list(&{}, {}, {}, {})?", v, lo, hi, st)
            }
            Type::Str => {
                self.uses_ops = true;
                let v = self.place_or_owned(value);
                let (lo, hi, st) = (part(self, lower), part(self, upper), part(self, step));
                format!("ops::slice_str(&{}, {}, {}, {})?", v, lo, hi, st)
            }
            _ => {
                self.uses_value = true;
                let v = self.expr_owned(value);
                let v = self.coerce(v, &value.ty, &Type::Any);
                let wrap = |cx: &mut Self, p: Option<&IrExpr>| -> String {
                    match p {
                        Some(expr) => {
                            let t = cx.expr_owned(expr);
                            let t = cx.coerce(t, &expr.ty, &Type::Any);
                            format!("Some({})", t)
                        }
                        None => "None".to_string(),
                    }
                };
                let (lo, hi, st) = (wrap(self, lower), wrap(self, upper), wrap(self, step));
                format!("({}).slice({}, {}, {})?", v, lo, hi, st)
            }
        }
    }

    /// Places pass through; rvalues evaluate into their owned text.
    pub(crate) fn place_or_owned(&mut self, e: &IrExpr) -> String {
        match &e.kind {
            IrExprKind::Name { .. } | IrExprKind::Attribute { .. } | IrExprKind::Super => {
                self.place_text(e)
            }
            _ => format!("({})", self.expr_owned(e)),
        }
    }

    // ------------------------------------------------------------------
    // Conditions and formatting
    // ------------------------------------------------------------------

    /// Truthiness of an expression, by type.
    pub(crate) fn truthy(&mut self, e: &IrExpr) -> String {
        let text = self.expr_owned(e);
        match &e.ty {
            Type::Bool => text,
            Type::Int => format!("({} != 0)", text),
            Type::Float => format!("({} != 0.0)", text),
            Type::Str => format!("!({}).is_empty()", text),
            Type::List(_) | Type::Dict(..) | Type::Set(_) => {
                format!("!({}).is_empty()", text)
            }
            Type::Option(_) => format!("({}).is_some()", text),
            Type::Any => format!("({}).truthy()", text),
            _ => text,
        }
    }

    /// Inserts a conversion when `from` and `to` differ representationally.
    pub(crate) fn coerce(&mut self, text: String, from: &Type, to: &Type) -> String {
        if from == to {
            return text;
        }
        match (from, to) {
            (Type::Int, Type::Float) => format!("(({}) as f64)", text),
            (Type::Bool, Type::Int) => format!("(({}) as i64)", text),
            (Type::Bool, Type::Float) => format!("(({}) as i64 as f64)", text),
            (Type::Unit, Type::Option(_)) => "None".to_string(),
            (f, Type::Option(inner)) if f == &**inner => format!("Some({})", text),
            (Type::Option(a), Type::Option(b)) if matches!(**a, Type::Any) || a == b => text,
            (_, Type::Any) => {
                self.uses_value = true;
                format!("({}).into_value()", text)
            }
            (Type::Any, Type::Int) => format!("({}).as_int()", text),
            (Type::Any, Type::Float) => format!("({}).as_float()", text),
            (Type::Any, Type::Bool) => format!("({}).as_bool()", text),
            (Type::Any, Type::Str) => format!("({}).as_str_lossy()", text),
            (Type::List(a), Type::List(b)) if matches!(**b, Type::Any) => {
                self.uses_value = true;
                let _ = a;
                format!(
                    "({}).into_iter().map(|__x| __x.into_value()).collect::<Vec<Value>>()",
                    text
                )
            }
            _ => text,
        }
    }

    /// Format slot and argument text for `print`/f-strings.
    pub(crate) fn format_arg(&mut self, e: &IrExpr) -> (String, String) {
        let text = self.expr_owned(e);
        match &e.ty {
            Type::Int | Type::Bool | Type::Str | Type::Any => ("{}".into(), text),
            Type::Float => {
                self.uses_ops = true;
                ("{}".into(), format!("ops::fmt_float({})", text))
            }
            Type::Struct(name) if name == "Exception" => ("{}".into(), text),
            Type::Unit => ("{}".into(), format!("{{ let _ = {}; \"None\" }}", text)),
            _ => ("{:?}".into(), text),
        }
    }

    fn fstring(&mut self, parts: &[IrFPart]) -> String {
        let mut fmt = String::new();
        let mut args = Vec::new();
        for part in parts {
            match part {
                IrFPart::Literal(text) => {
                    fmt.push_str(&text.replace('{', "{{").replace('}', "}}"));
                }
                IrFPart::Expr(e) => {
                    let (slot, text) = self.format_arg(e);
                    fmt.push_str(&slot);
                    args.push(text);
                }
            }
        }
        if args.is_empty() {
            format!("{:?}.to_string()", fmt)
        } else {
            format!("format!({:?}, {})", fmt, args.join(", "))
        }
    }

    // ------------------------------------------------------------------
    // Iteration helpers (shared with statements)
    // ------------------------------------------------------------------

    pub(crate) fn range_iter_text(
        &mut self,
        start: Option<&IrExpr>,
        stop: &IrExpr,
        step: Option<&IrExpr>,
    ) -> String {
        let start_text = match start {
            Some(s) => self.expr_owned(s),
            None => "0".to_string(),
        };
        let stop_text = self.expr_owned(stop);
        match step {
            None => format!("({}..{})", start_text, stop_text),
            Some(step_expr) => {
                if let IrExprKind::Literal(Lit::Int(n)) = &step_expr.kind {
                    if *n < 0 {
                        // Reversed range with a negative literal step.
                        return format!(
                            "((({}) + 1)..=({})).rev().step_by({} as usize)",
                            stop_text, start_text, -n
                        );
                    }
                }
                let step_text = self.expr_owned(step_expr);
                format!(
                    "({}..{}).step_by(({}) as usize)",
                    start_text, stop_text, step_text
                )
            }
        }
    }

    /// Owned-iterable text for a `for` header, by iterable type.
    /// Returns the header and an optional per-element rebinding.
    pub(crate) fn iter_text(&mut self, iter: &IrExpr, pat: &str) -> (String, Vec<String>) {
        match &iter.kind {
            IrExprKind::Range { start, stop, step } => {
                let header = self.range_iter_text(start.as_deref(), stop, step.as_deref());
                (format!("for {} in {} {{", pat, header), Vec::new())
            }
            IrExprKind::Builtin {
                builtin: Builtin::Enumerate,
                args,
            } if args.len() == 1 => {
                let inner = self.expr_owned(&args[0]);
                (
                    format!(
                        "for (__i, __v) in ({}).into_iter().enumerate() {{",
                        inner
                    ),
                    vec![format!("let {} = (__i as i64, __v);", pat)],
                )
            }
            IrExprKind::Builtin {
                builtin: Builtin::Zip,
                args,
            } if args.len() == 2 => {
                let a = self.expr_owned(&args[0]);
                let b = self.expr_owned(&args[1]);
                (
                    format!(
                        "for {} in ({}).into_iter().zip(({}).into_iter()) {{",
                        pat, a, b
                    ),
                    Vec::new(),
                )
            }
            _ => match &iter.ty {
                Type::Any => {
                    self.uses_value = true;
                    let v = self.expr_owned(iter);
                    let tmp = self.fresh("it");
                    (
                        format!("for {} in ({}).iter_bridge()? {{", tmp, v),
                        vec![format!("let {} = {}?;", pat, tmp)],
                    )
                }
                Type::Dict(..) => {
                    self.uses_ops = true;
                    let v = self.place_or_owned(iter);
                    (
                        format!("for {} in ops::dict_keys(&{}) {{", pat, v),
                        Vec::new(),
                    )
                }
                Type::Set(_) => {
                    self.uses_ops = true;
                    let v = self.place_or_owned(iter);
                    (
                        format!("for {} in ops::set_items(&{}) {{", pat, v),
                        Vec::new(),
                    )
                }
                Type::Str => {
                    let v = self.expr_owned(iter);
                    let tmp = self.fresh("ch");
                    (
                        format!("for {} in ({}).chars() {{", tmp, v),
                        vec![format!("let {} = {}.to_string();", pat, tmp)],
                    )
                }
                _ => {
                    let v = self.expr_owned(iter);
                    (format!("for {} in {} {{", pat, v), Vec::new())
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Comprehensions
    // ------------------------------------------------------------------

    fn comprehension(&mut self, comp: &IrComp, kind: CompKind, ty: &Type) -> String {
        let acc = self.fresh("acc");
        let elem_ty = ty.element();
        self.note_type_uses(ty);
        let decl = match kind {
            CompKind::List => format!("let mut {}: Vec<{}> = Vec::new();", acc, rust_type(&elem_ty)),
            CompKind::Set => {
                self.uses_hashset = true;
                format!(
                    "let mut {}: HashSet<{}> = HashSet::new();",
                    acc,
                    rust_type(&elem_ty)
                )
            }
        };
        let elem = self.expr_owned(&comp.element);
        let elem = self.coerce(elem, &comp.element.ty, &elem_ty);
        let push = match kind {
            CompKind::List => format!("{}.push({});", acc, elem),
            CompKind::Set => format!("{}.insert({});", acc, elem),
        };
        let body = self.generator_loops(&comp.generators, &push);
        format!("{{ {} {} {} }}", decl, body, acc)
    }

    fn dict_comprehension(
        &mut self,
        key: &IrExpr,
        value: &IrExpr,
        generators: &[IrGenerator],
        ty: &Type,
    ) -> String {
        self.uses_hashmap = true;
        let acc = self.fresh("acc");
        let (kt, vt) = match ty {
            Type::Dict(k, v) => ((**k).clone(), (**v).clone()),
            _ => (Type::Any, Type::Any),
        };
        let decl = format!(
            "let mut {}: HashMap<{}, {}> = HashMap::new();",
            acc,
            rust_type(&kt),
            rust_type(&vt)
        );
        let k = self.expr_owned(key);
        let k = self.coerce(k, &key.ty, &kt);
        let v = self.expr_owned(value);
        let v = self.coerce(v, &value.ty, &vt);
        let push = format!("{}.insert({}, {});", acc, k, v);
        let body = self.generator_loops(generators, &push);
        format!("{{ {} {} {} }}", decl, body, acc)
    }

    /// Nested generator loops around `innermost`, preserving source order.
    fn generator_loops(&mut self, generators: &[IrGenerator], innermost: &str) -> String {
        let mut body = innermost.to_string();
        for r#gen in generators.iter().rev() {
            for cond in r#gen.ifs.iter().rev() {
                let test = self.truthy(cond);
                body = format!("if {} {{ {} }}", test, body);
            }
            let pat = self.target_pattern(&r#gen.target);
            let (header, rebinds) = self.iter_text(&r#gen.iter, &pat);
            let rebind_text = rebinds.join(" ");
            body = format!("{} {} {} }}", header, rebind_text, body);
        }
        body
    }

    /// Loop pattern for a target (fresh bindings; comprehension targets
    /// are never reused outside).
    pub(crate) fn target_pattern(&mut self, target: &IrTarget) -> String {
        match target {
            IrTarget::Name { name, binding, .. } => {
                if let Some(b) = binding {
                    self.declared.insert(*b);
                }
                rust_name(name)
            }
            IrTarget::Tuple(items) => {
                let inner: Vec<String> =
                    items.iter().map(|t| self.target_pattern(t)).collect();
                format!("({})", inner.join(", "))
            }
            _ => self.fresh("t"),
        }
    }
}

#[derive(Clone, Copy)]
enum CompKind {
    List,
    Set,
}

/// Does evaluating this expression involve anything fallible?
pub(super) fn expr_can_raise(e: &IrExpr) -> bool {
    let mut found = e.may_raise || e.bridge_required;
    visit_children(e, &mut |c| found |= expr_can_raise(c));
    found
}

fn native_cmp(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq | CmpOp::Is => "==",
        CmpOp::NotEq | CmpOp::IsNot => "!=",
        CmpOp::Lt => "<",
        CmpOp::LtE => "<=",
        CmpOp::Gt => ">",
        CmpOp::GtE => ">=",
        CmpOp::In | CmpOp::NotIn => "==",
    }
}

fn math_constant_text(name: &str) -> Option<String> {
    Some(
        match name {
            "pi" => "std::f64::consts::PI",
            "e" => "std::f64::consts::E",
            "tau" => "std::f64::consts::TAU",
            "inf" => "f64::INFINITY",
            "nan" => "f64::NAN",
            _ => return None,
        }
        .to_string(),
    )
}

/// Field lookup walking bases: (defining class, field type).
fn field_owner(cx: &CodeGen<'_>, class: &str, field: &str) -> Option<(String, Type)> {
    let mut current = Some(class.to_string());
    while let Some(name) = current {
        let info = cx.analysis.classes.get(&name)?;
        if let Some(ty) = info.fields.get(field) {
            return Some((name, ty.clone()));
        }
        current = info.base.clone();
    }
    None
}
