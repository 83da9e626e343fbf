use indoc::indoc;

use crate::compile;

fn emit(source: &str) -> String {
    let out = compile(source);
    assert!(
        out.is_success(),
        "compile failed: {}",
        out.diagnostics.printer().source(source).render()
    );
    out.code.unwrap()
}

#[test]
fn emission_is_deterministic() {
    let source = indoc! {r#"
        def main() -> None:
            names: dict[int, str] = {3: "A", 5: "B"}
            for i in range(1, 16):
                print(f"{i}: {len(names)}")

        if __name__ == "__main__":
            main()
    "#};
    assert_eq!(emit(source), emit(source));
}

#[test]
fn simple_binding_gets_declared_type() {
    let code = emit("x = 1\n");
    assert!(code.contains("fn main() {"), "{code}");
    assert!(code.contains("let x: i64 = 1;"), "{code}");
}

#[test]
fn reassigned_binding_is_mut_and_assigned_once() {
    let code = emit("x = 1\nx = 2\n");
    assert!(code.contains("let mut x: i64 = 1;"), "{code}");
    assert!(code.contains("x = 2;"), "{code}");
    assert_eq!(code.matches("let mut x").count(), 1, "{code}");
}

#[test]
fn range_for_loop() {
    let code = emit("for i in range(1, 16):\n    print(i)\n");
    assert!(code.contains("for i in (1..16) {"), "{code}");
    assert!(code.contains("println!(\"{}\", i);"), "{code}");
}

#[test]
fn range_with_step_and_reverse() {
    let code = emit("for i in range(0, 10, 2):\n    print(i)\n");
    assert!(code.contains("step_by"), "{code}");

    let code = emit("for i in range(10, 0, -1):\n    print(i)\n");
    assert!(code.contains(".rev()"), "{code}");
}

#[test]
fn may_raise_function_returns_result() {
    let code = emit(indoc! {r#"
        def validate(x: int) -> int:
            if x < 0:
                raise ValueError("neg")
            return x
    "#});
    assert!(
        code.contains("fn validate(x: i64) -> TnkResult<i64> {"),
        "{code}"
    );
    assert!(
        code.contains("TnkError::new(ErrorKind::ValueError, \"neg\".to_string()).with_line(3)"),
        "{code}"
    );
    assert!(code.contains("return Ok(x);"), "{code}");
}

#[test]
fn plain_function_stays_plain() {
    let code = emit(indoc! {"
        def double(x: int) -> int:
            return x * 2
    "});
    assert!(code.contains("fn double(x: i64) -> i64 {"), "{code}");
    assert!(code.contains("return (x * 2);"), "{code}");
}

#[test]
fn hoisted_branch_binding_predeclared_with_default() {
    let code = emit(indoc! {r#"
        def pick(flag: bool) -> str:
            if flag:
                result = "yes"
            else:
                result = "no"
            return result
    "#});
    assert!(
        code.contains("let mut result: String = String::new();"),
        "{code}"
    );
    assert!(code.contains("result = \"yes\".to_string();"), "{code}");
    assert!(code.contains("return result.clone();"), "{code}");
}

#[test]
fn try_except_lowering_shapes() {
    let code = emit(indoc! {r#"
        def validate_input(value: int) -> int:
            try:
                if value < 0:
                    raise ValueError("negative value not allowed")
            except ValueError as e:
                raise RuntimeError("validation failed") from e
            return value * 2
    "#});
    assert!(code.contains("TnkResult<Flow<i64>>"), "{code}");
    assert!(
        code.contains("Err(e) if matches!(e.kind, ErrorKind::ValueError) => {"),
        "{code}"
    );
    assert!(code.contains(".with_cause(e.clone())"), "{code}");
    assert!(code.contains("Ok(Flow::Return(__v)) => return Ok(__v),"), "{code}");
}

#[test]
fn finally_runs_between_dispatch_and_flow() {
    let code = emit(indoc! {r#"
        def f() -> int:
            try:
                x = 1
            except:
                x = 2
            finally:
                print("cleanup")
            return 0
    "#});
    let finally_pos = code.find("println!(\"{}\", \"cleanup\".to_string())").unwrap();
    let dispatch_pos = code.find("Err(__err) => {").unwrap();
    let apply_pos = code.rfind("Ok(Flow::Fall) => {}").unwrap();
    assert!(dispatch_pos < finally_pos && finally_pos < apply_pos, "{code}");
}

#[test]
fn chained_comparison_binds_middles_once() {
    let code = emit("ok = 1 < 2 < 3\n");
    assert!(code.contains("let __cmp1 = 1;"), "{code}");
    assert!(code.contains("__cmp2 < __cmp3"), "{code}");
    assert!(code.contains("&&"), "{code}");
}

#[test]
fn tuple_swap_uses_mem_swap() {
    let code = emit("a = 1\nb = 2\na, b = b, a\n");
    assert!(code.contains("std::mem::swap(&mut a, &mut b);"), "{code}");
}

#[test]
fn augmented_assignment_read_modify_write() {
    let code = emit("x = 1\nx += 2\n");
    assert!(code.contains("x = (x + 2);"), "{code}");
}

#[test]
fn dict_literal_and_ordered_iteration() {
    let code = emit(indoc! {r#"
        names = {3: "A", 5: "B"}
        for key in names:
            print(key)
    "#});
    assert!(
        code.contains("HashMap::from([(3, \"A\".to_string()), (5, \"B\".to_string())])"),
        "{code}"
    );
    assert!(code.contains("ops::dict_keys(&names)"), "{code}");
}

#[test]
fn list_comprehension_with_filter() {
    let code = emit("evens = [x * 2 for x in range(10) if x % 2 == 0]\n");
    assert!(code.contains("Vec<i64>"), "{code}");
    assert!(code.contains(".push("), "{code}");
    assert!(code.contains("for x in (0..10)"), "{code}");
}

#[test]
fn fstring_formats_by_type() {
    let code = emit(indoc! {r#"
        x = 5
        xs = [1, 2]
        print(f"{x} {xs}")
    "#});
    assert!(code.contains("format!(\"{} {:?}\", x, xs.clone())"), "{code}");
}

#[test]
fn external_import_goes_through_bridge() {
    let code = emit(indoc! {"
        import pandas as pd

        def load() -> None:
            df = pd.DataFrame()
            df.head()

        if __name__ == \"__main__\":
            load()
    "});
    assert!(code.contains("use tanuki_runtime::bridge;"), "{code}");
    assert!(
        code.contains("bridge::call_function(\"pandas.DataFrame\", vec![], vec![])?"),
        "{code}"
    );
    assert!(
        code.contains(".call_method(\"head\", vec![], vec![])?"),
        "{code}"
    );
    assert!(code.contains("fn load() -> TnkResult<()> {"), "{code}");
}

#[test]
fn bridge_iteration_is_batched_stream() {
    let code = emit(indoc! {"
        import pandas as pd

        def main() -> None:
            df = pd.DataFrame()
            total: int = 0
            for item in df[\"value\"]:
                total += int(item)
            print(total)

        if __name__ == \"__main__\":
            main()
    "});
    assert!(code.contains(".iter_bridge()?"), "{code}");
    assert!(code.contains(".to_int()?"), "{code}");
    assert!(code.contains(".get_item("), "{code}");
}

#[test]
fn user_main_is_renamed() {
    let code = emit(indoc! {r#"
        def main() -> None:
            print("hi")

        if __name__ == "__main__":
            main()
    "#});
    assert!(code.contains("fn tnk_main()"), "{code}");
    assert!(code.contains("tnk_main();"), "{code}");
    // The real entry point still exists exactly once.
    assert_eq!(code.matches("fn main()").count(), 1, "{code}");
}

#[test]
fn setup_runs_before_entry_body() {
    let code = emit(indoc! {r#"
        limit = 3
        print(limit)

        if __name__ == "__main__":
            print("entry")
    "#});
    let setup_pos = code.find("let limit: i64 = 3;").unwrap();
    let entry_pos = code.find("\"entry\"").unwrap();
    assert!(setup_pos < entry_pos, "{code}");
}

#[test]
fn dataclass_becomes_struct_with_new() {
    let code = emit(indoc! {"
        @dataclass
        class Point:
            x: int
            y: int

        p = Point(1, 2)
        print(p.x)
    "});
    assert!(code.contains("pub struct Point {"), "{code}");
    assert!(code.contains("pub x: i64,"), "{code}");
    assert!(code.contains("pub fn new(x: i64, y: i64) -> Point {"), "{code}");
    assert!(code.contains("let p: Point = Point::new(1, 2);"), "{code}");
    assert!(code.contains("println!(\"{}\", p.x);"), "{code}");
}

#[test]
fn init_constructor_and_mutating_method() {
    let code = emit(indoc! {"
        class Counter:
            def __init__(self, start: int) -> None:
                self.count = start

            def bump(self) -> None:
                self.count += 1

        c = Counter(0)
        c.bump()
        print(c.count)
    "});
    assert!(code.contains("pub fn new(start: i64) -> Counter {"), "{code}");
    assert!(code.contains("__field_count = start;"), "{code}");
    assert!(code.contains("pub fn bump(&mut self) {"), "{code}");
    assert!(code.contains("let mut c: Counter = Counter::new(0);"), "{code}");
    assert!(code.contains("c.bump();"), "{code}");
}

#[test]
fn inheritance_lowers_to_composition() {
    let code = emit(indoc! {r#"
        class Base:
            def __init__(self, name: str) -> None:
                self.name = name

            def greet(self) -> str:
                return self.name

        class Child(Base):
            def __init__(self, name: str) -> None:
                super().__init__(name)

            def greet(self) -> str:
                return super().greet()
    "#});
    assert!(code.contains("pub base: Base,"), "{code}");
    assert!(code.contains("__field_base = Base::new(name.clone());"), "{code}");
    assert!(code.contains("self.base.greet()"), "{code}");
}

#[test]
fn property_and_setter() {
    let code = emit(indoc! {"
        class Circle:
            def __init__(self, radius: float) -> None:
                self._radius = radius

            @property
            def radius(self) -> float:
                return self._radius

            @radius.setter
            def radius(self, value: float) -> None:
                self._radius = value

        c = Circle(1.0)
        print(c.radius)
        c.radius = 2.0
    "});
    assert!(code.contains("pub fn radius(&self) -> f64 {"), "{code}");
    assert!(code.contains("pub fn set_radius(&mut self, value: f64) {"), "{code}");
    assert!(code.contains("c.radius()"), "{code}");
    assert!(code.contains("c.set_radius(2.0);"), "{code}");
}

#[test]
fn callable_field_called_through_receiver() {
    let code = emit(indoc! {"
        class Condition:
            def __init__(self, check: Callable[[int, int], bool]) -> None:
                self.check_fn = check

            def check(self, num: int, key: int) -> bool:
                return self.check_fn(num, key)
    "});
    assert!(code.contains("Rc<dyn Fn(i64, i64) -> bool>"), "{code}");
    assert!(code.contains("(self.check_fn)(num, key)"), "{code}");
    assert!(code.contains("use std::rc::Rc;"), "{code}");
}

#[test]
fn str_params_pass_as_str_slices() {
    let code = emit(indoc! {r#"
        def greet(name: str) -> str:
            return "hello " + name

        print(greet("world"))
    "#});
    assert!(code.contains("fn greet(name: &str) -> String {"), "{code}");
    assert!(code.contains("let name = name.to_string();"), "{code}");
    assert!(code.contains("greet(\"world\")"), "{code}");
}

#[test]
fn mutated_list_param_is_exclusive_reference() {
    let code = emit(indoc! {"
        def push_two(xs: list[int]) -> None:
            xs.append(2)

        nums = [1]
        push_two(nums)
    "});
    assert!(code.contains("fn push_two(xs: &mut Vec<i64>) {"), "{code}");
    assert!(code.contains("xs.push(2);"), "{code}");
    assert!(code.contains("push_two(&mut nums);"), "{code}");
}

#[test]
fn read_only_list_param_is_shared_reference() {
    let code = emit(indoc! {"
        def total(xs: list[int]) -> int:
            return sum(xs)

        print(total([1, 2, 3]))
    "});
    assert!(code.contains("fn total(xs: &Vec<i64>) -> i64 {"), "{code}");
}

#[test]
fn is_none_narrowing_unwraps_reads() {
    let code = emit(indoc! {"
        def value_or_zero(x: Optional[int]) -> int:
            if x is None:
                return 0
            return x
    "});
    assert!(code.contains("if x.is_none() {"), "{code}");
    assert!(code.contains("return x.clone().unwrap();"), "{code}");
}

#[test]
fn unsupported_builtin_blocks_code_emission() {
    let out = compile("x = eval(\"1+1\")\n");
    assert!(!out.is_success());
    assert!(out.diagnostics.has_code(crate::Code::UnsupportedSyntax));
}

#[test]
fn no_unused_import_diagnostic_for_unused_external() {
    let out = compile("import numpy as np\nprint(1)\n");
    assert!(out.is_success());
    let code = out.code.unwrap();
    // No bridge call is emitted for an import that is never used.
    assert!(!code.contains("bridge::"), "{code}");
}

#[test]
fn lambda_assignment_boxes_closure() {
    let code = emit(indoc! {"
        double = lambda x: x * 2
        print(double(5))
    "});
    assert!(code.contains("Rc::new(move |x|"), "{code}");
    assert!(code.contains("double(5)"), "{code}");
}

#[test]
fn with_statement_scopes_the_guard() {
    let code = emit(indoc! {"
        import pathlib

        def read(p: str) -> None:
            with pathlib.Path(p) as f:
                print(f)

        if __name__ == \"__main__\":
            read(\"x\")
    "});
    assert!(code.contains("__enter__"), "{code}");
    assert!(code.contains("__exit__"), "{code}");
}

#[test]
fn slice_with_negative_step_on_list() {
    let code = emit("rev = [1, 2, 3][::-1]\n");
    assert!(code.contains("ops::slice_list("), "{code}");
    assert!(code.contains("Some(-1))?"), "{code}");
}

#[test]
fn static_container_access_is_result_carrying() {
    let code = emit(indoc! {r#"
        def head(xs: list[int]) -> int:
            return xs[0]

        def lookup(d: dict[int, str], k: int) -> str:
            return d[k]
    "#});
    // Out-of-range and missing-key accesses surface as errors, so both
    // functions are lifted and the accesses propagate with `?`.
    assert!(code.contains("fn head(xs: &Vec<i64>) -> TnkResult<i64> {"), "{code}");
    assert!(code.contains("ops::list_get(&xs, 0)?"), "{code}");
    assert!(
        code.contains("fn lookup(d: &HashMap<i64, String>, k: i64) -> TnkResult<String> {"),
        "{code}"
    );
    assert!(code.contains("ops::dict_get(&d, &k)?"), "{code}");
}

#[test]
fn caught_index_error_keeps_function_plain() {
    let code = emit(indoc! {"
        def head_or_zero(xs: list[int]) -> int:
            try:
                return xs[0]
            except IndexError:
                return 0
    "});
    // The access is covered, so the function itself stays plain; the `?`
    // lands inside the lowered try closure.
    assert!(code.contains("fn head_or_zero(xs: &Vec<i64>) -> i64 {"), "{code}");
    assert!(code.contains("ops::list_get(&xs, 0)?"), "{code}");
    assert!(
        code.contains("if matches!(__err.kind, ErrorKind::IndexError) => {"),
        "{code}"
    );
}

#[test]
fn math_module_lowers_natively() {
    let code = emit(indoc! {"
        import math

        r = math.sqrt(2.0)
        print(math.pi)
    "});
    assert!(code.contains(".sqrt()"), "{code}");
    assert!(code.contains("std::f64::consts::PI"), "{code}");
    assert!(!code.contains("bridge::"), "{code}");
}
