use crate::compiler::Compiler;
use crate::lexer::Lexer;
use crate::memory::GarbageCollector;
use crate::objects::Value;
use crate::virtual_machine::{InterpretResult, VM};

/// Compiles and runs a source string, returning the machine so tests
/// can inspect its final state.
fn run_source(source: &str) -> (VM, InterpretResult) {
    let tokens = Lexer::lex(source);

    let mut gc = GarbageCollector::new();
    let script = Compiler::compile(&tokens, &mut gc);
    assert!(!script.had_error, "The program should compile cleanly.");

    let mut vm = VM::new(gc);
    let result = vm.execute(script.function);
    (vm, result)
}

/// Reads a numeric global out of a finished machine.
fn global_number(vm: &VM, name: &str) -> f64 {
    match vm.globals.get(name) {
        Some(Value::Number(n)) => *n,
        _ => panic!("Expected the global '{}' to be a number.", name),
    }
}

/// Reads a boolean global out of a finished machine.
fn global_bool(vm: &VM, name: &str) -> bool {
    match vm.globals.get(name) {
        Some(Value::Bool(b)) => *b,
        _ => panic!("Expected the global '{}' to be a bool.", name),
    }
}

/// Renders a global the way `print` would.
fn global_display(vm: &VM, name: &str) -> String {
    match vm.globals.get(name) {
        Some(value) => value.display_plain(&vm.gc),
        None => panic!("Expected the global '{}' to be defined.", name),
    }
}

#[test]
fn arithmetic_respects_precedence() {
    let (vm, result) = run_source("var r = 1 + 2 * 3;");

    assert!(matches!(result, InterpretResult::Ok));
    assert_eq!(global_number(&vm, "r"), 7.0);
}

#[test]
fn globals_can_be_reassigned() {
    let (vm, result) = run_source("var a = 1; a = a + 2;");

    assert!(matches!(result, InterpretResult::Ok));
    assert_eq!(global_number(&vm, "a"), 3.0);
}

#[test]
fn assignment_is_an_expression_yielding_the_value() {
    let (vm, _) = run_source("var a = 1; var b = a = 5;");

    assert_eq!(global_number(&vm, "a"), 5.0);
    assert_eq!(global_number(&vm, "b"), 5.0);
}

#[test]
fn uninitialized_variables_default_to_nil() {
    let (vm, _) = run_source("var a;");

    assert!(matches!(vm.globals.get("a"), Some(Value::Nil)));
}

#[test]
fn while_loops_with_locals_iterate() {
    let (vm, result) = run_source(
        "var total = 0; \
         var i = 0; \
         while (i < 3) { var step = i; total = total + step; i = i + 1; }",
    );

    assert!(matches!(result, InterpretResult::Ok));
    assert_eq!(global_number(&vm, "total"), 3.0);
    assert_eq!(global_number(&vm, "i"), 3.0);
    // The block locals were popped along the way.
    assert!(vm.stack.is_empty());
}

#[test]
fn for_loops_desugar_correctly() {
    let (vm, result) =
        run_source("var total = 0; for (var i = 0; i < 5; i = i + 1) { total = total + i; }");

    assert!(matches!(result, InterpretResult::Ok));
    assert_eq!(global_number(&vm, "total"), 10.0);
}

#[test]
fn for_loops_without_clauses_still_terminate_on_condition() {
    let (vm, result) = run_source("var i = 0; for (; i < 3;) { i = i + 1; }");

    assert!(matches!(result, InterpretResult::Ok));
    assert_eq!(global_number(&vm, "i"), 3.0);
}

#[test]
fn if_else_picks_the_right_branch() {
    let (vm, _) = run_source("var r = 0; if (1 > 2) { r = 1; } else { r = 2; }");
    assert_eq!(global_number(&vm, "r"), 2.0);

    let (vm, _) = run_source("var r = 0; if (2 > 1) { r = 1; } else { r = 2; }");
    assert_eq!(global_number(&vm, "r"), 1.0);
}

#[test]
fn logical_operators_short_circuit_to_operand_values() {
    let (vm, _) = run_source(
        "var a = true and false; \
         var b = false or true; \
         var c = nil or 3; \
         var d = nil and 3;",
    );

    assert!(!global_bool(&vm, "a"));
    assert!(global_bool(&vm, "b"));
    assert_eq!(global_number(&vm, "c"), 3.0);
    assert!(matches!(vm.globals.get("d"), Some(Value::Nil)));
}

#[test]
fn only_nil_and_false_are_falsey() {
    let (vm, _) = run_source(
        "var zero = !!0; \
         var empty = !!\"\"; \
         var truth = !!true; \
         var lie = !!false; \
         var nothing = !!nil;",
    );

    // The number zero and the empty string are both truthy here.
    assert!(global_bool(&vm, "zero"));
    assert!(global_bool(&vm, "empty"));
    assert!(global_bool(&vm, "truth"));
    assert!(!global_bool(&vm, "lie"));
    assert!(!global_bool(&vm, "nothing"));
}

#[test]
fn double_negation_round_trips_numbers() {
    let (vm, _) = run_source("var n = 5; var m = -(-n);");
    assert_eq!(global_number(&vm, "m"), 5.0);
}

#[test]
fn strings_concatenate_into_new_objects() {
    let (vm, result) = run_source("var s = \"foo\" + \"bar\";");

    assert!(matches!(result, InterpretResult::Ok));
    assert_eq!(global_display(&vm, "s"), "foobar");
}

#[test]
fn strings_compare_by_contents() {
    let (vm, _) = run_source(
        "var eq = \"x\" + \"y\" == \"xy\"; \
         var lt = \"abc\" < \"abd\"; \
         var gt = \"b\" > \"a\";",
    );

    assert!(global_bool(&vm, "eq"));
    assert!(global_bool(&vm, "lt"));
    assert!(global_bool(&vm, "gt"));
}

#[test]
fn values_of_different_types_are_never_equal() {
    let (vm, _) = run_source(
        "var a = 1 == \"1\"; \
         var b = nil == false; \
         var c = nil == nil;",
    );

    assert!(!global_bool(&vm, "a"));
    assert!(!global_bool(&vm, "b"));
    assert!(global_bool(&vm, "c"));
}

#[test]
fn escape_sequences_substitute_at_print_time() {
    let (vm, _) = run_source("var s = \"a\\nb\\tc\";");
    assert_eq!(global_display(&vm, "s"), "a\nb\tc");
}

#[test]
fn number_rendering_drops_integral_fractions() {
    let (vm, _) = run_source("var i = 14.0; var f = 2.5;");

    assert_eq!(global_display(&vm, "i"), "14");
    assert_eq!(global_display(&vm, "f"), "2.5");
}

#[test]
fn classes_instantiate_and_carry_fields() {
    let (vm, result) = run_source(
        "class Box {} \
         var b = Box(); \
         b.value = 42; \
         var v = b.value;",
    );

    assert!(matches!(result, InterpretResult::Ok));
    assert_eq!(global_number(&vm, "v"), 42.0);
    assert_eq!(global_display(&vm, "b"), "<instance of Box>");
    assert_eq!(global_display(&vm, "Box"), "<class Box>");
}

#[test]
fn field_assignment_yields_the_assigned_value() {
    let (vm, _) = run_source(
        "class Box {} \
         var b = Box(); \
         var v = b.value = 7;",
    );

    assert_eq!(global_number(&vm, "v"), 7.0);
}

#[test]
fn fields_are_per_instance() {
    let (vm, _) = run_source(
        "class Box {} \
         var a = Box(); \
         var b = Box(); \
         a.value = 1; \
         b.value = 2; \
         var r = a.value + b.value;",
    );

    assert_eq!(global_number(&vm, "r"), 3.0);
}

#[test]
fn alloc_expressions_produce_allocation_objects() {
    let (vm, result) = run_source("var a = alloc 2;");

    assert!(matches!(result, InterpretResult::Ok));
    assert_eq!(global_display(&vm, "a"), "<allocation of 2 kb>");

    match vm.globals.get("a") {
        Some(Value::Obj(id)) => {
            let block = vm.gc.get(id).obj.as_allocation_obj().unwrap();
            assert_eq!(block.block.len(), 2 * 1024);
        }
        _ => panic!("Expected the global 'a' to be an allocation object."),
    }
}

#[test]
fn dividing_by_zero_is_a_runtime_error() {
    let (vm, result) = run_source("print 1 / 0;");

    assert!(matches!(result, InterpretResult::RuntimeError));
    // The machine unwound its stacks.
    assert!(vm.stack.is_empty());
    assert!(vm.frames.is_empty());
}

#[test]
fn reading_an_undefined_variable_is_a_runtime_error() {
    let (_vm, result) = run_source("print x;");
    assert!(matches!(result, InterpretResult::RuntimeError));
}

#[test]
fn reading_an_undefined_property_is_a_runtime_error() {
    let (_vm, result) = run_source("class Box {} var b = Box(); print b.missing;");
    assert!(matches!(result, InterpretResult::RuntimeError));
}

#[test]
fn setting_a_property_on_a_non_instance_is_a_runtime_error() {
    let (_vm, result) = run_source("var a = 1; a.field = 2;");
    assert!(matches!(result, InterpretResult::RuntimeError));
}

#[test]
fn redefining_a_global_is_a_runtime_error() {
    let (_vm, result) = run_source("var a = 1; var a = 2;");
    assert!(matches!(result, InterpretResult::RuntimeError));
}

#[test]
fn calling_a_non_class_is_a_runtime_error() {
    let (_vm, result) = run_source("var a = 1; a();");
    assert!(matches!(result, InterpretResult::RuntimeError));
}

#[test]
fn adding_mismatched_operands_is_a_runtime_error() {
    let (_vm, result) = run_source("print \"s\" + 1;");
    assert!(matches!(result, InterpretResult::RuntimeError));
}

#[test]
fn negating_a_string_is_a_runtime_error() {
    let (_vm, result) = run_source("print -\"s\";");
    assert!(matches!(result, InterpretResult::RuntimeError));
}

#[test]
fn return_terminates_the_program_early() {
    let (vm, result) = run_source("var a = 1; return; a = 2;");

    assert!(matches!(result, InterpretResult::Ok));
    assert_eq!(global_number(&vm, "a"), 1.0);
}

#[test]
fn interpret_reports_compile_errors() {
    assert!(matches!(
        VM::interpret("var ;"),
        InterpretResult::CompileError
    ));
}

#[test]
fn interpret_runs_print_programs() {
    assert!(matches!(
        VM::interpret("print \"foo\" + \"bar\";"),
        InterpretResult::Ok
    ));
}

#[test]
fn scope_exit_pops_every_block_local() {
    let (vm, result) = run_source("{ var a = 1; { var b = 2; var c = a + b; } }");

    assert!(matches!(result, InterpretResult::Ok));
    assert!(vm.stack.is_empty());
    assert!(vm.globals.is_empty());
}
