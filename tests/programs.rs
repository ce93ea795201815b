use seclang::{
    last_value, produce_ast, run, BufferedConsole, Environment, ErrorCategory, ErrorKind,
    Interpreter, Result, RuntimeValue, SecLangConfig, SecurityLabel, Value,
};

fn eval(source: &str) -> Value {
    let results = run(source).unwrap_or_else(|e| panic!("{}", e));
    last_value(&results).map(|v| v.value.clone()).unwrap_or(Value::Null)
}

fn category(source: &str) -> ErrorCategory {
    run(source).unwrap_err().category()
}

fn execute_with_inputs(
    source: &str,
    inputs: &[&str],
) -> (Result<Vec<RuntimeValue>>, Environment, BufferedConsole) {
    let mut env = Environment::in_memory(&SecLangConfig::default()).unwrap();
    let mut interpreter = Interpreter::with_console(BufferedConsole::with_inputs(inputs.iter().copied()));
    let result = produce_ast(source).and_then(|program| interpreter.evaluate_program(&program, &mut env));
    (result, env, interpreter.into_console())
}

// ==================== Expressions ====================

#[test]
fn test_arithmetic() {
    assert_eq!(eval("int x = 2\nx = x * 21\nx"), Value::Int(42));
    assert_eq!(eval("int x = 2 + 3 * 4 - 10 / 5"), Value::Int(12));
    assert_eq!(eval("int x = (2 + 3) * 4"), Value::Int(20));
    assert_eq!(eval("int x = 17 % 5"), Value::Int(2));
    assert_eq!(eval("int x = 1 - 2 - 3"), Value::Int(-4));
}

#[test]
fn test_string_operators() {
    assert_eq!(eval("string s = 'ab' * 3"), Value::String("ababab".to_string()));
    assert_eq!(eval("string s = 'abcdef' / 2"), Value::String("abc".to_string()));
    assert_eq!(eval("string s = 'n=' + 4"), Value::String("n=4".to_string()));
    assert_eq!(eval("bool b = 'a' == 'a'"), Value::Bool(true));
}

#[test]
fn test_assignment_is_right_associative() {
    let (result, env, _) = execute_with_inputs("int a\nint b\na = b = 5", &[]);
    assert_eq!(last_value(&result.unwrap()).unwrap().value, Value::Int(5));
    assert_eq!(env.lookup("a").unwrap().value, Value::Int(5));
    assert_eq!(env.lookup("b").unwrap().value, Value::Int(5));
}

// ==================== Control flow ====================

#[test]
fn test_conditional_yields_branch_result() {
    assert_eq!(eval("int x = 5\nif x > 3 then x = 1 else x = 2 endif"), Value::Int(1));
    assert_eq!(eval("int x = 0\nif x > 3 then x = 1 else x = 2 endif"), Value::Int(2));

    let results = run("int x = 0\nif x > 3 then x = 1 endif").unwrap();
    assert!(results[1].is_null());
    assert_eq!(last_value(&results).unwrap().value, Value::Int(0));
}

#[test]
fn test_while_loop() {
    let source = "\
int i = 0
int total = 0
while i < 5 do
  total = total + i
  i = i + 1
endwhile
debug total";
    let (result, _, console) = execute_with_inputs(source, &[]);
    result.unwrap();
    assert_eq!(console.outputs, vec!["10"]);
}

#[test]
fn test_loop_over_same_level_data() {
    let source = "\
int limit:S = 3
int i:S = 0
while i < limit do i = i + 1 endwhile
i";
    let (result, env, _) = execute_with_inputs(source, &[]);
    result.unwrap();
    assert_eq!(env.lookup("i").unwrap(), RuntimeValue::int(3, SecurityLabel::Secret));
}

#[test]
fn test_non_boolean_condition() {
    assert_eq!(category("if 1 then debug 1 endif"), ErrorCategory::Type);
    assert_eq!(category("while 'x' do debug 1 endwhile"), ErrorCategory::Type);
}

// ==================== Input ====================

#[test]
fn test_input_by_declared_type() {
    let source = "int age:C\nbool ok\nstring name\ninput age 'Age?'\ninput ok 'Ok?'\ninput name 'Name?'";
    let (result, env, console) = execute_with_inputs(source, &["42", "TRUE", "Ada Lovelace"]);
    result.unwrap();
    assert_eq!(env.lookup("age").unwrap(), RuntimeValue::int(42, SecurityLabel::Confidential));
    assert_eq!(env.lookup("ok").unwrap().value, Value::Bool(true));
    assert_eq!(env.lookup("name").unwrap().value, Value::String("Ada Lovelace".to_string()));
    assert_eq!(console.prompts, vec!["Age?", "Ok?", "Name?"]);
}

#[test]
fn test_invalid_input() {
    let (result, _, _) = execute_with_inputs("int n\ninput n 'n?'", &["abc"]);
    let err = result.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidInput { ref name, .. } if name == "n"));
    assert_eq!(err.category(), ErrorCategory::Runtime);

    let (result, _, _) = execute_with_inputs("bool b\ninput b 'b?'", &["yes"]);
    assert!(matches!(result.unwrap_err().kind, ErrorKind::InvalidInput { .. }));

    let (result, _, _) = execute_with_inputs("int n\ninput n 'n?'", &[]);
    assert_eq!(result.unwrap_err().category(), ErrorCategory::Runtime);
}

#[test]
fn test_input_into_constant_is_refused() {
    let (result, _, _) = execute_with_inputs("const int k = 1\ninput k 'k?'", &["2"]);
    assert_eq!(result.unwrap_err().kind, ErrorKind::ConstantReassignment("k".to_string()));
}

// ==================== Errors ====================

#[test]
fn test_resolution_errors() {
    assert_eq!(
        run("const int k = 1\nk = 2").unwrap_err().kind,
        ErrorKind::ConstantReassignment("k".to_string())
    );
    assert_eq!(run("y = 1").unwrap_err().kind, ErrorKind::UndefinedVariable("y".to_string()));
    assert_eq!(run("int x\nint x").unwrap_err().kind, ErrorKind::AlreadyDeclared("x".to_string()));
    assert_eq!(run("1 = 2").unwrap_err().kind, ErrorKind::InvalidAssignmentTarget);
}

#[test]
fn test_type_errors() {
    assert!(matches!(
        run("bool b = 1").unwrap_err().kind,
        ErrorKind::DeclarationTypeMismatch { .. }
    ));
    assert!(matches!(
        run("int x = 1\nx = 'one'").unwrap_err().kind,
        ErrorKind::AssignmentTypeMismatch { .. }
    ));
    assert_eq!(category("bool b = true + false"), ErrorCategory::Type);
}

#[test]
fn test_syntax_and_lexical_errors() {
    assert_eq!(produce_ast("int x = 1.5").unwrap_err().kind, ErrorKind::NonIntegerLiteral("1.5".to_string()));
    assert_eq!(category("int x = @"), ErrorCategory::Lexical);
    assert_eq!(category("if true then debug 1"), ErrorCategory::Syntax);
    assert_eq!(category("int = 4"), ErrorCategory::Syntax);
}

#[test]
fn test_runtime_errors() {
    assert_eq!(run("int x = 1 / 0").unwrap_err().kind, ErrorKind::DivisionByZero);
    assert_eq!(run("int x = 9223372036854775807 + 1").unwrap_err().kind, ErrorKind::IntegerOverflow);

    let err = run("string s = 'a' * 9223372036854775807").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::StringTooLong { .. }));
    assert_eq!(err.category(), ErrorCategory::Runtime);
    assert_eq!(run("string s = 'abc' * 9223372036854775807").unwrap_err().kind, ErrorKind::IntegerOverflow);
}

#[test]
fn test_errors_carry_source_line() {
    let err = run("int x = 1\nx = y").unwrap_err();
    assert_eq!(err.span.map(|s| s.line), Some(2));
    assert_eq!(err.source_line.as_deref(), Some("x = y"));
    assert!(err.to_string().starts_with("[line 2:"));
}

// ==================== State ====================

#[test]
fn test_variables_report() {
    let (result, env, _) = execute_with_inputs("int a:S = 1\nconst string b = 'x'\nbool c:TS", &[]);
    result.unwrap();

    let vars = env.variables();
    let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!((vars[0].label_level, vars[0].label_name), (2, "Secret"));
    assert!(vars[1].constant);
    assert_eq!((vars[2].label_level, vars[2].label_name), (3, "TopSecret"));
}

#[test]
fn test_state_persists_across_programs() {
    let mut env = Environment::in_memory(&SecLangConfig::default()).unwrap();
    let mut interpreter = Interpreter::with_console(BufferedConsole::new());

    for line in ["int x = 1", "x = x + 1", "debug x"] {
        let program = produce_ast(line).unwrap();
        interpreter.evaluate_program(&program, &mut env).unwrap();
    }
    assert_eq!(interpreter.console().outputs, vec!["2"]);
}

#[test]
fn test_sessions_run_on_worker_threads() {
    let workers: Vec<_> = [("first", 3), ("second", 4)]
        .into_iter()
        .map(|(session, n)| {
            let env = Environment::in_memory(&SecLangConfig::default()).unwrap();
            let source = format!("int n = {}\nopen(unclassified,'w')\nwrite(unclassified, n * n)", n);
            std::thread::spawn(move || {
                let mut env = env;
                let mut interpreter = Interpreter::with_console(BufferedConsole::new());
                let program = produce_ast(&source).unwrap();
                interpreter.evaluate_program(&program, &mut env).unwrap();
                (session, env.channel_contents().unwrap()[0].1.clone())
            })
        })
        .collect();

    let outputs: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert_eq!(outputs, vec![("first", "9\n".to_string()), ("second", "16\n".to_string())]);
}
