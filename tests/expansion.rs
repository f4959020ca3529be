use pretty_assertions::assert_eq;
use stencil_lang::{
    parse, render, to_source, CachedScope, ClosureFunction, CompiledTemplate, EmptyScope,
    EvalContext, EvalError, Expander, FunctionRegistry, MapScope, RecordAccess, RecordModel,
    RenderError, Value,
};

fn render_with(source: &str, ctx: &EvalContext<'_>) -> Result<String, RenderError> {
    let functions = FunctionRegistry::with_builtins();
    let expander = Expander::new(&RecordAccess, &functions, &EmptyScope);
    render(source, ctx, &expander)
}

fn string_list(items: &[&str]) -> Value {
    Value::List(items.iter().map(|s| Value::from(*s)).collect())
}

// ── End-to-end rendering ────────────────────────────────────────────────

#[test]
fn test_plain_text_and_escapes() {
    let ctx = EvalContext::default();
    assert_eq!(render_with("just text", &ctx).unwrap(), "just text");
    assert_eq!(
        render_with("a !< b, x !{not expr!}, bang!!", &ctx).unwrap(),
        "a < b, x {not expr}, bang!"
    );
}

#[test]
fn test_variables_and_self() {
    let ctx = EvalContext::root(Value::from("World")).with_var("greeting", "Hello");
    assert_eq!(
        render_with("{$greeting}, {this}!!", &ctx).unwrap(),
        "Hello, World!"
    );
}

#[test]
fn test_model_properties_via_barewords() {
    let user = RecordModel::new()
        .with_field("name", "Ada")
        .with_field("role", "engineer")
        .into_value();
    let ctx = EvalContext::root(user);
    assert_eq!(
        render_with("{name} is an {role}", &ctx).unwrap(),
        "Ada is an engineer"
    );
}

#[test]
fn test_foreach_over_models() {
    let users = Value::List(vec![
        RecordModel::new().with_field("name", "Ada").into_value(),
        RecordModel::new().with_field("name", "Grace").into_value(),
    ]);
    let ctx = EvalContext::root(Value::Null).with_var("users", users);
    assert_eq!(
        render_with("{foreach($users, ', ', name)}", &ctx).unwrap(),
        "Ada, Grace"
    );
}

#[test]
fn test_unset_record_property_expands_to_nothing() {
    let user = RecordModel::new()
        .with_field("name", "Ada")
        .with_field("nick", Value::Null)
        .into_value();
    let ctx = EvalContext::root(user);
    // a known but unset field is null and contributes nothing
    assert_eq!(render_with("[{nick}]", &ctx).unwrap(), "[]");
    // an unknown field is an error
    let err = render_with("{nope}", &ctx).unwrap_err();
    assert!(err.to_string().contains("No property 'nope'"), "got {err}");
}

#[test]
fn test_nested_loops_shadowing() {
    let rows = Value::List(vec![string_list(&["a", "b"]), string_list(&["c", "d"])]);
    let ctx = EvalContext::root(Value::Null).with_var("rows", rows);
    let source = "{foreach(row : $rows, '; ', {{foreach(cell : $row, ',', $cell)}})}";
    assert_eq!(render_with(source, &ctx).unwrap(), "a,b; c,d");
}

#[test]
fn test_choice_and_alternative() {
    let ctx = EvalContext::root(Value::Null)
        .with_var("xs", string_list(&[]))
        .with_var("name", Value::Null);
    assert_eq!(
        render_with("{#equals(#size($xs), 0) ? 'empty' : 'full'}", &ctx).unwrap(),
        "empty"
    );
    assert_eq!(render_with("{$name | 'anonymous'}", &ctx).unwrap(), "anonymous");
}

#[test]
fn test_braced_fallback_is_markup() {
    let ctx = EvalContext::root(Value::Null)
        .with_var("a", "")
        .with_var("b", Value::Null)
        .with_var("c", "c-value");
    assert_eq!(
        render_with("{$a | $b | {fallback: {$c}}}", &ctx).unwrap(),
        "fallback: c-value"
    );
    // a braced fallback is structural, so it cannot feed a further
    // emptiness test
    let err = render_with("{$a | {$b} | {fallback: {$c}}}", &ctx).unwrap_err();
    assert!(
        err.to_string()
            .contains("Only simple expressions may be used in a boolean context"),
        "got {err}"
    );
}

#[test]
fn test_nested_foreach_as_parameter() {
    let ctx = EvalContext::root(Value::Null)
        .with_var("c1", string_list(&["a", "b"]))
        .with_var("c2", string_list(&["1", "2"]));
    assert_eq!(
        render_with(
            "{foreach(x : $c1, ';', foreach(y : $c2, ',', {{$x}{$y}}))}",
            &ctx
        )
        .unwrap(),
        "a1,a2;b1,b2"
    );
}

#[test]
fn test_markup_shell_is_dropped() {
    let ctx = EvalContext::root(Value::Null).with_var("title", "Report");
    assert_eq!(
        render_with("<h1 class=\"big\">{$title}</h1><hr/>", &ctx).unwrap(),
        "Report"
    );
}

#[test]
fn test_custom_function() {
    let mut functions = FunctionRegistry::with_builtins();
    functions.register(ClosureFunction::new(
        "shout",
        1,
        |mut args: Vec<Value>| -> Result<Value, EvalError> {
            let text = args.remove(0).to_text().to_uppercase();
            Ok(Value::String(text))
        },
    ));
    let expander = Expander::new(&RecordAccess, &functions, &EmptyScope);
    let ctx = EvalContext::root(Value::Null).with_var("w", "hey");
    assert_eq!(
        render("{#shout($w)}", &ctx, &expander).unwrap(),
        "HEY"
    );
}

// ── Template references ─────────────────────────────────────────────────

#[test]
fn test_reference_through_scope() {
    let mut scope = MapScope::new();
    scope
        .define_source("signature", "-- {$author}")
        .unwrap();
    let functions = FunctionRegistry::with_builtins();
    let expander = Expander::new(&RecordAccess, &functions, &scope);
    let ctx = EvalContext::root(Value::Null).with_var("author", "Ada");
    assert_eq!(
        render("body\n{-> signature}", &ctx, &expander).unwrap(),
        "body\n-- Ada"
    );
}

#[test]
fn test_reference_through_cached_scope() {
    let mut inner = MapScope::new();
    inner.define_source("chunk", "[{this}]").unwrap();
    let scope = CachedScope::new(inner);
    let functions = FunctionRegistry::with_builtins();
    let expander = Expander::new(&RecordAccess, &functions, &scope);
    let ctx = EvalContext::root(Value::from("x"));
    assert_eq!(
        render("{-> chunk}{-> chunk}", &ctx, &expander).unwrap(),
        "[x][x]"
    );
}

#[test]
fn test_reference_with_computed_name() {
    let mut scope = MapScope::new();
    scope.define_source("foo", "{'bar'}").unwrap();
    let functions = FunctionRegistry::with_builtins();
    let expander = Expander::new(&RecordAccess, &functions, &scope);
    let ctx = EvalContext::root(Value::Null).with_var("a", "foo");
    assert_eq!(render("{->'foo'}", &ctx, &expander).unwrap(), "bar");
    assert_eq!(render("{->$a}", &ctx, &expander).unwrap(), "bar");
}

// ── Compiled templates ──────────────────────────────────────────────────

#[test]
fn test_compiled_template_reuse() {
    let template = CompiledTemplate::compile("Hello, {$name}").unwrap();
    let functions = FunctionRegistry::with_builtins();
    let expander = Expander::new(&RecordAccess, &functions, &EmptyScope);

    let ctx = EvalContext::root(Value::Null).with_var("name", "Ada");
    assert_eq!(template.expand(&ctx, &expander).unwrap(), "Hello, Ada");

    let ctx = EvalContext::root(Value::Null).with_var("name", "Grace");
    assert_eq!(template.expand(&ctx, &expander).unwrap(), "Hello, Grace");
}

#[test]
fn test_compiled_template_prints_source() {
    let template = CompiledTemplate::compile("a {$x} b").unwrap();
    assert_eq!(template.to_source(), "a {$x} b");
}

// ── Errors ──────────────────────────────────────────────────────────────

#[test]
fn test_parse_error_is_reported() {
    let ctx = EvalContext::default();
    let err = render_with("left { brace", &ctx).unwrap_err();
    assert!(matches!(err, RenderError::Parse(_)), "got {err:?}");
}

#[test]
fn test_eval_error_carries_position() {
    let ctx = EvalContext::default();
    let err = render_with("abc {$missing}", &ctx).unwrap_err();
    match err {
        RenderError::Eval(e) => assert_eq!(
            e.to_string(),
            "There is no binding for the variable 'missing' at line 1, column 6"
        ),
        other => panic!("expected eval error, got {other:?}"),
    }
}

#[test]
fn test_function_failure_is_wrapped() {
    let mut functions = FunctionRegistry::with_builtins();
    functions.register(ClosureFunction::new(
        "boom",
        0,
        |_args: Vec<Value>| -> Result<Value, EvalError> {
            Err(EvalError::host_error("backend offline"))
        },
    ));
    let expander = Expander::new(&RecordAccess, &functions, &EmptyScope);
    let ctx = EvalContext::default();
    let err = render("{#boom()}", &ctx, &expander).unwrap_err();
    assert!(
        err.to_string().contains("The function 'boom' failed"),
        "got {err}"
    );
}

// ── Round-tripping ──────────────────────────────────────────────────────

#[test]
fn test_round_trip_corpus() {
    let sources = [
        "Hello, {$name}!!",
        "a !< b !{c!}",
        "<div class=\"c {$cls}\"/>",
        "<ul>{foreach($items, '', {<li>{this}</li>})}</ul>",
        "{foreach(x : $a, ', ', {<b>{$x}</b>})}",
        "{$a | $b | 'none'}",
        "{$cond ? {<b>yes</b>} : 'no'}",
        "{-> header}",
        "{#concat($a, ', ', $b)}",
        "{this.items[0]}",
        "{#sublist($l, 1, -1)}",
    ];
    for source in sources {
        let node = parse(source).unwrap();
        assert_eq!(to_source(&node), source, "source: {source}");
    }
}

#[test]
fn test_round_trip_normalizes_whitespace_in_expressions() {
    let node = parse("{  #concat( $a ,$b )  }").unwrap();
    assert_eq!(to_source(&node), "{#concat($a, $b)}");
}

#[test]
fn test_round_trip_is_structural() {
    // Barewords and spacing normalize on the first print. Printing is a
    // fixpoint: re-parsing the printed form prints back identically.
    let sources = [
        "<div class=\"{x}\">{y}</div>",
        "{a.b[ 2 ] | {fallback !{$v!} markup}}",
        "{foreach(item: $items,', ',{<li>{item}</li>},'<start>','<stop>')}",
    ];
    for source in sources {
        let node = parse(source).unwrap();
        let printed = to_source(&node);
        let reparsed = parse(&printed).unwrap();
        assert_eq!(to_source(&reparsed), printed, "source: {source}");
    }
}
