/// Library-level scenarios: parse + evaluate through the public API.
use hason::filter::{self, EvalError, ParseError};
use hason::value::Value;

fn json(s: &str) -> Value {
    Value::from_json(s).unwrap()
}

fn eval(filter: &str, input: &str) -> Result<Vec<Value>, EvalError> {
    filter::evaluate(&filter::parse(filter).unwrap(), &json(input))
}

fn values(filter: &str, input: &str) -> Vec<Value> {
    eval(filter, input).unwrap_or_else(|e| panic!("{filter}: {e}"))
}

const PERSON: &str = r#"{"name":"John","age":30}"#;
const TAGS: &str = r#"{"tags":["developer","javascript","react"]}"#;

#[test]
fn identity_yields_input() {
    assert_eq!(values(".", PERSON), vec![json(PERSON)]);
}

#[test]
fn field_yields_value() {
    assert_eq!(values(".name", PERSON), vec![json(r#""John""#)]);
}

#[test]
fn index_yields_element() {
    assert_eq!(values(".tags[1]", TAGS), vec![json(r#""javascript""#)]);
}

#[test]
fn index_out_of_bounds() {
    assert_eq!(
        eval(".tags[10]", r#"{"tags":["developer"]}"#),
        Err(EvalError::IndexOutOfBounds {
            index: 10,
            length: 1
        })
    );
}

#[test]
fn nested_path_and_type_mismatch() {
    let input = r#"{"a":{"b":{"c":5}}}"#;
    assert_eq!(values(".a.b.c", input), vec![Value::Number(5.0)]);
    assert!(matches!(
        eval(".a.b.c.d", input),
        Err(EvalError::TypeMismatch { .. })
    ));
}

#[test]
fn iterate_yields_each_element_in_order() {
    assert_eq!(
        values(".items[]", r#"{"items":[1,2,3]}"#),
        vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]
    );
}

#[test]
fn iterate_object_values_in_insertion_order() {
    assert_eq!(
        values(".[]", r#"{"z":1,"a":2,"m":3}"#),
        vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]
    );
}

#[test]
fn alternative_fallback() {
    assert_eq!(values(".missing // 42", "{}"), vec![Value::Number(42.0)]);
    assert_eq!(values(".present // 42", r#"{"present":7}"#), vec![Value::Number(7.0)]);
}

#[test]
fn construction_picks_named_keys() {
    assert_eq!(
        values("{a,b}", r#"{"a":1,"b":2,"c":3}"#),
        vec![json(r#"{"a":1,"b":2}"#)]
    );
    assert_eq!(values("{user: .name}", PERSON), vec![json(r#"{"user":"John"}"#)]);
}

#[test]
fn array_construction_always_one_output() {
    assert_eq!(values("[.tags[]]", TAGS), vec![json(TAGS).get("tags").unwrap().clone()]);
    assert_eq!(values("[empty]", "null"), vec![Value::Array(vec![])]);
}

#[test]
fn comma_concatenates() {
    assert_eq!(
        values(".name, .age", PERSON),
        vec![json(r#""John""#), Value::Number(30.0)]
    );
}

#[test]
fn optional_absorbs_errors() {
    assert!(values(".tags[10]?", TAGS).is_empty());
    assert!(values("(.a.b.c.d)?", r#"{"a":{"b":{"c":5}}}"#).is_empty());
    assert!(values(".nonexistent?", PERSON).is_empty());
}

#[test]
fn parse_errors() {
    let cases: &[(&str, ParseError)] = &[
        ("", ParseError::EmptyFilter),
        ("..", ParseError::MalformedPath { pos: 0 }),
        ("...", ParseError::MalformedPath { pos: 0 }),
        (".tags[", ParseError::UnbalancedBrackets { pos: 5 }),
        (".tags]", ParseError::UnbalancedBrackets { pos: 5 }),
        (".tags[[]", ParseError::UnbalancedBrackets { pos: 5 }),
        (
            ".tags[-1]",
            ParseError::InvalidIndex {
                found: "-1".into(),
                pos: 6,
            },
        ),
        (
            ".tags[abc]",
            ParseError::InvalidIndex {
                found: "abc".into(),
                pos: 6,
            },
        ),
    ];
    for (text, expected) in cases {
        assert_eq!(&filter::parse(text).unwrap_err(), expected, "{text:?}");
    }
    assert!(matches!(
        filter::parse(r#".["key with spaces"]"#),
        Err(ParseError::UnsupportedSyntax { pos: 2, .. })
    ));
    assert!(matches!(
        filter::parse(r#""\u+041""#),
        Err(ParseError::InvalidString { .. })
    ));
    let deep = format!("{}.{}", "(".repeat(100_000), ")".repeat(100_000));
    assert!(matches!(
        filter::parse(&deep),
        Err(ParseError::NestingTooDeep { .. })
    ));
}

#[test]
fn pipe_binds_looser_than_comma() {
    let input = r#"{"a":{"c":1},"b":{"c":2}}"#;
    assert_eq!(
        values(".a, .b | .c", input),
        vec![Value::Number(1.0), Value::Number(2.0)]
    );
    assert_eq!(
        values(".a, (.b | .c)", input),
        vec![json(r#"{"c":1}"#), Value::Number(2.0)]
    );
}

#[test]
fn parsing_is_deterministic() {
    let text = r#"{a: .x[1:3], b: [.y[] | .z?]} // null"#;
    assert_eq!(filter::parse(text).unwrap(), filter::parse(text).unwrap());
}

#[test]
fn shared_filter_across_threads() {
    let parsed = filter::parse(".n").unwrap();
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let parsed = &parsed;
                s.spawn(move || {
                    let input = Value::Object(vec![("n".into(), Value::Number(i as f64))]);
                    filter::evaluate(parsed, &input).unwrap()
                })
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap(), vec![Value::Number(i as f64)]);
        }
    });
}

#[test]
fn run_combines_parse_and_eval() {
    let input = json(PERSON);
    assert_eq!(hason::run(".age", &input).unwrap(), vec![Value::Number(30.0)]);
    assert!(matches!(hason::run(".[", &input), Err(hason::Error::Parse(_))));
    assert!(matches!(hason::run(".x", &input), Err(hason::Error::Eval(_))));
}

#[test]
fn stream_evaluation() {
    let inputs = hason::input::parse_stream("{\"a\":1}\n{\"a\":2}").unwrap();
    let parsed = filter::parse(".a").unwrap();
    assert_eq!(
        filter::eval::evaluate_stream(&parsed, &inputs).unwrap(),
        vec![Value::Number(1.0), Value::Number(2.0)]
    );
}
