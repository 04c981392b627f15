#![forbid(unsafe_code)]

//! Integration tests: template compile and render behavior.

use pretty_assertions::assert_eq;
use tracing_test::traced_test;
use weave_harness::fixtures::{CARD_TEMPLATE, LIST_TEMPLATE, card_scope, list_scope, sample_helpers};
use weave_template::{
    BlockFault, HelperRegistry, HelperReply, MalformedBlockPolicy, RegistryError, TemplateCompiler,
    TemplateConfig, TemplateError, Value, scope,
};

fn compiler() -> TemplateCompiler {
    TemplateCompiler::new(sample_helpers())
}

fn render(source: &str, data: &weave_template::Scope) -> String {
    compiler().compile(source).unwrap().render(data)
}

// ============================================================================
// Interpolation
// ============================================================================

#[test]
fn missing_values_render_empty() {
    assert_eq!(render("#{x}", &scope! { "x" => 5 }), "5");
    assert_eq!(render("#{x}", &scope! {}), "");
    assert_eq!(render("#{a.b}", &scope! {}), "");
    assert_eq!(render("#{a.b.c}", &scope! { "a" => 1 }), "");
}

#[test]
fn helpers_win_over_data() {
    assert_eq!(render("#{greet}", &scope! {}), "hi");
    assert_eq!(render("#{greet}", &scope! { "greet" => "bye" }), "hi");
}

#[test]
fn helper_calls_take_paths_and_literals() {
    let data = scope! { "user" => scope! { "name" => "ada" } };
    assert_eq!(render("#{upper(user.name)}", &data), "ADA");
    assert_eq!(render("#{join(user.name, 'and', 2)}", &data), "ada and 2");
}

#[test]
fn composites_render_structurally() {
    let data = scope! { "post" => scope! { "title" => "X", "tags" => vec!["a"] } };
    assert_eq!(render("#{post}", &data), r#"{title: "X", tags: ["a"]}"#);
}

// ============================================================================
// Blocks
// ============================================================================

#[test]
fn each_renders_items_in_order() {
    assert_eq!(
        render(LIST_TEMPLATE, &list_scope(&["X", "Y"])),
        "<ul><li>X</li><li>Y</li></ul>"
    );
    assert_eq!(render(LIST_TEMPLATE, &list_scope(&[])), "<ul></ul>");
    assert_eq!(render(LIST_TEMPLATE, &scope! {}), "<ul></ul>");
}

#[test]
fn each_sees_outer_scope_and_item_bindings() {
    let data = scope! { "sep" => ",", "names" => vec!["a", "b"] };
    assert_eq!(
        render("{{each names}}#{@index}=#{this}#{sep}{{/each}}", &data),
        "0=a,1=b,"
    );
}

#[test]
fn sequential_blocks_are_independent() {
    let data = scope! { "a" => vec![1, 2], "b" => vec![3] };
    assert_eq!(
        render("{{each a}}#{this}{{/each}}|{{each b}}#{this}{{/each}}", &data),
        "12|3"
    );
}

#[test]
fn card_template_renders_keyed_markup() {
    let out = render(CARD_TEMPLATE, &card_scope(&[(7, "T", "B")]));
    assert_eq!(
        out,
        r#"<section class="cards"><article id="card-7"><h2>T</h2><p>B</p></article></section>"#
    );
}

// ============================================================================
// Malformed blocks
// ============================================================================

#[test]
fn malformed_blocks_fail_by_default() {
    let err = compiler().compile("{{each a}}x{{/b}}").unwrap_err();
    assert!(matches!(
        err,
        TemplateError::MalformedBlock {
            fault: BlockFault::Mismatched { .. },
            ..
        }
    ));
    assert!(compiler().compile("{{each a}}x").is_err());
    assert!(compiler().compile("x{{/each}}").is_err());
    assert!(compiler().compile("{{each a}}{{each b}}{{/each}}{{/each}}").is_err());
}

#[traced_test]
#[test]
fn malformed_blocks_render_empty_under_empty_policy() {
    let config = TemplateConfig {
        malformed_blocks: MalformedBlockPolicy::Empty,
        ..TemplateConfig::default()
    };
    let compiler = TemplateCompiler::with_config(HelperRegistry::new(), config);
    let template = compiler.compile("{{each a}}x{{/b}}").unwrap();
    assert_eq!(template.render(&scope! { "a" => vec![1] }), "");
    assert!(logs_contain("malformed block"));
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn registry_changes_are_visible_to_compiled_templates() {
    let helpers = HelperRegistry::new();
    let compiler = TemplateCompiler::new(helpers.clone());
    let template = compiler.compile("#{late}").unwrap();
    assert_eq!(template.render(&scope! {}), "");

    let definition = Value::Helper(weave_template::Helper::new(|_| Value::from("now")));
    let reply = helpers.helper(&Value::from("late"), Some(&definition)).unwrap();
    assert!(matches!(reply, HelperReply::Registry(_)));
    assert_eq!(template.render(&scope! {}), "now");
}

#[test]
fn registry_rejects_bad_definitions() {
    let helpers = HelperRegistry::new();
    assert_eq!(
        helpers.helper(&Value::from("x"), Some(&Value::from(1))).unwrap_err(),
        RegistryError::InvalidArgument("expecting definition to be a function".into())
    );
    assert!(helpers.helper(&Value::Null, None).is_err());
    assert!(helpers.is_empty());
}
