#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weave_template::{
    HelperRegistry, MalformedBlockPolicy, TemplateCompiler, TemplateConfig, Value, scope,
};

#[derive(Debug, Arbitrary)]
struct Input {
    source: String,
    items: Vec<String>,
    escape: bool,
}

fuzz_target!(|input: Input| {
    let helpers = HelperRegistry::new();
    let _ = helpers.register("upper", |args| {
        Value::from(
            args.first()
                .map(|v| v.to_text().to_uppercase())
                .unwrap_or_default(),
        )
    });
    let config = TemplateConfig {
        malformed_blocks: MalformedBlockPolicy::Empty,
        escape: input.escape,
    };
    let compiler = TemplateCompiler::with_config(helpers, config);
    let Ok(template) = compiler.compile(input.source.as_str()) else {
        return;
    };

    let items: Vec<Value> = input
        .items
        .iter()
        .map(|name| Value::from(scope! { "name" => name.as_str() }))
        .collect();
    let data = scope! { "items" => items, "title" => "t" };
    let _ = template.render(&data);
});
