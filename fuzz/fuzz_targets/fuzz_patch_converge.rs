#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weave_dom::Dom;
use weave_patch::{PatchCompiler, PatchConfig};

#[derive(Debug, Arbitrary)]
struct Input {
    before: String,
    after: String,
    structural: bool,
}

fuzz_target!(|input: Input| {
    let config = if input.structural {
        PatchConfig::structural()
    } else {
        PatchConfig::default()
    };
    let mut compiler = PatchCompiler::with_config(config);
    let (Ok(before), Ok(after)) = (
        compiler.create_patch(input.before.as_str()),
        compiler.create_patch(input.after.as_str()),
    ) else {
        return;
    };

    let mut dom = Dom::new();
    let root = dom.create_element("div");
    before.apply(&mut dom, &root, None).expect("compiled patch is balanced");
    after.apply(&mut dom, &root, None).expect("compiled patch is balanced");

    let mut fresh = Dom::new();
    let fresh_root = fresh.create_element("div");
    after.apply(&mut fresh, &fresh_root, None).expect("compiled patch is balanced");

    assert_eq!(dom.inner_markup(root), fresh.inner_markup(fresh_root));
});
