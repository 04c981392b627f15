#![no_main]

use libfuzzer_sys::fuzz_target;
use weave_markup::{FragmentParser, MarkupParser, NodeId};

fuzz_target!(|data: &[u8]| {
    let Ok(src) = std::str::from_utf8(data) else {
        return;
    };
    let parser = FragmentParser::new();
    let Ok(fragment) = parser.parse_fragment(src) else {
        return;
    };

    for id in fragment.descendants(NodeId::ROOT).skip(1) {
        let parent = fragment.parent(id).expect("non-root node has a parent");
        assert!(fragment.children(parent).contains(&id));
    }

    // Serialized output must parse again.
    let markup = fragment.to_markup();
    let _ = parser.parse_fragment(&markup);
});
