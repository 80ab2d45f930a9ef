#![no_main]
use hason::filter::ParseError;
use libfuzzer_sys::fuzz_target;

// Arbitrary UTF-8 into the filter parser. Any filter that parses must
// render back to text that parses to the same tree.
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(filter) = hason::filter::parse(s) {
        let rendered = filter.to_string();
        match hason::filter::parse(&rendered) {
            Ok(reparsed) => assert_eq!(reparsed, filter, "{s:?} -> {rendered:?}"),
            // Rendering parenthesises every composite, so a filter near the
            // nesting limit can render past it.
            Err(ParseError::NestingTooDeep { .. }) => {}
            Err(e) => panic!("{s:?} rendered as {rendered:?} failed to reparse: {e}"),
        }
    }
});
