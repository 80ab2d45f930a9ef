#![no_main]
use libfuzzer_sys::fuzz_target;
use hason::filter;
use hason::output::format_compact;
use hason::value::Value;

// Split input into JSON + filter, parse both, evaluate.
// Catches panics in builtins, slicing, index conversion and construction.
fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    // First 2 bytes determine split point between JSON and filter.
    let split = u16::from_le_bytes([data[0], data[1]]) as usize;
    let rest = &data[2..];
    let split = split % rest.len();

    let (json_part, filter_part) = rest.split_at(split);
    let Ok(filter_str) = std::str::from_utf8(filter_part) else {
        return;
    };
    let Ok(filter) = filter::parse(filter_str) else {
        return;
    };
    let Ok(json_str) = std::str::from_utf8(json_part) else {
        return;
    };
    let Ok(value) = Value::from_json(json_str) else {
        return;
    };

    // Render at most 1000 outputs; later ones are dropped to bound
    // cross-product fan-out in the writer.
    let mut count = 0;
    let _ = filter::eval::eval_filter(&filter, &value, &mut |v: Value| {
        if count < 1000 {
            count += 1;
            let _ = format_compact(&v);
        }
        Ok(())
    });
});
