#![no_main]

use libfuzzer_sys::fuzz_target;
use libpantry::parse_quantity;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(quantity) = parse_quantity(input) {
            assert!(quantity.value().is_finite(), "{:?} parsed to {}", input, quantity);
        }
    }
});
