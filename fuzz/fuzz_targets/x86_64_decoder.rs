#![no_main]

use libfuzzer_sys::fuzz_target;
use x64scan_disasm::{Decoder, DecoderOptions};

fuzz_target!(|data: &[u8]| {
    let options = DecoderOptions::default().with_base_address(0x1000);

    // Every record must start where the previous one ended, and together
    // they must cover the whole input.
    let mut expected = 0;
    for record in Decoder::new(data, options) {
        let (start, len) = match &record {
            Ok(insn) => {
                let _ = insn.to_string();
                (insn.offset, insn.length)
            }
            Err(err) => (err.start, err.bytes_consumed),
        };
        assert_eq!(start, expected);
        assert!(len >= 1);
        expected += len;
    }
    assert_eq!(expected, data.len());
});
