//! End-to-end decoding of small code samples.

use x64scan_core::RepeatKind;
use x64scan_disasm::{decode, DecodeErrorKind, Decoder, DecoderOptions};

/// A short function body: load, increment, push, arithmetic and return.
const SAMPLE: &[u8] = &[
    0x48, 0x8b, 0x05, 0x1e, 0x00, 0x00, 0x00, // mov rax, [rip + 0x1e]
    0x48, 0xff, 0xc0, // inc rax
    0x50, // push rax
    0x48, 0x8b, 0x5d, 0xf8, // mov rbx, [rbp - 8]
    0x48, 0x29, 0xd8, // sub rax, rbx
    0x5b, // pop rbx
    0xc3, // ret
];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn sample_function_listing() {
    init_tracing();
    let listing: Vec<String> = decode(SAMPLE)
        .map(|r| r.expect("sample decodes cleanly").to_string())
        .collect();
    assert_eq!(
        listing,
        [
            "mov rax, qword ptr [rip + 0x1e]",
            "inc rax",
            "push rax",
            "mov rbx, qword ptr [rbp - 0x8]",
            "sub rax, rbx",
            "pop rbx",
            "ret",
        ]
    );
}

#[test]
fn sample_offsets_and_lengths() {
    let spans: Vec<(usize, usize)> = decode(SAMPLE)
        .map(|r| r.unwrap())
        .map(|insn| (insn.offset, insn.length))
        .collect();
    assert_eq!(
        spans,
        [(0, 7), (7, 3), (10, 1), (11, 4), (15, 3), (18, 1), (19, 1)]
    );
}

#[test]
fn sample_with_base_address() {
    let options = DecoderOptions::default().with_base_address(0x401000);
    let first = Decoder::new(SAMPLE, options).next().unwrap().unwrap();
    assert_eq!(first.address, Some(0x401000));
    assert_eq!(first.rip_target(), Some(0x401025));
    assert_eq!(
        first.to_string(),
        "mov rax, qword ptr [rip + 0x1e]  # 0x401025"
    );
}

#[test]
fn errors_do_not_stop_the_scan() {
    init_tracing();
    // pshufb (0f 38), add al, al, invalid 06, ud2, x87 d8, ret
    let code = [0x0f, 0x38, 0x00, 0xc0, 0x06, 0x0f, 0x0b, 0xd8, 0xc3];
    let records: Vec<_> = decode(&code).collect();

    let ok: Vec<&str> = records
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|insn| insn.mnemonic.as_str())
        .collect();
    assert_eq!(ok, ["add", "ud2", "ret"]);

    let kinds: Vec<DecodeErrorKind> = records
        .iter()
        .filter_map(|r| r.as_ref().err())
        .map(|e| e.kind)
        .collect();
    assert!(matches!(kinds[0], DecodeErrorKind::UnsupportedEscapeMap(_)));
    assert!(matches!(kinds[1], DecodeErrorKind::UnknownOpcode { opcode: 0x06, .. }));
    assert!(matches!(kinds[2], DecodeErrorKind::UnsupportedInstruction { .. }));

    let total: usize = records
        .iter()
        .map(|r| match r {
            Ok(insn) => insn.length,
            Err(err) => err.bytes_consumed,
        })
        .sum();
    assert_eq!(total, code.len());
}

#[test]
fn string_copy_loop() {
    // rep movsq; repne scasb; cld
    let code = [0xf3, 0x48, 0xa5, 0xf2, 0xae, 0xfc];
    let insns: Vec<_> = decode(&code).map(|r| r.unwrap()).collect();
    assert_eq!(insns[0].prefixes.repeat, RepeatKind::Rep);
    assert_eq!(insns[0].to_string(), "rep movsq");
    assert_eq!(insns[1].prefixes.repeat, RepeatKind::Repnz);
    assert_eq!(insns[1].to_string(), "repnz scasb");
    assert_eq!(insns[2].to_string(), "cld");
}

#[test]
fn error_messages_are_descriptive() {
    let err = decode(&[0x0f, 0x3a, 0x0f]).next().unwrap().unwrap_err();
    assert_eq!(err.to_string(), "unsupported escape map 0f 3a at offset 0x0");

    let err = decode(&[0x48, 0xf3, 0x90]).next().unwrap().unwrap_err();
    assert_eq!(err.to_string(), "prefix byte 0xf3 after REX at offset 0x1");
}
