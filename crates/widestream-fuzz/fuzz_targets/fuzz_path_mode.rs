#![no_main]
use libfuzzer_sys::fuzz_target;
use widestream_core::{NativePath, OpenMode, narrow, parse_mode, widen};

fuzz_target!(|data: &[u8]| {
    if let Some(flags) = parse_mode(data) {
        assert!(flags.readable || flags.writable);
        assert!(!flags.exclusive || flags.create);
    }

    if let Some(&bits) = data.first() {
        let mut mode = OpenMode::empty();
        for (i, bit) in [
            OpenMode::IN,
            OpenMode::OUT,
            OpenMode::TRUNC,
            OpenMode::APP,
            OpenMode::BINARY,
        ]
        .into_iter()
        .enumerate()
        {
            if bits & (1 << i) != 0 {
                mode |= bit;
            }
        }
        if let Some(flags) = mode.to_flags() {
            assert!(flags.readable || flags.writable);
        }
    }

    // Valid UTF-8 survives widen/narrow unchanged.
    let wide = widen(data);
    if let Ok(text) = std::str::from_utf8(data) {
        assert_eq!(narrow(&wide), text);
    }

    if let Ok(path) = NativePath::encode(data) {
        assert!(!path.as_str().contains('\0'));
        assert_eq!(path.was_substituted(), std::str::from_utf8(data).is_err());
    }
});
