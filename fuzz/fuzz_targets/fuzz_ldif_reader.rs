#![no_main]

use libfuzzer_sys::fuzz_target;

use ldifber::ldif::{LdifReader, LdifReaderOptions, TrailingSpaceBehavior};

fuzz_target!(|data: &[u8]| {
    let options = LdifReaderOptions {
        trailing_space_behavior: TrailingSpaceBehavior::Retain,
        // Keep file: URLs from touching the filesystem.
        max_url_file_size: 0,
        ..LdifReaderOptions::default()
    };

    // Records that decode must survive a write and re-read unchanged.
    for record in LdifReader::with_options(data, &options).flatten() {
        let text = record.to_ldif_string(76);
        let mut reread = LdifReader::with_options(text.as_bytes(), &options);
        match reread.read_record() {
            Ok(Some(again)) => assert_eq!(again, record, "{text}"),
            other => panic!("re-read of {text:?} gave {other:?}"),
        }
    }
});
