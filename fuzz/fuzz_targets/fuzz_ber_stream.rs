#![no_main]

use libfuzzer_sys::fuzz_target;

use ldifber::ber::{BerElement, BerStreamReader, StreamContainer};

fn walk(reader: &mut BerStreamReader<&[u8]>, container: Option<&StreamContainer>) -> bool {
    loop {
        let more = match container {
            Some(container) => reader.has_more_elements(container),
            None => reader.peek().map(|tag| tag.is_some()),
        };
        match more {
            Ok(true) => {}
            Ok(false) => return true,
            Err(_) => return false,
        }
        let Ok(Some(tag)) = reader.peek() else {
            return false;
        };
        let ok = if tag & 0x20 != 0 {
            match reader.begin_sequence() {
                Ok(child) => walk(reader, Some(&child)),
                Err(_) => false,
            }
        } else {
            reader.read_element().is_ok()
        };
        if !ok {
            return false;
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let mut reader = BerStreamReader::new(data).with_max_depth(16);
    walk(&mut reader, None);

    if let Ok(element) = BerElement::decode(data) {
        if element.is_constructed() {
            let _ = element.decode_as_children();
        }
        // Re-encoding uses the minimal length form; the value is unchanged.
        let again = BerElement::decode(&element.encode()).ok();
        assert_eq!(again.as_ref(), Some(&element));
    }
});
