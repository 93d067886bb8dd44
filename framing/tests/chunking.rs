use framing::{Deframer, FramingMode, JsonDeframer, RawFrame};

const STREAMS: &[&str] = &[
    r#"{"temperature": 42.5}{"accel":[-5,3,-8]}"#,
    r#"{"device":2,"status":"online","battery":80}{"VB1":12.1,"VB2":24,"VB3":"48.0"}{"partial"#,
    "boot\r\n{\"a\":1}garbage}{\"b\":2}",
    r#"{"orientation":[1.5,-0.25,90]}{"note":"°C ✓"}"#,
    r#"{"a":{"nested":true}}{"s":"brace } inside"}"#,
];

fn whole(mode: FramingMode, stream: &str) -> (Vec<RawFrame>, String) {
    let mut deframer = JsonDeframer::new(mode);
    let frames = deframer.feed(stream).collect();

    (frames, deframer.buffered().to_string())
}

fn char_by_char(mode: FramingMode, stream: &str) -> (Vec<RawFrame>, String) {
    let mut deframer = JsonDeframer::new(mode);
    let mut frames = Vec::new();
    let mut utf8 = [0u8; 4];

    for c in stream.chars() {
        frames.extend(deframer.feed(c.encode_utf8(&mut utf8)));
    }

    (frames, deframer.buffered().to_string())
}

#[test]
fn first_brace_is_independent_of_chunking() {
    for stream in STREAMS {
        assert_eq!(
            whole(FramingMode::FirstBrace, stream),
            char_by_char(FramingMode::FirstBrace, stream),
            "stream: {stream}"
        );
    }
}

#[test]
fn balanced_is_independent_of_chunking() {
    for stream in STREAMS {
        assert_eq!(
            whole(FramingMode::Balanced, stream),
            char_by_char(FramingMode::Balanced, stream),
            "stream: {stream}"
        );
    }
}

#[test]
fn frames_adapter_matches_feed() {
    for stream in STREAMS {
        let chunks: Vec<String> = stream.chars().map(String::from).collect();

        let adapted: Vec<RawFrame> = JsonDeframer::default().frames(chunks.iter()).collect();

        assert_eq!(adapted, whole(FramingMode::FirstBrace, stream).0);
    }
}
