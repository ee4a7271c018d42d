//! Property tests for frame reassembly.

use proptest::prelude::*;
use relay_httpx::FrameReassembler;

fn reassemble(chunks: &[Vec<u8>]) -> (Vec<Vec<u8>>, Vec<u8>) {
    let mut reassembler = FrameReassembler::default();
    let mut frames = Vec::new();
    for chunk in chunks {
        reassembler.push(chunk);
        frames.extend(reassembler.drain_frames().map(|f| f.to_vec()));
    }
    let rest = reassembler
        .take_remainder()
        .map(|r| r.to_vec())
        .unwrap_or_default();
    (frames, rest)
}

proptest! {
    #[test]
    fn frames_concatenate_to_input(
        chunks in prop::collection::vec(
            prop::collection::vec(prop_oneof![Just(b'\n'), Just(b'a'), Just(b':')], 0..16),
            0..16,
        )
    ) {
        let (frames, rest) = reassemble(&chunks);
        let mut joined: Vec<u8> = frames.concat();
        joined.extend_from_slice(&rest);
        prop_assert_eq!(joined, chunks.concat());
    }

    #[test]
    fn every_frame_ends_with_newline(
        chunks in prop::collection::vec(
            prop::collection::vec(prop_oneof![Just(b'\n'), Just(b'x')], 0..16),
            0..16,
        )
    ) {
        let (frames, rest) = reassemble(&chunks);
        for frame in &frames {
            prop_assert_eq!(frame.last(), Some(&b'\n'));
            let inner = &frame[..frame.len() - 1];
            // At most one extra newline, and only directly before the terminator.
            let body_newlines = inner.iter().filter(|&&b| b == b'\n').count();
            prop_assert!(body_newlines <= 1);
            if body_newlines == 1 {
                prop_assert_eq!(inner.last(), Some(&b'\n'));
            }
        }
        prop_assert!(!rest.contains(&b'\n'));
    }

    #[test]
    fn chunking_does_not_change_single_newline_frames(
        text in "[a-z]{1,8}(\n[a-z]{1,8}){0,6}\n",
        split in 0usize..64,
    ) {
        let bytes = text.as_bytes().to_vec();
        let at = split.min(bytes.len());
        let whole = reassemble(&[bytes.clone()]);
        let parts = reassemble(&[bytes[..at].to_vec(), bytes[at..].to_vec()]);
        prop_assert_eq!(whole, parts);
    }
}
