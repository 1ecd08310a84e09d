#[cfg(test)]
mod units {
    use crate::optimize::TraceFrame;
    use crate::report::write_trace;

    #[test]
    fn trace_file_packs_two_floats_per_evaluation() {
        let frames = vec![
            TraceFrame {
                objective: 1.5,
                time: 0.5,
            },
            TraceFrame {
                objective: 1.25,
                time: 0.25,
            },
        ];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.bin");
        write_trace(&path, &frames).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), frames.len() * 8);

        let first = f32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let second = f32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(first, 1.5);
        assert_eq!(second, 0.5);

        let third = f32::from_le_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(third, 1.25);
    }

    #[test]
    fn empty_trace_writes_an_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.bin");
        write_trace(&path, &[]).unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), 0);
    }
}
