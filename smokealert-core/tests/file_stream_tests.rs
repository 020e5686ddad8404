//! Tests for the CSV record source

#[cfg(feature = "stream-file")]
mod tests {
    use smokealert_core::{
        stream::{CsvStream, Stream, StreamError},
        MemoryBroker, StreamRouter,
    };
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Time (UTC),Channel1 Smoker Temp,Channel2 Food A Temp,Channel3 Food B Temp";

    #[test]
    fn test_csv_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "{}", HEADER).unwrap();
        writeln!(temp_file, "03/23/2022 15:38:00,35,,").unwrap();
        writeln!(temp_file, "03/23/2022 15:38:30,36,120,").unwrap();
        temp_file.flush().unwrap();

        let mut stream = CsvStream::open(temp_file.path()).unwrap();

        let first = stream.poll_next().unwrap();
        assert_eq!(first.timestamp(), "03/23/2022 15:38:00");
        assert_eq!(first.field(1), Some("35"));
        assert_eq!(first.field(3), Some(""));

        let second = stream.poll_next().unwrap();
        assert_eq!(second.field(2), Some("120"));

        assert!(matches!(stream.poll_next(), Err(nb::Error::Other(StreamError::EndOfStream))));
        assert_eq!(stream.stats().records_read, 2);
        assert_eq!(stream.stats().parse_errors, 0);
    }

    #[test]
    fn test_missing_file_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = CsvStream::open(dir.path().join("missing.csv"));
        assert!(matches!(result, Err(StreamError::Transport(_))));
    }

    #[test]
    fn test_header_only_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "{}", HEADER).unwrap();
        temp_file.flush().unwrap();

        let mut stream = CsvStream::open(temp_file.path()).unwrap();
        assert!(matches!(stream.poll_next(), Err(nb::Error::Other(StreamError::EndOfStream))));
    }

    #[test]
    fn test_non_utf8_row_skipped() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "{}", HEADER).unwrap();
        temp_file.write_all(b"12:00:00,\xff\xfe,1,2\n").unwrap();
        writeln!(temp_file, "12:00:30,300,225,180").unwrap();
        temp_file.flush().unwrap();

        let mut stream = CsvStream::open(temp_file.path()).unwrap();
        let record = stream.poll_next().unwrap();
        assert_eq!(record.timestamp(), "12:00:30");
        assert_eq!(stream.stats().parse_errors, 1);
    }

    #[test]
    fn test_csv_file_through_router() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "{}", HEADER).unwrap();
        writeln!(temp_file, "03/23/2022 15:38:00,35,,").unwrap();
        writeln!(temp_file, "03/23/2022 15:38:30,36,120,118").unwrap();
        writeln!(temp_file, "03/23/2022 15:39:00,abc,121,119").unwrap();
        temp_file.flush().unwrap();

        let broker = MemoryBroker::new();
        let mut source = CsvStream::open(temp_file.path()).unwrap();
        let stats = StreamRouter::new(broker.channel()).run(&mut source).unwrap();

        assert_eq!(stats.records_read, 3);
        assert_eq!(stats.messages_published, 6);
        assert_eq!(stats.values_dropped, 3);
        assert_eq!(broker.queue_len("01-smoker"), Some(2));
        assert_eq!(broker.queue_len("02-food-A"), Some(2));
        assert_eq!(broker.queue_len("03-food-B"), Some(2));
    }

    #[test]
    fn test_quoted_timestamp_with_comma_dropped_by_router() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "{}", HEADER).unwrap();
        writeln!(temp_file, "\"Mar 23, 2022 15:38\",300,225,180").unwrap();
        writeln!(temp_file, "03/23/2022 15:38:30,301,226,181").unwrap();
        temp_file.flush().unwrap();

        let broker = MemoryBroker::new();
        let mut source = CsvStream::open(temp_file.path()).unwrap();
        let stats = StreamRouter::new(broker.channel()).run(&mut source).unwrap();

        assert_eq!(stats.records_read, 2);
        assert_eq!(stats.messages_published, 3);
        assert_eq!(stats.values_dropped, 3);
        assert_eq!(broker.queue_len("01-smoker"), Some(1));
    }
}
