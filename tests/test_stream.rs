use coolipc::http::stream::ByteStream;

#[test]
fn test_stream_cursors_track_reads_and_writes() {
    let mut stream = ByteStream::new(16);
    assert_eq!(stream.capacity(), 16);
    assert_eq!(stream.writable_size(), 16);

    assert_eq!(stream.write(b"hello"), 5);
    assert_eq!(stream.len(), 5);
    assert_eq!(stream.writable_size(), 11);

    assert_eq!(stream.take(2), b"he");
    assert_eq!(stream.len(), 3);
    assert_eq!(stream.peek(10), b"llo");
    assert_eq!(stream.len(), 3);
}

#[test]
fn test_stream_write_truncates_at_capacity() {
    let mut stream = ByteStream::new(4);
    assert_eq!(stream.write(b"abcdef"), 4);
    assert_eq!(stream.as_slice(), b"abcd");
    assert_eq!(stream.write(b"x"), 0);
}

#[test]
fn test_stream_direct_fill_through_writable_buffer() {
    let mut stream = ByteStream::new(8);
    stream.writable_buffer()[..3].copy_from_slice(b"abc");
    stream.advance_written(3);
    assert_eq!(stream.as_slice(), b"abc");

    // Never commits more than the free space.
    stream.advance_written(100);
    assert_eq!(stream.len(), 8);
}

#[test]
fn test_stream_find_single_byte_and_sequence() {
    let stream = ByteStream::from("GET / HTTP/1.1\r\n");
    assert_eq!(stream.find(b" "), Some(3));
    assert_eq!(stream.find(b"\r\n"), Some(14));
    assert_eq!(stream.find(b"\n\n"), None);
}

#[test]
fn test_take_until_found_leaves_delimiter() {
    let mut stream = ByteStream::from("Host: t");
    let (prefix, found) = stream.take_until(b":");
    assert_eq!(prefix, b"Host");
    assert!(found);
    assert_eq!(stream.as_slice(), b": t");
}

#[test]
fn test_take_until_missing_consumes_everything() {
    let mut stream = ByteStream::from("abc");
    let (prefix, found) = stream.take_until(b" ");
    assert_eq!(prefix, b"abc");
    assert!(!found);
    assert!(stream.is_empty());
}

#[test]
fn test_take_until_keeps_partial_delimiter_at_tail() {
    let mut stream = ByteStream::new(32);
    stream.write(b"HTTP/1.1\r");

    let (prefix, found) = stream.take_until(b"\r\n");
    assert_eq!(prefix, b"HTTP/1.1");
    assert!(!found);
    assert_eq!(stream.as_slice(), b"\r");

    stream.write(b"\nHost");
    let (prefix, found) = stream.take_until(b"\r\n");
    assert!(prefix.is_empty());
    assert!(found);
}

#[test]
fn test_take_until_mismatched_tail_is_content() {
    let mut stream = ByteStream::from("ab\rc");
    let (prefix, found) = stream.take_until(b"\r\n");
    assert_eq!(prefix, b"ab\rc");
    assert!(!found);
}

#[test]
fn test_realign_reclaims_consumed_space() {
    let mut stream = ByteStream::new(8);
    stream.write(b"abcdefgh");
    stream.skip(6);
    assert_eq!(stream.writable_size(), 0);

    stream.realign();
    assert_eq!(stream.as_slice(), b"gh");
    assert_eq!(stream.writable_size(), 6);
    stream.write(b"ij");
    assert_eq!(stream.as_slice(), b"ghij");
}
