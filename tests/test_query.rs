use coolipc::ParseError;
use coolipc::http::query::{self, ArgTable, parse_query};
use pretty_assertions::assert_eq;

fn pairs(args: &ArgTable) -> Vec<(&str, &str)> {
    args.iter().map(|a| (a.name(), a.value())).collect()
}

#[test]
fn test_parse_query_splits_path_and_args() {
    let (resource, args) = parse_query("/fans?pwm=50&temp=30").unwrap();
    assert_eq!(resource, "/fans");
    assert_eq!(pairs(&args), vec![("pwm", "50"), ("temp", "30")]);
}

#[test]
fn test_parse_query_without_query_string() {
    let (resource, args) = parse_query("/info").unwrap();
    assert_eq!(resource, "/info");
    assert!(args.is_empty());
}

#[test]
fn test_parse_query_decodes_both_halves() {
    let (_, args) = parse_query("/x?na%20me=a%2Bb%3Dc").unwrap();
    assert_eq!(args.value("na me"), Some("a+b=c"));
}

#[test]
fn test_parse_query_skips_empty_segments_and_defaults_value() {
    let (_, args) = parse_query("/x?a=1&&flag&b=").unwrap();
    assert_eq!(pairs(&args), vec![("a", "1"), ("flag", ""), ("b", "")]);
}

#[test]
fn test_arg_names_are_case_sensitive_and_first_wins() {
    let (_, args) = parse_query("/x?a=1&A=2&a=3").unwrap();
    assert_eq!(args.value("a"), Some("1"));
    assert_eq!(args.value("A"), Some("2"));
    assert_eq!(args.len(), 2);
}

#[test]
fn test_arg_table_renders_encoded_query() {
    let mut args = ArgTable::new();
    args.add("curve", "20-30 40-50");
    args.add("mode", 2);
    assert_eq!(args.to_string(), "?curve=20-30%2040-50&mode=2");
    assert_eq!(ArgTable::new().to_string(), "");
}

#[test]
fn test_encode_keeps_unreserved_characters() {
    assert_eq!(query::encode(b"AZaz09-_~."), "AZaz09-_~.");
    assert_eq!(query::encode(b"a/b?c&d"), "a%2Fb%3Fc%26d");
    assert_eq!(query::encode(&[0x00, 0xff]), "%00%FF");
}

#[test]
fn test_decode_accepts_either_hex_case() {
    assert_eq!(query::decode("%2f%2F"), b"//".to_vec());
}

#[test]
fn test_decode_keeps_malformed_escapes() {
    assert_eq!(query::decode("100%"), b"100%".to_vec());
    assert_eq!(query::decode("%zz"), b"%zz".to_vec());
}

#[test]
fn test_codec_round_trips_every_byte() {
    let all: Vec<u8> = (0..=255u8).collect();
    assert_eq!(query::decode(&query::encode(&all)), all);

    for byte in 0..=255u8 {
        let data = [b'a', byte, b'z'];
        assert_eq!(query::decode(&query::encode(&data)), data.to_vec());
    }
}

#[test]
fn test_non_utf8_argument_is_rejected() {
    assert_eq!(parse_query("/x?k=%FF"), Err(ParseError::InvalidEncoding));
    assert_eq!(parse_query("/x?%C3=1"), Err(ParseError::InvalidEncoding));
    assert_eq!(ArgTable::from_query("k=%C3%A9").unwrap().value("k"), Some("é"));
}
