use futures_util::stream;
use inference_api::{FragmentStream, InferenceApiError, SseLineParser};
use pretty_assertions::assert_eq;

fn delta(content: &str) -> String {
    format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{content}\"}}}}]}}\n")
}

#[test]
fn sse_parser_yields_fragments_then_stops_at_done() {
    let body = format!("{}{}data: [DONE]\n{}", delta("Hel"), delta("lo"), delta("ignored"));
    assert_eq!(SseLineParser::parse_body(&body), vec!["Hel", "lo"]);
}

#[test]
fn sse_parser_skips_malformed_line_between_valid_ones() {
    let body = format!("{}data: {{not json\n{}data: [DONE]\n", delta("Hel"), delta("lo"));
    assert_eq!(SseLineParser::parse_body(&body), vec!["Hel", "lo"]);
}

#[test]
fn sse_parser_ignores_keepalives_comments_and_empty_deltas() {
    let body = format!(
        ": OPENROUTER PROCESSING\n\nevent: ping\n{}data: {{\"choices\":[{{\"delta\":{{\"role\":\"assistant\"}}}}]}}\n{}",
        delta(""),
        delta("ok")
    );
    assert_eq!(SseLineParser::parse_body(&body), vec!["ok"]);
}

#[test]
fn sse_parser_accepts_data_without_space_and_crlf_endings() {
    let body = "data:{\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\r\ndata: [DONE]\r\n";
    assert_eq!(SseLineParser::parse_body(body), vec!["a"]);
}

#[test]
fn sse_parser_flushes_unterminated_last_line() {
    let mut parser = SseLineParser::default();
    assert!(parser
        .feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}")
        .is_empty());
    assert_eq!(parser.finish(), vec!["tail"]);
    assert!(parser.is_done());
    assert!(parser.feed(delta("late").as_bytes()).is_empty());
}

fn chunks(parts: Vec<&str>) -> FragmentStream {
    let items = parts
        .into_iter()
        .map(|part| Ok::<_, InferenceApiError>(part.as_bytes().to_vec()))
        .collect::<Vec<_>>();
    FragmentStream::from_byte_stream(stream::iter(items))
}

#[tokio::test]
async fn fragment_stream_yields_hel_then_lo_then_ends() {
    let first = delta("Hel");
    let second = delta("lo");
    let (a, b) = first.split_at(10);
    let after = delta("after");
    let mut fragments = chunks(vec![a, b, second.as_str(), "data: [DONE]\n", after.as_str()]);

    assert_eq!(fragments.next_fragment().await.map(Result::ok), Some(Some("Hel".to_string())));
    assert_eq!(fragments.next_fragment().await.map(Result::ok), Some(Some("lo".to_string())));
    assert!(fragments.next_fragment().await.is_none());
    assert!(fragments.is_finished());
    assert!(fragments.next_fragment().await.is_none());
}

#[tokio::test]
async fn fragment_stream_surfaces_transport_error_once() {
    let first = delta("partial");
    let items: Vec<Result<Vec<u8>, InferenceApiError>> = vec![
        Ok(first.into_bytes()),
        Err(InferenceApiError::MissingContent {
            body: "connection dropped".to_string(),
        }),
        Ok(delta("never").into_bytes()),
    ];
    let mut fragments = FragmentStream::from_byte_stream(stream::iter(items));

    assert_eq!(
        fragments.next_fragment().await.map(Result::ok),
        Some(Some("partial".to_string()))
    );
    assert!(matches!(fragments.next_fragment().await, Some(Err(_))));
    assert!(fragments.next_fragment().await.is_none());
}
