//! Live tests against the real OpenAI API.
//!
//! These tests require OPENAI_API_KEY to be set and spend a few tokens.
//!
//! Run with: cargo test --features integ_test --test live_openai

#[cfg(feature = "integ_test")]
mod tests {
    use alfred::relay::message::{ContentPart, Turn};
    use alfred::relay::openai::{self, Completer};

    fn api_key() -> Option<String> {
        std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())
    }

    /// The persona plus a greeting should produce some reply text.
    #[tokio::test]
    async fn test_live_completion() {
        let Some(key) = api_key() else {
            eprintln!("Skipping test: OPENAI_API_KEY not set");
            return;
        };

        let client = openai::Client::new(
            key,
            openai::DEFAULT_API_BASE.to_string(),
            openai::DEFAULT_MODEL.to_string(),
        );
        let turns = vec![
            Turn::system(alfred::relay::history::DEFAULT_PERSONA),
            Turn::user(vec![ContentPart::text("alfred, say hi in three words\n")]),
        ];

        let reply = client.complete(&turns).await;
        assert!(reply.is_ok(), "Completion failed: {:?}", reply.err());
        assert!(!reply.unwrap().trim().is_empty());
    }

    /// A bad key is reported as an API error, not a panic.
    #[tokio::test]
    async fn test_live_bad_key_is_api_error() {
        let client = openai::Client::new(
            "sk-invalid".to_string(),
            openai::DEFAULT_API_BASE.to_string(),
            openai::DEFAULT_MODEL.to_string(),
        );
        let turns = vec![Turn::user(vec![ContentPart::text("hi")])];

        let err = client.complete(&turns).await.unwrap_err();
        assert!(matches!(err, openai::Error::Api(_)), "unexpected error: {err}");
    }
}
