//! Integration tests against the live Gemini API.
//! These tests require an API key in the environment to run.

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use portfolio_assistant::chat::{TurnOutcome, TurnState};
    use portfolio_assistant::{
        AssistantConfig, ChatView, Content, Gemini, GenerateContentRequest, Model,
        PlainTextRenderer, ReplyFragment, SessionManager,
    };

    #[tokio::test]
    async fn test_streaming_response() {
        // This test requires API_KEY to be set
        let Ok(api_key) = std::env::var("API_KEY") else {
            eprintln!("Skipping test: API_KEY not set");
            return;
        };

        let client = Gemini::new(api_key).expect("Failed to create client");
        let request = GenerateContentRequest::new(vec![Content::user("Count to 3")]);

        let stream = client.stream(&Model::default(), request).await;
        assert!(stream.is_ok(), "Stream request should succeed");

        let chunks: Vec<_> = stream.unwrap().collect().await;
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|chunk| chunk.is_ok()));
    }

    #[tokio::test]
    async fn test_portfolio_question() {
        if std::env::var("API_KEY").is_err() {
            eprintln!("Skipping test: API_KEY not set");
            return;
        }

        let manager = SessionManager::new(AssistantConfig::new());
        let fragments: Vec<ReplyFragment> = manager
            .stream_reply("What projects has Methodias built?")
            .expect("API_KEY is set")
            .collect()
            .await;
        assert!(!fragments.is_empty());
        assert!(
            !fragments.iter().any(ReplyFragment::is_apology),
            "Reply should not fall back to the apology"
        );

        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        let mut view = ChatView::new();
        view.set_input("How can I contact him?");
        assert_eq!(view.send(&manager, &mut renderer).await, TurnOutcome::Completed);
        assert_eq!(view.turn_state(), TurnState::Idle);
        assert!(!view.messages()[2].text.is_empty());
    }
}
