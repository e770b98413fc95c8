//! Integration tests for the agent client against a live generation server.
//!
//! Run with: `AGENT_URL=http://localhost:30000 cargo test -p agent -- --ignored`

use agent::{AgentClient, AgentConfig};

fn client_or_skip() -> AgentClient {
    let url = std::env::var("AGENT_URL").expect("AGENT_URL not set");
    AgentClient::new(AgentConfig {
        server_url: url,
        ..AgentConfig::default()
    })
    .expect("valid AGENT_URL")
}

#[tokio::test]
#[ignore]
async fn test_query_respects_count() {
    let client = client_or_skip();
    let candidates = client
        .query("proof (prove)\ngoal (1 subgoal):\n 1. p ⟹ q ⟹ p", 4)
        .await
        .unwrap();
    assert!(candidates.len() <= 4);
    for c in &candidates {
        assert!(!c.command.trim().is_empty());
        assert!(!c.logit.is_nan());
    }
}

#[tokio::test]
#[ignore]
async fn test_query_batch_aligned() {
    let client = client_or_skip();
    let prompts = vec![
        "goal (1 subgoal):\n 1. True".to_string(),
        "goal (1 subgoal):\n 1. p ∧ q ⟹ q ∧ p".to_string(),
    ];
    let lists = client.query_batch(&prompts, 2).await.unwrap();
    assert_eq!(lists.len(), 2);
}
