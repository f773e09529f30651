//! End-to-end turn scenarios with the deterministic supervisor
//!
//! Drives the orchestrator across all three phases against the fixture
//! catalog, asserting on replies, returned products, and the shape and
//! ordering of the activity trace.

mod common;
mod fixtures;

use clickshop::services::LlmTurn;
use clickshop::{ActivityKind, Phase, TurnRequest, TurnResult};
use common::{
    orchestrator_with, orchestrator_with_oracle, FailingEmbeddingOracle, KeywordEmbeddingOracle,
    ScriptedOracle,
};
use std::sync::Arc;

fn kinds(result: &TurnResult) -> Vec<ActivityKind> {
    result.activity_trace.iter().map(|e| e.kind).collect()
}

fn first_index(result: &TurnResult, kind: ActivityKind) -> Option<usize> {
    result.activity_trace.iter().position(|e| e.kind == kind)
}

#[tokio::test]
async fn test_phase1_category_search() {
    let orchestrator = orchestrator_with(Arc::new(KeywordEmbeddingOracle::fixture())).await;

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Direct, "running shoes"))
        .await;

    let products = result.products.as_ref().expect("products expected");
    assert!(!products.is_empty());
    for scored in products {
        assert_eq!(scored.product.category.as_str(), "Running Shoes");
    }

    let kinds = kinds(&result);
    assert!(kinds.contains(&ActivityKind::Database));
    assert!(!kinds.contains(&ActivityKind::Embedding));
    assert!(!kinds.contains(&ActivityKind::Delegation));
}

#[tokio::test]
async fn test_phase1_no_match_explains() {
    let orchestrator = orchestrator_with(Arc::new(KeywordEmbeddingOracle::fixture())).await;

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Direct, "gear for my first marathon"))
        .await;

    assert!(result.products.is_none());
    assert!(result.reply_text.contains("couldn't find"));

    let search_events = result
        .activity_trace
        .iter()
        .filter(|e| e.kind == ActivityKind::Search)
        .count();
    assert_eq!(search_events, 1);
}

#[tokio::test]
async fn test_phase3_semantic_search_recovers_intent() {
    // The embedding oracle maps "marathon" onto the running-shoes axis, so
    // the semantic path finds what the lexical path cannot.
    let orchestrator = orchestrator_with(Arc::new(KeywordEmbeddingOracle::fixture())).await;

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Agentic, "gear for my first marathon"))
        .await;

    let products = result.products.as_ref().expect("semantic results expected");
    assert!(!products.is_empty());

    let delegation = first_index(&result, ActivityKind::Delegation).expect("delegation event");
    let embedding = first_index(&result, ActivityKind::Embedding).expect("embedding event");
    let search = first_index(&result, ActivityKind::Search).expect("search event");
    assert!(delegation < embedding);
    assert!(embedding < search);
}

#[tokio::test]
async fn test_phase3_price_and_category_filters_hold() {
    let orchestrator = orchestrator_with(Arc::new(KeywordEmbeddingOracle::fixture())).await;

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Agentic, "shoes under $150"))
        .await;

    let products = result.products.as_ref().expect("products expected");
    assert!(!products.is_empty());
    for scored in products {
        assert!(scored.product.price <= rust_decimal::Decimal::from(150));
        assert!(matches!(
            scored.product.category.as_str(),
            "Running Shoes" | "Training Shoes"
        ));
    }
}

#[tokio::test]
async fn test_phase3_embedding_failure_falls_back_to_lexical() {
    let orchestrator = orchestrator_with(Arc::new(FailingEmbeddingOracle)).await;

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Agentic, "running shoes"))
        .await;

    // The turn is successful despite the oracle failure
    let products = result.products.as_ref().expect("lexical fallback results");
    assert!(!products.is_empty());

    let error_index = result
        .activity_trace
        .iter()
        .position(|e| e.kind == ActivityKind::Error && e.title.contains("Embedding"))
        .expect("embedding error event");
    let search_index = first_index(&result, ActivityKind::Search).expect("search event");
    assert!(error_index < search_index);
}

#[tokio::test]
async fn test_phase2_mediates_database_access() {
    let orchestrator = orchestrator_with(Arc::new(KeywordEmbeddingOracle::fixture())).await;

    let direct = orchestrator
        .handle_turn(TurnRequest::text(Phase::Direct, "running shoes"))
        .await;
    let mediated = orchestrator
        .handle_turn(TurnRequest::text(Phase::Mediated, "running shoes"))
        .await;

    // Same retrieval semantics in both phases
    let direct_ids: Vec<String> = direct
        .products
        .unwrap()
        .iter()
        .map(|s| s.product.product_id.to_string())
        .collect();
    let mediated_ids: Vec<String> = mediated
        .products
        .as_ref()
        .unwrap()
        .iter()
        .map(|s| s.product.product_id.to_string())
        .collect();
    assert_eq!(direct_ids, mediated_ids);

    // The trace reflects the mediation
    let kinds = kinds(&mediated);
    assert!(kinds.contains(&ActivityKind::Mcp));
    assert!(!kinds.contains(&ActivityKind::Database));
}

#[tokio::test]
async fn test_trace_ids_and_timestamps_are_ordered() {
    let orchestrator = orchestrator_with(Arc::new(KeywordEmbeddingOracle::fixture())).await;

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Agentic, "recovery massage gun"))
        .await;

    assert!(!result.activity_trace.is_empty());
    for pair in result.activity_trace.windows(2) {
        assert!(pair[0].id < pair[1].id);
        assert!(pair[0].timestamp <= pair[1].timestamp);
        assert_eq!(pair[0].turn_id, result.turn_id);
    }
}

#[tokio::test]
async fn test_supervisor_respects_tool_call_bound() {
    // An oracle that never stops delegating must be cut off at the bound
    let oracle = Arc::new(ScriptedOracle::repeating(ScriptedOracle::search(
        "running shoes",
    )));
    let orchestrator =
        orchestrator_with_oracle(Arc::new(KeywordEmbeddingOracle::fixture()), oracle).await;

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Agentic, "keep searching"))
        .await;

    let delegations = result
        .activity_trace
        .iter()
        .filter(|e| e.kind == ActivityKind::Delegation)
        .count();
    assert_eq!(delegations, 5);

    // The turn still returns a reply; the failure is in the trace
    assert!(!result.reply_text.is_empty());
    assert!(result
        .activity_trace
        .iter()
        .any(|e| e.kind == ActivityKind::Error
            && e.details.as_deref().unwrap_or("").contains("loop_exhausted")));
}

#[tokio::test]
async fn test_oracle_reply_ends_the_loop() {
    let oracle = Arc::new(ScriptedOracle::steps(vec![
        ScriptedOracle::search("running shoes"),
        LlmTurn::Reply("Here are some great options for your marathon!".to_string()),
    ]));
    let orchestrator =
        orchestrator_with_oracle(Arc::new(KeywordEmbeddingOracle::fixture()), oracle).await;

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Agentic, "marathon shoes"))
        .await;

    assert_eq!(
        result.reply_text,
        "Here are some great options for your marathon!"
    );
    // Products from the delegated search survive into the final result
    assert!(result.products.is_some());
}

#[tokio::test]
async fn test_image_search_turn() {
    let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
    let orchestrator = orchestrator_with(Arc::new(
        KeywordEmbeddingOracle::fixture().with_image_axis(1),
    ))
    .await;

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Agentic, "").with_image(jpeg.to_vec()))
        .await;

    let products = result.products.as_ref().expect("visual results expected");
    assert!(products.len() >= 3);
    // The three training-shoe fixtures sit on the image axis and must rank
    // first with full similarity; anything after them is a weaker match.
    for scored in &products[..3] {
        assert_eq!(scored.product.category.as_str(), "Training Shoes");
        assert!((scored.similarity.unwrap() - 1.0).abs() < 1e-5);
    }
    for scored in &products[3..] {
        assert!(scored.similarity.unwrap() < 1.0);
    }
    assert!(kinds(&result).contains(&ActivityKind::Embedding));
}

#[tokio::test]
async fn test_rejected_image_fails_softly() {
    let orchestrator = orchestrator_with(Arc::new(KeywordEmbeddingOracle::fixture())).await;

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Agentic, "").with_image(b"GIF89a....".to_vec()))
        .await;

    assert!(result.products.is_none());
    assert!(result.reply_text.contains("image"));
    assert!(kinds(&result).contains(&ActivityKind::Error));
}

#[tokio::test]
async fn test_missing_message_is_reported_in_trace() {
    let orchestrator = orchestrator_with(Arc::new(KeywordEmbeddingOracle::fixture())).await;

    let result = orchestrator
        .handle_turn(TurnRequest {
            phase: Phase::Direct,
            message: None,
            image: None,
            customer_id: None,
            conversation_id: None,
        })
        .await;

    assert!(result.products.is_none());
    assert!(kinds(&result).contains(&ActivityKind::Error));
}

#[tokio::test]
async fn test_search_turns_suggest_follow_ups() {
    let orchestrator = orchestrator_with(Arc::new(KeywordEmbeddingOracle::fixture())).await;

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Direct, "running shoes"))
        .await;

    assert_eq!(result.follow_ups.len(), 3);
    assert!(result.follow_ups[0].contains("running shoes"));
}

#[tokio::test]
async fn test_streaming_sink_mirrors_the_trace() {
    let orchestrator = orchestrator_with(Arc::new(KeywordEmbeddingOracle::fixture())).await;
    let mut rx = orchestrator.subscribe();

    let result = orchestrator
        .handle_turn(TurnRequest::text(Phase::Direct, "running shoes"))
        .await;

    let mut streamed = Vec::new();
    while let Ok(event) = rx.try_recv() {
        streamed.push(event);
    }

    assert_eq!(streamed.len(), result.activity_trace.len());
    for (streamed, traced) in streamed.iter().zip(&result.activity_trace) {
        assert_eq!(streamed.id, traced.id);
        assert_eq!(streamed.turn_id, result.turn_id);
    }
}
