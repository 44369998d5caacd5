//! Integration tests against a live OpenAI-compatible endpoint.
//!
//! These tests make real API calls.
//! Run with: LITELLM_API_BASE=http://localhost:4000 EVAL_MODEL=Qwen/Qwen2.5-7B-Instruct \
//!     cargo test --test engine_integration -- --ignored

use smiles_eval::llm::{EngineLoader, GenerationParams, LiteLlmLoader};
use smiles_eval::pipeline::{BatchOrchestrator, HarnessConfig};
use smiles_eval::registry::{Condition, Registry};
use smiles_eval::storage::{ArtifactKey, ResultWriter};

fn test_model() -> String {
    std::env::var("EVAL_MODEL").unwrap_or_else(|_| "Qwen/Qwen2.5-7B-Instruct".to_string())
}

fn create_test_loader() -> LiteLlmLoader {
    LiteLlmLoader::from_env()
        .expect("LITELLM_API_BASE environment variable must be set for integration tests")
        .with_params(GenerationParams {
            max_tokens: 32,
            temperature: 0.0,
        })
}

#[tokio::test]
#[ignore] // Run with: cargo test --test engine_integration -- --ignored
async fn test_simple_generation() {
    let loader = create_test_loader();
    let mut engine = loader.load(&test_model()).await.expect("Engine should load");

    let response = engine
        .generate("What is 2 + 2? Reply with just the number.")
        .await;
    assert!(response.is_ok(), "Generation failed: {:?}", response.err());

    let content = response.expect("Should have response");
    assert!(
        content.contains('4'),
        "Response should contain '4', got: {}",
        content
    );
}

#[tokio::test]
#[ignore]
async fn test_single_row_code_relabel_run() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir).expect("data dir");
    std::fs::write(
        data_dir.join("aromatic-rings.json"),
        r#"[{"smiles": "c1ccccc1", "code": "benzene = Fragment('c1ccccc1')", "label": 1}]"#,
    )
    .expect("dataset");

    let model = test_model();
    let config = HarnessConfig::new()
        .with_data_dir(&data_dir)
        .with_output_dir(dir.path().join("results"))
        .with_model(&model)
        .with_task("aromatic-rings")
        .with_condition(Condition::CodeRelabel);

    let summary = BatchOrchestrator::new(config, Registry::builtin(), create_test_loader())
        .run()
        .await
        .expect("Run should succeed");
    assert_eq!(summary.pairs_written, 1);
    assert_eq!(summary.inference_calls, 2);

    let file = ResultWriter::new(dir.path().join("results"))
        .read(&ArtifactKey::new(
            "aromatic-rings",
            Condition::CodeRelabel,
            &model,
        ))
        .await
        .expect("Artifact should be readable");
    assert_eq!(file.results.len(), 1);
    let record = &file.results[0];
    assert!(record.error.is_none(), "Row failed: {:?}", record.error);
    assert!(record.relabeled.is_some());
}
