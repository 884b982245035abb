//! Ask a natural-language question and print the compiled SQL.
//!
//! ```bash
//! OPENAI_API_KEY=... cargo run --example ask -- "how many contacts do I have?"
//! ```

use anyhow::Result;
use nlq_classifier::{IntentClassifier, OpenAiOracle};
use nlq_compiler::QueryCompiler;
use nlq_registry::{SchemaRegistry, SecurityPolicy};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let question: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let question = if question.is_empty() {
        "how many contacts do I have?".to_string()
    } else {
        question
    };

    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();

    let oracle = OpenAiOracle::from_env()?;
    let classifier = IntentClassifier::new(oracle, &registry);

    let result = classifier.classify(&question, None).await;
    println!("category:    {:?}", result.intent.category);
    println!("confidence:  {:.2}", result.confidence);
    println!("explanation: {}", result.explanation);

    let compiled = QueryCompiler::new(&registry, &policy).compile(&result.intent, None, None)?;
    println!("sql:         {}", compiled.sql);
    println!("params:      {:?}", compiled.params);
    println!("tables:      {:?}", compiled.affected_tables);

    Ok(())
}
