use candle_sentiment::error::Result;
use candle_sentiment::sentiment::{ModernBertSize, SentimentAnalysisPipelineBuilder};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Building pipeline...");

    let mut builder = SentimentAnalysisPipelineBuilder::modernbert(ModernBertSize::Base);
    if let Some(path) = std::env::args().nth(1) {
        builder = builder.config_file(path);
    }
    let pipeline = builder.build()?;

    println!("Pipeline built successfully.");

    let text = "The food was great but the service was terrible";

    let output = pipeline.run(text)?;

    println!("\n=== Sentiment Analysis Result ===");
    println!("Text: \"{}\"", text);
    println!(
        "Sentiment: {} (confidence: {:.4})",
        output.result.sentiment, output.result.confidence
    );
    println!(
        "Probabilities: {}",
        serde_json::to_string(&output.result.probabilities)?
    );
    println!(
        "Completed in {:.2}ms",
        output.stats.total_time.as_secs_f64() * 1000.0
    );

    println!("\n=== Batch Inference ===");
    let texts = &[
        "This product is absolutely amazing!",
        "Terrible experience, would not recommend.",
        "It's okay, I guess.",
        "Nice design, however the battery dies quickly.",
    ];

    let output = pipeline.run(texts)?;

    for r in output.results {
        let result = r.result?;
        println!("{} -> {} ({:.2})", r.text, result.sentiment, result.confidence);
    }
    println!(
        "{} texts, {} mixed",
        output.stats.items_processed, output.stats.mixed_items
    );

    Ok(())
}
