use related_core::config::Config;
use related_embed::get_default_embedder;

fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    let embedder = get_default_embedder(&config.embedding_settings()?)?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("B={} dim={}", embs.len(), embedder.dim());
    Ok(())
}
