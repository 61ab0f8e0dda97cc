pub trait Embedder: Send + Sync {
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    /// Maximum token length fed to the model; longer texts are truncated.
    fn max_len(&self) -> usize;
    /// Compute embeddings for a batch of input texts, one vector per text, in order.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}
