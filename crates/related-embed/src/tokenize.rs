use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Encode `texts` into `[B,T]` id and mask tensors, where `T` is the longest
/// encoding in the batch capped at `max_len`. Shorter rows are right-padded
/// with `pad_id` and a zero mask.
pub fn tokenize_batch_on_device(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    pad_id: u32,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let mut rows = Vec::with_capacity(texts.len());
    for text in texts {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        ids.truncate(max_len);
        mask.truncate(max_len);
        rows.push((ids, mask));
    }
    let width = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
    let mut flat_ids = Vec::with_capacity(rows.len() * width);
    let mut flat_mask = Vec::with_capacity(rows.len() * width);
    for (mut ids, mut mask) in rows {
        ids.resize(width, pad_id);
        mask.resize(width, 0);
        flat_ids.extend(ids);
        flat_mask.extend(mask);
    }
    let input_ids = Tensor::from_vec(flat_ids, (texts.len(), width), device)?;
    let attention_mask = Tensor::from_vec(flat_mask, (texts.len(), width), device)?;
    Ok((input_ids, attention_mask))
}
