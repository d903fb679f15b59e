use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{EncodeInput, Tokenizer, TruncationParams, TruncationStrategy};

/// Model inputs for a batch of one sequence, each shaped `[1, T]`.
pub struct Encoded {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Caps encodings at `max_len` tokens, special tokens included. Pairs are
/// cut from the second sequence only, so the query and both `[SEP]`s stay.
pub fn configure_truncation(tokenizer: &mut Tokenizer, max_len: usize) -> Result<()> {
    let params = TruncationParams {
        max_length: max_len,
        strategy: TruncationStrategy::OnlySecond,
        ..Default::default()
    };
    tokenizer
        .with_truncation(Some(params))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
    Ok(())
}

pub fn tokenize_on_device<'s, E>(tokenizer: &Tokenizer, input: E, device: &Device) -> Result<Encoded>
where
    E: Into<EncodeInput<'s>>,
{
    let enc = tokenizer.encode(input, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    anyhow::ensure!(!enc.get_ids().is_empty(), "tokenizer produced no tokens");
    let to_tensor = |values: &[u32]| -> Result<Tensor> { Ok(Tensor::new(values, device)?.unsqueeze(0)?) };
    Ok(Encoded {
        input_ids: to_tensor(enc.get_ids())?,
        token_type_ids: to_tensor(enc.get_type_ids())?,
        attention_mask: to_tensor(enc.get_attention_mask())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const TOKENIZER_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": {"type": "BertProcessing", "sep": ["[SEP]", 2], "cls": ["[CLS]", 1]},
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "[CLS]": 1, "[SEP]": 2, "flaps": 3, "landing": 4, "weight": 5},
            "unk_token": "[UNK]"
        }
    }"#;

    #[test]
    fn long_pairs_keep_the_query_and_final_separator() {
        let mut tokenizer = Tokenizer::from_str(TOKENIZER_JSON).unwrap();
        configure_truncation(&mut tokenizer, 8).unwrap();
        let passage = "flaps ".repeat(20);
        let enc = tokenize_on_device(&tokenizer, ("landing weight", passage.as_str()), &Device::Cpu).unwrap();

        let ids: Vec<Vec<u32>> = enc.input_ids.to_vec2().unwrap();
        assert_eq!(ids[0], vec![1, 4, 5, 2, 3, 3, 3, 2]);
        let type_ids: Vec<Vec<u32>> = enc.token_type_ids.to_vec2().unwrap();
        assert_eq!(type_ids[0], vec![0, 0, 0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn single_sequences_are_capped() {
        let mut tokenizer = Tokenizer::from_str(TOKENIZER_JSON).unwrap();
        configure_truncation(&mut tokenizer, 4).unwrap();
        let enc = tokenize_on_device(&tokenizer, "landing weight flaps flaps", &Device::Cpu).unwrap();
        let ids: Vec<Vec<u32>> = enc.input_ids.to_vec2().unwrap();
        assert_eq!(ids[0], vec![1, 4, 5, 2]);
    }
}
