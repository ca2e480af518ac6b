// Whitespace tokenizer over a fixed vocabulary, for unit tests.
//
// Markers use the ids from the worked example in instances.rs:
//   [PAD]=0 [CLS]=1 [SEP]=2 [UNK]=3 [speaker1]=5 [speaker2]=6
// Every other word gets the id passed to `with_word`.

use std::collections::HashMap;

use anyhow::Result;

use crate::domain::traits::DialogueTokenizer;

pub struct VocabTokenizer {
    vocab: HashMap<String, u32>,
}

impl VocabTokenizer {
    pub fn new() -> Self {
        let vocab = [
            ("[PAD]", 0),
            ("[CLS]", 1),
            ("[SEP]", 2),
            ("[UNK]", 3),
            ("[speaker1]", 5),
            ("[speaker2]", 6),
        ]
        .into_iter()
        .map(|(t, id)| (t.to_string(), id))
        .collect();
        Self { vocab }
    }

    pub fn with_word(mut self, word: &str, id: u32) -> Self {
        self.vocab.insert(word.to_string(), id);
        self
    }

    pub fn without(mut self, token: &str) -> Self {
        self.vocab.remove(token);
        self
    }
}

impl DialogueTokenizer for VocabTokenizer {
    fn type_name(&self) -> &str {
        "VocabTokenizer"
    }

    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Result<Vec<u32>> {
        Ok(tokens
            .iter()
            .map(|t| self.vocab.get(t).copied().unwrap_or(3))
            .collect())
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.vocab.get(token).copied()
    }

    fn pad_token_id(&self) -> Option<u32> {
        self.vocab.get("[PAD]").copied()
    }
}
