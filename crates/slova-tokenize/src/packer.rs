use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TokenizeError};

/// One training sequence: `{"input_ids": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenBlock {
    pub input_ids: Vec<u32>,
}

/// Packs per-document token ids into fixed-length blocks.
///
/// Each document is followed by `eos_id` and documents run together without
/// padding. Every block is exactly `block_length` long except possibly the
/// last, which holds whatever remains.
pub struct BlockPacker<I> {
    documents: I,
    block_length: usize,
    eos_id: u32,
    /// Ids not yet emitted; drained from the front one block at a time.
    buffer: VecDeque<u32>,
    documents_seen: usize,
    tokens_seen: usize,
}

impl<I> BlockPacker<I>
where
    I: Iterator<Item = Vec<u32>>,
{
    /// # Errors
    ///
    /// Returns `ZeroBlockLength` if `block_length` is zero.
    pub fn new(documents: I, block_length: usize, eos_id: u32) -> Result<Self> {
        if block_length == 0 {
            return Err(TokenizeError::ZeroBlockLength);
        }
        Ok(Self {
            documents,
            block_length,
            eos_id,
            buffer: VecDeque::with_capacity(block_length),
            documents_seen: 0,
            tokens_seen: 0,
        })
    }

    #[must_use]
    pub fn documents_seen(&self) -> usize {
        self.documents_seen
    }

    /// Ids consumed so far, eos markers included.
    #[must_use]
    pub fn tokens_seen(&self) -> usize {
        self.tokens_seen
    }
}

impl<I> Iterator for BlockPacker<I>
where
    I: Iterator<Item = Vec<u32>>,
{
    type Item = TokenBlock;

    fn next(&mut self) -> Option<TokenBlock> {
        loop {
            if self.buffer.len() >= self.block_length {
                let input_ids = self.buffer.drain(..self.block_length).collect();
                return Some(TokenBlock { input_ids });
            }
            if let Some(ids) = self.documents.next() {
                self.documents_seen += 1;
                self.tokens_seen += ids.len() + 1;
                self.buffer.extend(ids);
                self.buffer.push_back(self.eos_id);
            } else {
                if self.buffer.is_empty() {
                    return None;
                }
                return Some(TokenBlock {
                    input_ids: self.buffer.drain(..).collect(),
                });
            }
        }
    }
}
