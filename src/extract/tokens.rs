//! Token accounting for model calls
//!
//! There is no tokenizer in the dependency stack, so token counts are
//! estimated from character counts. The estimate is deliberately coarse and
//! errs high for ASCII text.

/// Characters per token assumed by [`estimate_tokens`]
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimates the token count of `text` as ⌈chars / 4⌉
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count();
    chars.div_ceil(CHARS_PER_TOKEN) as u64
}

/// Computes the response-token cap for a call
///
/// The cap is `context_tokens - tokens_needed`, bounded above by
/// `max_response_tokens`, so prompt plus response never exceed the model's
/// context. Returns None when nothing is left for the response.
pub fn response_token_cap(
    context_tokens: u32,
    tokens_needed: u64,
    max_response_tokens: u32,
) -> Option<u32> {
    let remaining = u64::from(context_tokens).checked_sub(tokens_needed)?;
    let cap = remaining.min(u64::from(max_response_tokens));
    if cap == 0 {
        None
    } else {
        u32::try_from(cap).ok()
    }
}
