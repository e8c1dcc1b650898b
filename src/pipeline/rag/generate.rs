//! Generation backend contract and the retry boundary around it.

use std::sync::mpsc::Sender;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::RagError;

/// Opaque text-completion backend: system prompt and user prompt in,
/// text out.
pub trait LlmGenerate {
    fn generate(&self, system: &str, prompt: &str) -> Result<String, RagError>;

    /// Stream tokens into `token_tx` and return the full text. Backends
    /// without streaming send the whole response as a single chunk.
    fn generate_streaming(
        &self,
        system: &str,
        prompt: &str,
        token_tx: Sender<String>,
    ) -> Result<String, RagError> {
        let text = self.generate(system, prompt)?;
        let _ = token_tx.send(text.clone());
        Ok(text)
    }
}

impl<G: LlmGenerate + ?Sized> LlmGenerate for &G {
    fn generate(&self, system: &str, prompt: &str) -> Result<String, RagError> {
        (**self).generate(system, prompt)
    }

    fn generate_streaming(
        &self,
        system: &str,
        prompt: &str,
        token_tx: Sender<String>,
    ) -> Result<String, RagError> {
        (**self).generate_streaming(system, prompt, token_tx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Upper bound of the random delay added to each backoff.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 5000,
            jitter_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Exponential delay for the given zero-based retry, capped, plus jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let base = self
            .initial_backoff_ms
            .saturating_mul(2u64.saturating_pow(retry));
        let capped = base.min(self.max_backoff_ms);
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..self.jitter_ms)
        };
        Duration::from_millis(capped + jitter)
    }
}

/// Call `generator`, retrying transient failures with exponential backoff.
/// Non-transient errors and the last transient error are returned as is.
pub fn generate_with_retry<G: LlmGenerate + ?Sized>(
    generator: &G,
    system: &str,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<String, RagError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match generator.generate(system, prompt) {
            Ok(text) => return Ok(text),
            Err(e) if e.is_transient() && attempt + 1 < attempts => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Generation failed, retrying"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays scripted results in order. A final `Ok` repeats forever; once
    /// the script is used up, calls fail with `NoModel`.
    pub(crate) struct ScriptedLlm {
        script: RefCell<VecDeque<Result<String, RagError>>>,
        pub(crate) calls: RefCell<Vec<String>>,
    }

    impl ScriptedLlm {
        pub(crate) fn new(script: Vec<Result<String, RagError>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub(crate) fn replying(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl LlmGenerate for ScriptedLlm {
        fn generate(&self, _system: &str, prompt: &str) -> Result<String, RagError> {
            self.calls.borrow_mut().push(prompt.to_string());
            let mut script = self.script.borrow_mut();
            if script.len() == 1 {
                if let Some(Ok(text)) = script.front() {
                    return Ok(text.clone());
                }
            }
            script.pop_front().unwrap_or(Err(RagError::NoModel))
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            jitter_ms: 0,
        }
    }

    #[test]
    fn default_policy_values() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.initial_backoff_ms, 500);
        assert_eq!(p.max_backoff_ms, 5000);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy {
            jitter_ms: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(p.backoff(0), Duration::from_millis(500));
        assert_eq!(p.backoff(1), Duration::from_millis(1000));
        assert_eq!(p.backoff(3), Duration::from_millis(4000));
        assert_eq!(p.backoff(4), Duration::from_millis(5000));
        assert_eq!(p.backoff(40), Duration::from_millis(5000));
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let p = RetryPolicy::default();
        for _ in 0..20 {
            let d = p.backoff(0).as_millis();
            assert!((500..600).contains(&d));
        }
    }

    #[test]
    fn transient_failures_are_retried() {
        let llm = ScriptedLlm::new(vec![
            Err(RagError::OllamaConnection("down".into())),
            Err(RagError::OllamaError { status: 503, body: "busy".into() }),
            Ok("done".into()),
        ]);
        let text = generate_with_retry(&llm, "sys", "prompt", &fast_policy()).unwrap();
        assert_eq!(text, "done");
        assert_eq!(llm.call_count(), 3);
    }

    #[test]
    fn attempts_are_bounded() {
        let llm = ScriptedLlm::new(vec![
            Err(RagError::Timeout(1)),
            Err(RagError::Timeout(1)),
            Err(RagError::Timeout(1)),
            Ok("too late".into()),
        ]);
        let err = generate_with_retry(&llm, "sys", "prompt", &fast_policy()).unwrap_err();
        assert!(err.is_transient());
        assert_eq!(llm.call_count(), 3);
    }

    #[test]
    fn permanent_errors_fail_fast() {
        let llm = ScriptedLlm::new(vec![
            Err(RagError::OllamaError { status: 400, body: "bad".into() }),
            Ok("never".into()),
        ]);
        let err = generate_with_retry(&llm, "sys", "prompt", &fast_policy()).unwrap_err();
        assert!(matches!(err, RagError::OllamaError { status: 400, .. }));
        assert_eq!(llm.call_count(), 1);
    }

    #[test]
    fn default_streaming_sends_one_chunk() {
        let llm = ScriptedLlm::replying(&["whole answer"]);
        let (tx, rx) = std::sync::mpsc::channel();
        let text = llm.generate_streaming("sys", "prompt", tx).unwrap();
        assert_eq!(text, "whole answer");
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec!["whole answer"]);
    }
}
