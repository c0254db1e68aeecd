//! Sliding-window streaming identification session.
//!
//! Replaces the boolean-flag-plus-score-map pattern with an explicit
//! tagged verdict so the session can never be in an ambiguous state.

use std::collections::HashMap;

use crate::audio::{preprocess_pcm, SampleEncoding};
use crate::error::SabiResult;
use crate::matching::verdict_threshold_met;

/// The session's terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pending,
    Found(i32),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub in_sample_rate: u32,
    pub encoding: SampleEncoding,
    /// Channel count of the declared PCM stream. The wire protocol in
    /// SPEC_FULL.md §6 doesn't transmit this explicitly; 1 (mono) is the
    /// default every adapter uses today.
    pub channels: usize,
    pub top_n: usize,
    pub chunk_time_ms: u64,
    pub stride_ms: u64,
}

impl SessionConfig {
    pub fn new(in_sample_rate: u32, encoding: SampleEncoding) -> Self {
        Self {
            in_sample_rate,
            encoding,
            channels: 1,
            top_n: crate::config::DEFAULT_TOP_N,
            chunk_time_ms: crate::config::DEFAULT_CHUNK_TIME_MS,
            stride_ms: crate::config::DEFAULT_STRIDE_MS,
        }
    }

    /// `ceil(chunk_time_ms / 1000) * in_sample_rate * sample_size`.
    ///
    /// The whole-second ceiling is preserved from the reference
    /// implementation even though it collapses any sub-second
    /// `chunk_time_ms` to one second; see SPEC_FULL.md §9 Open Questions.
    pub fn required_bytes(&self) -> usize {
        ceil_seconds(self.chunk_time_ms) as usize
            * self.in_sample_rate as usize
            * self.encoding.sample_size()
    }

    pub fn stride_bytes(&self) -> usize {
        ceil_seconds(self.stride_ms) as usize
            * self.in_sample_rate as usize
            * self.encoding.sample_size()
    }
}

fn ceil_seconds(ms: u64) -> u64 {
    ms.div_ceil(1000)
}

pub struct StreamingSession {
    config: SessionConfig,
    buffer: Vec<u8>,
    scores: HashMap<i32, i64>,
    verdict: Verdict,
    elapsed_ms: u64,
}

impl StreamingSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            scores: HashMap::new(),
            verdict: Verdict::Pending,
            elapsed_ms: 0,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn scores(&self) -> &HashMap<i32, i64> {
        &self.scores
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Bookkeeping only: the owning collaborator tracks wall-clock time and
    /// reports it here; enforcing the timeout budget is its job, not the
    /// session's (see SPEC_FULL.md §4.6.2 and §5).
    pub fn record_elapsed(&mut self, ms: u64) {
        self.elapsed_ms += ms;
    }

    /// Force a timeout verdict. No-op if a verdict already landed.
    pub fn force_timeout(&mut self) {
        if self.verdict == Verdict::Pending {
            self.verdict = Verdict::TimedOut;
        }
    }

    /// Append newly arrived bytes and run the matching pipeline over every
    /// full chunk the buffer now contains. `matcher` performs the actual
    /// fingerprint lookup (an index-store-backed closure in production,
    /// a canned one in tests) so the session logic itself stays free of
    /// storage concerns.
    pub fn push_bytes<F>(&mut self, data: &[u8], mut matcher: F) -> SabiResult<()>
    where
        F: FnMut(&crate::audio::PreprocessedAudio, usize) -> SabiResult<Vec<(i32, i64)>>,
    {
        if self.verdict != Verdict::Pending {
            return Ok(());
        }

        self.buffer.extend_from_slice(data);

        let required = self.config.required_bytes();
        let stride = self.config.stride_bytes();

        while self.buffer.len() >= required && self.verdict == Verdict::Pending {
            let chunk: Vec<u8> = self.buffer[..required].to_vec();
            self.buffer.drain(..stride.min(self.buffer.len()));

            let samples = self.config.encoding.decode_interleaved(&chunk);
            let preprocessed =
                preprocess_pcm(&samples, self.config.channels, self.config.in_sample_rate)?;

            let results = matcher(&preprocessed, self.config.top_n)?;
            for (song_id, score) in results {
                *self.scores.entry(song_id).or_insert(0) += score;
            }

            self.check_verdict();
        }

        Ok(())
    }

    fn check_verdict(&mut self) {
        if self.verdict != Verdict::Pending {
            return;
        }

        let mut ranked: Vec<(i32, i64)> = self.scores.iter().map(|(&id, &s)| (id, s)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let Some(&(top_song, s1)) = ranked.first() else {
            return;
        };
        let s2 = ranked.get(1).map(|&(_, s)| s).unwrap_or(0);

        if verdict_threshold_met(s1, s2) {
            self.verdict = Verdict::Found(top_song);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        let mut c = SessionConfig::new(11025, SampleEncoding::Float32);
        c.chunk_time_ms = 1000;
        c.stride_ms = 1000;
        c
    }

    fn silence_bytes(n_samples: usize) -> Vec<u8> {
        vec![0u8; n_samples * 4]
    }

    #[test]
    fn exact_required_bytes_yields_one_chunk_and_empty_remainder() {
        let cfg = config();
        let required = cfg.required_bytes();
        let mut session = StreamingSession::new(cfg);

        let mut calls = 0;
        session
            .push_bytes(&silence_bytes(required / 4), |_audio, _top_n| {
                calls += 1;
                Ok(vec![])
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert!(session.buffer.is_empty());
    }

    #[test]
    fn no_overlap_when_stride_equals_chunk_time() {
        let mut cfg = config();
        cfg.chunk_time_ms = 1000;
        cfg.stride_ms = 1000;
        assert_eq!(cfg.required_bytes(), cfg.stride_bytes());
    }

    #[test]
    fn promotes_to_found_above_high_threshold() {
        let mut session = StreamingSession::new(config());
        session.scores.insert(7, 31);
        session.check_verdict();
        assert_eq!(session.verdict(), Verdict::Found(7));
    }

    #[test]
    fn promotes_to_found_on_gap_above_low_threshold() {
        let mut session = StreamingSession::new(config());
        session.scores.insert(7, 21);
        session.scores.insert(9, 5);
        session.check_verdict();
        assert_eq!(session.verdict(), Verdict::Found(7));
    }

    #[test]
    fn stays_pending_below_thresholds() {
        let mut session = StreamingSession::new(config());
        session.scores.insert(7, 15);
        session.check_verdict();
        assert_eq!(session.verdict(), Verdict::Pending);
    }

    #[test]
    fn single_song_uses_implicit_zero_runner_up() {
        let mut session = StreamingSession::new(config());
        session.scores.insert(7, 31);
        session.check_verdict();
        assert_eq!(session.verdict(), Verdict::Found(7));
    }

    #[test]
    fn discards_bytes_once_verdict_is_final() {
        let cfg = config();
        let required = cfg.required_bytes();
        let mut session = StreamingSession::new(cfg);
        session.verdict = Verdict::TimedOut;

        session
            .push_bytes(&silence_bytes(required / 4), |_audio, _top_n| {
                panic!("matcher must not run once a verdict has landed");
            })
            .unwrap();
    }

    #[test]
    fn force_timeout_does_not_override_a_found_verdict() {
        let mut session = StreamingSession::new(config());
        session.verdict = Verdict::Found(3);
        session.force_timeout();
        assert_eq!(session.verdict(), Verdict::Found(3));
    }
}
