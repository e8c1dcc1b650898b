use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::citation::{extract_cited_ids, resolve_citations, strip_unknown_citations};
use super::classify::{
    classify_intent, comparison_period_or, pattern_days_or, review_days_or, ComparisonPeriod,
    DEFAULT_COMPARISON_DAYS, DEFAULT_PATTERN_DAYS, DEFAULT_REVIEW_DAYS,
};
use super::contract::{fallback_review_summary, validate_response, ContractContext, ContractViolation};
use super::generate::{generate_with_retry, LlmGenerate, RetryPolicy};
use super::prompt::{build_chat_prompt, PromptInput, CHAT_SYSTEM_PROMPT};
use super::retrieval::{
    has_sufficient_relevance, retrieve_evidence, DEFAULT_RELEVANCE_THRESHOLD, DEFAULT_TOP_N,
};
use super::single_flight::{FlightTicket, InFlightRegistry};
use super::types::{Citation, RagEvidence};
use super::RagError;
use crate::analytics::{
    build_pattern_card, compute_log_statistics, get_logs_from_last_n_days, LogStatistics,
    PatternCard,
};
use crate::db::repository::{KnowledgeBase, LogStore};
use crate::models::enums::ChatIntent;
use crate::models::{KbDocument, Log, Message};
use crate::pipeline::safety::{emergency_labels, validate_no_obvious_pii};

pub const DEFAULT_HISTORY_WINDOW: usize = 4;

/// Tunables for one chat pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub evidence_top_n: usize,
    pub relevance_threshold: u32,
    /// Most recent history messages replayed into the prompt.
    pub history_window: usize,
    /// Logged days used when a message names no window.
    pub review_days: u32,
    pub pattern_days: u32,
    pub comparison_days: u32,
    pub retry: RetryPolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            evidence_top_n: DEFAULT_TOP_N,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            history_window: DEFAULT_HISTORY_WINDOW,
            review_days: DEFAULT_REVIEW_DAYS,
            pattern_days: DEFAULT_PATTERN_DAYS,
            comparison_days: DEFAULT_COMPARISON_DAYS,
            retry: RetryPolicy::default(),
        }
    }
}

/// One user turn.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub thread_id: Uuid,
    pub message: &'a str,
    /// Prior messages of the thread, oldest first.
    pub history: &'a [Message],
    pub today: NaiveDate,
}

/// Everything computed before the generation call.
#[derive(Debug, Clone)]
pub struct PreparedTurn {
    pub intent: ChatIntent,
    pub card: PatternCard,
    pub stats: Option<LogStatistics>,
    /// Evidence placed in the prompt. Empty when withheld.
    pub evidence: Vec<RagEvidence>,
    pub evidence_withheld: bool,
    pub prompt: String,
}

impl PreparedTurn {
    pub fn evidence_ids(&self) -> Vec<String> {
        self.evidence.iter().map(|e| e.id.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// Final text with only valid `[KB:<id>]` markers left in place.
    pub text: String,
    pub intent: ChatIntent,
    /// Exact ids of the evidence supplied to the prompt.
    pub evidence_ids: Vec<String>,
    /// Documents actually cited in `text`.
    pub citations: Vec<Citation>,
    /// Set when `text` differs from the first generated output.
    pub revised: bool,
    /// Set when `text` was built from statistics without the generator.
    pub used_fallback: bool,
    /// Rules still broken by `text` after correction.
    pub violations: Vec<ContractViolation>,
    /// Danger phrases found in the user message.
    pub emergency: Vec<&'static str>,
    /// Advisory PII categories found in the user message.
    pub pii_warnings: Vec<String>,
}

/// Chat turn orchestrator.
///
/// classify → window and aggregate → retrieve → prompt → generate →
/// validate → correct or fall back → cite.
pub struct ChatPipeline<G: LlmGenerate> {
    generator: G,
    config: ChatConfig,
    flights: Arc<InFlightRegistry>,
}

impl<G: LlmGenerate> ChatPipeline<G> {
    pub fn new(generator: G, config: ChatConfig) -> Self {
        Self::with_registry(generator, config, Arc::new(InFlightRegistry::new()))
    }

    /// Share a registry with other pipelines serving the same threads.
    pub fn with_registry(generator: G, config: ChatConfig, flights: Arc<InFlightRegistry>) -> Self {
        Self {
            generator,
            config,
            flights,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn flights(&self) -> &Arc<InFlightRegistry> {
        &self.flights
    }

    /// Synchronous prefix of a turn: everything up to the prompt text.
    pub fn prepare(&self, request: &ChatRequest<'_>, logs: &[Log], docs: &[KbDocument]) -> PreparedTurn {
        let intent = classify_intent(request.message);
        let full_card = || build_pattern_card(logs, None);

        let (card, window, stats) = match intent {
            ChatIntent::ReviewRecent => {
                let days = review_days_or(request.message, self.config.review_days);
                let window = get_logs_from_last_n_days(logs, days as usize);
                let stats = compute_log_statistics(&window);
                (full_card(), Some(window), Some(stats))
            }
            ChatIntent::UnderstandPatterns => {
                let days = pattern_days_or(request.message, self.config.pattern_days);
                let window = get_logs_from_last_n_days(logs, days as usize);
                (build_pattern_card(&window, None), Some(window), None)
            }
            ChatIntent::ComparePeriod => {
                let stats = match comparison_period_or(request.message, self.config.comparison_days) {
                    ComparisonPeriod::Full => compute_log_statistics(logs),
                    ComparisonPeriod::Days(days) => {
                        compute_log_statistics(&get_logs_from_last_n_days(logs, days as usize))
                    }
                };
                (full_card(), None, Some(stats))
            }
            ChatIntent::AddDetail => {
                let window = get_logs_from_last_n_days(logs, self.config.review_days as usize);
                (full_card(), Some(window), None)
            }
            ChatIntent::General => (full_card(), None, None),
        };

        let mut evidence =
            retrieve_evidence(request.message, &card, docs, self.config.evidence_top_n);
        let evidence_withheld =
            !has_sufficient_relevance(&evidence, self.config.relevance_threshold);
        if evidence_withheld {
            evidence.clear();
        }

        let history_start = request.history.len().saturating_sub(self.config.history_window);
        let prompt = build_chat_prompt(&PromptInput {
            user_message: request.message,
            intent,
            card: &card,
            logs: window.as_deref(),
            stats: stats.as_ref(),
            evidence: &evidence,
            history: &request.history[history_start..],
            today: request.today,
        });

        tracing::info!(
            intent = %intent,
            logs = logs.len(),
            window_logs = window.as_ref().map_or(0, Vec::len),
            evidence = evidence.len(),
            evidence_withheld,
            prompt_chars = prompt.len(),
            "Chat turn prepared"
        );

        PreparedTurn {
            intent,
            card,
            stats,
            evidence,
            evidence_withheld,
            prompt,
        }
    }

    /// Run a full turn without streaming.
    pub fn respond(
        &self,
        request: &ChatRequest<'_>,
        logs: &[Log],
        docs: &[KbDocument],
    ) -> Result<ChatResponse, RagError> {
        let ticket = self.flights.begin(request.thread_id);
        let turn = self.prepare(request, logs, docs);
        let first = generate_with_retry(&self.generator, CHAT_SYSTEM_PROMPT, &turn.prompt, &self.config.retry)?;
        ensure_active(&ticket)?;
        self.finish(request, turn, first, docs, &ticket)
    }

    /// Run a full turn, forwarding tokens of the first generation to
    /// `token_tx`. Forwarding stops when a newer request on the same thread
    /// supersedes this one or when the receiver is dropped.
    ///
    /// When the streamed text breaks the output contract the corrected text
    /// comes back in the response with `revised` set.
    pub fn respond_streaming(
        &self,
        request: &ChatRequest<'_>,
        logs: &[Log],
        docs: &[KbDocument],
        token_tx: Sender<String>,
    ) -> Result<ChatResponse, RagError> {
        let ticket = self.flights.begin(request.thread_id);
        let turn = self.prepare(request, logs, docs);

        let (inner_tx, inner_rx) = mpsc::channel::<String>();
        let first = std::thread::scope(|scope| {
            let ticket = &ticket;
            scope.spawn(move || forward_tokens(inner_rx, token_tx, ticket));
            self.generator
                .generate_streaming(CHAT_SYSTEM_PROMPT, &turn.prompt, inner_tx)
        });
        ensure_active(&ticket)?;
        self.finish(request, turn, first?, docs, &ticket)
    }

    /// Same as [`respond`](Self::respond), reading from the stores.
    pub fn respond_from_stores<L, K>(
        &self,
        request: &ChatRequest<'_>,
        store: &L,
        kb: &K,
    ) -> Result<ChatResponse, RagError>
    where
        L: LogStore + ?Sized,
        K: KnowledgeBase + ?Sized,
    {
        let logs = store.all_logs()?;
        let docs = kb.all_documents()?;
        self.respond(request, &logs, &docs)
    }

    fn finish(
        &self,
        request: &ChatRequest<'_>,
        turn: PreparedTurn,
        first: String,
        docs: &[KbDocument],
        ticket: &FlightTicket<'_>,
    ) -> Result<ChatResponse, RagError> {
        let evidence_ids = turn.evidence_ids();
        let ctx = ContractContext {
            stats_supplied: turn.stats.is_some(),
            evidence_ids: &evidence_ids,
            evidence_withheld: turn.evidence_withheld,
        };

        let mut text = first;
        let mut revised = false;
        let mut used_fallback = false;
        let mut violations = validate_response(&text, &ctx);

        if !violations.is_empty() {
            tracing::warn!(
                intent = %turn.intent,
                violations = violations.len(),
                "Response broke output contract, regenerating"
            );
            let corrected_prompt = with_corrections(&turn.prompt, &violations);
            text = generate_with_retry(
                &self.generator,
                CHAT_SYSTEM_PROMPT,
                &corrected_prompt,
                &self.config.retry,
            )?;
            ensure_active(ticket)?;
            revised = true;
            violations = validate_response(&text, &ctx);
        }

        if !violations.is_empty() {
            match turn.stats.as_ref() {
                Some(stats) if turn.intent == ChatIntent::ReviewRecent => {
                    tracing::warn!("Regenerated response still broke contract, using statistics summary");
                    text = fallback_review_summary(stats);
                    used_fallback = true;
                }
                _ => {
                    let allowed: &[String] = if turn.evidence_withheld { &[] } else { &evidence_ids };
                    text = strip_unknown_citations(&text, allowed);
                }
            }
            violations = validate_response(&text, &ctx);
        }

        let citations = resolve_citations(&extract_cited_ids(&text), docs);
        let emergency = emergency_labels(request.message);
        if !emergency.is_empty() {
            tracing::warn!(labels = ?emergency, "Emergency phrases in user message");
        }
        let pii_warnings = validate_no_obvious_pii(request.message).warnings;

        tracing::info!(
            intent = %turn.intent,
            evidence_ids = evidence_ids.len(),
            citations = citations.len(),
            revised,
            used_fallback,
            remaining_violations = violations.len(),
            "Chat turn complete"
        );

        Ok(ChatResponse {
            text,
            intent: turn.intent,
            evidence_ids,
            citations,
            revised,
            used_fallback,
            violations,
            emergency,
            pii_warnings,
        })
    }
}

fn ensure_active(ticket: &FlightTicket<'_>) -> Result<(), RagError> {
    if ticket.is_cancelled() {
        tracing::info!(thread_id = %ticket.thread_id(), "Discarding superseded generation");
        return Err(RagError::Cancelled);
    }
    Ok(())
}

/// Relay chunks until the ticket is cancelled or the caller hangs up.
/// Returning drops `inner_rx`, which makes the generator's next send fail.
fn forward_tokens(inner_rx: Receiver<String>, token_tx: Sender<String>, ticket: &FlightTicket<'_>) {
    for chunk in inner_rx {
        if ticket.is_cancelled() || token_tx.send(chunk).is_err() {
            return;
        }
    }
}

fn with_corrections(prompt: &str, violations: &[ContractViolation]) -> String {
    let mut notes: Vec<&str> = Vec::new();
    for v in violations {
        let note = v.correction();
        if !notes.contains(&note) {
            notes.push(note);
        }
    }
    let mut out = String::from(prompt);
    out.push_str("\n\nCORRECTIONS (your previous answer broke these rules):\n");
    for note in notes {
        out.push_str("- ");
        out.push_str(note);
        out.push('\n');
    }
    out
}
