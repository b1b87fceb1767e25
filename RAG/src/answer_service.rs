use chrono::Utc;
use std::sync::Arc;

use crate::dms_client::DmsClient;
use crate::error::Result;
use crate::llm_client::LlmClient;
use crate::models::{AskRequest, AskResponse, Citation, HistoryTurn, ScoredChunk};
use crate::retriever::Retriever;

const SYSTEM_PROMPT_TEMPLATE: &str = "You are a helpful and intelligent document assistant. Today's date is {today}. You have access to a knowledge base of documents and can answer questions based on their content. When documents appear to be from the same project or related topics, make connections between them to provide comprehensive insights.

Key guidelines:
1. ALWAYS provide comprehensive, detailed answers when documents contain relevant information
2. Look for ALL related documents and synthesize information from multiple sources
3. Identify relationships between documents (same subject, methodology, or specification)
4. Include specific details such as requirements, procedures, responsible parties, timelines, and quality or safety notes
5. Structure your response with clear sections when covering multiple aspects
6. Do NOT include numbered citations like [1] or [2] in your response
7. Mention document titles naturally when referencing sources (e.g., \"According to the Onboarding Policy...\")

Remember: users expect thorough, actionable answers that cover all relevant aspects found in the documents.";

const NO_INFO_ANSWER: &str = "I couldn't find any relevant information in the documents to answer your question.";

const DEFAULT_SCORE_THRESHOLD: f32 = 0.1;

/// Crude intent router deciding whether a query warrants document
/// retrieval at all. Modeled as a trait, not a hardcoded list, so it can
/// later be swapped for a classifier without touching `AnswerService`.
pub trait GatingPredicate: Send + Sync {
    fn needs_documents(&self, query: &str) -> bool;
}

/// Default gate: a small generic-document vocabulary, matched
/// case-insensitively as substrings of the query.
pub struct KeywordGate {
    keywords: Vec<String>,
}

impl KeywordGate {
    pub fn new() -> Self {
        KeywordGate {
            keywords: [
                "document", "report", "policy", "procedure", "specification",
                "requirement", "project", "contract", "agreement", "manual",
                "guideline", "memo", "record", "summary", "schedule",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for KeywordGate {
    fn default() -> Self {
        Self::new()
    }
}

impl GatingPredicate for KeywordGate {
    fn needs_documents(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        self.keywords.iter().any(|kw| lower.contains(kw.as_str()))
    }
}

pub struct AnswerService {
    retriever: Retriever,
    llm: Arc<LlmClient>,
    dms: Arc<DmsClient>,
    gate: Box<dyn GatingPredicate>,
    default_top_k: usize,
    max_snippets_tokens: usize,
    dedup_threshold: f32,
}

impl AnswerService {
    pub fn new(
        retriever: Retriever,
        llm: Arc<LlmClient>,
        dms: Arc<DmsClient>,
        default_top_k: usize,
        max_snippets_tokens: usize,
    ) -> Self {
        AnswerService {
            retriever,
            llm,
            dms,
            gate: Box::new(KeywordGate::new()),
            default_top_k,
            max_snippets_tokens,
            dedup_threshold: 0.95,
        }
    }

    pub fn with_gate(mut self, gate: Box<dyn GatingPredicate>) -> Self {
        self.gate = gate;
        self
    }

    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse> {
        log::info!("received question: {}", truncate(&request.query, 100));

        let history = request.history.clone().unwrap_or_default();
        let needs_documents = self.gate.needs_documents(&request.query);

        let mut chunks: Vec<ScoredChunk> = Vec::new();
        if needs_documents {
            let top_k = request.top_k.unwrap_or(self.default_top_k);
            let search_k = if top_k < 20 { top_k * 2 } else { top_k };
            chunks = self
                .retriever
                .search(&request.query, search_k, request.filter_tags.clone(), DEFAULT_SCORE_THRESHOLD)
                .await?;
            chunks.truncate(top_k);
        }

        if chunks.is_empty() {
            if request.allow_general_chat {
                log::info!("no RAG context found; falling back to general chat mode");
                let completion = self
                    .llm
                    .complete(&self.system_prompt(), &request.query, &history, None)
                    .await?;
                return Ok(AskResponse {
                    answer: completion.answer,
                    citations: Vec::new(),
                    query: request.query,
                    model_used: completion.model,
                });
            }
            log::warn!("no relevant chunks found for query and general chat disabled");
            return Ok(AskResponse {
                answer: NO_INFO_ANSWER.to_string(),
                citations: Vec::new(),
                query: request.query,
                model_used: self.llm_default_model(),
            });
        }

        let chunks = Retriever::deduplicate(chunks, self.dedup_threshold);

        let context = self.build_context(&chunks);
        let user_message = format!(
            "Question: {}\n\nContext from documents:\n{}\n\nPlease answer the question based on the provided context. When referencing information, mention the document titles naturally in your response.",
            request.query, context
        );

        let completion = self
            .llm
            .complete(&self.system_prompt(), &user_message, &history, None)
            .await?;

        let citations = chunks
            .iter()
            .map(|sc| Citation {
                doc_id: sc.chunk.doc_id,
                title: sc.chunk.title.clone(),
                page: sc.chunk.page,
                score: sc.score,
                url: self.dms.build_document_url(sc.chunk.doc_id),
                snippet: truncate(&sc.chunk.text, 300),
            })
            .collect();

        log::info!("generated answer with {} citations", chunks.len());

        Ok(AskResponse {
            answer: completion.answer,
            citations,
            query: request.query,
            model_used: completion.model,
        })
    }

    fn llm_default_model(&self) -> String {
        // Surfaced only in the no-information canned-answer path, where no
        // LLM call is made and `completion.model` is unavailable.
        self.llm.default_model_name()
    }

    fn system_prompt(&self) -> String {
        let today = Utc::now().format("%B %-d, %Y").to_string();
        SYSTEM_PROMPT_TEMPLATE.replace("{today}", &today)
    }

    /// Groups chunks by document, preserving first-seen order, and stops
    /// appending once the running token estimate would exceed
    /// `max_snippets_tokens`. Partial groups are allowed.
    fn build_context(&self, chunks: &[ScoredChunk]) -> String {
        let mut doc_order: Vec<i64> = Vec::new();
        let mut groups: std::collections::HashMap<i64, (String, Vec<&ScoredChunk>)> = std::collections::HashMap::new();

        for sc in chunks {
            let entry = groups
                .entry(sc.chunk.doc_id)
                .or_insert_with(|| {
                    doc_order.push(sc.chunk.doc_id);
                    (sc.chunk.title.clone(), Vec::new())
                });
            entry.1.push(sc);
        }

        let mut parts: Vec<String> = Vec::new();
        let mut total_tokens = 0usize;

        'outer: for doc_id in &doc_order {
            let (title, doc_chunks) = &groups[doc_id];
            parts.push(format!("\n=== From document: {title} ===\n"));

            for sc in doc_chunks {
                let entry = match sc.chunk.page {
                    Some(page) => format!("Page {page}:\n{}\n", sc.chunk.text),
                    None => format!("{}\n", sc.chunk.text),
                };
                let entry_tokens = estimate_tokens(&entry);
                if total_tokens + entry_tokens > self.max_snippets_tokens {
                    log::warn!("reached context token budget, truncating");
                    break 'outer;
                }
                parts.push(entry);
                total_tokens += entry_tokens;
            }
        }

        parts.join("\n")
    }
}

fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_gate_fires_on_generic_document_vocabulary() {
        let gate = KeywordGate::new();
        assert!(gate.needs_documents("what does the policy say about leave?"));
        assert!(!gate.needs_documents("hello, how are you today?"));
    }

    #[test]
    fn truncate_appends_ellipsis_only_when_exceeding_limit() {
        assert_eq!(truncate("short", 300), "short");
        let long = "a".repeat(310);
        let truncated = truncate(&long, 300);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 303);
    }
}
