//! Hybrid retrieval: dense vector similarity fused with lexical rank
//!
//! Two code paths share one entry point: lexical-only (no query vector)
//! orders filtered products by full-text rank; hybrid restricts to an ANN
//! candidate set, joins normalized lexical relevance onto it, and ranks by
//! the weighted combination. Weights and candidate sizing are resolved at
//! construction, never per call.

use crate::catalog::CatalogStore;
use crate::config::SearchConfig;
use crate::error::{ClickshopError, Result};
use crate::search::parser::ParsedQuery;
use crate::types::{Product, ProductId, ScoredProduct};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Hybrid retriever over the catalog store
pub struct HybridRetriever {
    store: Arc<CatalogStore>,
    semantic_weight: f32,
    lexical_weight: f32,
    candidate_multiplier: usize,
    candidate_minimum: usize,
}

impl HybridRetriever {
    pub fn new(store: Arc<CatalogStore>, config: &SearchConfig) -> Self {
        Self {
            store,
            semantic_weight: config.semantic_weight,
            lexical_weight: config.lexical_weight,
            candidate_multiplier: config.candidate_multiplier,
            candidate_minimum: config.candidate_minimum,
        }
    }

    fn candidate_size(&self, limit: usize) -> usize {
        (self.candidate_multiplier * limit).max(self.candidate_minimum)
    }

    /// Retrieve the top `limit` products for a parsed query, hybrid when a
    /// query vector is present, lexical-only otherwise.
    pub async fn retrieve(
        &self,
        query: &ParsedQuery,
        query_vector: Option<&[f32]>,
        limit: usize,
    ) -> Result<Vec<ScoredProduct>> {
        match query_vector {
            Some(vector) => self.retrieve_hybrid(query, vector, limit).await,
            None => self.retrieve_lexical(query, limit).await,
        }
    }

    /// Lexical-only path: parsed filters plus substring match, ordered by
    /// full-text rank with ascending product id as tie-break.
    async fn retrieve_lexical(
        &self,
        query: &ParsedQuery,
        limit: usize,
    ) -> Result<Vec<ScoredProduct>> {
        let k = self.candidate_size(limit);

        let products = self
            .store
            .filtered_products(query, k)
            .await
            .map_err(store_unavailable)?;

        let relevance = if query.cleaned_text.is_empty() {
            HashMap::new()
        } else {
            normalize_relevance(
                self.store
                    .lexical_candidates(&query.cleaned_text, k)
                    .await
                    .map_err(store_unavailable)?,
            )
        };

        debug!(
            "Lexical retrieval: {} filtered, {} ranked",
            products.len(),
            relevance.len()
        );

        let mut scored: Vec<ScoredProduct> = products
            .into_iter()
            .map(|product| {
                let score = relevance
                    .get(&product.product_id)
                    .copied()
                    .unwrap_or(0.0);
                ScoredProduct {
                    product,
                    similarity: None,
                    score,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            compare_f32(b.score, a.score)
                .then_with(|| a.product.product_id.cmp(&b.product.product_id))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    /// Hybrid path: ANN candidate set, normalized lexical relevance joined
    /// on, weighted combination, hard filters.
    async fn retrieve_hybrid(
        &self,
        query: &ParsedQuery,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredProduct>> {
        let k = self.candidate_size(limit);

        let candidates = self
            .store
            .semantic_candidates(query_vector, k)
            .await
            .map_err(store_unavailable)?;

        if candidates.is_empty() {
            debug!("Hybrid retrieval: empty candidate set");
            return Ok(Vec::new());
        }

        let semantic: HashMap<ProductId, f32> = candidates
            .iter()
            .map(|(id, distance)| (id.clone(), semantic_score(*distance)))
            .collect();

        let lexical = if query.cleaned_text.is_empty() {
            HashMap::new()
        } else {
            normalize_relevance(
                self.store
                    .lexical_candidates(&query.cleaned_text, k)
                    .await
                    .map_err(store_unavailable)?,
            )
        };

        let ids: Vec<ProductId> = candidates.iter().map(|(id, _)| id.clone()).collect();
        let products = self
            .store
            .products_by_ids_filtered(&ids, query)
            .await
            .map_err(store_unavailable)?;

        debug!(
            "Hybrid retrieval: {} candidates, {} after filters",
            ids.len(),
            products.len()
        );

        Ok(rank_hybrid(
            products,
            &semantic,
            &lexical,
            self.semantic_weight,
            self.lexical_weight,
            limit,
        ))
    }
}

/// Weighted combination and ordering for the hybrid path: descending
/// combined score, then descending semantic score, then ascending id.
fn rank_hybrid(
    products: Vec<Product>,
    semantic: &HashMap<ProductId, f32>,
    lexical: &HashMap<ProductId, f32>,
    semantic_weight: f32,
    lexical_weight: f32,
    limit: usize,
) -> Vec<ScoredProduct> {
    let mut ranked: Vec<(f32, ScoredProduct)> = products
        .into_iter()
        .map(|product| {
            let sem = semantic
                .get(&product.product_id)
                .copied()
                .unwrap_or(0.0);
            let lex = lexical.get(&product.product_id).copied().unwrap_or(0.0);
            let score = semantic_weight * sem + lexical_weight * lex;
            (
                sem,
                ScoredProduct {
                    product,
                    similarity: Some(sem),
                    score,
                },
            )
        })
        .collect();

    ranked.sort_by(|(sem_a, a), (sem_b, b)| {
        compare_f32(b.score, a.score)
            .then_with(|| compare_f32(*sem_b, *sem_a))
            .then_with(|| a.product.product_id.cmp(&b.product.product_id))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|(_, scored)| scored)
        .collect()
}

/// Cosine distance to a semantic score in [0, 1]
fn semantic_score(distance: f64) -> f32 {
    let score = (1.0 - distance) as f32;
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Map raw bm25 relevance so the maximum observed value becomes 1.0
fn normalize_relevance(raw: Vec<(ProductId, f64)>) -> HashMap<ProductId, f32> {
    let max = raw
        .iter()
        .map(|(_, relevance)| *relevance)
        .fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return HashMap::new();
    }

    raw.into_iter()
        .map(|(id, relevance)| {
            let normalized = (relevance / max) as f32;
            (id, if normalized.is_finite() { normalized.clamp(0.0, 1.0) } else { 0.0 })
        })
        .collect()
}

fn compare_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn store_unavailable(err: ClickshopError) -> ClickshopError {
    match err {
        ClickshopError::StoreFailure(message) => ClickshopError::RetrieverUnavailable(message),
        other => other,
    }
}
