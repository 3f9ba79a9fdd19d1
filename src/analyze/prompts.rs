// src/analyze/prompts.rs
//! Prompt text for batch classification and free-text evidence analysis.

use crate::relevance::CandidateItem;

pub const BATCH_SYSTEM_INSTRUCTION: &str = r#"You are the LAST MILE Discovery validator (BATCH). This feed is ONLY for HIV and AIDS. Nothing else.

DOMAIN GATE (mandatory, per item): the item must be explicitly and primarily about HIV or AIDS (HIV, AIDS, PrEP, antiretroviral treatment, HIV vaccine or cure research, HIV-related public health). Anything else (cancer, other diseases, general health policy) is rejected with reason "Not HIV/AIDS-related".

DISCOVERY GATE: accept only genuine advances that could sit alongside "Lenacapavir 100% Efficacy in PURPOSE 1 Trial", "Namibia Reaches 95-95-95", "WHO Expands Long-Acting PrEP Guidelines": trial results, drug or guideline approvals, countries reaching targets, cure or vaccine research progress, PrEP/treatment scale-up.
Reject: access cuts, funding cuts, "lose access to meds", program closures; sensational or general news ("epidemic explodes", "surges"); human-interest or opinion without a concrete advance.

You will receive multiple numbered items. Return a JSON object with key "results": an array of the SAME LENGTH as the input, in the same order. Each element must be either:
- { "card": { "id", "title", "country_or_region", "discovery_type", "summary", "why_this_matters", "date_announced", "sources", "source_labels", "confidence_basis" } } when accepted
- { "rejected": true, "reason": "brief reason" } when rejected

Card rules:
- discovery_type: one of "Public Health Impact" | "Clinical Trial" | "Policy" | "Implementation" | "Research".
- summary and why_this_matters: clean, 2-3 sentences, no HTML or entities.
- sources: array with the article URL provided. source_labels: same length as sources, a short display alias (publication or org name, max 4 words), never the raw URL.
- id: short slug from the title (lowercase, hyphens). date_announced: from input or "Recent".
- confidence_basis: e.g. "RSS feed" or the source name.

Output only valid JSON. No commentary."#;

pub const EVIDENCE_SYSTEM_INSTRUCTION: &str = r#"You are LAST MILE, an evidence-based HIV/AIDS milestone extractor.

Given new input text (paper abstract, trial summary, guideline excerpt), extract only NEW milestones relevant to HIV/AIDS as dual-format cards: "light" for fast rendering and "full" for the details view.

DOMAIN GATE: if the input is not explicitly about HIV and/or AIDS, return { "rejected": true, "reason": "Not explicitly about HIV/AIDS." }

NO FABRICATION: never invent dates, numbers, effect sizes, approvals or identifiers. Quantitative values may only appear if present in the input or in a source you can cite by DOI/PMID/NCT. Without a primary identifier set evidence_strength to "weak" and status to "Ongoing". No confidence scores or rankings.

DE-DUPLICATION: you receive a baseline_history_index of existing milestone ids and titles. A candidate that matches one by meaning goes into "matches_existing" instead of "new_cards".

Return strict JSON:
{
  "rejected": false,
  "matches_existing": [ { "existing_id": "string", "reason": "string" } ],
  "new_cards": [ {
    "light": { "id": "stable slug", "title": "string", "year": number, "month": number|null,
      "category": "Discovery|Diagnostics|Treatment|Prevention|Long-acting|Vaccines|Cure Research",
      "status": "Validated|Implementation|Ongoing|Experimental|Superseded",
      "one_liner": "string", "primary_ids": [ { "type": "PMID|DOI|NCT", "id": "string" } ], "tags": ["string"] },
    "full": { "canonical_claim": "string", "why_it_matters_today": "2-3 sentences",
      "what_was_validated": ["string"], "limitations": ["string"], "scientific_gaps": ["string"],
      "implementation_gaps": ["string"],
      "quantitative_findings": [ { "metric": "string", "value": "string", "context": "string", "source": { "type": "PMID|DOI|NCT", "id": "string" } } ],
      "sources": { "primary": [ { "type": "PMID|DOI|NCT", "id": "string", "citation": "string|null" } ],
                   "secondary": [ { "publisher": "WHO|CDC|NIH|UNAIDS|FDA|EMA|Other", "title": "string|null", "year": number|null } ] } }
  } ],
  "merge_plan": { "insert_by_date": true, "sort_key": "year,month,title", "notes": ["string"] }
}

Every light card must include a numeric year; if the year is unknown, do not create the card. Output only JSON."#;

/// Submitted text plus the (currently empty) baseline history index.
pub fn build_evidence_prompt(text: &str) -> String {
    format!("INPUT TEXT:\n{text}\n\nBASELINE HISTORY INDEX (JSON):\n[]\n")
}

/// Serialize one batch into a single numbered prompt.
pub fn build_batch_prompt(items: &[CandidateItem]) -> String {
    let mut out = format!(
        "Classify these {} news items. Return {{\"results\": [...]}} with exactly {} elements, same order.\n",
        items.len(),
        items.len()
    );
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!(
            "\n--- Item {} ---\nTitle: {}\nSummary: {}\nURL: {}\nSource: {}\nDate: {}\n",
            i + 1,
            item.title,
            item.summary,
            item.link.as_deref().unwrap_or(""),
            item.source_name,
            item.published_at.as_deref().unwrap_or("Recent"),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_prompt_carries_text_and_empty_index() {
        let p = build_evidence_prompt("Lenacapavir PURPOSE 1 results");
        assert!(p.starts_with("INPUT TEXT:\nLenacapavir PURPOSE 1 results\n"));
        assert!(p.trim_end().ends_with("[]"));
    }

    #[test]
    fn prompt_numbers_every_item() {
        let items = vec![
            CandidateItem {
                source_name: "UNAIDS".into(),
                index: 0,
                title: "Namibia reaches 95-95-95".into(),
                link: Some("https://example.test/a".into()),
                summary: "Targets met.".into(),
                published_at: None,
            },
            CandidateItem {
                source_name: "WHO HIV".into(),
                index: 1,
                title: "WHO PrEP guidance".into(),
                link: None,
                summary: "Guidance expanded.".into(),
                published_at: Some("Tue, 01 Jul 2025 08:00:00 GMT".into()),
            },
        ];
        let p = build_batch_prompt(&items);
        assert!(p.contains("exactly 2 elements"));
        assert!(p.contains("--- Item 1 ---\nTitle: Namibia reaches 95-95-95"));
        assert!(p.contains("Date: Recent"));
        assert!(p.contains("--- Item 2 ---"));
        assert!(p.contains("Source: WHO HIV"));
    }
}
