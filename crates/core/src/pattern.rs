//! Pattern-based position code generation.
//!
//! A pattern is plain text with three kinds of placeholders:
//!
//! - `{#}`: the running sequence number
//! - `{zone}`: the leaf's ancestor codes joined with `.` (root to leaf)
//! - `{PREFIX}`: the code of the closest ancestor whose code, with digits
//!   removed, equals `PREFIX` (e.g. `{NK}` → `NK1`)
//!
//! Placeholder names are case-insensitive and the generated code is
//! uppercased. The default pattern is `{zone}.{suffix}{#}`.

use std::collections::HashMap;

use regex::{NoExpand, Regex};
use serde::Serialize;

use crate::error::CoreError;
use crate::models::{Position, Zone};
use crate::staging::{batch_label, validate_sequence, StagingStore};
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Suffix used in the default pattern when none is configured.
pub const DEFAULT_POSITION_SUFFIX: &str = "V";

/// Sequence placeholder.
pub const SEQUENCE_PLACEHOLDER: &str = "{#}";

/// Stands in for `{#}` while the other placeholders are substituted, so that
/// no substituted zone code can reintroduce a sequence placeholder.
const SEQUENCE_SENTINEL: &str = "\u{0}SEQ\u{0}";

// ---------------------------------------------------------------------------
// Substitution context
// ---------------------------------------------------------------------------

/// Strip digits from a zone code to get its placeholder prefix
/// (`"NK1"` → `"NK"`).
pub fn code_prefix(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .to_uppercase()
}

/// Values derived from a leaf's ancestor chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorContext {
    /// Ancestor codes joined with `.`, root to leaf inclusive.
    pub zone_path: String,
    /// Placeholder prefix → ancestor code. Deeper ancestors win.
    pub prefixes: HashMap<String, String>,
}

impl AncestorContext {
    /// Build from a root-to-leaf chain.
    pub fn from_chain(chain: &[&Zone]) -> Self {
        let mut parts = Vec::with_capacity(chain.len());
        let mut prefixes = HashMap::new();

        for zone in chain.iter().filter(|z| !z.code.is_empty()) {
            parts.push(zone.code.as_str());
            let prefix = code_prefix(&zone.code);
            if !prefix.is_empty() {
                prefixes.insert(prefix, zone.code.clone());
            }
        }

        Self {
            zone_path: parts.join("."),
            prefixes,
        }
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// A position code pattern, either custom or the `{zone}.{suffix}{#}` default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodePattern {
    source: String,
}

impl CodePattern {
    /// Use `custom` when it is non-blank, otherwise the default pattern with
    /// `suffix` between the zone path and the sequence number.
    pub fn new(custom: Option<&str>, suffix: &str) -> Self {
        match custom.map(str::trim).filter(|p| !p.is_empty()) {
            Some(pattern) => Self {
                source: pattern.to_string(),
            },
            None => Self::with_suffix(suffix),
        }
    }

    /// The default pattern `{zone}.{suffix}{#}`.
    pub fn with_suffix(suffix: &str) -> Self {
        Self {
            source: format!("{{zone}}.{}{SEQUENCE_PLACEHOLDER}", suffix.trim()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitute every placeholder except the sequence number.
    pub fn resolve(&self, ctx: &AncestorContext) -> Result<ResolvedPattern, CoreError> {
        let mut out = self.source.replace(SEQUENCE_PLACEHOLDER, SEQUENCE_SENTINEL);

        let zone = placeholder_regex("zone")?;
        out = zone
            .replace_all(&out, NoExpand(&ctx.zone_path))
            .into_owned();

        // Longer prefixes first so `{NKA}` is settled before `{NK}`.
        let mut prefixes: Vec<(&String, &String)> = ctx.prefixes.iter().collect();
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

        for (prefix, code) in prefixes {
            let re = placeholder_regex(prefix)?;
            out = re.replace_all(&out, NoExpand(code.as_str())).into_owned();
        }

        Ok(ResolvedPattern { template: out })
    }
}

fn placeholder_regex(name: &str) -> Result<Regex, CoreError> {
    Regex::new(&format!(r"(?i)\{{{}\}}", regex::escape(name)))
        .map_err(|e| CoreError::Internal(format!("Invalid placeholder '{name}': {e}")))
}

/// A pattern with everything but the sequence number substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPattern {
    template: String,
}

impl ResolvedPattern {
    /// Final uppercased code for sequence number `seq`.
    pub fn code(&self, seq: i32) -> String {
        self.template
            .replace(SEQUENCE_SENTINEL, &seq.to_string())
            .to_uppercase()
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Summary of one generation command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Leaf zones that received positions.
    pub leaf_ids: Vec<EntityId>,
    /// Total positions created (`leaf_ids.len() * count`).
    pub created: usize,
}

impl StagingStore {
    /// Create `count` positions in every leaf below `zone_id`, coded by
    /// `pattern`. Numbering restarts at `start` for each leaf.
    pub fn generate_positions(
        &mut self,
        zone_id: EntityId,
        pattern: &CodePattern,
        start: i32,
        count: u32,
    ) -> Result<GenerationReport, CoreError> {
        validate_sequence(start, count)?;
        self.live_zone(zone_id)?;

        let batches = {
            let index = self.tree();
            let mut batches = Vec::new();
            for leaf in index.leaves(zone_id) {
                let ctx = AncestorContext::from_chain(&index.ancestor_chain(leaf.id));
                let resolved = pattern.resolve(&ctx)?;
                let label = batch_label("Auto Batch", &leaf.name);

                let positions: Vec<Position> = (0..count)
                    .map(|j| {
                        let seq = start + j as i32;
                        Position::new_local(resolved.code(seq), seq, Some(label.clone()))
                    })
                    .collect();
                batches.push((leaf.id, positions));
            }
            batches
        };

        let mut report = GenerationReport::default();
        for (leaf_id, positions) in batches {
            report.created += positions.len();
            report.leaf_ids.push(leaf_id);
            self.attach_positions(leaf_id, positions);
        }

        tracing::debug!(
            zone_id = %zone_id,
            leaves = report.leaf_ids.len(),
            created = report.created,
            "Generated positions from pattern"
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
