//! Findings reported by optimisation stages.
//!
//! Every stage records what it did, or in a dry run what it would do, as a
//! [`Finding`]. The pipeline returns the collected [`Diagnostics`] and its
//! [`Display`](fmt::Display) impl prints a human-readable summary.

use std::fmt;

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

/// One thing a stage found or did.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// Renderers that can be merged, by name.
    MergeGroup { members: Vec<String> },
    /// A group that was merged.
    Merged {
        mesh: String,
        members: Vec<String>,
        vertices: usize,
    },
    /// A group that could not be merged and was left untouched.
    GroupFailed { members: Vec<String>, reason: String },
    /// A renderer excluded from merging.
    Excluded { renderer: String, reason: String },
    /// Marked blend shapes hiding geometry.
    MarkedShapes {
        renderer: String,
        shapes: Vec<String>,
    },
    /// Geometry removed with marked blend shapes.
    StrippedVertices {
        renderer: String,
        vertices: usize,
        triangles: usize,
    },
    /// Blend shapes nothing drives.
    UnusedShapes {
        renderer: String,
        baked: Vec<String>,
        dropped: Vec<String>,
    },
    /// A renderer a blend shape pass could not process.
    RendererFailed { renderer: String, reason: String },
    /// A clip whose bindings were rewritten.
    RetargetedClip { clip: String, bindings: usize },
}

/// A finding attributed to the stage that made it.
#[derive(Debug, Clone, PartialEq)]
pub struct StageFinding {
    pub stage: &'static str,
    pub finding: Finding,
}

/// Findings of a pipeline run, in the order they were made.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub findings: Vec<StageFinding>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding.
    pub fn push(&mut self, stage: &'static str, finding: Finding) {
        self.findings.push(StageFinding { stage, finding });
    }

    /// Number of findings.
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Findings of one stage.
    pub fn for_stage<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings
            .iter()
            .filter(move |f| f.stage == stage)
            .map(|f| &f.finding)
    }

    /// Count findings matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Finding) -> bool) -> usize {
        self.findings.iter().filter(|f| predicate(&f.finding)).count()
    }
}

// ---------------------------------------------------------------------------
// Display impls
// ---------------------------------------------------------------------------

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MergeGroup { members } => write!(f, "mergeable: {}", members.join(", ")),
            Self::Merged {
                mesh,
                members,
                vertices,
            } => write!(f, "merged {} into {mesh} ({vertices} vertices)", members.join(", ")),
            Self::GroupFailed { members, reason } => {
                write!(f, "not merged: {} ({reason})", members.join(", "))
            }
            Self::Excluded { renderer, reason } => write!(f, "excluded {renderer}: {reason}"),
            Self::MarkedShapes { renderer, shapes } => {
                write!(f, "{renderer}: marked shapes {}", shapes.join(", "))
            }
            Self::StrippedVertices {
                renderer,
                vertices,
                triangles,
            } => write!(
                f,
                "{renderer}: removed {vertices} vertices and {triangles} triangles"
            ),
            Self::UnusedShapes {
                renderer,
                baked,
                dropped,
            } => write!(
                f,
                "{renderer}: bake [{}], drop [{}]",
                baked.join(", "),
                dropped.join(", ")
            ),
            Self::RendererFailed { renderer, reason } => write!(f, "{renderer} skipped: {reason}"),
            Self::RetargetedClip { clip, bindings } => {
                write!(f, "clip {clip}: {bindings} bindings retargeted")
            }
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.findings.is_empty() {
            return writeln!(f, "Nothing to do.");
        }
        let mut current = None;
        for entry in &self.findings {
            if current != Some(entry.stage) {
                writeln!(f, "[{}]", entry.stage)?;
                current = Some(entry.stage);
            }
            writeln!(f, "  {}", entry.finding)?;
        }
        Ok(())
    }
}
