// Species gate deciding whether organism-specific sections apply
use crate::config::defs::TARGET_ORGANISM;
use crate::utils::tsv::{HitRecord, ResultSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesContext {
    is_target_organism: bool,
    template_id: Option<String>,
}

impl SpeciesContext {
    /// No hit means no species, so never the target organism.
    pub fn from_best_hit(best: Option<&HitRecord>) -> Self {
        let template_id = best.and_then(|hit| hit.template_id()).map(String::from);
        let is_target_organism = template_id
            .as_deref()
            .is_some_and(|id| id.contains(TARGET_ORGANISM));
        Self { is_target_organism, template_id }
    }

    /// The only question report renderers ask about virulence.
    pub fn includes_virulence(&self) -> bool {
        self.is_target_organism
    }

    /// "55.1_Escherichia coli_GCF_000005845" -> "Escherichia coli"
    pub fn species_name(&self) -> Option<String> {
        let id = self.template_id.as_deref()?;
        let mut parts = id.splitn(3, '_');
        let first = parts.next()?;
        match parts.next() {
            Some(name) if first.parse::<f64>().is_ok() && !name.trim().is_empty() => {
                Some(name.trim().to_string())
            }
            _ => Some(id.to_string()),
        }
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }
}

/// State of the virulence section, decided once for both reports.
#[derive(Debug, Clone, PartialEq)]
pub enum VirulenceSection {
    NotApplicable,
    Unavailable(String),
    Available(ResultSet),
}

impl VirulenceSection {
    pub fn hit_count(&self) -> usize {
        match self {
            VirulenceSection::Available(set) => set.len(),
            _ => 0,
        }
    }
}
