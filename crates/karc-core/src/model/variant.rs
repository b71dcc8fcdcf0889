//! Display helpers for variant coordinates.

use super::Variant;

fn bare_chromosome(chromosome: &str) -> &str {
    let trimmed = chromosome.trim();
    trimmed
        .strip_prefix("chr")
        .or_else(|| trimmed.strip_prefix("CHR"))
        .or_else(|| trimmed.strip_prefix("Chr"))
        .unwrap_or(trimmed)
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Human-readable locus, e.g. `chr17:7,676,154`.
///
/// Returns `None` unless both chromosome and position are present.
#[must_use]
pub fn genomic_position_label(variant: &Variant) -> Option<String> {
    let chromosome = variant.chromosome.as_deref()?;
    let position = variant.position?;
    Some(format!(
        "chr{}:{}",
        bare_chromosome(chromosome),
        group_thousands(position)
    ))
}

/// Compact locus id, e.g. `chr17:7676154:G:A`.
///
/// Requires chromosome, position, and both alleles.
#[must_use]
pub fn variant_locus_id(variant: &Variant) -> Option<String> {
    let chromosome = variant.chromosome.as_deref()?;
    let position = variant.position?;
    let ref_allele = variant.ref_allele.as_deref()?;
    let alt_allele = variant.alt_allele.as_deref()?;
    Some(format!(
        "chr{}:{position}:{ref_allele}:{alt_allele}",
        bare_chromosome(chromosome)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VariantStatus;

    fn variant() -> Variant {
        Variant {
            id: "var-1".to_string(),
            gene: "TP53".to_string(),
            variant: "c.743G>A".to_string(),
            sample_id: None,
            chromosome: Some("chr17".to_string()),
            position: Some(7_676_154),
            ref_allele: Some("G".to_string()),
            alt_allele: Some("A".to_string()),
            protein_change: None,
            consequence: None,
            transcript: None,
            rank: None,
            inheritance: None,
            status: VariantStatus::Available,
            notes: None,
            variant_type: None,
            significance: None,
            families: None,
            created_by: None,
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            updated_at: None,
            comment_count: 0,
        }
    }

    #[test]
    fn test_position_label_normalizes_prefix() {
        let mut v = variant();
        assert_eq!(genomic_position_label(&v).as_deref(), Some("chr17:7,676,154"));
        v.chromosome = Some("X".to_string());
        v.position = Some(512);
        assert_eq!(genomic_position_label(&v).as_deref(), Some("chrX:512"));
    }

    #[test]
    fn test_position_label_needs_coordinates() {
        let mut v = variant();
        v.position = None;
        assert_eq!(genomic_position_label(&v), None);
    }

    #[test]
    fn test_locus_id() {
        let mut v = variant();
        assert_eq!(variant_locus_id(&v).as_deref(), Some("chr17:7676154:G:A"));
        v.alt_allele = None;
        assert_eq!(variant_locus_id(&v), None);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(-1_234_567), "-1,234,567");
    }
}
