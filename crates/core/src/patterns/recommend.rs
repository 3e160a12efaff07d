//! Recommendation ranking

use std::collections::BTreeSet;

use super::types::*;

pub const MAX_RECOMMENDATIONS: usize = 3;

pub const FALLBACK_RECOMMENDATION: &str =
    "Keep playing and analyzing more games to build a clearer pattern profile.";

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn distinct_games(findings: &[Finding]) -> usize {
    findings.iter().map(|f| f.game_index).collect::<BTreeSet<_>>().len()
}

/// Turns pattern and phase tables into at most three recommendations.
///
/// Priority: most frequent motif (2+ findings), weakest phase, second motif,
/// then blunder-heavy phases only if nothing else fired.
pub fn generate_recommendations(patterns: &PatternTable, phases: &PhaseTable) -> Vec<String> {
    let mut recs = Vec::new();

    // Frequency descending; the stable sort keeps PatternType order on ties
    let mut ranked: Vec<(PatternType, &Vec<Finding>)> = patterns
        .iter()
        .filter(|(_, findings)| !findings.is_empty())
        .map(|(pattern, findings)| (*pattern, findings))
        .collect();
    ranked.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    if let Some((pattern, findings)) = ranked.first() {
        if findings.len() >= 2 {
            let name = pattern.readable();
            let games = distinct_games(findings);
            let avg_loss =
                findings.iter().map(|f| f.lost_material).sum::<f64>() / findings.len() as f64;
            recs.push(format!(
                "You're losing material to {}s ({} game{}, avg {:.1} pawns lost). \
                 Practice recognizing {} patterns.",
                name,
                games,
                plural(games),
                avg_loss,
                name
            ));
        }
    }

    if phases.len() >= 2 {
        if let Some((weakest, strongest)) = weakest_and_strongest(phases) {
            let gap = strongest.avg_accuracy - weakest.avg_accuracy;
            if gap > 5.0 || weakest.blunder_count >= 2 {
                recs.push(format!(
                    "Your {} accuracy is low ({:.0}% vs {:.0}% in {}). Focus on {} technique.",
                    weakest.phase.as_str(),
                    weakest.avg_accuracy,
                    strongest.avg_accuracy,
                    strongest.phase.as_str(),
                    weakest.phase.as_str()
                ));
            }
        }
    }

    if let Some((pattern, findings)) = ranked.get(1) {
        let games = distinct_games(findings);
        recs.push(format!(
            "Practice recognizing {}s ({} game{}).",
            pattern.readable(),
            games,
            plural(games)
        ));
    }

    if recs.is_empty() {
        let mut by_accuracy: Vec<&PhaseStat> = phases.values().collect();
        by_accuracy.sort_by(|a, b| a.avg_accuracy.total_cmp(&b.avg_accuracy));

        for stats in by_accuracy {
            if stats.blunder_count > 0 {
                recs.push(format!(
                    "You had {} blunder{} in the {}. Review these critical moments.",
                    stats.blunder_count,
                    plural(stats.blunder_count as usize),
                    stats.phase.as_str()
                ));
            }
            if recs.len() >= MAX_RECOMMENDATIONS {
                break;
            }
        }
    }

    if recs.is_empty() {
        recs.push(FALLBACK_RECOMMENDATION.to_string());
    }

    recs.truncate(MAX_RECOMMENDATIONS);
    recs
}

/// First phase with the lowest accuracy and first with the highest
fn weakest_and_strongest(phases: &PhaseTable) -> Option<(&PhaseStat, &PhaseStat)> {
    let mut stats = phases.values();
    let first = stats.next()?;
    let (mut weakest, mut strongest) = (first, first);
    for stat in stats {
        if stat.avg_accuracy < weakest.avg_accuracy {
            weakest = stat;
        }
        if stat.avg_accuracy > strongest.avg_accuracy {
            strongest = stat;
        }
    }
    Some((weakest, strongest))
}
