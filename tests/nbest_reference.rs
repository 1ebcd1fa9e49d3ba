use std::collections::HashSet;
use std::env;

use confnet_rs::{ConfusionLattice, WordSequence};
use libtest_mimic::{Arguments, Failed, Trial};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_CASES: u64 = 40;
const DEFAULT_BASE_SEED: u64 = 42;
const MAX_SLOTS: usize = 5;
const MAX_ALTERNATIVES: usize = 3;
const TOLERANCE: f64 = 1e-9;
const SUITE_NAME: &str = "nbest_expansion_matches_brute_force";

fn main() {
    let args = Arguments::from_args();

    let cases = env_u64("CONFNET_IT_CASES", DEFAULT_CASES);
    let base_seed = env_u64("CONFNET_IT_SEED", DEFAULT_BASE_SEED);

    let mut tests = Vec::with_capacity(3 * cases as usize);
    for offset in 0..cases {
        let seed = base_seed.wrapping_add(offset);
        tests.push(Trial::test(
            format!("{SUITE_NAME}::closed_order::seed_{seed}"),
            move || check_closed_order(seed).map_err(Failed::from),
        ));
        tests.push(Trial::test(
            format!("{SUITE_NAME}::merged_list::seed_{seed}"),
            move || check_merged_list(seed).map_err(Failed::from),
        ));
        tests.push(Trial::test(
            format!("{SUITE_NAME}::link_normalization::seed_{seed}"),
            move || check_link_normalization(seed).map_err(Failed::from),
        ));
    }

    libtest_mimic::run(&args, tests).exit();
}

/// Every index vector closed by the expansion comes out in non-increasing
/// probability and the sequence of probabilities equals exhaustive
/// enumeration.
fn check_closed_order(seed: u64) -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut confnet = random_lattice(&mut rng, false);
    confnet.sort();

    let mut expected: Vec<f64> = enumerate_indices(&confnet)
        .iter()
        .map(|index| confnet.get_probability(index))
        .collect();
    expected.sort_by(|a, b| b.total_cmp(a));

    let closed = confnet.expand_indices(expected.len(), None);
    if closed.len() != expected.len() {
        return Err(format!(
            "seed {seed}: closed {} index vectors, lattice has {}",
            closed.len(),
            expected.len()
        ));
    }

    for (rank, pair) in closed.windows(2).enumerate() {
        if pair[1].prob > pair[0].prob + TOLERANCE {
            return Err(format!(
                "seed {seed}: rank {} ({:.6}) is more probable than rank {rank} ({:.6})",
                rank + 1,
                pair[1].prob,
                pair[0].prob
            ));
        }
    }

    for (rank, (observed, expected)) in closed.iter().zip(&expected).enumerate() {
        if (observed.prob - expected).abs() > TOLERANCE {
            return Err(format!(
                "seed {seed}: rank {rank} probability mismatch (expected {expected:.6}, got {:.6})",
                observed.prob
            ));
        }
    }

    let distinct: HashSet<&[usize]> = closed.iter().map(|expanded| expanded.index.as_slice()).collect();
    if distinct.len() != closed.len() {
        return Err(format!("seed {seed}: an index vector was closed twice"));
    }
    Ok(())
}

/// With silence alternatives several index vectors spell the same words; the
/// merged list keeps one entry per word sequence and sums to one.
fn check_merged_list(seed: u64) -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut confnet = random_lattice(&mut rng, true);
    confnet.sort();

    let max_hypotheses = rng.gen_range(1..=8);
    let nblist = confnet.get_best_hypotheses(max_hypotheses, None);
    if nblist.is_empty() {
        return Err(format!("seed {seed}: empty N-best list"));
    }

    let total = nblist.total_prob();
    if (total - 1.0).abs() > 1e-6 {
        return Err(format!("seed {seed}: N-best list sums to {total:.6}"));
    }

    let mut seen: HashSet<&WordSequence> = HashSet::new();
    for hyp in &nblist {
        let Some(utterance) = hyp.entry.utterance() else {
            return Err(format!("seed {seed}: unexpected other entry"));
        };
        if !seen.insert(utterance) {
            return Err(format!("seed {seed}: duplicate hypothesis '{utterance}'"));
        }
    }

    let best = confnet.best_utterance();
    match nblist.get_best() {
        Some(top) if *top == best => Ok(()),
        Some(top) => {
            // Ties or merging can promote a different sequence; it must not
            // be less probable than the lattice's best path.
            let top_prob = nblist.get(0).map_or(0.0, |hyp| hyp.prob);
            let best_prob = nblist
                .iter()
                .find(|hyp| hyp.entry.utterance() == Some(&best))
                .map_or(0.0, |hyp| hyp.prob);
            if top_prob + TOLERANCE >= best_prob {
                Ok(())
            } else {
                Err(format!(
                    "seed {seed}: top hypothesis '{top}' ({top_prob:.6}) below best path '{best}' ({best_prob:.6})"
                ))
            }
        }
        None => Err(format!("seed {seed}: N-best list has no best hypothesis")),
    }
}

/// After normalization every slot, including those crossed by long links,
/// carries unit mass.
fn check_link_normalization(seed: u64) -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut confnet = random_lattice(&mut rng, false);
    if confnet.len() < 2 {
        confnet.add([(1.0, "tail")]);
    }

    let start = rng.gen_range(0..confnet.len() - 1);
    let end = rng.gen_range(start + 2..=confnet.len());
    let hops: Vec<f64> = (start..end).map(|_| rng.gen_range(0.05..0.5)).collect();
    confnet
        .add_long_link(start, end, hops, vec!["linked".to_string(), "phrase".to_string()])
        .map_err(|err| format!("seed {seed}: add_long_link({start}, {end}) failed: {err}"))?;
    confnet.normalize(None);

    for slot in 0..confnet.len() {
        let mass = confnet.slot_mass(slot);
        if (mass - 1.0).abs() > 1e-6 {
            return Err(format!(
                "seed {seed}: slot {slot} has mass {mass:.6} after normalization (link {start}..{end})"
            ));
        }
    }

    let link = &confnet.long_links(start)[0];
    let product: f64 = link.orig_probs.iter().product();
    if (link.hyp.prob - product).abs() > TOLERANCE {
        return Err(format!(
            "seed {seed}: link probability {:.6} differs from hop product {product:.6}",
            link.hyp.prob
        ));
    }
    Ok(())
}

fn random_lattice(rng: &mut StdRng, with_silence: bool) -> ConfusionLattice {
    let slots = rng.gen_range(1..=MAX_SLOTS);
    let mut confnet = ConfusionLattice::new();
    for slot in 0..slots {
        let alternatives = rng.gen_range(1..=MAX_ALTERNATIVES);
        let words: Vec<(f64, String)> = (0..alternatives)
            .map(|alt| {
                let word = if with_silence && alt == 0 && rng.gen_bool(0.5) {
                    String::new()
                } else {
                    format!("w{slot}_{alt}")
                };
                (rng.gen_range(0.01..1.0), word)
            })
            .collect();
        confnet.add(words);
    }
    confnet
}

fn enumerate_indices(confnet: &ConfusionLattice) -> Vec<Vec<usize>> {
    let mut indices = vec![Vec::new()];
    for slot in confnet.slots() {
        indices = indices
            .into_iter()
            .flat_map(|prefix| {
                (0..slot.len()).map(move |alt| {
                    let mut index = prefix.clone();
                    index.push(alt);
                    index
                })
            })
            .collect();
    }
    indices
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}
