use anyhow::{Result, bail};

/// Seed used when the CLI names none.
pub const DEFAULT_SEED: u64 = 1337;

fn parse_seed(token: &str) -> Option<u64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        return u64::from_str_radix(&hex.replace('_', ""), 16).ok();
    }
    if let Ok(value) = token.parse::<i64>() {
        return Some(value.unsigned_abs());
    }
    token.parse::<u64>().ok()
}

/// Resolve CLI seed tokens (decimal or `0x` hex) into a deduplicated list,
/// keeping first-seen order.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();
    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let Some(seed) = parse_seed(token) else {
            bail!("Unrecognized seed token: {token}");
        };
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }
    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn resolves_decimal_hex_and_negative() {
        let seeds = resolve_seed_inputs(&tokens(&["42", "-7", "0xFF", "0x00C0_FFEE"])).unwrap();
        assert_eq!(seeds, vec![42, 7, 255, 0x00C0_FFEE]);
    }

    #[test]
    fn duplicates_collapse_and_empty_defaults() {
        let seeds = resolve_seed_inputs(&tokens(&["16", "0x10"])).unwrap();
        assert_eq!(seeds, vec![16]);
        assert_eq!(resolve_seed_inputs(&[]).unwrap(), vec![DEFAULT_SEED]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(resolve_seed_inputs(&tokens(&["CL-ORANGE42"])).is_err());
    }
}
