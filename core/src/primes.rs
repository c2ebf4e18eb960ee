//! Sieve-based prime computation for bounded boards.

/// Returns every prime less than or equal to `max` in ascending order.
///
/// Uses the sieve of Eratosthenes, so the cost is `O(max log log max)` and the
/// result is safe to memoize per board size. Values below two yield an empty
/// sequence.
#[must_use]
pub fn compute_primes(max: u32) -> Vec<u32> {
    if max < 2 {
        return Vec::new();
    }

    let bound = max as usize;
    let mut composite = vec![false; bound + 1];
    let mut candidate = 2;
    while candidate * candidate <= bound {
        if !composite[candidate] {
            let mut multiple = candidate * candidate;
            while multiple <= bound {
                composite[multiple] = true;
                multiple += candidate;
            }
        }
        candidate += 1;
    }

    (2..=bound)
        .filter(|&value| !composite[value])
        .map(|value| value as u32)
        .collect()
}
